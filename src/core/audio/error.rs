use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("WAV format error: {0}")]
    Wav(#[from] hound::Error),
    #[error("Unsupported sample rate {0} Hz, expected 16000")]
    SampleRate(u32),
    #[error("Model not initialized")]
    NotInitialized,
    #[error("Model load failed: {0}")]
    ModelLoadFailed(String),
    #[error("Transcode failed for {path}: {reason}")]
    Transcode { path: PathBuf, reason: String },
    #[error("Recognizer error: {0}")]
    Recognizer(String),
    #[error("Worker pool error: {0}")]
    WorkerPool(String),
    #[error("Cancelled after {completed} segments")]
    Cancelled { completed: usize },
}
