use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VideoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("ffprobe failed for {path}: {reason}")]
    Probe { path: PathBuf, reason: String },
    #[error("No video stream found in {0}")]
    NoVideoStream(PathBuf),
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("OCR error: {0}")]
    Ocr(String),
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] image::ImageError),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}
