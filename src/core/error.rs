use thiserror::Error;

use super::audio::AudioError;
use super::video::VideoError;

/// 一次运行的终止结果
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Input error: {0}")]
    Input(String),

    /// 视频无法探测或解码
    #[error("Decode error: {0}")]
    Decode(VideoError),

    #[error("Text detection error: {0}")]
    TextDetection(String),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] image::ImageError),

    #[error("Transcode error: {0}")]
    Transcode(AudioError),

    #[error("Misalignment: {slides} slides vs {segments} audio segments ({detail})")]
    Misalignment {
        slides: usize,
        segments: usize,
        detail: String,
    },

    #[error("Cancelled during {stage} after {completed} completed items")]
    Cancelled { stage: &'static str, completed: usize },

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<VideoError> for PipelineError {
    fn from(e: VideoError) -> Self {
        match e {
            VideoError::Io(e) => PipelineError::Io(e),
            VideoError::Ocr(reason) => PipelineError::TextDetection(reason),
            VideoError::Snapshot(e) => PipelineError::Snapshot(e),
            other => PipelineError::Decode(other),
        }
    }
}

impl From<AudioError> for PipelineError {
    fn from(e: AudioError) -> Self {
        match e {
            AudioError::Cancelled { completed } => PipelineError::Cancelled {
                stage: "audio",
                completed,
            },
            other => PipelineError::Transcode(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_video_errors_keep_their_kind() {
        let err: PipelineError = VideoError::NoVideoStream(PathBuf::from("talk.mp4")).into();
        assert!(matches!(err, PipelineError::Decode(VideoError::NoVideoStream(_))));

        let err: PipelineError = VideoError::Probe {
            path: PathBuf::from("talk.mp4"),
            reason: "moov atom not found".into(),
        }
        .into();
        assert!(matches!(err, PipelineError::Decode(VideoError::Probe { .. })));

        let err: PipelineError = VideoError::Ocr("tesseract: language eng not found".into()).into();
        assert!(matches!(&err, PipelineError::TextDetection(r) if r.contains("eng")));
        assert_eq!(err.to_string(), "Text detection error: tesseract: language eng not found");

        let err: PipelineError =
            VideoError::Io(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "cache")).into();
        assert!(matches!(err, PipelineError::Io(_)));

        let image_err = image::ImageError::IoError(std::io::Error::new(
            std::io::ErrorKind::Other,
            "no space left for frame_25.00.jpg",
        ));
        let err: PipelineError = VideoError::Snapshot(image_err).into();
        assert!(matches!(err, PipelineError::Snapshot(_)));
    }

    #[test]
    fn test_audio_cancel_maps_to_cancelled() {
        let err: PipelineError = AudioError::Cancelled { completed: 3 }.into();
        assert!(matches!(
            err,
            PipelineError::Cancelled {
                stage: "audio",
                completed: 3
            }
        ));

        let err: PipelineError = AudioError::Recognizer("no model".into()).into();
        assert!(matches!(err, PipelineError::Transcode(_)));
    }
}
