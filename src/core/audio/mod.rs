pub mod cutter;
pub mod error;
pub mod recognizer;
pub mod segmenter;
pub mod utils;

pub use cutter::{FfmpegCutter, MediaCutter};
pub use error::AudioError;
#[cfg(feature = "whisper")]
pub use recognizer::WhisperHandle;
pub use recognizer::{LazyRecognizer, SpeechRecognizer, WhisperCliRecognizer};
pub use segmenter::{
    plan_segments, AudioSegment, AudioSegmenter, AudioTrack, SegmentErrorKind, SegmentTranscript,
};
pub use utils::{load_wav_mono_f32, wav_duration, TARGET_SAMPLE_RATE};
