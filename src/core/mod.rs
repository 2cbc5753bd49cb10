pub mod aligner;
pub mod audio;
pub mod cache;
pub mod config;
pub mod error;
pub mod job;
pub mod video;

pub use aligner::{align, CombinedSlide};
pub use cache::CacheLayout;
pub use config::PipelineConfig;
pub use error::PipelineError;
pub use job::{CancelFlag, LectureJob};
