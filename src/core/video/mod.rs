pub mod decoder;
pub mod error;
pub mod frame;
pub mod info;
pub mod sampler;

pub use decoder::{FfmpegDecoder, FrameSource, VecFrameSource};
pub use error::VideoError;
pub use frame::Frame;
pub use info::VideoInfo;
pub use sampler::FrameSampler;
