//! 对外入口 - 讲座视频处理

pub mod lecture;
pub mod models;

pub use lecture::LectureProcessor;
pub use models::LectureReport;
