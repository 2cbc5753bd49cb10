pub mod lecture;

pub use lecture::LectureReport;
