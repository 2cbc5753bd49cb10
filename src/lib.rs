pub mod api;
pub mod core;
pub mod frame_extractor;

pub use api::{LectureProcessor, LectureReport};
pub use crate::core::config::PipelineConfig;
pub use crate::core::error::PipelineError;

pub fn init_logging() {
    #[cfg(target_os = "android")]
    {
        android_logger::init_once(
            android_logger::Config::default()
                .with_max_level(log::LevelFilter::Debug)
                .with_tag("lecture_lib"),
        );
    }

    #[cfg(not(target_os = "android"))]
    {
        // RUST_LOG 覆盖默认级别；重复调用无副作用
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .try_init();
    }
}
