use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use uuid::Uuid;

use super::cache::CacheLayout;
use super::error::PipelineError;

/// 协作式取消标志，在帧之间、音频片段之间检查
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// 一次处理任务（一个视频）
#[derive(Debug, Clone)]
pub struct LectureJob {
    pub id: Uuid,
    pub video_path: PathBuf,
    pub cache: CacheLayout,
    pub cancel: CancelFlag,
    /// 忽略已缓存的音频
    pub force: bool,
}

impl LectureJob {
    pub fn new(video_path: Option<&Path>, cache_dir: &Path) -> Result<Self, PipelineError> {
        let video_path = video_path
            .ok_or_else(|| PipelineError::Input("no source video provided".into()))?;
        if !video_path.is_file() {
            return Err(PipelineError::Input(format!(
                "source video not found: {}",
                video_path.display()
            )));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            video_path: video_path.to_path_buf(),
            cache: CacheLayout::for_video(cache_dir, video_path),
            cancel: CancelFlag::new(),
            force: false,
        })
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_video_is_input_error() {
        let err = LectureJob::new(None, Path::new("/tmp")).unwrap_err();
        assert!(matches!(err, PipelineError::Input(_)));

        let err = LectureJob::new(Some(Path::new("/definitely/not/here.mp4")), Path::new("/tmp"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Input(_)));
    }

    #[test]
    fn test_jobs_get_distinct_ids() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("talk.mp4");
        std::fs::write(&video, b"stub").unwrap();

        let a = LectureJob::new(Some(&video), dir.path()).unwrap();
        let b = LectureJob::new(Some(&video), dir.path()).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.cache, b.cache);
        assert_eq!(a.cache.stem(), "talk");
    }

    #[test]
    fn test_cancel_flag_is_shared() {
        let flag = CancelFlag::new();
        let clone = flag.clone();
        assert!(!clone.is_cancelled());
        flag.cancel();
        assert!(clone.is_cancelled());
    }
}
