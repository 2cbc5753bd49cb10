use std::{
    fs,
    io,
    path::{Path, PathBuf},
};

use uuid::Uuid;

/// 单个视频的磁盘缓存布局
///
/// 所有中间文件都按派生名称存放在 `<cache_dir>/<video stem>/` 下，
/// 已存在的文件会被直接复用。
#[derive(Debug, Clone, PartialEq)]
pub struct CacheLayout {
    root: PathBuf,
    stem: String,
}

impl CacheLayout {
    pub fn for_video(cache_dir: &Path, video_path: &Path) -> Self {
        let stem = video_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "video".to_string());
        Self {
            root: cache_dir.join(&stem),
            stem,
        }
    }

    pub fn ensure(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// 从视频抽取的完整音轨
    pub fn audio_path(&self) -> PathBuf {
        self.root.join(format!("extracted_audio_{}.wav", self.stem))
    }

    /// 一个时间段的音频片段
    pub fn segment_path(&self, start: f64, end: f64) -> PathBuf {
        self.root.join(format!(
            "extracted_audio_{}_{:.2}_{:.2}.wav",
            self.stem, start, end
        ))
    }

    pub fn snapshot_path(&self, pts: f64) -> PathBuf {
        self.root.join(format!("frame_{:.2}.jpg", pts))
    }

    pub fn report_path(&self) -> PathBuf {
        self.root.join("slides.json")
    }
}

/// `path` 同目录下的唯一临时文件，写完后再重命名到位
pub fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}.part", name, Uuid::new_v4().simple()))
}

pub fn persist(temp: &Path, dest: &Path) -> io::Result<()> {
    fs::rename(temp, dest).inspect_err(|_| {
        let _ = fs::remove_file(temp);
    })
}

pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let temp = temp_sibling(path);
    fs::write(&temp, bytes)?;
    persist(&temp, path)
}
