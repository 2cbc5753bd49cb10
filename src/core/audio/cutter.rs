//! 音频抽取与切分

use log::{debug, error, info};
use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use super::error::AudioError;
use super::utils::{wav_duration, TARGET_SAMPLE_RATE};
use crate::core::cache;

pub trait MediaCutter: Send + Sync {
    /// 从视频抽取整条音轨写到 `dest`
    fn extract_audio(&self, video: &Path, dest: &Path) -> Result<(), AudioError>;

    /// 切出 `[start, end)`，`end` 为 None 表示到音轨结束
    fn cut(&self, audio: &Path, start: f64, end: Option<f64>, dest: &Path)
        -> Result<(), AudioError>;

    fn duration(&self, audio: &Path) -> Result<f64, AudioError> {
        wav_duration(audio)
    }
}

impl<T: MediaCutter + ?Sized> MediaCutter for Arc<T> {
    fn extract_audio(&self, video: &Path, dest: &Path) -> Result<(), AudioError> {
        (**self).extract_audio(video, dest)
    }

    fn cut(&self, audio: &Path, start: f64, end: Option<f64>, dest: &Path)
        -> Result<(), AudioError> {
        (**self).cut(audio, start, end, dest)
    }

    fn duration(&self, audio: &Path) -> Result<f64, AudioError> {
        (**self).duration(audio)
    }
}

/// 16 kHz 单声道 PCM，先写临时文件再重命名
pub struct FfmpegCutter;

impl FfmpegCutter {
    fn run(args: &[&std::ffi::OsStr], input: &Path, dest: &Path) -> Result<(), AudioError> {
        let temp = cache::temp_sibling(dest);

        let output = Command::new("ffmpeg")
            .arg("-y")
            .arg("-v")
            .arg("error")
            .args(args)
            .arg("-vn")
            .arg("-acodec")
            .arg("pcm_s16le")
            .arg("-ar")
            .arg(TARGET_SAMPLE_RATE.to_string())
            .arg("-ac")
            .arg("1")
            .arg("-f")
            .arg("wav")
            .arg(&temp)
            .output()?;

        if !output.status.success() {
            let _ = std::fs::remove_file(&temp);
            let reason = String::from_utf8_lossy(&output.stderr).to_string();
            error!("❌ ffmpeg failed on {}: {}", input.display(), reason.trim());
            return Err(AudioError::Transcode {
                path: input.to_path_buf(),
                reason,
            });
        }

        cache::persist(&temp, dest)?;
        Ok(())
    }
}

impl MediaCutter for FfmpegCutter {
    fn extract_audio(&self, video: &Path, dest: &Path) -> Result<(), AudioError> {
        info!("🎵 Extracting audio: {} -> {}", video.display(), dest.display());
        Self::run(&["-i".as_ref(), video.as_os_str()], video, dest)
    }

    fn cut(
        &self,
        audio: &Path,
        start: f64,
        end: Option<f64>,
        dest: &Path,
    ) -> Result<(), AudioError> {
        debug!("✂️ Cutting {:.2}s..{:?} from {}", start, end, audio.display());
        let start = format!("{:.3}", start);
        let end = end.map(|e| format!("{:.3}", e));

        let mut args: Vec<&std::ffi::OsStr> =
            vec!["-i".as_ref(), audio.as_os_str(), "-ss".as_ref(), start.as_ref()];
        if let Some(end) = end.as_deref() {
            args.push("-to".as_ref());
            args.push(end.as_ref());
        }
        Self::run(&args, audio, dest)
    }
}
