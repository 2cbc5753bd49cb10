//! 流水线配置 - 默认值 + JSON5 配置文件 + 预设

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::error::PipelineError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// 采样间隔（秒）
    pub interval_secs: f64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self { interval_secs: 5.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// 小于该字号的文字视为噪声（水印等）
    pub min_font_size: f64,
    /// 字号差小于该值才可合并
    pub font_size_diff: f64,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            min_font_size: 12.0,
            font_size_diff: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// 相似度高于该值视为同一张幻灯片
    pub similarity_threshold: f32,
    /// 过滤后文字少于该字符数的帧视为无内容
    pub min_content_chars: usize,
    /// 在截图上绘制文字框
    pub annotate_snapshots: bool,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.7,
            min_content_chars: 20,
            annotate_snapshots: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// 并发转写的线程数
    pub workers: usize,
    pub language: String,
    /// whisper 模型名（CLI）或模型文件路径（本地推理）
    pub model: String,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get().clamp(1, 4),
            language: "en".into(),
            model: "base".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub sampler: SamplerConfig,
    pub merge: MergeConfig,
    pub dedup: DedupConfig,
    pub audio: AudioConfig,
    pub cache_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sampler: SamplerConfig::default(),
            merge: MergeConfig::default(),
            dedup: DedupConfig::default(),
            audio: AudioConfig::default(),
            cache_dir: PathBuf::from("save"),
        }
    }
}

impl PipelineConfig {
    /// 翻页频繁的讲座
    pub fn for_dense_lectures() -> Self {
        Self {
            sampler: SamplerConfig { interval_secs: 2.5 },
            ..Default::default()
        }
    }

    /// 长时间停留在同一页的讲座
    pub fn for_sparse_lectures() -> Self {
        Self {
            sampler: SamplerConfig {
                interval_secs: 10.0,
            },
            ..Default::default()
        }
    }

    pub fn from_json5(content: &str) -> Result<Self, PipelineError> {
        let config: Self =
            json5::from_str(content).map_err(|e| PipelineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, PipelineError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json5(&content)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(self.sampler.interval_secs > 0.0) {
            return Err(PipelineError::Config(format!(
                "sampler.interval_secs must be positive, got {}",
                self.sampler.interval_secs
            )));
        }
        if !(0.0..=1.0).contains(&self.dedup.similarity_threshold) {
            return Err(PipelineError::Config(format!(
                "dedup.similarity_threshold must be within [0, 1], got {}",
                self.dedup.similarity_threshold
            )));
        }
        if self.audio.workers == 0 {
            return Err(PipelineError::Config("audio.workers must be at least 1".into()));
        }
        Ok(())
    }
}
