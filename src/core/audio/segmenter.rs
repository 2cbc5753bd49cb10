//! 按幻灯片边界切分音轨并逐段转写

use log::{debug, info, warn};
use rayon::prelude::*;
use std::fmt;
use std::path::{Path, PathBuf};

use super::cutter::MediaCutter;
use super::error::AudioError;
use super::recognizer::SpeechRecognizer;
use crate::core::cache::CacheLayout;
use crate::core::config::AudioConfig;
use crate::core::job::CancelFlag;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentErrorKind {
    Transcode,
    Recognition,
    Cancelled,
}

impl SegmentErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentErrorKind::Transcode => "transcode",
            SegmentErrorKind::Recognition => "recognition",
            SegmentErrorKind::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SegmentErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单段转写结果，失败不会伪装成文本
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentTranscript {
    Transcribed(String),
    Failed {
        kind: SegmentErrorKind,
        message: String,
    },
}

impl SegmentTranscript {
    pub fn text(&self) -> Option<&str> {
        match self {
            SegmentTranscript::Transcribed(text) => Some(text),
            SegmentTranscript::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SegmentTranscript::Failed { .. })
    }

    fn failed(kind: SegmentErrorKind, err: impl fmt::Display) -> Self {
        SegmentTranscript::Failed {
            kind,
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioSegment {
    pub index: usize,
    pub start: f64,
    pub end: f64,
    pub transcript: SegmentTranscript,
}

impl AudioSegment {
    /// `"start-end"`，两位小数
    pub fn time_window(&self) -> String {
        format!("{:.2}-{:.2}", self.start, self.end)
    }

    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

/// 第一段从 0 开始，之后每段从对应幻灯片的打开时间开始，最后一段到音轨结束
///
/// 第一张幻灯片的打开时间被 0 取代，因此段数与幻灯片数相同。
/// 视频比音轨长时，晚于音轨结束的边界被截到 `duration`，对应的段为空。
pub fn plan_segments(boundaries: &[f64], duration: f64) -> Vec<(f64, f64)> {
    if boundaries.is_empty() {
        return Vec::new();
    }
    let duration = duration.max(0.0);

    let starts: Vec<f64> = std::iter::once(0.0)
        .chain(boundaries.iter().skip(1).map(|&b| b.clamp(0.0, duration)))
        .collect();

    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(duration);
            (start, end)
        })
        .collect()
}

/// 整条音轨，已抽取并缓存
#[derive(Debug, Clone, PartialEq)]
pub struct AudioTrack {
    pub path: PathBuf,
    pub duration: f64,
}

pub struct AudioSegmenter {
    cutter: Box<dyn MediaCutter>,
    recognizer: Box<dyn SpeechRecognizer>,
    config: AudioConfig,
}

impl AudioSegmenter {
    pub fn new(
        cutter: Box<dyn MediaCutter>,
        recognizer: Box<dyn SpeechRecognizer>,
        config: AudioConfig,
    ) -> Self {
        Self {
            cutter,
            recognizer,
            config,
        }
    }

    /// 抽取整条音轨；缓存文件已存在时跳过（`force` 除外）
    pub fn prepare_track(
        &self,
        video: &Path,
        cache: &CacheLayout,
        force: bool,
    ) -> Result<AudioTrack, AudioError> {
        cache.ensure()?;
        let path = cache.audio_path();

        if !force && path.is_file() {
            info!("♻️ Reusing cached audio track {}", path.display());
        } else {
            self.cutter.extract_audio(video, &path)?;
        }

        let duration = self.cutter.duration(&path)?;
        info!("🎵 Audio track: {:.2}s", duration);
        Ok(AudioTrack { path, duration })
    }

    /// 先在有界线程池中并行切分各段，再把全部片段一次交给识别器，结果按段序返回
    pub fn transcribe(
        &self,
        track: &AudioTrack,
        boundaries: &[f64],
        cache: &CacheLayout,
        force: bool,
        cancel: &CancelFlag,
    ) -> Result<Vec<AudioSegment>, AudioError> {
        let plan = plan_segments(boundaries, track.duration);
        let last = plan.len().saturating_sub(1);
        info!(
            "🎙️ Transcribing {} segments with {} workers",
            plan.len(),
            self.config.workers
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers.max(1))
            .build()
            .map_err(|e| AudioError::WorkerPool(e.to_string()))?;

        let prepared: Vec<Prepared> = pool.install(|| {
            plan.par_iter()
                .enumerate()
                .map(|(index, &(start, end))| {
                    self.prepare_clip(track, index == last, start, end, cache, force, cancel)
                })
                .collect()
        });

        let clips: Vec<PathBuf> = prepared
            .iter()
            .filter_map(|p| match p {
                Prepared::Clip(clip) => Some(clip.clone()),
                Prepared::Done(_) => None,
            })
            .collect();

        // 识别器每次运行只调用一次，模型只加载一次
        let texts = if clips.is_empty() || cancel.is_cancelled() {
            Vec::new()
        } else {
            pool.install(|| self.recognizer.transcribe_batch(&clips))
        };
        let mut texts = texts.into_iter();

        let segments: Vec<AudioSegment> = plan
            .iter()
            .zip(prepared)
            .enumerate()
            .map(|(index, (&(start, end), prepared))| {
                let transcript = match prepared {
                    Prepared::Done(transcript) => transcript,
                    Prepared::Clip(_) => match texts.next() {
                        Some(Ok(text)) => {
                            debug!("📝 {:.2}-{:.2}: {} chars", start, end, text.len());
                            SegmentTranscript::Transcribed(text)
                        }
                        Some(Err(e)) => {
                            warn!("⚠️ Recognition {:.2}-{:.2} failed: {}", start, end, e);
                            SegmentTranscript::failed(SegmentErrorKind::Recognition, e)
                        }
                        None if cancel.is_cancelled() => SegmentTranscript::failed(
                            SegmentErrorKind::Cancelled,
                            "job cancelled",
                        ),
                        None => SegmentTranscript::failed(
                            SegmentErrorKind::Recognition,
                            "recognizer returned no result",
                        ),
                    },
                };
                AudioSegment {
                    index,
                    start,
                    end,
                    transcript,
                }
            })
            .collect();

        if cancel.is_cancelled() {
            let completed = segments.iter().filter(|s| !s.transcript.is_failed()).count();
            warn!("🛑 Audio phase cancelled after {} segments", completed);
            return Err(AudioError::Cancelled { completed });
        }

        let failed = segments.iter().filter(|s| s.transcript.is_failed()).count();
        if failed > 0 {
            warn!("⚠️ {} of {} segments failed", failed, segments.len());
        }
        info!("✅ Audio phase complete");
        Ok(segments)
    }

    #[allow(clippy::too_many_arguments)]
    fn prepare_clip(
        &self,
        track: &AudioTrack,
        is_last: bool,
        start: f64,
        end: f64,
        cache: &CacheLayout,
        force: bool,
        cancel: &CancelFlag,
    ) -> Prepared {
        if cancel.is_cancelled() {
            return Prepared::Done(SegmentTranscript::failed(
                SegmentErrorKind::Cancelled,
                "job cancelled",
            ));
        }
        if end <= start {
            debug!("segment {:.2}-{:.2} is empty", start, end);
            return Prepared::Done(SegmentTranscript::Transcribed(String::new()));
        }

        let clip = cache.segment_path(start, end);
        if force || !clip.is_file() {
            // 最后一段不指定结束时间，切到音轨末尾
            let cut_end = if is_last { None } else { Some(end) };
            if let Err(e) = self.cutter.cut(&track.path, start, cut_end, &clip) {
                warn!("⚠️ Cut {:.2}-{:.2} failed: {}", start, end, e);
                return Prepared::Done(SegmentTranscript::failed(SegmentErrorKind::Transcode, e));
            }
        } else {
            debug!("♻️ Reusing clip {}", clip.display());
        }
        Prepared::Clip(clip)
    }
}

/// 切分阶段的结果：已有定论，或待识别的片段文件
enum Prepared {
    Done(SegmentTranscript),
    Clip(PathBuf),
}
