//! 讲座处理器 - 幻灯片提取 + 分段转写

use log::{info, warn};
use std::sync::Arc;

use super::models::LectureReport;
use crate::core::audio::{
    AudioSegment, AudioSegmenter, FfmpegCutter, LazyRecognizer, MediaCutter, SpeechRecognizer,
    WhisperCliRecognizer,
};
use crate::core::cache;
use crate::core::video::{FfmpegDecoder, FrameSampler, FrameSource, VideoInfo};
use crate::core::{align, LectureJob, PipelineConfig, PipelineError};
use crate::frame_extractor::{
    SlideDeck, SlideExtractor, TesseractDetector, TextDetector, TextSimilarity, TfIdfCosine,
};

/// 讲座处理器 - 两阶段流水线
///
/// 第一阶段顺序解码视频得到完整的幻灯片列表，之后才进入第二阶段，
/// 按幻灯片边界切分音轨并行转写，最后按序号对齐。
///
/// ```no_run
/// use lecture_lib::{LectureProcessor, PipelineConfig};
/// use lecture_lib::core::LectureJob;
/// use std::path::Path;
///
/// let config = PipelineConfig::default();
/// let processor = LectureProcessor::with_defaults(config.clone())?;
/// let job = LectureJob::new(Some(Path::new("lecture.mp4")), &config.cache_dir)?;
/// let report = processor.run(&job)?;
/// println!("{}", report.to_json_pretty()?);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct LectureProcessor {
    config: PipelineConfig,
    detector: Box<dyn TextDetector>,
    segmenter: AudioSegmenter,
    similarity: Arc<dyn TextSimilarity>,
}

impl LectureProcessor {
    pub fn new(
        config: PipelineConfig,
        detector: Box<dyn TextDetector>,
        cutter: Box<dyn MediaCutter>,
        recognizer: Box<dyn SpeechRecognizer>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        info!(
            "🎬 LectureProcessor: created (interval {:.2}s, {} audio workers)",
            config.sampler.interval_secs, config.audio.workers
        );
        let segmenter = AudioSegmenter::new(cutter, recognizer, config.audio.clone());
        Ok(Self {
            config,
            detector,
            segmenter,
            similarity: Arc::new(TfIdfCosine),
        })
    }

    /// tesseract + ffmpeg + whisper，模型在第一段转写时才加载
    pub fn with_defaults(config: PipelineConfig) -> Result<Self, PipelineError> {
        let audio = config.audio.clone();
        let recognizer =
            LazyRecognizer::new(move || default_recognizer(&audio.model, &audio.language));
        Self::new(
            config,
            Box::new(TesseractDetector::default()),
            Box::new(FfmpegCutter),
            Box::new(recognizer),
        )
    }

    pub fn with_similarity(mut self, similarity: Arc<dyn TextSimilarity>) -> Self {
        self.similarity = similarity;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// 探测并解码 `job.video_path`
    pub fn run(&self, job: &LectureJob) -> Result<LectureReport, PipelineError> {
        let info = VideoInfo::probe(&job.video_path)?;
        let source = FfmpegDecoder::with_info(&job.video_path, info)?;
        self.run_with_source(job, source)
    }

    pub fn run_with_source<S: FrameSource>(
        &self,
        job: &LectureJob,
        source: S,
    ) -> Result<LectureReport, PipelineError> {
        info!("🚀 Job {}: {}", job.id, job.video_path.display());
        let video = source.info().clone();

        let deck = self.extract_slides(job, source)?;

        // 第一阶段全部完成后才开始切音频
        if job.cancel.is_cancelled() {
            return Err(PipelineError::Cancelled {
                stage: "video",
                completed: deck.len(),
            });
        }

        let segments = if deck.is_empty() {
            warn!("⚠️ No slides detected in {}, skipping audio", job.video_path.display());
            Vec::new()
        } else {
            self.transcribe_segments(job, &deck)?
        };

        let report = LectureReport {
            job_id: job.id,
            video_path: job.video_path.clone(),
            video,
            slides: align(deck, segments)?,
        };

        job.cache.ensure()?;
        let path = job.cache.report_path();
        cache::write_atomic(&path, report.to_json_pretty()?.as_bytes())?;
        info!(
            "✅ Job {}: {} slides written to {}",
            job.id,
            report.slide_count(),
            path.display()
        );
        Ok(report)
    }

    /// 第一阶段：采样 → 文字检测 → 幻灯片切分
    pub fn extract_slides<S: FrameSource>(
        &self,
        job: &LectureJob,
        source: S,
    ) -> Result<SlideDeck, PipelineError> {
        job.cache.ensure()?;
        let extractor =
            SlideExtractor::with_similarity(&self.config, job.cache.clone(), self.similarity.clone());
        let mut sampler = FrameSampler::new(&self.config.sampler);

        let deck = sampler.run(source, self.detector.as_ref(), extractor, &job.cancel)?;
        info!(
            "📑 {} slides from {} sampled frames",
            deck.len(),
            sampler.sampled_count()
        );
        Ok(deck)
    }

    /// 第二阶段：按幻灯片边界切分并转写
    pub fn transcribe_segments(
        &self,
        job: &LectureJob,
        deck: &SlideDeck,
    ) -> Result<Vec<AudioSegment>, PipelineError> {
        let track = self
            .segmenter
            .prepare_track(&job.video_path, &job.cache, job.force)?;
        let segments = self.segmenter.transcribe(
            &track,
            &deck.boundaries(),
            &job.cache,
            job.force,
            &job.cancel,
        )?;
        Ok(segments)
    }
}

impl Drop for LectureProcessor {
    fn drop(&mut self) {
        info!("🗑️ LectureProcessor: released");
    }
}

#[cfg(feature = "whisper")]
fn default_recognizer(
    model: &str,
    language: &str,
) -> Result<Box<dyn SpeechRecognizer>, crate::core::audio::AudioError> {
    let path = std::path::Path::new(model);
    if path.is_file() {
        return Ok(Box::new(crate::core::audio::WhisperHandle::new(path, language)?));
    }
    Ok(Box::new(WhisperCliRecognizer::new(model, language)))
}

#[cfg(not(feature = "whisper"))]
fn default_recognizer(
    model: &str,
    language: &str,
) -> Result<Box<dyn SpeechRecognizer>, crate::core::audio::AudioError> {
    Ok(Box::new(WhisperCliRecognizer::new(model, language)))
}
