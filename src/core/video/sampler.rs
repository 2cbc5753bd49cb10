//! 按固定间隔采样解码帧

use log::{debug, info, warn};

use super::decoder::FrameSource;
use super::frame::Frame;
use crate::core::config::SamplerConfig;
use crate::core::error::PipelineError;
use crate::core::job::CancelFlag;
use crate::frame_extractor::{SlideDeck, SlideExtractor, TextDetector};

pub struct FrameSampler {
    interval: f64,
    next_capture: f64,
    decoded: u64,
    sampled: u64,
}

impl FrameSampler {
    pub fn new(config: &SamplerConfig) -> Self {
        Self {
            interval: config.interval_secs,
            next_capture: 0.0,
            decoded: 0,
            sampled: 0,
        }
    }

    /// 用 ≥ 而不是相等判断，容忍不均匀的帧间隔
    pub fn should_sample(&mut self, pts: f64) -> bool {
        self.decoded += 1;
        if pts >= self.next_capture {
            self.next_capture += self.interval;
            self.sampled += 1;
            true
        } else {
            false
        }
    }

    /// 解码到流结束。`source` 在返回时释放，不论成功与否
    pub fn run<S: FrameSource>(
        &mut self,
        mut source: S,
        detector: &dyn TextDetector,
        mut extractor: SlideExtractor,
        cancel: &CancelFlag,
    ) -> Result<SlideDeck, PipelineError> {
        let interval = self.interval;
        info!(
            "🎞️ Sampling every {:.2}s ({:.1}s of video)",
            interval,
            source.info().duration
        );

        let mut last_frame: Option<Frame> = None;
        while let Some(frame) = source.next_frame()? {
            if cancel.is_cancelled() {
                warn!("🛑 Cancelled at {:.2}s", frame.pts);
                return Err(PipelineError::Cancelled {
                    stage: "video",
                    completed: extractor.slide_count(),
                });
            }

            if self.should_sample(frame.pts) {
                let action = extractor.process_frame(&frame, detector)?;
                debug!("sample at {:.2}s -> {:?}", frame.pts, action);
            }
            last_frame = Some(frame);
        }

        info!(
            "✅ Decoded {} frames, sampled {}",
            self.decoded, self.sampled
        );
        Ok(extractor.finish(last_frame.as_ref())?)
    }

    pub fn decoded_count(&self) -> u64 {
        self.decoded
    }

    pub fn sampled_count(&self) -> u64 {
        self.sampled
    }
}
