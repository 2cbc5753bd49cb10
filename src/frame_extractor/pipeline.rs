use std::sync::Arc;

use crate::core::cache::CacheLayout;
use crate::core::config::PipelineConfig;
use crate::core::video::{Frame, VideoError};
use crate::frame_extractor::deduplicator::{SlideDeck, SlideDeduplicator};
use crate::frame_extractor::merger::TextRegionMerger;
use crate::frame_extractor::similarity::{TextSimilarity, TfIdfCosine};
use crate::frame_extractor::state_machine::SlideAction;
use crate::frame_extractor::text_detector::TextDetector;

/// 单帧处理：检测 → 合并 → 去重
pub struct SlideExtractor {
    merger: TextRegionMerger,
    deduplicator: SlideDeduplicator,
    sampled: u64,
}

impl SlideExtractor {
    pub fn new(config: &PipelineConfig, cache: CacheLayout) -> Self {
        Self::with_similarity(config, cache, Arc::new(TfIdfCosine))
    }

    pub fn with_similarity(
        config: &PipelineConfig,
        cache: CacheLayout,
        scorer: Arc<dyn TextSimilarity>,
    ) -> Self {
        Self {
            merger: TextRegionMerger::with_config(config.merge.clone()),
            deduplicator: SlideDeduplicator::new(scorer, config.dedup.clone(), cache),
            sampled: 0,
        }
    }

    pub fn process_frame(
        &mut self,
        frame: &Frame,
        detector: &dyn TextDetector,
    ) -> Result<SlideAction, VideoError> {
        self.sampled += 1;
        let detections = detector.detect(frame)?;
        let blocks = self.merger.merge(detections, frame.width);
        self.deduplicator.submit(blocks, frame)
    }

    pub fn sampled_count(&self) -> u64 {
        self.sampled
    }

    pub fn slide_count(&self) -> usize {
        self.deduplicator.slide_count()
    }

    pub fn finish(self, last_decoded: Option<&Frame>) -> Result<SlideDeck, VideoError> {
        self.deduplicator.finish(last_decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame_extractor::region::{Detection, Quad};
    use crate::frame_extractor::text_detector::MockTextDetector;
    use std::path::Path;

    fn slide_text(lines: &[&str]) -> Vec<Detection> {
        lines
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let top = 40.0 + i as f64 * 120.0;
                let width = 24.0 * text.chars().count() as f64;
                Detection::new(Quad::from_rect(40.0, top, 40.0 + width, top + 24.0), *text, 0.9)
            })
            .collect()
    }

    #[test]
    fn test_extractor_full_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheLayout::for_video(dir.path(), Path::new("talk.mp4"));
        let mut extractor = SlideExtractor::new(&PipelineConfig::default(), cache);

        let detector = MockTextDetector::with_timeline(vec![
            (0.0, slide_text(&["Operating Systems", "Lecture four scheduling"])),
            (20.0, slide_text(&["Round robin quantum", "Context switch overhead"])),
        ]);

        let mut actions = Vec::new();
        for i in 0..6 {
            let frame = Frame::filled(1280, 720, 30, i as f64 * 5.0, i * 150);
            actions.push(extractor.process_frame(&frame, &detector).unwrap());
        }

        assert_eq!(
            actions,
            vec![
                SlideAction::Open,
                SlideAction::Refresh,
                SlideAction::Refresh,
                SlideAction::Refresh,
                SlideAction::Transition,
                SlideAction::Refresh,
            ]
        );
        assert_eq!(extractor.sampled_count(), 6);
        assert_eq!(extractor.slide_count(), 2);

        let deck = extractor.finish(None).unwrap();
        assert_eq!(deck.boundaries(), vec![0.0, 20.0]);
        assert_eq!(deck.slides[1].pts, 25.0);
        assert_eq!(detector.calls(), 6);
    }

    #[test]
    fn test_blank_frames_do_not_open_slides() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheLayout::for_video(dir.path(), Path::new("talk.mp4"));
        let mut extractor = SlideExtractor::new(&PipelineConfig::default(), cache);
        let detector = MockTextDetector::new();

        for i in 0..3 {
            let frame = Frame::filled(320, 240, 0, i as f64, i);
            assert_eq!(
                extractor.process_frame(&frame, &detector).unwrap(),
                SlideAction::Skip
            );
        }
        assert!(extractor.finish(None).unwrap().is_empty());
    }
}
