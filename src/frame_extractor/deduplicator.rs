//! 幻灯片去重 - 相邻采样帧文字相似则视为同一张幻灯片

use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use super::annotate;
use super::region::MergedBlock;
use super::similarity::TextSimilarity;
use super::state_machine::{SlideAction, SlideStateMachine};
use crate::core::cache::{self, CacheLayout};
use crate::core::config::DedupConfig;
use crate::core::video::{Frame, VideoError};

// 数字、ASCII 标点与常见中文标点
static NOISE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r##"[0-9’!"#$%&'()*+,\-./:;<=>?@，。★、…【】《》？“”‘’！\[\\\]^_`{|}~]+"##)
        .expect("valid noise regex")
});

/// 每段噪声字符替换为一个空格
pub fn filtered_text(text: &str) -> String {
    NOISE_RE.replace_all(text, " ").into_owned()
}

/// 字号（取整后）等于最大值的块都是标题
pub fn mark_titles(blocks: &mut [MergedBlock]) {
    let Some(max) = blocks.iter().map(MergedBlock::font_size_int).max() else {
        return;
    };
    for block in blocks.iter_mut() {
        block.is_title = block.font_size_int() == max;
    }
}

/// 已定稿的幻灯片
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideRecord {
    pub index: usize,
    pub blocks: Vec<MergedBlock>,
    /// 最后一次刷新该幻灯片的帧时间
    pub pts: f64,
    /// 打开该幻灯片的帧时间，即边界
    pub opened_at: f64,
    pub image: PathBuf,
}

/// 第一阶段的完整产出，音频阶段只在拿到它之后开始
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlideDeck {
    pub slides: Vec<SlideRecord>,
}

impl SlideDeck {
    pub fn boundaries(&self) -> Vec<f64> {
        self.slides.iter().map(|s| s.opened_at).collect()
    }

    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }
}

struct OpenSlide {
    blocks: Vec<MergedBlock>,
    opened_at: f64,
    pts: f64,
    filtered_text: String,
}

pub struct SlideDeduplicator {
    machine: SlideStateMachine,
    scorer: Arc<dyn TextSimilarity>,
    config: DedupConfig,
    cache: CacheLayout,
    slides: Vec<SlideRecord>,
    open: Option<OpenSlide>,
    /// 最近一个被接受的采样帧，幻灯片切换时作为上一张的截图
    last_frame: Option<Frame>,
}

impl SlideDeduplicator {
    pub fn new(scorer: Arc<dyn TextSimilarity>, config: DedupConfig, cache: CacheLayout) -> Self {
        Self {
            machine: SlideStateMachine::with_config(config.clone()),
            scorer,
            config,
            cache,
            slides: Vec::new(),
            open: None,
            last_frame: None,
        }
    }

    pub fn submit(
        &mut self,
        blocks: Vec<MergedBlock>,
        frame: &Frame,
    ) -> Result<SlideAction, VideoError> {
        let text = blocks
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let filtered = filtered_text(&text);
        let has_content =
            !blocks.is_empty() && filtered.chars().count() >= self.config.min_content_chars;

        let similarity = match &self.open {
            Some(open) if has_content => Some(self.scorer.score(&open.filtered_text, &filtered)),
            _ => None,
        };

        let action = self.machine.process_frame(frame.pts, has_content, similarity);
        match action {
            SlideAction::Skip => {
                debug!("frame at {:.2}s has no usable text, skipped", frame.pts);
                return Ok(action);
            }
            SlideAction::Open => {
                info!("📄 Slide 0 opened at {:.2}s", frame.pts);
            }
            SlideAction::Refresh => {
                debug!(
                    "frame at {:.2}s matches open slide (similarity {:.3})",
                    frame.pts,
                    similarity.unwrap_or_default()
                );
            }
            SlideAction::Transition => {
                if let (Some(open), Some(previous)) = (self.open.take(), self.last_frame.take()) {
                    self.finalize(open, &previous)?;
                }
                info!(
                    "📄 Slide {} opened at {:.2}s (similarity {:.3})",
                    self.slides.len(),
                    frame.pts,
                    similarity.unwrap_or_default()
                );
            }
        }

        if action == SlideAction::Refresh {
            // 后出现的帧覆盖内容，打开时间不变
            if let Some(open) = self.open.as_mut() {
                open.blocks = blocks;
                open.pts = frame.pts;
                open.filtered_text = filtered;
            }
        } else {
            self.open = Some(OpenSlide {
                blocks,
                opened_at: frame.pts,
                pts: frame.pts,
                filtered_text: filtered,
            });
        }
        self.last_frame = Some(frame.clone());

        Ok(action)
    }

    /// 流结束：用最后解码的帧给仍打开的幻灯片截图
    pub fn finish(mut self, last_decoded: Option<&Frame>) -> Result<SlideDeck, VideoError> {
        if let Some(open) = self.open.take() {
            let snapshot = match last_decoded {
                Some(frame) => frame.clone(),
                None => self.last_frame.take().ok_or_else(|| {
                    VideoError::Decode("open slide has no frame to snapshot".into())
                })?,
            };
            self.finalize(open, &snapshot)?;
        }

        info!("✅ Slide extraction finished: {} slides", self.slides.len());
        Ok(SlideDeck {
            slides: self.slides,
        })
    }

    pub fn slide_count(&self) -> usize {
        self.machine.slide_count()
    }

    fn finalize(&mut self, open: OpenSlide, snapshot: &Frame) -> Result<(), VideoError> {
        let OpenSlide {
            mut blocks,
            opened_at,
            pts,
            ..
        } = open;
        mark_titles(&mut blocks);

        let mut image = snapshot.to_image()?;
        if self.config.annotate_snapshots {
            annotate::draw_blocks(&mut image, &blocks);
        }
        let bytes = annotate::encode_jpeg(&image)?;

        self.cache.ensure()?;
        let path = self.cache.snapshot_path(snapshot.pts);
        cache::write_atomic(&path, &bytes)?;
        debug!("🖼️ Snapshot saved: {}", path.display());

        self.slides.push(SlideRecord {
            index: self.slides.len(),
            blocks,
            pts,
            opened_at,
            image: path,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame_extractor::region::Quad;
    use crate::frame_extractor::similarity::TfIdfCosine;
    use std::path::Path;

    fn block(text: &str, font_size: f64) -> MergedBlock {
        MergedBlock {
            text: text.into(),
            bbox: Quad::from_rect(4.0, 4.0, 40.0, 12.0),
            font_size,
            is_title: false,
        }
    }

    fn dedup(dir: &Path) -> SlideDeduplicator {
        SlideDeduplicator::new(
            Arc::new(TfIdfCosine),
            DedupConfig::default(),
            CacheLayout::for_video(dir, Path::new("lecture.mp4")),
        )
    }

    fn frame(pts: f64) -> Frame {
        Frame::filled(64, 48, 255, pts, (pts * 10.0) as u64)
    }

    #[test]
    fn test_filtered_text() {
        assert_eq!(filtered_text("Week 3: Graphs!"), "Week   Graphs ");
        assert_eq!(filtered_text("【第一章】"), " 第一章 ");
        assert_eq!(filtered_text("LOGO2024").chars().count(), 5);
    }

    #[test]
    fn test_mark_titles_ties_all_win() {
        let mut blocks = vec![block("a", 30.2), block("b", 20.0), block("c", 30.9)];
        mark_titles(&mut blocks);
        assert!(blocks[0].is_title);
        assert!(!blocks[1].is_title);
        assert!(blocks[2].is_title);

        let mut single = vec![block("only", 14.0)];
        mark_titles(&mut single);
        assert!(single[0].is_title);
    }

    #[test]
    fn test_identical_frames_stay_one_slide() {
        let dir = tempfile::tempdir().unwrap();
        let mut dedup = dedup(dir.path());
        let blocks = vec![block("Introduction to distributed systems", 30.0)];

        assert_eq!(dedup.submit(blocks.clone(), &frame(0.0)).unwrap(), SlideAction::Open);
        assert_eq!(dedup.submit(blocks.clone(), &frame(5.0)).unwrap(), SlideAction::Refresh);

        let deck = dedup.finish(Some(&frame(9.9))).unwrap();
        assert_eq!(deck.len(), 1);
        assert_eq!(deck.slides[0].pts, 5.0);
        assert_eq!(deck.slides[0].opened_at, 0.0);
        assert!(deck.slides[0].blocks[0].is_title);
        assert_eq!(deck.slides[0].image, dir.path().join("lecture").join("frame_9.90.jpg"));
        assert!(deck.slides[0].image.is_file());
    }

    #[test]
    fn test_short_text_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut dedup = dedup(dir.path());

        let action = dedup.submit(vec![block("LOGO2024", 20.0)], &frame(0.0)).unwrap();
        assert_eq!(action, SlideAction::Skip);
        assert_eq!(dedup.submit(Vec::new(), &frame(5.0)).unwrap(), SlideAction::Skip);
        assert_eq!(dedup.slide_count(), 0);

        let deck = dedup.finish(Some(&frame(10.0))).unwrap();
        assert!(deck.is_empty());
    }

    #[test]
    fn test_transition_snapshots_previous_frame() {
        let dir = tempfile::tempdir().unwrap();
        let mut dedup = dedup(dir.path());

        dedup
            .submit(vec![block("Course logistics and grading policy", 30.0)], &frame(0.0))
            .unwrap();
        dedup
            .submit(vec![block("Course logistics and grading policy", 30.0)], &frame(5.0))
            .unwrap();
        let action = dedup
            .submit(vec![block("Binary search trees insertion deletion", 30.0)], &frame(10.0))
            .unwrap();
        assert_eq!(action, SlideAction::Transition);

        let deck = dedup.finish(Some(&frame(14.5))).unwrap();
        assert_eq!(deck.len(), 2);
        assert_eq!(deck.boundaries(), vec![0.0, 10.0]);
        assert!(deck.slides[0].image.ends_with("frame_5.00.jpg"));
        assert!(deck.slides[1].image.ends_with("frame_14.50.jpg"));
        assert_eq!(deck.slides[1].index, 1);
    }
}
