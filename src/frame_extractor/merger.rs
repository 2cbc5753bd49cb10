//! 文字片段合并 - 把同一行/同一段落的检测结果拼成文字块

use log::debug;

use super::region::{Detection, MergedBlock, TextRegion};
use crate::core::config::MergeConfig;

pub struct TextRegionMerger {
    config: MergeConfig,
}

impl TextRegionMerger {
    pub fn new() -> Self {
        Self::with_config(MergeConfig::default())
    }

    pub fn with_config(config: MergeConfig) -> Self {
        Self { config }
    }

    /// 按输入顺序遍历，只与当前块比较
    pub fn merge(&self, detections: Vec<Detection>, canvas_width: u32) -> Vec<MergedBlock> {
        let mut blocks: Vec<MergedBlock> = Vec::new();

        for detection in detections {
            let Some(region) = TextRegion::from_detection(detection, canvas_width) else {
                continue;
            };

            if region.font_size < self.config.min_font_size {
                debug!(
                    "drop small text {:?} (font size {:.1})",
                    region.text, region.font_size
                );
                continue;
            }

            match blocks.last_mut() {
                Some(current) if self.should_merge(current, &region) => current.absorb(region),
                _ => blocks.push(MergedBlock::from(region)),
            }
        }

        blocks
    }

    /// 字号接近，且垂直间距小于下方文字框的字符高度
    pub fn should_merge(&self, current: &MergedBlock, next: &TextRegion) -> bool {
        if (current.font_size - next.font_size).abs() >= self.config.font_size_diff {
            return false;
        }

        let (upper, lower) = if current.bbox.center_y() < next.bbox.center_y() {
            (&current.bbox, &next.bbox)
        } else {
            (&next.bbox, &current.bbox)
        };

        let gap = lower.top() - upper.bottom();
        gap < lower.height()
    }
}

impl Default for TextRegionMerger {
    fn default() -> Self {
        Self::new()
    }
}
