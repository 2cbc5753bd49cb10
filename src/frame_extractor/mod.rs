//! 幻灯片提取器 - 从讲座视频的采样帧中切分出幻灯片
//!
//! 核心策略：
//! 1. 文字检测 - 每个采样帧交给文字检测引擎
//! 2. 片段合并 - 按字号与垂直间距把片段拼成行/段落
//! 3. 状态机驱动 - 文字相似度决定是同一张幻灯片还是切换
//! 4. 定稿 - 标记标题并保存带文字框的截图

pub mod annotate;
pub mod deduplicator;
pub mod merger;
pub mod pipeline;
pub mod region;
pub mod similarity;
pub mod state_machine;
pub mod text_detector;

pub use deduplicator::{filtered_text, mark_titles, SlideDeck, SlideDeduplicator, SlideRecord};
pub use merger::TextRegionMerger;
pub use pipeline::SlideExtractor;
pub use region::{Detection, MergedBlock, Point, Quad, TextRegion};
pub use similarity::{TextSimilarity, TfIdfCosine};
pub use state_machine::{SlideAction, SlideState, SlideStateMachine};
pub use text_detector::{parse_tsv, MockTextDetector, TesseractDetector, TextDetector};
