use serde::ser::{SerializeMap, SerializeStruct, Serializer};
use serde::Serialize;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::core::audio::SegmentTranscript;
use crate::core::video::VideoInfo;
use crate::core::CombinedSlide;
use crate::frame_extractor::{MergedBlock, Point};

/// 一次运行的最终结果，写入 `slides.json`
#[derive(Debug, Clone)]
pub struct LectureReport {
    pub job_id: Uuid,
    pub video_path: PathBuf,
    pub video: VideoInfo,
    pub slides: Vec<CombinedSlide>,
}

impl LectureReport {
    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    /// 转写失败的片段数
    pub fn failed_segments(&self) -> usize {
        self.slides
            .iter()
            .filter(|s| s.segment.transcript.is_failed())
            .count()
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Serialize for LectureReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("LectureReport", 4)?;
        state.serialize_field("job_id", &self.job_id)?;
        state.serialize_field("video_path", &self.video_path)?;
        state.serialize_field("video", &self.video)?;
        state.serialize_field(
            "slides",
            &Indexed(self.slides.iter().map(SlideEntry::from).collect()),
        )?;
        state.end()
    }
}

/// 以 "0".."N-1" 为键的有序对象
struct Indexed<T>(Vec<T>);

impl<T: Serialize> Serialize for Indexed<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (i, item) in self.0.iter().enumerate() {
            map.serialize_entry(&i.to_string(), item)?;
        }
        map.end()
    }
}

#[derive(Serialize)]
struct SlideEntry<'a> {
    blocks: Indexed<BlockEntry<'a>>,
    pts: f64,
    image: &'a Path,
    /// 转写失败时为 null
    speech_text: Option<&'a str>,
    time_window: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorEntry<'a>>,
}

impl<'a> From<&'a CombinedSlide> for SlideEntry<'a> {
    fn from(combined: &'a CombinedSlide) -> Self {
        let transcript = &combined.segment.transcript;
        let error = match transcript {
            SegmentTranscript::Transcribed(_) => None,
            SegmentTranscript::Failed { kind, message } => Some(ErrorEntry {
                kind: kind.as_str(),
                message,
            }),
        };

        Self {
            blocks: Indexed(combined.slide.blocks.iter().map(BlockEntry::from).collect()),
            pts: combined.slide.pts,
            image: &combined.slide.image,
            speech_text: transcript.text(),
            time_window: combined.time_window(),
            error,
        }
    }
}

#[derive(Serialize)]
struct BlockEntry<'a> {
    text: &'a str,
    bbox: BboxEntry,
    font_size: i64,
    is_title: bool,
}

impl<'a> From<&'a MergedBlock> for BlockEntry<'a> {
    fn from(block: &'a MergedBlock) -> Self {
        Self {
            text: &block.text,
            bbox: BboxEntry {
                lt: block.bbox.lt(),
                rt: block.bbox.rt(),
                rb: block.bbox.rb(),
                lb: block.bbox.lb(),
            },
            font_size: block.font_size_int(),
            is_title: block.is_title,
        }
    }
}

#[derive(Serialize)]
struct BboxEntry {
    lt: Point,
    rt: Point,
    rb: Point,
    lb: Point,
}

#[derive(Serialize)]
struct ErrorEntry<'a> {
    kind: &'static str,
    message: &'a str,
}
