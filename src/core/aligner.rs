//! 幻灯片与音频片段对齐

use log::{error, info};

use super::audio::AudioSegment;
use super::error::PipelineError;
use crate::frame_extractor::{SlideDeck, SlideRecord};

const EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub struct CombinedSlide {
    pub slide: SlideRecord,
    pub segment: AudioSegment,
}

impl CombinedSlide {
    pub fn index(&self) -> usize {
        self.slide.index
    }

    pub fn time_window(&self) -> String {
        self.segment.time_window()
    }
}

/// 按序号配对，配对前校验两边的边界一致
///
/// 第 i 段必须从第 i 张幻灯片的打开时间开始（第 0 段从 0 开始），
/// 且各段首尾相接。任一条件不满足都返回 `Misalignment`。
pub fn align(
    deck: SlideDeck,
    segments: Vec<AudioSegment>,
) -> Result<Vec<CombinedSlide>, PipelineError> {
    let (slides, count) = (deck.slides, segments.len());
    let mismatch = |detail: String| {
        error!("❌ Misalignment: {}", detail);
        PipelineError::Misalignment {
            slides: slides.len(),
            segments: count,
            detail,
        }
    };

    if slides.len() != count {
        return Err(mismatch("slide and segment counts differ".into()));
    }

    // 晚于音轨结束才打开的幻灯片，其片段被截在音轨末尾
    let audio_end = segments.last().map(|s| s.end).unwrap_or(0.0);
    for (i, (slide, segment)) in slides.iter().zip(&segments).enumerate() {
        let expected_start = if i == 0 {
            0.0
        } else {
            slide.opened_at.min(audio_end)
        };
        if slide.index != i || segment.index != i {
            return Err(mismatch(format!(
                "position {} holds slide {} and segment {}",
                i, slide.index, segment.index
            )));
        }
        if segment.end + EPSILON < segment.start {
            return Err(mismatch(format!(
                "segment {} is reversed ({:.3}s-{:.3}s)",
                i, segment.start, segment.end
            )));
        }
        if (segment.start - expected_start).abs() > EPSILON {
            return Err(mismatch(format!(
                "segment {} starts at {:.3}s but slide opened at {:.3}s",
                i, segment.start, expected_start
            )));
        }
        if let Some(next) = segments.get(i + 1) {
            if (segment.end - next.start).abs() > EPSILON {
                return Err(mismatch(format!(
                    "gap between segment {} (ends {:.3}s) and {} (starts {:.3}s)",
                    i,
                    segment.end,
                    i + 1,
                    next.start
                )));
            }
        }
    }

    info!("🔗 Aligned {} slides with audio", count);
    Ok(slides
        .into_iter()
        .zip(segments)
        .map(|(slide, segment)| CombinedSlide { slide, segment })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::audio::SegmentTranscript;
    use std::path::PathBuf;

    fn slide(index: usize, opened_at: f64) -> SlideRecord {
        SlideRecord {
            index,
            blocks: Vec::new(),
            pts: opened_at + 1.0,
            opened_at,
            image: PathBuf::from(format!("frame_{:.2}.jpg", opened_at)),
        }
    }

    fn segment(index: usize, start: f64, end: f64) -> AudioSegment {
        AudioSegment {
            index,
            start,
            end,
            transcript: SegmentTranscript::Transcribed(format!("speech {}", index)),
        }
    }

    fn deck(opened: &[f64]) -> SlideDeck {
        SlideDeck {
            slides: opened.iter().enumerate().map(|(i, &t)| slide(i, t)).collect(),
        }
    }

    #[test]
    fn test_align_pairs_by_index() {
        let combined = align(
            deck(&[0.0, 10.0, 25.0]),
            vec![segment(0, 0.0, 10.0), segment(1, 10.0, 25.0), segment(2, 25.0, 40.0)],
        )
        .unwrap();

        assert_eq!(combined.len(), 3);
        assert_eq!(combined[2].index(), 2);
        assert_eq!(combined[2].time_window(), "25.00-40.00");
        assert_eq!(combined[1].segment.transcript.text(), Some("speech 1"));
    }

    #[test]
    fn test_first_slide_may_open_after_zero() {
        let combined = align(deck(&[5.0, 10.0]), vec![segment(0, 0.0, 10.0), segment(1, 10.0, 12.0)]);
        assert!(combined.is_ok());
    }

    #[test]
    fn test_count_mismatch_fails_fast() {
        let err = align(deck(&[0.0, 10.0]), vec![segment(0, 0.0, 30.0)]).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Misalignment {
                slides: 2,
                segments: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_boundary_mismatch_fails_fast() {
        let err = align(
            deck(&[0.0, 10.0]),
            vec![segment(0, 0.0, 12.0), segment(1, 12.0, 20.0)],
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Misalignment { .. }));
    }

    #[test]
    fn test_slide_opened_after_audio_end_aligns_to_end() {
        let combined = align(
            deck(&[0.0, 10.0, 30.0]),
            vec![
                segment(0, 0.0, 10.0),
                segment(1, 10.0, 29.98),
                segment(2, 29.98, 29.98),
            ],
        )
        .unwrap();
        assert_eq!(combined[2].time_window(), "29.98-29.98");
    }

    #[test]
    fn test_reversed_segment_fails_fast() {
        let err = align(
            deck(&[0.0, 10.0, 30.0]),
            vec![
                segment(0, 0.0, 10.0),
                segment(1, 10.0, 30.0),
                segment(2, 30.0, 29.98),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Misalignment { .. }));
    }

    #[test]
    fn test_empty_inputs_align() {
        assert!(align(SlideDeck::default(), Vec::new()).unwrap().is_empty());
    }
}
