use image::ImageOutputFormat;
use log::{debug, error, info};
use std::collections::BTreeMap;
use std::io::{Cursor, Write};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::region::{Detection, Quad};
use crate::core::video::{Frame, VideoError};

/// 文字检测引擎：返回一帧内的 (四点框, 文本, 置信度)
pub trait TextDetector: Send + Sync {
    fn detect(&self, frame: &Frame) -> Result<Vec<Detection>, VideoError>;
}

impl<T: TextDetector + ?Sized> TextDetector for Arc<T> {
    fn detect(&self, frame: &Frame) -> Result<Vec<Detection>, VideoError> {
        (**self).detect(frame)
    }
}

type Script = Box<dyn Fn(&Frame) -> Vec<Detection> + Send + Sync>;

pub struct MockTextDetector {
    script: Option<Script>,
    calls: AtomicUsize,
}

impl MockTextDetector {
    pub fn new() -> Self {
        Self {
            script: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_pattern<F>(pattern: F) -> Self
    where
        F: Fn(&Frame) -> Vec<Detection> + Send + Sync + 'static,
    {
        Self {
            script: Some(Box::new(pattern)),
            calls: AtomicUsize::new(0),
        }
    }

    /// `(起始秒, 检测结果)`，按 pts 取最后一个起始时间不晚于它的条目
    pub fn with_timeline(mut timeline: Vec<(f64, Vec<Detection>)>) -> Self {
        timeline.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self::with_pattern(move |frame| {
            timeline
                .iter()
                .rev()
                .find(|(start, _)| *start <= frame.pts)
                .map(|(_, detections)| detections.clone())
                .unwrap_or_default()
        })
    }

    /// detect 被调用的次数
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockTextDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl TextDetector for MockTextDetector {
    fn detect(&self, frame: &Frame) -> Result<Vec<Detection>, VideoError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .script
            .as_ref()
            .map(|script| script(frame))
            .unwrap_or_default())
    }
}

/// 调用 tesseract 命令行，按行输出检测结果
pub struct TesseractDetector {
    language: String,
}

/// 全自动版面分析
const PAGE_SEG_MODE: &str = "3";

impl TesseractDetector {
    pub fn new(language: &str) -> Self {
        info!("🔤 TesseractDetector: language {}", language);
        Self {
            language: language.to_string(),
        }
    }

    fn encode_png(frame: &Frame) -> Result<Vec<u8>, VideoError> {
        let image = frame.to_image()?;
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, ImageOutputFormat::Png)?;
        Ok(buffer.into_inner())
    }
}

impl Default for TesseractDetector {
    fn default() -> Self {
        Self::new("eng")
    }
}

impl TextDetector for TesseractDetector {
    fn detect(&self, frame: &Frame) -> Result<Vec<Detection>, VideoError> {
        let png = Self::encode_png(frame)?;

        let mut child = Command::new("tesseract")
            .arg("stdin")
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg(PAGE_SEG_MODE)
            .arg("tsv")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| VideoError::Ocr(format!("failed to start tesseract: {}", e)))?;

        // tesseract 读完整张图才开始输出
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&png)?;
        }
        let output = child.wait_with_output()?;

        if !output.status.success() {
            let reason = String::from_utf8_lossy(&output.stderr).to_string();
            error!("❌ tesseract failed on frame {}: {}", frame.frame_number, reason);
            return Err(VideoError::Ocr(reason));
        }

        let detections = parse_tsv(&String::from_utf8_lossy(&output.stdout));
        debug!(
            "frame {} ({:.2}s): {} text lines",
            frame.frame_number,
            frame.pts,
            detections.len()
        );
        Ok(detections)
    }
}

#[derive(Default)]
struct LineAcc {
    words: Vec<String>,
    left: f64,
    top: f64,
    right: f64,
    bottom: f64,
    conf_sum: f32,
}

/// 解析 tesseract TSV，把同一行（page, block, par, line）的单词拼成一条检测结果
pub fn parse_tsv(tsv: &str) -> Vec<Detection> {
    let mut lines: BTreeMap<(u32, u32, u32, u32), LineAcc> = BTreeMap::new();

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.splitn(12, '\t').collect();
        if cols.len() < 12 || cols[0] != "5" {
            continue;
        }
        let text = cols[11].trim();
        if text.is_empty() {
            continue;
        }

        let num = |i: usize| cols[i].trim().parse::<u32>().ok();
        let (Some(page), Some(block), Some(par), Some(line)) = (num(1), num(2), num(3), num(4))
        else {
            continue;
        };
        let (Some(left), Some(top), Some(width), Some(height)) = (num(6), num(7), num(8), num(9))
        else {
            continue;
        };
        let conf = cols[10].trim().parse::<f32>().unwrap_or(0.0).max(0.0);

        let (left, top) = (left as f64, top as f64);
        let (right, bottom) = (left + width as f64, top + height as f64);

        let acc = lines.entry((page, block, par, line)).or_default();
        if acc.words.is_empty() {
            acc.left = left;
            acc.top = top;
            acc.right = right;
            acc.bottom = bottom;
        } else {
            acc.left = acc.left.min(left);
            acc.top = acc.top.min(top);
            acc.right = acc.right.max(right);
            acc.bottom = acc.bottom.max(bottom);
        }
        acc.words.push(text.to_string());
        acc.conf_sum += conf;
    }

    lines
        .into_values()
        .map(|acc| {
            let confidence = acc.conf_sum / acc.words.len() as f32 / 100.0;
            Detection::new(
                Quad::from_rect(acc.left, acc.top, acc.right, acc.bottom),
                acc.words.join(" "),
                confidence,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(text: &str) -> Detection {
        Detection::new(Quad::from_rect(0.0, 0.0, 100.0, 20.0), text, 0.9)
    }

    #[test]
    fn test_mock_detector_with_timeline() {
        let detector = MockTextDetector::with_timeline(vec![
            (10.0, vec![detection("second")]),
            (0.0, vec![detection("first")]),
        ]);

        let at = |pts: f64| detector.detect(&Frame::filled(4, 4, 0, pts, 0)).unwrap();
        assert_eq!(at(0.0)[0].text, "first");
        assert_eq!(at(9.99)[0].text, "first");
        assert_eq!(at(10.0)[0].text, "second");
        assert_eq!(at(25.0)[0].text, "second");
        assert_eq!(detector.calls(), 4);
    }

    #[test]
    fn test_mock_detector_default_is_empty() {
        let detector = MockTextDetector::new();
        assert!(detector.detect(&Frame::filled(4, 4, 0, 0.0, 0)).unwrap().is_empty());
    }

    #[test]
    fn test_parse_tsv_groups_words_into_lines() {
        let tsv = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext\n\
                   1\t1\t0\t0\t0\t0\t0\t0\t1280\t720\t-1\t\n\
                   4\t1\t1\t1\t1\t0\t100\t50\t300\t40\t-1\t\n\
                   5\t1\t1\t1\t1\t1\t100\t50\t120\t40\t96.5\tDynamic\n\
                   5\t1\t1\t1\t1\t2\t230\t52\t170\t38\t91.5\tProgramming\n\
                   5\t1\t1\t1\t2\t1\t100\t120\t80\t20\t80\tBellman\n\
                   5\t1\t1\t1\t2\t2\t190\t120\t10\t20\t-1\t \n";

        let detections = parse_tsv(tsv);
        assert_eq!(detections.len(), 2);

        assert_eq!(detections[0].text, "Dynamic Programming");
        assert_eq!(detections[0].bbox, Quad::from_rect(100.0, 50.0, 400.0, 90.0));
        assert!((detections[0].confidence - 0.94).abs() < 1e-6);

        assert_eq!(detections[1].text, "Bellman");
        assert!((detections[1].confidence - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_parse_tsv_ignores_malformed_rows() {
        assert!(parse_tsv("").is_empty());
        assert!(parse_tsv("header\n5\t1\tx\n").is_empty());
    }
}
