//! 视频元信息 - 通过 ffprobe 获取

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;

use super::error::VideoError;

/// 视频元信息，整个处理过程中只读
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub num_frames: u64,
    pub fps: f64,
    /// 秒
    pub duration: f64,
    pub bit_rate_kbps: f64,
    pub size_bytes: u64,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    nb_frames: Option<String>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
    bit_rate: Option<String>,
    size: Option<String>,
}

impl VideoInfo {
    /// 调用 ffprobe 读取容器元信息
    pub fn probe(path: &Path) -> Result<Self, VideoError> {
        info!("🔍 Probing video: {}", path.display());

        let output = Command::new("ffprobe")
            .arg("-v")
            .arg("error")
            .arg("-print_format")
            .arg("json")
            .arg("-show_format")
            .arg("-show_streams")
            .arg(path)
            .output()?;

        if !output.status.success() {
            return Err(VideoError::Probe {
                path: path.to_path_buf(),
                reason: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        let info = Self::from_probe_json(path, &String::from_utf8_lossy(&output.stdout))?;
        info!(
            "📊 Video: {}x{} @ {:.2} fps, {:.1}s, {} frames",
            info.width, info.height, info.fps, info.duration, info.num_frames
        );
        Ok(info)
    }

    pub(crate) fn from_probe_json(path: &Path, json: &str) -> Result<Self, VideoError> {
        let probe: ProbeOutput = serde_json::from_str(json)?;

        let stream = probe
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
            .ok_or_else(|| VideoError::NoVideoStream(path.to_path_buf()))?;

        let (width, height) = match (stream.width, stream.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
            _ => {
                return Err(VideoError::Probe {
                    path: path.to_path_buf(),
                    reason: "video stream has no dimensions".into(),
                })
            }
        };

        let fps = stream
            .r_frame_rate
            .as_deref()
            .and_then(parse_frame_rate)
            .ok_or_else(|| VideoError::Probe {
                path: path.to_path_buf(),
                reason: format!("invalid frame rate {:?}", stream.r_frame_rate),
            })?;

        let format = probe.format.as_ref();
        let duration = stream
            .duration
            .as_deref()
            .or_else(|| format.and_then(|f| f.duration.as_deref()))
            .and_then(|d| d.parse::<f64>().ok())
            .unwrap_or(0.0);

        let num_frames = match stream.nb_frames.as_deref().and_then(|n| n.parse::<u64>().ok()) {
            Some(n) => n,
            None => {
                warn!("⚠️ nb_frames missing, estimating from duration");
                (duration * fps).round() as u64
            }
        };

        let bit_rate_kbps = format
            .and_then(|f| f.bit_rate.as_deref())
            .and_then(|b| b.parse::<f64>().ok())
            .map(|b| b / 1000.0)
            .unwrap_or(0.0);
        let size_bytes = format
            .and_then(|f| f.size.as_deref())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0);

        Ok(Self {
            width,
            height,
            num_frames,
            fps,
            duration,
            bit_rate_kbps,
            size_bytes,
        })
    }
}

/// "30000/1001" -> 29.97
fn parse_frame_rate(rate: &str) -> Option<f64> {
    let (num, den) = match rate.split_once('/') {
        Some((n, d)) => (n.trim().parse::<f64>().ok()?, d.trim().parse::<f64>().ok()?),
        None => (rate.trim().parse::<f64>().ok()?, 1.0),
    };
    if num <= 0.0 || den <= 0.0 {
        return None;
    }
    Some(num / den)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROBE_JSON: &str = r#"{
        "streams": [
            {"codec_type": "audio", "duration": "61.0"},
            {"codec_type": "video", "width": 1280, "height": 720,
             "nb_frames": "1500", "r_frame_rate": "25/1", "duration": "60.0"}
        ],
        "format": {"duration": "61.0", "bit_rate": "1200000", "size": "9175040"}
    }"#;

    #[test]
    fn test_parse_probe_json() {
        let info = VideoInfo::from_probe_json(Path::new("lecture.mp4"), PROBE_JSON).unwrap();
        assert_eq!(info.width, 1280);
        assert_eq!(info.height, 720);
        assert_eq!(info.num_frames, 1500);
        assert_eq!(info.fps, 25.0);
        assert_eq!(info.duration, 60.0);
        assert_eq!(info.bit_rate_kbps, 1200.0);
        assert_eq!(info.size_bytes, 9175040);
    }

    #[test]
    fn test_no_video_stream() {
        let json = r#"{"streams": [{"codec_type": "audio"}], "format": {}}"#;
        let err = VideoInfo::from_probe_json(Path::new("talk.m4a"), json).unwrap_err();
        assert!(matches!(err, VideoError::NoVideoStream(_)));
    }

    #[test]
    fn test_missing_nb_frames_is_estimated() {
        let json = r#"{"streams": [{"codec_type": "video", "width": 640, "height": 360,
            "r_frame_rate": "30000/1001"}], "format": {"duration": "10.01"}}"#;
        let info = VideoInfo::from_probe_json(Path::new("a.webm"), json).unwrap();
        assert!((info.fps - 29.97).abs() < 0.01);
        assert_eq!(info.duration, 10.01);
        assert_eq!(info.num_frames, 300);
    }

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("25/1"), Some(25.0));
        assert_eq!(parse_frame_rate("24"), Some(24.0));
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("abc"), None);
    }
}
