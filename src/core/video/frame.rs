use image::RgbImage;

use super::error::VideoError;

/// 解码后的视频帧
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>, // RGB24 格式
    /// 显示时间戳（秒）
    pub pts: f64,
    pub frame_number: u64,
}

impl Frame {
    pub fn new(width: u32, height: u32, data: Vec<u8>, pts: f64, frame_number: u64) -> Self {
        Self {
            width,
            height,
            data,
            pts,
            frame_number,
        }
    }

    /// 纯色帧，测试与占位用
    pub fn filled(width: u32, height: u32, fill: u8, pts: f64, frame_number: u64) -> Self {
        Self::new(
            width,
            height,
            vec![fill; (width * height * 3) as usize],
            pts,
            frame_number,
        )
    }

    pub fn byte_len(width: u32, height: u32) -> usize {
        (width as usize) * (height as usize) * 3
    }

    pub fn to_image(&self) -> Result<RgbImage, VideoError> {
        RgbImage::from_raw(self.width, self.height, self.data.clone()).ok_or_else(|| {
            VideoError::Decode(format!(
                "frame {} has {} bytes, expected {}",
                self.frame_number,
                self.data.len(),
                Self::byte_len(self.width, self.height)
            ))
        })
    }
}
