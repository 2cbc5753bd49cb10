use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn distance(&self, other: &Point) -> f64 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2)).sqrt()
    }
}

/// 四点文字框：左上、右上、右下、左下
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quad(pub [Point; 4]);

impl Quad {
    pub fn from_rect(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Quad([
            Point::new(left, top),
            Point::new(right, top),
            Point::new(right, bottom),
            Point::new(left, bottom),
        ])
    }

    pub fn lt(&self) -> Point {
        self.0[0]
    }

    pub fn rt(&self) -> Point {
        self.0[1]
    }

    pub fn rb(&self) -> Point {
        self.0[2]
    }

    pub fn lb(&self) -> Point {
        self.0[3]
    }

    /// 按矩形近似：上边长 × 右边长
    pub fn area(&self) -> f64 {
        let width = self.lt().distance(&self.rt());
        let height = self.rt().distance(&self.rb());
        width * height
    }

    pub fn top(&self) -> f64 {
        self.lt().y
    }

    pub fn bottom(&self) -> f64 {
        self.rb().y
    }

    /// 字符高度近似
    pub fn height(&self) -> f64 {
        self.rb().y - self.rt().y
    }

    pub fn center_y(&self) -> f64 {
        (self.lt().y + self.rb().y) / 2.0
    }

    /// 同时包含两个框的最小轴对齐矩形
    pub fn enclosing(&self, other: &Quad) -> Quad {
        let points = self.0.iter().chain(other.0.iter());
        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Quad::from_rect(min_x, min_y, max_x, max_y)
    }
}

/// 文字检测引擎的原始输出
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub bbox: Quad,
    pub text: String,
    pub confidence: f32,
}

impl Detection {
    pub fn new(bbox: Quad, text: impl Into<String>, confidence: f32) -> Self {
        Self {
            bbox,
            text: text.into(),
            confidence,
        }
    }
}

/// 带字号的单个文字片段，仅在合并过程中存在
#[derive(Debug, Clone, PartialEq)]
pub struct TextRegion {
    pub text: String,
    pub bbox: Quad,
    pub font_size: f64,
    pub confidence: f32,
}

impl TextRegion {
    /// 字号 = 1000 × sqrt(面积 / 字符数) / 画布宽度
    ///
    /// 空文本或画布宽度为 0 时返回 None
    pub fn from_detection(detection: Detection, canvas_width: u32) -> Option<Self> {
        let chars = detection.text.chars().count();
        if chars == 0 || canvas_width == 0 {
            return None;
        }
        let font_size = font_size_metric(&detection.bbox, chars, canvas_width);
        Some(Self {
            text: detection.text,
            bbox: detection.bbox,
            font_size,
            confidence: detection.confidence,
        })
    }
}

pub fn font_size_metric(bbox: &Quad, chars: usize, canvas_width: u32) -> f64 {
    let mean_char_width = (bbox.area() / chars as f64).sqrt();
    1000.0 * mean_char_width / canvas_width as f64
}

/// 合并后的文字块（一行或同一段落的多行）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedBlock {
    pub text: String,
    pub bbox: Quad,
    pub font_size: f64,
    pub is_title: bool,
}

impl MergedBlock {
    pub fn absorb(&mut self, region: TextRegion) {
        self.text.push(' ');
        self.text.push_str(&region.text);
        self.bbox = self.bbox.enclosing(&region.bbox);
        self.font_size = (self.font_size + region.font_size) / 2.0;
    }

    /// 输出用的整数字号（截断）
    pub fn font_size_int(&self) -> i64 {
        self.font_size as i64
    }
}

impl From<TextRegion> for MergedBlock {
    fn from(region: TextRegion) -> Self {
        Self {
            text: region.text,
            bbox: region.bbox,
            font_size: region.font_size,
            is_title: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quad_geometry() {
        let quad = Quad::from_rect(10.0, 20.0, 110.0, 60.0);
        assert_eq!(quad.area(), 4000.0);
        assert_eq!(quad.top(), 20.0);
        assert_eq!(quad.bottom(), 60.0);
        assert_eq!(quad.height(), 40.0);
        assert_eq!(quad.center_y(), 40.0);
    }

    #[test]
    fn test_rotated_quad_area() {
        // 45° 旋转的正方形，边长 sqrt(2)
        let quad = Quad([
            Point::new(1.0, 0.0),
            Point::new(2.0, 1.0),
            Point::new(1.0, 2.0),
            Point::new(0.0, 1.0),
        ]);
        assert!((quad.area() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_enclosing() {
        let a = Quad::from_rect(0.0, 0.0, 10.0, 10.0);
        let b = Quad::from_rect(5.0, 12.0, 30.0, 20.0);
        assert_eq!(a.enclosing(&b), Quad::from_rect(0.0, 0.0, 30.0, 20.0));
    }

    #[test]
    fn test_font_size_halves_when_canvas_doubles() {
        let bbox = Quad::from_rect(0.0, 0.0, 400.0, 40.0);
        let narrow = font_size_metric(&bbox, 10, 640);
        let wide = font_size_metric(&bbox, 10, 1280);
        assert!((narrow - 2.0 * wide).abs() < 1e-9);
        assert!((narrow - 1000.0 * 40.0 / 640.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_text_has_no_region() {
        let detection = Detection::new(Quad::from_rect(0.0, 0.0, 10.0, 10.0), "", 0.9);
        assert!(TextRegion::from_detection(detection, 1280).is_none());
    }

    #[test]
    fn test_font_size_int_truncates() {
        let block = MergedBlock {
            text: "x".into(),
            bbox: Quad::from_rect(0.0, 0.0, 1.0, 1.0),
            font_size: 31.9,
            is_title: false,
        };
        assert_eq!(block.font_size_int(), 31);
    }
}
