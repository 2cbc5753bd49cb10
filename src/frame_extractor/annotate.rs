//! 在幻灯片截图上绘制文字框

use image::{ImageOutputFormat, Rgb, RgbImage};
use std::io::Cursor;

use super::region::{MergedBlock, Point, Quad};
use crate::core::video::VideoError;

pub const TITLE_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
pub const BODY_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const THICKNESS: i64 = 2;
const JPEG_QUALITY: u8 = 90;

/// 标题红色，其余绿色
pub fn draw_blocks(image: &mut RgbImage, blocks: &[MergedBlock]) {
    for block in blocks {
        let color = if block.is_title {
            TITLE_COLOR
        } else {
            BODY_COLOR
        };
        draw_quad(image, &block.bbox, color);
    }
}

fn draw_quad(image: &mut RgbImage, quad: &Quad, color: Rgb<u8>) {
    for i in 0..4 {
        draw_line(image, quad.0[i], quad.0[(i + 1) % 4], color);
    }
}

// Bresenham，每个点画 THICKNESS×THICKNESS 的方块，超出画布的部分裁掉
fn draw_line(image: &mut RgbImage, from: Point, to: Point, color: Rgb<u8>) {
    let (mut x0, mut y0) = (from.x.round() as i64, from.y.round() as i64);
    let (x1, y1) = (to.x.round() as i64, to.y.round() as i64);

    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        stamp(image, x0, y0, color);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

fn stamp(image: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    let (width, height) = (image.width() as i64, image.height() as i64);
    let offset = THICKNESS / 2;
    for py in (y - offset)..(y - offset + THICKNESS) {
        for px in (x - offset)..(x - offset + THICKNESS) {
            if px >= 0 && py >= 0 && px < width && py < height {
                image.put_pixel(px as u32, py as u32, color);
            }
        }
    }
}

pub fn encode_jpeg(image: &RgbImage) -> Result<Vec<u8>, VideoError> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageOutputFormat::Jpeg(JPEG_QUALITY))?;
    Ok(buffer.into_inner())
}
