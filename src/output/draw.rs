// 该文件是 Fenjian （分拣） 项目的一部分。
// src/output/draw.rs - 检测结果可视化
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use ab_glyph::{FontArc, InvalidFont, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::postprocess::BBox;

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 16.0;
const LABEL_OFFSET_Y: i32 = 10;
const BOX_THICKNESS: i32 = 2;
const BOX_COLOR: [u8; 3] = [0, 255, 0]; // 绿色

static FONT_DATA: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

/// 在图像上绘制边框与类别名称
pub struct Draw {
  font: FontArc,
  font_scale: PxScale,
  thickness: i32,
  color: Rgb<u8>,
}

impl Draw {
  pub fn new() -> Result<Self, InvalidFont> {
    let font = FontArc::try_from_slice(FONT_DATA)?;
    Ok(Self {
      font,
      font_scale: PxScale::from(LABEL_FONT_SIZE),
      thickness: BOX_THICKNESS,
      color: Rgb(BOX_COLOR),
    })
  }

  /// 绘制一个检测框，框外部分自动裁剪
  pub fn draw_bbox_with_label(&self, image: &mut RgbImage, bbox: &BBox, label: &str) {
    // 坐标限制在图像尺寸两倍的范围内，避免极端值在整数运算中溢出
    let span = (image.width().max(image.height()) as f32 + LABEL_FONT_SIZE) * 2.0;
    let clamp = |v: f32| -> i32 {
      if v.is_nan() {
        0
      } else {
        v.round().clamp(-span, span) as i32
      }
    };
    let x = clamp(bbox.x);
    let y = clamp(bbox.y);
    let w = clamp(bbox.w);
    let h = clamp(bbox.h);

    // 绘制边框（向内加粗）
    for t in 0..self.thickness {
      let (inner_w, inner_h) = (w - 2 * t, h - 2 * t);
      if inner_w <= 0 || inner_h <= 0 {
        break;
      }
      let rect = Rect::at(x + t, y + t).of_size(inner_w as u32, inner_h as u32);
      draw_hollow_rect_mut(image, rect, self.color);
    }

    // 文本基线位于左上角上方 10 像素处
    let text_y = y - LABEL_OFFSET_Y - LABEL_FONT_SIZE as i32;
    draw_text_mut(
      image,
      self.color,
      x,
      text_y,
      self.font_scale,
      &self.font,
      label,
    );
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const GREEN: Rgb<u8> = Rgb(BOX_COLOR);

  #[test]
  fn draws_box_border() {
    let draw = Draw::new().unwrap();
    let mut image = RgbImage::new(100, 100);
    draw.draw_bbox_with_label(&mut image, &BBox::new(20.0, 40.0, 30.0, 30.0), "dog");

    assert_eq!(*image.get_pixel(20, 40), GREEN);
    assert_eq!(*image.get_pixel(21, 41), GREEN);
    assert_eq!(*image.get_pixel(49, 69), GREEN);
    assert_eq!(*image.get_pixel(35, 55), Rgb([0, 0, 0]));
  }

  #[test]
  fn label_is_drawn_above_the_box() {
    let draw = Draw::new().unwrap();
    let mut image = RgbImage::new(200, 200);
    draw.draw_bbox_with_label(&mut image, &BBox::new(50.0, 100.0, 60.0, 60.0), "cat");

    let text_pixels = (50..110)
      .flat_map(|x| (70..94).map(move |y| (x, y)))
      .filter(|&(x, y)| *image.get_pixel(x, y) != Rgb([0, 0, 0]))
      .count();
    assert!(text_pixels > 0);
  }

  #[test]
  fn out_of_bounds_box_does_not_panic() {
    let draw = Draw::new().unwrap();
    let mut image = RgbImage::new(50, 50);
    draw.draw_bbox_with_label(&mut image, &BBox::new(-30.0, -30.0, 500.0, 500.0), "person");
    draw.draw_bbox_with_label(&mut image, &BBox::new(10.0, 10.0, 0.2, 0.2), "person");
  }

  #[test]
  fn extreme_geometry_does_not_overflow() {
    let draw = Draw::new().unwrap();
    let mut image = RgbImage::new(50, 50);
    let boxes = [
      BBox::new(-1e12, -1e12, 10.0, 10.0),
      BBox::new(1e12, 1e12, 1e12, 1e12),
      BBox::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::INFINITY, f32::INFINITY),
      BBox::new(f32::NAN, f32::NAN, f32::NAN, f32::NAN),
      BBox::new(-10.0, -10.0, f32::MAX, f32::MAX),
    ];
    for bbox in &boxes {
      draw.draw_bbox_with_label(&mut image, bbox, "cat");
    }
  }
}
