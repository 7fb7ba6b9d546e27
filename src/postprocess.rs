// 该文件是 Fenjian （分拣） 项目的一部分。
// src/postprocess.rs - 检测后处理
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

/// 像素坐标下的边界框，`(x, y)` 为左上角
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
  pub x: f32,
  pub y: f32,
  pub w: f32,
  pub h: f32,
}

impl BBox {
  pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
    Self { x, y, w, h }
  }

  pub fn area(&self) -> f32 {
    self.w * self.h
  }

  /// 交并比，并集为 0 时返回 0
  pub fn iou(&self, other: &BBox) -> f32 {
    let x1 = self.x.max(other.x);
    let y1 = self.y.max(other.y);
    let x2 = (self.x + self.w).min(other.x + other.w);
    let y2 = (self.y + self.h).min(other.y + other.h);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = self.area() + other.area() - intersection;

    if union > 0.0 {
      intersection / union
    } else {
      0.0
    }
  }
}

/// 解码后尚未经过抑制的候选框
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
  pub class_id: usize,
  pub confidence: f32,
  pub bbox: BBox,
}

/// 经过阈值筛选与非极大值抑制后的最终检测结果
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
  pub class_id: usize,
  pub confidence: f32,
  pub bbox: BBox,
}

impl From<Candidate> for Detection {
  fn from(candidate: Candidate) -> Self {
    let Candidate {
      class_id,
      confidence,
      bbox,
    } = candidate;
    Self {
      class_id,
      confidence,
      bbox,
    }
  }
}

mod decode;
mod suppress;

pub use self::decode::{DecodeError, Decoder};
pub use self::suppress::Suppressor;
