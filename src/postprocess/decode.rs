// 该文件是 Fenjian （分拣） 项目的一部分。
// src/postprocess/decode.rs - 原始输出解码
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

use thiserror::Error;
use tracing::{debug, error};

use crate::model::{GEOMETRY_LEN, RawDetection};
use crate::postprocess::{BBox, Candidate};

const DECODE_OBJECT_THRESH: f32 = 0.5;

#[derive(Error, Debug, PartialEq)]
pub enum DecodeError {
  #[error("检测向量长度错误: 期望 {expected}, 实际 {actual}")]
  MalformedDetection { expected: usize, actual: usize },
}

/// 把原始检测向量解码为像素坐标下的候选框
///
/// 最大得分不超过 0.5 的区域直接丢弃，与后续抑制阶段的阈值无关。
#[derive(Debug, Clone)]
pub struct Decoder {
  num_classes: usize,
}

impl Decoder {
  pub fn new(num_classes: usize) -> Self {
    Self { num_classes }
  }

  pub fn expected_len(&self) -> usize {
    GEOMETRY_LEN + self.num_classes
  }

  /// 解码单个区域，置信度不超过阈值时返回 `None`
  pub fn decode_one(
    &self,
    raw: &RawDetection,
    image_width: u32,
    image_height: u32,
  ) -> Result<Option<Candidate>, DecodeError> {
    let expected = self.expected_len();
    let geometry = match raw.geometry() {
      Some(geometry) if raw.len() == expected => geometry,
      _ => {
        error!("检测向量长度错误: 期望 {}, 实际 {}", expected, raw.len());
        return Err(DecodeError::MalformedDetection {
          expected,
          actual: raw.len(),
        });
      }
    };

    // 取最大得分，相同时保留下标最小者
    let mut max_score = f32::MIN;
    let mut class_id = 0usize;
    for (idx, &score) in raw.scores().iter().enumerate() {
      if score > max_score {
        max_score = score;
        class_id = idx;
      }
    }

    if max_score <= DECODE_OBJECT_THRESH {
      return Ok(None);
    }

    let (width, height) = (image_width as f32, image_height as f32);
    let [rx, ry, rw, rh] = geometry;
    let center_x = rx * width;
    let center_y = ry * height;
    let w = rw * width;
    let h = rh * height;

    Ok(Some(Candidate {
      class_id,
      confidence: max_score,
      bbox: BBox::new(center_x - w / 2.0, center_y - h / 2.0, w, h),
    }))
  }

  /// 解码一张图像的全部区域，保持枚举顺序
  pub fn decode(
    &self,
    raws: &[RawDetection],
    image_width: u32,
    image_height: u32,
  ) -> Result<Vec<Candidate>, DecodeError> {
    let mut candidates = Vec::new();
    for raw in raws {
      if let Some(candidate) = self.decode_one(raw, image_width, image_height)? {
        candidates.push(candidate);
      }
    }
    debug!("{} 个区域中解码出 {} 个候选框", raws.len(), candidates.len());
    Ok(candidates)
  }
}
