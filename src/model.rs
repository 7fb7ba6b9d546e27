// 该文件是 Fenjian （分拣） 项目的一部分。
// src/model.rs - 检测模型适配
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

use image::RgbImage;

/// 几何部分长度：中心 x、中心 y、宽、高
pub const GEOMETRY_LEN: usize = 4;

/// 单个检测区域的原始输出
///
/// 布局为 `[cx, cy, w, h, score_0, score_1, ...]`，几何值按图像宽高归一化到 `[0, 1]`。
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
  values: Box<[f32]>,
}

impl RawDetection {
  pub fn new(values: impl Into<Box<[f32]>>) -> Self {
    Self {
      values: values.into(),
    }
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.values
  }

  /// 归一化的 `[cx, cy, w, h]`，长度不足时返回 `None`
  pub fn geometry(&self) -> Option<[f32; GEOMETRY_LEN]> {
    self
      .values
      .get(..GEOMETRY_LEN)
      .map(|g| [g[0], g[1], g[2], g[3]])
  }

  /// 各类别得分
  pub fn scores(&self) -> &[f32] {
    self.values.get(GEOMETRY_LEN..).unwrap_or(&[])
  }
}

impl From<Vec<f32>> for RawDetection {
  fn from(values: Vec<f32>) -> Self {
    Self::new(values)
  }
}

/// 检测器：输入解码后的图像，输出每个区域的原始检测向量
///
/// 实现者自行完成模型需要的缩放和归一化。检测器在进程启动时构建一次，
/// 之后只读共享，但不保证可被多个线程同时调用。
pub trait Detector {
  type Error;

  fn infer(&self, image: &RgbImage) -> Result<Vec<RawDetection>, Self::Error>;

  /// 原始检测向量的长度（已知时），用于启动时与标签数量校验
  fn output_width(&self) -> Option<usize> {
    None
  }
}

impl<D: Detector + ?Sized> Detector for &D {
  type Error = D::Error;

  fn infer(&self, image: &RgbImage) -> Result<Vec<RawDetection>, Self::Error> {
    (**self).infer(image)
  }

  fn output_width(&self) -> Option<usize> {
    (**self).output_width()
  }
}

#[cfg(feature = "model_onnx")]
mod onnx;
#[cfg(feature = "model_onnx")]
pub use self::onnx::{OnnxDetector, OnnxDetectorBuilder, OnnxDetectorError};
