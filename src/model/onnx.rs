// 该文件是 Fenjian （分拣） 项目的一部分。
// src/model/onnx.rs - ONNX Runtime 检测模型
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

use std::path::PathBuf;
use std::sync::Mutex;

use image::{RgbImage, imageops::FilterType};
use ndarray::Array4;
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::{Detector, GEOMETRY_LEN, RawDetection},
};

const ONNX_DEFAULT_INPUT_W: u32 = 640;
const ONNX_DEFAULT_INPUT_H: u32 = 640;

#[derive(Error, Debug)]
pub enum OnnxDetectorError {
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("模型文件不存在: {0}")]
  ModelNotFound(PathBuf),
  #[error("模型参数错误: {0}")]
  InvalidParameter(String),
  #[error("ONNX Runtime 错误: {0}")]
  OrtError(#[from] ort::Error),
  #[error("模型输出形状无效: {shape:?}, 期望特征宽度 {expected}")]
  InvalidOutputShape { shape: Vec<i64>, expected: usize },
  #[error("推理会话锁失效")]
  SessionPoisoned,
}

/// ONNX 模型构建器
///
/// 通过 `onnx:///path/to/model.onnx?width=640&height=640&threads=4` 形式的 URL 创建。
pub struct OnnxDetectorBuilder {
  model_path: PathBuf,
  input_width: u32,
  input_height: u32,
  intra_threads: Option<usize>,
  num_classes: Option<usize>,
}

impl FromUrlWithScheme for OnnxDetectorBuilder {
  const SCHEME: &'static str = "onnx";
}

fn parse_query<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, OnnxDetectorError> {
  value
    .parse()
    .map_err(|_| OnnxDetectorError::InvalidParameter(format!("{} = {}", key, value)))
}

impl FromUrl for OnnxDetectorBuilder {
  type Error = OnnxDetectorError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(OnnxDetectorError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let path = urlencoding::decode(url.path())
      .map_err(|e| OnnxDetectorError::ModelPathError(e.to_string()))?;
    if path.is_empty() {
      return Err(OnnxDetectorError::ModelPathError("模型路径为空".to_string()));
    }

    let mut builder = OnnxDetectorBuilder {
      model_path: PathBuf::from(path.as_ref()),
      input_width: ONNX_DEFAULT_INPUT_W,
      input_height: ONNX_DEFAULT_INPUT_H,
      intra_threads: None,
      num_classes: None,
    };

    for (k, v) in url.query_pairs() {
      match k.as_ref() {
        "width" => builder.input_width = parse_query(&k, &v)?,
        "height" => builder.input_height = parse_query(&k, &v)?,
        "threads" => builder.intra_threads = Some(parse_query(&k, &v)?),
        _ => debug!("忽略未知的模型参数: {}={}", k, v),
      }
    }

    if builder.input_width == 0 || builder.input_height == 0 {
      return Err(OnnxDetectorError::InvalidParameter(
        "模型输入尺寸必须大于 0".to_string(),
      ));
    }

    Ok(builder)
  }
}

impl OnnxDetectorBuilder {
  /// 模型的类别数量，决定输出向量宽度 `4 + classes`
  pub fn classes(mut self, num_classes: usize) -> Self {
    self.num_classes = Some(num_classes);
    self
  }

  pub fn build(self) -> Result<OnnxDetector, OnnxDetectorError> {
    let num_classes = self.num_classes.ok_or_else(|| {
      OnnxDetectorError::InvalidParameter("未指定模型类别数量".to_string())
    })?;

    if !self.model_path.is_file() {
      error!("模型文件不存在: {}", self.model_path.display());
      return Err(OnnxDetectorError::ModelNotFound(self.model_path));
    }

    info!("加载模型文件: {}", self.model_path.display());
    let mut builder =
      Session::builder()?.with_optimization_level(GraphOptimizationLevel::Level3)?;
    if let Some(threads) = self.intra_threads {
      builder = builder.with_intra_threads(threads)?;
    }
    let session = builder.commit_from_file(&self.model_path)?;
    info!("模型加载完成");

    let mut detector = OnnxDetector {
      session: Mutex::new(session),
      input_width: self.input_width,
      input_height: self.input_height,
      expected_width: GEOMETRY_LEN + num_classes,
      output_width: None,
    };

    // 空白图像预热一次，记录模型实际输出的特征宽度
    let blank = RgbImage::new(self.input_width, self.input_height);
    let (shape, _) = detector.run(&blank)?;
    let width = feature_width(&shape, detector.expected_width).ok_or_else(|| {
      OnnxDetectorError::InvalidOutputShape {
        shape: shape.clone(),
        expected: detector.expected_width,
      }
    })?;
    if width != detector.expected_width {
      error!(
        "模型输出特征宽度 {} 与期望 {} 不符",
        width, detector.expected_width
      );
    }
    debug!("预热推理完成，输出形状 {:?}", shape);
    detector.output_width = Some(width);

    Ok(detector)
  }
}

/// 三维输出 `[1, a, b]` 中的特征宽度
///
/// 某一维等于期望宽度时取该值，否则取较小的一维（候选区域数量通常远大于特征宽度）。
fn feature_width(shape: &[i64], expected: usize) -> Option<usize> {
  match shape {
    [1, a, b] if *a > 0 && *b > 0 => {
      let (a, b) = (*a as usize, *b as usize);
      if a == expected || b == expected {
        Some(expected)
      } else {
        Some(a.min(b))
      }
    }
    _ => None,
  }
}

/// 基于 ONNX Runtime 的检测器
///
/// 支持 `[1, 4 + C, N]`（YOLOv8 类）与 `[1, N, 4 + C]` 两种输出布局，
/// 几何值从网络输入像素归一化到 `[0, 1]`。
pub struct OnnxDetector {
  session: Mutex<Session>,
  input_width: u32,
  input_height: u32,
  expected_width: usize,
  output_width: Option<usize>,
}

impl OnnxDetector {
  /// 执行一次推理，返回第一个输出的形状与数据
  fn run(&self, image: &RgbImage) -> Result<(Vec<i64>, Vec<f32>), OnnxDetectorError> {
    debug!("设置模型输入");
    let input = Tensor::from_array(self.preprocess(image))?;

    let mut session = self
      .session
      .lock()
      .map_err(|_| OnnxDetectorError::SessionPoisoned)?;

    debug!("执行模型推理");
    let outputs = session.run(ort::inputs![input])?;
    let (shape, data) = outputs[0].try_extract_tensor::<f32>()?;
    let shape: Vec<i64> = shape.iter().copied().collect();
    debug!("模型输出形状: {:?}", shape);

    Ok((shape, data.to_vec()))
  }

  fn preprocess(&self, image: &RgbImage) -> Array4<f32> {
    let (w, h) = (self.input_width, self.input_height);
    let resized = image::imageops::resize(image, w, h, FilterType::Triangle);

    let mut input = Array4::<f32>::zeros((1, 3, h as usize, w as usize));
    for (x, y, pixel) in resized.enumerate_pixels() {
      for c in 0..3 {
        input[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
      }
    }
    input
  }

  fn rows_from_output(
    &self,
    shape: &[i64],
    data: &[f32],
  ) -> Result<Vec<RawDetection>, OnnxDetectorError> {
    let invalid = || OnnxDetectorError::InvalidOutputShape {
      shape: shape.to_vec(),
      expected: self.expected_width,
    };

    let dims = match shape {
      [1, a, b] if *a >= 0 && *b >= 0 => (*a as usize, *b as usize),
      _ => return Err(invalid()),
    };
    if dims.0 * dims.1 != data.len() {
      return Err(invalid());
    }

    let width = self.expected_width;
    let (sx, sy) = (self.input_width as f32, self.input_height as f32);
    let normalize = |mut row: Vec<f32>| {
      row[0] /= sx;
      row[1] /= sy;
      row[2] /= sx;
      row[3] /= sy;
      RawDetection::from(row)
    };

    let rows = if dims.0 == width {
      // [1, 4 + C, N]
      let anchors = dims.1;
      (0..anchors)
        .map(|n| normalize((0..width).map(|f| data[f * anchors + n]).collect()))
        .collect()
    } else if dims.1 == width {
      // [1, N, 4 + C]
      data
        .chunks_exact(width)
        .map(|chunk| normalize(chunk.to_vec()))
        .collect()
    } else {
      error!(
        "模型输出形状 {:?} 与期望特征宽度 {} 不匹配",
        shape, self.expected_width
      );
      return Err(invalid());
    };

    Ok(rows)
  }
}

impl Detector for OnnxDetector {
  type Error = OnnxDetectorError;

  fn infer(&self, image: &RgbImage) -> Result<Vec<RawDetection>, Self::Error> {
    let (shape, data) = self.run(image)?;
    self.rows_from_output(&shape, &data)
  }

  fn output_width(&self) -> Option<usize> {
    self.output_width
  }
}
