// 该文件是 Fenjian （分拣） 项目的一部分。
// src/batch.rs - 批量分拣任务
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

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
  input::{ImageFolderInput, ImageJob},
  label::{LabelError, LabelSet},
  model::{Detector, GEOMETRY_LEN},
  output::{ClassFolderOutput, Draw, OutputLayout, Render, RouteError},
  postprocess::{DecodeError, Decoder, Suppressor},
};

/// 启动阶段错误，发生时不会处理任何图像
#[derive(Error, Debug)]
pub enum StartupError {
  #[error("标签加载错误: {0}")]
  LabelError(#[from] LabelError),
  #[error("标签列表为空")]
  NoLabels,
  #[error("模型输出宽度 {actual} 与标签数量不符, 期望 {expected}")]
  OutputWidthMismatch { expected: usize, actual: usize },
  #[error("阈值无效: {name} = {value}")]
  InvalidThreshold { name: &'static str, value: f32 },
  #[error("字体加载错误: {0}")]
  FontError(#[from] ab_glyph::InvalidFont),
}

/// 批处理中止错误
#[derive(Error, Debug)]
pub enum BatchError {
  #[error("无法读取输入目录 {path}: {source}")]
  InputDir {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("推理失败 {file}: {source}")]
  Inference {
    file: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },
  #[error("模型输出格式错误 {file}: {source}")]
  Decode {
    file: String,
    #[source]
    source: DecodeError,
  },
  #[error("输出失败 {file}: {source}")]
  Route {
    file: String,
    #[source]
    source: RouteError,
  },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierConfig {
  /// 置信度阈值
  pub score_threshold: f32,
  /// NMS IoU 阈值
  pub overlap_threshold: f32,
  /// 只在同类别之间做抑制
  pub class_aware: bool,
  /// 检测前按宽度等比缩放
  pub resize_width: Option<u32>,
}

impl Default for ClassifierConfig {
  fn default() -> Self {
    let suppressor = Suppressor::default();
    Self {
      score_threshold: suppressor.score_threshold,
      overlap_threshold: suppressor.overlap_threshold,
      class_aware: suppressor.class_aware,
      resize_width: None,
    }
  }
}

impl ClassifierConfig {
  fn validate(&self) -> Result<(), StartupError> {
    for (name, value) in [
      ("score_threshold", self.score_threshold),
      ("overlap_threshold", self.overlap_threshold),
    ] {
      if !(0.0..=1.0).contains(&value) {
        return Err(StartupError::InvalidThreshold { name, value });
      }
    }
    Ok(())
  }
}

/// 单张图像的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutcome {
  /// 写入了一个或多个类别目录
  Classified {
    file_name: String,
    labels: Vec<String>,
  },
  /// 没有检测到目标，未写任何文件
  NoDetection { file_name: String },
  /// 无法解码，已跳过
  Skipped { file_name: String, reason: String },
}

impl ImageOutcome {
  pub fn file_name(&self) -> &str {
    match self {
      ImageOutcome::Classified { file_name, .. }
      | ImageOutcome::NoDetection { file_name }
      | ImageOutcome::Skipped { file_name, .. } => file_name,
    }
  }
}

/// 一次批处理的汇总，按处理顺序记录每张图像的结果
#[derive(Debug, Clone)]
pub struct BatchReport {
  pub input_dir: PathBuf,
  pub output_dir: PathBuf,
  pub started_at: DateTime<Utc>,
  pub finished_at: DateTime<Utc>,
  outcomes: Vec<ImageOutcome>,
}

impl BatchReport {
  pub fn outcomes(&self) -> &[ImageOutcome] {
    &self.outcomes
  }

  /// 成功解码并完成检测的图像数量
  pub fn processed(&self) -> usize {
    self.outcomes.len() - self.skipped()
  }

  pub fn classified(&self) -> usize {
    self
      .outcomes
      .iter()
      .filter(|o| matches!(o, ImageOutcome::Classified { .. }))
      .count()
  }

  pub fn no_detection(&self) -> usize {
    self
      .outcomes
      .iter()
      .filter(|o| matches!(o, ImageOutcome::NoDetection { .. }))
      .count()
  }

  pub fn skipped(&self) -> usize {
    self
      .outcomes
      .iter()
      .filter(|o| matches!(o, ImageOutcome::Skipped { .. }))
      .count()
  }

  /// 每个类别目录写入的文件数
  pub fn written_per_label(&self) -> BTreeMap<String, usize> {
    let mut written = BTreeMap::new();
    for outcome in &self.outcomes {
      if let ImageOutcome::Classified { labels, .. } = outcome {
        for label in labels {
          *written.entry(label.clone()).or_insert(0) += 1;
        }
      }
    }
    written
  }

  pub fn to_json(&self) -> serde_json::Value {
    let images: Vec<_> = self
      .outcomes
      .iter()
      .map(|outcome| match outcome {
        ImageOutcome::Classified { file_name, labels } => {
          json!({ "file": file_name, "status": "classified", "labels": labels })
        }
        ImageOutcome::NoDetection { file_name } => {
          json!({ "file": file_name, "status": "no_detection" })
        }
        ImageOutcome::Skipped { file_name, reason } => {
          json!({ "file": file_name, "status": "skipped", "reason": reason })
        }
      })
      .collect();

    json!({
      "input": self.input_dir.display().to_string(),
      "output": self.output_dir.display().to_string(),
      "started_at": self.started_at.to_rfc3339(),
      "finished_at": self.finished_at.to_rfc3339(),
      "processed": self.processed(),
      "classified": self.classified(),
      "no_detection": self.no_detection(),
      "skipped": self.skipped(),
      "written": self.written_per_label(),
      "images": images,
    })
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BatchState {
  Idle,
  Staging,
  Processing(usize),
  Done,
}

impl BatchState {
  fn advance(&mut self, next: BatchState) {
    debug!("批处理状态: {:?} -> {:?}", self, next);
    *self = next;
  }
}

/// 分拣上下文：检测器、标签与后处理参数，启动时构建一次后只读使用
pub struct Classifier<D> {
  detector: D,
  labels: LabelSet,
  decoder: Decoder,
  suppressor: Suppressor,
  draw: Draw,
  config: ClassifierConfig,
}

impl<D, E> Classifier<D>
where
  D: Detector<Error = E>,
  E: std::error::Error + Send + Sync + 'static,
{
  pub fn new(detector: D, labels: LabelSet, config: ClassifierConfig) -> Result<Self, StartupError> {
    if labels.is_empty() {
      return Err(StartupError::NoLabels);
    }
    config.validate()?;

    let expected = GEOMETRY_LEN + labels.len();
    if let Some(actual) = detector.output_width()
      && actual != expected
    {
      return Err(StartupError::OutputWidthMismatch { expected, actual });
    }

    let decoder = Decoder::new(labels.len());
    let suppressor = Suppressor::new(config.score_threshold, config.overlap_threshold)
      .class_aware(config.class_aware);
    let draw = Draw::new()?;

    info!(
      "分拣器就绪: {} 个类别, 置信度阈值 {}, NMS 阈值 {}, 区分类别 {}",
      labels.len(),
      config.score_threshold,
      config.overlap_threshold,
      config.class_aware
    );

    Ok(Self {
      detector,
      labels,
      decoder,
      suppressor,
      draw,
      config,
    })
  }

  /// 处理输入目录中的全部图像，按文件名升序
  ///
  /// 无法解码的图像记录后跳过；推理、输出格式和文件系统错误中止批处理，
  /// 已写出的文件保留。
  pub fn classify_batch(
    &self,
    input_dir: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
  ) -> Result<BatchReport, BatchError> {
    let (input_dir, output_dir) = (input_dir.as_ref(), output_dir.as_ref());
    let started_at = Utc::now();
    let mut state = BatchState::Idle;

    state.advance(BatchState::Staging);
    let input = ImageFolderInput::open(input_dir)
      .map_err(|source| BatchError::InputDir {
        path: input_dir.to_path_buf(),
        source,
      })?
      .with_resize_width(self.config.resize_width);
    info!("开始批处理: {} 个文件, 输出到 {}", input.len(), output_dir.display());

    let output = ClassFolderOutput::new(OutputLayout::new(output_dir), &self.labels, &self.draw);
    let mut outcomes = Vec::with_capacity(input.len());

    for (index, (path, job)) in input.into_iter().enumerate() {
      state.advance(BatchState::Processing(index));
      let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

      let outcome = match job {
        Ok(job) => self.classify_image(&job, &output, file_name)?,
        Err(e) => {
          warn!("无法读取图像 {}: {}", path.display(), e);
          ImageOutcome::Skipped {
            file_name,
            reason: e.to_string(),
          }
        }
      };
      outcomes.push(outcome);
    }

    state.advance(BatchState::Done);
    let report = BatchReport {
      input_dir: input_dir.to_path_buf(),
      output_dir: output_dir.to_path_buf(),
      started_at,
      finished_at: Utc::now(),
      outcomes,
    };
    info!(
      "批处理完成: 处理 {} 张, 分拣 {} 张, 无目标 {} 张, 跳过 {} 张",
      report.processed(),
      report.classified(),
      report.no_detection(),
      report.skipped()
    );

    Ok(report)
  }

  fn classify_image(
    &self,
    job: &ImageJob,
    output: &ClassFolderOutput,
    file_name: String,
  ) -> Result<ImageOutcome, BatchError> {
    let now = std::time::Instant::now();
    let raws = self
      .detector
      .infer(job.image())
      .map_err(|e| BatchError::Inference {
        file: file_name.clone(),
        source: Box::new(e),
      })?;
    debug!("{} 推理完成，耗时: {:.2?}", file_name, now.elapsed());

    let candidates = self
      .decoder
      .decode(&raws, job.width(), job.height())
      .map_err(|source| BatchError::Decode {
        file: file_name.clone(),
        source,
      })?;
    let detections = self.suppressor.suppress(candidates);

    if detections.is_empty() {
      info!("{}: 未检测到目标", file_name);
      return Ok(ImageOutcome::NoDetection { file_name });
    }

    for detection in &detections {
      debug!(
        "  - {}: {:.2}% at ({:.0}, {:.0}, {:.0}x{:.0})",
        self.labels.name(detection.class_id).unwrap_or("?"),
        detection.confidence * 100.0,
        detection.bbox.x,
        detection.bbox.y,
        detection.bbox.w,
        detection.bbox.h
      );
    }

    let copies = output
      .render_result(job, detections.as_slice())
      .map_err(|source| BatchError::Route {
        file: file_name.clone(),
        source,
      })?;
    info!("{}: 检测到 {} 个目标", file_name, detections.len());

    Ok(ImageOutcome::Classified {
      file_name,
      labels: copies.into_iter().map(|copy| copy.label).collect(),
    })
  }
}
