// 该文件是 Fenjian （分拣） 项目的一部分。
// src/args.rs - 项目参数配置
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

use clap::Parser;
use url::Url;

use fenjian::ClassifierConfig;

/// Fenjian 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型路径，例如 onnx:///models/yolov8n.onnx?width=640&height=640
  #[arg(long, value_name = "MODEL")]
  pub model: Url,

  /// 标签文件路径（每行一个类别名称）
  #[arg(long, value_name = "FILE")]
  pub labels: PathBuf,

  /// 输入来源：一个图像目录，或若干图像文件
  #[arg(long, value_name = "SOURCE", num_args = 1.., required = true)]
  pub input: Vec<PathBuf>,

  /// 输出根目录，每个类别一个子目录
  #[arg(long, value_name = "OUTPUT")]
  pub output: PathBuf,

  /// 抑制阶段的置信度阈值 (0.0 - 1.0)，解码时得分不超过 0.5 的区域总会被丢弃
  #[arg(long, default_value = "0.5", value_name = "THRESHOLD")]
  pub confidence: f32,

  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.4", value_name = "THRESHOLD")]
  pub nms_threshold: f32,

  /// 只在同类别的检测框之间做抑制
  #[arg(long)]
  pub class_aware: bool,

  /// 检测前把图像按该宽度等比缩放
  #[arg(long, value_name = "PIXELS")]
  pub resize_width: Option<u32>,

  /// 把 JSON 格式的处理报告写入该文件
  #[arg(long, value_name = "FILE")]
  pub report: Option<PathBuf>,
}

impl Args {
  pub fn classifier_config(&self) -> ClassifierConfig {
    ClassifierConfig {
      score_threshold: self.confidence,
      overlap_threshold: self.nms_threshold,
      class_aware: self.class_aware,
      resize_width: self.resize_width,
    }
  }
}
