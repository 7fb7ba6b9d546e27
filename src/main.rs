// 该文件是 Fenjian （分拣） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use fenjian::{
  Classifier, FromUrl,
  input::StagingArea,
  label::LabelSet,
  model::OnnxDetectorBuilder,
};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("Fenjian 图像分拣");
  info!("模型文件路径: {}", args.model);
  info!("标签文件: {}", args.labels.display());
  info!("输出目录: {}", args.output.display());
  info!("置信度阈值: {}", args.confidence);
  info!("NMS 阈值: {}", args.nms_threshold);

  let labels = LabelSet::from_file(&args.labels)?;

  info!("正在加载模型...");
  let detector = OnnxDetectorBuilder::from_url(&args.model)?
    .classes(labels.len())
    .build()?;
  info!("模型加载完成");

  let classifier = Classifier::new(detector, labels, args.classifier_config())?;

  // 单个目录直接处理，否则先暂存到临时目录
  let report = match args.input.as_slice() {
    [directory] if directory.is_dir() => classifier.classify_batch(directory, &args.output)?,
    files => {
      let mut staging = StagingArea::new()?;
      staging.stage_all(files)?;
      let report = classifier.classify_batch(staging.path(), &args.output)?;
      staging.close().context("无法清理暂存目录")?;
      report
    }
  };

  for (label, count) in report.written_per_label() {
    info!("  {}: {} 张", label, count);
  }

  if let Some(path) = &args.report {
    let text = serde_json::to_string_pretty(&report.to_json())?;
    std::fs::write(path, text).with_context(|| format!("无法写入报告: {}", path.display()))?;
    info!("报告已写入: {}", path.display());
  }

  Ok(())
}
