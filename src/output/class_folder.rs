// 该文件是 Fenjian （分拣） 项目的一部分。
// src/output/class_folder.rs - 按类别分目录输出
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

use tracing::info;

use crate::{
  input::ImageJob,
  label::LabelSet,
  output::{Draw, OutputLayout, Render, RouteError},
  postprocess::Detection,
};

/// 写入某个类别目录的一份图像副本
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedCopy {
  pub label: String,
  pub path: PathBuf,
}

/// 把图像写入其检测到的每个类别目录
///
/// 所有检测框先绘制到同一张图上，再向每个不同的类别目录各写一份，
/// 因此每份副本都包含全部检测框。同名文件会被覆盖。
pub struct ClassFolderOutput<'a> {
  layout: OutputLayout,
  labels: &'a LabelSet,
  draw: &'a Draw,
}

impl<'a> ClassFolderOutput<'a> {
  pub fn new(layout: OutputLayout, labels: &'a LabelSet, draw: &'a Draw) -> Self {
    Self {
      layout,
      labels,
      draw,
    }
  }
}

impl Render<ImageJob, [Detection]> for ClassFolderOutput<'_> {
  type Output = Vec<RoutedCopy>;
  type Error = RouteError;

  fn render_result(
    &self,
    job: &ImageJob,
    detections: &[Detection],
  ) -> Result<Self::Output, Self::Error> {
    if detections.is_empty() {
      return Ok(Vec::new());
    }

    let mut image = job.image().clone();
    // 按目录去重：清理后同名的标签只写一份，归到先出现的标签名下
    let mut targets: Vec<(&str, PathBuf)> = Vec::new();
    for detection in detections {
      let label = self
        .labels
        .name(detection.class_id)
        .ok_or(RouteError::UnknownClass(detection.class_id))?;
      self.draw.draw_bbox_with_label(&mut image, &detection.bbox, label);
      let directory = self.layout.label_dir(label);
      if !targets.iter().any(|(_, dir)| *dir == directory) {
        targets.push((label, directory));
      }
    }

    let mut copies = Vec::with_capacity(targets.len());
    for (label, _) in targets {
      let directory = self
        .layout
        .ensure(label)
        .map_err(|source| RouteError::CreateDir {
          path: self.layout.label_dir(label),
          source,
        })?;

      let path = directory.join(job.file_name());
      image
        .save_with_format(&path, job.format())
        .map_err(|source| RouteError::SaveImage {
          path: path.clone(),
          source,
        })?;
      info!("保存图像到文件: {}", path.display());

      copies.push(RoutedCopy {
        label: label.to_string(),
        path,
      });
    }

    Ok(copies)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::postprocess::BBox;
  use image::{ImageFormat, Rgb, RgbImage};

  fn job_in(dir: &std::path::Path) -> ImageJob {
    let path = dir.join("shot.png");
    RgbImage::from_pixel(64, 64, Rgb([128, 128, 128]))
      .save_with_format(&path, ImageFormat::Png)
      .unwrap();
    ImageJob::open(&path).unwrap()
  }

  fn detection(class_id: usize, x: f32) -> Detection {
    Detection {
      class_id,
      confidence: 0.9,
      bbox: BBox::new(x, 20.0, 10.0, 10.0),
    }
  }

  #[test]
  fn labels_sharing_a_directory_are_written_once() {
    let dir = tempfile::tempdir().unwrap();
    let job = job_in(dir.path());
    let labels: LabelSet = ["a/b", "a_b", "c"].into_iter().collect();
    let draw = Draw::new().unwrap();
    let output = ClassFolderOutput::new(OutputLayout::new(dir.path().join("out")), &labels, &draw);

    let copies = output
      .render_result(&job, &[detection(0, 5.0), detection(1, 25.0), detection(2, 45.0)])
      .unwrap();

    let routed: Vec<_> = copies.iter().map(|c| c.label.as_str()).collect();
    assert_eq!(routed, vec!["a/b", "c"]);
    assert_eq!(copies[0].path, dir.path().join("out").join("a_b").join("shot.png"));
    assert!(copies[1].path.is_file());
  }

  #[test]
  fn unknown_class_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let job = job_in(dir.path());
    let labels: LabelSet = ["cat"].into_iter().collect();
    let draw = Draw::new().unwrap();
    let root = dir.path().join("out");
    let output = ClassFolderOutput::new(OutputLayout::new(&root), &labels, &draw);

    let err = output
      .render_result(&job, &[detection(0, 5.0), detection(3, 25.0)])
      .unwrap_err();
    assert!(matches!(err, RouteError::UnknownClass(3)));
    assert!(!root.exists());
  }
}
