// 该文件是 Fenjian （分拣） 项目的一部分。
// src/input/image_folder.rs - 图像目录输入
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

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::input::{ImageJob, ImageJobError};

/// 目录中的图像文件，按文件名升序排列
///
/// 排序与文件系统的枚举顺序无关。图像在迭代时才逐张解码。
#[derive(Debug, Clone)]
pub struct ImageFolderInput {
  files: Vec<PathBuf>,
  resize_width: Option<u32>,
}

impl ImageFolderInput {
  pub fn open(directory: impl AsRef<Path>) -> std::io::Result<Self> {
    let directory = directory.as_ref();
    let mut files = Vec::new();
    for entry in std::fs::read_dir(directory)? {
      let path = entry?.path();
      if path.is_file() {
        files.push(path);
      }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    debug!("目录 {} 中共 {} 个文件", directory.display(), files.len());

    Ok(Self {
      files,
      resize_width: None,
    })
  }

  /// 解码后按宽度等比缩放
  pub fn with_resize_width(mut self, width: Option<u32>) -> Self {
    self.resize_width = width;
    self
  }

  pub fn files(&self) -> &[PathBuf] {
    &self.files
  }

  pub fn len(&self) -> usize {
    self.files.len()
  }

  pub fn is_empty(&self) -> bool {
    self.files.is_empty()
  }
}

impl IntoIterator for ImageFolderInput {
  type Item = (PathBuf, Result<ImageJob, ImageJobError>);
  type IntoIter = ImageFolderIter;

  fn into_iter(self) -> Self::IntoIter {
    ImageFolderIter {
      files: self.files.into_iter(),
      resize_width: self.resize_width,
    }
  }
}

pub struct ImageFolderIter {
  files: std::vec::IntoIter<PathBuf>,
  resize_width: Option<u32>,
}

impl Iterator for ImageFolderIter {
  type Item = (PathBuf, Result<ImageJob, ImageJobError>);

  fn next(&mut self) -> Option<Self::Item> {
    let path = self.files.next()?;
    let job = ImageJob::open(&path).map(|job| match self.resize_width {
      Some(width) => job.resize_to_width(width),
      None => job,
    });
    Some((path, job))
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    self.files.size_hint()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn files_are_sorted_by_name() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["b.jpg", "a.jpg", "c.jpg"] {
      std::fs::write(dir.path().join(name), b"").unwrap();
    }
    std::fs::create_dir(dir.path().join("nested")).unwrap();

    let input = ImageFolderInput::open(dir.path()).unwrap();
    let names: Vec<_> = input
      .files()
      .iter()
      .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
      .collect();
    assert_eq!(names, vec!["a.jpg", "b.jpg", "c.jpg"]);
  }

  #[test]
  fn missing_directory_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(ImageFolderInput::open(dir.path().join("missing")).is_err());
  }
}
