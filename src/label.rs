// 该文件是 Fenjian （分拣） 项目的一部分。
// src/label.rs - 类别标签
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

use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum LabelError {
  #[error("无法读取标签文件 {path}: {source}")]
  IoError {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("标签文件为空: {0}")]
  Empty(PathBuf),
}

/// 有序的类别名称列表，下标即类别 id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
  names: Box<[String]>,
}

impl LabelSet {
  /// 从 `coco.names` 格式的文件加载，每行一个名称
  pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LabelError> {
    let path = path.as_ref();
    info!("加载标签文件: {}", path.display());
    let text = std::fs::read_to_string(path).map_err(|source| LabelError::IoError {
      path: path.to_path_buf(),
      source,
    })?;

    let labels = Self::parse(&text);
    if labels.is_empty() {
      return Err(LabelError::Empty(path.to_path_buf()));
    }
    debug!("共 {} 个类别", labels.len());
    Ok(labels)
  }

  /// 逐行解析，去除首尾空白；末尾的空行不计入类别
  pub fn parse(text: &str) -> Self {
    let mut names: Vec<String> = text.lines().map(|line| line.trim().to_string()).collect();
    while names.last().is_some_and(|name| name.is_empty()) {
      names.pop();
    }
    Self {
      names: names.into_boxed_slice(),
    }
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  pub fn name(&self, class_id: usize) -> Option<&str> {
    self.names.get(class_id).map(String::as_str)
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.names.iter().map(String::as_str)
  }
}

impl<S: Into<String>> FromIterator<S> for LabelSet {
  fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
    Self {
      names: iter.into_iter().map(Into::into).collect(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_trims_lines_and_trailing_blank() {
    let labels = LabelSet::parse("person\r\n bicycle \ncar\n\n\n");
    assert_eq!(labels.len(), 3);
    assert_eq!(labels.name(0), Some("person"));
    assert_eq!(labels.name(1), Some("bicycle"));
    assert_eq!(labels.name(2), Some("car"));
    assert_eq!(labels.name(3), None);
  }

  #[test]
  fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = LabelSet::from_file(dir.path().join("coco.names")).unwrap_err();
    assert!(matches!(err, LabelError::IoError { .. }));
  }

  #[test]
  fn empty_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.names");
    std::fs::write(&path, "\n\n").unwrap();
    assert!(matches!(
      LabelSet::from_file(&path),
      Err(LabelError::Empty(_))
    ));
  }

  #[test]
  fn load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("animals.names");
    std::fs::write(&path, "cat\ndog\n").unwrap();
    let labels = LabelSet::from_file(&path).unwrap();
    assert_eq!(labels.iter().collect::<Vec<_>>(), vec!["cat", "dog"]);
  }
}
