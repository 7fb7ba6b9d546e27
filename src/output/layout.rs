// 该文件是 Fenjian （分拣） 项目的一部分。
// src/output/layout.rs - 分类输出目录布局
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

use tracing::debug;

/// 类别名称到输出目录的映射，目录在首次使用时创建
#[derive(Debug, Clone)]
pub struct OutputLayout {
  root: PathBuf,
}

impl OutputLayout {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn label_dir(&self, label: &str) -> PathBuf {
    self.root.join(dir_name(label))
  }

  /// 确保类别目录存在，已存在时不报错
  pub fn ensure(&self, label: &str) -> std::io::Result<PathBuf> {
    let directory = self.label_dir(label);
    if !directory.is_dir() {
      debug!("创建类别目录: {}", directory.display());
    }
    // create_dir_all 在并发首次创建时同样成功
    std::fs::create_dir_all(&directory)?;
    Ok(directory)
  }
}

/// 标签转为单层目录名，不允许越出输出根目录
fn dir_name(label: &str) -> String {
  let name: String = label
    .chars()
    .map(|c| match c {
      '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
      c if c.is_control() => '_',
      c => c,
    })
    .collect();
  let name = name.trim();

  match name {
    "" | "." | ".." => "_".to_string(),
    _ => name.to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn plain_labels_are_kept() {
    assert_eq!(dir_name("dog"), "dog");
    assert_eq!(dir_name("traffic light"), "traffic light");
  }

  #[test]
  fn labels_cannot_escape_root() {
    assert_eq!(dir_name("../etc"), ".._etc");
    assert_eq!(dir_name(".."), "_");
    assert_eq!(dir_name("a/b\\c"), "a_b_c");
    assert_eq!(dir_name("   "), "_");
  }

  #[test]
  fn ensure_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let layout = OutputLayout::new(dir.path().join("out"));

    let first = layout.ensure("cat").unwrap();
    let second = layout.ensure("cat").unwrap();
    assert_eq!(first, second);
    assert!(first.is_dir());
    assert_eq!(first, dir.path().join("out").join("cat"));
  }
}
