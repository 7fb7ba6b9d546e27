// 该文件是 Fenjian （分拣） 项目的一部分。
// src/input/staging.rs - 输入文件暂存
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

use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum StagingError {
  #[error("无法创建暂存目录: {0}")]
  CreateError(std::io::Error),
  #[error("路径没有文件名: {0}")]
  NoFileName(PathBuf),
  #[error("无法暂存文件 {path}: {source}")]
  CopyError {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// 临时暂存目录，把零散的输入文件收拢到一个目录中处理
///
/// 文件按文件名去重，后暂存的同名文件覆盖先前的。目录在 drop 时删除。
pub struct StagingArea {
  directory: TempDir,
  staged: usize,
}

impl StagingArea {
  pub fn new() -> Result<Self, StagingError> {
    let directory = tempfile::Builder::new()
      .prefix("fenjian-staging-")
      .tempdir()
      .map_err(StagingError::CreateError)?;
    debug!("创建暂存目录: {}", directory.path().display());
    Ok(Self {
      directory,
      staged: 0,
    })
  }

  pub fn path(&self) -> &Path {
    self.directory.path()
  }

  /// 已暂存的不同文件名数量
  pub fn len(&self) -> usize {
    self.staged
  }

  pub fn is_empty(&self) -> bool {
    self.staged == 0
  }

  pub fn stage(&mut self, source: impl AsRef<Path>) -> Result<PathBuf, StagingError> {
    let source = source.as_ref();
    let file_name = source
      .file_name()
      .ok_or_else(|| StagingError::NoFileName(source.to_path_buf()))?;
    let target = self.directory.path().join(file_name);

    let replaced = target.exists();
    std::fs::copy(source, &target).map_err(|e| StagingError::CopyError {
      path: source.to_path_buf(),
      source: e,
    })?;
    if replaced {
      debug!("同名文件被覆盖: {}", file_name.to_string_lossy());
    } else {
      self.staged += 1;
    }

    Ok(target)
  }

  pub fn stage_all<I, P>(&mut self, sources: I) -> Result<(), StagingError>
  where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
  {
    for source in sources {
      self.stage(source)?;
    }
    info!("共暂存 {} 个文件", self.staged);
    Ok(())
  }

  /// 删除暂存目录并报告清理错误
  pub fn close(self) -> std::io::Result<()> {
    self.directory.close()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn later_file_with_same_name_wins() {
    let sources = tempfile::tempdir().unwrap();
    let first = sources.path().join("one");
    let second = sources.path().join("two");
    std::fs::create_dir_all(&first).unwrap();
    std::fs::create_dir_all(&second).unwrap();
    std::fs::write(first.join("a.jpg"), b"first").unwrap();
    std::fs::write(second.join("a.jpg"), b"second").unwrap();
    std::fs::write(second.join("b.jpg"), b"other").unwrap();

    let mut staging = StagingArea::new().unwrap();
    staging
      .stage_all([first.join("a.jpg"), second.join("a.jpg"), second.join("b.jpg")])
      .unwrap();

    assert_eq!(staging.len(), 2);
    let staged = std::fs::read(staging.path().join("a.jpg")).unwrap();
    assert_eq!(staged, b"second");
  }

  #[test]
  fn directory_is_removed_on_close() {
    let staging = StagingArea::new().unwrap();
    let path = staging.path().to_path_buf();
    assert!(path.is_dir());
    staging.close().unwrap();
    assert!(!path.exists());
  }

  #[test]
  fn missing_source_is_an_error() {
    let mut staging = StagingArea::new().unwrap();
    let err = staging.stage("/definitely/not/here.jpg").unwrap_err();
    assert!(matches!(err, StagingError::CopyError { .. }));
  }
}
