// 该文件是 Fenjian （分拣） 项目的一部分。
// src/input.rs - 图像输入
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

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use image::{ImageFormat, ImageReader, RgbImage, imageops::FilterType};
use thiserror::Error;

mod image_folder;
pub use self::image_folder::{ImageFolderInput, ImageFolderIter};

mod staging;
pub use self::staging::{StagingArea, StagingError};

#[derive(Error, Debug)]
pub enum ImageJobError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像解码错误: {0}")]
  ImageLoadError(#[from] image::ImageError),
  #[error("无法识别的图像格式")]
  UnknownFormat,
  #[error("路径没有文件名: {0}")]
  NoFileName(PathBuf),
}

/// 一张待处理的输入图像
#[derive(Debug, Clone)]
pub struct ImageJob {
  file_name: OsString,
  format: ImageFormat,
  image: RgbImage,
}

impl ImageJob {
  /// 读取并解码图像，格式根据文件内容判断
  pub fn open(path: impl AsRef<Path>) -> Result<Self, ImageJobError> {
    let path = path.as_ref();
    let file_name = path
      .file_name()
      .ok_or_else(|| ImageJobError::NoFileName(path.to_path_buf()))?
      .to_os_string();

    let reader = ImageReader::open(path)?.with_guessed_format()?;
    let format = reader.format().ok_or(ImageJobError::UnknownFormat)?;
    let image = reader.decode()?.to_rgb8();

    Ok(Self {
      file_name,
      format,
      image,
    })
  }

  /// 按宽度等比缩放，宽度相同时不做处理
  pub fn resize_to_width(mut self, width: u32) -> Self {
    let (w, h) = self.image.dimensions();
    if width == 0 || width == w || w == 0 {
      return self;
    }
    let height = ((h as f64) * (width as f64) / (w as f64)).round().max(1.0) as u32;
    self.image = image::imageops::resize(&self.image, width, height, FilterType::Triangle);
    self
  }

  pub fn file_name(&self) -> &OsStr {
    &self.file_name
  }

  pub fn format(&self) -> ImageFormat {
    self.format
  }

  pub fn image(&self) -> &RgbImage {
    &self.image
  }

  pub fn width(&self) -> u32 {
    self.image.width()
  }

  pub fn height(&self) -> u32 {
    self.image.height()
  }
}
