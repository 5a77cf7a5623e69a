// 该文件是 Guanjie （关节） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use image::{ImageReader, RgbImage};
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::Frame, url_file_path};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(#[from] image::ImageError),
}

/// 单张图片输入，只产生一帧
pub struct ImageFileInput {
  image: Option<RgbImage>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    let path = url_file_path(url);
    let image = ImageReader::open(&path)?.decode()?.to_rgb8();
    info!(
      "读取图像文件: {} ({}x{})",
      path,
      image.width(),
      image.height()
    );

    Ok(ImageFileInput { image: Some(image) })
  }
}

impl From<RgbImage> for ImageFileInput {
  fn from(image: RgbImage) -> Self {
    Self { image: Some(image) }
  }
}

impl Iterator for ImageFileInput {
  type Item = Frame;

  fn next(&mut self) -> Option<Self::Item> {
    self.image.take().map(|image| Frame::new(image, 0))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_yields_single_frame() {
    let mut input = ImageFileInput::from(RgbImage::new(8, 6));
    let frame = input.next().unwrap();
    assert_eq!(frame.index, 0);
    assert_eq!(frame.image.dimensions(), (8, 6));
    assert!(input.next().is_none());
  }

  #[test]
  fn test_scheme_mismatch() {
    let url = Url::parse("folder:///tmp").unwrap();
    assert!(matches!(
      ImageFileInput::from_url(&url),
      Err(ImageFileInputError::SchemaMismatch)
    ));
  }

  #[test]
  fn test_missing_file() {
    let url = Url::parse("image:///definitely/not/here.png").unwrap();
    assert!(matches!(
      ImageFileInput::from_url(&url),
      Err(ImageFileInputError::IoError(_))
    ));
  }

  #[test]
  fn test_reads_png() {
    let path = std::env::temp_dir().join(format!("guanjie-input-{}.png", std::process::id()));
    RgbImage::new(5, 4).save(&path).unwrap();

    let url = Url::from_file_path(&path).unwrap();
    let url = Url::parse(&url.as_str().replacen("file:", "image:", 1)).unwrap();
    let mut input = ImageFileInput::from_url(&url).unwrap();
    assert_eq!(input.next().unwrap().image.dimensions(), (5, 4));

    std::fs::remove_file(&path).unwrap();
  }
}
