// 该文件是 Guanjie （关节） 项目的一部分。
// src/input/image_directory.rs - 图像目录输入（按文件名顺序逐帧读取）
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

use std::{
  collections::VecDeque,
  path::{Path, PathBuf},
};

use image::ImageReader;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::Frame, url_file_path};

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

#[derive(Error, Debug)]
pub enum ImageDirectoryInputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("目录中没有图像文件: {0}")]
  NoImages(String),
}

/// 目录输入，每个图像文件为一帧
pub struct ImageDirectoryInput {
  files: VecDeque<PathBuf>,
  next_index: u64,
}

impl FromUrlWithScheme for ImageDirectoryInput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for ImageDirectoryInput {
  type Error = ImageDirectoryInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ImageDirectoryInputError::SchemeMismatch);
    }
    Self::open(url_file_path(url))
  }
}

fn is_image_file(path: &Path) -> bool {
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .map(|ext| {
      IMAGE_EXTENSIONS
        .iter()
        .any(|known| ext.eq_ignore_ascii_case(known))
    })
    .unwrap_or(false)
}

impl ImageDirectoryInput {
  pub fn open<P: AsRef<Path>>(directory: P) -> Result<Self, ImageDirectoryInputError> {
    let directory = directory.as_ref();
    let mut files = Vec::new();
    for entry in std::fs::read_dir(directory)? {
      let path = entry?.path();
      if path.is_file() && is_image_file(&path) {
        files.push(path);
      }
    }

    if files.is_empty() {
      return Err(ImageDirectoryInputError::NoImages(
        directory.display().to_string(),
      ));
    }

    files.sort();
    info!("图像目录 {}: 共 {} 帧", directory.display(), files.len());

    Ok(Self {
      files: files.into(),
      next_index: 0,
    })
  }

  pub fn remaining(&self) -> usize {
    self.files.len()
  }
}

impl Iterator for ImageDirectoryInput {
  type Item = Frame;

  fn next(&mut self) -> Option<Self::Item> {
    while let Some(path) = self.files.pop_front() {
      let index = self.next_index;
      self.next_index += 1;

      let decoded = ImageReader::open(&path)
        .map_err(image::ImageError::IoError)
        .and_then(|reader| reader.decode());
      match decoded {
        Ok(image) => {
          debug!("读取第 {} 帧: {}", index, path.display());
          return Some(Frame::new(image.to_rgb8(), index));
        }
        Err(e) => {
          warn!("跳过无法读取的图像 {}: {}", path.display(), e);
        }
      }
    }
    None
  }
}
