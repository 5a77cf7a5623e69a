// 该文件是 Guanjie （关节） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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

use chrono::{Datelike, Utc};
use image::RgbImage;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::debug;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::ToRgbImage,
  output::{
    Render,
    draw::{Draw, DrawError, DrawPoseOnFrame, Record},
    draw_from_query,
  },
  pipeline::PoseResult,
  url_file_path,
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("绘制配置错误: {0}")]
  DrawError(#[from] DrawError),
  #[error("帧计数器锁已损坏")]
  CounterPoisoned,
}

/// 每帧的保存方式：绘制叠加层，或保存原图并附带 JSON 记录
pub enum DrawWrapper {
  Draw(Box<Draw>),
  Record(Record),
}

impl DrawWrapper {
  pub fn save_result<F: ToRgbImage>(
    &self,
    path: &Path,
    frame: &F,
    result: &PoseResult,
  ) -> Result<(), DirectoryRecordOutputError> {
    match self {
      DrawWrapper::Draw(draw) => {
        let image: RgbImage = draw.draw_pose(frame, result);
        image.save(path)?;
      }
      DrawWrapper::Record(record) => {
        let image = frame.to_rgb_image();
        image.save(path)?;
        record.record(result, path)?;
      }
    };

    Ok(())
  }
}

pub struct DirectoryRecordOutput {
  directory: PathBuf,
  draw: DrawWrapper,
  frame_counters: Arc<Mutex<u16>>,
  always: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let record = uri.query_pairs().any(|(k, _)| k == "record");
    let always = uri.query_pairs().any(|(k, _)| k == "always");

    let draw = if record {
      DrawWrapper::Record(Record)
    } else {
      DrawWrapper::Draw(Box::new(draw_from_query(uri)?))
    };

    Ok(DirectoryRecordOutput::new(url_file_path(uri), draw, always))
  }
}

impl DirectoryRecordOutput {
  pub fn new(directory: impl Into<PathBuf>, draw: DrawWrapper, always: bool) -> Self {
    Self {
      directory: directory.into(),
      draw,
      frame_counters: Arc::new(Mutex::new(0)),
      always,
    }
  }

  fn frame_id(&self) -> Result<u16, DirectoryRecordOutputError> {
    let mut counter = self
      .frame_counters
      .lock()
      .map_err(|_| DirectoryRecordOutputError::CounterPoisoned)?;
    let id = counter.wrapping_add(1);
    *counter = id;
    Ok(id)
  }

  /// `<目录>/YYYY/MM/DD/HH-MM-SS-XXXX.png`
  fn frame_path(&self) -> Result<PathBuf, DirectoryRecordOutputError> {
    let now = Utc::now();
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    if !directory.exists() {
      std::fs::create_dir_all(&directory)?;
    }

    Ok(directory.join(format!(
      "{}-{:04X}.png",
      now.format("%H-%M-%S"),
      self.frame_id()?
    )))
  }
}

impl<F: ToRgbImage> Render<F, PoseResult> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &F, result: &PoseResult) -> Result<(), Self::Error> {
    if !self.always && result.is_empty() {
      debug!("第 {} 帧未检测到人体，跳过记录", result.frame);
      return Ok(());
    }

    let path = self.frame_path()?;
    self.draw.save_result(&path, frame, result)?;
    debug!("第 {} 帧已记录到 {}", result.frame, path.display());
    Ok(())
  }
}
