// 该文件是 Guanjie （关节） 项目的一部分。
// src/frame.rs - 帧定义
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

use image::RgbImage;

/// 帧尺寸，用于把归一化坐标换算为像素坐标
pub trait FrameDimensions {
  fn width(&self) -> u32;
  fn height(&self) -> u32;
}

/// 帧数据
#[derive(Debug, Clone)]
pub struct Frame {
  /// RGB 图像数据
  pub image: RgbImage,
  /// 帧索引
  pub index: u64,
}

impl Frame {
  pub fn new(image: RgbImage, index: u64) -> Self {
    Self { image, index }
  }
}

impl FrameDimensions for Frame {
  fn width(&self) -> u32 {
    self.image.width()
  }

  fn height(&self) -> u32 {
    self.image.height()
  }
}

pub trait ToRgbImage {
  fn to_rgb_image(&self) -> RgbImage;
}

impl ToRgbImage for Frame {
  fn to_rgb_image(&self) -> RgbImage {
    self.image.clone()
  }
}

impl ToRgbImage for RgbImage {
  fn to_rgb_image(&self) -> RgbImage {
    self.clone()
  }
}
