// 该文件是 Guanjie （关节） 项目的一部分。
// src/output/draw.rs - 姿态与关节角度可视化
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

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{
  draw_filled_circle_mut, draw_hollow_circle_mut, draw_line_segment_mut, draw_text_mut,
};
use thiserror::Error;
use tracing::info;

use crate::{
  angle::JointAngle,
  frame::ToRgbImage,
  landmark::{LandmarkStore, POSE_CONNECTIONS},
  pipeline::PoseResult,
};

// 绘制常量，颜色均为 RGB 顺序
const LANDMARK_RADIUS: i32 = 5;
const JOINT_RADIUS: i32 = 10;
const JOINT_RING_RADIUS: i32 = 15;
const RAY_THICKNESS: i32 = 3;
const LABEL_FONT_SIZE: f32 = 24.0;
const LABEL_OFFSET: (i32, i32) = (-50, 50);
const REPS_POSITION: (i32, i32) = (20, 20);

const LANDMARK_COLOR: [u8; 3] = [0, 0, 255]; // 蓝色
const CONNECTION_COLOR: [u8; 3] = [255, 255, 255]; // 白色
const JOINT_COLOR: [u8; 3] = [0, 0, 255];
const RAY_COLOR: [u8; 3] = [255, 255, 255];
const LABEL_COLOR: [u8; 3] = [0, 0, 255];

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("无法读取字体文件: {0}")]
  FontIo(#[from] std::io::Error),
  #[error("无效的字体文件: {0}")]
  InvalidFont(String),
}

pub struct Draw {
  font: Option<FontArc>,
  font_size: f32,
  draw_skeleton: bool,
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      font: None,
      font_size: LABEL_FONT_SIZE,
      draw_skeleton: true,
    }
  }
}

impl Draw {
  /// 加载 TrueType 字体后才会绘制角度数值与计数文本
  pub fn with_font_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, DrawError> {
    let data = std::fs::read(path.as_ref())?;
    let font = FontArc::try_from_vec(data).map_err(|e| DrawError::InvalidFont(e.to_string()))?;
    info!("已加载字体: {}", path.as_ref().display());
    self.font = Some(font);
    Ok(self)
  }

  pub fn with_skeleton(mut self, draw_skeleton: bool) -> Self {
    self.draw_skeleton = draw_skeleton;
    self
  }

  pub fn has_font(&self) -> bool {
    self.font.is_some()
  }

  fn draw_skeleton(&self, image: &mut RgbImage, landmarks: &LandmarkStore) {
    for &(a, b) in POSE_CONNECTIONS.iter() {
      if let (Ok(pa), Ok(pb)) = (landmarks.point(a), landmarks.point(b)) {
        draw_line_segment_mut(
          image,
          (pa.0 as f32, pa.1 as f32),
          (pb.0 as f32, pb.1 as f32),
          Rgb(CONNECTION_COLOR),
        );
      }
    }

    for lm in landmarks {
      draw_filled_circle_mut(image, lm.point(), LANDMARK_RADIUS, Rgb(LANDMARK_COLOR));
    }
  }

  fn draw_angle(&self, image: &mut RgbImage, landmarks: &LandmarkStore, angle: &JointAngle) {
    let query = angle.query;
    let (Ok(p1), Ok(p2), Ok(p3)) = (
      landmarks.point(query.first),
      landmarks.point(query.vertex),
      landmarks.point(query.last),
    ) else {
      return;
    };

    draw_thick_line(image, p1, p2, RAY_THICKNESS, Rgb(RAY_COLOR));
    draw_thick_line(image, p3, p2, RAY_THICKNESS, Rgb(RAY_COLOR));

    for point in [p1, p2, p3] {
      draw_filled_circle_mut(image, point, JOINT_RADIUS, Rgb(JOINT_COLOR));
      draw_hollow_circle_mut(image, point, JOINT_RING_RADIUS, Rgb(JOINT_COLOR));
    }

    if let Some(font) = &self.font {
      draw_text_mut(
        image,
        Rgb(LABEL_COLOR),
        p2.0.saturating_add(LABEL_OFFSET.0),
        p2.1.saturating_add(LABEL_OFFSET.1),
        PxScale::from(self.font_size),
        font,
        &format!("{}", angle.degrees as i32),
      );
    }
  }
}

/// 通过平移多条线段近似粗线
fn draw_thick_line(
  image: &mut RgbImage,
  from: (i32, i32),
  to: (i32, i32),
  thickness: i32,
  color: Rgb<u8>,
) {
  let half = thickness / 2;
  for dx in -half..=half {
    for dy in -half..=half {
      draw_line_segment_mut(
        image,
        (from.0.saturating_add(dx) as f32, from.1.saturating_add(dy) as f32),
        (to.0.saturating_add(dx) as f32, to.1.saturating_add(dy) as f32),
        color,
      );
    }
  }
}

pub trait DrawPoseOnImage {
  fn draw_pose_on_image(&self, image: &mut RgbImage, result: &PoseResult);
}

pub trait DrawPoseOnFrame<Frame> {
  fn draw_pose(&self, frame: &Frame, result: &PoseResult) -> RgbImage;
}

impl<Frame: ToRgbImage, D: DrawPoseOnImage> DrawPoseOnFrame<Frame> for D {
  fn draw_pose(&self, frame: &Frame, result: &PoseResult) -> RgbImage {
    let mut image = frame.to_rgb_image();
    self.draw_pose_on_image(&mut image, result);
    image
  }
}

impl DrawPoseOnImage for Draw {
  fn draw_pose_on_image(&self, image: &mut RgbImage, result: &PoseResult) {
    if self.draw_skeleton {
      self.draw_skeleton(image, &result.landmarks);
    }

    for angle in &result.angles {
      self.draw_angle(image, &result.landmarks, angle);
    }

    if let (Some(font), Some(reps)) = (&self.font, &result.reps) {
      draw_text_mut(
        image,
        Rgb(LABEL_COLOR),
        REPS_POSITION.0,
        REPS_POSITION.1,
        PxScale::from(self.font_size * 1.5),
        font,
        &format!("{:.1} ({:.0}%)", reps.count, reps.progress),
      );
    }
  }
}

/// 不绘制叠加层，只记录关键点与角度
pub struct Record;

impl Record {
  pub fn record(&self, result: &PoseResult, path: &Path) -> Result<(), std::io::Error> {
    let json = serde_json::to_string_pretty(result).map_err(std::io::Error::other)?;
    std::fs::write(path.with_extension("json"), json)?;
    Ok(())
  }
}
