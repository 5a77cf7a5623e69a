// 该文件是 Guanjie （关节） 项目的一部分。
// src/landmark.rs - 人体关键点与单帧关键点存储
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

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

mod blazepose;
pub use self::blazepose::{POSE_CONNECTIONS, POSE_LANDMARK_COUNT, PoseLandmark};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseError {
  #[error("关键点索引越界: 索引 {index}, 当前共 {len} 个关键点")]
  IndexOutOfRange { index: usize, len: usize },
  #[error("关键点存储为空（本帧未检测到人体）")]
  EmptyStore,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("关键点数量不匹配: 期望 {expected}, 实际 {actual}")]
pub struct LandmarkCountError {
  pub expected: usize,
  pub actual: usize,
}

/// 像素坐标下的单个关键点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Landmark {
  /// 模型定义的关键点编号
  pub id: u32,
  /// 像素列
  pub x: i32,
  /// 像素行
  pub y: i32,
}

impl Landmark {
  pub fn new(id: u32, x: i32, y: i32) -> Self {
    Self { id, x, y }
  }

  pub fn point(&self) -> (i32, i32) {
    (self.x, self.y)
  }
}

/// 模型输出的归一化关键点，x/y 取值范围为 0.0~1.0
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedLandmark {
  pub x: f32,
  pub y: f32,
  #[serde(default = "full_visibility")]
  pub visibility: f32,
}

fn full_visibility() -> f32 {
  1.0
}

/// 像素坐标允许超出图像的范围（以图像尺寸为单位）
pub const PIXEL_LIMIT_FACTOR: f64 = 4.0;

fn scale_to_pixel(value: f32, size: u32) -> i32 {
  if !value.is_finite() {
    return 0;
  }
  let limit = PIXEL_LIMIT_FACTOR * f64::from(size);
  (f64::from(value) * f64::from(size))
    .round()
    .clamp(-limit, limit) as i32
}

impl NormalizedLandmark {
  pub fn new(x: f32, y: f32) -> Self {
    Self {
      x,
      y,
      visibility: 1.0,
    }
  }

  pub fn with_visibility(mut self, visibility: f32) -> Self {
    self.visibility = visibility;
    self
  }

  /// 转换为像素坐标，四舍五入到最近的像素
  ///
  /// 结果限制在各方向 [`PIXEL_LIMIT_FACTOR`] 倍图像尺寸以内，非有限值按 0 处理。
  pub fn to_pixel(&self, width: u32, height: u32) -> (i32, i32) {
    (
      scale_to_pixel(self.x, width),
      scale_to_pixel(self.y, height),
    )
  }
}

/// 一次检测得到的完整姿态
///
/// 关键点数量由类型固定为 [`POSE_LANDMARK_COUNT`]，不存在只有部分关键点的姿态。
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPose {
  landmarks: [NormalizedLandmark; POSE_LANDMARK_COUNT],
}

impl NormalizedPose {
  pub fn new(landmarks: [NormalizedLandmark; POSE_LANDMARK_COUNT]) -> Self {
    Self { landmarks }
  }

  pub fn landmarks(&self) -> &[NormalizedLandmark] {
    &self.landmarks
  }

  pub fn get(&self, landmark: PoseLandmark) -> &NormalizedLandmark {
    &self.landmarks[landmark.index()]
  }

  /// 按枚举顺序编号并换算为像素坐标
  pub fn to_pixels(&self, width: u32, height: u32) -> Vec<Landmark> {
    self
      .landmarks
      .iter()
      .enumerate()
      .map(|(id, lm)| {
        let (x, y) = lm.to_pixel(width, height);
        Landmark::new(id as u32, x, y)
      })
      .collect()
  }
}

impl TryFrom<Vec<NormalizedLandmark>> for NormalizedPose {
  type Error = LandmarkCountError;

  fn try_from(landmarks: Vec<NormalizedLandmark>) -> Result<Self, Self::Error> {
    let actual = landmarks.len();
    let landmarks: [NormalizedLandmark; POSE_LANDMARK_COUNT] =
      landmarks.try_into().map_err(|_| LandmarkCountError {
        expected: POSE_LANDMARK_COUNT,
        actual,
      })?;
    Ok(Self { landmarks })
  }
}

/// 单帧关键点存储
///
/// 按位置索引（不是按 `id`）。每帧由检测结果整体替换，
/// 要么为空（未检测到人体），要么是模型输出的完整关键点集合。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkStore {
  landmarks: Vec<Landmark>,
}

impl LandmarkStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// 整体替换当前内容
  pub fn set(&mut self, landmarks: Vec<Landmark>) {
    self.landmarks = landmarks;
  }

  /// 用一次检测结果替换当前内容；`None` 表示本帧没有检测到人体
  pub fn set_from_detection(&mut self, pose: Option<&NormalizedPose>, width: u32, height: u32) {
    match pose {
      Some(pose) => {
        self.set(pose.to_pixels(width, height));
        debug!("关键点存储已更新: {} 个关键点", self.len());
      }
      None => {
        self.clear();
        debug!("本帧未检测到人体，关键点存储已清空");
      }
    }
  }

  pub fn get(&self) -> &[Landmark] {
    &self.landmarks
  }

  pub fn at(&self, index: usize) -> Result<Landmark, PoseError> {
    self
      .landmarks
      .get(index)
      .copied()
      .ok_or(PoseError::IndexOutOfRange {
        index,
        len: self.landmarks.len(),
      })
  }

  pub fn point(&self, index: usize) -> Result<(i32, i32), PoseError> {
    self.at(index).map(|lm| lm.point())
  }

  pub fn len(&self) -> usize {
    self.landmarks.len()
  }

  pub fn is_empty(&self) -> bool {
    self.landmarks.is_empty()
  }

  pub fn clear(&mut self) {
    self.landmarks.clear();
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Landmark> {
    self.landmarks.iter()
  }
}

impl From<Vec<Landmark>> for LandmarkStore {
  fn from(landmarks: Vec<Landmark>) -> Self {
    Self { landmarks }
  }
}

impl<'a> IntoIterator for &'a LandmarkStore {
  type Item = &'a Landmark;
  type IntoIter = std::slice::Iter<'a, Landmark>;

  fn into_iter(self) -> Self::IntoIter {
    self.iter()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn three() -> Vec<Landmark> {
    vec![
      Landmark::new(0, 10, 20),
      Landmark::new(1, 30, 40),
      Landmark::new(2, 50, 60),
    ]
  }

  #[test]
  fn test_new_store_is_empty() {
    let store = LandmarkStore::new();
    assert!(store.is_empty());
    assert_eq!(store.get(), &[] as &[Landmark]);
  }

  #[test]
  fn test_set_then_get_returns_same_sequence() {
    let mut store = LandmarkStore::new();
    store.set(three());
    assert_eq!(store.get(), three().as_slice());
  }

  #[test]
  fn test_get_is_idempotent() {
    let mut store = LandmarkStore::new();
    store.set(three());
    let first = store.get().to_vec();
    let second = store.get().to_vec();
    assert_eq!(first, second);
  }

  #[test]
  fn test_set_replaces_instead_of_merging() {
    let mut store = LandmarkStore::new();
    store.set(three());
    store.set(vec![Landmark::new(7, 1, 1)]);
    assert_eq!(store.len(), 1);
    assert_eq!(store.at(0), Ok(Landmark::new(7, 1, 1)));
  }

  #[test]
  fn test_at_out_of_range() {
    let store = LandmarkStore::from(three());
    assert_eq!(store.at(2), Ok(Landmark::new(2, 50, 60)));
    assert_eq!(
      store.at(5),
      Err(PoseError::IndexOutOfRange { index: 5, len: 3 })
    );
    assert_eq!(
      store.at(3),
      Err(PoseError::IndexOutOfRange { index: 3, len: 3 })
    );
  }

  #[test]
  fn test_to_pixel_rounds() {
    let lm = NormalizedLandmark::new(0.5, 0.25);
    assert_eq!(lm.to_pixel(640, 480), (320, 120));

    // 0.3 * 5 = 1.5 -> 2, 0.7 * 3 = 2.1 -> 2
    let lm = NormalizedLandmark::new(0.3, 0.7);
    assert_eq!(lm.to_pixel(5, 3), (2, 2));

    // 0.999 * 100 = 99.9 -> 100
    let lm = NormalizedLandmark::new(0.999, 0.0);
    assert_eq!(lm.to_pixel(100, 100), (100, 0));
  }

  #[test]
  fn test_to_pixel_limits_far_coordinates() {
    let lm = NormalizedLandmark::new(1.0e9, -1.0e9);
    assert_eq!(lm.to_pixel(100, 50), (400, -200));

    let lm = NormalizedLandmark::new(f32::NAN, f32::INFINITY);
    assert_eq!(lm.to_pixel(100, 50), (0, 0));

    // 略微超出图像的坐标保持原值
    let lm = NormalizedLandmark::new(-0.1, 1.2);
    assert_eq!(lm.to_pixel(100, 50), (-10, 60));
  }

  #[test]
  fn test_pose_to_pixels_assigns_ids_in_order() {
    let mut landmarks = [NormalizedLandmark::default(); POSE_LANDMARK_COUNT];
    landmarks[PoseLandmark::RightElbow.index()] = NormalizedLandmark::new(0.5, 0.5);
    let pose = NormalizedPose::new(landmarks);

    let pixels = pose.to_pixels(200, 100);
    assert_eq!(pixels.len(), POSE_LANDMARK_COUNT);
    for (i, lm) in pixels.iter().enumerate() {
      assert_eq!(lm.id as usize, i);
    }
    assert_eq!(pixels[14], Landmark::new(14, 100, 50));
  }

  #[test]
  fn test_pose_rejects_partial_landmarks() {
    let partial = vec![NormalizedLandmark::new(0.1, 0.1); 12];
    let err = NormalizedPose::try_from(partial).unwrap_err();
    assert_eq!(
      err,
      LandmarkCountError {
        expected: POSE_LANDMARK_COUNT,
        actual: 12
      }
    );

    let full = vec![NormalizedLandmark::new(0.1, 0.1); POSE_LANDMARK_COUNT];
    assert!(NormalizedPose::try_from(full).is_ok());
  }

  #[test]
  fn test_set_from_detection() {
    let pose = NormalizedPose::new([NormalizedLandmark::new(0.5, 0.5); POSE_LANDMARK_COUNT]);
    let mut store = LandmarkStore::new();

    store.set_from_detection(Some(&pose), 10, 10);
    assert_eq!(store.len(), POSE_LANDMARK_COUNT);
    assert_eq!(store.point(32), Ok((5, 5)));

    store.set_from_detection(None, 10, 10);
    assert!(store.is_empty());
  }
}
