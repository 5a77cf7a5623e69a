// 该文件是 Guanjie （关节） 项目的一部分。
// src/model/replay.rs - 回放已记录的关键点检测结果
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

use std::{collections::HashMap, convert::Infallible, path::Path};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::Frame,
  landmark::{LandmarkCountError, NormalizedLandmark, NormalizedPose, PIXEL_LIMIT_FACTOR},
  model::{Model, PoseDetection},
  url_file_path,
};

#[derive(Error, Debug)]
pub enum ReplayModelError {
  #[error("模型路径必须使用 {0} 方案")]
  SchemeMismatch(&'static str),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 解析错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("第 {frame} 帧: {source}")]
  LandmarkCount {
    frame: u64,
    #[source]
    source: LandmarkCountError,
  },
  #[error("第 {frame} 帧第 {index} 个关键点应为 [x, y] 或 [x, y, visibility]，实际有 {len} 个分量")]
  LandmarkShape { frame: u64, index: usize, len: usize },
  #[error("第 {frame} 帧第 {index} 个关键点坐标 ({x}, {y}) 超出允许范围 [-{limit}, {limit}]")]
  LandmarkRange {
    frame: u64,
    index: usize,
    x: f32,
    y: f32,
    limit: f64,
  },
}

/// 单个关键点的记录格式，既可以是对象也可以是数组
#[derive(Deserialize)]
#[serde(untagged)]
enum LandmarkRecord {
  Array(Vec<f32>),
  Object(NormalizedLandmark),
}

#[derive(Deserialize)]
struct FrameRecord {
  frame: u64,
  #[serde(default)]
  landmarks: Option<Vec<LandmarkRecord>>,
}

fn to_pose(
  frame: u64,
  landmarks: Vec<LandmarkRecord>,
) -> Result<NormalizedPose, ReplayModelError> {
  let landmarks = landmarks
    .into_iter()
    .enumerate()
    .map(|(index, record)| match record {
      LandmarkRecord::Array(values) => match values.as_slice() {
        [x, y] => Ok(NormalizedLandmark::new(*x, *y)),
        [x, y, v] => Ok(NormalizedLandmark::new(*x, *y).with_visibility(*v)),
        _ => Err(ReplayModelError::LandmarkShape {
          frame,
          index,
          len: values.len(),
        }),
      },
      LandmarkRecord::Object(lm) => Ok(lm),
    })
    .enumerate()
    .map(|(index, landmark)| -> Result<NormalizedLandmark, ReplayModelError> {
      let landmark = landmark?;
      let in_range =
        |v: f32| v.is_finite() && f64::from(v).abs() <= PIXEL_LIMIT_FACTOR;
      if in_range(landmark.x) && in_range(landmark.y) {
        Ok(landmark)
      } else {
        Err(ReplayModelError::LandmarkRange {
          frame,
          index,
          x: landmark.x,
          y: landmark.y,
          limit: PIXEL_LIMIT_FACTOR,
        })
      }
    })
    .collect::<Result<Vec<_>, _>>()?;

  NormalizedPose::try_from(landmarks)
    .map_err(|source| ReplayModelError::LandmarkCount { frame, source })
}

/// 回放模型
///
/// 从 JSON 文件读取外部模型预先输出的检测结果，按帧索引应答。
/// 文件格式：
///
/// ```json
/// [
///   { "frame": 0, "landmarks": [[0.51, 0.22, 0.99], ...] },
///   { "frame": 1, "landmarks": null }
/// ]
/// ```
///
/// 没有记录的帧视为未检测到人体。
#[derive(Debug, Default)]
pub struct ReplayModel {
  detections: HashMap<u64, PoseDetection>,
}

impl FromUrlWithScheme for ReplayModel {
  const SCHEME: &'static str = "replay";
}

impl FromUrl for ReplayModel {
  type Error = ReplayModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ReplayModelError::SchemeMismatch(Self::SCHEME));
    }
    Self::open(url_file_path(url))
  }
}

impl ReplayModel {
  pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ReplayModelError> {
    let path = path.as_ref();
    info!("加载回放文件: {}", path.display());
    let contents = std::fs::read_to_string(path)?;
    let model = Self::from_json(&contents)?;
    info!("回放文件加载完成，共 {} 帧记录", model.len());
    Ok(model)
  }

  pub fn from_json(contents: &str) -> Result<Self, ReplayModelError> {
    let records: Vec<FrameRecord> = serde_json::from_str(contents)?;
    let mut detections = HashMap::with_capacity(records.len());

    for record in records {
      let detection = match record.landmarks {
        Some(landmarks) => Some(to_pose(record.frame, landmarks)?),
        None => None,
      };
      if detections.insert(record.frame, detection).is_some() {
        warn!("第 {} 帧存在重复记录，使用最后一条", record.frame);
      }
    }

    Ok(Self { detections })
  }

  pub fn insert(&mut self, frame: u64, detection: PoseDetection) {
    self.detections.insert(frame, detection);
  }

  pub fn len(&self) -> usize {
    self.detections.len()
  }

  pub fn is_empty(&self) -> bool {
    self.detections.is_empty()
  }

  pub fn detection(&self, frame: u64) -> PoseDetection {
    self.detections.get(&frame).cloned().flatten()
  }
}

impl Model for ReplayModel {
  type Input = Frame;
  type Output = PoseDetection;
  type Error = Infallible;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let detection = self.detection(input.index);
    debug!(
      "第 {} 帧回放结果: {}",
      input.index,
      if detection.is_some() {
        "检测到人体"
      } else {
        "无检测"
      }
    );
    Ok(detection)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::landmark::POSE_LANDMARK_COUNT;
  use image::RgbImage;

  fn pose_json(frame: u64, count: usize) -> String {
    let landmarks: Vec<String> = (0..count)
      .map(|i| format!("[{}, 0.5, 0.9]", i as f32 / 100.0))
      .collect();
    format!(
      r#"{{ "frame": {}, "landmarks": [{}] }}"#,
      frame,
      landmarks.join(", ")
    )
  }

  #[test]
  fn test_replay_by_frame_index() {
    let json = format!(
      r#"[{}, {{ "frame": 1, "landmarks": null }}]"#,
      pose_json(0, POSE_LANDMARK_COUNT)
    );
    let model = ReplayModel::from_json(&json).unwrap();
    assert_eq!(model.len(), 2);

    let pose = model
      .infer(&Frame::new(RgbImage::new(1, 1), 0))
      .unwrap()
      .unwrap();
    assert_eq!(pose.landmarks().len(), POSE_LANDMARK_COUNT);
    assert_eq!(pose.landmarks()[3].x, 0.03);
    assert_eq!(pose.landmarks()[3].visibility, 0.9);

    assert!(
      model
        .infer(&Frame::new(RgbImage::new(1, 1), 1))
        .unwrap()
        .is_none()
    );
    // 没有记录的帧
    assert!(
      model
        .infer(&Frame::new(RgbImage::new(1, 1), 42))
        .unwrap()
        .is_none()
    );
  }

  #[test]
  fn test_object_landmarks() {
    let landmarks = vec![r#"{ "x": 0.25, "y": 0.75 }"#; POSE_LANDMARK_COUNT].join(", ");
    let json = format!(r#"[{{ "frame": 3, "landmarks": [{}] }}]"#, landmarks);
    let model = ReplayModel::from_json(&json).unwrap();
    let pose = model.detection(3).unwrap();
    assert_eq!(pose.landmarks()[0], NormalizedLandmark::new(0.25, 0.75));
  }

  #[test]
  fn test_partial_pose_rejected() {
    let json = format!("[{}]", pose_json(7, 10));
    match ReplayModel::from_json(&json) {
      Err(ReplayModelError::LandmarkCount { frame, source }) => {
        assert_eq!(frame, 7);
        assert_eq!(source.actual, 10);
        assert_eq!(source.expected, POSE_LANDMARK_COUNT);
      }
      other => panic!("unexpected: {:?}", other.map(|m| m.len())),
    }
  }

  #[test]
  fn test_bad_landmark_shape() {
    let mut landmarks = vec!["[0.1, 0.2]"; POSE_LANDMARK_COUNT];
    landmarks[4] = "[0.1]";
    let json = format!(
      r#"[{{ "frame": 0, "landmarks": [{}] }}]"#,
      landmarks.join(", ")
    );
    assert!(matches!(
      ReplayModel::from_json(&json),
      Err(ReplayModelError::LandmarkShape {
        frame: 0,
        index: 4,
        len: 1
      })
    ));
  }

  #[test]
  fn test_far_coordinates_rejected() {
    let mut landmarks = vec!["[0.1, 0.2]"; POSE_LANDMARK_COUNT];
    landmarks[0] = "[1.0e9, 0.5]";
    let json = format!(
      r#"[{{ "frame": 3, "landmarks": [{}] }}]"#,
      landmarks.join(", ")
    );
    assert!(matches!(
      ReplayModel::from_json(&json),
      Err(ReplayModelError::LandmarkRange {
        frame: 3,
        index: 0,
        ..
      })
    ));

    // f32 溢出为无穷大
    landmarks[0] = "[0.5, 1.0e40]";
    let json = format!(
      r#"[{{ "frame": 3, "landmarks": [{}] }}]"#,
      landmarks.join(", ")
    );
    assert!(matches!(
      ReplayModel::from_json(&json),
      Err(ReplayModelError::LandmarkRange { index: 0, .. })
    ));

    // 略微超出图像的坐标仍然接受
    landmarks[0] = "[-0.2, 1.3]";
    let json = format!(
      r#"[{{ "frame": 3, "landmarks": [{}] }}]"#,
      landmarks.join(", ")
    );
    assert!(ReplayModel::from_json(&json).is_ok());
  }

  #[test]
  fn test_scheme_mismatch() {
    let url = Url::parse("onnx:///models/pose.onnx").unwrap();
    assert!(matches!(
      ReplayModel::from_url(&url),
      Err(ReplayModelError::SchemeMismatch("replay"))
    ));
  }
}
