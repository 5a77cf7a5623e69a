// 该文件是 Guanjie （关节） 项目的一部分。
// src/pipeline.rs - 单帧处理流程：检测结果 → 关键点存储 → 角度查询 → 计数
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

use serde::Serialize;
use tracing::debug;

use crate::{
  angle::{AngleQuery, JointAngle},
  frame::FrameDimensions,
  landmark::{LandmarkStore, NormalizedPose},
  reps::{RepCounter, RepState},
};

/// 一帧的全部计算结果，交给渲染端使用
#[derive(Debug, Clone, Default, Serialize)]
pub struct PoseResult {
  pub frame: u64,
  pub landmarks: LandmarkStore,
  pub angles: Vec<JointAngle>,
  pub reps: Option<RepState>,
}

impl PoseResult {
  /// 本帧是否没有检测到人体
  pub fn is_empty(&self) -> bool {
    self.landmarks.is_empty()
  }
}

#[derive(Debug, Clone, Default)]
pub struct Pipeline {
  queries: Vec<AngleQuery>,
  rep_counter: Option<RepCounter>,
}

impl Pipeline {
  pub fn new(queries: Vec<AngleQuery>) -> Self {
    Self {
      queries,
      rep_counter: None,
    }
  }

  /// 以第一个角度查询的结果驱动计数器
  pub fn with_rep_counter(mut self, counter: RepCounter) -> Self {
    self.rep_counter = Some(counter);
    self
  }

  pub fn queries(&self) -> &[AngleQuery] {
    &self.queries
  }

  pub fn rep_counter(&self) -> Option<&RepCounter> {
    self.rep_counter.as_ref()
  }

  /// 处理一帧。每帧都新建关键点存储，不与上一帧共享。
  pub fn process<F: FrameDimensions>(
    &mut self,
    frame: &F,
    frame_index: u64,
    detection: Option<&NormalizedPose>,
  ) -> PoseResult {
    let mut landmarks = LandmarkStore::new();
    landmarks.set_from_detection(detection, frame.width(), frame.height());

    let angles: Vec<JointAngle> = self
      .queries
      .iter()
      .filter_map(|query| match query.evaluate(&landmarks) {
        Ok(angle) => Some(angle),
        Err(e) => {
          debug!("第 {} 帧角度查询 {} 失败: {}", frame_index, query, e);
          None
        }
      })
      .collect();

    let reps = match (&mut self.rep_counter, self.queries.first()) {
      (Some(counter), Some(first)) => angles
        .iter()
        .find(|angle| angle.query == *first)
        .map(|angle| counter.update(angle.degrees)),
      _ => None,
    };

    PoseResult {
      frame: frame_index,
      landmarks,
      angles,
      reps,
    }
  }
}
