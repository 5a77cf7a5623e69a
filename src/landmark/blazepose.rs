// 该文件是 Guanjie （关节） 项目的一部分。
// src/landmark/blazepose.rs - BlazePose 33 关键点拓扑
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

pub const POSE_LANDMARK_COUNT: usize = 33;

/// BlazePose 的 33 个关键点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum PoseLandmark {
  Nose = 0,
  LeftEyeInner = 1,
  LeftEye = 2,
  LeftEyeOuter = 3,
  RightEyeInner = 4,
  RightEye = 5,
  RightEyeOuter = 6,
  LeftEar = 7,
  RightEar = 8,
  MouthLeft = 9,
  MouthRight = 10,
  LeftShoulder = 11,
  RightShoulder = 12,
  LeftElbow = 13,
  RightElbow = 14,
  LeftWrist = 15,
  RightWrist = 16,
  LeftPinky = 17,
  RightPinky = 18,
  LeftIndex = 19,
  RightIndex = 20,
  LeftThumb = 21,
  RightThumb = 22,
  LeftHip = 23,
  RightHip = 24,
  LeftKnee = 25,
  RightKnee = 26,
  LeftAnkle = 27,
  RightAnkle = 28,
  LeftHeel = 29,
  RightHeel = 30,
  LeftFootIndex = 31,
  RightFootIndex = 32,
}

impl PoseLandmark {
  pub const ALL: [PoseLandmark; POSE_LANDMARK_COUNT] = [
    Self::Nose,
    Self::LeftEyeInner,
    Self::LeftEye,
    Self::LeftEyeOuter,
    Self::RightEyeInner,
    Self::RightEye,
    Self::RightEyeOuter,
    Self::LeftEar,
    Self::RightEar,
    Self::MouthLeft,
    Self::MouthRight,
    Self::LeftShoulder,
    Self::RightShoulder,
    Self::LeftElbow,
    Self::RightElbow,
    Self::LeftWrist,
    Self::RightWrist,
    Self::LeftPinky,
    Self::RightPinky,
    Self::LeftIndex,
    Self::RightIndex,
    Self::LeftThumb,
    Self::RightThumb,
    Self::LeftHip,
    Self::RightHip,
    Self::LeftKnee,
    Self::RightKnee,
    Self::LeftAnkle,
    Self::RightAnkle,
    Self::LeftHeel,
    Self::RightHeel,
    Self::LeftFootIndex,
    Self::RightFootIndex,
  ];

  pub fn from_index(index: usize) -> Option<Self> {
    Self::ALL.get(index).copied()
  }

  pub fn index(self) -> usize {
    self as usize
  }
}

/// 骨架连线（两端均为关键点位置索引）
pub const POSE_CONNECTIONS: [(usize, usize); 35] = [
  (0, 1),
  (1, 2),
  (2, 3),
  (3, 7),
  (0, 4),
  (4, 5),
  (5, 6),
  (6, 8),
  (9, 10),
  (11, 12),
  (11, 13),
  (13, 15),
  (15, 17),
  (15, 19),
  (15, 21),
  (17, 19),
  (12, 14),
  (14, 16),
  (16, 18),
  (16, 20),
  (16, 22),
  (18, 20),
  (11, 23),
  (12, 24),
  (23, 24),
  (23, 25),
  (24, 26),
  (25, 27),
  (26, 28),
  (27, 29),
  (28, 30),
  (29, 31),
  (30, 32),
  (27, 31),
  (28, 32),
];
