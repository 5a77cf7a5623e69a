// 该文件是 Guanjie （关节） 项目的一部分。
// src/angle.rs - 三点关节角度计算
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

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::landmark::{LandmarkStore, PoseError};

/// 计算以 `p2` 为顶点、从射线 p2→p1 转到射线 p2→p3 的角度，单位为度，范围 [0, 360)。
///
/// 坐标为图像坐标（x 向右，y 向下），角度按 atan2 的正方向增加，
/// 在屏幕上表现为顺时针。例如 `(0,1), (0,0), (1,0)` 得到 270，
/// 交换首尾两点得到 90。
///
/// 长度为零的射线按 `atan2(0, 0) = 0` 处理，即视为指向 +x 方向，
/// 因此重复点也会得到确定的结果。
pub fn angle_between(p1: (i32, i32), p2: (i32, i32), p3: (i32, i32)) -> f64 {
  let (x1, y1) = (f64::from(p1.0), f64::from(p1.1));
  let (x2, y2) = (f64::from(p2.0), f64::from(p2.1));
  let (x3, y3) = (f64::from(p3.0), f64::from(p3.1));

  let mut angle = ((y3 - y2).atan2(x3 - x2) - (y1 - y2).atan2(x1 - x2)).to_degrees();
  if angle < 0.0 {
    angle += 360.0;
  }
  // 极小的负值加 360 后可能舍入成 360.0
  if angle >= 360.0 {
    angle = 0.0;
  }
  angle
}

/// 在关键点存储上按位置索引计算角度，`i2` 为顶点
pub fn compute_angle(
  store: &LandmarkStore,
  i1: usize,
  i2: usize,
  i3: usize,
) -> Result<f64, PoseError> {
  if store.is_empty() {
    return Err(PoseError::EmptyStore);
  }
  let p1 = store.point(i1)?;
  let p2 = store.point(i2)?;
  let p3 = store.point(i3)?;
  Ok(angle_between(p1, p2, p3))
}

/// 将有向角折叠到 [0, 180]，与两条射线的先后顺序无关
pub fn interior_angle(degrees: f64) -> f64 {
  let degrees = degrees.rem_euclid(360.0);
  if degrees > 180.0 {
    360.0 - degrees
  } else {
    degrees
  }
}

/// 一个角度查询：首点、顶点、末点的位置索引
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AngleQuery {
  pub first: usize,
  pub vertex: usize,
  pub last: usize,
}

impl AngleQuery {
  pub fn new(first: usize, vertex: usize, last: usize) -> Self {
    Self {
      first,
      vertex,
      last,
    }
  }

  pub fn evaluate(&self, store: &LandmarkStore) -> Result<JointAngle, PoseError> {
    let degrees = compute_angle(store, self.first, self.vertex, self.last)?;
    Ok(JointAngle {
      query: *self,
      degrees,
    })
  }
}

impl fmt::Display for AngleQuery {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{},{},{}", self.first, self.vertex, self.last)
  }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AngleQueryParseError {
  #[error("角度查询需要 3 个索引，实际为 {0} 个")]
  WrongArity(usize),
  #[error("无效的关键点索引 '{0}'")]
  InvalidIndex(String),
}

impl FromStr for AngleQuery {
  type Err = AngleQueryParseError;

  /// 解析形如 `12,14,16` 的文本
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 3 {
      return Err(AngleQueryParseError::WrongArity(parts.len()));
    }
    let mut indices = [0usize; 3];
    for (slot, part) in indices.iter_mut().zip(&parts) {
      *slot = part
        .parse()
        .map_err(|_| AngleQueryParseError::InvalidIndex(part.to_string()))?;
    }
    Ok(Self::new(indices[0], indices[1], indices[2]))
  }
}

/// 一次角度查询的结果
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointAngle {
  pub query: AngleQuery,
  pub degrees: f64,
}

impl JointAngle {
  pub fn interior(&self) -> f64 {
    interior_angle(self.degrees)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::landmark::Landmark;

  const EPS: f64 = 1e-9;

  fn store_of(points: &[(i32, i32)]) -> LandmarkStore {
    LandmarkStore::from(
      points
        .iter()
        .enumerate()
        .map(|(i, &(x, y))| Landmark::new(i as u32, x, y))
        .collect::<Vec<_>>(),
    )
  }

  #[test]
  fn test_collinear_is_straight() {
    let store = store_of(&[(0, 0), (1, 0), (2, 0)]);
    let angle = compute_angle(&store, 0, 1, 2).unwrap();
    assert!((angle - 180.0).abs() < EPS, "angle = {}", angle);
  }

  #[test]
  fn test_right_angle_orientation() {
    let store = store_of(&[(0, 1), (0, 0), (1, 0)]);
    let angle = compute_angle(&store, 0, 1, 2).unwrap();
    assert!((angle - 270.0).abs() < EPS, "angle = {}", angle);

    let reversed = compute_angle(&store, 2, 1, 0).unwrap();
    assert!((reversed - 90.0).abs() < EPS, "angle = {}", reversed);
  }

  #[test]
  fn test_empty_store() {
    let mut store = store_of(&[(0, 0), (1, 1), (2, 2)]);
    store.set(vec![]);
    assert_eq!(compute_angle(&store, 0, 1, 2), Err(PoseError::EmptyStore));
  }

  #[test]
  fn test_index_out_of_range() {
    let store = store_of(&[(0, 0), (1, 1), (2, 2)]);
    assert_eq!(
      compute_angle(&store, 0, 1, 5),
      Err(PoseError::IndexOutOfRange { index: 5, len: 3 })
    );
    assert_eq!(
      compute_angle(&store, 5, 1, 2),
      Err(PoseError::IndexOutOfRange { index: 5, len: 3 })
    );
  }

  #[test]
  fn test_result_always_in_range() {
    let coords: Vec<(i32, i32)> = (-2..=2).flat_map(|x| (-2..=2).map(move |y| (x, y))).collect();
    for &p1 in &coords {
      for &p2 in &coords {
        for &p3 in &coords {
          let angle = angle_between(p1, p2, p3);
          assert!(
            (0.0..360.0).contains(&angle),
            "{:?} {:?} {:?} -> {}",
            p1,
            p2,
            p3,
            angle
          );
        }
      }
    }
  }

  #[test]
  fn test_zero_length_ray_points_along_x() {
    // p1 与顶点重合，第一条射线视为 0 度
    let angle = angle_between((3, 3), (3, 3), (3, 5));
    assert!((angle - 90.0).abs() < EPS);

    // 三点完全重合
    assert_eq!(angle_between((1, 1), (1, 1), (1, 1)), 0.0);

    // 首尾相同
    assert_eq!(angle_between((4, 0), (0, 0), (4, 0)), 0.0);
  }

  #[test]
  fn test_duplicate_indices_are_allowed() {
    let store = store_of(&[(0, 0), (2, 0), (2, 2)]);
    let angle = compute_angle(&store, 1, 1, 2).unwrap();
    assert!((angle - 90.0).abs() < EPS);
  }

  #[test]
  fn test_reflection_gives_complementary_angle() {
    let a = angle_between((0, -1), (0, 0), (1, 1));
    let b = angle_between((0, 1), (0, 0), (1, -1));
    assert!((a + b - 360.0).abs() < EPS);
    assert!((interior_angle(a) - interior_angle(b)).abs() < EPS);
  }

  #[test]
  fn test_interior_angle() {
    assert!((interior_angle(270.0) - 90.0).abs() < EPS);
    assert!((interior_angle(90.0) - 90.0).abs() < EPS);
    assert!((interior_angle(180.0) - 180.0).abs() < EPS);
    assert_eq!(interior_angle(0.0), 0.0);
    assert!((interior_angle(-45.0) - 45.0).abs() < EPS);
  }

  #[test]
  fn test_query_parse() {
    assert_eq!("12,14,16".parse::<AngleQuery>(), Ok(AngleQuery::new(12, 14, 16)));
    assert_eq!(" 11 , 13,15".parse::<AngleQuery>(), Ok(AngleQuery::new(11, 13, 15)));
    assert_eq!(
      "1,2".parse::<AngleQuery>(),
      Err(AngleQueryParseError::WrongArity(2))
    );
    assert_eq!(
      "1,x,3".parse::<AngleQuery>(),
      Err(AngleQueryParseError::InvalidIndex("x".to_string()))
    );
    assert_eq!(AngleQuery::new(23, 25, 27).to_string(), "23,25,27");
  }

  #[test]
  fn test_query_evaluate() {
    let store = store_of(&[(0, 0), (1, 0), (2, 0)]);
    let result = AngleQuery::new(0, 1, 2).evaluate(&store).unwrap();
    assert_eq!(result.query, AngleQuery::new(0, 1, 2));
    assert!((result.degrees - 180.0).abs() < EPS);
    assert!((result.interior() - 180.0).abs() < EPS);
  }
}
