// 该文件是 Guanjie （关节） 项目的一部分。
// src/reps.rs - 基于关节角度的动作次数统计
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

use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepError {
  #[error("无效的角度区间: [{low}, {high}]")]
  InvalidRange { low: f64, high: f64 },
  #[error("无法解析角度区间 '{0}'，格式应为 LOW,HIGH")]
  Parse(String),
}

/// 动作当前的运动方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RepDirection {
  /// 朝 100% 端运动
  Up,
  /// 朝 0% 端运动
  Down,
}

/// 角度区间，`low` 对应 0%，`high` 对应 100%
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepRange {
  pub low: f64,
  pub high: f64,
}

impl RepRange {
  pub fn new(low: f64, high: f64) -> Result<Self, RepError> {
    if !low.is_finite() || !high.is_finite() || low == high {
      return Err(RepError::InvalidRange { low, high });
    }
    Ok(Self { low, high })
  }

  /// 角度线性映射到 0~100，超出区间时截断；`low > high` 时映射方向相反
  pub fn progress(&self, angle: f64) -> f64 {
    ((angle - self.low) / (self.high - self.low) * 100.0).clamp(0.0, 100.0)
  }
}

impl FromStr for RepRange {
  type Err = RepError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (low, high) = s
      .split_once(',')
      .ok_or_else(|| RepError::Parse(s.to_string()))?;
    let low: f64 = low
      .trim()
      .parse()
      .map_err(|_| RepError::Parse(s.to_string()))?;
    let high: f64 = high
      .trim()
      .parse()
      .map_err(|_| RepError::Parse(s.to_string()))?;
    RepRange::new(low, high)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RepState {
  /// 0~100
  pub progress: f64,
  /// 已完成次数，半次计 0.5
  pub count: f32,
  pub direction: RepDirection,
}

/// 动作计数器
///
/// 每次到达 100% 端（上行时）或 0% 端（下行时）计半次，
/// 一个完整的往返计一次。
#[derive(Debug, Clone)]
pub struct RepCounter {
  range: RepRange,
  half_reps: u32,
  direction: RepDirection,
}

impl RepCounter {
  pub fn new(range: RepRange) -> Self {
    Self {
      range,
      half_reps: 0,
      direction: RepDirection::Up,
    }
  }

  pub fn range(&self) -> RepRange {
    self.range
  }

  pub fn update(&mut self, angle: f64) -> RepState {
    let progress = self.range.progress(angle);

    match self.direction {
      RepDirection::Up if progress >= 100.0 => {
        self.half_reps += 1;
        self.direction = RepDirection::Down;
        debug!("到达区间上端，计数 {}", self.count());
      }
      RepDirection::Down if progress <= 0.0 => {
        self.half_reps += 1;
        self.direction = RepDirection::Up;
        debug!("到达区间下端，计数 {}", self.count());
      }
      _ => {}
    }

    RepState {
      progress,
      count: self.count(),
      direction: self.direction,
    }
  }

  pub fn count(&self) -> f32 {
    self.half_reps as f32 / 2.0
  }

  pub fn direction(&self) -> RepDirection {
    self.direction
  }

  pub fn reset(&mut self) {
    self.half_reps = 0;
    self.direction = RepDirection::Up;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn counter() -> RepCounter {
    RepCounter::new(RepRange::new(210.0, 310.0).unwrap())
  }

  #[test]
  fn test_progress_mapping() {
    let range = RepRange::new(210.0, 310.0).unwrap();
    assert_eq!(range.progress(210.0), 0.0);
    assert_eq!(range.progress(260.0), 50.0);
    assert_eq!(range.progress(310.0), 100.0);
    assert_eq!(range.progress(100.0), 0.0);
    assert_eq!(range.progress(350.0), 100.0);
  }

  #[test]
  fn test_inverted_range() {
    let range = RepRange::new(160.0, 60.0).unwrap();
    assert_eq!(range.progress(160.0), 0.0);
    assert_eq!(range.progress(60.0), 100.0);
    assert_eq!(range.progress(110.0), 50.0);
  }

  #[test]
  fn test_invalid_range() {
    assert!(RepRange::new(10.0, 10.0).is_err());
    assert!(RepRange::new(f64::NAN, 10.0).is_err());
    assert!(RepRange::new(0.0, f64::INFINITY).is_err());
  }

  #[test]
  fn test_full_cycle_counts_one() {
    let mut c = counter();
    for angle in [220.0, 260.0, 300.0, 315.0, 280.0, 240.0, 205.0] {
      c.update(angle);
    }
    assert_eq!(c.count(), 1.0);
    assert_eq!(c.direction(), RepDirection::Up);
  }

  #[test]
  fn test_half_rep() {
    let mut c = counter();
    let state = c.update(320.0);
    assert_eq!(state.count, 0.5);
    assert_eq!(state.direction, RepDirection::Down);
    assert_eq!(state.progress, 100.0);
  }

  #[test]
  fn test_staying_at_top_counts_once() {
    let mut c = counter();
    for _ in 0..5 {
      c.update(330.0);
    }
    assert_eq!(c.count(), 0.5);
  }

  #[test]
  fn test_reset() {
    let mut c = counter();
    c.update(330.0);
    c.update(200.0);
    assert_eq!(c.count(), 1.0);
    c.reset();
    assert_eq!(c.count(), 0.0);
    assert_eq!(c.direction(), RepDirection::Up);
  }

  #[test]
  fn test_parse_range() {
    assert_eq!(
      "210,310".parse::<RepRange>(),
      Ok(RepRange {
        low: 210.0,
        high: 310.0
      })
    );
    assert_eq!(
      "abc".parse::<RepRange>(),
      Err(RepError::Parse("abc".to_string()))
    );
    assert!("5, 5".parse::<RepRange>().is_err());
  }
}
