// 该文件是 Guanjie （关节） 项目的一部分。
// src/output/log_output.rs - 日志输出
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

use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, output::Render, pipeline::PoseResult};

#[derive(Error, Debug)]
pub enum LogOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("JSON 序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

/// 不产生文件，只把每帧的角度与计数写入日志。`?json` 时整帧结果以一行 JSON 输出。
#[derive(Debug, Clone, Default)]
pub struct LogOutput {
  json: bool,
}

impl FromUrlWithScheme for LogOutput {
  const SCHEME: &'static str = "log";
}

impl FromUrl for LogOutput {
  type Error = LogOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(LogOutputError::SchemeMismatch);
    }
    let json = url.query_pairs().any(|(k, _)| k == "json");
    Ok(Self { json })
  }
}

impl LogOutput {
  /// 生成一帧的日志文本
  pub fn format_result(&self, result: &PoseResult) -> Result<String, LogOutputError> {
    if self.json {
      return Ok(serde_json::to_string(result)?);
    }

    if result.is_empty() {
      return Ok(format!("帧 {}: 未检测到人体", result.frame));
    }

    let mut line = format!("帧 {}:", result.frame);
    for angle in &result.angles {
      line.push_str(&format!(" [{}] {:.1}°", angle.query, angle.degrees));
    }
    if let Some(reps) = &result.reps {
      line.push_str(&format!(" 计数 {:.1} ({:.0}%)", reps.count, reps.progress));
    }
    Ok(line)
  }
}

impl<F> Render<F, PoseResult> for LogOutput {
  type Error = LogOutputError;

  fn render_result(&self, _frame: &F, result: &PoseResult) -> Result<(), Self::Error> {
    info!("{}", self.format_result(result)?);
    Ok(())
  }
}
