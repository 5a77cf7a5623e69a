// 该文件是 Guanjie （关节） 项目的一部分。
// src/args.rs - 命令行参数配置
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

use clap::Parser;
use tracing::info;
use url::Url;

use crate::{
  angle::AngleQuery,
  pipeline::Pipeline,
  reps::{RepCounter, RepRange},
};

/// Guanjie 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型来源，例如 replay:///data/detections.json
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入来源
  /// 支持格式:
  /// - 单张图片: image:///path/to/frame.png
  /// - 图片目录: folder:///path/to/frames
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径
  /// 支持格式:
  /// - 日志: log: 或 log:?json
  /// - 单张图片: image:///path/to/out.png?font=/path/to/font.ttf
  /// - 按日期归档: folder:///path/to/records[?record][&always]
  #[arg(long, value_name = "OUTPUT", default_value = "log:")]
  pub output: Url,

  /// 需要计算的关节角度，格式为 A,B,C（B 为顶点），可重复指定
  #[arg(long = "joint", value_name = "A,B,C")]
  pub joints: Vec<AngleQuery>,

  /// 按第一个关节角度计数，格式为 LOW,HIGH
  #[arg(long, value_name = "LOW,HIGH", allow_hyphen_values = true)]
  pub reps: Option<RepRange>,

  /// 最大处理帧数
  #[arg(long, value_name = "FRAME_NUMBER")]
  pub frame_number: Option<usize>,
}

impl Args {
  pub fn log(&self) {
    info!("模型来源: {}", self.model);
    info!("输入来源: {}", self.input);
    info!("输出路径: {}", self.output);
    for joint in &self.joints {
      info!("关节角度: {}", joint);
    }
  }

  /// 由参数构造单帧处理流程
  pub fn pipeline(&self) -> Pipeline {
    let pipeline = Pipeline::new(self.joints.clone());
    match self.reps {
      Some(range) => {
        info!("动作计数区间: [{}, {}]", range.low, range.high);
        pipeline.with_rep_counter(RepCounter::new(range))
      }
      None => pipeline,
    }
  }
}
