// 该文件是 Guanjie （关节） 项目的一部分。
// src/task.rs - 任务定义：输入 → 模型 → 处理流程 → 输出
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

use std::{
  sync::mpsc::{self, Receiver},
  thread,
  time::{Duration, Instant},
};
use tracing::{info, warn};

use crate::{
  frame::Frame,
  model::{Model, PoseDetection},
  output::Render,
  pipeline::{Pipeline, PoseResult},
};

/// 中断后等待主循环退出的最长时间
const FORCE_EXIT_AFTER: Duration = Duration::from_secs(30);

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error>;
}

/// 只处理输入的第一帧
pub struct OneShotTask {
  pipeline: Pipeline,
}

impl OneShotTask {
  pub fn new(pipeline: Pipeline) -> Self {
    Self { pipeline }
  }
}

impl<
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = Frame>,
  M: Model<Input = Frame, Output = PoseDetection, Error = ME>,
  O: Render<Frame, PoseResult, Error = RE>,
> Task<I, M, O> for OneShotTask
{
  type Error = anyhow::Error;

  fn run_task(mut self, mut input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始推理...");
    let now = Instant::now();
    let detection = model.infer(&frame)?;
    let elapsed = now.elapsed();
    info!("推理完成，耗时: {:.2?}", elapsed);
    let result = self
      .pipeline
      .process(&frame, frame.index, detection.as_ref());
    output.render_result(&frame, &result)?;
    info!("渲染完成，耗时: {:.2?}", now.elapsed());

    Ok(())
  }
}

/// 逐帧处理直到输入耗尽、达到帧数上限或收到中断信号
#[derive(Default, Debug)]
pub struct ContinuousTask {
  pipeline: Pipeline,
  frame_number: Option<usize>,
}

impl ContinuousTask {
  pub fn new(pipeline: Pipeline) -> Self {
    Self {
      pipeline,
      frame_number: None,
    }
  }

  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }
}

/// 注册 Ctrl-C 处理函数。收到信号后通知主循环，超时仍未退出则强制结束进程。
fn install_interrupt_handler() -> Option<Receiver<()>> {
  let (tx, rx) = mpsc::channel();
  let installed = ctrlc::set_handler(move || {
    info!("收到中断信号，准备退出...");
    let _ = tx.send(());
    thread::spawn(|| {
      thread::sleep(FORCE_EXIT_AFTER);
      warn!("强制退出程序");
      std::process::exit(1);
    });
  });

  match installed {
    Ok(()) => Some(rx),
    Err(e) => {
      warn!("无法注册中断处理函数: {}", e);
      None
    }
  }
}

impl<
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = Frame>,
  M: Model<Input = Frame, Output = PoseDetection, Error = ME>,
  O: Render<Frame, PoseResult, Error = RE>,
> Task<I, M, O> for ContinuousTask
{
  type Error = anyhow::Error;

  fn run_task(mut self, input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let interrupt = install_interrupt_handler();

    let started = Instant::now();
    let mut processed: usize = 0;
    let mut now = Instant::now();
    for frame in input {
      processed += 1;
      info!("处理第 {} 帧图像", frame.index);
      let detection = model.infer(&frame)?;
      let elapsed_a = now.elapsed();
      let result = self
        .pipeline
        .process(&frame, frame.index, detection.as_ref());
      output.render_result(&frame, &result)?;
      let elapsed_b = now.elapsed();
      now = Instant::now();
      info!("推理完成，耗时: {:.2?} / {:.2?}", elapsed_a, elapsed_b);
      if self.frame_number.is_some_and(|n| processed >= n) {
        info!("达到指定帧数 {}, 退出任务循环", processed);
        break;
      }
      if interrupt.as_ref().is_some_and(|rx| rx.try_recv().is_ok()) {
        warn!("中断信号接收，退出任务循环");
        break;
      }
    }

    let total = started.elapsed().as_secs_f64();
    if processed > 0 && total > 0.0 {
      info!(
        "共处理 {} 帧，平均 {:.2} FPS",
        processed,
        processed as f64 / total
      );
    }
    if let Some(counter) = self.pipeline.rep_counter() {
      info!("动作计数: {:.1}", counter.count());
    }

    info!("任务完成，退出");
    Ok(())
  }
}
