// 该文件是 Quadro 项目的一部分。
// src/bin/simple_continueshot.rs - 批量图像系数识别
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

use anyhow::Result;
use clap::Parser;
use url::Url;

use quadro::{
  FromUrl,
  input::InputWrapper,
  model::{CachedLoader, EquationClassifier, RknnLoader},
  output::OutputWrapper,
  task::{ContinuousTask, Task},
};
use tracing::info;

/// Quadro 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 二次项系数 a 的 RKNN 模型
  #[arg(long, value_name = "MODEL")]
  pub quadratic_model: Url,
  /// 一次项系数 b 的 RKNN 模型
  #[arg(long, value_name = "MODEL")]
  pub linear_model: Url,
  /// 常数项 c 的 RKNN 模型
  #[arg(long, value_name = "MODEL")]
  pub constant_model: Url,
  /// 输入来源，例如 folder:///data/equations
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出位置
  #[arg(long, value_name = "OUTPUT", default_value = "console://")]
  pub output: Url,
  /// 处理图像数量
  #[arg(long, value_name = "FRAME_NUMBER")]
  pub frame_number: Option<usize>,
  /// 复用已加载的模型，而不是每张图像重新加载
  #[arg(long)]
  pub cache_models: bool,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型 a: {}", args.quadratic_model);
  info!("模型 b: {}", args.linear_model);
  info!("模型 c: {}", args.constant_model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let input = InputWrapper::from_url(&args.input)?;
  let output = OutputWrapper::from_url(&args.output)?;
  let models = [args.quadratic_model, args.linear_model, args.constant_model];
  let task = ContinuousTask::default()
    .with_frame_number(args.frame_number)
    .with_interrupt(true);

  if args.cache_models {
    let model = EquationClassifier::new(CachedLoader::new(RknnLoader), models);
    task.run_task(input, model, output)?;
  } else {
    let model = EquationClassifier::new(RknnLoader, models);
    task.run_task(input, model, output)?;
  }

  Ok(())
}
