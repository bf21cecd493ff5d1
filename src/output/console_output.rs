// 该文件是 Quadro 项目的一部分。
// src/output/console_output.rs - 控制台输出
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

use std::io::Write;

use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme, input::RawImage, model::EquationPrediction, output::Render,
};

#[derive(Error, Debug)]
pub enum ConsoleOutputError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

pub struct ConsoleOutput;

impl FromUrlWithScheme for ConsoleOutput {
  const SCHEME: &'static str = "console";
}

impl FromUrl for ConsoleOutput {
  type Error = ConsoleOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ConsoleOutputError::SchemeMismatch(url.scheme().to_string()));
    }
    Ok(ConsoleOutput)
  }
}

impl ConsoleOutput {
  pub fn format_result(result: &EquationPrediction) -> String {
    format!("Predicted coefficients are: {}", result)
  }
}

impl Render<RawImage, EquationPrediction> for ConsoleOutput {
  type Error = ConsoleOutputError;

  fn render_result(&self, frame: &RawImage, result: &EquationPrediction) -> Result<(), Self::Error> {
    info!("{}: {}", frame.source, result);
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", Self::format_result(result))?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::Prediction;

  #[test]
  fn formats_all_three_slots() {
    let result = EquationPrediction {
      coefficients: [
        Prediction::from_class_index(Some(4)),
        Prediction::from_class_index(Some(5)),
        Prediction::NoPrediction,
      ],
    };
    assert_eq!(
      ConsoleOutput::format_result(&result),
      "Predicted coefficients are: [-1 1 no prediction]"
    );
  }
}
