// 该文件是 Quadro 项目的一部分。
// src/output/json_output.rs - JSON Lines 结果文件
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

use std::{fs::OpenOptions, io::Write, path::Path};

use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  input::RawImage,
  model::{CoefficientSlot, EquationPrediction, WithLabel},
  output::Render,
};

#[derive(Error, Debug)]
pub enum JsonFileOutputError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// 每张图像追加一行 JSON 记录
pub struct JsonFileOutput {
  path: String,
}

impl FromUrlWithScheme for JsonFileOutput {
  const SCHEME: &'static str = "json";
}

impl FromUrl for JsonFileOutput {
  type Error = JsonFileOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(JsonFileOutputError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }

    Ok(JsonFileOutput {
      path: url.path().to_string(),
    })
  }
}

pub(crate) fn to_json(frame: &RawImage, result: &EquationPrediction) -> Value {
  let mut coefficients = serde_json::Map::new();
  for slot in CoefficientSlot::ALL {
    let label = result.get(slot).label().map(|l| l.to_label_str());
    coefficients.insert(slot.name().to_string(), json!(label));
  }

  json!({
    "source": frame.source,
    "coefficients": coefficients,
  })
}

impl Render<RawImage, EquationPrediction> for JsonFileOutput {
  type Error = JsonFileOutputError;

  fn render_result(&self, frame: &RawImage, result: &EquationPrediction) -> Result<(), Self::Error> {
    if let Some(parent) = Path::new(&self.path).parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    let line = serde_json::to_string(&to_json(frame, result))?;
    let mut file = OpenOptions::new()
      .create(true)
      .append(true)
      .open(&self.path)?;
    writeln!(file, "{}", line)?;

    debug!("写入结果到文件: {}", self.path);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::Prediction;
  use image::DynamicImage;

  fn frame(source: &str) -> RawImage {
    RawImage {
      image: DynamicImage::new_rgb8(2, 2),
      source: source.to_string(),
    }
  }

  #[test]
  fn missing_slot_is_null() {
    let result = EquationPrediction {
      coefficients: [
        Prediction::from_class_index(Some(0)),
        Prediction::NoPrediction,
        Prediction::from_class_index(Some(7)),
      ],
    };

    assert_eq!(
      to_json(&frame("eq.png"), &result),
      json!({"source": "eq.png", "coefficients": {"a": "-5", "b": null, "c": "3"}})
    );
  }

  #[test]
  fn appends_one_line_per_image() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out").join("result.json");
    let url = Url::parse(&format!("json://{}", path.display())).unwrap();
    let output = JsonFileOutput::from_url(&url).unwrap();
    let result = EquationPrediction {
      coefficients: [Prediction::from_class_index(Some(1)); 3],
    };

    output.render_result(&frame("1.png"), &result).unwrap();
    output.render_result(&frame("2.png"), &result).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<Value> = content
      .lines()
      .map(|line| serde_json::from_str(line).unwrap())
      .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1]["source"], "2.png");
    assert_eq!(lines[0]["coefficients"]["c"], "-4");
  }
}
