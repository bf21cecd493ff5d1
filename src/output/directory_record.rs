// 该文件是 Quadro 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Datelike, Utc};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
  FromUrl, FromUrlWithScheme,
  input::RawImage,
  model::{EquationPrediction, Prediction},
  output::Render,
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("帧计数器锁已损坏")]
  CounterPoisoned,
}

/// 记录文件中的系数写法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
  /// 系数值，例如 `-5, no prediction, 3`
  Name,
  /// 原始类别序号，无预测为 -1
  Id,
}

impl RecordKind {
  fn format(&self, prediction: &Prediction) -> String {
    match self {
      RecordKind::Name => prediction.to_string(),
      RecordKind::Id => prediction.raw_index().to_string(),
    }
  }

  pub fn record(&self, result: &EquationPrediction, path: &Path) -> Result<(), std::io::Error> {
    let line = result
      .coefficients
      .iter()
      .map(|p| self.format(p))
      .collect::<Vec<_>>()
      .join(", ");
    std::fs::write(path, format!("{}\n", line))
  }
}

/// 按日期分目录保存输入图像及其识别结果
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  kind: RecordKind,
  frame_counter: Mutex<u16>,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let kind = uri
      .query_pairs()
      .find(|(k, _)| k == "record")
      .map(|(_, v)| if v == "id" { RecordKind::Id } else { RecordKind::Name })
      .unwrap_or(RecordKind::Name);

    Ok(DirectoryRecordOutput {
      directory: PathBuf::from(uri.path()),
      kind,
      frame_counter: Mutex::new(0),
    })
  }
}

impl DirectoryRecordOutput {
  fn frame_id(&self) -> Result<u16, DirectoryRecordOutputError> {
    let mut counter = self
      .frame_counter
      .lock()
      .map_err(|_| DirectoryRecordOutputError::CounterPoisoned)?;
    *counter = counter.wrapping_add(1);
    Ok(*counter)
  }

  /// `<dir>/YYYY/MM/DD/HH-MM-SS-XXXX.png`
  fn frame_path(&self, now: DateTime<Utc>) -> Result<PathBuf, DirectoryRecordOutputError> {
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    std::fs::create_dir_all(&directory)?;

    Ok(directory.join(format!(
      "{}-{:04X}.png",
      now.format("%H-%M-%S"),
      self.frame_id()?
    )))
  }
}

impl Render<RawImage, EquationPrediction> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &RawImage, result: &EquationPrediction) -> Result<(), Self::Error> {
    let path = self.frame_path(Utc::now())?;

    if frame.image.width() == 0 || frame.image.height() == 0 {
      warn!("图像 {} 为空，仅保存识别记录", frame.source);
    } else {
      frame.image.save(&path)?;
    }
    self.kind.record(result, &path.with_extension("txt"))?;

    info!("保存识别记录: {}", path.display());
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::DynamicImage;

  fn result() -> EquationPrediction {
    EquationPrediction {
      coefficients: [
        Prediction::from_class_index(Some(2)),
        Prediction::NoPrediction,
        Prediction::from_class_index(Some(9)),
      ],
    }
  }

  fn find_files(dir: &Path, ext: &str) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir).unwrap() {
      let path = entry.unwrap().path();
      if path.is_dir() {
        found.extend(find_files(&path, ext));
      } else if path.extension().and_then(|e| e.to_str()) == Some(ext) {
        found.push(path);
      }
    }
    found
  }

  #[test]
  fn saves_image_and_named_record() {
    let dir = tempfile::tempdir().unwrap();
    let url = url::Url::parse(&format!("folder://{}", dir.path().display())).unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    let frame = RawImage {
      image: DynamicImage::new_rgb8(12, 6),
      source: "eq.png".to_string(),
    };

    output.render_result(&frame, &result()).unwrap();

    let images = find_files(dir.path(), "png");
    let records = find_files(dir.path(), "txt");
    assert_eq!(images.len(), 1);
    assert_eq!(records.len(), 1);
    assert_eq!(
      std::fs::read_to_string(&records[0]).unwrap(),
      "-3, no prediction, 5\n"
    );
  }

  #[test]
  fn id_records_use_minus_one_for_missing() {
    let dir = tempfile::tempdir().unwrap();
    let url = url::Url::parse(&format!("folder://{}?record=id", dir.path().display())).unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    let frame = RawImage {
      image: DynamicImage::new_rgb8(0, 0),
      source: "empty.png".to_string(),
    };

    output.render_result(&frame, &result()).unwrap();

    assert!(find_files(dir.path(), "png").is_empty());
    let records = find_files(dir.path(), "txt");
    assert_eq!(std::fs::read_to_string(&records[0]).unwrap(), "2, -1, 9\n");
  }

  #[test]
  fn frame_path_is_dated() {
    let dir = tempfile::tempdir().unwrap();
    let url = url::Url::parse(&format!("folder://{}", dir.path().display())).unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    let now = DateTime::parse_from_rfc3339("2026-03-12T08:09:10Z")
      .unwrap()
      .with_timezone(&Utc);

    let first = output.frame_path(now).unwrap();
    let second = output.frame_path(now).unwrap();

    assert_eq!(
      first,
      dir.path().join("2026").join("03").join("12").join("08-09-10-0001.png")
    );
    assert!(second.ends_with("08-09-10-0002.png"));
  }
}
