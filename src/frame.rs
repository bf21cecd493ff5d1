// 该文件是 Quadro 项目的一部分。
// src/frame.rs - 灰度张量帧定义与预处理
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

use image::{DynamicImage, imageops::FilterType};
use thiserror::Error;
use tracing::debug;

const MAX_PIXEL_VALUE: f32 = 255.0;

pub trait AsGrayTensor {
  fn as_tensor(&self) -> &[f32];
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PreprocessError {
  #[error("图像尺寸无效: {width}x{height}")]
  InvalidImage { width: u32, height: u32 },
  #[error("图像缩放失败: {0}")]
  ScalingFailure(String),
  #[error("数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
  ShapeMismatch { expected: usize, actual: usize },
}

/// 单通道、按行优先存储、取值在 [0, 1] 的浮点帧
#[derive(Debug, Clone, PartialEq)]
pub struct GrayFrame {
  width: u32,
  height: u32,
  data: Box<[f32]>,
}

impl GrayFrame {
  pub fn new(width: u32, height: u32, data: Vec<f32>) -> Result<Self, PreprocessError> {
    let expected = width as usize * height as usize;
    if data.len() != expected {
      return Err(PreprocessError::ShapeMismatch {
        expected,
        actual: data.len(),
      });
    }

    Ok(Self {
      width,
      height,
      data: data.into_boxed_slice(),
    })
  }

  pub fn width(&self) -> usize {
    self.width as usize
  }

  pub fn height(&self) -> usize {
    self.height as usize
  }

  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }
}

impl AsGrayTensor for GrayFrame {
  fn as_tensor(&self) -> &[f32] {
    &self.data
  }
}

/// 将任意尺寸的彩色图像缩放到 `width x height` 的灰度画布，并归一化到 [0, 1]
pub fn preprocess(image: &DynamicImage, width: u32, height: u32) -> Result<GrayFrame, PreprocessError> {
  let (src_width, src_height) = (image.width(), image.height());
  if src_width == 0 || src_height == 0 {
    return Err(PreprocessError::InvalidImage {
      width: src_width,
      height: src_height,
    });
  }

  if width == 0 || height == 0 {
    return Err(PreprocessError::ScalingFailure(format!(
      "目标尺寸无效: {}x{}",
      width, height
    )));
  }

  debug!(
    "缩放图像 {}x{} -> {}x{} (灰度)",
    src_width, src_height, width, height
  );
  let gray = image.to_luma8();
  let scaled = image::imageops::resize(&gray, width, height, FilterType::Triangle);

  let bytes = scaled.into_raw();
  let expected = width as usize * height as usize;
  if bytes.len() != expected {
    return Err(PreprocessError::ScalingFailure(format!(
      "读回像素数量 {} 与目标 {} 不一致",
      bytes.len(),
      expected
    )));
  }

  let data = bytes
    .iter()
    .map(|&value| f32::from(value) / MAX_PIXEL_VALUE)
    .collect();

  GrayFrame::new(width, height, data)
}
