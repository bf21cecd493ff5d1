// 该文件是 Quadro 项目的一部分。
// src/model/classifier.rs - 分类器运行与三系数编排
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

use std::{convert::Infallible, time::Instant};

use image::DynamicImage;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
  INPUT_HEIGHT, INPUT_WIDTH,
  frame::{GrayFrame, PreprocessError, preprocess},
  input::RawImage,
  model::{
    Model, ScoreVector,
    coefficient::{CoefficientSlot, EquationPrediction, Prediction},
  },
};

#[derive(Error, Debug)]
pub enum ClassifyError {
  #[error("图像无效: {0}")]
  InvalidImage(String),
  #[error("图像缩放失败: {0}")]
  ScalingFailure(String),
  #[error("模型加载失败: {0}")]
  ModelLoadFailure(String),
  #[error("输入绑定失败: {0}")]
  InputBindingFailure(String),
  #[error("推理失败: {0}")]
  InferenceFailure(String),
}

impl From<PreprocessError> for ClassifyError {
  fn from(err: PreprocessError) -> Self {
    match err {
      PreprocessError::InvalidImage { .. } => ClassifyError::InvalidImage(err.to_string()),
      PreprocessError::ScalingFailure(_) | PreprocessError::ShapeMismatch { .. } => {
        ClassifyError::ScalingFailure(err.to_string())
      }
    }
  }
}

/// 输入灰度帧、输出各类别分数的模型
pub trait Classifier: Model<Input = GrayFrame, Output = ScoreVector, Error = ClassifyError> {
  /// 模型期望的输入元素个数，未知时为 `None`
  fn input_len(&self) -> Option<usize> {
    None
  }
}

/// 根据模型地址加载分类器
pub trait ModelLoader {
  type Model: Classifier;

  fn load(&self, url: &Url) -> Result<Self::Model, ClassifyError>;
}

/// 最大值所在的下标，并列时取最靠前的一个；空向量（或全为 NaN）没有结果
pub fn argmax(scores: &[f32]) -> Option<usize> {
  scores
    .iter()
    .enumerate()
    .filter(|(_, score)| !score.is_nan())
    .fold(None, |best: Option<(usize, f32)>, (index, &score)| match best {
      Some((_, max)) if max >= score => best,
      _ => Some((index, score)),
    })
    .map(|(index, _)| index)
}

/// 在已加载的模型上执行一次推理并取最大分数的类别
pub fn classify_loaded<M: Classifier>(
  frame: &GrayFrame,
  model: &M,
) -> Result<Option<usize>, ClassifyError> {
  if let Some(expected) = model.input_len()
    && expected != frame.len()
  {
    return Err(ClassifyError::ModelLoadFailure(format!(
      "模型输入长度为 {}, 实际输入长度为 {}",
      expected,
      frame.len()
    )));
  }

  let scores = model.infer(frame)?;
  debug!("模型输出分数: {:?}", scores);

  let index = argmax(&scores);
  if index.is_none() {
    warn!("模型输出为空，无法得到预测");
  }
  Ok(index)
}

/// 加载 `url` 指向的模型并对 `frame` 分类，模型随调用结束释放
pub fn classify<L: ModelLoader>(
  frame: &GrayFrame,
  loader: &L,
  url: &Url,
) -> Result<Option<usize>, ClassifyError> {
  debug!("加载模型: {}", url);
  let model = loader.load(url)?;
  classify_loaded(frame, &model)
}

/// 依次使用 a、b、c 三个模型识别一张图像中的方程系数
pub struct EquationClassifier<L> {
  loader: L,
  models: [Url; 3],
  width: u32,
  height: u32,
}

impl<L: ModelLoader> EquationClassifier<L> {
  pub fn new(loader: L, models: [Url; 3]) -> Self {
    Self {
      loader,
      models,
      width: INPUT_WIDTH,
      height: INPUT_HEIGHT,
    }
  }

  pub fn with_input_size(mut self, width: u32, height: u32) -> Self {
    self.width = width;
    self.height = height;
    self
  }

  pub fn loader(&self) -> &L {
    &self.loader
  }

  fn classify_slot(&self, url: &Url, image: &DynamicImage) -> Result<Option<usize>, ClassifyError> {
    // 预处理是纯函数，每个模型各做一次
    let frame = preprocess(image, self.width, self.height)?;
    classify(&frame, &self.loader, url)
  }

  /// 单个系数失败只影响该系数，其余系数照常输出
  pub fn predict(&self, image: &DynamicImage) -> EquationPrediction {
    let mut coefficients = [Prediction::NoPrediction; 3];

    for (index, (slot, url)) in CoefficientSlot::ALL.iter().zip(&self.models).enumerate() {
      let now = Instant::now();
      coefficients[index] = match self.classify_slot(url, image) {
        Ok(class_index) => {
          info!(
            "系数 {} 推理完成，类别: {:?}, 耗时: {:.2?}",
            slot,
            class_index,
            now.elapsed()
          );
          Prediction::from_class_index(class_index)
        }
        Err(e) => {
          error!("系数 {} 预测失败 (模型 {}): {}", slot, url, e);
          Prediction::NoPrediction
        }
      };
    }

    EquationPrediction { coefficients }
  }
}

impl<L: ModelLoader> Model for EquationClassifier<L> {
  type Input = RawImage;
  type Output = EquationPrediction;
  type Error = Infallible;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    debug!("识别图像: {}", input.source);
    Ok(self.predict(&input.image))
  }
}
