// 该文件是 Quadro 项目的一部分。
// src/model/rknn.rs - RKNN 系数分类模型
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

use rknpu::{Context, InitFlags, TensorFormat, TensorType};
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme, INPUT_HEIGHT, INPUT_WIDTH,
  frame::{AsGrayTensor, GrayFrame},
  model::{COEFFICIENT_LABELS, Classifier, ClassifyError, Model, ModelLoader, ScoreVector},
};

const CLASSIFIER_NUM_INPUTS: u32 = 1;
const CLASSIFIER_NUM_OUTPUTS: u32 = 1;
const CLASSIFIER_CLASS_NUM: usize = COEFFICIENT_LABELS.len();

pub struct RknnClassifier {
  context: Context,
  input_width: u32,
  input_height: u32,
}

fn load_failure(msg: &str, e: impl std::fmt::Display) -> ClassifyError {
  ClassifyError::ModelLoadFailure(format!("{}: {}", msg, e))
}

pub struct RknnClassifierBuilder {
  model_path: String,
  input_width: u32,
  input_height: u32,
  flags: InitFlags,
}

impl FromUrlWithScheme for RknnClassifierBuilder {
  const SCHEME: &'static str = "rknn";
}

impl FromUrl for RknnClassifierBuilder {
  type Error = ClassifyError;

  /// `rknn:///path/model.rknn?width=128&height=64`
  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ClassifyError::ModelLoadFailure(format!(
        "模型路径必须使用 {} 方案, 实际为 {}",
        Self::SCHEME,
        url.scheme()
      )));
    }

    let mut input_width = INPUT_WIDTH;
    let mut input_height = INPUT_HEIGHT;
    for (k, v) in url.query_pairs() {
      match k.as_ref() {
        "width" => input_width = v.parse().map_err(|e| load_failure("宽度参数无效", e))?,
        "height" => input_height = v.parse().map_err(|e| load_failure("高度参数无效", e))?,
        _ => {}
      }
    }

    Ok(RknnClassifierBuilder {
      model_path: url.path().to_string(),
      input_width,
      input_height,
      flags: InitFlags::default(),
    })
  }
}

impl RknnClassifierBuilder {
  pub fn flags(mut self, flags: InitFlags) -> Self {
    self.flags = flags;
    self
  }

  pub fn build(self) -> Result<RknnClassifier, ClassifyError> {
    info!("加载模型文件: {}", self.model_path);
    let model_data =
      std::fs::read(&self.model_path).map_err(|e| load_failure("无法读取模型文件", e))?;
    debug!(
      "模型文件大小: {:.2} KB",
      model_data.len() as f64 / 1024.0
    );

    let context =
      Context::new(&model_data, self.flags).map_err(|e| load_failure("无法创建 RKNN 上下文", e))?;

    let num_inputs = context
      .num_inputs()
      .map_err(|e| load_failure("无法获取输入数量", e))?;
    let num_outputs = context
      .num_outputs()
      .map_err(|e| load_failure("无法获取输出数量", e))?;

    if num_inputs != CLASSIFIER_NUM_INPUTS || num_outputs != CLASSIFIER_NUM_OUTPUTS {
      error!(
        "预期模型输入/输出数量为 {}/{}, 实际为 {}/{}",
        CLASSIFIER_NUM_INPUTS, CLASSIFIER_NUM_OUTPUTS, num_inputs, num_outputs
      );
      return Err(ClassifyError::ModelLoadFailure(format!(
        "预期模型输入/输出数量为 {}/{}, 实际为 {}/{}",
        CLASSIFIER_NUM_INPUTS, CLASSIFIER_NUM_OUTPUTS, num_inputs, num_outputs
      )));
    }

    debug!("模型加载完成: {}", self.model_path);
    Ok(RknnClassifier {
      context,
      input_width: self.input_width,
      input_height: self.input_height,
    })
  }
}

impl Model for RknnClassifier {
  type Input = GrayFrame;
  type Output = ScoreVector;
  type Error = ClassifyError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    if input.width() != self.input_width as usize || input.height() != self.input_height as usize {
      return Err(ClassifyError::InputBindingFailure(format!(
        "输入尺寸 {}x{} 与模型尺寸 {}x{} 不一致",
        input.width(),
        input.height(),
        self.input_width,
        self.input_height
      )));
    }

    // 按原样拷贝浮点数据到输入 0
    debug!("设置模型输入");
    let bytes: Vec<u8> = input
      .as_tensor()
      .iter()
      .flat_map(|value| value.to_ne_bytes())
      .collect();
    self
      .context
      .set_input(0, bytes.as_slice(), TensorFormat::NHWC, TensorType::Float32)
      .map_err(|e| ClassifyError::InputBindingFailure(e.to_string()))?;

    debug!("执行模型推理");
    self
      .context
      .run()
      .map_err(|e| ClassifyError::InferenceFailure(e.to_string()))?;

    let output = self
      .context
      .get_outputs()
      .map_err(|e| ClassifyError::InferenceFailure(e.to_string()))?;
    let scores = output
      .get_f32(0)
      .map_err(|e| ClassifyError::InferenceFailure(format!("获取第 0 个输出失败: {}", e)))?;

    if scores.len() != CLASSIFIER_CLASS_NUM {
      return Err(ClassifyError::InferenceFailure(format!(
        "输出类别数为 {}, 标签数为 {}",
        scores.len(),
        CLASSIFIER_CLASS_NUM
      )));
    }

    Ok(scores.to_vec().into_boxed_slice())
  }
}

impl Classifier for RknnClassifier {
  fn input_len(&self) -> Option<usize> {
    Some(self.input_width as usize * self.input_height as usize)
  }
}

/// 每次调用都重新创建 RKNN 上下文的加载器
#[derive(Debug, Default, Clone, Copy)]
pub struct RknnLoader;

impl ModelLoader for RknnLoader {
  type Model = RknnClassifier;

  fn load(&self, url: &Url) -> Result<Self::Model, ClassifyError> {
    RknnClassifierBuilder::from_url(url)?.build()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn builder_reads_input_size_from_query() {
    let url = Url::parse("rknn:///models/quadr_model.rknn?width=96&height=48").unwrap();
    let builder = RknnClassifierBuilder::from_url(&url).unwrap();

    assert_eq!(builder.model_path, "/models/quadr_model.rknn");
    assert_eq!((builder.input_width, builder.input_height), (96, 48));
  }

  #[test]
  fn builder_defaults_to_training_size() {
    let url = Url::parse("rknn:///models/linear_model.rknn").unwrap();
    let builder = RknnClassifierBuilder::from_url(&url).unwrap();

    assert_eq!((builder.input_width, builder.input_height), (128, 64));
  }

  #[test]
  fn wrong_scheme_is_rejected() {
    let url = Url::parse("image:///models/linear_model.rknn").unwrap();
    assert!(matches!(
      RknnClassifierBuilder::from_url(&url),
      Err(ClassifyError::ModelLoadFailure(_))
    ));
  }

  #[test]
  fn missing_artifact_is_load_failure() {
    let dir = tempfile::tempdir().unwrap();
    let url = Url::parse(&format!("rknn://{}/missing.rknn", dir.path().display())).unwrap();

    assert!(matches!(
      RknnLoader.load(&url),
      Err(ClassifyError::ModelLoadFailure(_))
    ));
  }
}
