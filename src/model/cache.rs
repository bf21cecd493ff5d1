// 该文件是 Quadro 项目的一部分。
// src/model/cache.rs - 按模型地址缓存已加载的模型
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
  collections::HashMap,
  sync::{Arc, Mutex},
};

use tracing::{debug, info};
use url::Url;

use crate::{
  frame::GrayFrame,
  model::{Classifier, ClassifyError, Model, ModelLoader, ScoreVector},
};

/// 多个调用方共享的模型，同一时刻只允许一个调用方推理
pub struct SharedModel<M> {
  inner: Arc<Mutex<M>>,
}

impl<M> Clone for SharedModel<M> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

impl<M> SharedModel<M> {
  pub fn new(model: M) -> Self {
    Self {
      inner: Arc::new(Mutex::new(model)),
    }
  }

  pub fn ptr_eq(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.inner, &other.inner)
  }
}

impl<M: Classifier> Model for SharedModel<M> {
  type Input = GrayFrame;
  type Output = ScoreVector;
  type Error = ClassifyError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let model = self
      .inner
      .lock()
      .map_err(|e| ClassifyError::InferenceFailure(format!("模型锁已损坏: {}", e)))?;
    model.infer(input)
  }
}

impl<M: Classifier> Classifier for SharedModel<M> {
  fn input_len(&self) -> Option<usize> {
    self.inner.lock().ok().and_then(|model| model.input_len())
  }
}

/// 包装另一个加载器，同一地址的模型只加载一次，直到调用 [`CachedLoader::clear`]
pub struct CachedLoader<L: ModelLoader> {
  inner: L,
  models: Mutex<HashMap<Url, SharedModel<L::Model>>>,
}

impl<L: ModelLoader> CachedLoader<L> {
  pub fn new(inner: L) -> Self {
    Self {
      inner,
      models: Mutex::new(HashMap::new()),
    }
  }

  pub fn len(&self) -> usize {
    self.models.lock().map(|models| models.len()).unwrap_or(0)
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// 释放所有缓存的模型
  pub fn clear(&self) {
    if let Ok(mut models) = self.models.lock() {
      info!("释放 {} 个缓存模型", models.len());
      models.clear();
    }
  }
}

impl<L: ModelLoader> ModelLoader for CachedLoader<L> {
  type Model = SharedModel<L::Model>;

  fn load(&self, url: &Url) -> Result<Self::Model, ClassifyError> {
    let mut models = self
      .models
      .lock()
      .map_err(|e| ClassifyError::ModelLoadFailure(format!("模型缓存锁已损坏: {}", e)))?;

    if let Some(model) = models.get(url) {
      debug!("使用缓存模型: {}", url);
      return Ok(model.clone());
    }

    // 加载失败不写入缓存，下次调用会重新尝试
    let model = SharedModel::new(self.inner.load(url)?);
    models.insert(url.clone(), model.clone());
    info!("模型已缓存: {}", url);
    Ok(model)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::classifier::tests::{FileLoader, write_model};
  use crate::model::{EquationClassifier, classify};

  #[test]
  fn same_url_shares_one_model() {
    let dir = tempfile::tempdir().unwrap();
    let url = write_model(dir.path(), "a", "2");
    let loader = CachedLoader::new(FileLoader::default());

    let first = loader.load(&url).unwrap();
    let second = loader.load(&url).unwrap();

    assert!(first.ptr_eq(&second));
    assert_eq!(loader.len(), 1);
  }

  #[test]
  fn clear_forces_reload() {
    let dir = tempfile::tempdir().unwrap();
    let url = write_model(dir.path(), "a", "2");
    let loader = CachedLoader::new(FileLoader::default());

    let first = loader.load(&url).unwrap();
    loader.clear();
    assert!(loader.is_empty());
    let second = loader.load(&url).unwrap();

    assert!(!first.ptr_eq(&second));
  }

  #[test]
  fn failed_load_is_not_cached() {
    let dir = tempfile::tempdir().unwrap();
    let url = Url::from_file_path(dir.path().join("later")).unwrap();
    let loader = CachedLoader::new(FileLoader::default());

    assert!(matches!(
      loader.load(&url),
      Err(ClassifyError::ModelLoadFailure(_))
    ));
    assert!(loader.is_empty());

    std::fs::write(dir.path().join("later"), "4").unwrap();
    let frame = GrayFrame::new(128, 64, vec![0.0; 128 * 64]).unwrap();
    assert_eq!(classify(&frame, &loader, &url).unwrap(), Some(4));
  }

  #[test]
  fn equation_classifier_reuses_cached_models() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_model(dir.path(), "a", "1");
    let b = write_model(dir.path(), "b", "2");
    let c = write_model(dir.path(), "c", "3");

    let classifier = EquationClassifier::new(CachedLoader::new(FileLoader::default()), [a, b, c]);
    let image = image::DynamicImage::new_rgb8(40, 20);
    let first = classifier.predict(&image);
    let second = classifier.predict(&image);

    assert_eq!(first, second);
    assert_eq!(first.labels(), ["-4", "-3", "-2"]);
    assert_eq!(classifier.loader().len(), 3);
  }
}
