// 该文件是 Quadro 项目的一部分。
// src/model/coefficient.rs - 系数标签与预测结果
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

use std::fmt;

use crate::model::WithLabel;

/// 类别序号到系数值的映射，例如模型输出 0 表示系数 -5
pub const COEFFICIENT_LABELS: [&str; 10] = ["-5", "-4", "-3", "-2", "-1", "1", "2", "3", "4", "5"];

pub const NO_PREDICTION: &str = "no prediction";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoefficientLabel(u8);

impl WithLabel for CoefficientLabel {
  fn to_label_str(&self) -> String {
    COEFFICIENT_LABELS[self.0 as usize].to_string()
  }

  fn to_label_id(&self) -> u32 {
    self.0 as u32
  }

  /// 越界的类别序号说明模型与标签表不一致，直接 panic
  fn from_label_id(id: u32) -> Self {
    assert!(
      (id as usize) < COEFFICIENT_LABELS.len(),
      "类别序号 {} 超出标签表范围 (共 {} 个标签)",
      id,
      COEFFICIENT_LABELS.len()
    );
    CoefficientLabel(id as u8)
  }
}

impl CoefficientLabel {
  /// 系数的整数值
  pub fn value(&self) -> i32 {
    let index = self.0 as i32;
    if index < 5 { index - 5 } else { index - 4 }
  }
}

/// 三个相互独立的分类任务
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoefficientSlot {
  /// 二次项系数 a
  Quadratic,
  /// 一次项系数 b
  Linear,
  /// 常数项 c
  Constant,
}

impl CoefficientSlot {
  pub const ALL: [CoefficientSlot; 3] = [
    CoefficientSlot::Quadratic,
    CoefficientSlot::Linear,
    CoefficientSlot::Constant,
  ];

  pub fn name(&self) -> &'static str {
    match self {
      CoefficientSlot::Quadratic => "a",
      CoefficientSlot::Linear => "b",
      CoefficientSlot::Constant => "c",
    }
  }
}

impl fmt::Display for CoefficientSlot {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prediction {
  Label(CoefficientLabel),
  NoPrediction,
}

impl Prediction {
  pub fn from_class_index(index: Option<usize>) -> Self {
    match index {
      Some(id) => Prediction::Label(CoefficientLabel::from_label_id(id as u32)),
      None => Prediction::NoPrediction,
    }
  }

  pub fn label(&self) -> Option<CoefficientLabel> {
    match self {
      Prediction::Label(label) => Some(*label),
      Prediction::NoPrediction => None,
    }
  }

  /// 记录文件使用的原始类别序号，无预测时为 -1
  pub fn raw_index(&self) -> i64 {
    self.label().map(|l| l.to_label_id() as i64).unwrap_or(-1)
  }
}

impl fmt::Display for Prediction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Prediction::Label(label) => f.write_str(&label.to_label_str()),
      Prediction::NoPrediction => f.write_str(NO_PREDICTION),
    }
  }
}

/// 按 a, b, c 顺序排列的三个预测
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EquationPrediction {
  pub coefficients: [Prediction; 3],
}

impl EquationPrediction {
  pub fn get(&self, slot: CoefficientSlot) -> Prediction {
    match slot {
      CoefficientSlot::Quadratic => self.coefficients[0],
      CoefficientSlot::Linear => self.coefficients[1],
      CoefficientSlot::Constant => self.coefficients[2],
    }
  }

  pub fn labels(&self) -> [String; 3] {
    self.coefficients.map(|p| p.to_string())
  }

  pub fn is_complete(&self) -> bool {
    self.coefficients.iter().all(|p| p.label().is_some())
  }
}

impl fmt::Display for EquationPrediction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let [a, b, c] = self.labels();
    write!(f, "[{} {} {}]", a, b, c)
  }
}
