// 该文件是 Quadro 项目的一部分。
// src/input/crop.rs - 裁剪与旋转参数
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

use image::DynamicImage;
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CropParseError {
  #[error("裁剪区域格式应为 x,y,w,h: {0}")]
  InvalidRect(String),
  #[error("旋转角度必须是 90 的整数倍: {0}")]
  InvalidAngle(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
  pub x: u32,
  pub y: u32,
  pub width: u32,
  pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
  #[default]
  None,
  Rotate90,
  Rotate180,
  Rotate270,
}

impl Rotation {
  pub fn from_degrees(degrees: i32) -> Option<Self> {
    match degrees.rem_euclid(360) {
      0 => Some(Rotation::None),
      90 => Some(Rotation::Rotate90),
      180 => Some(Rotation::Rotate180),
      270 => Some(Rotation::Rotate270),
      _ => None,
    }
  }
}

/// 随单次请求传入的裁剪参数：先旋转，再裁剪
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CropRegion {
  pub rect: Option<CropRect>,
  pub rotation: Rotation,
}

impl CropRegion {
  /// 从 `?crop=x,y,w,h&rotate=deg` 读取参数，缺省时不做处理
  pub fn from_query(url: &Url) -> Result<Self, CropParseError> {
    let mut region = CropRegion::default();

    for (k, v) in url.query_pairs() {
      match k.as_ref() {
        "crop" => region.rect = Some(parse_rect(&v)?),
        "rotate" => {
          region.rotation = v
            .trim()
            .parse::<i32>()
            .ok()
            .and_then(Rotation::from_degrees)
            .ok_or_else(|| CropParseError::InvalidAngle(v.to_string()))?;
        }
        _ => {}
      }
    }

    Ok(region)
  }

  pub fn is_identity(&self) -> bool {
    self.rect.is_none() && self.rotation == Rotation::None
  }

  /// 裁剪区域超出图像的部分会被截掉，完全不相交时得到空图像
  pub fn apply(&self, image: DynamicImage) -> DynamicImage {
    if self.is_identity() {
      return image;
    }

    let rotated = match self.rotation {
      Rotation::None => image,
      Rotation::Rotate90 => image.rotate90(),
      Rotation::Rotate180 => image.rotate180(),
      Rotation::Rotate270 => image.rotate270(),
    };

    match self.rect {
      Some(rect) => {
        debug!("裁剪图像: {:?}", rect);
        rotated.crop_imm(rect.x, rect.y, rect.width, rect.height)
      }
      None => rotated,
    }
  }
}

fn parse_rect(value: &str) -> Result<CropRect, CropParseError> {
  let parts = value
    .split(',')
    .map(|part| part.trim().parse::<u32>())
    .collect::<Result<Vec<_>, _>>()
    .map_err(|_| CropParseError::InvalidRect(value.to_string()))?;

  match parts.as_slice() {
    &[x, y, width, height] => Ok(CropRect {
      x,
      y,
      width,
      height,
    }),
    _ => Err(CropParseError::InvalidRect(value.to_string())),
  }
}
