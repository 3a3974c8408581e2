//! 画面画像の解析
//!
//! - テンプレート照合（正規化相互相関）
//! - センチネル色の検出
//!
//! どちらもキャプチャ済みのバッファに対する純粋関数で、画面やOSには触れない。

mod matcher;
mod sentinel;

pub use matcher::{locate, Match};
pub use sentinel::detect_color;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// 画面上の矩形
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub const fn new(left: u32, top: u32, width: u32, height: u32) -> Self {
        Self { left, top, width, height }
    }

    /// クリック位置（矩形の中心）
    pub fn center(&self) -> (u32, u32) {
        (self.left + self.width / 2, self.top + self.height / 2)
    }
}

impl std::str::FromStr for Region {
    type Err = String;

    /// `left,top,width,height` 形式
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<u32> = s
            .split(',')
            .map(|p| p.trim().parse::<u32>())
            .collect::<Result<_, _>>()
            .map_err(|_| format!("Invalid region: {}. Use left,top,width,height", s))?;

        match parts.as_slice() {
            [left, top, width, height] if *width > 0 && *height > 0 => {
                Ok(Region::new(*left, *top, *width, *height))
            }
            _ => Err(format!("Invalid region: {}. Use left,top,width,height", s)),
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {}x{})", self.left, self.top, self.width, self.height)
    }
}

/// 画像を矩形で切り出す（画像外にはみ出す部分は切り詰め）
pub fn crop(image: &RgbaImage, region: Region) -> RgbaImage {
    let (w, h) = image.dimensions();
    let left = region.left.min(w);
    let top = region.top.min(h);
    let width = region.width.min(w - left);
    let height = region.height.min(h - top);

    image::imageops::crop_imm(image, left, top, width, height).to_image()
}
