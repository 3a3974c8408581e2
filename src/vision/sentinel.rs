use crate::color::Color;
use image::RgbaImage;

/// 画像下部 1/8 にセンチネル色のピクセルがあるか
///
/// 走査は `height / 8 * 7` 行目から最終行まで。アルファは無視する。
pub fn detect_color(image: &RgbaImage, target: Color, tolerance: u8) -> bool {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return false;
    }

    let start_row = height / 8 * 7;

    (0..width).any(|x| {
        (start_row..height).any(|y| {
            let [r, g, b, _] = image.get_pixel(x, y).0;
            target.matches(r, g, b, tolerance)
        })
    })
}
