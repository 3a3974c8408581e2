//! テンプレート照合
//!
//! 平均を引いた正規化相互相関（相関係数）でスコアを計算する。
//! 大きいテンプレートは縮小画像で候補を絞ってから原寸で再評価する。

use super::Region;
use image::imageops::{self, FilterType};
use image::GrayImage;
use rayon::prelude::*;

/// 縮小探索を使うテンプレート短辺の下限
const PYRAMID_MIN_SIDE: u32 = 16;
/// 縮小探索で残す候補数
const COARSE_CANDIDATES: usize = 16;
const EPSILON: f64 = 1e-6;

/// 照合結果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    pub region: Region,
    pub score: f32,
}

/// `haystack` から `needle` を探す
///
/// スコアが `confidence` 以上の最良位置を返す。同点の場合は左上優先。
pub fn locate(haystack: &GrayImage, needle: &GrayImage, confidence: f32) -> Option<Match> {
    let (hw, hh) = haystack.dimensions();
    let (nw, nh) = needle.dimensions();
    if nw == 0 || nh == 0 || nw > hw || nh > hh {
        return None;
    }

    let scale = pyramid_scale(nw.min(nh));
    let best = if scale > 1 {
        locate_coarse_to_fine(haystack, needle, scale)
    } else {
        let table = IntegralTable::new(haystack);
        let prepared = PreparedNeedle::new(needle);
        best_position(&scan(haystack, &table, &prepared))
    };

    let (x, y, score) = best?;
    if score as f32 >= confidence {
        Some(Match {
            region: Region::new(x, y, nw, nh),
            score: score as f32,
        })
    } else {
        None
    }
}

fn pyramid_scale(min_side: u32) -> u32 {
    if min_side >= PYRAMID_MIN_SIDE * 2 {
        4
    } else if min_side >= PYRAMID_MIN_SIDE {
        2
    } else {
        1
    }
}

fn locate_coarse_to_fine(haystack: &GrayImage, needle: &GrayImage, scale: u32) -> Option<(u32, u32, f64)> {
    let (hw, hh) = haystack.dimensions();
    let (nw, nh) = needle.dimensions();

    let small_haystack = imageops::resize(haystack, hw / scale, hh / scale, FilterType::Triangle);
    let small_needle = imageops::resize(needle, nw / scale, nh / scale, FilterType::Triangle);

    let coarse_table = IntegralTable::new(&small_haystack);
    let coarse_needle = PreparedNeedle::new(&small_needle);
    let coarse = scan(&small_haystack, &coarse_table, &coarse_needle);

    let table = IntegralTable::new(haystack);
    let prepared = PreparedNeedle::new(needle);
    let max_x = hw - nw;
    let max_y = hh - nh;

    select_candidates(coarse, COARSE_CANDIDATES)
        .into_iter()
        .flat_map(|(cx, cy, _)| {
            let x0 = (cx * scale).saturating_sub(scale);
            let y0 = (cy * scale).saturating_sub(scale);
            let x1 = (cx * scale + scale).min(max_x);
            let y1 = (cy * scale + scale).min(max_y);
            (y0..=y1).flat_map(move |y| (x0..=x1).map(move |x| (x, y)))
        })
        .filter(|&(x, y)| x <= max_x && y <= max_y)
        .map(|(x, y)| (x, y, score_at(haystack, &table, &prepared, x, y)))
        .fold(None, |best: Option<(u32, u32, f64)>, candidate| match best {
            Some(b) if !is_better(&candidate, &b) => Some(b),
            _ => Some(candidate),
        })
}

/// スコア上位から、互いに隣接しない候補を選ぶ
fn select_candidates(mut scores: Vec<(u32, u32, f64)>, limit: usize) -> Vec<(u32, u32, f64)> {
    scores.sort_by(|a, b| b.2.total_cmp(&a.2).then(a.1.cmp(&b.1)).then(a.0.cmp(&b.0)));

    let mut chosen: Vec<(u32, u32, f64)> = Vec::with_capacity(limit);
    for candidate in scores {
        if chosen.len() >= limit {
            break;
        }
        let adjacent = chosen
            .iter()
            .any(|c| c.0.abs_diff(candidate.0) <= 1 && c.1.abs_diff(candidate.1) <= 1);
        if !adjacent {
            chosen.push(candidate);
        }
    }
    chosen
}

/// 全位置のスコアを計算（行単位で並列）
fn scan(haystack: &GrayImage, table: &IntegralTable, needle: &PreparedNeedle) -> Vec<(u32, u32, f64)> {
    let max_x = haystack.width() - needle.width;
    let max_y = haystack.height() - needle.height;

    (0..=max_y)
        .into_par_iter()
        .flat_map_iter(|y| {
            (0..=max_x).map(move |x| (x, y, score_at(haystack, table, needle, x, y)))
        })
        .collect()
}

fn best_position(scores: &[(u32, u32, f64)]) -> Option<(u32, u32, f64)> {
    scores.iter().copied().fold(None, |best, candidate| match best {
        Some(b) if !is_better(&candidate, &b) => Some(b),
        _ => Some(candidate),
    })
}

/// スコアが高いほど、同点なら上・左ほど優先
fn is_better(a: &(u32, u32, f64), b: &(u32, u32, f64)) -> bool {
    if (a.2 - b.2).abs() > EPSILON {
        a.2 > b.2
    } else {
        (a.1, a.0) < (b.1, b.0)
    }
}

fn score_at(haystack: &GrayImage, table: &IntegralTable, needle: &PreparedNeedle, x: u32, y: u32) -> f64 {
    let n = needle.len() as f64;
    let (sum, sq_sum) = table.window(x, y, needle.width, needle.height);
    let window_var = sq_sum - sum * sum / n;

    // 無地のテンプレートは同じ明るさの無地の領域にだけ一致させる
    if needle.norm_sq < EPSILON {
        let window_mean = sum / n;
        return if window_var < EPSILON * n && (window_mean - needle.mean).abs() <= 1.0 {
            1.0
        } else {
            0.0
        };
    }
    if window_var < EPSILON {
        return 0.0;
    }

    let pixels = haystack.as_raw();
    let stride = haystack.width() as usize;
    let nw = needle.width as usize;

    let mut cross = 0.0;
    for (j, row) in needle.values.chunks_exact(nw).enumerate() {
        let start = (y as usize + j) * stride + x as usize;
        cross += row
            .iter()
            .zip(&pixels[start..start + nw])
            .map(|(t, &v)| t * v as f64)
            .sum::<f64>();
    }

    (cross / (needle.norm_sq * window_var).sqrt()).clamp(-1.0, 1.0)
}

/// 平均を引いたテンプレート値
struct PreparedNeedle {
    width: u32,
    height: u32,
    values: Vec<f64>,
    mean: f64,
    norm_sq: f64,
}

impl PreparedNeedle {
    fn new(needle: &GrayImage) -> Self {
        let raw: Vec<f64> = needle.pixels().map(|p| p.0[0] as f64).collect();
        let mean = raw.iter().sum::<f64>() / raw.len() as f64;
        let values: Vec<f64> = raw.iter().map(|v| v - mean).collect();
        let norm_sq = values.iter().map(|v| v * v).sum();

        Self {
            width: needle.width(),
            height: needle.height(),
            values,
            mean,
            norm_sq,
        }
    }

    fn len(&self) -> usize {
        self.values.len()
    }
}

/// 輝度と輝度二乗の積分画像
struct IntegralTable {
    stride: usize,
    sum: Vec<f64>,
    sq_sum: Vec<f64>,
}

impl IntegralTable {
    fn new(image: &GrayImage) -> Self {
        let (w, h) = image.dimensions();
        let stride = w as usize + 1;
        let mut sum = vec![0.0; stride * (h as usize + 1)];
        let mut sq_sum = vec![0.0; stride * (h as usize + 1)];

        for y in 0..h as usize {
            let mut row_sum = 0.0;
            let mut row_sq = 0.0;
            for x in 0..w as usize {
                let v = image.get_pixel(x as u32, y as u32).0[0] as f64;
                row_sum += v;
                row_sq += v * v;
                let idx = (y + 1) * stride + x + 1;
                sum[idx] = sum[idx - stride] + row_sum;
                sq_sum[idx] = sq_sum[idx - stride] + row_sq;
            }
        }

        Self { stride, sum, sq_sum }
    }

    fn window(&self, x: u32, y: u32, width: u32, height: u32) -> (f64, f64) {
        let (x0, y0) = (x as usize, y as usize);
        let (x1, y1) = (x0 + width as usize, y0 + height as usize);
        let at = |table: &[f64], xx: usize, yy: usize| table[yy * self.stride + xx];

        let area = |table: &[f64]| {
            at(table, x1, y1) - at(table, x0, y1) - at(table, x1, y0) + at(table, x0, y0)
        };
        (area(&self.sum), area(&self.sq_sum))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    /// 再現可能な疑似乱数画像
    fn noise_image(width: u32, height: u32, seed: u64) -> GrayImage {
        let mut state = seed.max(1);
        GrayImage::from_fn(width, height, |_, _| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            Luma([(state % 256) as u8])
        })
    }

    /// 画面のような滑らかな画像
    fn smooth_image(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            let (fx, fy) = (x as f64, y as f64);
            let v = 128.0
                + 50.0 * (fx * 0.071 + fy * 0.023).sin()
                + 40.0 * (fy * 0.093 - fx * 0.017).cos()
                + 30.0 * (((fx - 120.0).powi(2) + (fy - 60.0).powi(2)).sqrt() * 0.05).sin();
            Luma([v.clamp(0.0, 255.0) as u8])
        })
    }

    fn cut(image: &GrayImage, x: u32, y: u32, w: u32, h: u32) -> GrayImage {
        imageops::crop_imm(image, x, y, w, h).to_image()
    }

    #[test]
    fn test_locate_small_template() {
        let haystack = noise_image(80, 60, 7);
        let needle = cut(&haystack, 30, 20, 12, 10);

        let found = locate(&haystack, &needle, 0.8).expect("テンプレートが見つからない");
        assert_eq!(found.region, Region::new(30, 20, 12, 10));
        assert!(found.score > 0.99);
    }

    #[test]
    fn test_locate_with_pyramid() {
        let haystack = smooth_image(240, 160);
        let needle = cut(&haystack, 53, 37, 40, 36);

        let found = locate(&haystack, &needle, 0.9).expect("テンプレートが見つからない");
        assert_eq!(found.region, Region::new(53, 37, 40, 36));
    }

    #[test]
    fn test_locate_absent_template() {
        let haystack = noise_image(80, 60, 7);
        let needle = noise_image(12, 10, 99);
        assert!(locate(&haystack, &needle, 0.8).is_none());
    }

    #[test]
    fn test_brightness_shift_still_matches() {
        let haystack = noise_image(50, 40, 3);
        let mut needle = cut(&haystack, 5, 9, 10, 8);
        for p in needle.pixels_mut() {
            p.0[0] = p.0[0] / 2 + 20;
        }

        let found = locate(&haystack, &needle, 0.95).expect("明るさ違いで一致しない");
        assert_eq!(found.region.left, 5);
        assert_eq!(found.region.top, 9);
    }

    #[test]
    fn test_needle_larger_than_haystack() {
        let haystack = noise_image(10, 10, 1);
        let needle = noise_image(11, 5, 2);
        assert!(locate(&haystack, &needle, 0.0).is_none());
    }

    #[test]
    fn test_flat_needle() {
        let mut haystack = noise_image(30, 30, 5);
        for y in 10..14 {
            for x in 20..26 {
                haystack.put_pixel(x, y, Luma([200]));
            }
        }
        let needle = GrayImage::from_pixel(6, 4, Luma([200]));

        let found = locate(&haystack, &needle, 0.8).expect("無地の領域が見つからない");
        assert_eq!(found.region, Region::new(20, 10, 6, 4));

        let other = GrayImage::from_pixel(6, 4, Luma([50]));
        assert!(locate(&haystack, &other, 0.8).is_none());
    }

    #[test]
    fn test_select_candidates_skips_neighbours() {
        let scores = vec![(5, 5, 0.9), (6, 5, 0.95), (20, 20, 0.5), (5, 6, 0.8)];
        let chosen = select_candidates(scores, 4);
        assert_eq!(chosen.len(), 2);
        assert_eq!((chosen[0].0, chosen[0].1), (6, 5));
        assert_eq!((chosen[1].0, chosen[1].1), (20, 20));
    }

    #[test]
    fn test_integral_window() {
        let image = GrayImage::from_fn(4, 3, |x, y| Luma([(x + y * 4) as u8]));
        let table = IntegralTable::new(&image);
        let (sum, sq) = table.window(1, 1, 2, 2);
        // 5, 6, 9, 10
        assert_eq!(sum, 30.0);
        assert_eq!(sq, 25.0 + 36.0 + 81.0 + 100.0);
    }
}
