//! 格子を画素の色に変換する。
//!
//! 格子の種類ごとに描画関数を用意している。
//! - レベル値の格子: 強い雨ほど黒に近いグレースケール
//! - 天気区分の判定結果: 該当する格子を黒、該当しない格子を白
//! - 該当回数の格子: 最大値で正規化した値を、青、緑、黄、赤の順に変化する色で表現

use std::f64::consts::PI;

use image::{Rgba, RgbaImage};
use rayon::prelude::*;

use crate::aggregator::FrequencyGrid;
use crate::classifier::CategoryMask;
use crate::config::GridSize;
use crate::decoder::IntensityGrid;

/// 画素の色を記録した格子
pub type PixelGrid = RgbaImage;

/// 黒
pub const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// 白
pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// 描画する格子
#[derive(Debug, Clone, Copy)]
pub enum RenderableGrid<'a> {
    /// レベル値
    Intensity(&'a IntensityGrid),
    /// 天気区分の判定結果
    Mask(&'a CategoryMask),
    /// 該当回数
    Frequency(&'a FrequencyGrid),
}

impl<'a> From<&'a IntensityGrid> for RenderableGrid<'a> {
    fn from(grid: &'a IntensityGrid) -> Self {
        Self::Intensity(grid)
    }
}

impl<'a> From<&'a CategoryMask> for RenderableGrid<'a> {
    fn from(mask: &'a CategoryMask) -> Self {
        Self::Mask(mask)
    }
}

impl<'a> From<&'a FrequencyGrid> for RenderableGrid<'a> {
    fn from(grid: &'a FrequencyGrid) -> Self {
        Self::Frequency(grid)
    }
}

/// 格子の種類に応じた描画関数で格子を描画する。
pub fn render(grid: RenderableGrid<'_>) -> PixelGrid {
    match grid {
        RenderableGrid::Intensity(grid) => render_intensity(grid),
        RenderableGrid::Mask(mask) => render_mask(mask),
        RenderableGrid::Frequency(grid) => render_frequency(grid),
    }
}

/// レベル値をグレースケールで描画する。
///
/// レベル値`v`の格子を`(255 - v, 255 - v, 255 - v)`で描画する。
pub fn render_intensity(grid: &IntensityGrid) -> PixelGrid {
    paint(grid.size(), grid.cells(), |value| {
        let v = u8::MAX - *value;
        Rgba([v, v, v, 255])
    })
}

/// 天気区分に該当する格子を黒、該当しない格子を白で描画する。
pub fn render_mask(mask: &CategoryMask) -> PixelGrid {
    paint(mask.size(), mask.cells(), |matched| {
        if *matched {
            BLACK
        } else {
            WHITE
        }
    })
}

/// 該当回数をヒートマップで描画する。
///
/// 該当回数を最大値で正規化して`heat_color`で色に変換する。
/// すべての該当回数が0の場合、最大値を1として扱う。
pub fn render_frequency(grid: &FrequencyGrid) -> PixelGrid {
    let max = grid.max_count().max(1) as f64;
    paint(grid.size(), grid.counts(), |count| {
        heat_color(*count as f64 / max)
    })
}

/// 0から1の値を、青、緑、黄、赤の順に変化する色に変換する。
///
/// 値を0.25ごとの帯に分割し、帯の中では`255 * (-cos(4πv) / 2 + 0.5)`で変化する成分を
/// 1つだけ変化させる。
/// 1以上は赤、負の値は黒になる。
pub fn heat_color(val: f64) -> Rgba<u8> {
    let col_v = (255.0 * (-(4.0 * PI * val).cos() / 2.0 + 0.5)) as u8;
    let (r, g, b) = if val >= 1.0 {
        (255, 0, 0)
    } else if val >= 0.75 {
        (255, col_v, 0)
    } else if val >= 0.5 {
        (col_v, 255, 0)
    } else if val >= 0.25 {
        (0, 255, col_v)
    } else if val >= 0.0 {
        (0, col_v, 255)
    } else {
        (0, 0, 0)
    };

    Rgba([r, g, b, 255])
}

fn paint<T, F>(size: GridSize, cells: &[T], color: F) -> PixelGrid
where
    T: Sync,
    F: Fn(&T) -> Rgba<u8> + Sync,
{
    let mut image = RgbaImage::new(size.width(), size.height());
    image
        .par_chunks_exact_mut(4)
        .zip(cells.par_iter())
        .for_each(|(pixel, cell)| pixel.copy_from_slice(&color(cell).0));

    image
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{classify, WeatherCategory};
    use crate::config::CategoryThresholds;

    #[test]
    fn intensity_darkens_with_level() {
        let size = GridSize::new(3, 1).unwrap();
        let grid = IntensityGrid::from_cells(size, vec![0, 100, 255]).unwrap();
        let image = render_intensity(&grid);
        assert_eq!(image.dimensions(), (3, 1));
        assert_eq!(*image.get_pixel(0, 0), Rgba([255, 255, 255, 255]));
        assert_eq!(*image.get_pixel(1, 0), Rgba([155, 155, 155, 255]));
        assert_eq!(*image.get_pixel(2, 0), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn mask_renders_black_on_white() {
        let size = GridSize::new(2, 2).unwrap();
        let grid = IntensityGrid::from_cells(size, vec![0, 1, 2, 60]).unwrap();
        let mask = classify(&grid, WeatherCategory::Rain, &CategoryThresholds::default());
        let image = render(RenderableGrid::from(&mask));
        assert_eq!(*image.get_pixel(0, 0), WHITE);
        assert_eq!(*image.get_pixel(1, 0), WHITE);
        assert_eq!(*image.get_pixel(0, 1), BLACK);
        assert_eq!(*image.get_pixel(1, 1), BLACK);
    }

    #[test]
    fn heat_color_band_boundaries() {
        assert_eq!(heat_color(0.0), Rgba([0, 0, 255, 255]));
        assert_eq!(heat_color(0.125), Rgba([0, 127, 255, 255]));
        assert_eq!(heat_color(0.25), Rgba([0, 255, 255, 255]));
        assert_eq!(heat_color(0.5), Rgba([0, 255, 0, 255]));
        assert_eq!(heat_color(0.75), Rgba([255, 255, 0, 255]));
        assert_eq!(heat_color(1.0), Rgba([255, 0, 0, 255]));
        assert_eq!(heat_color(1.5), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn heat_color_out_of_range_is_black() {
        assert_eq!(heat_color(-0.1), BLACK);
        assert_eq!(heat_color(f64::NAN), BLACK);
    }
}
