use std::fmt;
use std::str::FromStr;

use crate::config::{CategoryThresholds, GridSize, RAIN_MIN};
use crate::decoder::IntensityGrid;

/// 天気区分
///
/// 雨は弱い雨と強い雨を含む、雨が観測されたすべての格子を示す。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeatherCategory {
    /// 観測データなし
    Unknown,
    /// 降水なし
    NoRain,
    /// 弱い雨
    Sprinkle,
    /// 雨
    Rain,
    /// 強い雨
    Downpour,
}

impl WeatherCategory {
    /// すべての天気区分
    pub const ALL: [WeatherCategory; 5] = [
        Self::Unknown,
        Self::NoRain,
        Self::Sprinkle,
        Self::Rain,
        Self::Downpour,
    ];

    /// レベル値がこの天気区分に該当するかを返す。
    pub fn matches(self, value: u8, thresholds: &CategoryThresholds) -> bool {
        match self {
            Self::Unknown => value == 0,
            Self::NoRain => value == 1,
            Self::Sprinkle => RAIN_MIN <= value && value < thresholds.sprinkle_max(),
            Self::Rain => RAIN_MIN <= value,
            Self::Downpour => thresholds.downpour_min() < value,
        }
    }

    /// 天気区分の名前を返す。
    pub fn name(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::NoRain => "no-rain",
            Self::Sprinkle => "sprinkle",
            Self::Rain => "rain",
            Self::Downpour => "downpour",
        }
    }
}

impl fmt::Display for WeatherCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WeatherCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|category| category.name() == normalized)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// 天気区分の名前が不正
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("天気区分`{0}`は存在しません。")]
pub struct UnknownCategory(pub String);

/// 天気区分に該当する格子を`true`で示した格子
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryMask {
    /// 格子の大きさ
    size: GridSize,
    /// 判定した天気区分
    category: WeatherCategory,
    /// 行優先で記録した判定結果
    cells: Vec<bool>,
}

impl CategoryMask {
    /// 格子の大きさを返す。
    pub fn size(&self) -> GridSize {
        self.size
    }

    /// 判定した天気区分を返す。
    pub fn category(&self) -> WeatherCategory {
        self.category
    }

    /// 行優先で記録した判定結果を返す。
    pub fn cells(&self) -> &[bool] {
        &self.cells
    }

    /// 天気区分に該当する格子の数を返す。
    pub fn count(&self) -> usize {
        self.cells.iter().filter(|matched| **matched).count()
    }
}

/// 格子のレベル値を天気区分で判定する。
///
/// # 引数
///
/// * `grid` - 解析雨量のレベル値を記録した格子
/// * `category` - 判定する天気区分
/// * `thresholds` - 天気区分を判定する閾値
///
/// # 戻り値
///
/// 天気区分に該当する格子を`true`で示した`CategoryMask`
pub fn classify(
    grid: &IntensityGrid,
    category: WeatherCategory,
    thresholds: &CategoryThresholds,
) -> CategoryMask {
    let cells = grid
        .cells()
        .iter()
        .map(|value| category.matches(*value, thresholds))
        .collect();

    CategoryMask {
        size: grid.size(),
        category,
        cells,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_follow_level_boundaries() {
        let thresholds = CategoryThresholds::default();
        assert!(WeatherCategory::Unknown.matches(0, &thresholds));
        assert!(WeatherCategory::NoRain.matches(1, &thresholds));
        assert!(WeatherCategory::Sprinkle.matches(2, &thresholds));
        assert!(WeatherCategory::Sprinkle.matches(24, &thresholds));
        assert!(!WeatherCategory::Sprinkle.matches(25, &thresholds));
        assert!(!WeatherCategory::Downpour.matches(53, &thresholds));
        assert!(WeatherCategory::Downpour.matches(54, &thresholds));
        assert!(WeatherCategory::Rain.matches(255, &thresholds));
        assert!(!WeatherCategory::Rain.matches(1, &thresholds));
    }

    #[test]
    fn custom_thresholds_are_respected() {
        let thresholds = CategoryThresholds::new(10, 20).unwrap();
        assert!(WeatherCategory::Sprinkle.matches(9, &thresholds));
        assert!(!WeatherCategory::Sprinkle.matches(10, &thresholds));
        assert!(WeatherCategory::Downpour.matches(21, &thresholds));
        assert!(!WeatherCategory::Downpour.matches(20, &thresholds));
    }

    #[test]
    fn category_names_round_trip_through_from_str() {
        for category in WeatherCategory::ALL {
            assert_eq!(category.to_string().parse::<WeatherCategory>(), Ok(category));
        }
        assert_eq!(
            "NO_RAIN".parse::<WeatherCategory>(),
            Ok(WeatherCategory::NoRain)
        );
        assert_eq!(
            "hail".parse::<WeatherCategory>(),
            Err(UnknownCategory("hail".to_string()))
        );
    }

    #[test]
    fn mask_keeps_grid_size_and_category() {
        let size = GridSize::new(2, 2).unwrap();
        let grid = IntensityGrid::from_cells(size, vec![0, 2, 30, 60]).unwrap();
        let mask = classify(&grid, WeatherCategory::Rain, &CategoryThresholds::default());
        assert_eq!(mask.size(), size);
        assert_eq!(mask.category(), WeatherCategory::Rain);
        assert_eq!(mask.cells(), &[false, true, true, true]);
        assert_eq!(mask.count(), 3);
    }
}
