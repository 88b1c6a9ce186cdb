/// 格子の横方向の既定の格子数
pub const DEFAULT_GRID_WIDTH: u32 = 2560;

/// 格子の縦方向の既定の格子数
pub const DEFAULT_GRID_HEIGHT: u32 = 3360;

/// 弱い雨と判定するレベルの上限（この値を含まない）
pub const DEFAULT_SPRINKLE_MAX: u8 = 25;

/// 強い雨と判定するレベルの下限（この値を含まない）
pub const DEFAULT_DOWNPOUR_MIN: u8 = 53;

/// 雨と判定するレベルの下限（この値を含む）
pub const RAIN_MIN: u8 = 2;

/// 格子の大きさ
///
/// 格子は最北西端から経度方向に記録され、東端に達したとき、格子1つ分だけ南の西端に移動する。
/// したがって、格子`(x, y)`のインデックスは`y * width + x`となる。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSize {
    /// 横方向の格子数
    width: u32,
    /// 縦方向の格子数
    height: u32,
}

impl GridSize {
    /// 格子の大きさを構築する。
    ///
    /// # 引数
    ///
    /// * `width` - 横方向の格子数
    /// * `height` - 縦方向の格子数
    ///
    /// # 戻り値
    ///
    /// `GridSize`
    pub fn new(width: u32, height: u32) -> ConfigResult<Self> {
        if width == 0 || height == 0 {
            return Err(ConfigError::EmptyGrid { width, height });
        }
        (width as usize)
            .checked_mul(height as usize)
            .ok_or(ConfigError::GridTooLarge { width, height })?;

        Ok(Self { width, height })
    }

    /// 横方向の格子数を返す。
    pub fn width(&self) -> u32 {
        self.width
    }

    /// 縦方向の格子数を返す。
    pub fn height(&self) -> u32 {
        self.height
    }

    /// 格子の総数を返す。
    pub fn len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// 格子が空かどうかを返す。
    ///
    /// `new`で構築した`GridSize`は空にならない。
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 格子`(x, y)`のインデックスを返す。
    pub fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

impl Default for GridSize {
    fn default() -> Self {
        Self {
            width: DEFAULT_GRID_WIDTH,
            height: DEFAULT_GRID_HEIGHT,
        }
    }
}

/// 天気区分を判定する閾値
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryThresholds {
    /// 弱い雨の上限（この値を含まない）
    sprinkle_max: u8,
    /// 強い雨の下限（この値を含まない）
    downpour_min: u8,
}

impl CategoryThresholds {
    /// 天気区分を判定する閾値を構築する。
    ///
    /// `sprinkle_max`が`RAIN_MIN`以下の場合、弱い雨に該当するレベルが存在しなくなるため、
    /// エラーを返す。
    pub fn new(sprinkle_max: u8, downpour_min: u8) -> ConfigResult<Self> {
        if sprinkle_max <= RAIN_MIN {
            return Err(ConfigError::EmptySprinkleRange(sprinkle_max));
        }

        Ok(Self {
            sprinkle_max,
            downpour_min,
        })
    }

    pub fn sprinkle_max(&self) -> u8 {
        self.sprinkle_max
    }

    pub fn downpour_min(&self) -> u8 {
        self.downpour_min
    }
}

impl Default for CategoryThresholds {
    fn default() -> Self {
        Self {
            sprinkle_max: DEFAULT_SPRINKLE_MAX,
            downpour_min: DEFAULT_DOWNPOUR_MIN,
        }
    }
}

/// 解析雨量の格子と天気区分の設定
///
/// 各処理には、この設定を引数で渡す。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RadarConfig {
    /// 格子の大きさ
    pub grid: GridSize,
    /// 天気区分を判定する閾値
    pub thresholds: CategoryThresholds,
}

impl RadarConfig {
    pub fn new(grid: GridSize, thresholds: CategoryThresholds) -> Self {
        Self { grid, thresholds }
    }
}

/// 設定エラー型
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// 格子数が0
    #[error("格子数に0は指定できません。`{width}x{height}`")]
    EmptyGrid { width: u32, height: u32 },

    /// 格子の総数が大きすぎる
    #[error("格子の総数が大きすぎます。`{width}x{height}`")]
    GridTooLarge { width: u32, height: u32 },

    /// 弱い雨に該当するレベルが存在しない
    #[error("弱い雨の上限は2より大きくなければなりません。`{0}`")]
    EmptySprinkleRange(u8),
}

/// 設定結果型
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_grid_matches_radar_composite() {
        let size = GridSize::default();
        assert_eq!(size.width(), 2560);
        assert_eq!(size.height(), 3360);
        assert_eq!(size.len(), 8_601_600);
    }

    #[test]
    fn grid_index_is_row_major() {
        let size = GridSize::new(4, 3).unwrap();
        assert_eq!(size.index(0, 0), 0);
        assert_eq!(size.index(3, 0), 3);
        assert_eq!(size.index(0, 1), 4);
        assert_eq!(size.index(3, 2), 11);
    }

    #[test]
    fn zero_dimension_is_rejected() {
        assert_eq!(
            GridSize::new(0, 10),
            Err(ConfigError::EmptyGrid {
                width: 0,
                height: 10
            })
        );
        assert!(GridSize::new(10, 0).is_err());
    }

    #[test]
    fn sprinkle_range_must_not_be_empty() {
        assert_eq!(
            CategoryThresholds::new(2, 53),
            Err(ConfigError::EmptySprinkleRange(2))
        );
        let thresholds = CategoryThresholds::new(3, 10).unwrap();
        assert_eq!(thresholds.sprinkle_max(), 3);
        assert_eq!(thresholds.downpour_min(), 10);
    }
}
