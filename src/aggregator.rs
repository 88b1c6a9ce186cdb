use rayon::prelude::*;

use crate::classifier::CategoryMask;
use crate::config::GridSize;

/// 天気区分に該当した回数を格子ごとに集計した格子
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyGrid {
    /// 格子の大きさ
    size: GridSize,
    /// 行優先で記録した該当回数
    counts: Vec<u32>,
    /// 集計した格子の数
    snapshots: u32,
}

impl FrequencyGrid {
    /// すべての該当回数が0の格子を構築する。
    pub fn new(size: GridSize) -> Self {
        Self {
            size,
            counts: vec![0; size.len()],
            snapshots: 0,
        }
    }

    /// 格子の大きさを返す。
    pub fn size(&self) -> GridSize {
        self.size
    }

    /// 行優先で記録した該当回数を返す。
    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    /// 集計した格子の数を返す。
    pub fn snapshots(&self) -> u32 {
        self.snapshots
    }

    /// 格子`(x, y)`の該当回数を返す。
    pub fn get(&self, x: u32, y: u32) -> Option<u32> {
        if self.size.width() <= x || self.size.height() <= y {
            return None;
        }
        self.counts.get(self.size.index(x, y)).copied()
    }

    /// 該当回数の最大値を返す。
    pub fn max_count(&self) -> u32 {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    /// 天気区分の判定結果を加算する。
    pub fn accumulate(&mut self, mask: &CategoryMask) -> AggregateResult<()> {
        if mask.size() != self.size {
            return Err(AggregateError::SizeMismatch {
                expected: self.size,
                actual: mask.size(),
            });
        }
        for (count, matched) in self.counts.iter_mut().zip(mask.cells()) {
            if *matched {
                *count = count.saturating_add(1);
            }
        }
        self.snapshots = self.snapshots.saturating_add(1);

        Ok(())
    }

    /// 別の集計結果を加算する。
    pub fn merge(mut self, other: &FrequencyGrid) -> AggregateResult<Self> {
        if other.size != self.size {
            return Err(AggregateError::SizeMismatch {
                expected: self.size,
                actual: other.size,
            });
        }
        for (count, other) in self.counts.iter_mut().zip(&other.counts) {
            *count = count.saturating_add(*other);
        }
        self.snapshots = self.snapshots.saturating_add(other.snapshots);

        Ok(self)
    }
}

/// 天気区分の判定結果を集計する。
///
/// 格子ごとに、判定結果が`true`であった数を数える。
/// 集計結果は判定結果の順番に依存しない。
///
/// # 引数
///
/// * `size` - 格子の大きさ
/// * `masks` - 天気区分の判定結果
///
/// # 戻り値
///
/// `FrequencyGrid`
pub fn aggregate<'a, I>(size: GridSize, masks: I) -> AggregateResult<FrequencyGrid>
where
    I: IntoIterator<Item = &'a CategoryMask>,
{
    let mut frequency = FrequencyGrid::new(size);
    for mask in masks {
        frequency.accumulate(mask)?;
    }

    Ok(frequency)
}

/// 天気区分の判定結果を並列に集計する。
pub fn par_aggregate(size: GridSize, masks: &[CategoryMask]) -> AggregateResult<FrequencyGrid> {
    masks
        .par_iter()
        .try_fold(
            || FrequencyGrid::new(size),
            |mut frequency, mask| {
                frequency.accumulate(mask)?;
                Ok(frequency)
            },
        )
        .try_reduce(|| FrequencyGrid::new(size), |a, b| a.merge(&b))
}

/// 集計エラー型
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AggregateError {
    /// 格子の大きさが一致しない
    #[error("格子の大きさが一致しません。期待値: {expected:?}、実際: {actual:?}")]
    SizeMismatch { expected: GridSize, actual: GridSize },
}

/// 集計結果型
pub type AggregateResult<T> = Result<T, AggregateError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{classify, WeatherCategory};
    use crate::config::CategoryThresholds;
    use crate::decoder::IntensityGrid;

    fn rain_mask(size: GridSize, cells: Vec<u8>) -> CategoryMask {
        let grid = IntensityGrid::from_cells(size, cells).unwrap();
        classify(&grid, WeatherCategory::Rain, &CategoryThresholds::default())
    }

    #[test]
    fn counts_matching_cells_across_masks() {
        let size = GridSize::new(2, 2).unwrap();
        let masks = [
            rain_mask(size, vec![0, 2, 2, 1]),
            rain_mask(size, vec![0, 60, 1, 1]),
            rain_mask(size, vec![5, 3, 0, 1]),
        ];
        let frequency = aggregate(size, &masks).unwrap();
        assert_eq!(frequency.counts(), &[1, 3, 1, 0]);
        assert_eq!(frequency.snapshots(), 3);
        assert_eq!(frequency.max_count(), 3);
        assert_eq!(frequency.get(1, 0), Some(3));
        assert_eq!(frequency.get(2, 0), None);
    }

    #[test]
    fn empty_input_gives_zero_counts() {
        let size = GridSize::new(3, 1).unwrap();
        let frequency = aggregate(size, []).unwrap();
        assert_eq!(frequency.counts(), &[0, 0, 0]);
        assert_eq!(frequency.snapshots(), 0);
        assert_eq!(frequency.max_count(), 0);
    }

    #[test]
    fn parallel_matches_sequential() {
        let size = GridSize::new(4, 1).unwrap();
        let masks: Vec<_> = (0..16u8)
            .map(|i| rain_mask(size, vec![i % 3, i % 2 + 1, 2, i]))
            .collect();
        assert_eq!(
            par_aggregate(size, &masks).unwrap(),
            aggregate(size, &masks).unwrap()
        );
    }

    #[test]
    fn mismatched_mask_is_rejected() {
        let size = GridSize::new(2, 1).unwrap();
        let other = GridSize::new(1, 2).unwrap();
        let mask = rain_mask(other, vec![2, 2]);
        assert_eq!(
            aggregate(size, [&mask]),
            Err(AggregateError::SizeMismatch {
                expected: size,
                actual: other
            })
        );
    }
}
