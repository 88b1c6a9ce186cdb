//! 観測データの取得から集計までの処理をまとめる。

use rayon::prelude::*;
use tracing::{info, warn};

use crate::aggregator::{AggregateError, FrequencyGrid};
use crate::classifier::{classify, CategoryMask, WeatherCategory};
use crate::config::RadarConfig;
use crate::decoder::{DecodeError, IntensityGrid};
use crate::fetcher::SnapshotFetcher;
use crate::source::{SnapshotPayload, SnapshotTime, SourceError};

/// 観測日時の解析雨量を取得して、レベル値を展開する。
///
/// # 引数
///
/// * `fetcher` - 解析雨量ファイルの取得方法
/// * `at` - 観測日時
/// * `config` - 格子と天気区分の設定
///
/// # 戻り値
///
/// `IntensityGrid`
pub fn load_intensity<F>(
    fetcher: &F,
    at: SnapshotTime,
    config: &RadarConfig,
) -> PipelineResult<IntensityGrid>
where
    F: SnapshotFetcher + ?Sized,
{
    let bytes = fetcher.fetch(at)?;
    let payload = SnapshotPayload::parse(&bytes)?;
    let grid = payload.decode(config.grid)?;
    info!(%at, max_literal = payload.max_literal, "解析雨量を展開しました。");

    Ok(grid)
}

/// 並列に集計している途中の結果
type Partial = (FrequencyGrid, Vec<SkippedSnapshot>);

/// 集計から除外した観測日時
#[derive(Debug)]
pub struct SkippedSnapshot {
    /// 観測日時
    pub at: SnapshotTime,
    /// 除外した理由
    pub reason: PipelineError,
}

/// 天気区分の該当回数の集計結果
#[derive(Debug)]
pub struct FrequencySummary {
    /// 該当回数
    pub frequency: FrequencyGrid,
    /// 取得または展開に失敗したため、集計から除外した観測日時
    pub skipped: Vec<SkippedSnapshot>,
}

/// 複数の観測日時の解析雨量を取得して、天気区分に該当した回数を集計する。
///
/// 観測日時ごとの取得と展開は並列に実行する。
/// 取得または展開に失敗した観測日時は集計から除外して、`FrequencySummary::skipped`に記録する。
/// すべての観測日時で失敗した場合はエラーを返す。
pub fn accumulate_frequency<F>(
    fetcher: &F,
    times: &[SnapshotTime],
    category: WeatherCategory,
    config: &RadarConfig,
) -> PipelineResult<FrequencySummary>
where
    F: SnapshotFetcher + Sync + ?Sized,
{
    let size = config.grid;
    let (frequency, mut skipped) = times
        .par_iter()
        .map(|at| (*at, load_mask(fetcher, *at, category, config)))
        .try_fold(
            || (FrequencyGrid::new(size), Vec::new()),
            |(mut frequency, mut skipped), (at, mask)| -> PipelineResult<Partial> {
                match mask {
                    Ok(mask) => frequency.accumulate(&mask)?,
                    Err(reason) if reason.is_skippable() => {
                        warn!(%at, %reason, "観測日時を集計から除外します。");
                        skipped.push(SkippedSnapshot { at, reason });
                    }
                    Err(reason) => return Err(reason),
                }
                Ok((frequency, skipped))
            },
        )
        .try_reduce(
            || (FrequencyGrid::new(size), Vec::new()),
            |(frequency, mut skipped), (other, other_skipped)| -> PipelineResult<Partial> {
                skipped.extend(other_skipped);
                Ok((frequency.merge(&other)?, skipped))
            },
        )?;

    if frequency.snapshots() == 0 {
        return Err(PipelineError::NoSnapshots(times.len()));
    }
    skipped.sort_by_key(|s| s.at);
    info!(
        %category,
        snapshots = frequency.snapshots(),
        skipped = skipped.len(),
        max_count = frequency.max_count(),
        "天気区分の該当回数を集計しました。"
    );

    Ok(FrequencySummary { frequency, skipped })
}

fn load_mask<F>(
    fetcher: &F,
    at: SnapshotTime,
    category: WeatherCategory,
    config: &RadarConfig,
) -> PipelineResult<CategoryMask>
where
    F: SnapshotFetcher + ?Sized,
{
    let grid = load_intensity(fetcher, at, config)?;

    Ok(classify(&grid, category, &config.thresholds))
}

/// 処理エラー型
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    /// 観測データ取得エラー
    #[error(transparent)]
    Source(#[from] SourceError),

    /// 展開エラー
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// 集計エラー
    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    /// 集計できる観測日時がない
    #[error("{0}件の観測日時のうち、集計できた観測日時がありません。")]
    NoSnapshots(usize),
}

impl PipelineError {
    /// 観測日時を除外して処理を継続できるエラーかを返す。
    pub fn is_skippable(&self) -> bool {
        matches!(self, Self::Source(_) | Self::Decode(_))
    }
}

/// 処理結果型
pub type PipelineResult<T> = Result<T, PipelineError>;
