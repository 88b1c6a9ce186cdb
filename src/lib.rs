//! 気象庁の全国合成レーダーの解析雨量を展開、分類、描画する。
//!
//! 解析雨量ファイルの圧縮データを格子ごとのレベル値に展開して、天気区分で分類し、
//! グレースケール、天気区分、該当回数のヒートマップとして描画する。

pub mod aggregator;
pub mod classifier;
pub mod config;
pub mod decoder;
pub mod fetcher;
pub mod output;
pub mod pipeline;
pub mod renderer;
pub mod source;

pub use aggregator::{aggregate, par_aggregate, AggregateError, FrequencyGrid};
pub use classifier::{classify, CategoryMask, WeatherCategory};
pub use config::{CategoryThresholds, ConfigError, GridSize, RadarConfig};
pub use decoder::{decode, DecodeError, IntensityGrid};
pub use fetcher::{HttpArchiveFetcher, LocalArchiveFetcher, SnapshotFetcher};
pub use output::{dump_raw, write_png, OutputError};
pub use pipeline::{accumulate_frequency, load_intensity, FrequencySummary, PipelineError};
pub use renderer::{
    heat_color, render, render_frequency, render_intensity, render_mask, PixelGrid,
    RenderableGrid,
};
pub use source::{SnapshotPayload, SnapshotTime, SourceError};
