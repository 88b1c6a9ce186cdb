//! 全国合成レーダーの解析雨量を画像にするコマンド
//!
//! - `latest`: 最新の解析雨量をグレースケールと雨の判定結果の画像にする
//! - `frequency`: 複数の観測日時で天気区分に該当した回数をヒートマップにする

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use jma_radar::config::{
    DEFAULT_DOWNPOUR_MIN, DEFAULT_GRID_HEIGHT, DEFAULT_GRID_WIDTH, DEFAULT_SPRINKLE_MAX,
};
use jma_radar::fetcher::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
use jma_radar::{
    accumulate_frequency, classify, dump_raw, load_intensity, render_frequency, render_intensity,
    render_mask, write_png, CategoryThresholds, GridSize, HttpArchiveFetcher, LocalArchiveFetcher,
    RadarConfig, SnapshotFetcher, SnapshotTime, WeatherCategory,
};

#[derive(Parser, Debug)]
#[command(name = "jma-radar")]
#[command(about = "全国合成レーダーの解析雨量を画像にする")]
struct Args {
    /// アーカイブのURLの基点
    #[arg(long, env = "JMA_RADAR_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// ダウンロードせずにアーカイブを読み込むディレクトリ
    #[arg(long, env = "JMA_RADAR_ARCHIVE_DIR")]
    archive_dir: Option<PathBuf>,

    /// 画像を出力するディレクトリ
    #[arg(long, env = "JMA_RADAR_OUTPUT_DIR", default_value = "tmp")]
    output_dir: PathBuf,

    /// HTTPリクエストのタイムアウト（秒）
    #[arg(long, env = "JMA_RADAR_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// 横方向の格子数
    #[arg(long, default_value_t = DEFAULT_GRID_WIDTH)]
    grid_width: u32,

    /// 縦方向の格子数
    #[arg(long, default_value_t = DEFAULT_GRID_HEIGHT)]
    grid_height: u32,

    /// 弱い雨の上限のレベル値（この値を含まない）
    #[arg(long, default_value_t = DEFAULT_SPRINKLE_MAX)]
    sprinkle_max: u8,

    /// 強い雨の下限のレベル値（この値を含まない）
    #[arg(long, default_value_t = DEFAULT_DOWNPOUR_MIN)]
    downpour_min: u8,

    /// ログレベル
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 現在から指定した分だけ前の解析雨量を画像にする
    Latest {
        /// 現在から遡る分数
        #[arg(long, default_value_t = 60)]
        lag_minutes: i64,

        /// レベル値をそのままファイルに書き込む
        #[arg(long)]
        dump: bool,
    },

    /// 天気区分に該当した回数をヒートマップにする
    Frequency {
        /// 観測日時（RFC3339）
        #[arg(long = "at", required = true, value_parser = parse_date_time)]
        times: Vec<OffsetDateTime>,

        /// 天気区分
        #[arg(long, default_value = "rain")]
        category: WeatherCategory,

        /// 出力するファイル名
        #[arg(long, default_value = "frequency.png")]
        output: PathBuf,
    },
}

fn parse_date_time(s: &str) -> Result<OffsetDateTime, time::error::Parse> {
    OffsetDateTime::parse(s, &Rfc3339)
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = RadarConfig::new(
        GridSize::new(args.grid_width, args.grid_height)?,
        CategoryThresholds::new(args.sprinkle_max, args.downpour_min)?,
    );
    let fetcher: Box<dyn SnapshotFetcher + Send + Sync> = match &args.archive_dir {
        Some(dir) => Box::new(LocalArchiveFetcher::new(dir)),
        None => Box::new(HttpArchiveFetcher::new(
            args.base_url.clone(),
            Duration::from_secs(args.timeout_secs),
        )?),
    };
    fs::create_dir_all(&args.output_dir).with_context(|| {
        format!(
            "出力ディレクトリを作成できません。`{}`",
            args.output_dir.display()
        )
    })?;

    match &args.command {
        Command::Latest { lag_minutes, dump } => {
            let at = SnapshotTime::new(
                OffsetDateTime::now_utc() - time::Duration::minutes(*lag_minutes),
            );
            let grid = load_intensity(fetcher.as_ref(), at, &config)
                .with_context(|| format!("{at}の解析雨量を取得できません。"))?;
            write_png(&render_intensity(&grid), args.output_dir.join("intensity.png"))?;
            let rain = classify(&grid, WeatherCategory::Rain, &config.thresholds);
            write_png(&render_mask(&rain), args.output_dir.join("rain.png"))?;
            if *dump {
                dump_raw(&grid, args.output_dir.join("intensity.bin"))?;
            }
        }
        Command::Frequency {
            times,
            category,
            output,
        } => {
            let times: Vec<SnapshotTime> = times.iter().copied().map(SnapshotTime::new).collect();
            let summary = accumulate_frequency(fetcher.as_ref(), &times, *category, &config)?;
            write_png(
                &render_frequency(&summary.frequency),
                args.output_dir.join(output),
            )?;
            info!(
                snapshots = summary.frequency.snapshots(),
                skipped = summary.skipped.len(),
                "ヒートマップを作成しました。"
            );
        }
    }

    Ok(())
}
