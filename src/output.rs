use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::ImageFormat;
use tracing::info;

use crate::decoder::IntensityGrid;
use crate::renderer::PixelGrid;

/// 画素の色を記録した格子をPNGファイルに書き込む。
///
/// # 引数
///
/// * `pixels` - 画素の色を記録した格子
/// * `path` - 書き込むPNGファイルのパス
pub fn write_png<P>(pixels: &PixelGrid, path: P) -> OutputResult<()>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    pixels
        .save_with_format(path, ImageFormat::Png)
        .map_err(|e| OutputError::Encode {
            path: path.to_owned(),
            message: format!("{e}"),
        })?;
    info!(path = %path.display(), width = pixels.width(), height = pixels.height(), "PNGファイルを書き込みました。");

    Ok(())
}

/// レベル値をそのままファイルに書き込む。
///
/// ファイルには、最北西端から行優先でレベル値を1バイトずつ記録する。
pub fn dump_raw<P>(grid: &IntensityGrid, path: P) -> OutputResult<()>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let write_error = |e: std::io::Error| OutputError::Write {
        path: path.to_owned(),
        message: format!("{e}"),
    };
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(write_error)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(grid.cells()).map_err(write_error)?;
    writer.flush().map_err(write_error)?;
    info!(path = %path.display(), bytes = grid.cells().len(), "レベル値を書き込みました。");

    Ok(())
}

/// 出力エラー型
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OutputError {
    /// ファイル書き込みエラー
    #[error("ファイルの書き込みに失敗しました。`{path:?}` {message}")]
    Write { path: PathBuf, message: String },

    /// 画像の符号化エラー
    #[error("PNGファイルの書き込みに失敗しました。`{path:?}` {message}")]
    Encode { path: PathBuf, message: String },
}

/// 出力結果型
pub type OutputResult<T> = Result<T, OutputError>;
