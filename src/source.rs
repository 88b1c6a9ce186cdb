use std::ffi::OsStr;
use std::fmt;
use std::io::Read;

use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Duration, OffsetDateTime, UtcOffset};
use tracing::debug;

use crate::config::GridSize;
use crate::decoder::{DecodeResult, IntensityGrid};

/// レベル値として扱うバイトの最大値が記録されている位置
pub const MAX_LITERAL_OFFSET: usize = 204;

/// 圧縮データのサイズ（ビッグエンディアン）が記録されている位置
pub const COMPRESSED_SIZE_OFFSET: usize = 716;

/// 圧縮データの開始位置
pub const COMPRESSED_DATA_OFFSET: usize = 721;

/// 圧縮データの後ろに続くバイト数
pub const TRAILER_BYTES: usize = 4;

/// アーカイブから取り出すファイルの最大サイズ（バイト）
///
/// 解析雨量ファイルは圧縮前でも格子数（約860万）程度に収まる。
pub const MAX_ENTRY_BYTES: u64 = 64 * 1024 * 1024;

/// 観測データを配信する間隔（分）
pub const SNAPSHOT_INTERVAL_MINUTES: u8 = 10;

/// 年月日のディレクトリの書式
const DIRECTORY_FMT: &[FormatItem<'_>] = format_description!("[year]/[month]/[day]");

/// ファイル名に付与する日時の書式
const FILE_DATETIME_FMT: &[FormatItem<'_>] =
    format_description!("[year][month][day][hour][minute]");

/// 表示用の日時の書式
const DISPLAY_FMT: &[FormatItem<'_>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]Z");

/// 観測日時
///
/// UTCに変換して、10分単位に切り捨てた日時を保持する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnapshotTime(OffsetDateTime);

impl SnapshotTime {
    /// 任意の日時から、その日時以前で最も新しい観測日時を構築する。
    pub fn new(at: OffsetDateTime) -> Self {
        let utc = at.to_offset(UtcOffset::UTC);
        let excess = Duration::minutes((utc.minute() % SNAPSHOT_INTERVAL_MINUTES) as i64)
            + Duration::seconds(utc.second() as i64)
            + Duration::nanoseconds(utc.nanosecond() as i64);

        Self(utc - excess)
    }

    /// UTCの観測日時を返す。
    pub fn date_time(&self) -> OffsetDateTime {
        self.0
    }

    fn stamp(&self) -> SourceResult<String> {
        self.0
            .format(FILE_DATETIME_FMT)
            .map_err(|e| SourceError::Unexpected(format!("観測日時を書式化できません。{e}")))
    }

    /// アーカイブ・ファイル名を返す。
    pub fn archive_name(&self) -> SourceResult<String> {
        Ok(format!("Z__C_RJTD_{}00_RDR_JMAGPV__grib2.tar", self.stamp()?))
    }

    /// 年月日のディレクトリを含むアーカイブ・ファイルの相対パスを返す。
    ///
    /// 例: `2015/10/29/Z__C_RJTD_20151029004000_RDR_JMAGPV__grib2.tar`
    pub fn archive_path(&self) -> SourceResult<String> {
        let directory = self.0.format(DIRECTORY_FMT).map_err(|e| {
            SourceError::Unexpected(format!("観測日時を書式化できません。{e}"))
        })?;

        Ok(format!("{directory}/{}", self.archive_name()?))
    }

    /// アーカイブに含まれる全国合成レーダーの解析雨量ファイル名を返す。
    pub fn entry_name(&self) -> SourceResult<String> {
        Ok(format!(
            "Z__C_RJTD_{}00_RDR_JMAGPV_Ggis1km_Prr10lv_ANAL_grib2.bin",
            self.stamp()?
        ))
    }

    /// アーカイブのURLを返す。
    pub fn archive_url(&self, base_url: &str) -> SourceResult<String> {
        Ok(format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            self.archive_path()?
        ))
    }
}

impl From<OffsetDateTime> for SnapshotTime {
    fn from(at: OffsetDateTime) -> Self {
        Self::new(at)
    }
}

impl fmt::Display for SnapshotTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.0.format(DISPLAY_FMT).map_err(|_| fmt::Error)?;
        f.write_str(&s)
    }
}

/// 解析雨量ファイルから取り出した圧縮データ
#[derive(Debug, Clone, Copy)]
pub struct SnapshotPayload<'a> {
    /// レベル値として扱うバイトの最大値
    pub max_literal: u8,

    /// ファイルに記録されている圧縮データのサイズ
    ///
    /// 展開には使用しない。
    pub advisory_size: u32,

    /// 圧縮データ
    pub compressed: &'a [u8],
}

impl<'a> SnapshotPayload<'a> {
    /// 解析雨量ファイルの内容から圧縮データを取り出す。
    ///
    /// # 引数
    ///
    /// * `bytes` - 解析雨量ファイルの内容
    ///
    /// # 戻り値
    ///
    /// `SnapshotPayload`
    pub fn parse(bytes: &'a [u8]) -> SourceResult<Self> {
        if bytes.len() < COMPRESSED_DATA_OFFSET + TRAILER_BYTES {
            return Err(SourceError::TooShort(bytes.len()));
        }
        let max_literal = bytes[MAX_LITERAL_OFFSET];
        let mut size = [0u8; 4];
        size.copy_from_slice(&bytes[COMPRESSED_SIZE_OFFSET..COMPRESSED_SIZE_OFFSET + 4]);
        let advisory_size = u32::from_be_bytes(size);
        let compressed = &bytes[COMPRESSED_DATA_OFFSET..bytes.len() - TRAILER_BYTES];
        if advisory_size as usize != compressed.len() {
            debug!(
                advisory_size,
                actual = compressed.len(),
                "記録されている圧縮データのサイズが実際のサイズと異なります。"
            );
        }

        Ok(Self {
            max_literal,
            advisory_size,
            compressed,
        })
    }

    /// 圧縮データを展開する。
    pub fn decode(&self, size: GridSize) -> DecodeResult<IntensityGrid> {
        IntensityGrid::decode(self.compressed, self.max_literal, size)
    }
}

/// tarアーカイブから、指定された名前のファイルの内容を取り出す。
///
/// # 引数
///
/// * `reader` - tarアーカイブを読み込むリーダー
/// * `entry_name` - 取り出すファイルの名前
///
/// # 戻り値
///
/// ファイルの内容
pub fn extract_entry<R>(reader: R, entry_name: &str) -> SourceResult<Vec<u8>>
where
    R: Read,
{
    let mut archive = tar::Archive::new(reader);
    let entries = archive
        .entries()
        .map_err(|e| SourceError::Archive(format!("{e}")))?;
    for entry in entries {
        let mut entry = entry.map_err(|e| SourceError::Archive(format!("{e}")))?;
        let path = entry
            .path()
            .map_err(|e| SourceError::Archive(format!("{e}")))?;
        if path.file_name() != Some(OsStr::new(entry_name)) {
            continue;
        }
        let size = entry.size();
        if size > MAX_ENTRY_BYTES {
            return Err(SourceError::Archive(format!(
                "`{entry_name}`のサイズ({size}バイト)が上限({MAX_ENTRY_BYTES}バイト)を超えています。"
            )));
        }
        let mut contents = Vec::new();
        entry
            .by_ref()
            .take(MAX_ENTRY_BYTES)
            .read_to_end(&mut contents)
            .map_err(|e| SourceError::Archive(format!("{e}")))?;
        debug!(entry_name, bytes = contents.len(), "アーカイブからファイルを取り出しました。");
        return Ok(contents);
    }

    Err(SourceError::EntryNotFound(entry_name.to_string()))
}

/// 観測データ取得エラー型
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// 予期しない例外
    #[error("{0}")]
    Unexpected(String),

    /// ファイル・オープン・エラー
    #[error("ファイルを開くときにエラーが発生しました。{0}")]
    Open(String),

    /// HTTPエラー
    #[error("アーカイブのダウンロードに失敗しました。{0}")]
    Http(String),

    /// アーカイブの読み込みエラー
    #[error("アーカイブの読み込みに失敗しました。{0}")]
    Archive(String),

    /// アーカイブにファイルが含まれていない
    #[error("アーカイブにファイルが含まれていません。`{0}`")]
    EntryNotFound(String),

    /// 解析雨量ファイルが短すぎる
    #[error("解析雨量ファイルのサイズ({0}バイト)が小さすぎます。")]
    TooShort(usize),
}

/// 観測データ取得結果型
pub type SourceResult<T> = Result<T, SourceError>;
