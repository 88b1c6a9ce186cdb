use std::fs::OpenOptions;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::info;

use crate::source::{extract_entry, SnapshotTime, SourceError, SourceResult};

/// 京都大学生存圏研究所が公開している気象庁レーダーデータのアーカイブ
pub const DEFAULT_BASE_URL: &str =
    "http://database.rish.kyoto-u.ac.jp/arch/jmadata/data/jma-radar/synthetic/original";

/// 既定のHTTPタイムアウト（秒）
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// 観測日時の解析雨量ファイルの内容を取得する。
pub trait SnapshotFetcher {
    fn fetch(&self, at: SnapshotTime) -> SourceResult<Vec<u8>>;
}

/// HTTPでアーカイブをダウンロードして、解析雨量ファイルを取り出す。
#[derive(Debug, Clone)]
pub struct HttpArchiveFetcher {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpArchiveFetcher {
    /// # 引数
    ///
    /// * `base_url` - アーカイブのURLの基点
    /// * `timeout` - HTTPリクエストのタイムアウト
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> SourceResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Http(format!("{e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl SnapshotFetcher for HttpArchiveFetcher {
    fn fetch(&self, at: SnapshotTime) -> SourceResult<Vec<u8>> {
        let url = at.archive_url(&self.base_url)?;
        info!(%url, "アーカイブをダウンロードします。");
        let response = self
            .client
            .get(&url)
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(|e| SourceError::Http(format!("{e}")))?;

        extract_entry(response, &at.entry_name()?)
    }
}

/// ローカルのディレクトリに保存されたアーカイブから、解析雨量ファイルを取り出す。
///
/// アーカイブは、配信元と同じ`年/月/日/`のディレクトリに保存されていることを想定している。
#[derive(Debug, Clone)]
pub struct LocalArchiveFetcher {
    root: PathBuf,
}

impl LocalArchiveFetcher {
    pub fn new<P>(root: P) -> Self
    where
        P: AsRef<Path>,
    {
        Self {
            root: root.as_ref().to_owned(),
        }
    }

    /// 観測日時のアーカイブのパスを返す。
    pub fn archive_path(&self, at: SnapshotTime) -> SourceResult<PathBuf> {
        Ok(self.root.join(at.archive_path()?))
    }
}

impl SnapshotFetcher for LocalArchiveFetcher {
    fn fetch(&self, at: SnapshotTime) -> SourceResult<Vec<u8>> {
        let path = self.archive_path(at)?;
        info!(path = %path.display(), "アーカイブを開きます。");
        let file = OpenOptions::new()
            .read(true)
            .open(&path)
            .map_err(|e| SourceError::Open(format!("{}: {e}", path.display())))?;

        extract_entry(BufReader::new(file), &at.entry_name()?)
    }
}
