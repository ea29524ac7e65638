//! The extractor seam: network routes, download requests and the `MediaExtractor` trait

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::{Progress, VideoInfo};
use crate::{GrabError, Result};

/// One way of reaching the network
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    Direct,
    Proxy(String),
}

impl Route {
    /// Proxy URL, if this route goes through one
    pub fn proxy(&self) -> Option<&str> {
        match self {
            Route::Direct => None,
            Route::Proxy(url) => Some(url),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Direct => f.write_str("direct"),
            Route::Proxy(url) => write!(f, "proxy {}", url),
        }
    }
}

/// Progress sink invoked for every progress record
pub type ProgressCallback = Arc<dyn Fn(Progress) + Send + Sync>;

/// Parameters for a download performed by the extraction library
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    /// Video URL
    pub url: String,
    /// Format-selection expression
    pub format: String,
    /// Convert the result to mp3 (192k)
    pub extract_audio: bool,
    /// Directory the file is written into
    pub output_dir: PathBuf,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>, format: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            format: format.into(),
            extract_audio: false,
            output_dir: output_dir.into(),
        }
    }

    pub fn with_audio_extraction(mut self, extract_audio: bool) -> Self {
        self.extract_audio = extract_audio;
        self
    }
}

/// Black-box media extraction collaborator
///
/// The API and the CLI only ever talk to this trait, so both can be driven by
/// an in-memory implementation in tests.
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// Identifier reported as the response `source` (e.g. "yt-dlp", "invidious")
    fn id(&self) -> &'static str;

    /// Extract metadata and formats without downloading
    async fn extract_info(&self, url: &str, route: &Route) -> Result<VideoInfo>;

    /// Resolve the direct media URL of one format
    async fn get_direct_url(&self, url: &str, format_id: &str, route: &Route) -> Result<String> {
        let info = self.extract_info(url, route).await?;
        info.formats
            .iter()
            .find(|f| f.format_id == format_id)
            .and_then(|f| f.direct_url())
            .map(str::to_string)
            .ok_or_else(|| GrabError::FormatUnavailable(format_id.to_string()))
    }

    /// Download into `request.output_dir` and return the written file
    async fn download(
        &self,
        request: &DownloadRequest,
        route: &Route,
        progress: Option<ProgressCallback>,
    ) -> Result<PathBuf> {
        let _ = (request, route, progress);
        Err(GrabError::Unsupported(self.id()))
    }
}
