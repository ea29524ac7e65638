//! CLI-facing orchestration: info, format listing and downloads

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::core::{select_formats, Format, Progress, Quality, VideoInfo};
use crate::extractor::{DownloadRequest, MediaExtractor, ProgressCallback, Route};
use crate::utils::extract_video_id;
use crate::{GrabError, Result};

/// Downloader configuration
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Quality preference used when no explicit format is given
    pub quality: Quality,
    /// Explicit library format ID, overrides `quality`
    pub format_id: Option<String>,
    /// Output directory
    pub output_path: PathBuf,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            quality: Quality::Best,
            format_id: None,
            output_path: PathBuf::from("downloads"),
        }
    }
}

impl DownloadOptions {
    /// Format-selection expression handed to the library
    pub fn format_spec(&self) -> String {
        match &self.format_id {
            Some(id) => id.clone(),
            None => self.quality.format_spec().to_string(),
        }
    }

    /// Whether the result is converted to mp3
    pub fn extract_audio(&self) -> bool {
        self.format_id.is_none() && self.quality == Quality::Audio
    }
}

/// Main downloader struct
pub struct Downloader {
    options: DownloadOptions,
    extractor: Arc<dyn MediaExtractor>,
    route: Route,
    progress: Option<ProgressCallback>,
}

impl Downloader {
    /// Create a downloader driving `extractor` over `route`
    pub fn new(extractor: Arc<dyn MediaExtractor>, route: Route) -> Self {
        Self {
            options: DownloadOptions::default(),
            extractor,
            route,
            progress: None,
        }
    }

    /// Set quality preference
    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.options.quality = quality;
        self
    }

    /// Set explicit format ID
    pub fn with_format_id(mut self, format_id: Option<String>) -> Self {
        self.options.format_id = format_id.filter(|id| !id.trim().is_empty());
        self
    }

    /// Set output directory
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.output_path = path.into();
        self
    }

    /// Set progress callback
    pub fn with_progress(mut self, callback: impl Fn(Progress) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(callback));
        self
    }

    pub fn options(&self) -> &DownloadOptions {
        &self.options
    }

    /// Fetch metadata without downloading
    pub async fn video_info(&self, url: &str) -> Result<VideoInfo> {
        let video_id = extract_video_id(url)?;
        info!("Fetching info for video ID: {}", video_id);
        self.extractor.extract_info(url, &self.route).await
    }

    /// Metadata plus the listable formats; never touches the output directory
    pub async fn list_formats(&self, url: &str) -> Result<(VideoInfo, Vec<Format>)> {
        let info = self.video_info(url).await?;
        let formats: Vec<Format> = info.listable_formats().into_iter().cloned().collect();
        debug!("{} of {} formats listable", formats.len(), info.formats.len());
        Ok((info, formats))
    }

    /// Direct media URL of the explicit format, or of the top pick for the quality
    pub async fn resolve_url(&self, url: &str) -> Result<String> {
        extract_video_id(url)?;
        if let Some(format_id) = &self.options.format_id {
            return self
                .extractor
                .get_direct_url(url, format_id, &self.route)
                .await;
        }

        let info = self.extractor.extract_info(url, &self.route).await?;
        select_formats(&info, self.options.quality, 1)
            .first()
            .and_then(|format| format.direct_url())
            .map(str::to_string)
            .ok_or(GrabError::NoFormatFound)
    }

    /// Download into the output directory and return the written file
    pub async fn download(&self, url: &str) -> Result<PathBuf> {
        extract_video_id(url)?;

        tokio::fs::create_dir_all(&self.options.output_path).await?;
        info!(
            "Downloading {} with format {} to {}",
            url,
            self.options.format_spec(),
            self.options.output_path.display()
        );

        let request = DownloadRequest::new(url, self.options.format_spec(), &self.options.output_path)
            .with_audio_extraction(self.options.extract_audio());

        self.extractor
            .download(&request, &self.route, self.progress.clone())
            .await
    }
}
