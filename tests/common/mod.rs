//! In-memory extractor shared by the integration tests

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use ytgrab::core::{Format, VideoInfo};
use ytgrab::extractor::{DownloadRequest, MediaExtractor, ProgressCallback, Route};
use ytgrab::{GrabError, Result};

pub const VIDEO_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

pub fn sample_info() -> VideoInfo {
    let format = |id: &str, ext: &str, vcodec: &str, acodec: &str| Format {
        vcodec: Some(vcodec.to_string()),
        acodec: Some(acodec.to_string()),
        url: Some(format!("https://media.example/{}", id)),
        ..Format::new(id, ext)
    };

    VideoInfo {
        uploader: Some("Rick Astley".to_string()),
        duration: Some(212.0),
        view_count: Some(1_000_000),
        upload_date: Some("20091025".to_string()),
        thumbnail: Some("https://i.ytimg.com/vi/dQw4w9WgXcQ/hq.jpg".to_string()),
        formats: vec![
            Format {
                abr: Some(48.0),
                ..format("139", "m4a", "none", "mp4a.40.5")
            },
            Format {
                abr: Some(129.5),
                ..format("140", "m4a", "none", "mp4a.40.2")
            },
            Format {
                width: Some(640),
                height: Some(360),
                ..format("18", "mp4", "avc1.42001E", "mp4a.40.2")
            },
            Format {
                width: Some(1280),
                height: Some(720),
                ..format("22", "mp4", "avc1.64001F", "mp4a.40.2")
            },
            Format {
                width: Some(1920),
                height: Some(1080),
                ..format("137", "mp4", "avc1.640028", "none")
            },
        ],
        ..VideoInfo::new("dQw4w9WgXcQ", "Never Gonna Give You Up")
    }
}

/// Extractor answering from memory; optionally failing every call
#[derive(Default)]
pub struct MockExtractor {
    pub fail: bool,
    pub info_calls: AtomicUsize,
    pub downloads: Mutex<Vec<DownloadRequest>>,
}

impl MockExtractor {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn info_calls(&self) -> usize {
        self.info_calls.load(Ordering::SeqCst)
    }

    pub fn download_calls(&self) -> usize {
        self.downloads.lock().unwrap().len()
    }
}

#[async_trait]
impl MediaExtractor for MockExtractor {
    fn id(&self) -> &'static str {
        "mock"
    }

    async fn extract_info(&self, _url: &str, _route: &Route) -> Result<VideoInfo> {
        self.info_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(GrabError::VideoUnavailable("Private video".to_string()));
        }
        Ok(sample_info())
    }

    async fn download(
        &self,
        request: &DownloadRequest,
        _route: &Route,
        _progress: Option<ProgressCallback>,
    ) -> Result<PathBuf> {
        self.downloads.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(GrabError::DownloadFailed("HTTP Error 403".to_string()));
        }
        let ext = if request.extract_audio { "mp3" } else { "mp4" };
        let path = request.output_dir.join(format!("Never Gonna Give You Up.{}", ext));
        tokio::fs::write(&path, b"media bytes").await?;
        Ok(path)
    }
}
