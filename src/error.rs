//! Error types for ytgrab

use thiserror::Error;

/// Main error type for ytgrab operations
#[derive(Debug, Error)]
pub enum GrabError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid quality \"{0}\". Must be \"best\" or \"audio\"")]
    InvalidQuality(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("yt-dlp not found. Install it with `pip install yt-dlp` or set YTDLP_PATH")]
    ExtractorNotFound,

    #[error("ffmpeg not found. It is required for audio extraction and stream merging")]
    FfmpegNotFound,

    #[error("Failed to extract video info: {0}")]
    ExtractionFailed(String),

    #[error("Video unavailable: {0}")]
    VideoUnavailable(String),

    #[error("Requested format is not available: {0}")]
    FormatUnavailable(String),

    #[error("No downloadable formats found for this video")]
    NoFormatFound,

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Mirror error: {0}")]
    Mirror(String),

    #[error("All extraction sources failed. Last error: {0}")]
    AllSourcesFailed(String),

    #[error("Operation not supported by {0}")]
    Unsupported(&'static str),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),
}

/// Coarse classification used by the API status mapping and the fallback chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad user input; never retried, never touches the network
    Input,
    /// The extraction library, a mirror or the network failed
    Upstream,
    /// Missing binaries, unreadable configuration, local IO
    Environment,
}

impl GrabError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            GrabError::InvalidUrl(_)
            | GrabError::InvalidQuality(_)
            | GrabError::MissingField(_)
            | GrabError::Url(_) => ErrorKind::Input,
            GrabError::ExtractorNotFound
            | GrabError::FfmpegNotFound
            | GrabError::Config(_)
            | GrabError::Io(_) => ErrorKind::Environment,
            _ => ErrorKind::Upstream,
        }
    }

    /// Check if the fallback chain should move on to the next route or source
    pub fn should_fall_back(&self) -> bool {
        match self.kind() {
            ErrorKind::Input => false,
            ErrorKind::Upstream => true,
            // A missing yt-dlp binary still leaves the mirrors usable
            ErrorKind::Environment => matches!(self, GrabError::ExtractorNotFound),
        }
    }
}
