//! Video information structures

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::GrabError;

/// Video information and metadata as reported by the extraction library
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Video ID
    #[serde(default)]
    pub id: String,
    /// Video title
    #[serde(default)]
    pub title: String,
    /// Channel / uploader name
    #[serde(default)]
    pub uploader: Option<String>,
    /// Duration in seconds
    #[serde(default)]
    pub duration: Option<f64>,
    /// View count
    #[serde(default)]
    pub view_count: Option<u64>,
    /// Like count
    #[serde(default)]
    pub like_count: Option<u64>,
    /// Upload date as `YYYYMMDD`
    #[serde(default)]
    pub upload_date: Option<String>,
    /// Thumbnail URL
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Description
    #[serde(default)]
    pub description: Option<String>,
    /// Canonical page URL
    #[serde(default)]
    pub webpage_url: Option<String>,
    /// Available formats
    #[serde(default)]
    pub formats: Vec<Format>,
}

impl VideoInfo {
    /// Create a new VideoInfo
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    /// Duration in whole seconds
    pub fn duration_secs(&self) -> Option<u64> {
        self.duration
            .filter(|d| d.is_finite() && *d >= 0.0)
            .map(|d| d.round() as u64)
    }

    /// A copy of this info without the format list
    pub fn without_formats(&self) -> Self {
        Self {
            formats: Vec::new(),
            ..self.clone()
        }
    }

    /// Formats offered by `--list`: mp4/webm containers carrying video
    pub fn listable_formats(&self) -> Vec<&Format> {
        self.formats
            .iter()
            .filter(|f| matches!(f.ext.as_str(), "mp4" | "webm") && f.has_video())
            .collect()
    }
}

/// A single format descriptor, passed through from the library's metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Format {
    /// Library format ID (itag for YouTube)
    #[serde(default)]
    pub format_id: String,
    /// Container extension
    #[serde(default)]
    pub ext: String,
    /// Resolution string (e.g. "1920x1080" or "audio only")
    #[serde(default)]
    pub resolution: Option<String>,
    /// Exact file size in bytes
    #[serde(default)]
    pub filesize: Option<u64>,
    /// Approximate file size in bytes
    #[serde(default)]
    pub filesize_approx: Option<u64>,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub fps: Option<f64>,
    /// Audio bitrate in kbps
    #[serde(default)]
    pub abr: Option<f64>,
    /// Total bitrate in kbps
    #[serde(default)]
    pub tbr: Option<f64>,
    #[serde(default)]
    pub format_note: Option<String>,
    /// Direct media URL
    #[serde(default)]
    pub url: Option<String>,
    /// Base URL for fragmented (DASH) formats
    #[serde(default)]
    pub fragment_base_url: Option<String>,
}

fn codec_present(codec: &Option<String>) -> bool {
    codec.as_deref() != Some("none")
}

impl Format {
    /// Create a new Format
    pub fn new(format_id: impl Into<String>, ext: impl Into<String>) -> Self {
        Self {
            format_id: format_id.into(),
            ext: ext.into(),
            ..Default::default()
        }
    }

    /// Check if the format carries a video stream
    pub fn has_video(&self) -> bool {
        codec_present(&self.vcodec)
    }

    /// Check if the format carries an audio stream
    pub fn has_audio(&self) -> bool {
        codec_present(&self.acodec)
    }

    /// Check if format is audio-only
    pub fn is_audio_only(&self) -> bool {
        self.has_audio() && !self.has_video()
    }

    /// Check if format is progressive (video+audio combined)
    pub fn is_progressive(&self) -> bool {
        self.has_video() && self.has_audio()
    }

    /// Direct URL, falling back to the fragment base URL
    pub fn direct_url(&self) -> Option<&str> {
        self.url
            .as_deref()
            .or(self.fragment_base_url.as_deref())
            .filter(|u| !u.is_empty())
    }

    /// Exact size if known, else the approximation
    pub fn size(&self) -> Option<u64> {
        self.filesize.or(self.filesize_approx)
    }

    /// Get human-readable resolution string
    pub fn resolution_string(&self) -> String {
        match (self.width, self.height) {
            (Some(w), Some(h)) => format!("{}x{}", w, h),
            (None, Some(h)) => format!("{}p", h),
            _ => self
                .resolution
                .clone()
                .unwrap_or_else(|| "Unknown".to_string()),
        }
    }

    /// Get human-readable size string
    pub fn size_string(&self) -> String {
        match self.size() {
            Some(size) => crate::core::progress::format_bytes(size),
            None => "Unknown".to_string(),
        }
    }

    /// Get human-readable audio bitrate string
    pub fn bitrate_string(&self) -> String {
        match self.abr.or(self.tbr) {
            Some(kbps) if kbps > 0.0 => format!("{}kbps", kbps.round() as u64),
            _ => "Unknown".to_string(),
        }
    }
}

/// Coarse quality preference
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// Best video with audio
    #[default]
    Best,
    /// Audio only
    Audio,
}

impl Quality {
    /// Library format-selection expression
    pub fn format_spec(&self) -> &'static str {
        match self {
            Quality::Best => "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best",
            Quality::Audio => "bestaudio/best",
        }
    }

    /// MIME type of the file produced by a download with this preference
    pub fn mime_type(&self) -> &'static str {
        match self {
            Quality::Best => "video/mp4",
            Quality::Audio => "audio/mpeg",
        }
    }

    /// Extension of the file produced by a download with this preference
    pub fn extension(&self) -> &'static str {
        crate::utils::mime::ext_from_mime(self.mime_type())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Best => "best",
            Quality::Audio => "audio",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quality {
    type Err = GrabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "best" => Ok(Quality::Best),
            "audio" => Ok(Quality::Audio),
            _ => Err(GrabError::InvalidQuality(s.to_string())),
        }
    }
}
