//! Request and response bodies

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::error::ApiError;
use crate::core::{DownloadLinkResponse, Quality, VideoInfo};
use crate::utils::extract_video_id;
use crate::{GrabError, Result};

/// Attached to every successful `/api/download-links` response
pub const LINKS_NOTE: &str = "Download URLs require the provided headers to work. Each download link \
includes headers and example commands (curl/wget) in the download_instructions field. URLs may \
expire after some time, so download promptly.";

/// Body accepted by every `POST /api/*` endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LinkRequest {
    pub url: Option<String>,
    pub quality: Option<String>,
}

impl LinkRequest {
    /// Parse a JSON body
    ///
    /// Anything but an object carrying a non-null `url` is a missing `url`;
    /// other shape problems are reported as they are.
    pub fn from_body(body: Value) -> std::result::Result<Self, ApiError> {
        let has_url = body
            .as_object()
            .and_then(|fields| fields.get("url"))
            .is_some_and(|url| !url.is_null());
        if !has_url {
            return Err(ApiError::MalformedBody);
        }
        serde_json::from_value(body).map_err(|e| ApiError::InvalidBody(e.to_string()))
    }

    /// Validated video URL
    pub fn video_url(&self) -> Result<String> {
        let url = self
            .url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or(GrabError::MissingField("url"))?;
        extract_video_id(url)?;
        Ok(url.to_string())
    }

    /// Requested quality, `best` when absent; other values must match exactly
    pub fn quality(&self) -> Result<Quality> {
        match self.quality.as_deref() {
            None => Ok(Quality::Best),
            Some(value) => value.parse(),
        }
    }

    /// URL and quality, checked before anything touches the network
    pub fn validate(&self) -> Result<(String, Quality)> {
        if self.url.is_none() {
            return Err(GrabError::MissingField("url"));
        }
        let quality = self.quality()?;
        Ok((self.video_url()?, quality))
    }
}

#[derive(Debug, Serialize)]
pub struct LinksEnvelope {
    pub success: bool,
    pub data: DownloadLinkResponse,
    pub note: &'static str,
}

impl LinksEnvelope {
    pub fn new(data: DownloadLinkResponse) -> Self {
        Self {
            success: true,
            data,
            note: LINKS_NOTE,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MetadataEnvelope {
    pub success: bool,
    pub metadata: VideoInfo,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}
