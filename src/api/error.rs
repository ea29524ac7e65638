//! Error → HTTP response mapping

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::{error, warn};

use crate::api::models::ErrorBody;
use crate::error::{ErrorKind, GrabError};

const EXTRACTION_FAILED: &str =
    "Failed to extract video information. Video may be private, unavailable, or region-restricted.";
const INTERNAL: &str = "Internal server error";

#[derive(Debug, Error)]
pub enum ApiError {
    /// Body missing, not JSON, not an object, or without a `url`
    #[error("Missing required field: url")]
    MalformedBody,

    /// JSON object whose fields have the wrong shape
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error(transparent)]
    Grab(#[from] GrabError),

    /// Failure while the library was writing the file
    #[error("{0}")]
    Download(GrabError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!("Rejected request body: {}", rejection);
        ApiError::MalformedBody
    }
}

impl ApiError {
    /// Wrap an error from the download step; input errors stay 400s
    pub fn download(err: GrabError) -> Self {
        match err.kind() {
            ErrorKind::Input => ApiError::Grab(err),
            _ => ApiError::Download(err),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MalformedBody | ApiError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ApiError::Grab(err) => match err.kind() {
                ErrorKind::Input => StatusCode::BAD_REQUEST,
                ErrorKind::Upstream => StatusCode::NOT_FOUND,
                ErrorKind::Environment => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Download(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text placed in the `error` field
    pub fn message(&self) -> String {
        match self {
            ApiError::Grab(err) => match err.kind() {
                ErrorKind::Input => err.to_string(),
                ErrorKind::Upstream if matches!(err, GrabError::NoFormatFound) => err.to_string(),
                ErrorKind::Upstream => EXTRACTION_FAILED.to_string(),
                ErrorKind::Environment => INTERNAL.to_string(),
            },
            ApiError::Download(err @ GrabError::DownloadFailed(_)) => err.to_string(),
            ApiError::Download(err) => format!("Download failed: {}", err),
            ApiError::Internal(_) => INTERNAL.to_string(),
            ApiError::MalformedBody | ApiError::InvalidBody(_) => self.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request failed ({}): {}", status.as_u16(), self);
        }
        (status, Json(ErrorBody::new(self.message()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::MalformedBody.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::InvalidBody("invalid type".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(GrabError::InvalidQuality("hd".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(GrabError::AllSourcesFailed("x".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(GrabError::NoFormatFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(GrabError::ExtractorNotFound).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::download(GrabError::FfmpegNotFound).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::download(GrabError::MissingField("url")).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            ApiError::from(GrabError::VideoUnavailable("private".into())).message(),
            EXTRACTION_FAILED
        );
        assert_eq!(
            ApiError::from(GrabError::NoFormatFound).message(),
            "No downloadable formats found for this video"
        );
        assert_eq!(
            ApiError::from(GrabError::InvalidQuality("hd".into())).message(),
            "Invalid quality \"hd\". Must be \"best\" or \"audio\""
        );
        assert_eq!(ApiError::MalformedBody.message(), "Missing required field: url");
        assert_eq!(ApiError::Internal("oops".into()).message(), INTERNAL);
        assert!(ApiError::download(GrabError::DownloadFailed("disk full".into()))
            .message()
            .starts_with("Download failed:"));
    }
}
