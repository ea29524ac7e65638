//! Endpoint handlers

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::StreamExt;
use serde_json::{json, Value};
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use crate::api::error::ApiError;
use crate::api::models::{ErrorBody, HealthResponse, LinkRequest, LinksEnvelope, MetadataEnvelope};
use crate::api::AppState;
use crate::core::{DownloadLinkResponse, Quality};
use crate::extractor::DownloadRequest;
use crate::utils::{content_disposition, mime_from_ext, to_safe_filename};
use crate::GrabError;

/// `POST /api/download-links`
pub async fn download_links(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<LinksEnvelope>, ApiError> {
    let Json(body) = payload?;
    let request = LinkRequest::from_body(body)?;
    let (url, quality) = request.validate()?;

    let extraction = state.chain.extract(&url).await?;
    let data = DownloadLinkResponse::build(
        &extraction.info,
        extraction.source,
        quality,
        &state.settings.request_headers(),
        state.settings.max_links,
    )?;

    info!(
        "Resolved {} {} link(s) for {} from {}",
        data.download_links.len(),
        quality,
        url,
        data.source
    );
    Ok(Json(LinksEnvelope::new(data)))
}

/// `POST /api/metadata`
pub async fn metadata(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<MetadataEnvelope>, ApiError> {
    let Json(body) = payload?;
    let request = LinkRequest::from_body(body)?;
    let (url, _) = request.validate()?;

    let extraction = state.chain.extract(&url).await?;
    Ok(Json(MetadataEnvelope {
        success: true,
        metadata: extraction.info.without_formats(),
    }))
}

/// `POST /api/download`: stream the downloaded file back as an attachment
pub async fn download(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = payload?;
    let request = LinkRequest::from_body(body)?;
    let (url, quality) = request.validate()?;

    let scratch = tempfile::Builder::new()
        .prefix("ytgrab-")
        .tempdir()
        .map_err(GrabError::from)?;

    let download = DownloadRequest::new(&url, quality.format_spec(), scratch.path())
        .with_audio_extraction(quality == Quality::Audio);
    let path = state
        .chain
        .download(&download, None)
        .await
        .map_err(ApiError::download)?;

    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|e| ApiError::Download(GrabError::Io(e)))?;
    let length = file
        .metadata()
        .await
        .map_err(|e| ApiError::Download(GrabError::Io(e)))?
        .len();

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| quality.extension().to_string());
    let content_type = mime_from_ext(&extension).unwrap_or(quality.mime_type());
    let filename = to_safe_filename(&stem, &extension);
    debug!("Streaming {} ({} bytes, {})", path.display(), length, content_type);

    // The scratch directory lives until the body is dropped
    let stream = ReaderStream::new(file).map(move |chunk| {
        let _scratch = &scratch;
        chunk
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, length)
        .header(header::CONTENT_DISPOSITION, content_disposition(&filename))
        .body(Body::from_stream(stream))
        .map_err(|e| ApiError::Internal(e.to_string()))
}

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

/// `GET /`
pub async fn index(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "service": "ytgrab",
        "version": env!("CARGO_PKG_VERSION"),
        "mirrors_enabled": state.settings.mirrors.enabled,
        "endpoints": {
            "POST /api/download-links": "Resolve direct media URLs ({url, quality: best|audio})",
            "POST /api/metadata": "Video metadata without formats ({url})",
            "POST /api/download": "Download and stream the file ({url, quality: best|audio})",
            "GET /health": "Liveness check",
        },
    }))
}

/// Any unrouted path
pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(ErrorBody::new("Endpoint not found")))
}
