mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use ytgrab::api::{router, AppState};
use ytgrab::{FallbackChain, Settings};

use common::{MockExtractor, VIDEO_URL};

fn app(extractor: Arc<MockExtractor>) -> Router {
    let settings = Arc::new(Settings::default().with_mirrors_enabled(false));
    router(AppState::new(FallbackChain::new(extractor, settings)))
}

fn post_json(path: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(path: &str) -> Request<Body> {
    Request::builder().uri(path).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn audio_links_are_audio_only() {
    let extractor = Arc::new(MockExtractor::default());
    let app = app(extractor.clone());

    let (status, body) = send(
        &app,
        post_json("/api/download-links", json!({"url": VIDEO_URL, "quality": "audio"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["source"], "mock");
    let links = body["data"]["download_links"].as_array().unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0]["format_id"], "140");
    assert_eq!(links[0]["quality"], "Audio Only");
    assert!(links[0].get("resolution").is_none());
    assert!(body["note"].as_str().unwrap().contains("headers"));
}

#[tokio::test]
async fn best_links_are_muxed_and_sorted() {
    let app = app(Arc::new(MockExtractor::default()));

    let (status, body) = send(&app, post_json("/api/download-links", json!({"url": VIDEO_URL}))).await;

    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["title"], "Never Gonna Give You Up");
    assert_eq!(data["uploader"], "Rick Astley");
    assert_eq!(data["duration"], 212);
    let ids: Vec<&str> = data["download_links"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["format_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["22", "18"]);
    assert_eq!(data["download_links"][0]["quality"], "720p HD");
    assert_eq!(data["download_links"][0]["requires_headers"], true);
    assert!(data["download_links"][0]["headers"]["User-Agent"].is_string());
}

#[tokio::test]
async fn bad_input_is_rejected_without_extraction() {
    let extractor = Arc::new(MockExtractor::default());
    let app = app(extractor.clone());

    let cases = [
        json!({}),
        json!({"url": ""}),
        json!({"url": "   "}),
        json!({"url": "https://vimeo.com/12345"}),
        json!({"url": "not a url"}),
        json!({"url": VIDEO_URL, "quality": "hd"}),
    ];
    for case in cases {
        for path in ["/api/download-links", "/api/metadata", "/api/download"] {
            let (status, body) = send(&app, post_json(path, case.clone())).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{} {}", path, case);
            assert_eq!(body["success"], false);
            assert!(!body["error"].as_str().unwrap().is_empty());
        }
    }

    assert_eq!(extractor.info_calls(), 0);
    assert_eq!(extractor.download_calls(), 0);
}

#[tokio::test]
async fn malformed_body_is_a_missing_url() {
    let extractor = Arc::new(MockExtractor::default());
    let app = app(extractor.clone());

    let request = Request::builder()
        .method("POST")
        .uri("/api/download-links")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required field: url");
    assert_eq!(extractor.info_calls(), 0);
}

#[tokio::test]
async fn wrongly_typed_field_reports_the_actual_problem() {
    let extractor = Arc::new(MockExtractor::default());
    let app = app(extractor.clone());

    let (status, body) = send(
        &app,
        post_json("/api/download-links", json!({"url": VIDEO_URL, "quality": 5})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error = body["error"].as_str().unwrap();
    assert!(error.starts_with("Invalid request body:"), "{}", error);
    assert!(!error.contains("Missing required field"));

    let (status, body) = send(&app, post_json("/api/metadata", json!(["not", "an", "object"]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required field: url");

    assert_eq!(extractor.info_calls(), 0);
}

#[tokio::test]
async fn extraction_failure_is_not_found() {
    let extractor = Arc::new(MockExtractor::failing());
    let app = app(extractor.clone());

    let (status, body) = send(&app, post_json("/api/download-links", json!({"url": VIDEO_URL}))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().starts_with("Failed to extract video information"));
    assert_eq!(extractor.info_calls(), 1);
}

#[tokio::test]
async fn health_survives_failures() {
    let app = app(Arc::new(MockExtractor::failing()));

    let _ = send(&app, post_json("/api/download-links", json!({"url": VIDEO_URL}))).await;
    let _ = send(&app, post_json("/api/download-links", json!({"url": ""}))).await;

    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "healthy"}));
}

#[tokio::test]
async fn unknown_paths_are_json_404s() {
    let app = app(Arc::new(MockExtractor::default()));

    let (status, body) = send(&app, get("/api/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"success": false, "error": "Endpoint not found"}));
}

#[tokio::test]
async fn index_lists_endpoints() {
    let app = app(Arc::new(MockExtractor::default()));

    let (status, body) = send(&app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "ytgrab");
    assert!(body["endpoints"]["POST /api/download-links"].is_string());
}

#[tokio::test]
async fn metadata_omits_formats() {
    let app = app(Arc::new(MockExtractor::default()));

    let (status, body) = send(&app, post_json("/api/metadata", json!({"url": VIDEO_URL}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["metadata"]["id"], "dQw4w9WgXcQ");
    assert_eq!(body["metadata"]["title"], "Never Gonna Give You Up");
    assert!(body["metadata"]["formats"]
        .as_array()
        .map(Vec::is_empty)
        .unwrap_or(true));
}

#[tokio::test]
async fn download_streams_attachment_and_cleans_up() {
    let extractor = Arc::new(MockExtractor::default());
    let app = app(extractor.clone());

    let response = app
        .oneshot(post_json("/api/download", json!({"url": VIDEO_URL, "quality": "audio"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"Never Gonna Give You Up.mp3\""
    );

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"media bytes");

    let request = extractor.downloads.lock().unwrap()[0].clone();
    assert_eq!(request.format, "bestaudio/best");
    assert!(request.extract_audio);
    assert!(!request.output_dir.exists());
}

#[tokio::test]
async fn download_failure_is_reported() {
    let app = app(Arc::new(MockExtractor::failing()));

    let (status, body) = send(&app, post_json("/api/download", json!({"url": VIDEO_URL}))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().starts_with("Download failed:"));
}
