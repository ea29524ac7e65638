//! HTTP API served by `ytgrab-api`

pub mod error;
pub mod handlers;
pub mod models;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::Settings;
use crate::extractor::FallbackChain;

pub use error::ApiError;

/// Shared read-only state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub chain: FallbackChain,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(chain: FallbackChain) -> Self {
        let settings = chain.settings().clone();
        Self { chain, settings }
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/api/download-links", post(handlers::download_links))
        .route("/api/metadata", post(handlers::metadata))
        .route("/api/download", post(handlers::download))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
