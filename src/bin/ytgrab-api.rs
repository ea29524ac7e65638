//! HTTP API server entry point

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use ytgrab::api::{self, AppState};
use ytgrab::extractor::YtDlpExtractor;
use ytgrab::{FallbackChain, GrabError, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let settings = Arc::new(Settings::from_env().context("reading configuration")?);

    let primary = match YtDlpExtractor::new(settings.clone()) {
        Ok(extractor) => {
            info!("Using yt-dlp at {}", extractor.binary().display());
            extractor
        }
        Err(GrabError::ExtractorNotFound) => {
            warn!("yt-dlp not found; requests will fall back to mirrors");
            YtDlpExtractor::with_binary("yt-dlp", settings.clone())
        }
        Err(e) => return Err(e.into()),
    };

    let routes = settings.routes();
    info!(
        "Routes: {}",
        routes.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
    );
    info!(
        "Mirrors: {} (cookies: {})",
        if settings.mirrors.enabled { "enabled" } else { "disabled" },
        settings
            .cookie_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "none".to_string())
    );

    let chain = FallbackChain::new(Arc::new(primary), settings.clone());
    let app = api::router(AppState::new(chain));

    let listener = tokio::net::TcpListener::bind(&settings.bind_address)
        .await
        .with_context(|| format!("binding {}", settings.bind_address))?;
    info!("ytgrab API listening on http://{}", settings.bind_address);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize logging system
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .init();
}
