//! Main entry point for the ytgrab CLI

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use ytgrab::cli::{self, Args, OutputFormatter, VerbosityLevel};
use ytgrab::extractor::YtDlpExtractor;
use ytgrab::{Route, Settings};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbosity_level());

    let formatter = Arc::new(OutputFormatter::new(args.verbosity_level()));
    match run(&args, formatter.clone()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            formatter.error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args, formatter: Arc<OutputFormatter>) -> anyhow::Result<()> {
    let settings = Settings::from_env().context("reading configuration")?;
    let settings = Arc::new(args.apply_to(settings));

    let extractor = Arc::new(YtDlpExtractor::new(settings.clone())?);
    info!("Using yt-dlp at {}", extractor.binary().display());

    // No retries here beyond what yt-dlp does itself
    let route = settings.routes().into_iter().next().unwrap_or(Route::Direct);

    cli::run(args, extractor, route, formatter).await?;
    Ok(())
}

/// Initialize logging system
fn init_logging(verbosity: VerbosityLevel) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(verbosity.log_filter()));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .init();
}
