//! Command line interface

pub mod args;
pub mod output;

pub use args::{Args, VerbosityLevel};
pub use output::OutputFormatter;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::core::Downloader;
use crate::extractor::{MediaExtractor, Route};
use crate::Result;

/// What a CLI invocation produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// `-i` / `-l` / `-g`: metadata printed, nothing written
    Inspected,
    /// File written by the library
    Downloaded(PathBuf),
}

/// Build the downloader described by `args`
pub fn build_downloader(
    args: &Args,
    extractor: Arc<dyn MediaExtractor>,
    route: Route,
    formatter: Arc<OutputFormatter>,
) -> Downloader {
    let mut downloader = Downloader::new(extractor, route)
        .with_quality(args.quality)
        .with_format_id(args.format.clone())
        .with_output_path(&args.output);

    if args.show_progress() {
        downloader = downloader.with_progress(move |progress| formatter.update_progress(&progress));
    }
    downloader
}

/// Run one CLI invocation against `extractor`
pub async fn run(
    args: &Args,
    extractor: Arc<dyn MediaExtractor>,
    route: Route,
    formatter: Arc<OutputFormatter>,
) -> Result<Outcome> {
    let downloader = build_downloader(args, extractor, route, formatter.clone());

    if args.get_url {
        debug!("Print URL mode enabled");
        println!("{}", downloader.resolve_url(&args.url).await?);
        return Ok(Outcome::Inspected);
    }

    if args.is_inspection() {
        debug!("Inspection mode (info: {}, list: {})", args.info, args.list);
        if args.list {
            let (info, formats) = downloader.list_formats(&args.url).await?;
            if args.info {
                formatter.print_video_info(&info);
                println!();
            }
            formatter.print_formats(&formats);
        } else {
            let info = downloader.video_info(&args.url).await?;
            formatter.print_video_info(&info);
        }
        return Ok(Outcome::Inspected);
    }

    let start_time = Instant::now();
    formatter.print_download_start(&args.url, &args.output);
    info!("Starting download for URL: {}", args.url);

    let path = downloader.download(&args.url).await?;
    formatter.finish_progress("Done");
    formatter.print_download_complete(&path, start_time.elapsed());
    Ok(Outcome::Downloaded(path))
}
