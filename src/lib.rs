//! # ytgrab - video download links on top of yt-dlp
//!
//! Resolves a YouTube URL into metadata and direct media links, and downloads
//! single videos through the `yt-dlp` executable.
//!
//! ## Features
//!
//! - Direct, proxied and mirror (Invidious / Piped) extraction with fallback
//! - Best-muxed and audio-only link selection with ready-made curl/wget lines
//! - HTTP API (`ytgrab-api`) and a CLI (`ytgrab`)
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ytgrab::{FallbackChain, Quality, Settings, DownloadLinkResponse};
//! use ytgrab::extractor::YtDlpExtractor;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Arc::new(Settings::from_env()?);
//!     let primary = Arc::new(YtDlpExtractor::new(settings.clone())?);
//!     let chain = FallbackChain::new(primary, settings.clone());
//!
//!     let extraction = chain.extract("https://youtu.be/dQw4w9WgXcQ").await?;
//!     let links = DownloadLinkResponse::build(
//!         &extraction.info,
//!         extraction.source,
//!         Quality::Best,
//!         &settings.request_headers(),
//!         settings.max_links,
//!     )?;
//!     println!("{} links for {}", links.download_links.len(), links.title);
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod extractor;
pub mod utils;

// Re-export main types
pub use config::Settings;
pub use core::{DownloadLinkResponse, Downloader, Format, Progress, Quality, VideoInfo};
pub use error::{ErrorKind, GrabError};
pub use extractor::{FallbackChain, MediaExtractor, Route};

/// Result type alias for ytgrab operations
pub type Result<T> = std::result::Result<T, GrabError>;
