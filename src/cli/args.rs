//! Command line argument parsing

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::Settings;
use crate::core::Quality;

/// ytgrab - download videos or inspect their formats through yt-dlp
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Video URL
    pub url: String,

    /// Output directory
    #[arg(short, long, value_name = "DIR", default_value = "downloads")]
    pub output: PathBuf,

    /// Quality preference
    #[arg(short, long, value_enum, default_value_t = Quality::Best)]
    pub quality: Quality,

    /// Specific format ID to download (overrides --quality)
    #[arg(short, long, value_name = "FORMAT_ID")]
    pub format: Option<String>,

    /// List available formats without downloading
    #[arg(short, long)]
    pub list: bool,

    /// Show video information without downloading
    #[arg(short, long)]
    pub info: bool,

    /// Print the direct media URL and exit (no download)
    #[arg(short = 'g', long)]
    pub get_url: bool,

    /// Disable progress output
    #[arg(long)]
    pub no_progress: bool,

    /// Socket timeout handed to yt-dlp (e.g., 15s, 1m)
    #[arg(long, value_name = "DURATION")]
    pub timeout: Option<humantime::Duration>,

    /// Proxy URL (http/https/socks), overrides YTDL_PROXY
    #[arg(long, value_name = "URL")]
    pub proxy: Option<String>,

    /// Netscape cookie file, overrides YTDL_COOKIES
    #[arg(long, value_name = "PATH")]
    pub cookies: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet output (only errors)
    #[arg(long)]
    pub quiet: bool,
}

impl Args {
    /// Get socket timeout as Duration
    pub fn timeout_duration(&self) -> Option<Duration> {
        self.timeout.map(Into::into)
    }

    /// Whether only metadata is requested
    pub fn is_inspection(&self) -> bool {
        self.info || self.list || self.get_url
    }

    pub fn show_progress(&self) -> bool {
        !self.no_progress && !self.quiet
    }

    /// Layer the command line overrides on top of environment settings
    pub fn apply_to(&self, mut settings: Settings) -> Settings {
        if let Some(proxy) = &self.proxy {
            settings = settings.with_proxy(proxy);
        }
        if let Some(cookies) = &self.cookies {
            settings = settings.with_cookie_file(cookies);
        }
        if let Some(timeout) = self.timeout_duration() {
            settings = settings.with_socket_timeout(timeout);
        }
        settings
    }

    /// Get output verbosity level
    pub fn verbosity_level(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }
}

/// Output verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbosityLevel {
    /// Quiet (only errors)
    Quiet,
    /// Normal
    Normal,
    /// Verbose (debug info)
    Verbose,
}

impl VerbosityLevel {
    /// Default tracing filter when `RUST_LOG` is unset
    pub fn log_filter(&self) -> &'static str {
        match self {
            VerbosityLevel::Quiet => "error",
            VerbosityLevel::Normal => "warn",
            VerbosityLevel::Verbose => "debug",
        }
    }
}
