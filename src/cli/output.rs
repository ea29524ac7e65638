//! Output formatting and progress display

use crate::cli::args::VerbosityLevel;
use crate::core::progress::{format_clock, format_duration, Progress};
use crate::core::{Format, VideoInfo};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

/// Output formatter for ytgrab
pub struct OutputFormatter {
    verbosity: VerbosityLevel,
    progress_bar: OnceLock<ProgressBar>,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            progress_bar: OnceLock::new(),
        }
    }

    fn create_progress_bar(&self, total_size: Option<u64>) -> ProgressBar {
        if self.verbosity == VerbosityLevel::Quiet {
            return ProgressBar::hidden();
        }

        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta}) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");

        let progress_bar = ProgressBar::new(total_size.unwrap_or(0));
        progress_bar.set_style(style);
        progress_bar.set_message("Downloading...");
        progress_bar
    }

    /// Update progress bar, creating it on the first record
    pub fn update_progress(&self, progress: &Progress) {
        let progress_bar = self
            .progress_bar
            .get_or_init(|| self.create_progress_bar(progress.total_size));

        if let Some(total) = progress.total_size {
            progress_bar.set_length(total);
        }
        progress_bar.set_position(progress.downloaded_size);

        if progress.speed.is_some() {
            progress_bar.set_message(progress.speed_string());
        }
    }

    /// Finish progress bar
    pub fn finish_progress(&self, message: &str) {
        if let Some(progress_bar) = self.progress_bar.get() {
            progress_bar.finish_with_message(message.to_string());
        }
    }

    /// Print info message
    pub fn info(&self, message: &str) {
        if self.verbosity != VerbosityLevel::Quiet {
            println!("ℹ️  {}", message);
        }
    }

    /// Print success message
    pub fn success(&self, message: &str) {
        if self.verbosity != VerbosityLevel::Quiet {
            println!("✅ {}", message);
        }
    }

    /// Print error message
    pub fn error(&self, message: &str) {
        eprintln!("❌ {} {}", "Error:".red().bold(), message);
    }

    /// Print the metadata block
    pub fn print_video_info(&self, info: &VideoInfo) {
        println!("{}", render_info(info));
    }

    /// Print the format table
    pub fn print_formats(&self, formats: &[Format]) {
        println!("{}", render_format_table(formats));
    }

    /// Print download start message
    pub fn print_download_start(&self, url: &str, output_dir: &Path) {
        self.info(&format!("Starting download: {}", url));
        self.info(&format!("Output: {}", output_dir.display()));
    }

    /// Print download complete message
    pub fn print_download_complete(&self, output_path: &Path, duration: Duration) {
        self.success(&format!(
            "Download completed in {}: {}",
            format_duration(duration),
            output_path.display()
        ));
    }
}

/// `1234567` → `1,234,567`
fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

fn or_unknown(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or("Unknown")
}

/// Metadata block printed by `-i`
pub fn render_info(info: &VideoInfo) -> String {
    let duration = info
        .duration_secs()
        .map(|secs| format!("{} ({} seconds)", format_clock(secs), secs))
        .unwrap_or_else(|| "Unknown".to_string());
    let views = info
        .view_count
        .map(group_thousands)
        .unwrap_or_else(|| "Unknown".to_string());

    [
        format!("{} {}", "Title:".bold(), or_unknown(Some(info.title.as_str()))),
        format!("{} {}", "Uploader:".bold(), or_unknown(info.uploader.as_deref())),
        format!("{} {}", "Duration:".bold(), duration),
        format!("{} {}", "Views:".bold(), views),
        format!("{} {}", "Upload Date:".bold(), or_unknown(info.upload_date.as_deref())),
    ]
    .join("\n")
}

/// Format table printed by `-l`
pub fn render_format_table(formats: &[Format]) -> String {
    let mut lines = vec![format!("{}", "Available Formats:".bold())];
    if formats.is_empty() {
        lines.push("  (none)".to_string());
    }
    for format in formats {
        lines.push(format!(
            "  ID: {:<6} | {:<10} | {:<4} | {}",
            format.format_id,
            format.resolution_string(),
            format.ext,
            format.size_string()
        ));
    }
    lines.join("\n")
}
