//! Progress tracking for downloads performed by the extraction library

use std::time::Duration;

/// Prefix marking the progress lines requested through `--progress-template`
pub const PROGRESS_PREFIX: &str = "ytgrab-progress:";

/// Template handed to `yt-dlp --progress-template`; one `|`-separated record per line
pub const PROGRESS_TEMPLATE: &str = "download:ytgrab-progress:%(progress.downloaded_bytes)s|%(progress.total_bytes)s|%(progress.total_bytes_estimate)s|%(progress.speed)s|%(progress.eta)s";

/// Progress information for a download
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Progress {
    /// Number of bytes downloaded
    pub downloaded_size: u64,
    /// Total size of the file in bytes, exact or estimated
    pub total_size: Option<u64>,
    /// Current download speed in bytes per second
    pub speed: Option<f64>,
    /// Estimated time remaining
    pub eta: Option<Duration>,
}

impl Progress {
    /// Download progress as a percentage (0.0 to 100.0)
    pub fn percent(&self) -> f64 {
        match self.total_size {
            Some(total) if total > 0 => {
                (self.downloaded_size as f64 / total as f64 * 100.0).min(100.0)
            }
            _ => 0.0,
        }
    }

    /// Check if download is complete
    pub fn is_complete(&self) -> bool {
        matches!(self.total_size, Some(total) if total > 0 && self.downloaded_size >= total)
    }

    /// Get human-readable speed string
    pub fn speed_string(&self) -> String {
        match self.speed {
            Some(speed) => format_bytes_per_second(speed),
            None => "Unknown".to_string(),
        }
    }

    /// Get human-readable ETA string
    pub fn eta_string(&self) -> String {
        match self.eta {
            Some(eta) => format_duration(eta),
            None => "Unknown".to_string(),
        }
    }
}

fn parse_number(field: &str) -> Option<f64> {
    let field = field.trim();
    if field.is_empty() || field == "NA" || field == "None" {
        return None;
    }
    field.parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0)
}

/// Parse one progress record emitted with [`PROGRESS_TEMPLATE`]
///
/// Returns `None` for any other output line.
pub fn parse_progress_line(line: &str) -> Option<Progress> {
    let record = line.trim().strip_prefix(PROGRESS_PREFIX)?;
    let fields: Vec<&str> = record.split('|').collect();
    if fields.len() != 5 {
        return None;
    }

    let downloaded_size = parse_number(fields[0])? as u64;
    let total_size = parse_number(fields[1])
        .or_else(|| parse_number(fields[2]))
        .map(|v| v as u64);

    Some(Progress {
        downloaded_size,
        total_size,
        speed: parse_number(fields[3]),
        eta: parse_number(fields[4]).map(|s| Duration::from_secs(s as u64)),
    })
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let bytes_f64 = bytes as f64;
    let exp = (bytes_f64.ln() / THRESHOLD.ln()).floor() as usize;
    let exp = exp.min(UNITS.len() - 1);

    let value = bytes_f64 / THRESHOLD.powi(exp as i32);

    if exp == 0 {
        format!("{} {}", bytes, UNITS[exp])
    } else {
        format!("{:.1} {}", value, UNITS[exp])
    }
}

/// Format bytes per second as human-readable string
pub fn format_bytes_per_second(bytes_per_second: f64) -> String {
    format!("{}/s", format_bytes(bytes_per_second as u64))
}

/// Format duration as human-readable string
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    if total_seconds < 60 {
        format!("{}s", total_seconds)
    } else if total_seconds < 3600 {
        let minutes = total_seconds / 60;
        let seconds = total_seconds % 60;
        if seconds == 0 {
            format!("{}m", minutes)
        } else {
            format!("{}m {}s", minutes, seconds)
        }
    } else {
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        if minutes == 0 {
            format!("{}h", hours)
        } else {
            format!("{}h {}m", hours, minutes)
        }
    }
}

/// Format a duration as a clock (`3:32`, `1:01:05`)
pub fn format_clock(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_progress_line() {
        let progress =
            parse_progress_line("ytgrab-progress:1048576|4194304|NA|524288.5|6").unwrap();
        assert_eq!(progress.downloaded_size, 1_048_576);
        assert_eq!(progress.total_size, Some(4_194_304));
        assert_eq!(progress.percent(), 25.0);
        assert_eq!(progress.eta, Some(Duration::from_secs(6)));
        assert_eq!(progress.speed_string(), "512.0 KB/s");
        assert!(!progress.is_complete());
    }

    #[test]
    fn test_parse_progress_line_estimated_total() {
        let progress = parse_progress_line("ytgrab-progress:100|NA|200.0|NA|NA").unwrap();
        assert_eq!(progress.total_size, Some(200));
        assert_eq!(progress.percent(), 50.0);
        assert_eq!(progress.speed, None);
        assert_eq!(progress.eta_string(), "Unknown");
    }

    #[test]
    fn test_parse_progress_line_ignores_other_output() {
        assert!(parse_progress_line("[download] Destination: x.mp4").is_none());
        assert!(parse_progress_line("").is_none());
        assert!(parse_progress_line("ytgrab-progress:1|2").is_none());
        assert!(parse_progress_line("ytgrab-progress:NA|NA|NA|NA|NA").is_none());
    }

    #[test]
    fn test_progress_complete() {
        let progress = Progress {
            downloaded_size: 1000,
            total_size: Some(1000),
            ..Default::default()
        };
        assert!(progress.is_complete());
        assert_eq!(progress.percent(), 100.0);
        assert!(!Progress::default().is_complete());
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1048576), "1.0 MB");
        assert_eq!(format_bytes(1073741824), "1.0 GB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(60)), "1m");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_secs(3600)), "1h");
        assert_eq!(format_duration(Duration::from_secs(3660)), "1h 1m");
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0), "0:00");
        assert_eq!(format_clock(212), "3:32");
        assert_eq!(format_clock(3665), "1:01:05");
    }
}
