//! `yt-dlp` subprocess driver
//!
//! Metadata comes from `--dump-json`, direct URLs from `-g`, and downloads
//! report progress through a machine-readable `--progress-template` on stdout.

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::core::progress::{parse_progress_line, PROGRESS_TEMPLATE};
use crate::core::VideoInfo;
use crate::extractor::traits::{DownloadRequest, MediaExtractor, ProgressCallback, Route};
use crate::{GrabError, Result};

const COMMON_PATHS: &[&str] = &[
    "/opt/homebrew/bin/yt-dlp",
    "/usr/local/bin/yt-dlp",
    "/usr/bin/yt-dlp",
];

/// Locate the `yt-dlp` binary: explicit path, then `PATH`, then common locations
pub fn find_ytdlp(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        if is_executable(path) {
            return Some(path.to_path_buf());
        }
        warn!("YTDLP_PATH {} is not an executable file", path.display());
    }

    if let Ok(path) = which::which("yt-dlp") {
        return Some(path);
    }

    let home_local = std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".local/bin/yt-dlp"));
    COMMON_PATHS
        .iter()
        .map(|path| PathBuf::from(*path))
        .chain(home_local)
        .find(|path| is_executable(path))
}

/// Locate `ffmpeg` on `PATH`
pub fn find_ffmpeg() -> Option<PathBuf> {
    which::which("ffmpeg").ok()
}

fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::metadata(path)
            .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }

    #[cfg(not(unix))]
    {
        path.is_file()
    }
}

fn unavailable_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)(private video|video unavailable|not available|has been removed|members-only|sign in to confirm|confirm you.re not a bot|age-restricted|blocked it in your country|HTTP Error 40[34])",
        )
        .expect("valid regex")
    })
}

/// Map `yt-dlp` stderr onto the crate's upstream error variants
pub fn classify_error(stderr: &str) -> GrabError {
    let message = stderr
        .lines()
        .rev()
        .find(|line| line.trim_start().starts_with("ERROR:"))
        .or_else(|| stderr.lines().rev().find(|line| !line.trim().is_empty()))
        .unwrap_or("yt-dlp exited without output")
        .trim()
        .trim_start_matches("ERROR:")
        .trim()
        .to_string();

    if message.contains("Requested format is not available") {
        GrabError::FormatUnavailable(message)
    } else if (message.contains("ffmpeg") && message.contains("not installed"))
        || message.contains("ffmpeg not found")
    {
        GrabError::FfmpegNotFound
    } else if message.contains("Unsupported URL") || message.contains("is not a valid URL") {
        GrabError::InvalidUrl(message)
    } else if unavailable_pattern().is_match(&message) {
        GrabError::VideoUnavailable(message)
    } else {
        GrabError::ExtractionFailed(message)
    }
}

/// [`MediaExtractor`] backed by the `yt-dlp` executable
#[derive(Debug, Clone)]
pub struct YtDlpExtractor {
    binary: PathBuf,
    settings: Arc<Settings>,
}

impl YtDlpExtractor {
    /// Locate `yt-dlp` and build an extractor
    pub fn new(settings: Arc<Settings>) -> Result<Self> {
        let binary = find_ytdlp(settings.ytdlp_path.as_deref()).ok_or(GrabError::ExtractorNotFound)?;
        info!("Found yt-dlp at: {}", binary.display());
        Ok(Self { binary, settings })
    }

    /// Build an extractor around a known binary
    pub fn with_binary(binary: impl Into<PathBuf>, settings: Arc<Settings>) -> Self {
        Self {
            binary: binary.into(),
            settings,
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Arguments shared by every invocation
    pub fn common_args(&self, route: &Route) -> Vec<String> {
        let mut args = vec![
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--socket-timeout".to_string(),
            self.settings.socket_timeout.as_secs().max(1).to_string(),
            "--user-agent".to_string(),
            self.settings.user_agent.clone(),
        ];

        for (name, value) in self.settings.request_headers() {
            if name == "User-Agent" {
                continue;
            }
            args.push("--add-header".to_string());
            args.push(format!("{}:{}", name, value));
        }

        if let Some(cookies) = self.settings.cookie_path() {
            args.push("--cookies".to_string());
            args.push(cookies.to_string_lossy().into_owned());
        }

        if let Some(proxy) = route.proxy() {
            args.push("--proxy".to_string());
            args.push(proxy.to_string());
        }

        args
    }

    pub fn info_args(&self, url: &str, route: &Route) -> Vec<String> {
        let mut args = self.common_args(route);
        args.extend(["--dump-json".to_string(), "--no-download".to_string()]);
        args.push(url.to_string());
        args
    }

    pub fn direct_url_args(&self, url: &str, format_id: &str, route: &Route) -> Vec<String> {
        let mut args = self.common_args(route);
        args.extend(["-f".to_string(), format_id.to_string(), "-g".to_string()]);
        args.push(url.to_string());
        args
    }

    pub fn download_args(&self, request: &DownloadRequest, route: &Route) -> Vec<String> {
        let mut args = self.common_args(route);
        args.extend([
            "-f".to_string(),
            request.format.clone(),
            "-P".to_string(),
            request.output_dir.to_string_lossy().into_owned(),
            "-o".to_string(),
            "%(title)s.%(ext)s".to_string(),
            "--newline".to_string(),
            "--progress".to_string(),
            "--progress-template".to_string(),
            PROGRESS_TEMPLATE.to_string(),
            "--print".to_string(),
            "after_move:filepath".to_string(),
        ]);

        if request.extract_audio {
            args.extend([
                "-x".to_string(),
                "--audio-format".to_string(),
                "mp3".to_string(),
                "--audio-quality".to_string(),
                "192K".to_string(),
            ]);
        } else if request.format.contains('+') {
            args.extend(["--merge-output-format".to_string(), "mp4".to_string()]);
        }

        args.push(request.url.clone());
        args
    }

    fn command(&self, args: &[String]) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    fn spawn_error(&self, e: std::io::Error) -> GrabError {
        if e.kind() == std::io::ErrorKind::NotFound {
            GrabError::ExtractorNotFound
        } else {
            GrabError::Io(e)
        }
    }

    async fn run(&self, args: &[String]) -> Result<Output> {
        debug!("Running {} {:?}", self.binary.display(), args);
        let output = self
            .command(args)
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!("yt-dlp failed: {}", stderr.trim());
            return Err(classify_error(&stderr));
        }
        Ok(output)
    }
}

#[async_trait]
impl MediaExtractor for YtDlpExtractor {
    fn id(&self) -> &'static str {
        "yt-dlp"
    }

    async fn extract_info(&self, url: &str, route: &Route) -> Result<VideoInfo> {
        debug!("Extracting video info for {} via {}", url, route);
        let output = self.run(&self.info_args(url, route)).await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let json = stdout
            .lines()
            .find(|line| line.trim_start().starts_with('{'))
            .ok_or_else(|| GrabError::ExtractionFailed("yt-dlp produced no metadata".to_string()))?;

        let info: VideoInfo = serde_json::from_str(json)?;
        debug!("Extracted {} formats for {}", info.formats.len(), info.id);
        Ok(info)
    }

    async fn get_direct_url(&self, url: &str, format_id: &str, route: &Route) -> Result<String> {
        debug!("Resolving direct URL for format {} of {}", format_id, url);
        let output = self.run(&self.direct_url_args(url, format_id, route)).await?;

        String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
            .ok_or_else(|| GrabError::FormatUnavailable(format_id.to_string()))
    }

    async fn download(
        &self,
        request: &DownloadRequest,
        route: &Route,
        progress: Option<ProgressCallback>,
    ) -> Result<PathBuf> {
        if request.extract_audio && find_ffmpeg().is_none() {
            return Err(GrabError::FfmpegNotFound);
        }

        let args = self.download_args(request, route);
        debug!("Running {} {:?}", self.binary.display(), args);
        let mut child = self.command(&args).spawn().map_err(|e| self.spawn_error(e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| GrabError::DownloadFailed("yt-dlp stdout unavailable".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| GrabError::DownloadFailed("yt-dlp stderr unavailable".to_string()))?;

        let stdout_reader = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            let mut final_path = None;
            while let Ok(Some(line)) = lines.next_line().await {
                if let Some(update) = parse_progress_line(&line) {
                    if let Some(callback) = &progress {
                        callback(update);
                    }
                } else if !line.trim().is_empty() {
                    final_path = Some(PathBuf::from(line.trim()));
                }
            }
            final_path
        });

        let stderr_reader = tokio::spawn(async move {
            let mut buf = String::new();
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                buf.push_str(&line);
                buf.push('\n');
            }
            buf
        });

        let status = child.wait().await?;
        let final_path = stdout_reader.await.unwrap_or_default();
        let stderr = stderr_reader.await.unwrap_or_default();

        if !status.success() {
            error!("yt-dlp download failed: {}", stderr.trim());
            return Err(classify_error(&stderr));
        }

        match final_path {
            Some(path) if path.exists() => {
                info!("Download completed: {}", path.display());
                Ok(path)
            }
            Some(path) => Err(GrabError::DownloadFailed(format!(
                "reported file {} does not exist",
                path.display()
            ))),
            None => Err(GrabError::DownloadFailed(
                "yt-dlp did not report the output file".to_string(),
            )),
        }
    }
}
