//! Invidious and Piped mirror metadata providers
//!
//! Both expose a public JSON API with direct stream URLs. Responses are mapped
//! onto [`VideoInfo`] so the link selection works the same way as for the
//! primary extractor. Instances are tried in random order, each one on every
//! route, until one answers. Downloads stream the selected URL to disk.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use futures_util::StreamExt;
use rand::seq::SliceRandom;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::core::{select_formats, Format, Progress, Quality, VideoInfo};
use crate::extractor::traits::{DownloadRequest, MediaExtractor, ProgressCallback, Route};
use crate::extractor::ytdlp::find_ffmpeg;
use crate::utils::mime;
use crate::utils::to_safe_filename;
use crate::utils::url::{extract_video_id, watch_url};
use crate::{GrabError, Result};

const INVIDIOUS_TIMEOUT: Duration = Duration::from_secs(15);
const PIPED_TIMEOUT: Duration = Duration::from_secs(25);
const STREAM_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Accept numbers that mirrors sometimes encode as strings
fn lenient_u64<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_u64().or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|f| *f >= 0.0).map(|f| f as u64),
        _ => None,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn non_zero(value: Option<u64>) -> Option<u64> {
    value.filter(|v| *v > 0)
}

/// Unix timestamp (seconds) as `YYYYMMDD`
pub fn timestamp_to_date(timestamp: i64) -> Option<String> {
    DateTime::from_timestamp(timestamp, 0).map(|dt| dt.format("%Y%m%d").to_string())
}

/// `YYYY-MM-DD`, `YYYY/MM/DD`, ISO datetimes or `YYYYMMDD` as `YYYYMMDD`
pub fn normalize_date(value: &str) -> Option<String> {
    let clean = value.trim();
    if clean.len() == 8 && clean.chars().all(|c| c.is_ascii_digit()) {
        return Some(clean.to_string());
    }
    let date_part = clean.split('T').next().unwrap_or_default().replace('/', "-");
    NaiveDate::parse_from_str(&date_part, "%Y-%m-%d")
        .ok()
        .map(|d| d.format("%Y%m%d").to_string())
}

/// Height from labels such as `720p`, `1080p60` or `2160p HDR`
fn height_from_label(label: &str) -> Option<u32> {
    let digits: String = label.chars().take_while(|c| c.is_ascii_digit()).collect();
    if label[digits.len()..].starts_with('p') {
        digits.parse().ok()
    } else {
        None
    }
}

fn parse_size(size: &str) -> Option<(u32, u32)> {
    let (w, h) = size.split_once('x')?;
    Some((w.trim().parse().ok()?, h.trim().parse().ok()?))
}

/// Parsed mirror response and where it came from
struct Fetched<T> {
    instance: String,
    route: Route,
    body: T,
}

/// Metadata found on a mirror, with the instance and route that served it
struct MirrorHit {
    info: VideoInfo,
    instance: String,
    route: Route,
}

/// HTTP plumbing shared by both mirror kinds
#[derive(Debug, Clone)]
struct MirrorClient {
    instances: Vec<String>,
    routes: Vec<Route>,
    user_agent: String,
    verify_tls: bool,
    timeout: Duration,
    shuffle: bool,
}

impl MirrorClient {
    fn new(instances: &[String], settings: &Settings, timeout: Duration) -> Self {
        Self {
            instances: instances
                .iter()
                .map(|i| i.trim().trim_end_matches('/').to_string())
                .filter(|i| !i.is_empty())
                .collect(),
            routes: settings.routes(),
            user_agent: settings.user_agent.clone(),
            verify_tls: settings.mirrors.verify_tls,
            timeout,
            shuffle: true,
        }
    }

    fn builder(&self, route: &Route) -> Result<reqwest::ClientBuilder> {
        let builder = reqwest::Client::builder()
            .user_agent(self.user_agent.clone())
            .danger_accept_invalid_certs(!self.verify_tls);

        Ok(match route.proxy() {
            Some(proxy) => builder.proxy(reqwest::Proxy::all(proxy)?),
            None => builder.no_proxy(),
        })
    }

    /// Client for JSON lookups, bounded by the mirror timeout
    fn http_client(&self, route: &Route) -> Result<reqwest::Client> {
        Ok(self.builder(route)?.timeout(self.timeout).build()?)
    }

    /// Client for media bodies; only the connect phase is bounded
    fn stream_client(&self, route: &Route) -> Result<reqwest::Client> {
        Ok(self
            .builder(route)?
            .connect_timeout(STREAM_CONNECT_TIMEOUT)
            .build()?)
    }

    /// `preferred` first, then the configured routes not yet listed
    fn candidate_routes(&self, preferred: &Route) -> Vec<Route> {
        let mut routes = vec![preferred.clone()];
        for route in &self.routes {
            if !routes.contains(route) {
                routes.push(route.clone());
            }
        }
        routes
    }

    fn ordered_instances(&self) -> Vec<String> {
        let mut instances = self.instances.clone();
        if self.shuffle {
            instances.shuffle(&mut rand::thread_rng());
        }
        instances
    }

    /// GET `{instance}{path}` on each instance, over each route, until one
    /// returns parseable JSON
    async fn fetch<T: DeserializeOwned>(
        &self,
        kind: &str,
        path: &str,
        preferred: &Route,
    ) -> Result<Fetched<T>> {
        if self.instances.is_empty() {
            return Err(GrabError::Mirror(format!("no {} instances configured", kind)));
        }

        let mut last_error = String::new();
        let mut clients = Vec::new();
        for route in self.candidate_routes(preferred) {
            match self.http_client(&route) {
                Ok(client) => clients.push((route, client)),
                Err(e) => {
                    warn!("Skipping {} for {}: {}", route, kind, e);
                    last_error = format!("{}: {}", route, e);
                }
            }
        }

        for instance in self.ordered_instances() {
            let url = format!("{}{}", instance, path);
            for (route, client) in &clients {
                debug!("Querying {} mirror {} via {}", kind, url, route);

                let response = match client
                    .get(&url)
                    .header(reqwest::header::ACCEPT, "application/json")
                    .send()
                    .await
                {
                    Ok(response) => response,
                    Err(e) => {
                        warn!("{} {} failed via {}: {}", kind, instance, route, e);
                        last_error = format!("{}: {}", instance, e);
                        continue;
                    }
                };

                let status = response.status();
                if !status.is_success() {
                    warn!("{} {} returned status {}", kind, instance, status);
                    last_error = format!("{} returned status {}", instance, status);
                    continue;
                }

                match response.json::<T>().await {
                    Ok(body) => {
                        info!("{} fallback succeeded via {}", kind, instance);
                        return Ok(Fetched {
                            instance,
                            route: route.clone(),
                            body,
                        });
                    }
                    Err(e) => {
                        warn!("{} {} returned unreadable JSON: {}", kind, instance, e);
                        last_error = format!("{}: {}", instance, e);
                    }
                }
            }
        }

        Err(GrabError::Mirror(format!("all {} instances failed, last: {}", kind, last_error)))
    }

    /// Pick a stream from mirror metadata and write it into `request.output_dir`
    async fn download(
        &self,
        hit: MirrorHit,
        request: &DownloadRequest,
        progress: Option<ProgressCallback>,
    ) -> Result<PathBuf> {
        let format = pick_stream(&hit.info, request).ok_or(GrabError::NoFormatFound)?;
        let url = format.direct_url().ok_or(GrabError::NoFormatFound)?;
        let ext = if format.ext.is_empty() { "mp4" } else { format.ext.as_str() };

        tokio::fs::create_dir_all(&request.output_dir).await?;
        let target = request
            .output_dir
            .join(to_safe_filename(&hit.info.title, ext));
        info!(
            "Streaming format {} from {} to {}",
            format.format_id,
            hit.instance,
            target.display()
        );

        self.stream_to_file(url, &hit.instance, &target, &hit.route, progress)
            .await?;

        if request.extract_audio {
            Ok(convert_to_mp3(&target).await)
        } else {
            Ok(target)
        }
    }

    async fn stream_to_file(
        &self,
        url: &str,
        referer: &str,
        target: &Path,
        route: &Route,
        progress: Option<ProgressCallback>,
    ) -> Result<()> {
        let response = self
            .stream_client(route)?
            .get(url)
            .header(reqwest::header::REFERER, referer)
            .send()
            .await?
            .error_for_status()?;

        let mut file = tokio::fs::File::create(target).await?;
        match write_body(response, &mut file, progress.as_ref()).await {
            Ok(written) => {
                debug!("Wrote {} bytes to {}", written, target.display());
                Ok(())
            }
            Err(e) => {
                drop(file);
                if let Err(remove) = tokio::fs::remove_file(target).await {
                    debug!("Could not remove partial {}: {}", target.display(), remove);
                }
                Err(GrabError::DownloadFailed(format!("mirror stream: {}", e)))
            }
        }
    }
}

/// Copy a response body into `file`, reporting progress per chunk
async fn write_body(
    response: reqwest::Response,
    file: &mut tokio::fs::File,
    progress: Option<&ProgressCallback>,
) -> Result<u64> {
    let total_size = response.content_length();
    let mut stream = response.bytes_stream();
    let mut downloaded_size = 0u64;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result?;
        file.write_all(&chunk).await?;
        downloaded_size += chunk.len() as u64;

        if let Some(callback) = progress {
            callback(Progress {
                downloaded_size,
                total_size,
                ..Default::default()
            });
        }
    }

    file.flush().await?;
    Ok(downloaded_size)
}

/// Whether a download request asks for audio rather than muxed video
fn wants_audio(request: &DownloadRequest) -> bool {
    request.extract_audio || request.format.starts_with("bestaudio")
}

/// The explicitly requested format, else the top pick for the request's quality
fn pick_stream<'a>(info: &'a VideoInfo, request: &DownloadRequest) -> Option<&'a Format> {
    let explicit = info
        .formats
        .iter()
        .find(|f| f.format_id == request.format && f.direct_url().is_some());
    if explicit.is_some() {
        return explicit;
    }

    let quality = if wants_audio(request) { Quality::Audio } else { Quality::Best };
    select_formats(info, quality, 1).into_iter().next()
}

/// Convert an audio stream to 192k mp3 with ffmpeg
///
/// Keeps the original file when ffmpeg is missing or the conversion fails.
async fn convert_to_mp3(source: &Path) -> PathBuf {
    let Some(ffmpeg) = find_ffmpeg() else {
        warn!("ffmpeg not available, keeping {}", source.display());
        return source.to_path_buf();
    };

    let target = source.with_extension("mp3");
    if target == source {
        return target;
    }

    let output = Command::new(&ffmpeg)
        .arg("-y")
        .arg("-i")
        .arg(source)
        .args(["-vn", "-ar", "44100", "-ac", "2", "-b:a", "192k"])
        .arg(&target)
        .output()
        .await;

    match output {
        Ok(out) if out.status.success() && target.exists() => {
            if let Err(e) = tokio::fs::remove_file(source).await {
                debug!("Could not remove {}: {}", source.display(), e);
            }
            target
        }
        Ok(out) => {
            let stderr = String::from_utf8_lossy(&out.stderr);
            warn!(
                "ffmpeg conversion failed ({}): {}",
                out.status,
                stderr.chars().take(400).collect::<String>()
            );
            source.to_path_buf()
        }
        Err(e) => {
            warn!("Could not run ffmpeg: {}", e);
            source.to_path_buf()
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InvidiousVideo {
    #[serde(default)]
    video_id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    length_seconds: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    view_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    like_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    published: Option<u64>,
    #[serde(default)]
    video_thumbnails: Vec<InvidiousThumbnail>,
    #[serde(default)]
    format_streams: Vec<InvidiousStream>,
    #[serde(default)]
    adaptive_formats: Vec<InvidiousStream>,
}

#[derive(Debug, Deserialize)]
struct InvidiousThumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InvidiousStream {
    #[serde(default)]
    url: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    itag: Option<String>,
    #[serde(rename = "type", default)]
    mime_type: Option<String>,
    #[serde(default)]
    quality_label: Option<String>,
    #[serde(default)]
    container: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    bitrate: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    clen: Option<u64>,
    #[serde(default)]
    size: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    fps: Option<u64>,
}

impl InvidiousStream {
    fn into_format(self, progressive: bool) -> Format {
        let mime_type = self.mime_type.unwrap_or_default();
        let codecs = mime::codecs(&mime_type);
        let audio_codec = codecs.iter().find(|c| mime::is_audio_codec(c)).cloned();
        let video_codec = codecs.iter().find(|c| !mime::is_audio_codec(c)).cloned();

        let (vcodec, acodec) = if mime::is_audio_mime(&mime_type) {
            (Some("none".to_string()), audio_codec.or_else(|| codecs.first().cloned()))
        } else if progressive {
            (video_codec, audio_codec)
        } else {
            (video_codec, Some("none".to_string()))
        };

        let (width, height) = match self.size.as_deref().and_then(parse_size) {
            Some((w, h)) => (Some(w), Some(h)),
            None => (None, self.quality_label.as_deref().and_then(height_from_label)),
        };

        let kbps = self.bitrate.map(|b| b as f64 / 1000.0);
        let ext = match self.container.filter(|c| !c.is_empty()) {
            Some(container) if mime::is_audio_mime(&mime_type) && container == "mp4" => "m4a".to_string(),
            Some(container) => container,
            None => mime::ext_from_mime(&mime_type).to_string(),
        };

        Format {
            format_id: self.itag.unwrap_or_default(),
            ext,
            vcodec,
            acodec,
            width,
            height,
            fps: self.fps.map(|f| f as f64),
            abr: if mime::is_audio_mime(&mime_type) { kbps } else { None },
            tbr: kbps,
            filesize: non_zero(self.clen),
            format_note: self.quality_label,
            url: self.url,
            ..Default::default()
        }
    }
}

fn map_invidious(data: InvidiousVideo, video_id: &str, instance: &str) -> VideoInfo {
    let id = data.video_id.unwrap_or_else(|| video_id.to_string());
    let thumbnail = data.video_thumbnails.last().map(|t| {
        if t.url.starts_with('/') {
            format!("{}{}", instance, t.url)
        } else {
            t.url.clone()
        }
    });

    let formats = data
        .format_streams
        .into_iter()
        .map(|s| s.into_format(true))
        .chain(data.adaptive_formats.into_iter().map(|s| s.into_format(false)))
        .collect();

    VideoInfo {
        webpage_url: Some(watch_url(&id)),
        id,
        title: data.title.unwrap_or_default(),
        uploader: data.author,
        duration: data.length_seconds.map(|s| s as f64),
        view_count: data.view_count,
        like_count: data.like_count,
        upload_date: data
            .published
            .filter(|p| *p > 0)
            .and_then(|p| timestamp_to_date(p as i64)),
        thumbnail,
        description: data.description,
        formats,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PipedStreams {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    uploader: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    duration: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    views: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    likes: Option<u64>,
    #[serde(default)]
    upload_date: Option<String>,
    #[serde(default)]
    thumbnail_url: Option<String>,
    #[serde(default)]
    video_streams: Vec<PipedStream>,
    #[serde(default)]
    audio_streams: Vec<PipedStream>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PipedStream {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    quality: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    codec: Option<String>,
    #[serde(default)]
    video_only: bool,
    #[serde(default, deserialize_with = "lenient_u64")]
    bitrate: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    width: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    height: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    fps: Option<u64>,
    #[serde(default, deserialize_with = "lenient_string")]
    itag: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    content_length: Option<u64>,
}

impl PipedStream {
    fn into_format(self, audio: bool, index: usize) -> Format {
        let mime_type = self.mime_type.unwrap_or_default();
        let kbps = self.bitrate.map(|b| b as f64 / 1000.0);

        let (vcodec, acodec) = if audio {
            (Some("none".to_string()), self.codec)
        } else if self.video_only {
            (self.codec, Some("none".to_string()))
        } else {
            (self.codec, None)
        };

        Format {
            format_id: self
                .itag
                .unwrap_or_else(|| format!("piped-{}{}", if audio { "a" } else { "v" }, index)),
            ext: mime::ext_from_mime(&mime_type).to_string(),
            vcodec,
            acodec,
            width: non_zero(self.width).map(|w| w as u32),
            height: non_zero(self.height).map(|h| h as u32),
            fps: non_zero(self.fps).map(|f| f as f64),
            abr: if audio { kbps } else { None },
            tbr: kbps,
            filesize: non_zero(self.content_length),
            format_note: self.quality,
            url: self.url,
            ..Default::default()
        }
    }
}

fn map_piped(data: PipedStreams, video_id: &str) -> VideoInfo {
    let formats = data
        .video_streams
        .into_iter()
        .enumerate()
        .map(|(i, s)| s.into_format(false, i))
        .chain(
            data.audio_streams
                .into_iter()
                .enumerate()
                .map(|(i, s)| s.into_format(true, i)),
        )
        .collect();

    VideoInfo {
        id: video_id.to_string(),
        title: data.title.unwrap_or_default(),
        uploader: data.uploader,
        duration: data.duration.map(|d| d as f64),
        view_count: data.views,
        like_count: data.likes,
        upload_date: data.upload_date.as_deref().and_then(normalize_date),
        thumbnail: data.thumbnail_url,
        description: data.description,
        webpage_url: Some(watch_url(video_id)),
        formats,
    }
}

/// Metadata through the Invidious `/api/v1/videos/{id}` endpoint
#[derive(Debug, Clone)]
pub struct InvidiousExtractor {
    client: MirrorClient,
}

impl InvidiousExtractor {
    pub fn new(settings: &Settings) -> Self {
        Self {
            client: MirrorClient::new(&settings.mirrors.invidious, settings, INVIDIOUS_TIMEOUT),
        }
    }

    /// Replace the instance list and query it in the given order
    pub fn with_instances(mut self, instances: Vec<String>) -> Self {
        self.client.instances = instances;
        self.client.shuffle = false;
        self
    }

    async fn lookup(&self, url: &str, route: &Route) -> Result<MirrorHit> {
        let video_id = extract_video_id(url)?;
        let path = format!("/api/v1/videos/{}", video_id);
        let fetched = self
            .client
            .fetch::<InvidiousVideo>("Invidious", &path, route)
            .await?;
        Ok(MirrorHit {
            info: map_invidious(fetched.body, &video_id, &fetched.instance),
            instance: fetched.instance,
            route: fetched.route,
        })
    }
}

#[async_trait]
impl MediaExtractor for InvidiousExtractor {
    fn id(&self) -> &'static str {
        "invidious"
    }

    async fn extract_info(&self, url: &str, route: &Route) -> Result<VideoInfo> {
        Ok(self.lookup(url, route).await?.info)
    }

    async fn download(
        &self,
        request: &DownloadRequest,
        route: &Route,
        progress: Option<ProgressCallback>,
    ) -> Result<PathBuf> {
        let hit = self.lookup(&request.url, route).await?;
        self.client.download(hit, request, progress).await
    }
}

/// Metadata through the Piped `/streams/{id}` endpoint
#[derive(Debug, Clone)]
pub struct PipedExtractor {
    client: MirrorClient,
}

impl PipedExtractor {
    pub fn new(settings: &Settings) -> Self {
        Self {
            client: MirrorClient::new(&settings.mirrors.piped, settings, PIPED_TIMEOUT),
        }
    }

    /// Replace the instance list and query it in the given order
    pub fn with_instances(mut self, instances: Vec<String>) -> Self {
        self.client.instances = instances;
        self.client.shuffle = false;
        self
    }

    async fn lookup(&self, url: &str, route: &Route) -> Result<MirrorHit> {
        let video_id = extract_video_id(url)?;
        let path = format!("/streams/{}", video_id);
        let fetched = self
            .client
            .fetch::<PipedStreams>("Piped", &path, route)
            .await?;
        let data = fetched.body;
        if data.title.is_none() && data.video_streams.is_empty() && data.audio_streams.is_empty() {
            return Err(GrabError::Mirror("Piped returned an empty response".to_string()));
        }
        Ok(MirrorHit {
            info: map_piped(data, &video_id),
            instance: fetched.instance,
            route: fetched.route,
        })
    }
}

#[async_trait]
impl MediaExtractor for PipedExtractor {
    fn id(&self) -> &'static str {
        "piped"
    }

    async fn extract_info(&self, url: &str, route: &Route) -> Result<VideoInfo> {
        Ok(self.lookup(url, route).await?.info)
    }

    async fn download(
        &self,
        request: &DownloadRequest,
        route: &Route,
        progress: Option<ProgressCallback>,
    ) -> Result<PathBuf> {
        let hit = self.lookup(&request.url, route).await?;
        self.client.download(hit, request, progress).await
    }
}
