//! Forced proxy / proxy pool / direct / mirror fallback sequence

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::core::VideoInfo;
use crate::error::ErrorKind;
use crate::extractor::mirror::{InvidiousExtractor, PipedExtractor};
use crate::extractor::traits::{DownloadRequest, MediaExtractor, ProgressCallback, Route};
use crate::utils::url::extract_video_id;
use crate::{GrabError, Result};

/// Successful extraction and where it came from
#[derive(Debug, Clone)]
pub struct Extraction {
    pub info: VideoInfo,
    /// Extractor id (`yt-dlp`, `invidious`, `piped`)
    pub source: &'static str,
    pub route: Route,
}

/// Tries the primary extractor on every route, then each mirror
#[derive(Clone)]
pub struct FallbackChain {
    primary: Arc<dyn MediaExtractor>,
    mirrors: Vec<Arc<dyn MediaExtractor>>,
    settings: Arc<Settings>,
}

impl FallbackChain {
    /// Chain around `primary`, with Invidious and Piped mirrors when enabled
    pub fn new(primary: Arc<dyn MediaExtractor>, settings: Arc<Settings>) -> Self {
        let mirrors: Vec<Arc<dyn MediaExtractor>> = if settings.mirrors.enabled {
            vec![
                Arc::new(InvidiousExtractor::new(&settings)) as Arc<dyn MediaExtractor>,
                Arc::new(PipedExtractor::new(&settings)) as Arc<dyn MediaExtractor>,
            ]
        } else {
            Vec::new()
        };

        Self {
            primary,
            mirrors,
            settings,
        }
    }

    /// Replace the mirror list
    pub fn with_mirrors(mut self, mirrors: Vec<Arc<dyn MediaExtractor>>) -> Self {
        self.mirrors = mirrors;
        self
    }

    pub fn settings(&self) -> &Arc<Settings> {
        &self.settings
    }

    /// Extract metadata, returning the first source that succeeds
    ///
    /// Input errors are returned before any network access and never advance
    /// the chain.
    pub async fn extract(&self, url: &str) -> Result<Extraction> {
        extract_video_id(url)?;

        let routes = self.settings.routes();
        let mut last_error: Option<GrabError> = None;

        for route in &routes {
            debug!("Trying {} via {}", self.primary.id(), route);
            match self.primary.extract_info(url, route).await {
                Ok(info) => {
                    info!("Extracted \"{}\" with {} via {}", info.title, self.primary.id(), route);
                    return Ok(Extraction {
                        info,
                        source: self.primary.id(),
                        route: route.clone(),
                    });
                }
                Err(e) if !e.should_fall_back() => return Err(e),
                Err(e) => {
                    warn!("{} failed via {}: {}", self.primary.id(), route, e);
                    let missing_binary = matches!(e, GrabError::ExtractorNotFound);
                    last_error = Some(e);
                    if missing_binary {
                        break;
                    }
                }
            }
        }

        let mirror_route = routes.first().cloned().unwrap_or(Route::Direct);
        for mirror in &self.mirrors {
            debug!("Trying mirror {} via {}", mirror.id(), mirror_route);
            match mirror.extract_info(url, &mirror_route).await {
                Ok(info) => {
                    info!("Extracted \"{}\" with mirror {}", info.title, mirror.id());
                    return Ok(Extraction {
                        info,
                        source: mirror.id(),
                        route: mirror_route,
                    });
                }
                Err(e) if !e.should_fall_back() => return Err(e),
                Err(e) => {
                    warn!("Mirror {} failed: {}", mirror.id(), e);
                    last_error = Some(e);
                }
            }
        }

        Err(GrabError::AllSourcesFailed(
            last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no sources configured".to_string()),
        ))
    }

    /// Download with the primary extractor on each route, then through each mirror
    ///
    /// Input errors stop the chain. A primary failing for local reasons
    /// (missing binary, missing ffmpeg) skips its remaining routes.
    pub async fn download(
        &self,
        request: &DownloadRequest,
        progress: Option<ProgressCallback>,
    ) -> Result<PathBuf> {
        extract_video_id(&request.url)?;

        let routes = self.settings.routes();
        let mut last_error: Option<GrabError> = None;

        for route in &routes {
            debug!("Downloading {} via {}", request.url, route);
            match self.primary.download(request, route, progress.clone()).await {
                Ok(path) => return Ok(path),
                Err(e) if e.kind() == ErrorKind::Input => return Err(e),
                Err(e) => {
                    warn!("Download failed via {}: {}", route, e);
                    let local = e.kind() == ErrorKind::Environment;
                    last_error = Some(e);
                    if local {
                        break;
                    }
                }
            }
        }

        let mirror_route = routes.first().cloned().unwrap_or(Route::Direct);
        for mirror in &self.mirrors {
            debug!("Downloading {} through mirror {}", request.url, mirror.id());
            match mirror.download(request, &mirror_route, progress.clone()).await {
                Ok(path) => {
                    info!("Downloaded {} through mirror {}", request.url, mirror.id());
                    return Ok(path);
                }
                Err(GrabError::Unsupported(_)) => continue,
                Err(e) if e.kind() == ErrorKind::Input => return Err(e),
                Err(e) => {
                    warn!("Mirror {} download failed: {}", mirror.id(), e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            GrabError::DownloadFailed("no route available".to_string())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    const VIDEO_URL: &str = "https://youtu.be/dQw4w9WgXcQ";

    /// Extractor that fails on the listed routes and records every call
    struct ScriptedExtractor {
        id: &'static str,
        fail_on: Vec<Route>,
        error: fn() -> GrabError,
        calls: Mutex<Vec<Route>>,
    }

    impl ScriptedExtractor {
        fn new(id: &'static str, fail_on: Vec<Route>, error: fn() -> GrabError) -> Arc<Self> {
            Arc::new(Self {
                id,
                fail_on,
                error,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<Route> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MediaExtractor for ScriptedExtractor {
        fn id(&self) -> &'static str {
            self.id
        }

        async fn extract_info(&self, _url: &str, route: &Route) -> Result<VideoInfo> {
            self.calls.lock().unwrap().push(route.clone());
            if self.fail_on.contains(route) {
                Err((self.error)())
            } else {
                Ok(VideoInfo::new("dQw4w9WgXcQ", format!("from {}", self.id)))
            }
        }

        async fn download(
            &self,
            _request: &DownloadRequest,
            route: &Route,
            _progress: Option<ProgressCallback>,
        ) -> Result<PathBuf> {
            self.calls.lock().unwrap().push(route.clone());
            if self.fail_on.contains(route) {
                Err((self.error)())
            } else {
                Ok(PathBuf::from("downloads/video.mp4"))
            }
        }
    }

    fn blocked() -> GrabError {
        GrabError::ExtractionFailed("Sign in to confirm you're not a bot".to_string())
    }

    fn pool_settings() -> Arc<Settings> {
        let mut settings = Settings::default();
        settings.proxy_pool = vec!["http://p1:1".to_string(), "http://p2:2".to_string()];
        Arc::new(settings)
    }

    fn p(url: &str) -> Route {
        Route::Proxy(url.to_string())
    }

    #[tokio::test]
    async fn test_first_success_stops_chain() {
        let primary = ScriptedExtractor::new("yt-dlp", vec![p("http://p1:1")], blocked);
        let mirror = ScriptedExtractor::new("invidious", vec![], blocked);
        let chain = FallbackChain::new(primary.clone(), pool_settings())
            .with_mirrors(vec![mirror.clone() as Arc<dyn MediaExtractor>]);

        let extraction = chain.extract(VIDEO_URL).await.unwrap();
        assert_eq!(extraction.source, "yt-dlp");
        assert_eq!(extraction.route, p("http://p2:2"));
        assert_eq!(primary.calls(), vec![p("http://p1:1"), p("http://p2:2")]);
        assert!(mirror.calls().is_empty());
    }

    #[tokio::test]
    async fn test_falls_back_to_mirrors_in_order() {
        let all_routes = vec![p("http://p1:1"), p("http://p2:2"), Route::Direct];
        let primary = ScriptedExtractor::new("yt-dlp", all_routes.clone(), blocked);
        let invidious = ScriptedExtractor::new("invidious", vec![p("http://p1:1")], || {
            GrabError::Mirror("503".to_string())
        });
        let piped = ScriptedExtractor::new("piped", vec![], blocked);
        let chain = FallbackChain::new(primary.clone(), pool_settings())
            .with_mirrors(vec![
                invidious.clone() as Arc<dyn MediaExtractor>,
                piped.clone() as Arc<dyn MediaExtractor>,
            ]);

        let extraction = chain.extract(VIDEO_URL).await.unwrap();
        assert_eq!(extraction.source, "piped");
        assert_eq!(extraction.info.title, "from piped");
        assert_eq!(primary.calls(), all_routes);
        assert_eq!(invidious.calls(), vec![p("http://p1:1")]);
        assert_eq!(piped.calls(), vec![p("http://p1:1")]);
    }

    #[tokio::test]
    async fn test_input_error_never_reaches_extractors() {
        let primary = ScriptedExtractor::new("yt-dlp", vec![], blocked);
        let mirror = ScriptedExtractor::new("invidious", vec![], blocked);
        let chain = FallbackChain::new(primary.clone(), pool_settings())
            .with_mirrors(vec![mirror.clone() as Arc<dyn MediaExtractor>]);

        let err = chain.extract("https://example.com/watch?v=x").await.unwrap_err();
        assert!(matches!(err, GrabError::InvalidUrl(_)));
        assert!(primary.calls().is_empty());
        assert!(mirror.calls().is_empty());
    }

    #[tokio::test]
    async fn test_input_error_from_extractor_short_circuits() {
        let primary = ScriptedExtractor::new("yt-dlp", vec![p("http://p1:1")], || {
            GrabError::InvalidUrl("Unsupported URL".to_string())
        });
        let mirror = ScriptedExtractor::new("invidious", vec![], blocked);
        let chain = FallbackChain::new(primary.clone(), pool_settings())
            .with_mirrors(vec![mirror.clone() as Arc<dyn MediaExtractor>]);

        assert!(chain.extract(VIDEO_URL).await.is_err());
        assert_eq!(primary.calls(), vec![p("http://p1:1")]);
        assert!(mirror.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_binary_skips_remaining_routes() {
        let all_routes = vec![p("http://p1:1"), p("http://p2:2"), Route::Direct];
        let primary = ScriptedExtractor::new("yt-dlp", all_routes, || GrabError::ExtractorNotFound);
        let mirror = ScriptedExtractor::new("piped", vec![], blocked);
        let chain = FallbackChain::new(primary.clone(), pool_settings())
            .with_mirrors(vec![mirror.clone() as Arc<dyn MediaExtractor>]);

        let extraction = chain.extract(VIDEO_URL).await.unwrap();
        assert_eq!(extraction.source, "piped");
        assert_eq!(primary.calls(), vec![p("http://p1:1")]);
    }

    #[tokio::test]
    async fn test_everything_failing() {
        let primary = ScriptedExtractor::new("yt-dlp", vec![Route::Direct], blocked);
        let chain = FallbackChain::new(primary, Arc::new(Settings::default())).with_mirrors(Vec::new());

        let err = chain.extract(VIDEO_URL).await.unwrap_err();
        assert!(matches!(err, GrabError::AllSourcesFailed(_)));
        assert!(err.to_string().contains("not a bot"));
    }

    #[test]
    fn test_mirrors_follow_settings() {
        let primary = ScriptedExtractor::new("yt-dlp", vec![], blocked);
        let enabled = FallbackChain::new(primary.clone(), Arc::new(Settings::default()));
        assert_eq!(enabled.mirrors.len(), 2);
        assert_eq!(enabled.mirrors[0].id(), "invidious");
        assert_eq!(enabled.mirrors[1].id(), "piped");

        let disabled = FallbackChain::new(
            primary,
            Arc::new(Settings::default().with_mirrors_enabled(false)),
        );
        assert!(disabled.mirrors.is_empty());
    }

    #[tokio::test]
    async fn test_download_rotates_routes() {
        let primary = ScriptedExtractor::new("yt-dlp", vec![p("http://p1:1")], blocked);
        let chain = FallbackChain::new(primary.clone(), pool_settings()).with_mirrors(Vec::new());
        let request = DownloadRequest::new(VIDEO_URL, "bestaudio/best", "downloads");

        let path = chain.download(&request, None).await.unwrap();
        assert_eq!(path, PathBuf::from("downloads/video.mp4"));
        assert_eq!(primary.calls(), vec![p("http://p1:1"), p("http://p2:2")]);
    }

    #[tokio::test]
    async fn test_download_falls_back_to_mirrors() {
        let all_routes = vec![p("http://p1:1"), p("http://p2:2"), Route::Direct];
        let primary = ScriptedExtractor::new("yt-dlp", all_routes.clone(), blocked);
        let invidious = ScriptedExtractor::new("invidious", vec![p("http://p1:1")], || {
            GrabError::Mirror("503".to_string())
        });
        let piped = ScriptedExtractor::new("piped", vec![], blocked);
        let chain = FallbackChain::new(primary.clone(), pool_settings()).with_mirrors(vec![
            invidious.clone() as Arc<dyn MediaExtractor>,
            piped.clone() as Arc<dyn MediaExtractor>,
        ]);
        let request = DownloadRequest::new(VIDEO_URL, "best", "downloads");

        let path = chain.download(&request, None).await.unwrap();
        assert_eq!(path, PathBuf::from("downloads/video.mp4"));
        assert_eq!(primary.calls(), all_routes);
        assert_eq!(invidious.calls(), vec![p("http://p1:1")]);
        assert_eq!(piped.calls(), vec![p("http://p1:1")]);
    }

    #[tokio::test]
    async fn test_download_missing_binary_goes_straight_to_mirrors() {
        let all_routes = vec![p("http://p1:1"), p("http://p2:2"), Route::Direct];
        let primary = ScriptedExtractor::new("yt-dlp", all_routes, || GrabError::ExtractorNotFound);
        let mirror = ScriptedExtractor::new("piped", vec![], blocked);
        let chain = FallbackChain::new(primary.clone(), pool_settings())
            .with_mirrors(vec![mirror.clone() as Arc<dyn MediaExtractor>]);
        let request = DownloadRequest::new(VIDEO_URL, "best", "downloads");

        assert!(chain.download(&request, None).await.is_ok());
        assert_eq!(primary.calls(), vec![p("http://p1:1")]);
        assert_eq!(mirror.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_download_reports_last_error_when_everything_fails() {
        let primary = ScriptedExtractor::new("yt-dlp", vec![Route::Direct], blocked);
        let mirror = ScriptedExtractor::new("invidious", vec![Route::Direct], || {
            GrabError::Mirror("all invidious instances failed".to_string())
        });
        let chain = FallbackChain::new(primary, Arc::new(Settings::default()))
            .with_mirrors(vec![mirror as Arc<dyn MediaExtractor>]);
        let request = DownloadRequest::new(VIDEO_URL, "best", "downloads");

        let err = chain.download(&request, None).await.unwrap_err();
        assert!(matches!(err, GrabError::Mirror(_)));
    }

    #[tokio::test]
    async fn test_download_rejects_empty_url() {
        let primary = ScriptedExtractor::new("yt-dlp", vec![], blocked);
        let chain = FallbackChain::new(primary.clone(), pool_settings()).with_mirrors(Vec::new());
        let request = DownloadRequest::new("", "best", "downloads");

        let err = chain.download(&request, None).await.unwrap_err();
        assert!(matches!(err, GrabError::MissingField("url")));
        assert!(primary.calls().is_empty());
    }
}
