//! Process-wide settings read once from the environment
//!
//! Everything here is immutable after startup and shared through
//! `Arc<Settings>`. Tests build settings through [`Settings::from_lookup`]
//! instead of touching the real process environment.

use std::collections::BTreeMap;
use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose, Engine as _};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::extractor::Route;
use crate::Result;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";
pub const DEFAULT_REFERER: &str = "https://www.youtube.com/";
pub const DEFAULT_MAX_LINKS: usize = 3;
pub const DEFAULT_SOCKET_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_PORT: u16 = 4000;

pub const DEFAULT_INVIDIOUS_INSTANCES: &[&str] = &[
    "https://yt.artemislena.eu",
    "https://invidious.protokolla.fi",
    "https://invidious.jing.rocks",
    "https://invidious.privacydev.net",
    "https://invidious.fdn.fr",
    "https://yt.mnt.lv",
];

pub const DEFAULT_PIPED_INSTANCES: &[&str] = &[
    "https://pipedapi.kavin.rocks",
    "https://pipedapi-libre.kavin.rocks",
    "https://pipedapi.leptons.xyz",
    "https://pipedapi.nosebs.ru",
    "https://piped-api.codespace.cz",
    "https://pipedapi.reallyaweso.me",
    "https://api.piped.private.coffee",
    "https://pipedapi.ducks.party",
    "https://pipedapi.darkness.services",
    "https://pipedapi.orangenet.cc",
];

/// Add an `http://` scheme to bare `host:port` proxies; blank input yields `None`
pub fn normalize_proxy_url(proxy: &str) -> Option<String> {
    let proxy = proxy.trim();
    if proxy.is_empty() {
        return None;
    }
    if proxy.contains("://") {
        Some(proxy.to_string())
    } else {
        Some(format!("http://{}", proxy))
    }
}

/// Cookie file handed to the extraction library
#[derive(Debug, Clone)]
pub enum CookieFile {
    /// A Netscape cookie file on disk
    Path(PathBuf),
    /// Inline cookies materialised to a temporary file, removed on drop
    Inline(Arc<NamedTempFile>),
}

impl CookieFile {
    pub fn path(&self) -> &Path {
        match self {
            CookieFile::Path(path) => path,
            CookieFile::Inline(file) => file.path(),
        }
    }
}

/// Mirror provider settings
#[derive(Debug, Clone)]
pub struct MirrorSettings {
    /// Whether mirrors are consulted after every route failed
    pub enabled: bool,
    /// Invidious instance base URLs
    pub invidious: Vec<String>,
    /// Piped API instance base URLs
    pub piped: Vec<String>,
    /// Verify TLS certificates of mirror instances
    pub verify_tls: bool,
}

impl Default for MirrorSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            invidious: DEFAULT_INVIDIOUS_INSTANCES.iter().map(|s| s.to_string()).collect(),
            piped: DEFAULT_PIPED_INSTANCES.iter().map(|s| s.to_string()).collect(),
            verify_tls: true,
        }
    }
}

/// Immutable process-wide configuration
#[derive(Debug, Clone)]
pub struct Settings {
    /// Proxy used for the first route instead of a direct connection
    pub forced_proxy: Option<String>,
    /// Additional proxies tried in order after the first route
    pub proxy_pool: Vec<String>,
    /// Whether a direct connection may be used
    pub allow_direct: bool,
    pub cookies: Option<CookieFile>,
    pub mirrors: MirrorSettings,
    pub user_agent: String,
    pub accept_language: String,
    /// Number of links returned for `best`
    pub max_links: usize,
    pub socket_timeout: Duration,
    /// Explicit `yt-dlp` binary
    pub ytdlp_path: Option<PathBuf>,
    /// Server bind address
    pub bind_address: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            forced_proxy: None,
            proxy_pool: Vec::new(),
            allow_direct: true,
            cookies: None,
            mirrors: MirrorSettings::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            max_links: DEFAULT_MAX_LINKS,
            socket_timeout: DEFAULT_SOCKET_TIMEOUT,
            ytdlp_path: None,
            bind_address: format!("0.0.0.0:{}", DEFAULT_PORT),
        }
    }
}

fn is_disabled(value: Option<String>) -> bool {
    value.map(|v| v.trim() == "0").unwrap_or(false)
}

fn is_falsy(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "0" | "false" | "no")
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_or_default<T: std::str::FromStr>(name: &str, value: Option<String>, default: T) -> T {
    match value {
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!("Ignoring invalid {}={:?}", name, raw);
                default
            }
        },
        None => default,
    }
}

fn materialize_inline_cookies(encoded: &str) -> Result<CookieFile> {
    let decoded = general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| crate::GrabError::Config(format!("invalid base64 cookies: {}", e)))?;

    let mut file = tempfile::Builder::new()
        .prefix("ytgrab_cookies_")
        .suffix(".txt")
        .tempfile()?;
    file.write_all(&decoded)?;
    file.flush()?;

    debug!("Inline cookies written to {}", file.path().display());
    Ok(CookieFile::Inline(Arc::new(file)))
}

impl Settings {
    /// Read settings from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Read settings through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let forced_proxy = non_empty("YTDL_PROXY")
            .or_else(|| non_empty("PROXY_URL"))
            .and_then(|p| normalize_proxy_url(&p));

        let proxy_pool = lookup("YTDL_PROXY_POOL")
            .map(|pool| pool.split(',').filter_map(normalize_proxy_url).collect())
            .unwrap_or_default();

        let allow_direct = !is_disabled(lookup("YTDL_ALLOW_DIRECT"));

        let cookies = Self::resolve_cookies(&lookup)?;

        let defaults = MirrorSettings::default();
        let mirrors = MirrorSettings {
            enabled: !is_disabled(lookup("YTDL_ENABLE_MIRRORS")),
            invidious: non_empty("INVIDIOUS_INSTANCES")
                .map(|v| split_list(&v))
                .unwrap_or(defaults.invidious),
            piped: non_empty("PIPED_INSTANCES")
                .map(|v| split_list(&v))
                .unwrap_or(defaults.piped),
            verify_tls: lookup("INVIDIOUS_VERIFY_TLS")
                .map(|v| !is_falsy(&v))
                .unwrap_or(true),
        };

        let max_links = parse_or_default("YTDL_MAX_LINKS", non_empty("YTDL_MAX_LINKS"), DEFAULT_MAX_LINKS).max(1);
        let socket_timeout = Duration::from_secs(parse_or_default(
            "YTDL_SOCKET_TIMEOUT",
            non_empty("YTDL_SOCKET_TIMEOUT"),
            DEFAULT_SOCKET_TIMEOUT.as_secs(),
        ));

        let bind_address = match non_empty("BIND_ADDRESS") {
            Some(address) => address,
            None => format!(
                "0.0.0.0:{}",
                parse_or_default("PORT", non_empty("PORT"), DEFAULT_PORT)
            ),
        };

        let settings = Self {
            forced_proxy,
            proxy_pool,
            allow_direct,
            cookies,
            mirrors,
            user_agent: non_empty("YDL_USER_AGENT").unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            accept_language: non_empty("YDL_ACCEPT_LANGUAGE")
                .unwrap_or_else(|| DEFAULT_ACCEPT_LANGUAGE.to_string()),
            max_links,
            socket_timeout,
            ytdlp_path: non_empty("YTDLP_PATH").map(PathBuf::from),
            bind_address,
        };

        info!(
            "Settings loaded: {} route(s), cookies: {}, mirrors: {}",
            settings.routes().len(),
            settings.cookies.is_some(),
            settings.mirrors.enabled
        );
        Ok(settings)
    }

    fn resolve_cookies<F>(lookup: &F) -> Result<Option<CookieFile>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let inline = lookup("YTDL_COOKIES_B64")
            .or_else(|| lookup("YTDL_COOKIES_INLINE"))
            .filter(|v| !v.trim().is_empty());

        if let Some(encoded) = inline {
            match materialize_inline_cookies(&encoded) {
                Ok(file) => return Ok(Some(file)),
                Err(e) => warn!("Failed to decode inline cookies, falling back to cookie file: {}", e),
            }
        }

        let path = PathBuf::from(
            lookup("YTDL_COOKIES")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| "cookies.txt".to_string()),
        );
        if path.is_file() {
            debug!("Using cookie file {}", path.display());
            return Ok(Some(CookieFile::Path(path)));
        }
        Ok(None)
    }

    /// Ordered, deduplicated network routes
    ///
    /// The forced proxy comes first, then the pool, then a direct connection
    /// when allowed. Never empty: with everything disabled a direct route
    /// remains.
    pub fn routes(&self) -> Vec<Route> {
        let mut candidates: Vec<Route> = self.forced_proxy.iter().cloned().map(Route::Proxy).collect();
        candidates.extend(self.proxy_pool.iter().cloned().map(Route::Proxy));
        if self.allow_direct {
            candidates.push(Route::Direct);
        }

        let mut routes: Vec<Route> = Vec::with_capacity(candidates.len());
        for route in candidates {
            if !routes.contains(&route) {
                routes.push(route);
            }
        }

        if routes.is_empty() {
            routes.push(Route::Direct);
        }
        routes
    }

    /// Headers the library sends and clients must replay against the media host
    pub fn request_headers(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("User-Agent".to_string(), self.user_agent.clone()),
            ("Accept-Language".to_string(), self.accept_language.clone()),
            ("Referer".to_string(), DEFAULT_REFERER.to_string()),
            ("Accept".to_string(), "*/*".to_string()),
        ])
    }

    /// Cookie file path, if any
    pub fn cookie_path(&self) -> Option<&Path> {
        self.cookies.as_ref().map(CookieFile::path)
    }

    /// Try `proxy` before the pool and the direct connection
    pub fn with_proxy(mut self, proxy: &str) -> Self {
        self.forced_proxy = normalize_proxy_url(proxy);
        self
    }

    /// Hand `path` to the library as its cookie file
    pub fn with_cookie_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.cookies = Some(CookieFile::Path(path.into()));
        self
    }

    pub fn with_socket_timeout(mut self, timeout: Duration) -> Self {
        self.socket_timeout = timeout;
        self
    }

    pub fn with_mirrors_enabled(mut self, enabled: bool) -> Self {
        self.mirrors.enabled = enabled;
        self
    }
}
