//! URL utilities for recognising video URLs and extracting video IDs

use crate::error::GrabError;
use url::Url;

const WATCH_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
];

const PATH_PREFIXES: &[&str] = &["/shorts/", "/embed/", "/live/"];

/// Extract video ID from the supported URL shapes
pub fn extract_video_id(url: &str) -> Result<String, GrabError> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(GrabError::MissingField("url"));
    }

    let parsed = Url::parse(trimmed)
        .map_err(|e| GrabError::InvalidUrl(format!("{} ({})", trimmed, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(GrabError::InvalidUrl(format!(
            "Unsupported scheme: {}",
            parsed.scheme()
        )));
    }

    let host = parsed.host_str().unwrap_or_default().to_lowercase();

    let id = if host == "youtu.be" {
        parsed
            .path()
            .trim_start_matches('/')
            .split('/')
            .next()
            .unwrap_or_default()
            .to_string()
    } else if WATCH_HOSTS.contains(&host.as_str()) {
        if parsed.path() == "/watch" || parsed.path() == "/watch/" {
            parsed
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.to_string())
                .ok_or_else(|| GrabError::InvalidUrl("Missing v parameter".to_string()))?
        } else if let Some(prefix) = PATH_PREFIXES
            .iter()
            .find(|prefix| parsed.path().starts_with(*prefix))
        {
            parsed
                .path()
                .trim_start_matches(prefix)
                .split('/')
                .next()
                .unwrap_or_default()
                .to_string()
        } else {
            return Err(GrabError::InvalidUrl(
                "Unsupported video URL format".to_string(),
            ));
        }
    } else {
        return Err(GrabError::InvalidUrl(
            "Must be a youtube.com or youtu.be link".to_string(),
        ));
    };

    if id.is_empty() {
        return Err(GrabError::InvalidUrl("Missing video ID".to_string()));
    }
    Ok(id)
}

/// Canonical watch URL for a video ID
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_video_id() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/shorts/brZCOVlyPPo").unwrap(),
            "brZCOVlyPPo"
        );
        assert_eq!(
            extract_video_id("https://m.youtube.com/watch?v=-VPYbJxPvzY").unwrap(),
            "-VPYbJxPvzY"
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/embed/dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );
        assert_eq!(
            extract_video_id("https://youtube.com/live/dQw4w9WgXcQ?feature=share").unwrap(),
            "dQw4w9WgXcQ"
        );
    }

    #[test]
    fn test_extract_video_id_edge_cases() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=10s").unwrap(),
            "dQw4w9WgXcQ"
        );
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ?t=10s&list=PLxxxx").unwrap(),
            "dQw4w9WgXcQ"
        );
        assert_eq!(
            extract_video_id("  https://YOUTU.BE/dQw4w9WgXcQ  ").unwrap(),
            "dQw4w9WgXcQ"
        );
        assert_eq!(
            extract_video_id("https://YOUTUBE.COM/watch?v=dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );
    }

    #[test]
    fn test_extract_video_id_errors() {
        assert!(matches!(
            extract_video_id(""),
            Err(GrabError::MissingField("url"))
        ));
        assert!(matches!(
            extract_video_id("   "),
            Err(GrabError::MissingField("url"))
        ));
        assert!(extract_video_id("not-a-url").is_err());
        assert!(extract_video_id("https://youtu.be/").is_err());
        assert!(extract_video_id("https://www.youtube.com/watch").is_err());
        assert!(extract_video_id("https://www.youtube.com/shorts/").is_err());
        assert!(extract_video_id("https://www.youtube.com/channel/UCxxx").is_err());
        assert!(extract_video_id("https://example.com/watch?v=abc").is_err());
        assert!(extract_video_id("https://notyoutube.com/watch?v=abc").is_err());
        assert!(extract_video_id("ftp://youtube.com/watch?v=abc").is_err());
    }

    #[test]
    fn test_watch_url() {
        assert_eq!(
            watch_url("dQw4w9WgXcQ"),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
    }
}
