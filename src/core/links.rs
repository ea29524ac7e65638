//! Download link response construction

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::selector::{quality_label, select_formats};
use crate::core::video_info::{Format, Quality, VideoInfo};
use crate::{GrabError, Result};

/// Ready-made command lines fetching a link with the required headers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadInstructions {
    pub curl: String,
    pub wget: String,
}

/// One resolved direct media URL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadLink {
    /// Display label ("1080p HD", "Audio Only", ...)
    pub quality: String,
    /// Container extension
    pub format: String,
    pub format_id: String,
    pub url: String,
    pub filesize: Option<u64>,
    /// `WxH` for video links
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub resolution: Option<String>,
    /// Audio bitrate in kbps for audio links
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub bitrate: Option<f64>,
    pub headers: BTreeMap<String, String>,
    pub requires_headers: bool,
    pub download_instructions: DownloadInstructions,
}

/// Metadata plus resolved links for one video
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadLinkResponse {
    pub title: String,
    pub uploader: Option<String>,
    pub duration: Option<u64>,
    pub view_count: Option<u64>,
    pub upload_date: Option<String>,
    pub thumbnail: Option<String>,
    pub download_links: Vec<DownloadLink>,
    /// Extractor that produced the data
    pub source: String,
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// `curl` and `wget` invocations sending `User-Agent` and `Referer`
pub fn download_instructions(url: &str, ext: &str, headers: &BTreeMap<String, String>) -> DownloadInstructions {
    let header = |name: &str| headers.get(name).map(String::as_str).unwrap_or_default();
    let user_agent = format!("User-Agent: {}", header("User-Agent"));
    let referer = format!("Referer: {}", header("Referer"));
    let output = format!("output.{}", ext);

    DownloadInstructions {
        curl: format!(
            "curl -L {} -H {} -H {} -o {}",
            shell_quote(url),
            shell_quote(&user_agent),
            shell_quote(&referer),
            output
        ),
        wget: format!(
            "wget --header={} --header={} {} -O {}",
            shell_quote(&user_agent),
            shell_quote(&referer),
            shell_quote(url),
            output
        ),
    }
}

fn build_link(format: &Format, quality: Quality, headers: &BTreeMap<String, String>) -> Option<DownloadLink> {
    let url = format.direct_url()?.to_string();
    let ext = if format.ext.is_empty() {
        quality.extension().to_string()
    } else {
        format.ext.clone()
    };

    let (resolution, bitrate) = match quality {
        Quality::Audio => (None, format.abr),
        Quality::Best => (Some(format.resolution_string()), None),
    };

    let instructions = download_instructions(&url, &ext, headers);

    Some(DownloadLink {
        quality: quality_label(format, quality),
        format: ext,
        format_id: format.format_id.clone(),
        url,
        filesize: format.size(),
        resolution,
        bitrate,
        headers: headers.clone(),
        requires_headers: true,
        download_instructions: instructions,
    })
}

impl DownloadLinkResponse {
    /// Select formats for `quality` and turn them into links
    ///
    /// Fails with [`GrabError::NoFormatFound`] when nothing qualifies.
    pub fn build(
        info: &VideoInfo,
        source: &str,
        quality: Quality,
        headers: &BTreeMap<String, String>,
        max_links: usize,
    ) -> Result<Self> {
        let download_links: Vec<DownloadLink> = select_formats(info, quality, max_links)
            .into_iter()
            .filter_map(|format| build_link(format, quality, headers))
            .collect();

        if download_links.is_empty() {
            return Err(GrabError::NoFormatFound);
        }

        Ok(Self {
            title: if info.title.is_empty() {
                "Unknown".to_string()
            } else {
                info.title.clone()
            },
            uploader: info.uploader.clone(),
            duration: info.duration_secs(),
            view_count: info.view_count,
            upload_date: info.upload_date.clone(),
            thumbnail: info.thumbnail.clone(),
            download_links,
            source: source.to_string(),
        })
    }
}
