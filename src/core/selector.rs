//! Quality preference → format filtering and labelling

use std::cmp::Ordering;

use crate::core::video_info::{Format, Quality, VideoInfo};

/// Highest-bitrate audio-only format that has a usable URL
pub fn best_audio(formats: &[Format]) -> Option<&Format> {
    formats
        .iter()
        .filter(|f| f.is_audio_only() && f.direct_url().is_some())
        .max_by(|a, b| {
            a.abr
                .unwrap_or(0.0)
                .partial_cmp(&b.abr.unwrap_or(0.0))
                .unwrap_or(Ordering::Equal)
        })
}

/// mp4/webm formats carrying both video and audio, tallest first, at most `limit`
pub fn best_muxed(formats: &[Format], limit: usize) -> Vec<&Format> {
    let mut candidates: Vec<&Format> = formats
        .iter()
        .filter(|f| {
            matches!(f.ext.as_str(), "mp4" | "webm")
                && f.is_progressive()
                && f.direct_url().is_some()
        })
        .collect();

    candidates.sort_by(|a, b| {
        (b.height.unwrap_or(0), b.width.unwrap_or(0)).cmp(&(a.height.unwrap_or(0), a.width.unwrap_or(0)))
    });
    candidates.truncate(limit);
    candidates
}

/// Formats offered for a quality preference, in presentation order
pub fn select_formats(info: &VideoInfo, quality: Quality, limit: usize) -> Vec<&Format> {
    match quality {
        Quality::Audio => best_audio(&info.formats).into_iter().collect(),
        Quality::Best => best_muxed(&info.formats, limit),
    }
}

/// Display label for a selected format
pub fn quality_label(format: &Format, quality: Quality) -> String {
    if quality == Quality::Audio {
        return "Audio Only".to_string();
    }
    match format.height {
        Some(1080) => "1080p HD".to_string(),
        Some(720) => "720p HD".to_string(),
        Some(height) => format!("{}p", height),
        None => "Unknown".to_string(),
    }
}
