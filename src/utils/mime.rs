//! MIME type utilities for mirror stream types and download responses

/// Get file extension from MIME type
pub fn ext_from_mime(mime_type: &str) -> &'static str {
    match essence(mime_type) {
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/3gpp" => "3gp",
        "video/x-flv" => "flv",
        "video/x-matroska" => "mkv",

        "audio/mp4" => "m4a",
        "audio/webm" => "webm",
        "audio/mpeg" => "mp3",
        "audio/ogg" => "ogg",
        "audio/opus" => "opus",
        "audio/aac" | "audio/x-aac" => "aac",

        _ => "bin",
    }
}

/// Get MIME type from file extension
pub fn mime_from_ext(extension: &str) -> Option<&'static str> {
    let ext = extension.trim_start_matches('.').to_lowercase();
    let mime = match ext.as_str() {
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "3gp" => "video/3gpp",
        "mkv" => "video/x-matroska",

        "m4a" => "audio/mp4",
        "mp3" => "audio/mpeg",
        "ogg" => "audio/ogg",
        "opus" => "audio/opus",
        "aac" => "audio/aac",

        _ => return None,
    };
    Some(mime)
}

/// The `type/subtype` part of a MIME string, without parameters
pub fn essence(mime_type: &str) -> &str {
    mime_type.split(';').next().unwrap_or_default().trim()
}

/// Codecs listed in a `codecs="..."` parameter
///
/// `video/mp4; codecs="avc1.64001F, mp4a.40.2"` yields `["avc1.64001F", "mp4a.40.2"]`.
pub fn codecs(mime_type: &str) -> Vec<String> {
    mime_type
        .split(';')
        .skip(1)
        .filter_map(|param| {
            let (key, value) = param.split_once('=')?;
            (key.trim() == "codecs").then(|| value.trim().trim_matches('"').to_string())
        })
        .flat_map(|list| {
            list.split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Check if MIME type is an audio format
pub fn is_audio_mime(mime_type: &str) -> bool {
    essence(mime_type).starts_with("audio/")
}

/// Check if a codec string names an audio codec
pub fn is_audio_codec(codec: &str) -> bool {
    let codec = codec.to_lowercase();
    ["mp4a", "opus", "vorbis", "aac", "mp3", "ac-3", "ec-3", "flac"]
        .iter()
        .any(|prefix| codec.starts_with(prefix))
}
