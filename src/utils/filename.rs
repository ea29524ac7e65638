//! Safe filename generation utilities

use std::sync::OnceLock;

use regex::Regex;

fn invalid_chars() -> &'static Regex {
    static INVALID: OnceLock<Regex> = OnceLock::new();
    INVALID.get_or_init(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1f]"#).expect("valid regex"))
}

/// Convert a title to a safe filename by replacing invalid characters
pub fn to_safe_filename(title: &str, extension: &str) -> String {
    let mut safe_title = invalid_chars().replace_all(title, "_").to_string();

    safe_title = safe_title
        .trim_matches(|c: char| c == '.' || c == ' ')
        .to_string();

    // Windows caps names at 255
    if safe_title.chars().count() > 200 {
        safe_title = safe_title.chars().take(200).collect::<String>();
        safe_title = safe_title.trim_end().to_string();
    }

    if safe_title.is_empty() {
        safe_title = "video".to_string();
    }

    if extension.is_empty() {
        return safe_title;
    }
    format!("{}.{}", safe_title, extension.trim_start_matches('.'))
}

/// `Content-Disposition` value announcing `filename` as an attachment
///
/// Non-ASCII titles get an ASCII fallback plus an RFC 5987 `filename*`.
pub fn content_disposition(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .map(|c| if c.is_ascii() && c != '"' && c != '\\' { c } else { '_' })
        .collect();

    if ascii == filename {
        return format!("attachment; filename=\"{}\"", ascii);
    }

    let encoded: String = filename
        .bytes()
        .map(|b| {
            if b.is_ascii_alphanumeric() || b"-._~".contains(&b) {
                (b as char).to_string()
            } else {
                format!("%{:02X}", b)
            }
        })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii, encoded
    )
}
