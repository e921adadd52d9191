//! Helpers for sanitizing data before it enters ids, logs and error messages.
//!
//! Logs are safe to share for debugging: uploads are referenced by file name
//! only, and vendor response bodies are truncated before they are recorded.

use std::path::Path;

/// Maximum length of a sanitized upload stem.
const MAX_STEM_LENGTH: usize = 64;

/// Maximum length for vendor error bodies to prevent log flooding.
const MAX_ERROR_BODY_LENGTH: usize = 200;

/// Returns only the filename component of a path (no directory).
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Reduces an upload file stem to `[A-Za-z0-9_-]`, suitable for job ids and
/// blob keys. Anything else becomes `_`; an empty stem becomes `upload`.
pub fn sanitize_stem(stem: &str) -> String {
    let cleaned: String = stem
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_STEM_LENGTH)
        .collect();

    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

/// Truncates a response body to a reasonable length, on a char boundary.
pub fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated)", &body[..end])
}
