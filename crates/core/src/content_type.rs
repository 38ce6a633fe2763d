//! Extension-based content types for inline previews.

use crate::constants::FALLBACK_CONTENT_TYPE;

/// Known extensions (lowercase, no dot) and the MIME type served for them.
const CONTENT_TYPES: &[(&str, &str)] = &[
    // Images
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("svg", "image/svg+xml"),
    // Video
    ("mp4", "video/mp4"),
    ("webm", "video/webm"),
    ("mov", "video/quicktime"),
    // Audio
    ("mp3", "audio/mpeg"),
    ("wav", "audio/wav"),
    ("m4a", "audio/mp4"),
    // Documents
    ("pdf", "application/pdf"),
    ("txt", "text/plain"),
    ("md", "text/markdown"),
    // Structured text and code
    ("json", "application/json"),
    ("js", "text/javascript"),
    ("ts", "text/typescript"),
    ("css", "text/css"),
    // Markup
    ("html", "text/html"),
    ("xml", "text/xml"),
];

/// Returns the MIME type for an extension, ignoring case.
///
/// Unknown extensions map to `application/octet-stream`.
pub fn content_type_for_extension(extension: &str) -> &'static str {
    let extension = extension.trim().trim_start_matches('.');
    CONTENT_TYPES
        .iter()
        .find(|(ext, _)| ext.eq_ignore_ascii_case(extension))
        .map(|(_, mime)| *mime)
        .unwrap_or(FALLBACK_CONTENT_TYPE)
}

/// Returns the MIME type for a file name based on the text after its last dot.
pub fn content_type_for_name(name: &str) -> &'static str {
    let base = crate::paths::file_name(name);
    match base.rsplit_once('.') {
        Some((_, ext)) => content_type_for_extension(ext),
        None => FALLBACK_CONTENT_TYPE,
    }
}

/// All known extensions with their MIME types.
pub fn known_content_types() -> impl Iterator<Item = (&'static str, &'static str)> {
    CONTENT_TYPES.iter().copied()
}
