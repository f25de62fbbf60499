//! MIME type detection module
//!
//! Content-Type is taken from the logical asset path, never from the stored
//! bytes, so a compressed sidecar is still labelled with the original type.

/// Fallback for unknown extensions
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Get MIME Content-Type for an asset path
///
/// # Examples
/// ```
/// use gzstatic::http::mime::content_type_for;
/// assert_eq!(content_type_for("index.html"), "text/html; charset=utf-8");
/// assert_eq!(content_type_for("js/app.JS"), "text/javascript; charset=utf-8");
/// assert_eq!(content_type_for("LICENSE"), "application/octet-stream");
/// ```
pub fn content_type_for(path: &str) -> &'static str {
    get_content_type(extension(path).as_deref())
}

/// Get MIME Content-Type based on a lower-case file extension
pub fn get_content_type(extension: Option<&str>) -> &'static str {
    match extension {
        // Text
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("txt" | "md") => "text/plain; charset=utf-8",
        Some("csv") => "text/csv; charset=utf-8",
        Some("xml") => "text/xml; charset=utf-8",

        // JavaScript/WASM
        Some("js" | "mjs") => "text/javascript; charset=utf-8",
        Some("json" | "map") => "application/json",
        Some("webmanifest") => "application/manifest+json",
        Some("wasm") => "application/wasm",

        // Images
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",

        // Video
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("ogv") => "video/ogg",

        // Audio
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("ogg") => "audio/ogg",
        Some("flac") => "audio/flac",

        // Fonts
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",

        // Documents and archives
        Some("pdf") => "application/pdf",
        Some("zip") => "application/zip",
        Some("gz") => "application/gzip",
        Some("tar") => "application/x-tar",

        _ => DEFAULT_CONTENT_TYPE,
    }
}

/// Lower-cased extension of the last path segment
fn extension(path: &str) -> Option<String> {
    let name = path.rsplit('/').next().unwrap_or(path);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
