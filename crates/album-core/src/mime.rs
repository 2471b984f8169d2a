//! Content-type and file-extension helpers.
//!
//! Extension lookups are case-insensitive and take extensions without the leading dot.

use std::path::Path;

/// MIME types used by Apple's HEIC/HEIF containers.
pub const HEIC_CONTENT_TYPES: &[&str] = &[
    "image/heic",
    "image/heif",
    "image/heic-sequence",
    "image/heif-sequence",
];

/// File extensions used by Apple's HEIC/HEIF containers.
pub const HEIC_EXTENSIONS: &[&str] = &["heic", "heif"];

/// `ftyp` brands that identify a HEIC/HEIF still image or sequence.
const HEIF_BRANDS: &[&[u8; 4]] = &[
    b"heic", b"heix", b"hevc", b"hevx", b"heim", b"heis", b"mif1", b"msf1",
];

/// Lower-cased extension of `filename`, without the dot.
pub fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(|e| e.to_lowercase())
}

/// Whether a file is a HEIC/HEIF container, judged by its name or declared type.
pub fn is_heic(filename: &str, content_type: &str) -> bool {
    let by_extension = extension_of(filename)
        .map(|ext| HEIC_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false);
    let normalized = content_type.trim().to_lowercase();
    by_extension || HEIC_CONTENT_TYPES.contains(&normalized.as_str())
}

/// Content types that a file with `extension` is expected to declare.
pub fn content_types_for_extension(extension: &str) -> &'static [&'static str] {
    match extension.to_lowercase().as_str() {
        "jpg" | "jpeg" | "jfif" => &["image/jpeg"],
        "png" => &["image/png"],
        "gif" => &["image/gif"],
        "webp" => &["image/webp"],
        "avif" => &["image/avif"],
        "bmp" => &["image/bmp"],
        "heic" => &["image/heic", "image/heic-sequence"],
        "heif" => &["image/heif", "image/heif-sequence"],
        _ => &[],
    }
}

/// Canonical extension for a content type.
pub fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    match content_type.trim().to_lowercase().as_str() {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/avif" => Some("avif"),
        "image/bmp" => Some("bmp"),
        "image/heic" | "image/heic-sequence" => Some("heic"),
        "image/heif" | "image/heif-sequence" => Some("heif"),
        _ => None,
    }
}

/// Guess a content type from a file name, falling back to `application/octet-stream`.
pub fn content_type_from_filename(filename: &str) -> String {
    extension_of(filename)
        .and_then(|ext| content_types_for_extension(&ext).first().copied())
        .unwrap_or("application/octet-stream")
        .to_string()
}

/// Replace (or append) the extension of `filename`.
pub fn replace_extension(filename: &str, extension: &str) -> String {
    let stem = match filename.rfind('.') {
        Some(idx) if idx > 0 => &filename[..idx],
        _ => filename,
    };
    format!("{}.{}", stem, extension)
}

/// Identify an image container from its leading bytes.
pub fn sniff_content_type(data: &[u8]) -> Option<&'static str> {
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }
    if data.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some("image/png");
    }
    if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        return Some("image/gif");
    }
    if data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    if data.starts_with(b"BM") {
        return Some("image/bmp");
    }
    if data.len() >= 12 && &data[4..8] == b"ftyp" {
        let brand = &data[8..12];
        if brand == b"avif" || brand == b"avis" {
            return Some("image/avif");
        }
        if HEIF_BRANDS.iter().any(|b| brand == &b[..]) {
            return Some("image/heic");
        }
    }
    None
}
