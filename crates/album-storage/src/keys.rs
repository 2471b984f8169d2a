//! Object name generation and URL helpers.
//!
//! Name format: `{uuid-v4}.{ext}`, where `ext` is derived from the content type.

use album_core::mime;
use uuid::Uuid;

/// Generate a globally unique object name for a file of `content_type`.
///
/// The extension follows the content type; `fallback_extension` is used for types
/// with no known extension, and `bin` when neither is available.
pub fn generate_object_name(content_type: &str, fallback_extension: Option<&str>) -> String {
    let extension = mime::extension_for_content_type(content_type)
        .map(str::to_string)
        .or_else(|| fallback_extension.map(|e| e.trim_start_matches('.').to_lowercase()))
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| "bin".to_string());
    format!("{}.{}", Uuid::new_v4(), extension)
}

/// Durable object URL from a pre-signed URL (signing query parameters removed).
pub fn object_url(presigned_url: &str) -> String {
    let end = presigned_url
        .find(['?', '#'])
        .unwrap_or(presigned_url.len());
    presigned_url[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_name_uses_content_type_extension() {
        let name = generate_object_name("image/jpeg", Some("heic"));
        assert!(name.ends_with(".jpg"));
        assert_eq!(name.len(), 36 + 4);
    }

    #[test]
    fn test_name_falls_back_to_original_extension() {
        assert!(generate_object_name("application/x-unknown", Some(".TIFF")).ends_with(".tiff"));
        assert!(generate_object_name("application/x-unknown", None).ends_with(".bin"));
    }

    #[test]
    fn test_names_are_unique() {
        let names: HashSet<String> = (0..100)
            .map(|_| generate_object_name("image/png", None))
            .collect();
        assert_eq!(names.len(), 100);
    }

    #[test]
    fn test_object_url_strips_signature() {
        assert_eq!(
            object_url("https://bucket.s3.amazonaws.com/abc.jpg?X-Amz-Signature=xyz&X-Amz-Expires=300"),
            "https://bucket.s3.amazonaws.com/abc.jpg"
        );
        assert_eq!(
            object_url("https://bucket.s3.amazonaws.com/abc.jpg"),
            "https://bucket.s3.amazonaws.com/abc.jpg"
        );
    }
}
