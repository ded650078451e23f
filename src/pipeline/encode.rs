//! Image encoding: raw bytes → `data:<mime>;base64,…` URIs.
//!
//! The WeChat editor cannot reach local files and often refuses hot-linked
//! images, so every picture that ends up in the article is carried inline.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageFormat;
use std::path::Path;
use tracing::debug;

/// MIME type used when nothing better can be inferred.
pub const FALLBACK_MIME: &str = "image/png";

/// Encode bytes as a data URI with the given MIME type.
pub fn to_data_uri(bytes: &[u8], mime_type: &str) -> String {
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded {} bytes → {} bytes base64", bytes.len(), b64.len());
    format!("data:{mime_type};base64,{b64}")
}

/// Infer an image MIME type from a file extension.
///
/// SVG is not a raster format `image` knows about, so it is special-cased.
pub fn mime_for_path(path: &Path) -> &'static str {
    let is_svg = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("svg"));
    if is_svg {
        return "image/svg+xml";
    }
    ImageFormat::from_path(path)
        .map(|f| f.to_mime_type())
        .unwrap_or(FALLBACK_MIME)
}

/// Infer an image MIME type by sniffing magic bytes.
pub fn mime_for_bytes(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .map(|f| f.to_mime_type())
        .unwrap_or(FALLBACK_MIME)
}

/// File extension to use when persisting bytes of the given MIME type.
pub fn extension_for_mime(mime_type: &str) -> &'static str {
    ImageFormat::from_mime_type(mime_type)
        .and_then(|f| f.extensions_str().first().copied())
        .unwrap_or("png")
}

/// Read a file and encode it as a data URI, MIME type taken from its extension.
pub async fn file_to_data_uri(path: &Path) -> std::io::Result<String> {
    let bytes = tokio::fs::read(path).await?;
    Ok(to_data_uri(&bytes, mime_for_path(path)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    #[test]
    fn data_uri_is_valid_base64() {
        let uri = to_data_uri(b"hello", "image/png");
        assert!(uri.starts_with("data:image/png;base64,"));
        let payload = uri.trim_start_matches("data:image/png;base64,");
        assert_eq!(STANDARD.decode(payload).unwrap(), b"hello");
    }

    #[test]
    fn mime_from_extension() {
        assert_eq!(mime_for_path(Path::new("a/b.jpg")), "image/jpeg");
        assert_eq!(mime_for_path(Path::new("a/b.JPEG")), "image/jpeg");
        assert_eq!(mime_for_path(Path::new("b.gif")), "image/gif");
        assert_eq!(mime_for_path(Path::new("b.svg")), "image/svg+xml");
        assert_eq!(mime_for_path(Path::new("b.unknown")), FALLBACK_MIME);
        assert_eq!(mime_for_path(Path::new("noext")), FALLBACK_MIME);
    }

    #[test]
    fn mime_from_magic_bytes() {
        assert_eq!(mime_for_bytes(PNG_MAGIC), "image/png");
        assert_eq!(mime_for_bytes(&[0xFF, 0xD8, 0xFF, 0xE0]), "image/jpeg");
        assert_eq!(mime_for_bytes(b"not an image"), FALLBACK_MIME);
    }

    #[test]
    fn extension_from_mime() {
        assert_eq!(extension_for_mime("image/png"), "png");
        assert_eq!(extension_for_mime("image/jpeg"), "jpg");
        assert_eq!(extension_for_mime("application/x-nope"), "png");
    }

    #[tokio::test]
    async fn encodes_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pic.jpg");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();
        let uri = file_to_data_uri(&path).await.unwrap();
        assert_eq!(uri, "data:image/jpeg;base64,AQID");
    }
}
