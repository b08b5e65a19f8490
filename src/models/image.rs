//! Accepted image formats and upload limits.

use std::str::FromStr;

/// Largest accepted image payload (5 MiB).
pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

/// Extension used when the client filename carries none.
pub const DEFAULT_EXTENSION: &str = "jpg";

/// Image MIME types the upload endpoint accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageContentType {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl ImageContentType {
    pub fn as_mime(self) -> &'static str {
        match self {
            ImageContentType::Jpeg => "image/jpeg",
            ImageContentType::Png => "image/png",
            ImageContentType::Gif => "image/gif",
            ImageContentType::Webp => "image/webp",
        }
    }
}

impl FromStr for ImageContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image/jpeg" => Ok(ImageContentType::Jpeg),
            "image/png" => Ok(ImageContentType::Png),
            "image/gif" => Ok(ImageContentType::Gif),
            "image/webp" => Ok(ImageContentType::Webp),
            other => Err(other.to_string()),
        }
    }
}

/// Extension for the stored object, taken from the client filename.
///
/// Falls back to [`DEFAULT_EXTENSION`] when the name has no usable suffix.
pub fn extension_from_filename(filename: Option<&str>) -> String {
    filename
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.bytes().all(|b| b.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

/// Deterministic object key for an entity's image slot.
pub fn object_key(entity_id: &str, image_kind: &str, extension: &str) -> String {
    format!("{}/{}.{}", entity_id, image_kind, extension)
}
