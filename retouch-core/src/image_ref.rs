//! Opaque handles to source rasters.
//!
//! An [`ImageRef`] is either a remote reference (resolved by a collaborator
//! at export or AI time) or a resident, already-encoded buffer. Resident
//! buffers share their bytes behind an [`Arc`], so cloning an edit state for
//! history never copies pixel data.

use std::fmt;
use std::sync::Arc;

use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

/// MIME type used for buffers produced by the editor itself.
pub const PNG_MIME: &str = "image/png";

/// An encoded image held in memory.
///
/// Two buffers are equal when they share an id; every new buffer gets a
/// fresh id, so equality means "the same raster", not "the same bytes".
#[derive(Clone)]
pub struct ImageBuffer {
    id: Uuid,
    mime_type: String,
    bytes: Arc<[u8]>,
}

impl ImageBuffer {
    /// Wrap encoded bytes with their MIME type.
    #[must_use]
    pub fn new(bytes: impl Into<Arc<[u8]>>, mime_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Wrap PNG-encoded bytes.
    #[must_use]
    pub fn png(bytes: Vec<u8>) -> Self {
        Self::new(bytes, PNG_MIME)
    }

    /// Unique id of this buffer.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// MIME type of the encoded bytes.
    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// The encoded bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Length of the encoded bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the buffer holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Encode as a base64 `data:` URI.
    #[must_use]
    pub fn to_data_uri(&self) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&self.bytes);
        format!("data:{};base64,{encoded}", self.mime_type)
    }

    /// Parse a `data:` URI such as `data:image/png;base64,iVBORw0KGgo...`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidImageRef`] if the URI is malformed.
    pub fn from_data_uri(uri: &str) -> CoreResult<Self> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| CoreError::InvalidImageRef("Not a data URI".to_string()))?;

        let comma_pos = rest.find(',').ok_or_else(|| {
            CoreError::InvalidImageRef("Invalid data URI: missing comma".to_string())
        })?;

        let metadata = &rest[..comma_pos];
        let encoded_data = &rest[comma_pos + 1..];

        let is_base64 = metadata.ends_with(";base64");
        let mime_type = metadata.trim_end_matches(";base64");
        let mime_type = if mime_type.is_empty() {
            "application/octet-stream"
        } else {
            mime_type
        };

        let bytes = if is_base64 {
            base64::engine::general_purpose::STANDARD
                .decode(encoded_data)
                .map_err(|e| CoreError::InvalidImageRef(format!("Failed to decode base64: {e}")))?
        } else {
            percent_decode(encoded_data)?
        };

        Ok(Self::new(bytes, mime_type))
    }
}

impl PartialEq for ImageBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ImageBuffer {}

impl fmt::Debug for ImageBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageBuffer")
            .field("id", &self.id)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Handle to the raster an edit state currently points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    /// A remote `http(s)` URL that must be fetched before decoding.
    Remote(String),
    /// An encoded buffer already in memory.
    Resident(ImageBuffer),
}

impl ImageRef {
    /// Parse a URL or `data:` URI.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidImageRef`] for anything that is neither an
    /// `http(s)` URL nor a valid data URI.
    pub fn parse(input: &str) -> CoreResult<Self> {
        let trimmed = input.trim();
        if trimmed.starts_with("data:") {
            return ImageBuffer::from_data_uri(trimmed).map(Self::Resident);
        }
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            return Ok(Self::Remote(trimmed.to_string()));
        }
        Err(CoreError::InvalidImageRef(format!(
            "expected http(s) URL or data URI, got '{trimmed}'"
        )))
    }

    /// The URI form of this reference (URL or data URI).
    #[must_use]
    pub fn to_uri(&self) -> String {
        match self {
            Self::Remote(url) => url.clone(),
            Self::Resident(buffer) => buffer.to_data_uri(),
        }
    }

    /// The resident buffer, if this reference is already in memory.
    #[must_use]
    pub fn as_resident(&self) -> Option<&ImageBuffer> {
        match self {
            Self::Resident(buffer) => Some(buffer),
            Self::Remote(_) => None,
        }
    }

    /// Whether the raster must be fetched before use.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

impl From<ImageBuffer> for ImageRef {
    fn from(buffer: ImageBuffer) -> Self {
        Self::Resident(buffer)
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote(url) => write!(f, "{url}"),
            Self::Resident(buffer) => write!(
                f,
                "resident:{} ({}, {} bytes)",
                buffer.id,
                buffer.mime_type,
                buffer.len()
            ),
        }
    }
}

impl Serialize for ImageRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_uri())
    }
}

impl<'de> Deserialize<'de> for ImageRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let uri = String::deserialize(deserializer)?;
        Self::parse(&uri).map_err(serde::de::Error::custom)
    }
}

/// Percent-decoding for non-base64 data URIs.
fn percent_decode(input: &str) -> CoreResult<Vec<u8>> {
    let bytes = input.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = input
                .get(i + 1..i + 3)
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| CoreError::InvalidImageRef("Invalid URL encoding".to_string()))?;
            result.push(hex);
            i += 3;
        } else {
            result.push(bytes[i]);
            i += 1;
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_1X1: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8DwHwAFBQIAX8jx0gAAAABJRU5ErkJggg==";

    #[test]
    fn test_parse_data_uri() {
        let uri = format!("data:image/png;base64,{PNG_1X1}");
        let image = ImageRef::parse(&uri).expect("data uri");
        let buffer = image.as_resident().expect("resident");
        assert_eq!(buffer.mime_type(), "image/png");
        assert_eq!(&buffer.bytes()[0..4], &[0x89, 0x50, 0x4E, 0x47]);
    }

    #[test]
    fn test_parse_remote_url() {
        let image = ImageRef::parse("https://picsum.photos/id/48/1200/900").expect("url");
        assert!(image.is_remote());
        assert_eq!(image.to_uri(), "https://picsum.photos/id/48/1200/900");
    }

    #[test]
    fn test_invalid_refs() {
        assert!(ImageRef::parse("not a reference").is_err());
        assert!(ImageRef::parse("data:image/png").is_err()); // Missing comma
        assert!(ImageRef::parse("data:image/png;base64,@@@").is_err());
    }

    #[test]
    fn test_percent_encoded_data_uri() {
        let buffer = ImageBuffer::from_data_uri("data:text/plain,a%20b").expect("decode");
        assert_eq!(buffer.bytes(), b"a b");
        assert!(ImageBuffer::from_data_uri("data:text/plain,%zz").is_err());
    }

    #[test]
    fn test_buffer_equality_is_identity() {
        let a = ImageBuffer::png(vec![1, 2, 3]);
        let b = ImageBuffer::png(vec![1, 2, 3]);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_data_uri_round_trip_preserves_bytes() {
        let original = ImageBuffer::png(vec![9, 8, 7, 6]);
        let parsed = ImageBuffer::from_data_uri(&original.to_data_uri()).expect("parse");
        assert_eq!(parsed.bytes(), original.bytes());
        assert_eq!(parsed.mime_type(), PNG_MIME);
    }
}
