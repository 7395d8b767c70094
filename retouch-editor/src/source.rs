//! Resolving image references to encoded bytes.
//!
//! Resident buffers resolve to themselves. Remote references are fetched
//! over HTTP; the MIME type comes from `Content-Type` when the server sends
//! an image type, otherwise it is sniffed from the bytes.

use std::path::Path;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use retouch_core::{ImageBuffer, ImageRef};
use retouch_renderer::image::ImageFormat;
use retouch_renderer::RenderError;

use crate::error::{EditorError, EditorResult};

/// Turns an [`ImageRef`] into bytes the renderer can decode.
#[async_trait]
pub trait SourceResolver: Send + Sync {
    /// Fetch or borrow the raster behind `image`.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Encoding`] with [`RenderError::Unreadable`] if a
    /// remote image cannot be fetched.
    async fn resolve(&self, image: &ImageRef) -> EditorResult<ImageBuffer>;
}

/// [`SourceResolver`] that downloads remote references with `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct HttpSourceResolver {
    http: Client,
}

impl HttpSourceResolver {
    /// Create a resolver with its own HTTP client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SourceResolver for HttpSourceResolver {
    async fn resolve(&self, image: &ImageRef) -> EditorResult<ImageBuffer> {
        let url = match image {
            ImageRef::Resident(buffer) => return Ok(buffer.clone()),
            ImageRef::Remote(url) => url,
        };

        tracing::debug!(%url, "Fetching source image");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(unreadable)?;

        let declared = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.split(';').next().unwrap_or(value).trim().to_string())
            .filter(|mime| mime.starts_with("image/"));

        let bytes = response
            .bytes()
            .await
            .map_err(unreadable)?;
        let mime = declared.unwrap_or_else(|| ImageFormat::from_magic_bytes(&bytes).mime_type().to_string());

        tracing::debug!(%url, bytes = bytes.len(), %mime, "Source image fetched");
        Ok(ImageBuffer::new(bytes.to_vec(), mime))
    }
}

/// Read a local image file into a resident buffer.
///
/// # Errors
///
/// Returns [`EditorError::Io`] if the file cannot be read.
pub fn buffer_from_file(path: &Path) -> EditorResult<ImageBuffer> {
    let bytes = std::fs::read(path)?;
    let mut format = ImageFormat::from_magic_bytes(&bytes);
    if format == ImageFormat::Unknown {
        format = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(ImageFormat::Unknown, ImageFormat::from_extension);
    }
    Ok(ImageBuffer::new(bytes, format.mime_type()))
}

fn unreadable(err: reqwest::Error) -> EditorError {
    EditorError::Encoding(RenderError::Unreadable(err.to_string()))
}
