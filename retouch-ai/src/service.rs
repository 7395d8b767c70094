//! The external image-editing service seam.

use async_trait::async_trait;

use crate::error::ServiceError;

/// One image-editing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRequest {
    /// Encoded source image.
    pub image_bytes: Vec<u8>,
    /// MIME type of `image_bytes`.
    pub mime_type: String,
    /// Natural-language instruction for the model.
    pub instruction: String,
}

/// A successful service reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceResponse {
    /// Encoded result image.
    pub image_bytes: Vec<u8>,
    /// MIME type of `image_bytes`.
    pub mime_type: String,
}

/// An image-in, image-out model endpoint.
#[async_trait]
pub trait AiService: Send + Sync {
    /// Send `request` and return the edited image.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError`] classified as rate-limited, network or
    /// unknown. A reply without image data is an unknown error.
    async fn edit_image(&self, request: &ServiceRequest) -> Result<ServiceResponse, ServiceError>;
}

/// Service used when no endpoint is configured. Every call fails with a
/// network error, so callers take their fallback path.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineService;

#[async_trait]
impl AiService for OfflineService {
    async fn edit_image(&self, _request: &ServiceRequest) -> Result<ServiceResponse, ServiceError> {
        Err(ServiceError::network("no image service configured"))
    }
}
