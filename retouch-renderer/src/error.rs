//! Renderer error types.

use thiserror::Error;

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that can occur while decoding, drawing or encoding rasters.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Source bytes could not be decoded into a bitmap.
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// Source bytes could not be obtained at all.
    #[error("Source image unreadable: {0}")]
    Unreadable(String),

    /// Bitmap could not be encoded.
    #[error("Failed to encode image: {0}")]
    Encode(String),

    /// Drawing surface could not be created or drawn into.
    #[error("Surface error: {0}")]
    Surface(String),

    /// A zero-sized or oversized raster was requested.
    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
}
