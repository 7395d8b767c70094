//! Error types for editor sessions.

use retouch_ai::GatewayError;
use retouch_core::CoreError;
use retouch_renderer::RenderError;
use thiserror::Error;

/// Result type for editor operations.
pub type EditorResult<T> = Result<T, EditorError>;

/// Errors surfaced by [`crate::EditorSession`].
///
/// Service failures during background removal never appear here: they are
/// absorbed by the local fallback.
#[derive(Debug, Error)]
pub enum EditorError {
    /// Another asynchronous operation holds the session permit.
    #[error("Another operation is already in progress")]
    Busy,

    /// The source could not be fetched or decoded, or the result could not
    /// be encoded.
    #[error("Encoding error: {0}")]
    Encoding(RenderError),

    /// The image changed while an operation was running; its result was
    /// discarded.
    #[error("Image changed while the operation was running")]
    Superseded,

    /// Edit-state error (empty history, out-of-range value, stroke misuse).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Gateway error without a fallback.
    #[error(transparent)]
    Gateway(GatewayError),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EditorError {
    /// Whether retrying the same call later may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Busy | Self::Superseded)
    }
}

impl From<RenderError> for EditorError {
    fn from(err: RenderError) -> Self {
        Self::Encoding(err)
    }
}

impl From<GatewayError> for EditorError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Render(render) => Self::Encoding(render),
            GatewayError::Core(core) => Self::Core(core),
            other => Self::Gateway(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_render_errors_become_encoding() {
        let err = EditorError::from(GatewayError::Render(RenderError::Decode("bad".into())));
        assert!(matches!(err, EditorError::Encoding(RenderError::Decode(_))));

        let err = EditorError::from(GatewayError::Core(CoreError::InvalidUpscaleLevel(3)));
        assert!(matches!(err, EditorError::Core(CoreError::InvalidUpscaleLevel(3))));

        let err = EditorError::from(GatewayError::InvalidUrl("x".into()));
        assert!(matches!(err, EditorError::Gateway(_)));
    }

    #[test]
    fn test_retryable() {
        assert!(EditorError::Busy.is_retryable());
        assert!(!EditorError::Core(CoreError::EmptyHistory).is_retryable());
    }
}
