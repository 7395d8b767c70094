//! Error types for the AI tool gateway.

use std::fmt;

use retouch_core::CoreError;
use retouch_renderer::RenderError;
use thiserror::Error;

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Markers in a service message that identify a quota or rate-limit failure.
const RATE_LIMIT_MARKERS: [&str; 3] = ["429", "quota", "RESOURCE_EXHAUSTED"];

/// Failure class reported by the external image service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorKind {
    /// Quota or rate limit hit. The only retryable class.
    RateLimited,
    /// Connection, DNS or timeout failure.
    Network,
    /// Anything else, including a response without an image.
    Unknown,
}

impl fmt::Display for ServiceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::RateLimited => "rate limited",
            Self::Network => "network error",
            Self::Unknown => "service error",
        })
    }
}

/// An error returned by an [`crate::AiService`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct ServiceError {
    /// Failure class, used for retry decisions.
    pub kind: ServiceErrorKind,
    /// Message from the service or transport.
    pub message: String,
}

impl ServiceError {
    /// Create an error of the given kind.
    #[must_use]
    pub fn new(kind: ServiceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// A rate-limit error.
    #[must_use]
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::RateLimited, message)
    }

    /// A network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Network, message)
    }

    /// An unclassified service error.
    #[must_use]
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Unknown, message)
    }

    /// Classify a raw service message: anything mentioning `429`, `quota` or
    /// `RESOURCE_EXHAUSTED` is a rate limit, everything else is unknown.
    #[must_use]
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let kind = if RATE_LIMIT_MARKERS.iter().any(|m| message.contains(m)) {
            ServiceErrorKind::RateLimited
        } else {
            ServiceErrorKind::Unknown
        };
        Self { kind, message }
    }

    /// Returns true if this error is retryable (rate limit or quota).
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind == ServiceErrorKind::RateLimited
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.status() == Some(reqwest::StatusCode::TOO_MANY_REQUESTS) {
            Self::rate_limited(err.to_string())
        } else if err.is_connect() || err.is_timeout() {
            Self::network(err.to_string())
        } else {
            Self::from_message(err.to_string())
        }
    }
}

/// Errors that can occur in gateway operations that have no fallback.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The service URL provided by configuration is invalid.
    #[error("invalid service URL: {0}")]
    InvalidUrl(String),

    /// HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Image could not be decoded or encoded.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Invalid edit-state input.
    #[error(transparent)]
    Core(#[from] CoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_classification() {
        assert!(ServiceError::from_message("HTTP 429 Too Many Requests").is_retryable());
        assert!(ServiceError::from_message("You exceeded your current quota").is_retryable());
        assert!(ServiceError::from_message("status: RESOURCE_EXHAUSTED").is_retryable());
        assert!(!ServiceError::from_message("model not found").is_retryable());
        assert_eq!(
            ServiceError::from_message("Quota").kind,
            ServiceErrorKind::Unknown,
            "classification is case-sensitive"
        );
    }

    #[test]
    fn test_only_rate_limit_is_retryable() {
        assert!(ServiceError::rate_limited("x").is_retryable());
        assert!(!ServiceError::network("x").is_retryable());
        assert!(!ServiceError::unknown("x").is_retryable());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            ServiceError::network("connection refused").to_string(),
            "network error: connection refused"
        );
    }
}
