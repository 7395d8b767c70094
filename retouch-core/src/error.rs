//! Error types for edit-state operations.

use thiserror::Error;

/// Result type for edit-state operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in edit-state operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Undo requested with an empty undo stack.
    #[error("Nothing to undo")]
    EmptyHistory,

    /// Redo requested with an empty redo stack.
    #[error("Nothing to redo")]
    EmptyRedo,

    /// An adjustment value fell outside its domain.
    #[error("{field} out of range: {value} (expected {min}..={max})")]
    OutOfRange {
        /// Name of the adjusted field.
        field: &'static str,
        /// Rejected value.
        value: i64,
        /// Inclusive lower bound.
        min: i64,
        /// Inclusive upper bound.
        max: i64,
    },

    /// Upscale level outside {1, 2, 4}.
    #[error("Invalid upscale level: {0}")]
    InvalidUpscaleLevel(u8),

    /// Image reference could not be parsed.
    #[error("Invalid image reference: {0}")]
    InvalidImageRef(String),

    /// Unknown crop ratio or filter preset name.
    #[error("Unknown {kind}: {value}")]
    UnknownVariant {
        /// What was being parsed.
        kind: &'static str,
        /// The unrecognized input.
        value: String,
    },

    /// The masking tool is not active.
    #[error("Masking tool is not active")]
    ToolInactive,

    /// Stroke capture received an event that is invalid in its current phase.
    #[error("Cannot {action} while stroke capture is {phase}")]
    StrokeTransition {
        /// Attempted transition.
        action: &'static str,
        /// Phase the capture was in.
        phase: &'static str,
    },

    /// State serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
