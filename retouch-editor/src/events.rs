//! Session events.
//!
//! Events are broadcast to every subscriber; a subscriber that lags behind
//! loses the oldest events. Nothing in the session waits on receivers.

use retouch_ai::RetryNotice;
use retouch_core::UpscaleLevel;
use serde::Serialize;

/// The asynchronous operations guarded by the session permit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AsyncOperation {
    /// Background removal or restore.
    RemoveBackground,
    /// Clone-stamp erase of committed strokes.
    EraseRegion,
    /// Upscale bookkeeping.
    Upscale,
}

impl AsyncOperation {
    /// Stable name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RemoveBackground => "remove_background",
            Self::EraseRegion => "erase_region",
            Self::Upscale => "upscale",
        }
    }
}

impl std::fmt::Display for AsyncOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something observers of a session may want to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EditorEvent {
    /// An asynchronous operation acquired the permit.
    ProcessingStarted {
        /// Which operation.
        operation: AsyncOperation,
        /// Status text.
        message: String,
    },
    /// A rate-limited request will be retried.
    RetryScheduled {
        /// Attempt about to be made.
        next_attempt: u32,
        /// Total attempts allowed.
        max_attempts: u32,
        /// Backoff before the attempt.
        delay_ms: u64,
        /// Status text.
        message: String,
    },
    /// Background removal committed.
    BackgroundRemoved {
        /// `None` when the service produced the image, otherwise why the
        /// local fallback was used.
        fallback_reason: Option<String>,
    },
    /// The pre-removal image was swapped back in.
    BackgroundRestored,
    /// The permit was released.
    ProcessingFinished {
        /// Which operation.
        operation: AsyncOperation,
        /// Whether it committed a new state.
        success: bool,
    },
    /// Undo/redo availability changed.
    HistoryChanged {
        /// Undo is possible.
        can_undo: bool,
        /// Redo is possible.
        can_redo: bool,
        /// Snapshots on the undo stack.
        undo_len: usize,
        /// Snapshots on the redo stack.
        redo_len: usize,
    },
    /// The session went back to the original image and defaults.
    StateReset,
}

impl EditorEvent {
    pub(crate) fn started(operation: AsyncOperation, message: impl Into<String>) -> Self {
        Self::ProcessingStarted {
            operation,
            message: message.into(),
        }
    }

    pub(crate) fn retry(notice: RetryNotice) -> Self {
        Self::RetryScheduled {
            next_attempt: notice.next_attempt,
            max_attempts: notice.max_attempts,
            delay_ms: u64::try_from(notice.delay.as_millis()).unwrap_or(u64::MAX),
            message: format!(
                "AI busy. Retrying ({}/{})...",
                notice.next_attempt.saturating_sub(1),
                notice.max_attempts
            ),
        }
    }
}

/// Status text shown while removing the background.
pub(crate) const REMOVING_BACKGROUND: &str = "Removing background with AI...";
/// Status text shown while restoring the background.
pub(crate) const RESTORING_BACKGROUND: &str = "Restoring background...";
/// Status text shown while erasing.
pub(crate) const ERASING: &str = "Erasing object...";

/// Status text shown while upscaling.
pub(crate) fn upscaling(level: UpscaleLevel) -> String {
    format!("Upscaling image to {}x...", level.factor())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_retry_message_counts_retries() {
        let event = EditorEvent::retry(RetryNotice {
            next_attempt: 2,
            max_attempts: 3,
            delay: Duration::from_millis(2000),
        });
        match event {
            EditorEvent::RetryScheduled { message, delay_ms, .. } => {
                assert_eq!(message, "AI busy. Retrying (1/3)...");
                assert_eq!(delay_ms, 2000);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_event_json_is_tagged() {
        let json = serde_json::to_value(EditorEvent::started(AsyncOperation::Upscale, upscaling(UpscaleLevel::X4)))
            .unwrap();
        assert_eq!(json["type"], "processing_started");
        assert_eq!(json["operation"], "upscale");
        assert_eq!(json["message"], "Upscaling image to 4x...");
    }
}
