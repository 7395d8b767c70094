//! Session configuration.
//!
//! Every field has a default, so a partial JSON file only overrides what it
//! names:
//!
//! ```json
//! { "retry": { "max_attempts": 5 }, "gateway": { "upscale_delay_ms": 0 } }
//! ```

use std::path::Path;

use retouch_ai::{GatewayConfig, RetryPolicy};
use retouch_core::stroke::DEFAULT_BRUSH_SIZE;
use retouch_core::DEFAULT_HISTORY_CAPACITY;
use serde::{Deserialize, Serialize};

use crate::error::EditorResult;

/// Capacity of the session event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 100;

/// Undo history settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum undo snapshots kept.
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

/// Masking brush settings. The allowed range is fixed at 5..=100 px.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrushConfig {
    /// Initial brush diameter in display pixels.
    pub default_size: u32,
}

impl Default for BrushConfig {
    fn default() -> Self {
        Self {
            default_size: DEFAULT_BRUSH_SIZE,
        }
    }
}

/// Everything an [`crate::EditorSession`] can be tuned with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Undo history.
    pub history: HistoryConfig,
    /// Masking brush.
    pub brush: BrushConfig,
    /// Background-removal retry policy.
    pub retry: RetryPolicy,
    /// AI tool timings and instruction text.
    pub gateway: GatewayConfig,
    /// Buffered events per subscriber before the oldest are dropped.
    pub event_capacity: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history: HistoryConfig::default(),
            brush: BrushConfig::default(),
            retry: RetryPolicy::default(),
            gateway: GatewayConfig::default(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl EditorConfig {
    /// Parse a (possibly partial) JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EditorError::Core`] if the JSON is malformed.
    pub fn from_json(json: &str) -> EditorResult<Self> {
        Ok(serde_json::from_str(json).map_err(retouch_core::CoreError::from)?)
    }

    /// Read a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EditorError::Io`] if the file cannot be read, or a
    /// parse error as for [`EditorConfig::from_json`].
    pub fn load(path: &Path) -> EditorResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
