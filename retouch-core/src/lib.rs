//! # Retouch Core
//!
//! Edit-state model for the Retouch image editor.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                retouch-core                 │
//! ├─────────────────────────────────────────────┤
//! │  Edit State      │  History                 │
//! │  - Adjustments   │  - Bounded undo stack    │
//! │  - Geometry      │  - Redo stack            │
//! │  - Image ref     │                          │
//! ├─────────────────────────────────────────────┤
//! │  Pipeline        │  Stroke Capture          │
//! │  - Filter chain  │  - Idle/Capturing/       │
//! │  - Geometry      │    Committed             │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Every [`EditState`] is a value: actions produce a new state instead of
//! mutating the old one, so history snapshots can be retained freely.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod filter;
pub mod history;
pub mod image_ref;
pub mod pipeline;
pub mod state;
pub mod stroke;

pub use error::{CoreError, CoreResult};
pub use filter::{FilterKind, FilterOp, FilterPreset};
pub use history::{HistoryManager, DEFAULT_HISTORY_CAPACITY};
pub use image_ref::{ImageBuffer, ImageRef};
pub use pipeline::{compose, EffectDescriptor, FilterChain, Geometry};
pub use state::{Background, CropRatio, EditAction, EditState, UpscaleLevel};
pub use stroke::{BrushSize, CapturePhase, EraserStroke, StrokeCapture, StrokePoint};

/// Retouch core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
