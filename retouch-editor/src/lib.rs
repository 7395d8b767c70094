//! # Retouch Editor
//!
//! Editing sessions over the Retouch core, renderer and AI gateway.
//!
//! ```text
//! ┌────────────────────────────────────────────────┐
//! │                 EditorSession                  │
//! │  apply/undo/redo/reset   pointer events        │
//! │  remove_background  erase_region  upscale      │
//! │  export                                        │
//! ├──────────────┬─────────────────┬───────────────┤
//! │ retouch-core │ retouch-renderer│ retouch-ai    │
//! │ state+history│ compositor      │ gateway+retry │
//! └──────────────┴─────────────────┴───────────────┘
//! ```
//!
//! The `retouch` binary runs a JSON edit script headlessly and writes the
//! export next to a JSON dump of the final state.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod events;
pub mod export;
pub mod script;
pub mod session;
pub mod source;

pub use config::{BrushConfig, EditorConfig, HistoryConfig};
pub use error::{EditorError, EditorResult};
pub use events::{AsyncOperation, EditorEvent};
pub use export::{export_filename, ExportArtifact};
pub use script::{parse_script, run_script, ScriptStep, ToolStep};
pub use session::{BackgroundOutcome, EditorSession};
pub use source::{buffer_from_file, HttpSourceResolver, SourceResolver};
