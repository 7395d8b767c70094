//! # Retouch Renderer
//!
//! Raster side of the Retouch editor: turns an [`retouch_core::EffectDescriptor`]
//! into pixels.
//!
//! ## Pipeline
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │          RasterCompositor<S>                │
//! ├─────────────────────────────────────────────┤
//! │            RasterSurface trait              │
//! ├──────────────────────┬──────────────────────┤
//! │ SkiaSurface          │ test surfaces        │
//! │ (tiny-skia + image)  │                      │
//! └──────────────────────┴──────────────────────┘
//! ```
//!
//! The [`retouch`] module holds the local heuristics used by the AI tool
//! gateway: clone-stamp erasing and the radial background mask.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod compositor;
pub mod error;
pub mod filter;
pub mod geometry;
pub mod image;
pub mod retouch;
pub mod surface;

pub use compositor::{ExportedRaster, RasterCompositor};
pub use error::{RenderError, RenderResult};
pub use geometry::{rotated_bounds, Placement};
pub use retouch::{clone_stamp, radial_alpha_mask, DisplayScale};
pub use surface::{RasterSurface, SkiaSurface};
