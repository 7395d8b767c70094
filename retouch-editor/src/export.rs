//! Export artifacts and their filenames.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use retouch_core::UpscaleLevel;
use retouch_renderer::ExportedRaster;

use crate::error::EditorResult;

/// Filename prefix for exported images.
pub const EXPORT_PREFIX: &str = "retouch_export";

/// `retouch_export_<millis>.png`, or `retouch_export_<millis>_<n>x.png`
/// when the image was upscaled.
#[must_use]
pub fn export_filename(timestamp_millis: u128, upscale: UpscaleLevel) -> String {
    match upscale {
        UpscaleLevel::X1 => format!("{EXPORT_PREFIX}_{timestamp_millis}.png"),
        level => format!("{EXPORT_PREFIX}_{timestamp_millis}_{level}.png"),
    }
}

/// Milliseconds since the Unix epoch, or zero if the clock is before it.
#[must_use]
pub fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis())
}

/// An encoded PNG ready to hand to a download collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    /// Suggested filename.
    pub filename: String,
    /// PNG bytes.
    pub bytes: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl ExportArtifact {
    /// Label a composited raster.
    #[must_use]
    pub fn new(raster: ExportedRaster, timestamp_millis: u128, upscale: UpscaleLevel) -> Self {
        Self {
            filename: export_filename(timestamp_millis, upscale),
            bytes: raster.bytes,
            width: raster.width,
            height: raster.height,
        }
    }

    /// Write the artifact into `dir` under its filename.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EditorError::Io`] if the file cannot be written.
    pub fn write_to(&self, dir: &Path) -> EditorResult<PathBuf> {
        let path = dir.join(&self.filename);
        std::fs::write(&path, &self.bytes)?;
        tracing::info!(path = %path.display(), bytes = self.bytes.len(), "Export written");
        Ok(path)
    }
}
