//! Export compositing.
//!
//! ```text
//! source bytes ──load──▶ bitmap ──draw(filters, placement)──▶ canvas ──encode──▶ PNG
//! ```

use retouch_core::EffectDescriptor;

use crate::error::RenderResult;
use crate::geometry::Placement;
use crate::surface::{RasterSurface, SkiaSurface};

/// An encoded export with its pixel size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedRaster {
    /// Encoded bytes (PNG for [`SkiaSurface`]).
    pub bytes: Vec<u8>,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
}

/// Bakes an [`EffectDescriptor`] into a source image.
#[derive(Debug, Clone, Default)]
pub struct RasterCompositor<S = SkiaSurface> {
    surface: S,
}

impl<S: RasterSurface> RasterCompositor<S> {
    /// Create a compositor drawing through `surface`.
    #[must_use]
    pub fn new(surface: S) -> Self {
        Self { surface }
    }

    /// The surface in use.
    #[must_use]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Render `source` with `descriptor` and encode the result.
    ///
    /// The output canvas is sized to contain the rotated image; filters are
    /// applied before the geometric transform.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be decoded or the output cannot
    /// be drawn or encoded. No partial output is produced.
    pub fn compose(
        &self,
        source: &[u8],
        descriptor: &EffectDescriptor,
    ) -> RenderResult<ExportedRaster> {
        let bitmap = self.surface.load(source)?;
        let placement = Placement::for_source(bitmap.width(), bitmap.height(), descriptor.geometry);

        tracing::debug!(
            source_width = bitmap.width(),
            source_height = bitmap.height(),
            width = placement.canvas_width,
            height = placement.canvas_height,
            filters = %descriptor.filter_chain,
            "Compositing export"
        );

        let canvas = self
            .surface
            .draw(&bitmap, &descriptor.filter_chain, &placement)?;
        let bytes = self.surface.encode(&canvas)?;

        Ok(ExportedRaster {
            bytes,
            width: canvas.width(),
            height: canvas.height(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use image::RgbaImage;
    use retouch_core::{FilterChain, Geometry};

    use super::*;
    use crate::error::RenderError;
    use crate::image::solid_color;

    /// Surface that records calls and produces blank canvases.
    #[derive(Default)]
    struct RecordingSurface {
        calls: Mutex<Vec<String>>,
        fail_load: bool,
    }

    impl RasterSurface for RecordingSurface {
        fn load(&self, bytes: &[u8]) -> RenderResult<RgbaImage> {
            self.calls.lock().unwrap().push(format!("load {}", bytes.len()));
            if self.fail_load {
                return Err(RenderError::Decode("tainted".to_string()));
            }
            Ok(solid_color(6, 4, [0, 0, 0, 255]))
        }

        fn draw(
            &self,
            _source: &RgbaImage,
            filters: &FilterChain,
            placement: &Placement,
        ) -> RenderResult<RgbaImage> {
            self.calls.lock().unwrap().push(format!(
                "draw {}x{} [{filters}]",
                placement.canvas_width, placement.canvas_height
            ));
            Ok(solid_color(placement.canvas_width, placement.canvas_height, [0; 4]))
        }

        fn encode(&self, raster: &RgbaImage) -> RenderResult<Vec<u8>> {
            self.calls.lock().unwrap().push("encode".to_string());
            Ok(vec![0; raster.width() as usize])
        }
    }

    #[test]
    fn test_compose_drives_surface_in_order() {
        let compositor = RasterCompositor::new(RecordingSurface::default());
        let descriptor = EffectDescriptor {
            filter_chain: FilterChain::default(),
            geometry: Geometry {
                rotation_degrees: 270,
                ..Geometry::default()
            },
        };

        let exported = compositor.compose(&[1, 2, 3], &descriptor).unwrap();
        assert_eq!((exported.width, exported.height), (4, 6));

        let calls = compositor.surface().calls.lock().unwrap().clone();
        assert_eq!(calls, vec!["load 3", "draw 4x6 []", "encode"]);
    }

    #[test]
    fn test_decode_failure_stops_pipeline() {
        let compositor = RasterCompositor::new(RecordingSurface {
            fail_load: true,
            ..RecordingSurface::default()
        });
        let result = compositor.compose(&[1], &EffectDescriptor::default());
        assert!(matches!(result, Err(RenderError::Decode(_))));
        assert_eq!(compositor.surface().calls.lock().unwrap().len(), 1);
    }
}
