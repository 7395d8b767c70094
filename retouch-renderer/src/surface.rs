//! Raster surfaces.
//!
//! A [`RasterSurface`] is the only place pixels are decoded, drawn and
//! encoded. The compositor holds no device state of its own; swap the
//! surface to target a different backend.

use image::RgbaImage;
use retouch_core::FilterChain;
use tiny_skia::{FilterQuality, IntSize, Pixmap, PixmapPaint, Transform};

use crate::error::{RenderError, RenderResult};
use crate::geometry::Placement;

/// Load, draw and encode capability used by the compositor.
pub trait RasterSurface {
    /// Decode encoded bytes into a bitmap.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes cannot be decoded.
    fn load(&self, bytes: &[u8]) -> RenderResult<RgbaImage>;

    /// Draw `source` through `filters` onto a fresh canvas laid out by
    /// `placement`.
    ///
    /// # Errors
    ///
    /// Returns an error if the canvas cannot be created.
    fn draw(
        &self,
        source: &RgbaImage,
        filters: &FilterChain,
        placement: &Placement,
    ) -> RenderResult<RgbaImage>;

    /// Encode a bitmap for delivery.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    fn encode(&self, raster: &RgbaImage) -> RenderResult<Vec<u8>>;
}

/// CPU surface built on tiny-skia. Encodes PNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkiaSurface;

impl SkiaSurface {
    /// Create a new surface.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl RasterSurface for SkiaSurface {
    fn load(&self, bytes: &[u8]) -> RenderResult<RgbaImage> {
        crate::image::decode(bytes)
    }

    #[allow(clippy::cast_precision_loss)]
    fn draw(
        &self,
        source: &RgbaImage,
        filters: &FilterChain,
        placement: &Placement,
    ) -> RenderResult<RgbaImage> {
        let filtered = crate::filter::apply_chain(source, filters);
        let src = to_pixmap(&filtered)?;

        let mut canvas = Pixmap::new(placement.canvas_width, placement.canvas_height).ok_or(
            RenderError::InvalidDimensions {
                width: placement.canvas_width,
                height: placement.canvas_height,
            },
        )?;

        let geometry = placement.geometry;
        let (sx, sy) = geometry.scale();
        // Translate to canvas centre, rotate, mirror, then centre the source on the origin.
        let transform = Transform::from_translate(
            placement.canvas_width as f32 / 2.0,
            placement.canvas_height as f32 / 2.0,
        )
        .pre_concat(Transform::from_rotate(geometry.rotation_degrees as f32))
        .pre_concat(Transform::from_scale(sx, sy))
        .pre_concat(Transform::from_translate(
            -(src.width() as f32) / 2.0,
            -(src.height() as f32) / 2.0,
        ));

        let paint = PixmapPaint {
            quality: if placement.is_axis_aligned() {
                FilterQuality::Nearest
            } else {
                FilterQuality::Bilinear
            },
            ..PixmapPaint::default()
        };
        canvas.draw_pixmap(0, 0, src.as_ref(), &paint, transform, None);

        tracing::trace!(
            width = canvas.width(),
            height = canvas.height(),
            rotation = geometry.rotation_degrees,
            "Drew export canvas"
        );
        from_pixmap(&canvas)
    }

    fn encode(&self, raster: &RgbaImage) -> RenderResult<Vec<u8>> {
        crate::image::encode_png(raster)
    }
}

/// Copy a straight-alpha bitmap into a premultiplied pixmap.
fn to_pixmap(raster: &RgbaImage) -> RenderResult<Pixmap> {
    let (width, height) = raster.dimensions();
    let size = IntSize::from_wh(width, height)
        .ok_or(RenderError::InvalidDimensions { width, height })?;

    let mut data = raster.as_raw().clone();
    for px in data.chunks_exact_mut(4) {
        let alpha = u16::from(px[3]);
        for channel in &mut px[..3] {
            *channel = premultiply(*channel, alpha);
        }
    }

    Pixmap::from_vec(data, size)
        .ok_or_else(|| RenderError::Surface("Failed to create source pixmap".to_string()))
}

/// Copy a premultiplied pixmap back into a straight-alpha bitmap.
fn from_pixmap(pixmap: &Pixmap) -> RenderResult<RgbaImage> {
    let mut data = Vec::with_capacity(pixmap.data().len());
    for px in pixmap.pixels() {
        let c = px.demultiply();
        data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    RgbaImage::from_raw(pixmap.width(), pixmap.height(), data)
        .ok_or_else(|| RenderError::Surface("Pixmap size mismatch".to_string()))
}

#[allow(clippy::cast_possible_truncation)]
fn premultiply(channel: u8, alpha: u16) -> u8 {
    ((u16::from(channel) * alpha + 127) / 255) as u8
}
