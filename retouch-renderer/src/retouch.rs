//! Local, deterministic retouch heuristics.
//!
//! These stand in for real inpainting and segmentation: [`clone_stamp`]
//! hides brushed regions with pixels from beside them, and
//! [`radial_alpha_mask`] fades everything outside a central ellipse of
//! interest to transparent.

use image::RgbaImage;
use retouch_core::EraserStroke;

/// Horizontal clone offset as a multiple of the brush radius.
pub const CLONE_OFFSET_FACTOR: f32 = 3.0;

/// Fully opaque radius as a fraction of the shorter image side.
pub const MASK_INNER_FRACTION: f32 = 0.45;

/// Radius at which the mask reaches zero, as a multiple of the inner radius.
pub const MASK_OUTER_FACTOR: f32 = 1.5;

/// Ratio between natural image pixels and displayed pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayScale {
    /// Natural pixels per displayed pixel, horizontally.
    pub x: f32,
    /// Natural pixels per displayed pixel, vertically.
    pub y: f32,
}

impl DisplayScale {
    /// Unit scale: strokes are already in natural pixels.
    pub const IDENTITY: Self = Self { x: 1.0, y: 1.0 };

    /// Scale for an image of `natural` size shown at `displayed` size. A
    /// displayed dimension of zero or less counts as one pixel.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(natural: (u32, u32), displayed: (f32, f32)) -> Self {
        let dw = if displayed.0 > 0.0 { displayed.0 } else { 1.0 };
        let dh = if displayed.1 > 0.0 { displayed.1 } else { 1.0 };
        Self {
            x: natural.0 as f32 / dw,
            y: natural.1 as f32 / dh,
        }
    }
}

impl Default for DisplayScale {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Clone-stamp every point of every stroke.
///
/// For a point at `(x, y)` with radius `r` (both in natural pixels), each
/// destination pixel inside the circle takes the source pixel `3r` to its
/// right. Pixels whose clone source falls outside the image are left as
/// they are. Every stamp reads from the untouched `source`.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_possible_wrap
)]
pub fn clone_stamp(source: &RgbaImage, strokes: &[EraserStroke], scale: DisplayScale) -> RgbaImage {
    let mut dest = source.clone();
    let (width, height) = source.dimensions();
    let (w, h) = (width as i64, height as i64);

    for stroke in strokes {
        let radius = stroke.radius() * scale.x;
        if radius <= 0.0 {
            continue;
        }
        let offset = radius * CLONE_OFFSET_FACTOR;
        let radius_sq = radius * radius;

        for point in &stroke.points {
            let cx = point.x * scale.x;
            let cy = point.y * scale.y;

            let min_x = ((cx - radius).floor() as i64).max(0);
            let max_x = ((cx + radius).ceil() as i64).min(w - 1);
            let min_y = ((cy - radius).floor() as i64).max(0);
            let max_y = ((cy + radius).ceil() as i64).min(h - 1);

            for py in min_y..=max_y {
                for px in min_x..=max_x {
                    let dx = px as f32 + 0.5 - cx;
                    let dy = py as f32 + 0.5 - cy;
                    if dx * dx + dy * dy > radius_sq {
                        continue;
                    }
                    let src_x = (px as f32 + offset).round() as i64;
                    if src_x >= w {
                        continue;
                    }
                    let pixel = *source.get_pixel(src_x as u32, py as u32);
                    dest.put_pixel(px as u32, py as u32, pixel);
                }
            }
        }
    }

    dest
}

/// Fade alpha radially from the image centre.
///
/// Pixels within `0.45 · min(w, h)` of the centre keep their alpha; alpha
/// falls linearly to zero at `1.5×` that radius and stays zero beyond.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn radial_alpha_mask(source: &RgbaImage) -> RgbaImage {
    let mut out = source.clone();
    let (width, height) = source.dimensions();
    let cx = width as f32 / 2.0;
    let cy = height as f32 / 2.0;
    let inner = width.min(height) as f32 * MASK_INNER_FRACTION;
    let outer = inner * MASK_OUTER_FACTOR;

    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let dx = x as f32 + 0.5 - cx;
        let dy = y as f32 + 0.5 - cy;
        let distance = dx.hypot(dy);
        let coverage = if distance <= inner {
            1.0
        } else if distance >= outer {
            0.0
        } else {
            (outer - distance) / (outer - inner)
        };
        pixel.0[3] = (f32::from(pixel.0[3]) * coverage).round() as u8;
    }

    out
}
