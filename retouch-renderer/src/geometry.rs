//! Output bounds and placement for the export transform.

use retouch_core::Geometry;

/// Size of the canvas that holds a `width`x`height` image rotated by
/// `degrees`: `w·|cos θ| + h·|sin θ|` by `w·|sin θ| + h·|cos θ|`, rounded.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn rotated_bounds(width: u32, height: u32, degrees: i32) -> (u32, u32) {
    let theta = f64::from(degrees).to_radians();
    let (sin, cos) = (theta.sin().abs(), theta.cos().abs());
    let (w, h) = (f64::from(width), f64::from(height));
    let out_w = w.mul_add(cos, h * sin).round();
    let out_h = w.mul_add(sin, h * cos).round();
    (out_w as u32, out_h as u32)
}

/// Where and how the source is drawn onto the output canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Output canvas width.
    pub canvas_width: u32,
    /// Output canvas height.
    pub canvas_height: u32,
    /// Rotation and mirroring about the canvas centre.
    pub geometry: Geometry,
}

impl Placement {
    /// Placement for a `width`x`height` source under `geometry`.
    #[must_use]
    pub fn for_source(width: u32, height: u32, geometry: Geometry) -> Self {
        let (canvas_width, canvas_height) =
            rotated_bounds(width, height, geometry.rotation_degrees);
        Self {
            canvas_width,
            canvas_height,
            geometry,
        }
    }

    /// Whether rotation lands on a quarter turn, so pixels map one to one.
    #[must_use]
    pub fn is_axis_aligned(&self) -> bool {
        self.geometry.rotation_degrees.rem_euclid(90) == 0
    }
}
