//! Composition of an edit state into an effect descriptor.
//!
//! The descriptor is the single source of truth for what the preview shows
//! and what export bakes in: an ordered filter chain plus the geometric
//! transform.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::filter::{FilterKind, FilterOp};
use crate::state::EditState;

/// Rotation and mirroring applied about the image centre.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    /// Rotation in degrees, positive = clockwise.
    pub rotation_degrees: i32,
    /// Mirror across the vertical axis.
    pub flip_horizontal: bool,
    /// Mirror across the horizontal axis.
    pub flip_vertical: bool,
}

impl Geometry {
    /// Rotation in radians.
    #[must_use]
    pub fn radians(&self) -> f64 {
        f64::from(self.rotation_degrees).to_radians()
    }

    /// Axis scale factors: `-1` where flipped, `1` otherwise.
    #[must_use]
    pub fn scale(&self) -> (f32, f32) {
        (
            if self.flip_horizontal { -1.0 } else { 1.0 },
            if self.flip_vertical { -1.0 } else { 1.0 },
        )
    }

    /// Whether this geometry leaves pixels where they are.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.rotation_degrees.rem_euclid(360) == 0 && !self.flip_horizontal && !self.flip_vertical
    }
}

/// An ordered list of filter operations, applied left to right.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterChain(Vec<FilterOp>);

impl FilterChain {
    /// Operations in application order.
    #[must_use]
    pub fn ops(&self) -> &[FilterOp] {
        &self.0
    }

    /// Number of operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the chain has no operations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<FilterOp>> for FilterChain {
    fn from(ops: Vec<FilterOp>) -> Self {
        Self(ops)
    }
}

impl fmt::Display for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for op in &self.0 {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{op}")?;
            first = false;
        }
        Ok(())
    }
}

/// Everything a renderer needs to reproduce the preview.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectDescriptor {
    /// Colour and blur operations.
    pub filter_chain: FilterChain,
    /// Rotation and mirroring.
    pub geometry: Geometry,
}

/// Build the effect descriptor for `state`.
///
/// Preset operations come first, then brightness, contrast, saturation and
/// blur, always in that order, so the preview and the export agree.
#[must_use]
pub fn compose(state: &EditState) -> EffectDescriptor {
    let mut ops: Vec<FilterOp> = state.filter().ops().to_vec();
    ops.extend([
        FilterOp::new(FilterKind::Brightness, f32::from(state.brightness())),
        FilterOp::new(FilterKind::Contrast, f32::from(state.contrast())),
        FilterOp::new(FilterKind::Saturate, f32::from(state.saturation())),
        FilterOp::new(FilterKind::Blur, f32::from(state.blur())),
    ]);

    EffectDescriptor {
        filter_chain: FilterChain(ops),
        geometry: Geometry {
            rotation_degrees: state.rotation(),
            flip_horizontal: state.flip_horizontal(),
            flip_vertical: state.flip_vertical(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterPreset;
    use crate::image_ref::ImageRef;
    use crate::state::EditAction;

    fn state() -> EditState {
        EditState::new(ImageRef::Remote("https://example.com/a.png".to_string()))
    }

    #[test]
    fn test_default_chain() {
        let descriptor = compose(&state());
        assert_eq!(
            descriptor.filter_chain.to_string(),
            "brightness(100%) contrast(100%) saturate(100%) blur(0px)"
        );
        assert!(descriptor.geometry.is_identity());
    }

    #[test]
    fn test_preset_precedes_adjustments() {
        let s = state()
            .apply(&EditAction::SetFilter(FilterPreset::Vintage))
            .unwrap()
            .apply(&EditAction::SetBrightness(120))
            .unwrap();
        assert_eq!(
            compose(&s).filter_chain.to_string(),
            "sepia(50%) contrast(120%) saturate(80%) brightness(120%) contrast(100%) saturate(100%) blur(0px)"
        );
    }

    #[test]
    fn test_geometry_reflects_state() {
        let s = state()
            .apply(&EditAction::RotateRight)
            .unwrap()
            .apply(&EditAction::FlipVertical)
            .unwrap();
        let geometry = compose(&s).geometry;
        assert_eq!(geometry.rotation_degrees, 90);
        assert_eq!(geometry.scale(), (1.0, -1.0));
        assert!(!geometry.is_identity());
    }

    #[test]
    fn test_full_turn_is_identity() {
        let geometry = Geometry {
            rotation_degrees: -360,
            ..Geometry::default()
        };
        assert!(geometry.is_identity());
    }
}
