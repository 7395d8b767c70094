//! Filter operations and the fixed preset catalog.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A single colour or blur operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterKind {
    /// Desaturate toward luminance (percent).
    Grayscale,
    /// Sepia tone (percent).
    Sepia,
    /// Saturation multiplier (percent, 100 = unchanged).
    Saturate,
    /// Hue rotation (degrees).
    HueRotate,
    /// Colour inversion (percent).
    Invert,
    /// Linear brightness multiplier (percent, 100 = unchanged).
    Brightness,
    /// Contrast around mid-grey (percent, 100 = unchanged).
    Contrast,
    /// Gaussian blur (pixel standard deviation).
    Blur,
}

impl FilterKind {
    /// The operation name as it appears in a descriptor string.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Grayscale => "grayscale",
            Self::Sepia => "sepia",
            Self::Saturate => "saturate",
            Self::HueRotate => "hue-rotate",
            Self::Invert => "invert",
            Self::Brightness => "brightness",
            Self::Contrast => "contrast",
            Self::Blur => "blur",
        }
    }

    /// Unit suffix of the magnitude.
    #[must_use]
    pub const fn unit(self) -> &'static str {
        match self {
            Self::HueRotate => "deg",
            Self::Blur => "px",
            _ => "%",
        }
    }
}

/// An `(operation, magnitude)` pair. The magnitude is expressed in the
/// operation's own unit: percent, degrees or pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterOp {
    /// Operation to apply.
    pub kind: FilterKind,
    /// Magnitude in the unit given by [`FilterKind::unit`].
    pub magnitude: f32,
}

impl FilterOp {
    /// Create a new filter operation.
    #[must_use]
    pub const fn new(kind: FilterKind, magnitude: f32) -> Self {
        Self { kind, magnitude }
    }

    /// Magnitude as a fraction for percent-based operations (100% = 1.0).
    #[must_use]
    pub fn fraction(&self) -> f32 {
        self.magnitude / 100.0
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.kind.name())?;
        if self.magnitude.fract() == 0.0 {
            #[allow(clippy::cast_possible_truncation)]
            let whole = self.magnitude as i64;
            write!(f, "{whole}")?;
        } else {
            write!(f, "{}", self.magnitude)?;
        }
        write!(f, "{})", self.kind.unit())
    }
}

const GRAYSCALE: &[FilterOp] = &[FilterOp::new(FilterKind::Grayscale, 100.0)];
const SEPIA: &[FilterOp] = &[FilterOp::new(FilterKind::Sepia, 100.0)];
const VINTAGE: &[FilterOp] = &[
    FilterOp::new(FilterKind::Sepia, 50.0),
    FilterOp::new(FilterKind::Contrast, 120.0),
    FilterOp::new(FilterKind::Saturate, 80.0),
];
const COOL: &[FilterOp] = &[
    FilterOp::new(FilterKind::HueRotate, 180.0),
    FilterOp::new(FilterKind::Saturate, 150.0),
];
const WARM: &[FilterOp] = &[
    FilterOp::new(FilterKind::Sepia, 30.0),
    FilterOp::new(FilterKind::Saturate, 140.0),
    FilterOp::new(FilterKind::HueRotate, -10.0),
];
const INVERT: &[FilterOp] = &[FilterOp::new(FilterKind::Invert, 100.0)];
const BLUR: &[FilterOp] = &[FilterOp::new(FilterKind::Blur, 2.0)];

/// The fixed catalog of one-click filter presets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterPreset {
    /// No preset effect.
    #[default]
    None,
    /// Full grayscale.
    Grayscale,
    /// Full sepia.
    Sepia,
    /// Faded sepia with extra contrast.
    Vintage,
    /// Blue-shifted, saturated.
    Cool,
    /// Warm tint.
    Warm,
    /// Inverted colours.
    Invert,
    /// Soft blur.
    Blur,
}

impl FilterPreset {
    /// Every preset, in catalog order.
    pub const ALL: [Self; 8] = [
        Self::None,
        Self::Grayscale,
        Self::Sepia,
        Self::Vintage,
        Self::Cool,
        Self::Warm,
        Self::Invert,
        Self::Blur,
    ];

    /// The preset's fixed operation list.
    #[must_use]
    pub const fn ops(self) -> &'static [FilterOp] {
        match self {
            Self::None => &[],
            Self::Grayscale => GRAYSCALE,
            Self::Sepia => SEPIA,
            Self::Vintage => VINTAGE,
            Self::Cool => COOL,
            Self::Warm => WARM,
            Self::Invert => INVERT,
            Self::Blur => BLUR,
        }
    }

    /// The preset's fixed effect descriptor string.
    #[must_use]
    pub const fn descriptor(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Grayscale => "grayscale(100%)",
            Self::Sepia => "sepia(100%)",
            Self::Vintage => "sepia(50%) contrast(120%) saturate(80%)",
            Self::Cool => "hue-rotate(180deg) saturate(150%)",
            Self::Warm => "sepia(30%) saturate(140%) hue-rotate(-10deg)",
            Self::Invert => "invert(100%)",
            Self::Blur => "blur(2px)",
        }
    }

    /// Identifier used in scripts and serialized state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Grayscale => "grayscale",
            Self::Sepia => "sepia",
            Self::Vintage => "vintage",
            Self::Cool => "cool",
            Self::Warm => "warm",
            Self::Invert => "invert",
            Self::Blur => "blur",
        }
    }
}

impl fmt::Display for FilterPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterPreset {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|preset| preset.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::UnknownVariant {
                kind: "filter preset",
                value: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_matches_ops() {
        for preset in FilterPreset::ALL {
            let rendered: Vec<String> = preset.ops().iter().map(ToString::to_string).collect();
            assert_eq!(rendered.join(" "), preset.descriptor(), "{preset}");
        }
    }

    #[test]
    fn test_op_display_units() {
        assert_eq!(FilterOp::new(FilterKind::Brightness, 100.0).to_string(), "brightness(100%)");
        assert_eq!(FilterOp::new(FilterKind::HueRotate, -10.0).to_string(), "hue-rotate(-10deg)");
        assert_eq!(FilterOp::new(FilterKind::Blur, 0.0).to_string(), "blur(0px)");
        assert_eq!(FilterOp::new(FilterKind::Sepia, 12.5).to_string(), "sepia(12.5%)");
    }

    #[test]
    fn test_preset_parsing() {
        assert_eq!("vintage".parse::<FilterPreset>().unwrap(), FilterPreset::Vintage);
        assert_eq!("Cool".parse::<FilterPreset>().unwrap(), FilterPreset::Cool);
        assert!("lomo".parse::<FilterPreset>().is_err());
    }

    #[test]
    fn test_fraction() {
        assert!((FilterOp::new(FilterKind::Contrast, 120.0).fraction() - 1.2).abs() < f32::EPSILON);
    }
}
