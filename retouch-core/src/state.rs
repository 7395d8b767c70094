//! The edit-state value and the actions that replace it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::filter::FilterPreset;
use crate::image_ref::ImageRef;

/// Neutral value of brightness, contrast and saturation (percent).
pub const NEUTRAL_ADJUSTMENT: u8 = 100;

/// Upper bound of brightness, contrast and saturation (percent).
pub const MAX_ADJUSTMENT: u8 = 200;

/// Upper bound of the blur radius (pixels).
pub const MAX_BLUR: u8 = 10;

/// Degrees added or removed by one rotate action.
pub const ROTATION_STEP: i32 = 90;

/// Display aspect-ratio hint. Never removes pixels on export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CropRatio {
    /// Keep the source aspect ratio.
    #[default]
    #[serde(rename = "free", alias = "original")]
    Free,
    /// 1:1
    #[serde(rename = "1:1")]
    Square,
    /// 9:16
    #[serde(rename = "9:16")]
    Portrait,
    /// 16:9
    #[serde(rename = "16:9")]
    Landscape,
}

impl CropRatio {
    /// Width and height terms of the ratio, `None` for [`CropRatio::Free`].
    #[must_use]
    pub const fn aspect(self) -> Option<(u32, u32)> {
        match self {
            Self::Free => None,
            Self::Square => Some((1, 1)),
            Self::Portrait => Some((9, 16)),
            Self::Landscape => Some((16, 9)),
        }
    }

    /// Identifier used in scripts and serialized state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Square => "1:1",
            Self::Portrait => "9:16",
            Self::Landscape => "16:9",
        }
    }
}

impl fmt::Display for CropRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CropRatio {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "free" | "original" => Ok(Self::Free),
            "1:1" => Ok(Self::Square),
            "9:16" => Ok(Self::Portrait),
            "16:9" => Ok(Self::Landscape),
            other => Err(CoreError::UnknownVariant {
                kind: "crop ratio",
                value: other.to_string(),
            }),
        }
    }
}

/// Recorded upscale factor. Metadata only; pixels are never resampled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum UpscaleLevel {
    /// Native resolution.
    #[default]
    X1,
    /// 2x.
    X2,
    /// 4x.
    X4,
}

impl UpscaleLevel {
    /// The numeric factor.
    #[must_use]
    pub const fn factor(self) -> u8 {
        match self {
            Self::X1 => 1,
            Self::X2 => 2,
            Self::X4 => 4,
        }
    }
}

impl TryFrom<u8> for UpscaleLevel {
    type Error = CoreError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::X1),
            2 => Ok(Self::X2),
            4 => Ok(Self::X4),
            other => Err(CoreError::InvalidUpscaleLevel(other)),
        }
    }
}

impl From<UpscaleLevel> for u8 {
    fn from(level: UpscaleLevel) -> Self {
        level.factor()
    }
}

impl fmt::Display for UpscaleLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.factor())
    }
}

/// Background-removal status.
///
/// The pre-removal image lives inside the `Removed` variant, so any state
/// that reports a removed background can always be restored, including
/// states brought back by undo or redo.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Background {
    /// Background untouched.
    #[default]
    Intact,
    /// Background removed; `original` is the image before removal.
    Removed {
        /// Image to restore.
        original: ImageRef,
    },
}

/// A user action that replaces the edit state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "value", rename_all = "snake_case")]
pub enum EditAction {
    /// Set brightness (0..=200 percent).
    SetBrightness(u8),
    /// Set contrast (0..=200 percent).
    SetContrast(u8),
    /// Set saturation (0..=200 percent).
    SetSaturation(u8),
    /// Set blur radius (0..=10 px).
    SetBlur(u8),
    /// Rotate 90 degrees counter-clockwise.
    RotateLeft,
    /// Rotate 90 degrees clockwise.
    RotateRight,
    /// Toggle the horizontal flip.
    FlipHorizontal,
    /// Toggle the vertical flip.
    FlipVertical,
    /// Change the display aspect-ratio hint.
    SetCropRatio(CropRatio),
    /// Select a filter preset.
    SetFilter(FilterPreset),
}

/// Complete description of the current edit parameters for one image.
///
/// Fields are private: a state is never changed in place. Every action
/// produces a new value through [`EditState::apply`] or one of the `with_*`
/// constructors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditState {
    image: ImageRef,
    brightness: u8,
    contrast: u8,
    saturation: u8,
    blur: u8,
    rotation: i32,
    flip_horizontal: bool,
    flip_vertical: bool,
    crop_ratio: CropRatio,
    filter: FilterPreset,
    background: Background,
    upscale: UpscaleLevel,
}

impl EditState {
    /// Initial state for a freshly opened source image.
    #[must_use]
    pub fn new(image: ImageRef) -> Self {
        Self {
            image,
            brightness: NEUTRAL_ADJUSTMENT,
            contrast: NEUTRAL_ADJUSTMENT,
            saturation: NEUTRAL_ADJUSTMENT,
            blur: 0,
            rotation: 0,
            flip_horizontal: false,
            flip_vertical: false,
            crop_ratio: CropRatio::Free,
            filter: FilterPreset::None,
            background: Background::Intact,
            upscale: UpscaleLevel::X1,
        }
    }

    /// Current source raster.
    #[must_use]
    pub fn image(&self) -> &ImageRef {
        &self.image
    }

    /// Brightness percent.
    #[must_use]
    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    /// Contrast percent.
    #[must_use]
    pub fn contrast(&self) -> u8 {
        self.contrast
    }

    /// Saturation percent.
    #[must_use]
    pub fn saturation(&self) -> u8 {
        self.saturation
    }

    /// Blur radius in pixels.
    #[must_use]
    pub fn blur(&self) -> u8 {
        self.blur
    }

    /// Accumulated rotation in degrees. Not reduced modulo 360.
    #[must_use]
    pub fn rotation(&self) -> i32 {
        self.rotation
    }

    /// Horizontal flip flag.
    #[must_use]
    pub fn flip_horizontal(&self) -> bool {
        self.flip_horizontal
    }

    /// Vertical flip flag.
    #[must_use]
    pub fn flip_vertical(&self) -> bool {
        self.flip_vertical
    }

    /// Display aspect-ratio hint.
    #[must_use]
    pub fn crop_ratio(&self) -> CropRatio {
        self.crop_ratio
    }

    /// Active filter preset.
    #[must_use]
    pub fn filter(&self) -> FilterPreset {
        self.filter
    }

    /// Background-removal status.
    #[must_use]
    pub fn background(&self) -> &Background {
        &self.background
    }

    /// Whether the background has been removed.
    #[must_use]
    pub fn background_removed(&self) -> bool {
        matches!(self.background, Background::Removed { .. })
    }

    /// Recorded upscale level.
    #[must_use]
    pub fn upscale(&self) -> UpscaleLevel {
        self.upscale
    }

    /// Produce the state that results from `action`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::OutOfRange`] if an adjustment value is outside its
    /// domain. `self` is never modified.
    pub fn apply(&self, action: &EditAction) -> CoreResult<Self> {
        let mut next = self.clone();
        match *action {
            EditAction::SetBrightness(value) => {
                next.brightness = check_range("brightness", value, MAX_ADJUSTMENT)?;
            }
            EditAction::SetContrast(value) => {
                next.contrast = check_range("contrast", value, MAX_ADJUSTMENT)?;
            }
            EditAction::SetSaturation(value) => {
                next.saturation = check_range("saturation", value, MAX_ADJUSTMENT)?;
            }
            EditAction::SetBlur(value) => {
                next.blur = check_range("blur", value, MAX_BLUR)?;
            }
            EditAction::RotateLeft => next.rotation -= ROTATION_STEP,
            EditAction::RotateRight => next.rotation += ROTATION_STEP,
            EditAction::FlipHorizontal => next.flip_horizontal = !next.flip_horizontal,
            EditAction::FlipVertical => next.flip_vertical = !next.flip_vertical,
            EditAction::SetCropRatio(ratio) => next.crop_ratio = ratio,
            EditAction::SetFilter(preset) => next.filter = preset,
        }
        Ok(next)
    }

    /// Same parameters, different source raster.
    #[must_use]
    pub fn with_image(&self, image: ImageRef) -> Self {
        Self {
            image,
            ..self.clone()
        }
    }

    /// State after a background removal produced `cutout`. The current image
    /// becomes the restorable original.
    #[must_use]
    pub fn with_background_removed(&self, cutout: ImageRef) -> Self {
        Self {
            background: Background::Removed {
                original: self.image.clone(),
            },
            image: cutout,
            ..self.clone()
        }
    }

    /// State with the pre-removal image swapped back in, or `None` if the
    /// background was never removed.
    #[must_use]
    pub fn with_background_restored(&self) -> Option<Self> {
        match &self.background {
            Background::Removed { original } => Some(Self {
                image: original.clone(),
                background: Background::Intact,
                ..self.clone()
            }),
            Background::Intact => None,
        }
    }

    /// Same parameters with a new upscale level.
    #[must_use]
    pub fn with_upscale(&self, upscale: UpscaleLevel) -> Self {
        Self {
            upscale,
            ..self.clone()
        }
    }

    /// Serialize to pretty-printed JSON. Resident images are embedded as
    /// data URIs.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Serialization`] if serialization fails.
    pub fn to_json(&self) -> CoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a state previously produced by [`EditState::to_json`].
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Serialization`] for malformed JSON or invalid
    /// field values.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

fn check_range(field: &'static str, value: u8, max: u8) -> CoreResult<u8> {
    if value > max {
        return Err(CoreError::OutOfRange {
            field,
            value: i64::from(value),
            min: 0,
            max: i64::from(max),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_ref::ImageBuffer;

    fn state() -> EditState {
        EditState::new(ImageRef::Remote("https://example.com/a.png".to_string()))
    }

    #[test]
    fn test_defaults_are_neutral() {
        let s = state();
        assert_eq!(s.brightness(), 100);
        assert_eq!(s.contrast(), 100);
        assert_eq!(s.saturation(), 100);
        assert_eq!(s.blur(), 0);
        assert_eq!(s.rotation(), 0);
        assert_eq!(s.crop_ratio(), CropRatio::Free);
        assert_eq!(s.filter(), FilterPreset::None);
        assert!(!s.background_removed());
        assert_eq!(s.upscale(), UpscaleLevel::X1);
    }

    #[test]
    fn test_apply_does_not_touch_original() {
        let s = state();
        let next = s.apply(&EditAction::SetBrightness(150)).unwrap();
        assert_eq!(s.brightness(), 100);
        assert_eq!(next.brightness(), 150);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let s = state();
        assert!(matches!(
            s.apply(&EditAction::SetContrast(201)),
            Err(CoreError::OutOfRange { field: "contrast", .. })
        ));
        assert!(matches!(
            s.apply(&EditAction::SetBlur(11)),
            Err(CoreError::OutOfRange { field: "blur", max: 10, .. })
        ));
        assert!(s.apply(&EditAction::SetBlur(10)).is_ok());
        assert!(s.apply(&EditAction::SetSaturation(0)).is_ok());
    }

    #[test]
    fn test_rotation_accumulates_without_normalizing() {
        let mut s = state();
        for _ in 0..5 {
            s = s.apply(&EditAction::RotateLeft).unwrap();
        }
        assert_eq!(s.rotation(), -450);
        let s = s.apply(&EditAction::RotateRight).unwrap();
        assert_eq!(s.rotation(), -360);
    }

    #[test]
    fn test_flip_toggles() {
        let s = state().apply(&EditAction::FlipHorizontal).unwrap();
        assert!(s.flip_horizontal());
        assert!(!s.flip_vertical());
        let s = s.apply(&EditAction::FlipHorizontal).unwrap();
        assert!(!s.flip_horizontal());
    }

    #[test]
    fn test_background_removal_keeps_original() {
        let s = state();
        let cutout = ImageRef::Resident(ImageBuffer::png(vec![1]));
        let removed = s.with_background_removed(cutout.clone());
        assert!(removed.background_removed());
        assert_eq!(removed.image(), &cutout);

        let restored = removed.with_background_restored().expect("restorable");
        assert_eq!(restored, s);
        assert!(s.with_background_restored().is_none());
    }

    #[test]
    fn test_upscale_level_parsing() {
        assert_eq!(UpscaleLevel::try_from(4).unwrap(), UpscaleLevel::X4);
        assert!(matches!(
            UpscaleLevel::try_from(3),
            Err(CoreError::InvalidUpscaleLevel(3))
        ));
        assert_eq!(UpscaleLevel::X2.to_string(), "2x");
    }

    #[test]
    fn test_crop_ratio_parsing() {
        assert_eq!("original".parse::<CropRatio>().unwrap(), CropRatio::Free);
        assert_eq!("9:16".parse::<CropRatio>().unwrap(), CropRatio::Portrait);
        assert_eq!(CropRatio::Landscape.aspect(), Some((16, 9)));
        assert!("4:3".parse::<CropRatio>().is_err());
    }

    #[test]
    fn test_action_json_format() {
        let action: EditAction =
            serde_json::from_str(r#"{"action":"set_crop_ratio","value":"16:9"}"#).unwrap();
        assert_eq!(action, EditAction::SetCropRatio(CropRatio::Landscape));

        let action: EditAction = serde_json::from_str(r#"{"action":"rotate_left"}"#).unwrap();
        assert_eq!(action, EditAction::RotateLeft);
    }

    #[test]
    fn test_json_round_trip() {
        let s = state()
            .apply(&EditAction::SetFilter(FilterPreset::Warm))
            .unwrap()
            .with_background_removed(ImageRef::Resident(ImageBuffer::png(vec![1, 2, 3])))
            .with_upscale(UpscaleLevel::X4);

        let json = s.to_json().unwrap();
        let parsed = EditState::from_json(&json).unwrap();

        assert_eq!(parsed.filter(), FilterPreset::Warm);
        assert_eq!(parsed.upscale(), UpscaleLevel::X4);
        assert!(parsed.background_removed());
        assert_eq!(
            parsed.image().as_resident().map(ImageBuffer::bytes),
            Some(&[1u8, 2, 3][..])
        );
    }
}
