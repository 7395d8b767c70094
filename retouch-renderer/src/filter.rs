//! Pixel implementation of the filter chain.
//!
//! Colour operations use the Filter Effects colour matrices on
//! non-premultiplied sRGB values in `[0, 1]`. Alpha is never changed by a
//! colour operation. Blur is a Gaussian with the magnitude as sigma.

use image::RgbaImage;
use retouch_core::{FilterChain, FilterKind, FilterOp};

type Matrix = [[f32; 3]; 3];

/// Apply every operation in `chain`, left to right.
#[must_use]
pub fn apply_chain(source: &RgbaImage, chain: &FilterChain) -> RgbaImage {
    let mut raster = source.clone();
    for op in chain.ops() {
        raster = apply_op(raster, op);
    }
    raster
}

fn apply_op(mut raster: RgbaImage, op: &FilterOp) -> RgbaImage {
    match op.kind {
        FilterKind::Blur => {
            if op.magnitude <= 0.0 {
                return raster;
            }
            return image::imageops::blur(&raster, op.magnitude);
        }
        FilterKind::Grayscale => map_matrix(&mut raster, &grayscale(op.fraction())),
        FilterKind::Sepia => map_matrix(&mut raster, &sepia(op.fraction())),
        FilterKind::Saturate => map_matrix(&mut raster, &saturate(op.fraction())),
        FilterKind::HueRotate => map_matrix(&mut raster, &hue_rotate(op.magnitude)),
        FilterKind::Invert => {
            let amount = op.fraction().clamp(0.0, 1.0);
            map_channels(&mut raster, |c| amount * (1.0 - c) + (1.0 - amount) * c);
        }
        FilterKind::Brightness => {
            let factor = op.fraction().max(0.0);
            map_channels(&mut raster, |c| c * factor);
        }
        FilterKind::Contrast => {
            let factor = op.fraction().max(0.0);
            map_channels(&mut raster, |c| (c - 0.5) * factor + 0.5);
        }
    }
    raster
}

fn grayscale(amount: f32) -> Matrix {
    let a = 1.0 - amount.clamp(0.0, 1.0);
    [
        [0.2126 + 0.7874 * a, 0.7152 - 0.7152 * a, 0.0722 - 0.0722 * a],
        [0.2126 - 0.2126 * a, 0.7152 + 0.2848 * a, 0.0722 - 0.0722 * a],
        [0.2126 - 0.2126 * a, 0.7152 - 0.7152 * a, 0.0722 + 0.9278 * a],
    ]
}

fn sepia(amount: f32) -> Matrix {
    let a = 1.0 - amount.clamp(0.0, 1.0);
    [
        [0.393 + 0.607 * a, 0.769 - 0.769 * a, 0.189 - 0.189 * a],
        [0.349 - 0.349 * a, 0.686 + 0.314 * a, 0.168 - 0.168 * a],
        [0.272 - 0.272 * a, 0.534 - 0.534 * a, 0.131 + 0.869 * a],
    ]
}

fn saturate(amount: f32) -> Matrix {
    let s = amount.max(0.0);
    [
        [0.213 + 0.787 * s, 0.715 - 0.715 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 + 0.285 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 - 0.715 * s, 0.072 + 0.928 * s],
    ]
}

fn hue_rotate(degrees: f32) -> Matrix {
    let (sin, cos) = degrees.to_radians().sin_cos();
    [
        [
            0.213 + cos * 0.787 - sin * 0.213,
            0.715 - cos * 0.715 - sin * 0.715,
            0.072 - cos * 0.072 + sin * 0.928,
        ],
        [
            0.213 - cos * 0.213 + sin * 0.143,
            0.715 + cos * 0.285 + sin * 0.140,
            0.072 - cos * 0.072 - sin * 0.283,
        ],
        [
            0.213 - cos * 0.213 - sin * 0.787,
            0.715 - cos * 0.715 + sin * 0.715,
            0.072 + cos * 0.928 + sin * 0.072,
        ],
    ]
}

fn map_matrix(raster: &mut RgbaImage, m: &Matrix) {
    for pixel in raster.pixels_mut() {
        let [r, g, b, _] = pixel.0.map(to_unit);
        pixel.0[0] = from_unit(m[0][0] * r + m[0][1] * g + m[0][2] * b);
        pixel.0[1] = from_unit(m[1][0] * r + m[1][1] * g + m[1][2] * b);
        pixel.0[2] = from_unit(m[2][0] * r + m[2][1] * g + m[2][2] * b);
    }
}

fn map_channels(raster: &mut RgbaImage, f: impl Fn(f32) -> f32) {
    for pixel in raster.pixels_mut() {
        for channel in &mut pixel.0[..3] {
            *channel = from_unit(f(to_unit(*channel)));
        }
    }
}

fn to_unit(value: u8) -> f32 {
    f32::from(value) / 255.0
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn from_unit(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::solid_color;

    fn chain(ops: &[FilterOp]) -> FilterChain {
        FilterChain::from(ops.to_vec())
    }

    fn single(kind: FilterKind, magnitude: f32, rgba: [u8; 4]) -> [u8; 4] {
        let raster = solid_color(1, 1, rgba);
        apply_chain(&raster, &chain(&[FilterOp::new(kind, magnitude)])).get_pixel(0, 0).0
    }

    #[test]
    fn test_neutral_adjustments_are_identity() {
        let raster = solid_color(2, 2, [12, 130, 250, 200]);
        let neutral = chain(&[
            FilterOp::new(FilterKind::Brightness, 100.0),
            FilterOp::new(FilterKind::Contrast, 100.0),
            FilterOp::new(FilterKind::Saturate, 100.0),
            FilterOp::new(FilterKind::Blur, 0.0),
        ]);
        assert_eq!(apply_chain(&raster, &neutral), raster);
    }

    #[test]
    fn test_grayscale_equalizes_channels() {
        let [r, g, b, a] = single(FilterKind::Grayscale, 100.0, [200, 50, 10, 255]);
        assert_eq!(r, g);
        assert_eq!(g, b);
        assert_eq!(a, 255);
    }

    #[test]
    fn test_invert() {
        assert_eq!(single(FilterKind::Invert, 100.0, [0, 255, 55, 90]), [255, 0, 200, 90]);
    }

    #[test]
    fn test_brightness_scales_and_clamps() {
        assert_eq!(single(FilterKind::Brightness, 200.0, [50, 200, 0, 255]), [100, 255, 0, 255]);
        assert_eq!(single(FilterKind::Brightness, 0.0, [50, 200, 9, 255]), [0, 0, 0, 255]);
    }

    #[test]
    fn test_zero_contrast_is_mid_grey() {
        assert_eq!(single(FilterKind::Contrast, 0.0, [0, 255, 30, 255]), [128, 128, 128, 255]);
    }

    #[test]
    fn test_zero_hue_rotation_is_near_identity() {
        let out = single(FilterKind::HueRotate, 0.0, [40, 120, 220, 255]);
        for (got, want) in out.iter().zip([40u8, 120, 220, 255]) {
            assert!(got.abs_diff(want) <= 1, "{out:?}");
        }
    }

    #[test]
    fn test_blur_spreads_colour() {
        let mut raster = solid_color(9, 9, [0, 0, 0, 255]);
        raster.put_pixel(4, 4, image::Rgba([255, 255, 255, 255]));
        let blurred = apply_chain(&raster, &chain(&[FilterOp::new(FilterKind::Blur, 2.0)]));
        assert!(blurred.get_pixel(4, 4).0[0] < 255);
        assert!(blurred.get_pixel(5, 4).0[0] > 0);
    }
}
