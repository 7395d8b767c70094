//! Export Integration Tests
//!
//! Runs edit states through `compose` and the tiny-skia compositor and
//! inspects the decoded PNG.

use retouch_core::{compose, EditAction, EditState, FilterPreset, ImageBuffer, ImageRef};
use retouch_renderer::image::{decode, encode_png, solid_color};
use retouch_renderer::{RasterCompositor, SkiaSurface};

fn source_png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    encode_png(&solid_color(width, height, rgba)).expect("encode source")
}

fn state_for(bytes: Vec<u8>) -> EditState {
    EditState::new(ImageRef::Resident(ImageBuffer::png(bytes)))
}

// ============================================================================
// Rotation Bounds
// ============================================================================

#[test]
fn test_quarter_turn_swaps_export_bounds() {
    let bytes = source_png(600, 400, [30, 60, 90, 255]);
    let compositor = RasterCompositor::new(SkiaSurface::new());

    let upright = state_for(bytes.clone());
    let exported = compositor.compose(&bytes, &compose(&upright)).unwrap();
    assert_eq!((exported.width, exported.height), (600, 400));

    let rotated = upright.apply(&EditAction::RotateRight).unwrap();
    let exported = compositor.compose(&bytes, &compose(&rotated)).unwrap();
    assert_eq!((exported.width, exported.height), (400, 600));

    let decoded = decode(&exported.bytes).unwrap();
    assert_eq!(decoded.dimensions(), (400, 600));
    assert_eq!(decoded.get_pixel(200, 300).0, [30, 60, 90, 255]);
}

#[test]
fn test_negative_rotation_bounds() {
    let bytes = source_png(60, 40, [0, 0, 0, 255]);
    let state = state_for(bytes.clone())
        .apply(&EditAction::RotateLeft)
        .unwrap()
        .apply(&EditAction::RotateLeft)
        .unwrap()
        .apply(&EditAction::RotateLeft)
        .unwrap();
    let exported = RasterCompositor::new(SkiaSurface::new())
        .compose(&bytes, &compose(&state))
        .unwrap();
    assert_eq!((exported.width, exported.height), (40, 60));
}

// ============================================================================
// Filters
// ============================================================================

#[test]
fn test_grayscale_preset_baked_into_export() {
    let bytes = source_png(8, 8, [220, 40, 40, 255]);
    let state = state_for(bytes.clone())
        .apply(&EditAction::SetFilter(FilterPreset::Grayscale))
        .unwrap();
    let exported = RasterCompositor::new(SkiaSurface::new())
        .compose(&bytes, &compose(&state))
        .unwrap();
    let [r, g, b, a] = decode(&exported.bytes).unwrap().get_pixel(4, 4).0;
    assert_eq!(r, g);
    assert_eq!(g, b);
    assert_eq!(a, 255);
}

#[test]
fn test_undecodable_source_fails() {
    let state = state_for(vec![1, 2, 3]);
    let result = RasterCompositor::new(SkiaSurface::new()).compose(&[1, 2, 3], &compose(&state));
    assert!(result.is_err());
}
