// Host-side tests for pure input functions.
// The main crate is wasm-only, so we include the pure-Rust modules directly.

#![allow(dead_code)]
#[path = "../src/input.rs"]
mod input;
#[path = "../src/constants.rs"]
mod constants;

use glam::Vec2;
use input::*;

const RECT: CssRect = CssRect {
    left: 10.0,
    top: 20.0,
    width: 200.0,
    height: 100.0,
};

#[test]
fn client_point_maps_into_backing_pixels() {
    // Backing store at 2x the CSS size
    let px = client_to_canvas_px(Vec2::new(110.0, 70.0), RECT, 400, 200);
    assert!((px - Vec2::new(200.0, 100.0)).length() < 1e-4);

    let corner = client_to_canvas_px(Vec2::new(10.0, 20.0), RECT, 400, 200);
    assert_eq!(corner, Vec2::ZERO);
}

#[test]
fn collapsed_rect_maps_to_origin() {
    let empty = CssRect::default();
    assert_eq!(
        client_to_canvas_px(Vec2::new(50.0, 50.0), empty, 800, 600),
        Vec2::ZERO
    );
}

#[test]
fn backing_size_scales_by_device_pixel_ratio() {
    assert_eq!(backing_size(RECT, 2.0), (400, 200));
    assert_eq!(backing_size(RECT, 1.0), (200, 100));
    // Bad ratios fall back to 1
    assert_eq!(backing_size(RECT, f64::NAN), (200, 100));
    assert_eq!(backing_size(RECT, 0.0), (200, 100));
    // Hidden element still gets a usable surface
    assert_eq!(backing_size(CssRect::default(), 2.0), (1, 1));
}

#[test]
fn wheel_delta_normalises_lines_and_pages() {
    assert_eq!(wheel_delta_px(-100.0, 0), -100.0);
    assert_eq!(wheel_delta_px(3.0, 1), 48.0);
    assert_eq!(wheel_delta_px(1.0, 2), 800.0);
}

#[test]
fn only_primary_main_button_presses() {
    assert!(is_primary_press(true, 0));
    assert!(!is_primary_press(true, 2));
    assert!(!is_primary_press(false, 0));
}

#[test]
fn rect_contains_its_edges() {
    assert!(RECT.contains(Vec2::new(10.0, 20.0)));
    assert!(RECT.contains(Vec2::new(210.0, 120.0)));
    assert!(RECT.contains(Vec2::new(100.0, 50.0)));
    assert!(!RECT.contains(Vec2::new(9.0, 50.0)));
    assert!(!RECT.contains(Vec2::new(100.0, 121.0)));
}

#[test]
fn marker_tint_is_a_valid_colour() {
    for c in constants::MARKER_TINT {
        assert!((0.0..=1.0).contains(&c));
    }
    assert!(constants::MAX_TEXTURE_WIDTH >= 2048);
}
