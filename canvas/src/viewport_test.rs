#![allow(clippy::float_cmp)]

use super::*;

const EPSILON: f64 = 1e-9;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

fn point_approx_eq(a: Point, b: Point) -> bool {
    approx_eq(a.x, b.x) && approx_eq(a.y, b.y)
}

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn viewer() -> Viewport {
    Viewport::new(1.0, 10.0, false)
}

fn editor() -> Viewport {
    Viewport::new(0.1, 10.0, false)
}

// --- defaults ---

#[test]
fn default_is_identity() {
    let vp = Viewport::default();
    assert_eq!(vp.scale, 1.0);
    assert_eq!(vp.offset, Point::default());
    assert!(!vp.locked);
}

#[test]
fn pixel_and_world_are_inverse() {
    let vp = Viewport { scale: 2.5, offset: pt(-30.0, 12.0), ..viewer() };
    let world = pt(123.0, 456.0);
    assert!(point_approx_eq(vp.world_at(vp.pixel_of(world)), world));
}

// --- anchor-preserving zoom ---

#[test]
fn zoom_keeps_anchor_world_point_fixed() {
    let anchors = [pt(0.0, 0.0), pt(300.0, 200.0), pt(811.5, 13.25), pt(1199.0, 799.0)];
    let factors = [1.1, 0.9, 1.2, 1.0 / 1.2, 3.0, 0.25, 7.5];
    for anchor in anchors {
        for factor in factors {
            let mut vp = Viewport { scale: 2.0, offset: pt(-40.0, -25.0), ..editor() };
            let world = vp.world_at(anchor);
            vp.zoom_at(anchor, factor);
            assert!(point_approx_eq(vp.pixel_of(world), anchor), "anchor {anchor:?} factor {factor}");
        }
    }
}

#[test]
fn zoom_clamps_to_bounds() {
    let mut vp = viewer();
    assert!(vp.zoom_at(pt(10.0, 10.0), 100.0));
    assert_eq!(vp.scale, 10.0);
    assert!(vp.zoom_at(pt(10.0, 10.0), 0.0001));
    assert_eq!(vp.scale, 1.0);
}

#[test]
fn zoom_at_limit_is_noop() {
    let mut vp = viewer();
    let before = vp;
    assert!(!vp.zoom_at(pt(100.0, 100.0), 0.9));
    assert_eq!(vp, before);
}

#[test]
fn wheel_direction() {
    let mut vp = viewer();
    assert!(vp.wheel(pt(0.0, 0.0), -120.0));
    assert!(approx_eq(vp.scale, 1.1));
    assert!(vp.wheel(pt(0.0, 0.0), 120.0));
    assert_eq!(vp.scale, 1.0);
}

#[test]
fn wheel_out_at_min_scale_is_noop() {
    let mut vp = viewer();
    assert!(!vp.wheel(pt(50.0, 50.0), 1.0));
}

#[test]
fn editor_can_zoom_below_one() {
    let mut vp = editor();
    assert!(vp.wheel(pt(50.0, 50.0), 1.0));
    assert!(approx_eq(vp.scale, 0.9));
}

// --- buttons and slider ---

#[test]
fn zoom_buttons_anchor_on_image_center() {
    let center = pt(600.0, 400.0);
    let mut vp = viewer();
    let before = vp.pixel_of(center);
    assert!(vp.zoom_in(center));
    assert!(approx_eq(vp.scale, 1.2));
    assert!(point_approx_eq(vp.pixel_of(center), before));
    assert!(vp.zoom_out(center));
    assert!(approx_eq(vp.scale, 1.0));
    assert!(point_approx_eq(vp.pixel_of(center), before));
}

#[test]
fn slider_sets_absolute_scale_about_center() {
    let center = pt(450.0, 300.0);
    let mut vp = Viewport { offset: pt(-20.0, 5.0), ..viewer() };
    let before = vp.pixel_of(center);
    assert!(vp.set_scale_centered(center, 4.0));
    assert_eq!(vp.scale, 4.0);
    assert!(point_approx_eq(vp.pixel_of(center), before));
}

#[test]
fn slider_same_value_is_noop() {
    let mut vp = viewer();
    assert!(!vp.set_scale_centered(pt(600.0, 400.0), 1.0));
}

// --- pan / reset ---

#[test]
fn pan_divides_by_scale() {
    let mut vp = Viewport { scale: 2.0, ..viewer() };
    vp.pan_by(10.0, -20.0);
    assert_eq!(vp.offset, pt(5.0, -10.0));
}

#[test]
fn pan_moves_content_by_screen_delta() {
    let mut vp = Viewport { scale: 3.0, offset: pt(7.0, 9.0), ..viewer() };
    let world = pt(100.0, 100.0);
    let before = vp.pixel_of(world);
    vp.pan_by(30.0, 45.0);
    let after = vp.pixel_of(world);
    assert!(approx_eq(after.x - before.x, 30.0));
    assert!(approx_eq(after.y - before.y, 45.0));
}

#[test]
fn reset_restores_identity() {
    let mut vp = Viewport { scale: 4.0, offset: pt(1.0, 2.0), ..viewer() };
    assert!(vp.reset());
    assert_eq!(vp.scale, 1.0);
    assert_eq!(vp.offset, Point::default());
    assert!(!vp.reset());
}

#[test]
fn zoom_percent_rounds() {
    let vp = Viewport { scale: 1.234, ..viewer() };
    assert_eq!(vp.zoom_percent(), 123);
}

// --- pinch ---

#[test]
fn pinch_scales_by_distance_ratio_about_midpoint() {
    let mut vp = viewer();
    let pinch = Pinch::begin(pt(100.0, 100.0), pt(200.0, 100.0), &vp);
    let mid = pt(150.0, 100.0);
    let world = vp.world_at(mid);
    assert!(pinch.update(pt(50.0, 100.0), pt(250.0, 100.0), &mut vp));
    assert!(approx_eq(vp.scale, 2.0));
    assert!(point_approx_eq(vp.pixel_of(world), mid));
}

#[test]
fn pinch_is_clamped() {
    let mut vp = viewer();
    let pinch = Pinch::begin(pt(0.0, 0.0), pt(10.0, 0.0), &vp);
    pinch.update(pt(0.0, 0.0), pt(1000.0, 0.0), &mut vp);
    assert_eq!(vp.scale, 10.0);
}

#[test]
fn pinch_with_zero_start_distance_is_ignored() {
    let mut vp = viewer();
    let pinch = Pinch::begin(pt(5.0, 5.0), pt(5.0, 5.0), &vp);
    assert!(!pinch.update(pt(0.0, 0.0), pt(100.0, 0.0), &mut vp));
    assert_eq!(vp.scale, 1.0);
}
