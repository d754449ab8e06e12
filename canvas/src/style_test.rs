#![allow(clippy::float_cmp)]

use super::*;

// --- invert_color ---

#[test]
fn inverts_six_digit_hex() {
    assert_eq!(invert_color("#3498db"), "#cb6724");
    assert_eq!(invert_color("#000000"), "#ffffff");
    assert_eq!(invert_color("#ffffff"), "#000000");
}

#[test]
fn inverts_three_digit_hex() {
    assert_eq!(invert_color("#fff"), "#000000");
    assert_eq!(invert_color("#0a0"), "#ff55ff");
}

#[test]
fn hash_prefix_is_optional() {
    assert_eq!(invert_color("3498db"), "#cb6724");
}

#[test]
fn pads_single_digit_channels() {
    assert_eq!(invert_color("#f0fff5"), "#0f000a");
}

#[test]
fn uppercase_hex_is_accepted() {
    assert_eq!(invert_color("#FF0000"), "#00ffff");
}

#[test]
fn malformed_colors_fall_back() {
    for bad in ["", "#", "#12345", "#1234567", "red", "rgb(1,2,3)", "#zzzzzz", "#ééé"] {
        assert_eq!(invert_color(bad), "#e74c3c", "input {bad:?}");
    }
}

// --- viewer_style ---

#[test]
fn plain_polygon_is_unfilled_in_own_color() {
    let s = viewer_style("#112233", false, false, false, 1.0);
    assert_eq!(s, PolygonStyle { fill: None, stroke: "#112233".to_owned(), width: 2.0 });
}

#[test]
fn selected_polygon_highlights_and_inverts_border() {
    let s = viewer_style("#3498db", true, false, false, 1.0);
    assert_eq!(s.fill.as_deref(), Some("rgba(231, 76, 60, 0.4)"));
    assert_eq!(s.stroke, "#cb6724");
    assert_eq!(s.width, 6.0);
}

#[test]
fn sold_polygon_is_gray_even_when_selected() {
    let s = viewer_style("#3498db", true, true, false, 1.0);
    assert_eq!(s.fill.as_deref(), Some("#dddddd"));
    assert_eq!(s.stroke, "#bbbbbb");
    assert_eq!(s.width, 6.0);
}

#[test]
fn decoration_uses_thin_border() {
    let s = viewer_style("#3498db", false, false, true, 1.0);
    assert!((s.width - 0.6).abs() < 1e-12);
    let s = viewer_style("#3498db", true, false, true, 1.0);
    assert!((s.width - 1.8).abs() < 1e-12);
}

#[test]
fn width_is_divided_by_scale() {
    let s = viewer_style("#3498db", false, false, false, 4.0);
    assert_eq!(s.width, 0.5);
}

// --- editor_style ---

#[test]
fn editor_fill_is_translucent_own_color() {
    let s = editor_style("#3498db", false, 2.0);
    assert_eq!(s.fill.as_deref(), Some("#3498db99"));
    assert_eq!(s.stroke, "#3498db");
    assert_eq!(s.width, 1.0);
}

#[test]
fn editor_selected_border_is_red_and_thicker() {
    let s = editor_style("#3498db", true, 1.0);
    assert_eq!(s.stroke, "#e74c3c");
    assert_eq!(s.width, 3.0);
}
