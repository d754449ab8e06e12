//! Polygon styling for the viewer and editor passes.

#[cfg(test)]
#[path = "style_test.rs"]
mod style_test;

use crate::consts::{
    DECORATION_STROKE_WIDTH_PX, EDITOR_FILL_ALPHA, EDITOR_SELECTED_STROKE, FALLBACK_INVERT_COLOR,
    SELECTED_FILL, SELECTED_STROKE_MULTIPLIER, SOLD_FILL, SOLD_STROKE, STROKE_WIDTH_PX,
};

/// Resolved paint for one polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonStyle {
    /// `None` leaves the interior transparent.
    pub fill: Option<String>,
    pub stroke: String,
    /// Line width in display units, already divided by the user scale.
    pub width: f64,
}

/// Complement of a `#rgb` / `#rrggbb` color, e.g. `#3498db` → `#cb6724`.
///
/// Anything else (named colors, `rgb()`, bad digits) yields `#e74c3c`.
#[must_use]
pub fn invert_color(color: &str) -> String {
    let hex = color.strip_prefix('#').unwrap_or(color);
    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 => hex.to_owned(),
        _ => return FALLBACK_INVERT_COLOR.to_owned(),
    };
    match (channel(&expanded, 0), channel(&expanded, 2), channel(&expanded, 4)) {
        (Some(r), Some(g), Some(b)) => format!("#{:02x}{:02x}{:02x}", 255 - r, 255 - g, 255 - b),
        _ => FALLBACK_INVERT_COLOR.to_owned(),
    }
}

fn channel(hex: &str, at: usize) -> Option<u8> {
    let digits = hex.get(at..at + 2)?;
    match u8::from_str_radix(digits, 16) {
        Ok(value) => Some(value),
        Err(_) => None,
    }
}

/// Viewer style for a polygon.
///
/// Sold wins over selected for the fill and the stroke color; selection still
/// thickens the border.
#[must_use]
pub fn viewer_style(color: &str, selected: bool, sold: bool, decoration: bool, scale: f64) -> PolygonStyle {
    let base = if decoration { DECORATION_STROKE_WIDTH_PX } else { STROKE_WIDTH_PX };
    let width = (if selected { base * SELECTED_STROKE_MULTIPLIER } else { base }) / scale;
    if sold {
        PolygonStyle { fill: Some(SOLD_FILL.to_owned()), stroke: SOLD_STROKE.to_owned(), width }
    } else if selected {
        PolygonStyle { fill: Some(SELECTED_FILL.to_owned()), stroke: invert_color(color), width }
    } else {
        PolygonStyle { fill: None, stroke: color.to_owned(), width }
    }
}

/// Editor style: translucent fill in the polygon's own color.
#[must_use]
pub fn editor_style(color: &str, selected: bool, scale: f64) -> PolygonStyle {
    let (stroke, width) = if selected { (EDITOR_SELECTED_STROKE, 3.0) } else { (color, 2.0) };
    PolygonStyle { fill: Some(format!("{color}{EDITOR_FILL_ALPHA}")), stroke: stroke.to_owned(), width: width / scale }
}
