//! Coordinate spaces and the transforms between them.
//!
//! | Space | Units |
//! |-------|-------|
//! | reference | fixed 1200×800 authoring coordinates, what is persisted |
//! | display | CSS pixels of the canvas element at scale 1 |
//! | view | display after user zoom/pan, relative to the canvas origin |
//! | screen | view translated by the canvas origin (wrapper- or page-relative) |
//!
//! The device multiplier only affects the backing store of the canvas; hit
//! testing never sees it.

#[cfg(test)]
#[path = "space_test.rs"]
mod space_test;

use crate::consts::{FALLBACK_ASPECT_HEIGHT, REFERENCE_HEIGHT, REFERENCE_WIDTH};
use crate::geometry::{Point, Size};
use crate::viewport::Viewport;

/// Display geometry of one canvas mount.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spaces {
    /// Current CSS-pixel size of the canvas.
    pub display: Size,
    /// Backing-store pixels per CSS pixel, fixed for the session.
    pub device_ratio: u32,
}

impl Default for Spaces {
    fn default() -> Self {
        Self { display: Size::new(REFERENCE_WIDTH, REFERENCE_HEIGHT), device_ratio: 1 }
    }
}

impl Spaces {
    #[must_use]
    pub fn new(display: Size, device_ratio: u32) -> Self {
        Self { display, device_ratio: device_ratio.max(1) }
    }

    /// Horizontal reference → display factor.
    #[must_use]
    pub fn scale_x(&self) -> f64 {
        self.display.width / REFERENCE_WIDTH
    }

    /// Vertical reference → display factor.
    #[must_use]
    pub fn scale_y(&self) -> f64 {
        self.display.height / REFERENCE_HEIGHT
    }

    /// Reference → display. Axes scale independently.
    #[must_use]
    pub fn to_display(&self, reference: Point) -> Point {
        Point::new(reference.x * self.scale_x(), reference.y * self.scale_y())
    }

    /// Display → reference.
    #[must_use]
    pub fn from_display(&self, display: Point) -> Point {
        Point::new(display.x / self.scale_x(), display.y / self.scale_y())
    }

    /// Display → view: `(p + offset) * scale`.
    #[must_use]
    pub fn to_view(display: Point, viewport: &Viewport) -> Point {
        viewport.pixel_of(display)
    }

    /// View → display.
    #[must_use]
    pub fn from_view(view: Point, viewport: &Viewport) -> Point {
        viewport.world_at(view)
    }

    /// Reference point → screen point for a canvas whose top-left is at `canvas_origin`.
    #[must_use]
    pub fn ref_to_screen(&self, reference: Point, canvas_origin: Point, viewport: &Viewport) -> Point {
        let view = Self::to_view(self.to_display(reference), viewport);
        Point::new(view.x + canvas_origin.x, view.y + canvas_origin.y)
    }

    /// Screen point → reference point. Used by every hit test.
    #[must_use]
    pub fn screen_to_ref(&self, screen: Point, canvas_origin: Point, viewport: &Viewport) -> Point {
        let local = Point::new(screen.x - canvas_origin.x, screen.y - canvas_origin.y);
        self.from_display(Self::from_view(local, viewport))
    }

    /// Image center in display space; the anchor for button and slider zoom.
    #[must_use]
    pub fn image_center(&self) -> Point {
        self.to_display(Point::new(REFERENCE_WIDTH / 2.0, REFERENCE_HEIGHT / 2.0))
    }

    /// Backing-store size in device pixels.
    #[must_use]
    pub fn backing_size(&self) -> Size {
        let ratio = f64::from(self.device_ratio);
        Size::new(self.display.width * ratio, self.display.height * ratio)
    }
}

/// Display size for a container `width`, preserving the image aspect ratio
/// (`width / height`). Before the image is known, height is `0.6 * width`.
#[must_use]
pub fn display_for_width(width: f64, image_aspect: Option<f64>) -> Size {
    let height = match image_aspect {
        Some(aspect) if aspect > 0.0 => (width / aspect).round(),
        _ => (width * FALLBACK_ASPECT_HEIGHT).round(),
    };
    Size::new(width, height)
}
