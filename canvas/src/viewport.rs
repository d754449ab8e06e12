//! Viewport controller: user zoom scale and pan offset.
//!
//! The offset lives in display space and is applied before the scale, so a
//! display point `p` lands on the canvas at `(p + offset) * scale`. Every zoom
//! operation is anchor-preserving: the display point under the anchor pixel
//! before the change is under the same pixel afterwards.

#[cfg(test)]
#[path = "viewport_test.rs"]
mod viewport_test;

use crate::consts::{BUTTON_ZOOM_FACTOR, WHEEL_ZOOM_IN, WHEEL_ZOOM_OUT};
use crate::geometry::Point;

/// Zoom/pan state for one canvas mount.
///
/// `offset` is in display-space CSS pixels; `scale` is the user zoom factor
/// clamped to `[min_scale, max_scale]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub scale: f64,
    pub offset: Point,
    pub min_scale: f64,
    pub max_scale: f64,
    /// When set, zoom inputs are ignored and the host keeps native scrolling.
    pub locked: bool,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset: Point::default(),
            min_scale: 1.0,
            max_scale: 10.0,
            locked: false,
        }
    }
}

impl Viewport {
    #[must_use]
    pub fn new(min_scale: f64, max_scale: f64, locked: bool) -> Self {
        Self { min_scale, max_scale, locked, ..Self::default() }
    }

    /// Clamp a candidate scale to the configured bounds.
    #[must_use]
    pub fn clamp_scale(&self, scale: f64) -> f64 {
        scale.clamp(self.min_scale, self.max_scale)
    }

    /// Display-space point currently drawn at canvas-local pixel `anchor`.
    #[must_use]
    pub fn world_at(&self, anchor: Point) -> Point {
        Point::new(anchor.x / self.scale - self.offset.x, anchor.y / self.scale - self.offset.y)
    }

    /// Canvas-local pixel where display-space point `world` is drawn.
    #[must_use]
    pub fn pixel_of(&self, world: Point) -> Point {
        Point::new((world.x + self.offset.x) * self.scale, (world.y + self.offset.y) * self.scale)
    }

    /// Set the scale, keeping the display point under `anchor` fixed.
    ///
    /// Returns `false` (and changes nothing) when the clamped scale equals the
    /// current one.
    #[allow(clippy::float_cmp)]
    pub fn set_scale_at(&mut self, anchor: Point, scale: f64) -> bool {
        let new_scale = self.clamp_scale(scale);
        if new_scale == self.scale {
            return false;
        }
        let world = self.world_at(anchor);
        self.scale = new_scale;
        self.offset = Point::new(anchor.x / new_scale - world.x, anchor.y / new_scale - world.y);
        true
    }

    /// Multiply the scale by `factor` around `anchor`.
    pub fn zoom_at(&mut self, anchor: Point, factor: f64) -> bool {
        self.set_scale_at(anchor, self.scale * factor)
    }

    /// One wheel notch at `anchor`: in for negative `delta_y`, out otherwise.
    pub fn wheel(&mut self, anchor: Point, delta_y: f64) -> bool {
        let factor = if delta_y < 0.0 { WHEEL_ZOOM_IN } else { WHEEL_ZOOM_OUT };
        self.zoom_at(anchor, factor)
    }

    /// Zoom-in button, anchored on the image center `center` (display space).
    pub fn zoom_in(&mut self, center: Point) -> bool {
        let anchor = self.pixel_of(center);
        self.zoom_at(anchor, BUTTON_ZOOM_FACTOR)
    }

    /// Zoom-out button, anchored on the image center `center` (display space).
    pub fn zoom_out(&mut self, center: Point) -> bool {
        let anchor = self.pixel_of(center);
        self.zoom_at(anchor, 1.0 / BUTTON_ZOOM_FACTOR)
    }

    /// Slider input: absolute scale anchored on the image center.
    pub fn set_scale_centered(&mut self, center: Point, scale: f64) -> bool {
        let anchor = self.pixel_of(center);
        self.set_scale_at(anchor, scale)
    }

    /// Pan by a canvas-pixel delta.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.offset.x += dx / self.scale;
        self.offset.y += dy / self.scale;
    }

    /// Back to scale 1 with no offset. Returns `false` if already there.
    #[allow(clippy::float_cmp)]
    pub fn reset(&mut self) -> bool {
        if self.scale == 1.0 && self.offset == Point::default() {
            return false;
        }
        self.scale = 1.0;
        self.offset = Point::default();
        true
    }

    /// Zoom as a whole percentage for the host's zoom label.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn zoom_percent(&self) -> i64 {
        (self.scale * 100.0).round() as i64
    }
}

/// Pinch gesture bookkeeping: finger distance and scale at gesture start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pinch {
    pub start_dist: f64,
    pub start_scale: f64,
}

impl Pinch {
    /// Begin a pinch from two touch points.
    #[must_use]
    pub fn begin(a: Point, b: Point, viewport: &Viewport) -> Self {
        Self { start_dist: a.distance(b), start_scale: viewport.scale }
    }

    /// Apply the pinch for the current finger positions, anchored on their midpoint.
    ///
    /// A zero start distance cannot define a ratio and is ignored.
    pub fn update(&self, a: Point, b: Point, viewport: &mut Viewport) -> bool {
        if self.start_dist <= 0.0 {
            return false;
        }
        let ratio = a.distance(b) / self.start_dist;
        viewport.set_scale_at(a.midpoint(b), self.start_scale * ratio)
    }
}
