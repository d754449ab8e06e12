//! Input model: tools, modifier keys, mouse buttons, and the gesture state machines.
//!
//! This module defines the types consumed by the viewer and editor cores.
//! `Tool` and `Modifiers` capture the user's intent at the time of a pointer
//! event. `ViewerMode` and `EditorGesture` are the active gestures tracked
//! between pointer-down and pointer-up, carrying all context needed to compute
//! incremental deltas and emit store writes on release.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use crate::consts::{TAP_SLOP_ON_POLYGON_PX, TAP_SLOP_PX};
use crate::geometry::Point;
use crate::popup::OverlayId;
use crate::viewport::Pinch;

/// Which editor tool is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    /// Select and drag whole polygons (default).
    #[default]
    Select,
    /// Click to append vertices of a free-form polygon.
    Polygon,
    /// Drag out an axis-aligned rectangle.
    Rectangle,
    /// Drag individual vertices of the selected polygon.
    Edit,
}

impl Tool {
    /// Parse the host's tool name (`"select"`, `"polygon"`, `"rectangle"`, `"edit"`).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "select" => Some(Self::Select),
            "polygon" => Some(Self::Polygon),
            "rectangle" => Some(Self::Rectangle),
            "edit" => Some(Self::Edit),
            _ => None,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Polygon => "polygon",
            Self::Rectangle => "rectangle",
            Self::Edit => "edit",
        }
    }

    /// Whether this tool builds a draft shape.
    #[must_use]
    pub fn is_drawing(self) -> bool {
        matches!(self, Self::Polygon | Self::Rectangle)
    }
}

/// Modifier keys held during a key event. Only Ctrl changes behavior (Ctrl+Z).
#[derive(Debug, Clone, Copy, Default)]
pub struct Modifiers {
    pub ctrl: bool,
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Left mouse button (or single-finger tap).
    Primary,
    /// Middle mouse button (scroll wheel click).
    Middle,
    /// Right mouse button; pans the canvas.
    Secondary,
}

impl Button {
    /// Map a DOM `MouseEvent.button` index.
    #[must_use]
    pub fn from_index(index: i16) -> Option<Self> {
        match index {
            0 => Some(Self::Primary),
            1 => Some(Self::Middle),
            2 => Some(Self::Secondary),
            _ => None,
        }
    }
}

/// A keyboard key.
///
/// The inner string holds the key name as reported by the browser (e.g. `"Delete"`, `"Escape"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

impl Key {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.0 == name
    }
}

/// Wheel / trackpad scroll delta. Only the vertical axis zooms.
#[derive(Debug, Clone, Copy)]
pub struct WheelDelta {
    /// Vertical scroll amount in pixels (positive = down).
    pub dy: f64,
}

/// One-finger touch that may still turn out to be a tap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchTap {
    /// Client-space position where the finger went down.
    pub start: Point,
    /// The touch started over a hit-testable polygon.
    pub on_polygon: bool,
    /// Movement exceeded the slop; the touch is a pan from now on.
    pub moved: bool,
}

impl TouchTap {
    #[must_use]
    pub fn new(start: Point, on_polygon: bool) -> Self {
        Self { start, on_polygon, moved: false }
    }

    /// Movement allowed before the touch becomes a pan.
    #[must_use]
    pub fn slop(&self) -> f64 {
        if self.on_polygon { TAP_SLOP_ON_POLYGON_PX } else { TAP_SLOP_PX }
    }

    /// Record the finger at `current`. Returns `true` once the touch has become a pan.
    pub fn track(&mut self, current: Point) -> bool {
        if !self.moved && self.start.distance(current) > self.slop() {
            self.moved = true;
        }
        self.moved
    }
}

/// Viewer interaction mode. Exactly one gesture is live at a time.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ViewerMode {
    /// No gesture in progress.
    #[default]
    Idle,
    /// Secondary-button drag or one-finger touch.
    Panning {
        /// Client-space pointer position at the previous event.
        last: Point,
        /// Tap detection state when the pan came from a touch.
        touch: Option<TouchTap>,
    },
    /// Two-finger pinch zoom.
    Pinching(Pinch),
    /// Moving a popup panel by its header.
    DraggingPanel {
        panel: OverlayId,
        /// Client-space pointer position at drag start.
        start: Point,
        /// Wrapper-relative panel position at drag start.
        origin: Point,
    },
}

/// Editor gesture between pointer-down and pointer-up.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum EditorGesture {
    /// No gesture in progress.
    #[default]
    Idle,
    /// Secondary-button drag.
    Panning {
        /// Client-space pointer position at the previous event.
        last: Point,
    },
    /// Moving one vertex of the in-progress draft.
    DraggingDraftPoint { index: usize },
    /// Sizing a rectangle draft from its first corner (reference space).
    DrawingRectangle { start: Point },
    /// Translating a whole saved polygon.
    DraggingPolygon {
        index: usize,
        /// Reference-space pointer position at the previous event.
        last: Point,
        moved: bool,
    },
    /// Moving one vertex of the selected saved polygon.
    DraggingVertex { polygon: usize, vertex: usize },
}
