//! Shared numeric constants for the canvas crate.

// ── Reference space ─────────────────────────────────────────────

/// Width of the authoring coordinate system polygons are stored in.
pub const REFERENCE_WIDTH: f64 = 1200.0;

/// Height of the authoring coordinate system polygons are stored in.
pub const REFERENCE_HEIGHT: f64 = 800.0;

/// Display height as a fraction of width before the background image loads.
pub const FALLBACK_ASPECT_HEIGHT: f64 = 0.6;

/// Minimum vertex count of a persistable polygon.
pub const MIN_POLYGON_POINTS: usize = 3;

// ── Zoom ────────────────────────────────────────────────────────

/// Scale multiplier for one wheel notch towards the user.
pub const WHEEL_ZOOM_IN: f64 = 1.1;

/// Scale multiplier for one wheel notch away from the user.
pub const WHEEL_ZOOM_OUT: f64 = 0.9;

/// Scale multiplier for the zoom-in button (divided for zoom-out).
pub const BUTTON_ZOOM_FACTOR: f64 = 1.2;

// ── Background image ────────────────────────────────────────────

/// Widest downsampled copy kept for zoomed-out rendering.
pub const DOWNSAMPLE_MAX_WIDTH: f64 = 2048.0;

// ── Touch ───────────────────────────────────────────────────────

/// Movement before a one-finger touch that began on a polygon becomes a pan.
pub const TAP_SLOP_ON_POLYGON_PX: f64 = 15.0;

/// Movement before a one-finger touch on empty space becomes a pan.
pub const TAP_SLOP_PX: f64 = 5.0;

// ── Polygon styling ─────────────────────────────────────────────

pub const DEFAULT_POLYGON_COLOR: &str = "#3498db";

/// Returned when a border color cannot be inverted.
pub const FALLBACK_INVERT_COLOR: &str = "#e74c3c";

pub const SOLD_FILL: &str = "#dddddd";
pub const SOLD_STROKE: &str = "#bbbbbb";
pub const SELECTED_FILL: &str = "rgba(231, 76, 60, 0.4)";

/// Border width in screen pixels for ordinary polygons.
pub const STROKE_WIDTH_PX: f64 = 2.0;

/// Border width in screen pixels for decoration polygons.
pub const DECORATION_STROKE_WIDTH_PX: f64 = 0.6;

/// Border width multiplier for selected polygons.
pub const SELECTED_STROKE_MULTIPLIER: f64 = 3.0;

// ── Leader lines ────────────────────────────────────────────────

/// Distance the leader line starts outside the polygon border, in pixels.
pub const LEADER_STROKE_OFFSET_PX: f64 = 2.0;

/// Thickness of a leader line, in pixels.
pub const LEADER_THICKNESS_PX: f64 = 4.0;

pub const LEADER_COLOR: &str = "#e74c3c";

// ── Editor ──────────────────────────────────────────────────────

/// Screen-space radius for grabbing a draft point.
pub const DRAFT_POINT_GRAB_PX: f64 = 15.0;

/// Screen-space radius for grabbing a vertex of the selected polygon.
pub const VERTEX_GRAB_PX: f64 = 10.0;

/// Vertex dot radius in screen pixels.
pub const VERTEX_DOT_PX: f64 = 4.0;

/// Dash length of the draft's closing preview edge, in screen pixels.
pub const DRAFT_DASH_PX: f64 = 5.0;

/// Editor border color for the selected polygon.
pub const EDITOR_SELECTED_STROKE: &str = "#e74c3c";

/// Alpha suffix appended to a hex color for editor fills (60% opacity).
pub const EDITOR_FILL_ALPHA: &str = "99";

/// Label font in display units; the canvas transform scales it with the zoom.
pub const EDITOR_LABEL_FONT: &str = "bold 4px Arial";

// ── Render / capture ────────────────────────────────────────────

/// Highest zoom at which the downsampled background is still drawn.
pub const SHARP_ZOOM_THRESHOLD: f64 = 1.3;

/// Pixel multiplier requested for screenshot capture.
pub const CAPTURE_SCALE: u32 = 4;

/// Aspect ratio (width / height) the editor canvas keeps.
pub const EDITOR_ASPECT: f64 = REFERENCE_WIDTH / REFERENCE_HEIGHT;
