//! Drawing surface abstraction.
//!
//! The render passes only talk to a [`Surface`]. The browser implementation
//! lives in [`crate::web`]; tests use a recording surface. All fallible calls
//! return `Result<(), CanvasError>` and the caller decides what to do with a
//! failed frame.

use crate::error::CanvasError;
use crate::geometry::{Point, Rect, Size};
use crate::popup::{LeaderLine, OverlayId, OverlayKind};

/// Canvas and wrapper rectangles in client (page viewport) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CanvasBounds {
    pub canvas: Rect,
    /// Positioned element that holds the canvas and the overlays.
    pub wrapper: Rect,
}

impl CanvasBounds {
    #[must_use]
    pub fn new(canvas: Rect, wrapper: Rect) -> Self {
        Self { canvas, wrapper }
    }

    /// Canvas rectangle relative to the wrapper.
    #[must_use]
    pub fn canvas_in_wrapper(&self) -> Rect {
        Rect::new(
            self.canvas.x - self.wrapper.x,
            self.canvas.y - self.wrapper.y,
            self.canvas.width,
            self.canvas.height,
        )
    }

    /// Client point relative to the wrapper.
    #[must_use]
    pub fn to_wrapper(&self, client: Point) -> Point {
        Point::new(client.x - self.wrapper.x, client.y - self.wrapper.y)
    }
}

/// Canvas transform: device multiplier, then user scale, then pan offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawTransform {
    pub device: f64,
    pub scale: f64,
    /// Display-space offset applied after scaling.
    pub offset: Point,
}

impl DrawTransform {
    /// Affine matrix `[a, b, c, d, e, f]` for `setTransform`.
    #[must_use]
    pub fn matrix(&self) -> [f64; 6] {
        let k = self.device * self.scale;
        [k, 0.0, 0.0, k, k * self.offset.x, k * self.offset.y]
    }
}

/// Which copy of the background image to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource {
    Full,
    /// Pre-scaled copy used when zoomed out.
    Downsampled,
}

/// Stroke paint.
#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    pub color: String,
    /// Line width in the current transform's units.
    pub width: f64,
    /// Dash and gap length; solid when `None`.
    pub dash: Option<f64>,
}

impl Stroke {
    #[must_use]
    pub fn solid(color: impl Into<String>, width: f64) -> Self {
        Self { color: color.into(), width, dash: None }
    }
}

/// Everything a render pass needs from the host: canvas primitives plus the
/// overlay elements (panels and leader lines) stacked above the canvas.
pub trait Surface {
    /// Current canvas and wrapper rectangles.
    ///
    /// # Errors
    ///
    /// Returns an error if the elements cannot be measured.
    fn measure(&self) -> Result<CanvasBounds, CanvasError>;

    /// Clear the whole backing store.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying context rejects the call.
    fn clear(&mut self) -> Result<(), CanvasError>;

    /// Replace the current transform.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying context rejects the call.
    fn set_transform(&mut self, transform: &DrawTransform) -> Result<(), CanvasError>;

    /// Back to the identity transform.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying context rejects the call.
    fn reset_transform(&mut self) -> Result<(), CanvasError>;

    /// Draw the background at the origin, stretched to `size`.
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be drawn.
    fn draw_image(&mut self, source: ImageSource, size: Size) -> Result<(), CanvasError>;

    /// Fill a closed path through `points`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying context rejects the call.
    fn fill_polygon(&mut self, points: &[Point], color: &str) -> Result<(), CanvasError>;

    /// Stroke a path through `points`, closing it back to the first point when `closed`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying context rejects the call.
    fn stroke_path(&mut self, points: &[Point], closed: bool, stroke: &Stroke) -> Result<(), CanvasError>;

    /// # Errors
    ///
    /// Returns an error if the underlying context rejects the call.
    fn fill_circle(&mut self, center: Point, radius: f64, color: &str) -> Result<(), CanvasError>;

    /// Draw `text` centered on `at`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying context rejects the call.
    fn fill_text(&mut self, text: &str, at: Point, font: &str, color: &str) -> Result<(), CanvasError>;

    /// Create an overlay element in the wrapper.
    ///
    /// # Errors
    ///
    /// Returns an error if the element cannot be created or attached.
    fn create_overlay(&mut self, id: OverlayId, kind: OverlayKind) -> Result<(), CanvasError>;

    /// Remove an overlay element. Unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the element cannot be detached.
    fn remove_overlay(&mut self, id: OverlayId) -> Result<(), CanvasError>;

    /// Position a panel at `rect` (wrapper space).
    ///
    /// # Errors
    ///
    /// Returns an error if the element's style cannot be written.
    fn place_panel(&mut self, id: OverlayId, rect: &Rect) -> Result<(), CanvasError>;

    /// Position a leader line (wrapper space).
    ///
    /// # Errors
    ///
    /// Returns an error if the element's style cannot be written.
    fn place_leader(&mut self, id: OverlayId, line: &LeaderLine) -> Result<(), CanvasError>;
}
