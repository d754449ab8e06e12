//! Recording surface for unit tests.

use std::collections::HashMap;

use crate::error::CanvasError;
use crate::geometry::{Point, Rect, Size};
use crate::popup::{LeaderLine, OverlayId, OverlayKind};
use crate::surface::{CanvasBounds, DrawTransform, ImageSource, Stroke, Surface};

/// One recorded surface call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    Clear,
    Transform(DrawTransform),
    ResetTransform,
    Image(ImageSource, Size),
    Fill { points: Vec<Point>, color: String },
    Stroke { points: Vec<Point>, closed: bool, stroke: Stroke },
    Circle { center: Point, radius: f64, color: String },
    Text { text: String, at: Point, font: String },
}

/// Surface that records draw calls and keeps overlays in maps.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub bounds: CanvasBounds,
    pub calls: Vec<DrawCall>,
    pub overlays: HashMap<OverlayId, OverlayKind>,
    pub panels: HashMap<OverlayId, Rect>,
    pub leaders: HashMap<OverlayId, LeaderLine>,
    /// Every call fails while set.
    pub broken: bool,
}

impl RecordingSurface {
    /// Canvas of `size` at the wrapper's top-left, wrapper at the page origin.
    pub fn sized(size: Size) -> Self {
        let rect = Rect::new(0.0, 0.0, size.width, size.height);
        Self { bounds: CanvasBounds::new(rect, rect), ..Self::default() }
    }

    pub fn fills(&self) -> Vec<(&[Point], &str)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                DrawCall::Fill { points, color } => Some((points.as_slice(), color.as_str())),
                _ => None,
            })
            .collect()
    }

    pub fn strokes(&self) -> Vec<&Stroke> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                DrawCall::Stroke { stroke, .. } => Some(stroke),
                _ => None,
            })
            .collect()
    }

    pub fn images(&self) -> Vec<ImageSource> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                DrawCall::Image(source, _) => Some(*source),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&DrawCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    fn record(&mut self, call: DrawCall) -> Result<(), CanvasError> {
        if self.broken {
            return Err(CanvasError::Js("broken surface".into()));
        }
        self.calls.push(call);
        Ok(())
    }

    fn check(&self) -> Result<(), CanvasError> {
        if self.broken { Err(CanvasError::Js("broken surface".into())) } else { Ok(()) }
    }
}

impl Surface for RecordingSurface {
    fn measure(&self) -> Result<CanvasBounds, CanvasError> {
        self.check()?;
        Ok(self.bounds)
    }

    fn clear(&mut self) -> Result<(), CanvasError> {
        self.record(DrawCall::Clear)
    }

    fn set_transform(&mut self, transform: &DrawTransform) -> Result<(), CanvasError> {
        self.record(DrawCall::Transform(*transform))
    }

    fn reset_transform(&mut self) -> Result<(), CanvasError> {
        self.record(DrawCall::ResetTransform)
    }

    fn draw_image(&mut self, source: ImageSource, size: Size) -> Result<(), CanvasError> {
        self.record(DrawCall::Image(source, size))
    }

    fn fill_polygon(&mut self, points: &[Point], color: &str) -> Result<(), CanvasError> {
        self.record(DrawCall::Fill { points: points.to_vec(), color: color.to_owned() })
    }

    fn stroke_path(&mut self, points: &[Point], closed: bool, stroke: &Stroke) -> Result<(), CanvasError> {
        self.record(DrawCall::Stroke { points: points.to_vec(), closed, stroke: stroke.clone() })
    }

    fn fill_circle(&mut self, center: Point, radius: f64, color: &str) -> Result<(), CanvasError> {
        self.record(DrawCall::Circle { center, radius, color: color.to_owned() })
    }

    fn fill_text(&mut self, text: &str, at: Point, font: &str, _color: &str) -> Result<(), CanvasError> {
        self.record(DrawCall::Text { text: text.to_owned(), at, font: font.to_owned() })
    }

    fn create_overlay(&mut self, id: OverlayId, kind: OverlayKind) -> Result<(), CanvasError> {
        self.check()?;
        self.overlays.insert(id, kind);
        Ok(())
    }

    fn remove_overlay(&mut self, id: OverlayId) -> Result<(), CanvasError> {
        self.check()?;
        self.overlays.remove(&id);
        self.panels.remove(&id);
        self.leaders.remove(&id);
        Ok(())
    }

    fn place_panel(&mut self, id: OverlayId, rect: &Rect) -> Result<(), CanvasError> {
        self.check()?;
        self.panels.insert(id, *rect);
        Ok(())
    }

    fn place_leader(&mut self, id: OverlayId, line: &LeaderLine) -> Result<(), CanvasError> {
        self.check()?;
        self.leaders.insert(id, *line);
        Ok(())
    }
}
