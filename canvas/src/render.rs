//! Rendering: draws the viewer scene, the leader-line overlay and the editor scene.
//!
//! This module only talks to a [`Surface`]. It receives read-only views of the
//! scene, viewport and coordinate spaces and produces draw calls; the one piece
//! of state it mutates is the popup layer's queue of pending overlay changes,
//! which the leader pass flushes.
//!
//! All fallible calls propagate errors via `Result<(), CanvasError>`. The frame
//! callbacks on the viewer and editor cores hand the result to the host.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use crate::consts::{DOWNSAMPLE_MAX_WIDTH, DRAFT_DASH_PX, EDITOR_FILL_ALPHA, EDITOR_LABEL_FONT, VERTEX_DOT_PX};
use crate::error::CanvasError;
use crate::geometry::{Point, Size, centroid};
use crate::popup::{OverlayOp, PopupLayer, leader_line};
use crate::scene::{Polygon, Scene};
use crate::space::Spaces;
use crate::style::{editor_style, viewer_style};
use crate::surface::{CanvasBounds, DrawTransform, ImageSource, Stroke, Surface};
use crate::viewport::Viewport;

/// Editor draft outline width in screen pixels.
const DRAFT_STROKE_PX: f64 = 2.0;

/// Width of the dashed closing edge in screen pixels.
const DRAFT_CLOSING_PX: f64 = 1.0;

const LABEL_COLOR: &str = "#000";

// =============================================================
// Background image
// =============================================================

/// Load state of the background image and its downsampled copy.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BackgroundImage {
    natural: Option<Size>,
    downsampled: bool,
    /// Full resolution forced for a screenshot.
    capture: bool,
}

impl BackgroundImage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the natural size once the image has decoded. Returns the size of
    /// the downsampled copy to prepare, if the image is wide enough to need one.
    pub fn loaded(&mut self, natural: Size) -> Option<Size> {
        self.natural = Some(natural);
        let target = downsample_target(natural);
        self.downsampled = target.is_some();
        target
    }

    /// The host could not build the downsampled copy; draw full resolution.
    pub fn drop_downsampled(&mut self) {
        self.downsampled = false;
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.natural.is_some()
    }

    #[must_use]
    pub fn natural(&self) -> Option<Size> {
        self.natural
    }

    #[must_use]
    pub fn has_downsampled(&self) -> bool {
        self.downsampled
    }

    /// Image `width / height`, once loaded with a non-zero height.
    #[must_use]
    pub fn aspect(&self) -> Option<f64> {
        self.natural.filter(|n| n.height > 0.0).map(|n| n.width / n.height)
    }

    pub fn set_capture(&mut self, on: bool) {
        self.capture = on;
    }

    #[must_use]
    pub fn capturing(&self) -> bool {
        self.capture
    }

    /// Which copy to draw at `scale`; `None` before the image has loaded.
    #[must_use]
    pub fn source(&self, scale: f64, sharp_threshold: f64) -> Option<ImageSource> {
        self.natural?;
        if self.downsampled && !self.capture && scale <= sharp_threshold {
            Some(ImageSource::Downsampled)
        } else {
            Some(ImageSource::Full)
        }
    }
}

/// Size of the downsampled copy for an image of `natural` size, if one is needed.
#[must_use]
pub fn downsample_target(natural: Size) -> Option<Size> {
    if natural.width <= DOWNSAMPLE_MAX_WIDTH || natural.height <= 0.0 {
        return None;
    }
    let height = (natural.height * DOWNSAMPLE_MAX_WIDTH / natural.width).round();
    Some(Size::new(DOWNSAMPLE_MAX_WIDTH, height))
}

// =============================================================
// Viewer scene
// =============================================================

fn transform(spaces: &Spaces, viewport: &Viewport) -> DrawTransform {
    DrawTransform { device: f64::from(spaces.device_ratio), scale: viewport.scale, offset: viewport.offset }
}

fn display_points(spaces: &Spaces, polygon: &Polygon) -> Vec<Point> {
    polygon.points.iter().map(|&p| spaces.to_display(p)).collect()
}

/// Draw the viewer scene: background, unselected polygons (when visible), then
/// selected polygons on top.
///
/// # Errors
///
/// Returns `Err` if any surface call fails.
pub fn draw_scene<S: Surface + ?Sized>(
    surface: &mut S,
    scene: &Scene,
    spaces: &Spaces,
    viewport: &Viewport,
    image: &BackgroundImage,
    sharp_threshold: f64,
) -> Result<(), CanvasError> {
    surface.clear()?;
    surface.set_transform(&transform(spaces, viewport))?;

    if let Some(source) = image.source(viewport.scale, sharp_threshold) {
        surface.draw_image(source, spaces.display)?;
    }

    if scene.visible() {
        for (index, polygon) in scene.polygons().iter().enumerate() {
            if !scene.is_selected(index) {
                draw_viewer_polygon(surface, scene, index, polygon, spaces, viewport.scale, false)?;
            }
        }
    }
    for &index in scene.selected() {
        if let Some(polygon) = scene.polygon(index) {
            draw_viewer_polygon(surface, scene, index, polygon, spaces, viewport.scale, true)?;
        }
    }

    surface.reset_transform()
}

fn draw_viewer_polygon<S: Surface + ?Sized>(
    surface: &mut S,
    scene: &Scene,
    index: usize,
    polygon: &Polygon,
    spaces: &Spaces,
    scale: f64,
    selected: bool,
) -> Result<(), CanvasError> {
    if !polygon.is_valid() {
        return Ok(());
    }
    let points = display_points(spaces, polygon);
    let style = viewer_style(&polygon.color, selected, scene.renders_sold(index), polygon.is_decoration(), scale);
    if let Some(fill) = &style.fill {
        surface.fill_polygon(&points, fill)?;
    }
    surface.stroke_path(&points, true, &Stroke::solid(style.stroke, style.width))
}

// =============================================================
// Leader lines
// =============================================================

/// Flush pending overlay changes, then place every panel and leader line.
///
/// Polygon vertices go reference → display → view and are shifted by the
/// canvas origin inside the wrapper, so leaders track pans and zooms while
/// panels stay where they are.
///
/// # Errors
///
/// Returns `Err` if any surface call fails.
pub fn draw_leaders<S: Surface + ?Sized>(
    surface: &mut S,
    popups: &mut PopupLayer,
    scene: &Scene,
    spaces: &Spaces,
    viewport: &Viewport,
    bounds: &CanvasBounds,
) -> Result<(), CanvasError> {
    for op in popups.take_ops() {
        match op {
            OverlayOp::Create { id, kind } => surface.create_overlay(id, kind)?,
            OverlayOp::Remove { id } => surface.remove_overlay(id)?,
        }
    }

    let origin = bounds.canvas_in_wrapper().origin();
    for panel in popups.panels() {
        let rect = panel.rect();
        surface.place_panel(panel.id, &rect)?;
        for o in &panel.origins {
            let Some(polygon) = scene.polygon(o.polygon) else {
                continue;
            };
            let screen: Vec<Point> =
                polygon.points.iter().map(|&p| spaces.ref_to_screen(p, origin, viewport)).collect();
            if let Some(line) = leader_line(&screen, &rect) {
                surface.place_leader(o.leader, &line)?;
            }
        }
    }
    Ok(())
}

// =============================================================
// Editor scene
// =============================================================

/// Read-only inputs of one editor frame.
#[derive(Debug, Clone, Copy)]
pub struct EditorView<'a> {
    pub scene: &'a Scene,
    pub selected: Option<usize>,
    /// In-progress draft in reference space.
    pub draft: &'a [Point],
    pub draft_color: &'a str,
    pub spaces: &'a Spaces,
    pub viewport: &'a Viewport,
    pub image: &'a BackgroundImage,
}

/// Draw the editor: background, saved polygons with vertex dots and labels,
/// then the draft.
///
/// # Errors
///
/// Returns `Err` if any surface call fails.
pub fn draw_editor<S: Surface + ?Sized>(surface: &mut S, view: &EditorView<'_>) -> Result<(), CanvasError> {
    let scale = view.viewport.scale;
    surface.clear()?;
    surface.set_transform(&transform(view.spaces, view.viewport))?;

    if view.image.is_loaded() {
        surface.draw_image(ImageSource::Full, view.spaces.display)?;
    }

    for (index, polygon) in view.scene.polygons().iter().enumerate() {
        if polygon.points.is_empty() {
            continue;
        }
        let selected = view.selected == Some(index);
        let points = display_points(view.spaces, polygon);
        let style = editor_style(&polygon.color, selected, scale);
        if let Some(fill) = &style.fill {
            surface.fill_polygon(&points, fill)?;
        }
        surface.stroke_path(&points, true, &Stroke::solid(style.stroke.clone(), style.width))?;
        for &p in &points {
            surface.fill_circle(p, VERTEX_DOT_PX / scale, &style.stroke)?;
        }
        if let Some(label_at) = centroid(&points) {
            surface.fill_text(&polygon.name, label_at, EDITOR_LABEL_FONT, LABEL_COLOR)?;
        }
    }

    if !view.draft.is_empty() {
        draw_draft(surface, view)?;
    }

    surface.reset_transform()
}

fn draw_draft<S: Surface + ?Sized>(surface: &mut S, view: &EditorView<'_>) -> Result<(), CanvasError> {
    let scale = view.viewport.scale;
    let color = view.draft_color;
    let points: Vec<Point> = view.draft.iter().map(|&p| view.spaces.to_display(p)).collect();

    if let (Some(&first), Some(&last), true) = (points.first(), points.last(), points.len() >= 2) {
        let closing = Stroke { color: color.to_owned(), width: DRAFT_CLOSING_PX / scale, dash: Some(DRAFT_DASH_PX / scale) };
        surface.stroke_path(&[last, first], false, &closing)?;
    }
    surface.fill_polygon(&points, &format!("{color}{EDITOR_FILL_ALPHA}"))?;
    surface.stroke_path(&points, false, &Stroke::solid(color, DRAFT_STROKE_PX / scale))?;
    for &p in &points {
        surface.fill_circle(p, VERTEX_DOT_PX / scale, color)?;
    }
    Ok(())
}

