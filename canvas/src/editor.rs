//! Back-office polygon editor.
//!
//! `EditorCore` keeps the saved polygons of one site-plan record, the
//! in-progress draft, the active tool and the gesture between pointer-down and
//! pointer-up. Store writes never happen here: a commit becomes an [`Action`]
//! carrying a [`StoreOp`], and the host reports the outcome back through
//! [`EditorCore::store_succeeded`] or [`EditorCore::store_failed`].

#[cfg(test)]
#[path = "editor_test.rs"]
mod editor_test;

use crate::config::CanvasConfig;
use crate::consts::{DEFAULT_POLYGON_COLOR, DRAFT_POINT_GRAB_PX, EDITOR_ASPECT, MIN_POLYGON_POINTS, VERTEX_GRAB_PX};
use crate::engine::{Action, FramePass, FrameScheduler, Notice, PolygonDraft, StoreOp};
use crate::error::CanvasError;
use crate::geometry::{Point, Size, translate_all};
use crate::input::{Button, EditorGesture, Key, Modifiers, Tool, WheelDelta};
use crate::render::{BackgroundImage, EditorView, draw_editor};
use crate::scene::{EntityRef, PolygonRecord, RecordId, Scene, ShapeKind, coordinates_json};
use crate::space::Spaces;
use crate::surface::{CanvasBounds, Surface};
use crate::viewport::Viewport;

const CURSOR_SELECT: &str = "default";
const CURSOR_DRAW: &str = "crosshair";
const CURSOR_MOVE: &str = "move";
const CURSOR_PANNING: &str = "grabbing";

/// Editor state for one site-plan record.
#[derive(Debug, Clone)]
pub struct EditorCore {
    pub scene: Scene,
    pub viewport: Viewport,
    pub spaces: Spaces,
    pub image: BackgroundImage,
    pub tool: Tool,
    pub gesture: EditorGesture,
    /// Index of the selected saved polygon.
    pub selected: Option<usize>,
    /// In-progress shape, reference space.
    pub draft: Vec<Point>,
    /// Color for new polygons and for `apply_color`.
    pub color: String,
    /// Parent record; `None` until the host has saved it.
    pub record: Option<RecordId>,
    pub bounds: CanvasBounds,
    pub config: CanvasConfig,
    /// Shape kind of a commit waiting on the entity picker.
    pending: Option<ShapeKind>,
    frames: FrameScheduler,
}

impl Default for EditorCore {
    fn default() -> Self {
        Self::new(CanvasConfig::editor())
    }
}

impl EditorCore {
    #[must_use]
    pub fn new(config: CanvasConfig) -> Self {
        let display = editor_display(Spaces::default().display.width);
        Self {
            scene: Scene::new(),
            viewport: config.viewport(),
            spaces: Spaces::new(display, config.device_ratio),
            image: BackgroundImage::new(),
            tool: Tool::default(),
            gesture: EditorGesture::Idle,
            selected: None,
            draft: Vec::new(),
            color: DEFAULT_POLYGON_COLOR.to_owned(),
            record: None,
            bounds: CanvasBounds::default(),
            config,
            pending: None,
            frames: FrameScheduler::default(),
        }
    }

    // --- Data inputs ---

    /// The host saved (or switched) the parent record.
    pub fn set_record(&mut self, record: Option<RecordId>) {
        self.record = record;
    }

    /// Replace the saved polygons. The selection survives if its index still exists.
    pub fn load_polygons(&mut self, records: Vec<PolygonRecord>) -> Vec<Action> {
        let skipped = self.scene.load_records(records);
        log::debug!("editor loaded {} polygon(s), skipped {skipped}", self.scene.len());
        self.selected = self.selected.filter(|&i| i < self.scene.len());
        if !matches!(self.gesture, EditorGesture::Panning { .. }) {
            self.gesture = EditorGesture::Idle;
        }
        let mut out = Vec::new();
        self.request(&mut out);
        out
    }

    pub fn set_bounds(&mut self, bounds: CanvasBounds) {
        self.bounds = bounds;
    }

    // --- Helpers ---

    fn request(&mut self, out: &mut Vec<Action>) {
        if self.frames.request(FramePass::Scene) {
            out.push(Action::RequestFrame(FramePass::Scene));
        }
    }

    fn redraw(&mut self) -> Vec<Action> {
        let mut out = Vec::new();
        self.request(&mut out);
        out
    }

    fn to_ref(&self, client: Point) -> Point {
        self.spaces.screen_to_ref(client, self.bounds.canvas.origin(), &self.viewport)
    }

    fn local(&self, client: Point) -> Point {
        let origin = self.bounds.canvas.origin();
        Point::new(client.x - origin.x, client.y - origin.y)
    }

    fn idle_cursor(&self) -> &'static str {
        if self.tool == Tool::Select { CURSOR_SELECT } else { CURSOR_DRAW }
    }

    fn zoom_changed(&mut self, out: &mut Vec<Action>) {
        out.push(Action::ZoomChanged { scale: self.viewport.scale, percent: self.viewport.zoom_percent() });
        self.request(out);
    }

    #[must_use]
    pub fn is_pending(&self, pass: FramePass) -> bool {
        self.frames.is_pending(pass)
    }

    /// Whether a commit is waiting on the entity picker.
    #[must_use]
    pub fn awaiting_entity(&self) -> bool {
        self.pending.is_some()
    }

    // --- Tools and color ---

    /// Switch tool. The draft and any gesture are dropped; the polygon
    /// selection stays so the edit tool can work on it.
    pub fn set_tool(&mut self, tool: Tool) -> Vec<Action> {
        self.tool = tool;
        self.draft.clear();
        self.gesture = EditorGesture::Idle;
        self.pending = None;
        log::debug!("editor tool: {}", tool.name());
        let mut out = vec![Action::SetCursor(self.idle_cursor().into())];
        self.request(&mut out);
        out
    }

    pub fn set_color(&mut self, color: impl Into<String>) -> Vec<Action> {
        self.color = color.into();
        self.redraw()
    }

    #[must_use]
    pub fn used_colors(&self) -> Vec<String> {
        self.scene.used_colors()
    }

    /// Drop the draft and the selection. The host confirms first.
    pub fn clear_draft(&mut self) -> Vec<Action> {
        self.draft.clear();
        self.selected = None;
        self.pending = None;
        self.redraw()
    }

    // --- Mouse ---

    pub fn mouse_down(&mut self, client: Point, button: Button) -> Vec<Action> {
        match button {
            Button::Middle => Vec::new(),
            Button::Secondary => {
                self.gesture = EditorGesture::Panning { last: client };
                vec![Action::ConsumeEvent, Action::SetCursor(CURSOR_PANNING.into())]
            }
            Button::Primary => self.primary_down(self.to_ref(client)),
        }
    }

    fn primary_down(&mut self, at: Point) -> Vec<Action> {
        match self.tool {
            Tool::Polygon => {
                let grab = DRAFT_POINT_GRAB_PX / self.viewport.scale;
                if let Some(index) = self.draft.iter().position(|p| p.distance(at) < grab) {
                    self.gesture = EditorGesture::DraggingDraftPoint { index };
                    return vec![Action::SetCursor(CURSOR_MOVE.into())];
                }
                self.draft.push(at);
                self.redraw()
            }
            Tool::Rectangle => {
                self.draft.clear();
                self.gesture = EditorGesture::DrawingRectangle { start: at };
                self.redraw()
            }
            Tool::Edit => {
                let Some(polygon) = self.selected else {
                    return Vec::new();
                };
                let grab = VERTEX_GRAB_PX / self.viewport.scale;
                let vertex = self
                    .scene
                    .polygon(polygon)
                    .and_then(|p| p.points.iter().position(|v| v.distance(at) < grab));
                if let Some(vertex) = vertex {
                    self.gesture = EditorGesture::DraggingVertex { polygon, vertex };
                }
                Vec::new()
            }
            Tool::Select => match self.scene.any_polygon_at(at) {
                Some(index) => {
                    self.selected = Some(index);
                    self.gesture = EditorGesture::DraggingPolygon { index, last: at, moved: false };
                    let mut out = vec![Action::SetCursor(CURSOR_MOVE.into())];
                    self.request(&mut out);
                    out
                }
                None => {
                    self.selected = None;
                    self.redraw()
                }
            },
        }
    }

    pub fn mouse_move(&mut self, client: Point) -> Vec<Action> {
        let at = self.to_ref(client);
        match self.gesture {
            EditorGesture::Idle => return Vec::new(),
            EditorGesture::Panning { last } => {
                self.viewport.pan_by(client.x - last.x, client.y - last.y);
                self.gesture = EditorGesture::Panning { last: client };
            }
            EditorGesture::DraggingDraftPoint { index } => {
                if let Some(p) = self.draft.get_mut(index) {
                    *p = at;
                }
            }
            EditorGesture::DrawingRectangle { start } => {
                self.draft = vec![start, Point::new(at.x, start.y), at, Point::new(start.x, at.y)];
            }
            EditorGesture::DraggingPolygon { index, last, moved } => {
                let (dx, dy) = (at.x - last.x, at.y - last.y);
                if let Some(polygon) = self.scene.polygon_mut(index) {
                    translate_all(&mut polygon.points, dx, dy);
                }
                let moved = moved || at != last;
                self.gesture = EditorGesture::DraggingPolygon { index, last: at, moved };
            }
            EditorGesture::DraggingVertex { polygon, vertex } => {
                if let Some(p) = self.scene.polygon_mut(polygon).and_then(|p| p.points.get_mut(vertex)) {
                    *p = at;
                }
            }
        }
        self.redraw()
    }

    pub fn mouse_up(&mut self, button: Button) -> Vec<Action> {
        if button == Button::Middle {
            return Vec::new();
        }
        let gesture = std::mem::take(&mut self.gesture);
        match gesture {
            EditorGesture::Idle => Vec::new(),
            EditorGesture::Panning { .. } | EditorGesture::DraggingDraftPoint { .. } => {
                vec![Action::SetCursor(self.idle_cursor().into())]
            }
            EditorGesture::DrawingRectangle { .. } => {
                if self.draft.len() == 4 {
                    self.request_commit(ShapeKind::Rectangle)
                } else {
                    Vec::new()
                }
            }
            EditorGesture::DraggingPolygon { index, moved, .. } => {
                let mut out = vec![Action::SetCursor(self.idle_cursor().into())];
                if moved {
                    out.extend(self.commit_points(index, |id| StoreOp::Move { id }));
                }
                out
            }
            EditorGesture::DraggingVertex { polygon, .. } => {
                self.commit_points(polygon, |id| StoreOp::EditVertex { id })
            }
        }
    }

    /// Zooms at the cursor. The editor has no zoom lock.
    pub fn wheel(&mut self, client: Point, delta: WheelDelta) -> Vec<Action> {
        let mut out = vec![Action::ConsumeEvent];
        if self.viewport.wheel(self.local(client), delta.dy) {
            self.zoom_changed(&mut out);
        }
        out
    }

    // --- Keyboard ---

    pub fn key_down(&mut self, key: &Key, modifiers: Modifiers) -> Vec<Action> {
        if key.is("Escape") {
            self.draft.clear();
            self.selected = None;
            self.pending = None;
            return self.redraw();
        }
        if self.tool != Tool::Polygon {
            return Vec::new();
        }
        if key.is("Enter") {
            if self.draft.len() < MIN_POLYGON_POINTS {
                return Vec::new();
            }
            let mut out = vec![Action::ConsumeEvent];
            out.extend(self.request_commit(ShapeKind::Polygon));
            return out;
        }
        let undo = key.is("Backspace") || key.is("Delete") || (modifiers.ctrl && key.is("z"));
        if undo && self.draft.pop().is_some() {
            let mut out = vec![Action::ConsumeEvent];
            self.request(&mut out);
            return out;
        }
        Vec::new()
    }

    // --- Zoom controls ---

    pub fn zoom_in(&mut self) -> Vec<Action> {
        let center = self.spaces.image_center();
        self.zoom_control(|vp| vp.zoom_in(center))
    }

    pub fn zoom_out(&mut self) -> Vec<Action> {
        let center = self.spaces.image_center();
        self.zoom_control(|vp| vp.zoom_out(center))
    }

    pub fn reset_zoom(&mut self) -> Vec<Action> {
        self.zoom_control(Viewport::reset)
    }

    pub fn set_zoom(&mut self, scale: f64) -> Vec<Action> {
        let center = self.spaces.image_center();
        self.zoom_control(|vp| vp.set_scale_centered(center, scale))
    }

    fn zoom_control(&mut self, apply: impl FnOnce(&mut Viewport) -> bool) -> Vec<Action> {
        let mut out = Vec::new();
        if apply(&mut self.viewport) {
            self.zoom_changed(&mut out);
        }
        out
    }

    // --- Commits ---

    /// Save button.
    pub fn save(&mut self) -> Vec<Action> {
        match (self.tool, self.draft.len()) {
            (Tool::Polygon, n) if n >= MIN_POLYGON_POINTS => self.request_commit(ShapeKind::Polygon),
            (Tool::Rectangle, 4) => self.request_commit(ShapeKind::Rectangle),
            _ => vec![Action::Notify(Notice::warning("Draw at least 3 points"))],
        }
    }

    /// First half of a commit: ask the host which entity the new polygon belongs to.
    fn request_commit(&mut self, kind: ShapeKind) -> Vec<Action> {
        if self.record.is_none() {
            return vec![Action::Notify(Notice::warning("Save the site plan first"))];
        }
        if self.draft.len() < MIN_POLYGON_POINTS {
            let err = CanvasError::TooFewPoints { min: MIN_POLYGON_POINTS, got: self.draft.len() };
            return vec![Action::Notify(Notice::warning(err.to_string()))];
        }
        self.pending = Some(kind);
        vec![Action::PickEntity { exclude: self.scene.assigned_entities() }]
    }

    /// Picker closed. `None` cancels the commit and keeps the draft.
    pub fn entity_picked(&mut self, entity: Option<EntityRef>) -> Vec<Action> {
        let Some(kind) = self.pending.take() else {
            return Vec::new();
        };
        let Some(entity) = entity else {
            log::debug!("entity pick cancelled");
            return Vec::new();
        };
        match self.polygon_draft(kind, entity) {
            Ok(draft) => vec![Action::CreatePolygon(draft)],
            Err(e) => {
                log::warn!("polygon not committed: {e}");
                vec![Action::Notify(Notice::warning(e.to_string()))]
            }
        }
    }

    fn polygon_draft(&self, kind: ShapeKind, entity: EntityRef) -> Result<PolygonDraft, CanvasError> {
        let parent_id = self.record.ok_or(CanvasError::UnsavedRecord)?;
        if self.draft.len() < MIN_POLYGON_POINTS {
            return Err(CanvasError::TooFewPoints { min: MIN_POLYGON_POINTS, got: self.draft.len() });
        }
        Ok(PolygonDraft {
            name: entity.name,
            parent_id,
            entity_id: Some(entity.id),
            coordinates: coordinates_json(&self.draft)?,
            color: self.color.clone(),
            polygon_type: kind,
        })
    }

    fn commit_points(&self, index: usize, op: impl FnOnce(RecordId) -> StoreOp) -> Vec<Action> {
        let Some(polygon) = self.scene.polygon(index) else {
            return Vec::new();
        };
        match coordinates_json(&polygon.points) {
            Ok(coordinates) => vec![Action::UpdatePoints { op: op(polygon.id), coordinates }],
            Err(e) => {
                log::error!("cannot encode polygon {}: {e}", polygon.id);
                vec![Action::Notify(Notice::error(e.to_string()))]
            }
        }
    }

    /// Write the current color to the selected polygon.
    pub fn apply_color(&mut self) -> Vec<Action> {
        let Some(polygon) = self.selected.and_then(|i| self.scene.polygon(i)) else {
            return vec![Action::Notify(Notice::warning("Select a polygon first"))];
        };
        let op = StoreOp::Recolor { id: polygon.id, name: polygon.name.clone() };
        vec![Action::UpdateColor { op, color: self.color.clone() }]
    }

    /// Delete the selected polygon once the host has confirmed.
    pub fn delete_selected(&mut self) -> Vec<Action> {
        let Some(polygon) = self.selected.and_then(|i| self.scene.polygon(i)) else {
            return vec![Action::Notify(Notice::warning("Select a polygon first"))];
        };
        vec![Action::DeletePolygon(StoreOp::Delete { id: polygon.id, name: polygon.name.clone() })]
    }

    // --- Store results ---

    pub fn store_succeeded(&mut self, op: &StoreOp) -> Vec<Action> {
        log::debug!("store write done: {op:?}");
        match op {
            StoreOp::Create { name } => {
                self.draft.clear();
                let mut out = vec![Action::Notify(Notice::success(format!("Saved \"{name}\""))), Action::ReloadPolygons];
                self.request(&mut out);
                out
            }
            StoreOp::Move { .. } | StoreOp::EditVertex { .. } => Vec::new(),
            StoreOp::Recolor { name, .. } => {
                vec![Action::Notify(Notice::success(format!("Updated color of \"{name}\""))), Action::ReloadPolygons]
            }
            StoreOp::Delete { name, .. } => {
                self.selected = None;
                let mut out = vec![Action::Notify(Notice::success(format!("Deleted \"{name}\""))), Action::ReloadPolygons];
                self.request(&mut out);
                out
            }
        }
    }

    /// A store write failed. A failed move reloads to drop the local translation.
    pub fn store_failed(&mut self, op: &StoreOp, message: &str) -> Vec<Action> {
        log::error!("store write failed: {op:?}: {message}");
        let text = match op {
            StoreOp::Create { .. } => format!("Error saving: {message}"),
            StoreOp::Move { .. } => format!("Error moving: {message}"),
            StoreOp::EditVertex { .. } => format!("Error updating: {message}"),
            StoreOp::Recolor { .. } => format!("Error updating color: {message}"),
            StoreOp::Delete { .. } => format!("Error deleting: {message}"),
        };
        let mut out = vec![Action::Notify(Notice::error(text))];
        if matches!(op, StoreOp::Move { .. }) {
            out.push(Action::ReloadPolygons);
        }
        out
    }

    // --- Layout ---

    /// Container width changed. The editor canvas keeps the reference aspect.
    pub fn resize(&mut self, width: f64) -> Vec<Action> {
        self.spaces.display = editor_display(width);
        self.redraw()
    }

    /// Background decoded. The editor always draws it at full resolution.
    pub fn image_loaded(&mut self, natural: Size) -> Vec<Action> {
        self.image.loaded(natural);
        self.image.drop_downsampled();
        log::debug!("editor background {}x{}", natural.width, natural.height);
        self.redraw()
    }

    // --- Frame callback ---

    /// # Errors
    ///
    /// Returns `Err` if any surface call fails.
    pub fn render<S: Surface + ?Sized>(&mut self, surface: &mut S) -> Result<(), CanvasError> {
        self.frames.begin(FramePass::Scene);
        let view = EditorView {
            scene: &self.scene,
            selected: self.selected,
            draft: &self.draft,
            draft_color: &self.color,
            spaces: &self.spaces,
            viewport: &self.viewport,
            image: &self.image,
        };
        draw_editor(surface, &view)
    }
}

fn editor_display(width: f64) -> Size {
    Size::new(width, (width / EDITOR_ASPECT).round())
}
