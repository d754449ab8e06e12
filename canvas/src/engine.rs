//! Host-facing actions, frame scheduling, and the browser-bound engines.
//!
//! The viewer and editor cores are headless: every handler returns a list of
//! [`Action`]s for the host to carry out (schedule a frame, write to the
//! store, open the entity picker, show a notice). [`ViewerEngine`] and
//! [`EditorEngine`] bind a core to a [`WebSurface`] and run the frame
//! callbacks against it.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use serde::{Deserialize, Serialize};
use web_sys::{Document, HtmlCanvasElement, HtmlElement, HtmlImageElement};

use crate::config::{CanvasConfig, SiteMapData};
use crate::editor::EditorCore;
use crate::error::CanvasError;
use crate::render::downsample_target;
use crate::scene::{EntityId, RecordId, ShapeKind};
use crate::surface::Surface;
use crate::viewer::ViewerCore;
use crate::web::{self, WebSurface};

/// The two independently coalesced frame passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FramePass {
    /// Canvas redraw.
    Scene,
    /// Overlay flush plus panel and leader placement.
    Leaders,
}

/// At most one pending frame per pass until its callback runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameScheduler {
    scene: bool,
    leaders: bool,
}

impl FrameScheduler {
    fn slot(&mut self, pass: FramePass) -> &mut bool {
        match pass {
            FramePass::Scene => &mut self.scene,
            FramePass::Leaders => &mut self.leaders,
        }
    }

    /// Mark `pass` pending. Returns `true` if the host must schedule a frame,
    /// `false` if one is already on its way.
    pub fn request(&mut self, pass: FramePass) -> bool {
        let slot = self.slot(pass);
        let fresh = !*slot;
        *slot = true;
        fresh
    }

    /// Start of the frame callback for `pass`: clears the flag and returns
    /// whether it was set.
    pub fn begin(&mut self, pass: FramePass) -> bool {
        std::mem::take(self.slot(pass))
    }

    #[must_use]
    pub fn is_pending(&self, pass: FramePass) -> bool {
        match pass {
            FramePass::Scene => self.scene,
            FramePass::Leaders => self.leaders,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

/// User-facing toast message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Success, message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Warning, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }
}

/// A store write in flight. The host hands it back through
/// `store_succeeded` / `store_failed` so the core knows how to react.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StoreOp {
    Create { name: String },
    /// Whole-polygon drag.
    Move { id: RecordId },
    EditVertex { id: RecordId },
    Recolor { id: RecordId, name: String },
    Delete { id: RecordId, name: String },
}

/// New polygon record, ready for the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolygonDraft {
    pub name: String,
    /// Parent site-plan record.
    pub parent_id: RecordId,
    pub entity_id: Option<EntityId>,
    /// JSON text of the reference-space points.
    pub coordinates: String,
    pub color: String,
    pub polygon_type: ShapeKind,
}

impl PolygonDraft {
    #[must_use]
    pub fn op(&self) -> StoreOp {
        StoreOp::Create { name: self.name.clone() }
    }
}

/// Toolbar toggle states after a control changed.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ControlState {
    pub polygons_visible: bool,
    pub force_gray: bool,
    pub interactive_gray: bool,
    pub zoom_locked: bool,
}

/// Actions returned from input handlers for the host to process.
///
/// Actions the page layer handles arrive at its callback as
/// `{ "kind": ..., "data": ... }` JSON objects.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Action {
    /// Schedule `requestAnimationFrame` for this pass.
    RequestFrame(FramePass),
    /// Call `preventDefault` on the event being handled.
    ConsumeEvent,
    SetCursor(String),
    /// Update the zoom label and slider.
    ZoomChanged { scale: f64, percent: i64 },
    ControlsChanged(ControlState),
    Notify(Notice),
    /// Open the entity picker, hiding entities that already have a polygon.
    PickEntity { exclude: Vec<EntityId> },
    CreatePolygon(PolygonDraft),
    UpdatePoints { op: StoreOp, coordinates: String },
    UpdateColor { op: StoreOp, color: String },
    /// Ask the user to confirm, then delete.
    DeletePolygon(StoreOp),
    /// Re-fetch polygons and call `load_polygons`.
    ReloadPolygons,
    /// Export the canvas at `scale` times its backing size, then call `capture_finished`.
    Capture { scale: u32 },
}

// =============================================================
// Browser engines
// =============================================================

/// Viewer bound to the page. Wraps `ViewerCore` and owns the browser surface.
pub struct ViewerEngine {
    surface: WebSurface,
    pub core: ViewerCore,
}

impl ViewerEngine {
    /// Bind to `canvas` inside `wrapper`, drawing `image` as background.
    ///
    /// # Errors
    ///
    /// Returns an error if the canvas has no 2D context.
    pub fn new(
        document: Document,
        canvas: HtmlCanvasElement,
        wrapper: HtmlElement,
        image: HtmlImageElement,
        data: SiteMapData,
    ) -> Result<Self, CanvasError> {
        let core = ViewerCore::from_data(data);
        let surface = WebSurface::new(document, canvas, wrapper, image)?;
        Ok(Self { surface, core })
    }

    /// Look up the viewer elements by id and start loading the background.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::MissingElement`] if either element is absent.
    pub fn mount(canvas_id: &str, wrapper_id: &str, data: SiteMapData) -> Result<Self, CanvasError> {
        let (document, canvas, wrapper) = web::lookup(canvas_id, wrapper_id)?;
        let image = web::new_image(&data.image_url)?;
        Self::new(document, canvas, wrapper, image, data)
    }

    pub fn surface(&mut self) -> &mut WebSurface {
        &mut self.surface
    }

    /// Background image finished decoding: size the canvas and prepare the
    /// downsampled copy.
    pub fn image_loaded(&mut self) -> Vec<Action> {
        let Some(natural) = self.surface.natural_size() else {
            log::warn!("image load reported before the image decoded");
            return Vec::new();
        };
        let mut actions = self.core.image_loaded(natural);
        if let Some(target) = downsample_target(natural) {
            if let Err(e) = self.surface.prepare_downsampled(target) {
                log::warn!("downsampling failed, drawing full resolution: {e}");
                self.core.downsample_failed();
            }
        }
        actions.extend(self.resize());
        actions
    }

    /// Re-fit the canvas to its container.
    pub fn resize(&mut self) -> Vec<Action> {
        let actions = self.core.resize(self.surface.container_width());
        if let Err(e) = self.surface.set_display(&self.core.spaces) {
            log::warn!("canvas not resized: {e}");
        }
        match self.surface.measure() {
            Ok(bounds) => self.core.set_bounds(bounds),
            Err(e) => log::warn!("canvas not measurable: {e}"),
        }
        actions
    }

    /// Scene frame callback.
    pub fn render_scene(&mut self) -> Vec<Action> {
        match self.core.render_scene(&mut self.surface) {
            Ok(actions) => actions,
            Err(e) => {
                log::error!("scene render failed: {e}");
                Vec::new()
            }
        }
    }

    /// Leader-line frame callback.
    pub fn render_leaders(&mut self) {
        if let Err(e) = self.core.render_leaders(&mut self.surface) {
            log::error!("leader render failed: {e}");
        }
    }

    /// Screenshot: re-render at full resolution before the host exports.
    pub fn begin_capture(&mut self) -> Vec<Action> {
        match self.core.begin_capture(&mut self.surface) {
            Ok(actions) => actions,
            Err(e) => {
                log::error!("capture render failed: {e}");
                self.core.capture_finished(Err(e.to_string()))
            }
        }
    }
}

/// Editor bound to the page. Wraps `EditorCore` and owns the browser surface.
pub struct EditorEngine {
    surface: WebSurface,
    pub core: EditorCore,
}

impl EditorEngine {
    /// # Errors
    ///
    /// Returns an error if the canvas has no 2D context.
    pub fn new(
        document: Document,
        canvas: HtmlCanvasElement,
        wrapper: HtmlElement,
        image: HtmlImageElement,
        config: CanvasConfig,
    ) -> Result<Self, CanvasError> {
        let surface = WebSurface::new(document, canvas, wrapper, image)?;
        Ok(Self { surface, core: EditorCore::new(config) })
    }

    /// Look up the editor elements by id and start loading `image_url`.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::MissingElement`] if either element is absent.
    pub fn mount(canvas_id: &str, wrapper_id: &str, image_url: &str, config: CanvasConfig) -> Result<Self, CanvasError> {
        let (document, canvas, wrapper) = web::lookup(canvas_id, wrapper_id)?;
        let image = web::new_image(image_url)?;
        Self::new(document, canvas, wrapper, image, config)
    }

    pub fn surface(&mut self) -> &mut WebSurface {
        &mut self.surface
    }

    pub fn image_loaded(&mut self) -> Vec<Action> {
        let Some(natural) = self.surface.natural_size() else {
            log::warn!("image load reported before the image decoded");
            return Vec::new();
        };
        let mut actions = self.core.image_loaded(natural);
        actions.extend(self.resize());
        actions
    }

    pub fn resize(&mut self) -> Vec<Action> {
        let actions = self.core.resize(self.surface.container_width());
        if let Err(e) = self.surface.set_display(&self.core.spaces) {
            log::warn!("canvas not resized: {e}");
        }
        match self.surface.measure() {
            Ok(bounds) => self.core.set_bounds(bounds),
            Err(e) => log::warn!("canvas not measurable: {e}"),
        }
        actions
    }

    /// Frame callback.
    pub fn render(&mut self) {
        if let Err(e) = self.core.render(&mut self.surface) {
            log::error!("editor render failed: {e}");
        }
    }
}
