//! Read-only site-map viewer.
//!
//! `ViewerCore` owns the scene, viewport, popup layer and gesture state of one
//! viewer mount. Every handler takes client-space positions (as reported by
//! DOM events) and returns the [`Action`]s the host must carry out. Nothing
//! here touches the browser; drawing happens in the frame callbacks against a
//! [`Surface`].

#[cfg(test)]
#[path = "viewer_test.rs"]
mod viewer_test;

use crate::config::{CanvasConfig, SiteMapData};
use crate::engine::{Action, ControlState, FramePass, FrameScheduler, Notice};
use crate::error::CanvasError;
use crate::geometry::{Point, Rect, Size};
use crate::input::{Button, TouchTap, ViewerMode, WheelDelta};
use crate::popup::{OverlayId, PopupLayer};
use crate::render::{BackgroundImage, draw_leaders, draw_scene};
use crate::scene::{Polygon, PolygonRecord, Scene};
use crate::space::{Spaces, display_for_width};
use crate::surface::{CanvasBounds, Surface};
use crate::viewport::{Pinch, Viewport};

const CURSOR_IDLE: &str = "pointer";
const CURSOR_GRAY_PICK: &str = "cell";
const CURSOR_PANNING: &str = "grabbing";

/// Viewer state: all logic that doesn't depend on the page.
///
/// Separated from `ViewerEngine` so it can be tested without a browser.
#[derive(Debug, Clone)]
pub struct ViewerCore {
    pub scene: Scene,
    pub viewport: Viewport,
    pub spaces: Spaces,
    pub popups: PopupLayer,
    pub image: BackgroundImage,
    pub mode: ViewerMode,
    /// Last measured canvas and wrapper rectangles.
    pub bounds: CanvasBounds,
    pub config: CanvasConfig,
    frames: FrameScheduler,
}

impl Default for ViewerCore {
    fn default() -> Self {
        Self::new(CanvasConfig::viewer())
    }
}

impl ViewerCore {
    #[must_use]
    pub fn new(config: CanvasConfig) -> Self {
        let display = display_for_width(Spaces::default().display.width, None);
        Self {
            scene: Scene::new(),
            viewport: config.viewport(),
            spaces: Spaces::new(display, config.device_ratio),
            popups: config.popup_layer(),
            image: BackgroundImage::new(),
            mode: ViewerMode::Idle,
            bounds: CanvasBounds::default(),
            config,
            frames: FrameScheduler::default(),
        }
    }

    /// Build from the page payload, loading its polygons.
    #[must_use]
    pub fn from_data(data: SiteMapData) -> Self {
        let mut core = Self::new(data.config);
        core.load_records(data.polygons);
        core
    }

    // --- Data inputs ---

    /// Replace all polygons. Open panels refer to polygon indices, so they close.
    pub fn load_records(&mut self, records: Vec<PolygonRecord>) -> Vec<Action> {
        self.popups.clear();
        let skipped = self.scene.load_records(records);
        log::debug!("viewer loaded {} polygon(s), skipped {skipped}", self.scene.len());
        let mut out = Vec::new();
        self.request(FramePass::Scene, &mut out);
        self.request(FramePass::Leaders, &mut out);
        out
    }

    pub fn set_bounds(&mut self, bounds: CanvasBounds) {
        self.bounds = bounds;
    }

    // --- Helpers ---

    fn request(&mut self, pass: FramePass, out: &mut Vec<Action>) {
        if self.frames.request(pass) {
            out.push(Action::RequestFrame(pass));
        }
    }

    fn zoom_changed(&mut self, out: &mut Vec<Action>) {
        out.push(Action::ZoomChanged { scale: self.viewport.scale, percent: self.viewport.zoom_percent() });
        self.request(FramePass::Scene, out);
    }

    fn canvas_origin(&self) -> Point {
        self.bounds.canvas.origin()
    }

    /// Canvas-local pixel for a client position.
    fn local(&self, client: Point) -> Point {
        let origin = self.canvas_origin();
        Point::new(client.x - origin.x, client.y - origin.y)
    }

    fn to_ref(&self, client: Point) -> Point {
        self.spaces.screen_to_ref(client, self.canvas_origin(), &self.viewport)
    }

    fn idle_cursor(&self) -> &'static str {
        if self.scene.gray.interactive { CURSOR_GRAY_PICK } else { CURSOR_IDLE }
    }

    #[must_use]
    pub fn controls(&self) -> ControlState {
        ControlState {
            polygons_visible: self.scene.visible(),
            force_gray: self.scene.gray.force_all,
            interactive_gray: self.scene.gray.interactive,
            zoom_locked: self.viewport.locked,
        }
    }

    #[must_use]
    pub fn is_pending(&self, pass: FramePass) -> bool {
        self.frames.is_pending(pass)
    }

    // --- Mouse ---

    /// Secondary button starts a pan. The zoom lock does not apply to mouse panning.
    pub fn mouse_down(&mut self, client: Point, button: Button) -> Vec<Action> {
        if button != Button::Secondary {
            return Vec::new();
        }
        self.mode = ViewerMode::Panning { last: client, touch: None };
        vec![Action::ConsumeEvent, Action::SetCursor(CURSOR_PANNING.into())]
    }

    pub fn mouse_move(&mut self, client: Point) -> Vec<Action> {
        let ViewerMode::Panning { last, touch: None } = self.mode else {
            return Vec::new();
        };
        self.viewport.pan_by(client.x - last.x, client.y - last.y);
        self.mode = ViewerMode::Panning { last: client, touch: None };
        let mut out = Vec::new();
        self.request(FramePass::Scene, &mut out);
        out
    }

    pub fn mouse_up(&mut self, _client: Point) -> Vec<Action> {
        if !matches!(self.mode, ViewerMode::Panning { touch: None, .. }) {
            return Vec::new();
        }
        self.mode = ViewerMode::Idle;
        vec![Action::SetCursor(self.idle_cursor().into())]
    }

    /// Primary click (or tap). In interactive gray mode this toggles the
    /// polygon's override; otherwise it flips the polygon's selection and
    /// opens or detaches its panel.
    pub fn click(&mut self, client: Point) -> Vec<Action> {
        let Some(index) = self.scene.polygon_at(self.to_ref(client)) else {
            return Vec::new();
        };
        let mut out = Vec::new();

        if self.scene.gray.interactive {
            self.scene.gray.toggle(index);
            self.request(FramePass::Scene, &mut out);
            return out;
        }

        if self.scene.is_selected(index) {
            self.scene.deselect(index);
            self.popups.deselect(index);
        } else {
            let entity = self.scene.polygon(index).and_then(Polygon::entity_id);
            let canvas = self.bounds.canvas_in_wrapper();
            let selection = self.popups.select(index, entity, &canvas);
            for evicted in &selection.evicted {
                self.scene.deselect(*evicted);
            }
            self.scene.select(index);
        }
        self.request(FramePass::Scene, &mut out);
        out
    }

    pub fn wheel(&mut self, client: Point, delta: WheelDelta) -> Vec<Action> {
        if self.viewport.locked {
            return Vec::new();
        }
        let mut out = vec![Action::ConsumeEvent];
        if self.viewport.wheel(self.local(client), delta.dy) {
            self.zoom_changed(&mut out);
        }
        out
    }

    // --- Touch ---

    /// `touches` are the client positions of all fingers now on the canvas.
    /// While zoom is locked, touch input is left to the browser.
    pub fn touch_start(&mut self, touches: &[Point]) -> Vec<Action> {
        if self.viewport.locked {
            return Vec::new();
        }
        match *touches {
            [t] => {
                let on_polygon = self.scene.polygon_at(self.to_ref(t)).is_some();
                self.mode = ViewerMode::Panning { last: t, touch: Some(TouchTap::new(t, on_polygon)) };
                Vec::new()
            }
            [a, b] => {
                self.mode = ViewerMode::Pinching(Pinch::begin(a, b, &self.viewport));
                vec![Action::ConsumeEvent]
            }
            _ => Vec::new(),
        }
    }

    pub fn touch_move(&mut self, touches: &[Point]) -> Vec<Action> {
        if self.viewport.locked {
            return Vec::new();
        }
        let mut out = Vec::new();
        match (self.mode, touches) {
            (ViewerMode::Panning { last, touch: Some(mut tap) }, &[t]) => {
                if !tap.track(t) {
                    self.mode = ViewerMode::Panning { last, touch: Some(tap) };
                    return out;
                }
                out.push(Action::ConsumeEvent);
                self.viewport.pan_by(t.x - last.x, t.y - last.y);
                self.mode = ViewerMode::Panning { last: t, touch: Some(tap) };
                self.request(FramePass::Scene, &mut out);
            }
            (ViewerMode::Pinching(pinch), &[a, b]) => {
                out.push(Action::ConsumeEvent);
                if pinch.update(self.local(a), self.local(b), &mut self.viewport) {
                    self.zoom_changed(&mut out);
                }
            }
            _ => {}
        }
        out
    }

    /// `remaining` are the fingers still down after the lift.
    pub fn touch_end(&mut self, remaining: &[Point]) -> Vec<Action> {
        if self.viewport.locked {
            return Vec::new();
        }
        match *remaining {
            [] => {
                let mode = std::mem::take(&mut self.mode);
                match mode {
                    ViewerMode::Panning { last, touch: Some(tap) } if !tap.moved => {
                        // Handled here; the browser's synthetic click would toggle twice.
                        let mut out = vec![Action::ConsumeEvent];
                        out.extend(self.click(last));
                        out
                    }
                    _ => Vec::new(),
                }
            }
            [t] => {
                // Pinch to pan: the remaining finger pans straight away.
                let tap = TouchTap { start: t, on_polygon: false, moved: true };
                self.mode = ViewerMode::Panning { last: t, touch: Some(tap) };
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    // --- Panels ---

    /// Pointer down on a panel header.
    pub fn panel_drag_start(&mut self, panel: OverlayId, client: Point) -> Vec<Action> {
        let Some(found) = self.popups.panel(panel) else {
            return Vec::new();
        };
        self.mode = ViewerMode::DraggingPanel { panel, start: client, origin: found.position };
        vec![Action::ConsumeEvent]
    }

    pub fn panel_drag_move(&mut self, client: Point) -> Vec<Action> {
        let ViewerMode::DraggingPanel { panel, start, origin } = self.mode else {
            return Vec::new();
        };
        let delta = Point::new(client.x - start.x, client.y - start.y);
        let mut out = vec![Action::ConsumeEvent];
        if self.popups.drag(panel, origin, delta, self.bounds.wrapper.size()) {
            self.request(FramePass::Leaders, &mut out);
        }
        out
    }

    pub fn panel_drag_end(&mut self) -> Vec<Action> {
        if matches!(self.mode, ViewerMode::DraggingPanel { .. }) {
            self.mode = ViewerMode::Idle;
        }
        Vec::new()
    }

    /// Close button: the panel goes and its polygons are deselected.
    pub fn close_panel(&mut self, panel: OverlayId) -> Vec<Action> {
        let polygons = self.popups.close(panel);
        if polygons.is_empty() {
            return Vec::new();
        }
        for index in polygons {
            self.scene.deselect(index);
        }
        let mut out = Vec::new();
        self.request(FramePass::Scene, &mut out);
        out
    }

    /// The host laid out a panel's content at a new size.
    pub fn panel_resized(&mut self, panel: OverlayId, size: Size) -> Vec<Action> {
        let mut out = Vec::new();
        if self.popups.resize(panel, size) {
            self.request(FramePass::Leaders, &mut out);
        }
        out
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

    /// Slider input: absolute scale, clamped.
    pub fn set_zoom(&mut self, scale: f64) -> Vec<Action> {
        let center = self.spaces.image_center();
        self.zoom_control(|vp| vp.set_scale_centered(center, scale))
    }

    fn zoom_control(&mut self, apply: impl FnOnce(&mut Viewport) -> bool) -> Vec<Action> {
        let mut out = Vec::new();
        if self.viewport.locked {
            return out;
        }
        if apply(&mut self.viewport) {
            self.zoom_changed(&mut out);
        }
        out
    }

    // --- Toggles ---

    pub fn toggle_polygons(&mut self) -> Vec<Action> {
        let visible = self.scene.toggle_visible();
        log::debug!("polygons visible: {visible}");
        self.controls_changed()
    }

    /// Gray everything (or undo). Both override sets reset either way.
    pub fn toggle_force_gray(&mut self) -> Vec<Action> {
        self.scene.gray.toggle_force_all();
        let mut out = self.controls_changed();
        out.push(Action::SetCursor(self.idle_cursor().into()));
        out
    }

    /// Clicks toggle gray overrides instead of selecting while this is on.
    pub fn toggle_interactive_gray(&mut self) -> Vec<Action> {
        self.scene.gray.toggle_interactive();
        let mut out = self.controls_changed();
        out.push(Action::SetCursor(self.idle_cursor().into()));
        out
    }

    pub fn toggle_zoom_lock(&mut self) -> Vec<Action> {
        self.viewport.locked = !self.viewport.locked;
        if self.viewport.locked && !matches!(self.mode, ViewerMode::DraggingPanel { .. }) {
            self.mode = ViewerMode::Idle;
        }
        log::debug!("zoom locked: {}", self.viewport.locked);
        vec![Action::ControlsChanged(self.controls())]
    }

    fn controls_changed(&mut self) -> Vec<Action> {
        let mut out = vec![Action::ControlsChanged(self.controls())];
        self.request(FramePass::Scene, &mut out);
        out
    }

    // --- Layout ---

    /// Container width changed (or the image loaded): re-derive the display size.
    pub fn resize(&mut self, width: f64) -> Vec<Action> {
        self.spaces.display = display_for_width(width, self.image.aspect());
        let mut out = Vec::new();
        self.request(FramePass::Scene, &mut out);
        out
    }

    /// Background decoded at `natural` size.
    pub fn image_loaded(&mut self, natural: Size) -> Vec<Action> {
        self.image.loaded(natural);
        log::debug!("background {}x{}, downsampled: {}", natural.width, natural.height, self.image.has_downsampled());
        let mut out = Vec::new();
        self.request(FramePass::Scene, &mut out);
        out
    }

    pub fn downsample_failed(&mut self) {
        self.image.drop_downsampled();
    }

    // --- Capture ---

    /// Force the full-resolution image and draw synchronously, then ask the
    /// host to export.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the synchronous render fails; call
    /// [`ViewerCore::capture_finished`] with the failure to restore state.
    pub fn begin_capture<S: Surface + ?Sized>(&mut self, surface: &mut S) -> Result<Vec<Action>, CanvasError> {
        self.image.set_capture(true);
        draw_scene(surface, &self.scene, &self.spaces, &self.viewport, &self.image, self.config.sharp_zoom_threshold)?;
        Ok(vec![Action::Capture { scale: self.config.capture_scale }])
    }

    /// Export finished: back to the downsampled image and redraw.
    pub fn capture_finished(&mut self, result: Result<(), String>) -> Vec<Action> {
        self.image.set_capture(false);
        let mut out = Vec::new();
        if let Err(message) = result {
            log::error!("screenshot failed: {message}");
            out.push(Action::Notify(Notice::error(format!("Screenshot failed: {message}"))));
        }
        self.request(FramePass::Scene, &mut out);
        out
    }

    // --- Frame callbacks ---

    /// Scene pass. Requests the leader pass when there are panels to place.
    ///
    /// # Errors
    ///
    /// Returns `Err` if any surface call fails.
    pub fn render_scene<S: Surface + ?Sized>(&mut self, surface: &mut S) -> Result<Vec<Action>, CanvasError> {
        self.frames.begin(FramePass::Scene);
        draw_scene(surface, &self.scene, &self.spaces, &self.viewport, &self.image, self.config.sharp_zoom_threshold)?;
        let mut out = Vec::new();
        if !self.popups.is_empty() || self.popups.has_pending() {
            self.request(FramePass::Leaders, &mut out);
        }
        Ok(out)
    }

    /// Leader pass: re-measure, flush overlays, place panels and leaders.
    ///
    /// # Errors
    ///
    /// Returns `Err` if measuring or any surface call fails.
    pub fn render_leaders<S: Surface + ?Sized>(&mut self, surface: &mut S) -> Result<(), CanvasError> {
        self.frames.begin(FramePass::Leaders);
        self.bounds = surface.measure()?;
        draw_leaders(surface, &mut self.popups, &self.scene, &self.spaces, &self.viewport, &self.bounds)
    }

    /// Canvas rectangle inside the wrapper, as of the last measurement.
    #[must_use]
    pub fn canvas_in_wrapper(&self) -> Rect {
        self.bounds.canvas_in_wrapper()
    }
}
