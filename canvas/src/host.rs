//! `wasm-bindgen` entry points for the page.
//!
//! [`SiteMapViewer`] and [`SitePlanEditor`] mount an engine on existing
//! elements, attach DOM listeners that feed the core, and carry out the
//! actions that belong to the browser: animation frames, `preventDefault`
//! and the cursor. Every other [`Action`] is handed to the page's callback
//! as a JSON object, and the page answers through the exported methods
//! (`store_succeeded`, `entity_picked`, `capture_finished`, ...).
//!
//! Listeners hold weak references to the engine, so dropping (or `free()`ing)
//! a handle detaches everything.

#[cfg(test)]
#[path = "host_test.rs"]
mod host_test;

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use js_sys::Function;
use uuid::Uuid;
use wasm_bindgen::prelude::*;
use web_sys::{
    AddEventListenerOptions, Element, Event, EventTarget, HtmlCanvasElement, KeyboardEvent, MouseEvent, TouchEvent,
    WheelEvent,
};

use crate::config::{CanvasConfig, SiteMapData};
use crate::engine::{Action, EditorEngine, FramePass, StoreOp, ViewerEngine};
use crate::error::CanvasError;
use crate::geometry::{Point, Size};
use crate::input::{Button, Key, Modifiers, Tool, WheelDelta};
use crate::popup::OverlayId;
use crate::scene::{EntityRef, PolygonRecord};
use crate::web;

const PANEL_SELECTOR: &str = ".siteplan-panel";
const OVERLAY_ID_ATTR: &str = "data-overlay-id";
/// Elements inside a panel carrying this attribute close it.
const CLOSE_SELECTOR: &str = "[data-panel-close]";

/// Install the console logger. `level` is a `log` level name; unknown names
/// fall back to `info`.
#[wasm_bindgen(js_name = initLogging)]
pub fn init_logging(level: &str) {
    web::init_logging(parse_level(level));
}

fn parse_level(text: &str) -> log::Level {
    text.parse().unwrap_or(log::Level::Info)
}

// =============================================================
// Action routing
// =============================================================

/// Where an action is carried out.
#[derive(Debug, Clone, PartialEq)]
enum Route {
    Frame(FramePass),
    /// `preventDefault` on the event being handled.
    Consume,
    Cursor(String),
    /// The page's action callback.
    Page(Action),
}

fn route(action: Action) -> Route {
    match action {
        Action::RequestFrame(pass) => Route::Frame(pass),
        Action::ConsumeEvent => Route::Consume,
        Action::SetCursor(cursor) => Route::Cursor(cursor),
        other => Route::Page(other),
    }
}

fn encode(action: &Action) -> Result<String, CanvasError> {
    Ok(serde_json::to_string(action)?)
}

fn parse_overlay(text: &str) -> Result<OverlayId, CanvasError> {
    Uuid::parse_str(text).map_err(|_| CanvasError::UnknownOverlay(text.to_owned()))
}

fn parse_store_op(json: &str) -> Result<StoreOp, CanvasError> {
    Ok(serde_json::from_str(json)?)
}

fn parse_records(json: &str) -> Result<Vec<PolygonRecord>, CanvasError> {
    Ok(serde_json::from_str(json)?)
}

/// `None` (or JSON `null`) is a cancelled picker.
fn parse_entity(json: Option<&str>) -> Result<Option<EntityRef>, CanvasError> {
    match json {
        Some(text) => Ok(serde_json::from_str(text)?),
        None => Ok(None),
    }
}

// =============================================================
// Mount plumbing
// =============================================================

/// An engine as the frame loop sees it.
trait Bound: 'static {
    fn frame(&mut self, pass: FramePass) -> Vec<Action>;
}

impl Bound for ViewerEngine {
    fn frame(&mut self, pass: FramePass) -> Vec<Action> {
        match pass {
            FramePass::Scene => self.render_scene(),
            FramePass::Leaders => {
                self.render_leaders();
                Vec::new()
            }
        }
    }
}

impl Bound for EditorEngine {
    fn frame(&mut self, _pass: FramePass) -> Vec<Action> {
        self.render();
        Vec::new()
    }
}

struct Mount<E> {
    engine: RefCell<E>,
    canvas: HtmlCanvasElement,
    on_action: Function,
}

type Handler<E> = fn(&mut E, &Event) -> Vec<Action>;

/// A DOM listener, removed when dropped.
struct Listener {
    target: EventTarget,
    kind: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

impl Drop for Listener {
    fn drop(&mut self) {
        let callback: &Function = self.callback.as_ref().unchecked_ref();
        if let Err(e) = self.target.remove_event_listener_with_callback(self.kind, callback) {
            log::warn!("{} listener not removed: {e:?}", self.kind);
        }
    }
}

/// Non-passive so handlers may `preventDefault` wheel and touch events.
fn listen<E: Bound>(
    mount: &Rc<Mount<E>>,
    target: &EventTarget,
    kind: &'static str,
    handler: Handler<E>,
) -> Result<Listener, CanvasError> {
    let weak: Weak<Mount<E>> = Rc::downgrade(mount);
    let callback = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
        let Some(mount) = weak.upgrade() else {
            return;
        };
        let actions = {
            let mut engine = mount.engine.borrow_mut();
            handler(&mut *engine, &event)
        };
        dispatch(&mount, actions, Some(&event));
    });
    let options = AddEventListenerOptions::new();
    options.set_passive(false);
    target.add_event_listener_with_callback_and_add_event_listener_options(
        kind,
        callback.as_ref().unchecked_ref(),
        &options,
    )?;
    Ok(Listener { target: target.clone(), kind, callback })
}

/// Run `f` against the engine, then carry out what it returned.
fn apply<E: Bound>(mount: &Rc<Mount<E>>, f: impl FnOnce(&mut E) -> Vec<Action>) {
    let actions = {
        let mut engine = mount.engine.borrow_mut();
        f(&mut *engine)
    };
    dispatch(mount, actions, None);
}

fn dispatch<E: Bound>(mount: &Rc<Mount<E>>, actions: Vec<Action>, event: Option<&Event>) {
    for action in actions {
        match route(action) {
            Route::Frame(pass) => schedule(mount, pass),
            Route::Consume => {
                if let Some(event) = event {
                    event.prevent_default();
                }
            }
            Route::Cursor(cursor) => {
                if let Err(e) = mount.canvas.style().set_property("cursor", &cursor) {
                    log::warn!("cursor not set: {e:?}");
                }
            }
            Route::Page(action) => {
                if let Err(e) = forward(&mount.on_action, &action) {
                    log::error!("action callback failed for {action:?}: {e}");
                }
            }
        }
    }
}

fn forward(callback: &Function, action: &Action) -> Result<(), CanvasError> {
    let value = js_sys::JSON::parse(&encode(action)?)?;
    callback.call1(&JsValue::NULL, &value)?;
    Ok(())
}

/// The core only emits `RequestFrame` for a pass that is not already
/// pending, so each call here is one `requestAnimationFrame`. Without a
/// window the frame runs at once.
fn schedule<E: Bound>(mount: &Rc<Mount<E>>, pass: FramePass) {
    let weak = Rc::downgrade(mount);
    let callback = Closure::once_into_js(move |_timestamp: f64| {
        if let Some(mount) = weak.upgrade() {
            run_frame(&mount, pass);
        }
    });
    match web_sys::window().map(|w| w.request_animation_frame(callback.unchecked_ref())) {
        Some(Ok(_)) => {}
        Some(Err(e)) => {
            log::warn!("requestAnimationFrame failed, drawing now: {e:?}");
            run_frame(mount, pass);
        }
        None => run_frame(mount, pass),
    }
}

fn run_frame<E: Bound>(mount: &Rc<Mount<E>>, pass: FramePass) {
    apply(mount, |engine| engine.frame(pass));
}

fn window() -> Result<web_sys::Window, CanvasError> {
    web_sys::window().ok_or_else(|| CanvasError::MissingElement("window".into()))
}

// =============================================================
// Event decoding
// =============================================================

fn client_point(event: &MouseEvent) -> Point {
    Point::new(f64::from(event.client_x()), f64::from(event.client_y()))
}

fn pointer(event: &Event) -> Option<Point> {
    event.dyn_ref::<MouseEvent>().map(client_point)
}

fn mouse(event: &Event) -> Option<(Point, Button)> {
    let m = event.dyn_ref::<MouseEvent>()?;
    Some((client_point(m), Button::from_index(m.button())?))
}

fn wheel(event: &Event) -> Option<(Point, WheelDelta)> {
    let w = event.dyn_ref::<WheelEvent>()?;
    Some((client_point(w), WheelDelta { dy: w.delta_y() }))
}

/// Client positions of the fingers still on the surface.
fn touches(event: &Event) -> Vec<Point> {
    let Some(t) = event.dyn_ref::<TouchEvent>() else {
        return Vec::new();
    };
    let list = t.touches();
    (0..list.length())
        .filter_map(|i| list.get(i))
        .map(|touch| Point::new(f64::from(touch.client_x()), f64::from(touch.client_y())))
        .collect()
}

/// The panel under the event target, and whether a close control was hit.
fn panel_hit(event: &Event) -> Option<(OverlayId, bool)> {
    let target = event.target()?;
    let element = target.dyn_ref::<Element>()?;
    let Ok(Some(panel)) = element.closest(PANEL_SELECTOR) else {
        return None;
    };
    let id = panel.get_attribute(OVERLAY_ID_ATTR)?;
    let id = match parse_overlay(&id) {
        Ok(id) => id,
        Err(e) => {
            log::warn!("{e}");
            return None;
        }
    };
    Some((id, matches!(element.closest(CLOSE_SELECTOR), Ok(Some(_)))))
}

fn consume<E>(_: &mut E, _: &Event) -> Vec<Action> {
    vec![Action::ConsumeEvent]
}

// =============================================================
// Viewer
// =============================================================

fn viewer_mouse_down(engine: &mut ViewerEngine, event: &Event) -> Vec<Action> {
    mouse(event).map_or_else(Vec::new, |(at, button)| engine.core.mouse_down(at, button))
}

/// Panel drags and pans continue outside the canvas.
fn viewer_mouse_move(engine: &mut ViewerEngine, event: &Event) -> Vec<Action> {
    let Some(at) = pointer(event) else {
        return Vec::new();
    };
    let mut out = engine.core.panel_drag_move(at);
    out.extend(engine.core.mouse_move(at));
    out
}

fn viewer_mouse_up(engine: &mut ViewerEngine, event: &Event) -> Vec<Action> {
    let Some(at) = pointer(event) else {
        return Vec::new();
    };
    let mut out = engine.core.panel_drag_end();
    out.extend(engine.core.mouse_up(at));
    out
}

fn viewer_click(engine: &mut ViewerEngine, event: &Event) -> Vec<Action> {
    match mouse(event) {
        Some((at, Button::Primary)) => engine.core.click(at),
        _ => Vec::new(),
    }
}

fn viewer_wheel(engine: &mut ViewerEngine, event: &Event) -> Vec<Action> {
    wheel(event).map_or_else(Vec::new, |(at, delta)| engine.core.wheel(at, delta))
}

fn viewer_touch_start(engine: &mut ViewerEngine, event: &Event) -> Vec<Action> {
    engine.core.touch_start(&touches(event))
}

fn viewer_touch_move(engine: &mut ViewerEngine, event: &Event) -> Vec<Action> {
    engine.core.touch_move(&touches(event))
}

fn viewer_touch_end(engine: &mut ViewerEngine, event: &Event) -> Vec<Action> {
    engine.core.touch_end(&touches(event))
}

/// Mouse down inside the wrapper: a panel's close control or its body.
fn viewer_panel_down(engine: &mut ViewerEngine, event: &Event) -> Vec<Action> {
    let (Some((panel, close)), Some(at)) = (panel_hit(event), pointer(event)) else {
        return Vec::new();
    };
    if close { engine.core.close_panel(panel) } else { engine.core.panel_drag_start(panel, at) }
}

fn viewer_resize(engine: &mut ViewerEngine, _: &Event) -> Vec<Action> {
    engine.resize()
}

fn viewer_image_loaded(engine: &mut ViewerEngine, _: &Event) -> Vec<Action> {
    engine.image_loaded()
}

/// Read-only site map mounted on the portal page.
#[wasm_bindgen]
pub struct SiteMapViewer {
    mount: Rc<Mount<ViewerEngine>>,
    listeners: Vec<Listener>,
}

#[wasm_bindgen]
impl SiteMapViewer {
    /// Mount on `canvas_id` inside `wrapper_id`. `data_json` is the page's
    /// site-map payload; `on_action` receives the actions the page handles.
    ///
    /// # Errors
    ///
    /// Throws if the payload does not parse or an element is missing.
    #[wasm_bindgen(constructor)]
    pub fn new(
        canvas_id: &str,
        wrapper_id: &str,
        data_json: &str,
        on_action: Function,
    ) -> Result<SiteMapViewer, JsValue> {
        let data = SiteMapData::from_json(data_json)?;
        let mut engine = ViewerEngine::mount(canvas_id, wrapper_id, data)?;
        let surface = engine.surface();
        let (canvas, wrapper, image) = (surface.canvas().clone(), surface.wrapper().clone(), surface.image().clone());
        let mount = Rc::new(Mount { engine: RefCell::new(engine), canvas: canvas.clone(), on_action });
        let window = window()?;

        let listeners = vec![
            listen(&mount, &canvas, "mousedown", viewer_mouse_down)?,
            listen(&mount, &canvas, "click", viewer_click)?,
            listen(&mount, &canvas, "wheel", viewer_wheel)?,
            listen(&mount, &canvas, "touchstart", viewer_touch_start)?,
            listen(&mount, &canvas, "touchmove", viewer_touch_move)?,
            listen(&mount, &canvas, "touchend", viewer_touch_end)?,
            listen(&mount, &canvas, "contextmenu", consume)?,
            listen(&mount, &wrapper, "mousedown", viewer_panel_down)?,
            listen(&mount, &window, "mousemove", viewer_mouse_move)?,
            listen(&mount, &window, "mouseup", viewer_mouse_up)?,
            listen(&mount, &window, "resize", viewer_resize)?,
            listen(&mount, &image, "load", viewer_image_loaded)?,
        ];
        let viewer = Self { mount, listeners };
        if image.complete() {
            apply(&viewer.mount, ViewerEngine::image_loaded);
        } else {
            apply(&viewer.mount, ViewerEngine::resize);
        }
        log::info!("site map viewer mounted on #{canvas_id}");
        Ok(viewer)
    }

    /// Remove every DOM listener. The handle stays usable for control calls.
    pub fn detach(&mut self) {
        self.listeners.clear();
    }

    /// The canvas, for screenshot export.
    pub fn canvas(&self) -> HtmlCanvasElement {
        self.mount.canvas.clone()
    }

    /// `renderer(element, polygon, entity)` fills each new panel.
    pub fn set_panel_renderer(&self, renderer: Function) {
        self.mount.engine.borrow_mut().surface().set_panel_renderer(renderer);
    }

    /// # Errors
    ///
    /// Throws if `json` is not an array of polygon records.
    pub fn load_polygons(&self, json: &str) -> Result<(), JsValue> {
        let records = parse_records(json)?;
        apply(&self.mount, |engine| engine.core.load_records(records));
        Ok(())
    }

    pub fn resize(&self) {
        apply(&self.mount, ViewerEngine::resize);
    }

    pub fn zoom_in(&self) {
        apply(&self.mount, |engine| engine.core.zoom_in());
    }

    pub fn zoom_out(&self) {
        apply(&self.mount, |engine| engine.core.zoom_out());
    }

    pub fn reset_zoom(&self) {
        apply(&self.mount, |engine| engine.core.reset_zoom());
    }

    /// Slider input.
    pub fn set_zoom(&self, scale: f64) {
        apply(&self.mount, |engine| engine.core.set_zoom(scale));
    }

    pub fn toggle_polygons(&self) {
        apply(&self.mount, |engine| engine.core.toggle_polygons());
    }

    pub fn toggle_force_gray(&self) {
        apply(&self.mount, |engine| engine.core.toggle_force_gray());
    }

    pub fn toggle_interactive_gray(&self) {
        apply(&self.mount, |engine| engine.core.toggle_interactive_gray());
    }

    pub fn toggle_zoom_lock(&self) {
        apply(&self.mount, |engine| engine.core.toggle_zoom_lock());
    }

    /// # Errors
    ///
    /// Throws if `panel` is not an overlay id.
    pub fn close_panel(&self, panel: &str) -> Result<(), JsValue> {
        let id = parse_overlay(panel)?;
        apply(&self.mount, |engine| engine.core.close_panel(id));
        Ok(())
    }

    /// The page laid out a panel's content at a new size.
    ///
    /// # Errors
    ///
    /// Throws if `panel` is not an overlay id.
    pub fn panel_resized(&self, panel: &str, width: f64, height: f64) -> Result<(), JsValue> {
        let id = parse_overlay(panel)?;
        apply(&self.mount, |engine| engine.core.panel_resized(id, Size::new(width, height)));
        Ok(())
    }

    /// Draw at full resolution; the page receives a `capture` action.
    pub fn capture(&self) {
        apply(&self.mount, ViewerEngine::begin_capture);
    }

    /// Export done. `error` is the failure message, if any.
    pub fn capture_finished(&self, error: Option<String>) {
        let result = error.map_or(Ok(()), Err);
        apply(&self.mount, |engine| engine.core.capture_finished(result));
    }
}

// =============================================================
// Editor
// =============================================================

fn editor_mouse_down(engine: &mut EditorEngine, event: &Event) -> Vec<Action> {
    mouse(event).map_or_else(Vec::new, |(at, button)| engine.core.mouse_down(at, button))
}

fn editor_mouse_move(engine: &mut EditorEngine, event: &Event) -> Vec<Action> {
    pointer(event).map_or_else(Vec::new, |at| engine.core.mouse_move(at))
}

fn editor_mouse_up(engine: &mut EditorEngine, event: &Event) -> Vec<Action> {
    mouse(event).map_or_else(Vec::new, |(_, button)| engine.core.mouse_up(button))
}

fn editor_wheel(engine: &mut EditorEngine, event: &Event) -> Vec<Action> {
    wheel(event).map_or_else(Vec::new, |(at, delta)| engine.core.wheel(at, delta))
}

fn editor_key_down(engine: &mut EditorEngine, event: &Event) -> Vec<Action> {
    let Some(k) = event.dyn_ref::<KeyboardEvent>() else {
        return Vec::new();
    };
    engine.core.key_down(&Key::new(k.key()), Modifiers { ctrl: k.ctrl_key() })
}

fn editor_resize(engine: &mut EditorEngine, _: &Event) -> Vec<Action> {
    engine.resize()
}

fn editor_image_loaded(engine: &mut EditorEngine, _: &Event) -> Vec<Action> {
    engine.image_loaded()
}

/// Back-office polygon editor for one site-plan record.
#[wasm_bindgen]
pub struct SitePlanEditor {
    mount: Rc<Mount<EditorEngine>>,
    listeners: Vec<Listener>,
}

#[wasm_bindgen]
impl SitePlanEditor {
    /// Mount on `canvas_id` inside `wrapper_id`, drawing over `image_url`.
    /// Without `config_json` the editor preset applies; a given config fills
    /// missing fields from the viewer preset.
    ///
    /// # Errors
    ///
    /// Throws if the config does not parse or an element is missing.
    #[wasm_bindgen(constructor)]
    pub fn new(
        canvas_id: &str,
        wrapper_id: &str,
        image_url: &str,
        config_json: Option<String>,
        on_action: Function,
    ) -> Result<SitePlanEditor, JsValue> {
        let config = match config_json.as_deref() {
            Some(text) => CanvasConfig::from_json(text)?,
            None => CanvasConfig::editor(),
        };
        let mut engine = EditorEngine::mount(canvas_id, wrapper_id, image_url, config)?;
        let surface = engine.surface();
        let (canvas, image) = (surface.canvas().clone(), surface.image().clone());
        let mount = Rc::new(Mount { engine: RefCell::new(engine), canvas: canvas.clone(), on_action });
        let window = window()?;
        let document = window.document().ok_or_else(|| CanvasError::MissingElement("document".into()))?;

        let listeners = vec![
            listen(&mount, &canvas, "mousedown", editor_mouse_down)?,
            listen(&mount, &canvas, "mousemove", editor_mouse_move)?,
            listen(&mount, &canvas, "mouseup", editor_mouse_up)?,
            listen(&mount, &canvas, "wheel", editor_wheel)?,
            listen(&mount, &canvas, "contextmenu", consume)?,
            listen(&mount, &document, "keydown", editor_key_down)?,
            listen(&mount, &window, "resize", editor_resize)?,
            listen(&mount, &image, "load", editor_image_loaded)?,
        ];
        let editor = Self { mount, listeners };
        if image.complete() {
            apply(&editor.mount, EditorEngine::image_loaded);
        } else {
            apply(&editor.mount, EditorEngine::resize);
        }
        log::info!("site plan editor mounted on #{canvas_id}");
        Ok(editor)
    }

    pub fn detach(&mut self) {
        self.listeners.clear();
    }

    /// Record the drawn polygons belong to; `None` until the plan is saved.
    pub fn set_record(&self, record: Option<i32>) {
        self.mount.engine.borrow_mut().core.set_record(record.map(i64::from));
    }

    /// # Errors
    ///
    /// Throws if `json` is not an array of polygon records.
    pub fn load_polygons(&self, json: &str) -> Result<(), JsValue> {
        let records = parse_records(json)?;
        apply(&self.mount, |engine| engine.core.load_polygons(records));
        Ok(())
    }

    /// `select`, `polygon`, `rectangle` or `edit`; anything else is ignored.
    pub fn set_tool(&self, name: &str) {
        match Tool::from_name(name) {
            Some(tool) => apply(&self.mount, |engine| engine.core.set_tool(tool)),
            None => log::warn!("unknown tool {name:?}"),
        }
    }

    pub fn set_color(&self, color: &str) {
        apply(&self.mount, |engine| engine.core.set_color(color));
    }

    pub fn used_colors(&self) -> Vec<String> {
        self.mount.engine.borrow().core.used_colors()
    }

    pub fn clear_draft(&self) {
        apply(&self.mount, |engine| engine.core.clear_draft());
    }

    pub fn save(&self) {
        apply(&self.mount, |engine| engine.core.save());
    }

    pub fn apply_color(&self) {
        apply(&self.mount, |engine| engine.core.apply_color());
    }

    pub fn delete_selected(&self) {
        apply(&self.mount, |engine| engine.core.delete_selected());
    }

    /// Picker result: `{ id, name }` JSON, or nothing when cancelled.
    ///
    /// # Errors
    ///
    /// Throws if `json` is not an entity reference.
    pub fn entity_picked(&self, json: Option<String>) -> Result<(), JsValue> {
        let entity = parse_entity(json.as_deref())?;
        apply(&self.mount, |engine| engine.core.entity_picked(entity));
        Ok(())
    }

    /// # Errors
    ///
    /// Throws if `op_json` is not a store operation this editor issued.
    pub fn store_succeeded(&self, op_json: &str) -> Result<(), JsValue> {
        let op = parse_store_op(op_json)?;
        apply(&self.mount, |engine| engine.core.store_succeeded(&op));
        Ok(())
    }

    /// # Errors
    ///
    /// Throws if `op_json` is not a store operation this editor issued.
    pub fn store_failed(&self, op_json: &str, message: &str) -> Result<(), JsValue> {
        let op = parse_store_op(op_json)?;
        apply(&self.mount, |engine| engine.core.store_failed(&op, message));
        Ok(())
    }

    pub fn resize(&self) {
        apply(&self.mount, EditorEngine::resize);
    }

    pub fn zoom_in(&self) {
        apply(&self.mount, |engine| engine.core.zoom_in());
    }

    pub fn zoom_out(&self) {
        apply(&self.mount, |engine| engine.core.zoom_out());
    }

    pub fn reset_zoom(&self) {
        apply(&self.mount, |engine| engine.core.reset_zoom());
    }

    pub fn set_zoom(&self, scale: f64) {
        apply(&self.mount, |engine| engine.core.set_zoom(scale));
    }
}
