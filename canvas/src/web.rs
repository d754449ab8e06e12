//! Browser implementation of [`Surface`].
//!
//! This module is the only place that touches [`web_sys::CanvasRenderingContext2d`]
//! and the DOM. Panels and leader lines are absolutely positioned `div`s
//! appended to the wrapper element that holds the canvas.

use std::collections::HashMap;
use std::f64::consts::PI;

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    CanvasRenderingContext2d, Document, HtmlCanvasElement, HtmlElement, HtmlImageElement,
};

use crate::consts::{LEADER_COLOR, LEADER_THICKNESS_PX};
use crate::error::CanvasError;
use crate::geometry::{Point, Rect, Size};
use crate::popup::{LeaderLine, OverlayId, OverlayKind};
use crate::space::Spaces;
use crate::surface::{CanvasBounds, DrawTransform, ImageSource, Stroke, Surface};

const PANEL_CLASS: &str = "siteplan-panel";
const LEADER_CLASS: &str = "siteplan-leader";

/// Install `console_log` as the `log` backend.
pub fn init_logging(level: log::Level) {
    if let Err(e) = console_log::init_with_level(level) {
        log::warn!("logger already installed: {e}");
    }
}

/// Find the canvas and its wrapper by element id.
///
/// # Errors
///
/// Returns [`CanvasError::MissingElement`] if the document or either element is
/// absent, or the element has the wrong type.
pub fn lookup(canvas_id: &str, wrapper_id: &str) -> Result<(Document, HtmlCanvasElement, HtmlElement), CanvasError> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| CanvasError::MissingElement("document".into()))?;
    let missing_canvas = || CanvasError::MissingElement(format!("canvas #{canvas_id}"));
    let canvas = document
        .get_element_by_id(canvas_id)
        .ok_or_else(missing_canvas)?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| missing_canvas())?;
    let missing_wrapper = || CanvasError::MissingElement(format!("wrapper #{wrapper_id}"));
    let wrapper = document
        .get_element_by_id(wrapper_id)
        .ok_or_else(missing_wrapper)?
        .dyn_into::<HtmlElement>()
        .map_err(|_| missing_wrapper())?;
    Ok((document, canvas, wrapper))
}

/// Start loading `url` into a detached image element.
///
/// # Errors
///
/// Returns [`CanvasError::Js`] if the element cannot be created.
pub fn new_image(url: &str) -> Result<HtmlImageElement, CanvasError> {
    let image = HtmlImageElement::new()?;
    image.set_src(url);
    Ok(image)
}

fn context_2d(canvas: &HtmlCanvasElement) -> Result<CanvasRenderingContext2d, CanvasError> {
    canvas
        .get_context("2d")?
        .ok_or(CanvasError::MissingContext)?
        .dyn_into::<CanvasRenderingContext2d>()
        .map_err(|_| CanvasError::MissingContext)
}

/// `imageSmoothingQuality` has no `web-sys` binding, so it is set by reflection.
fn smooth(ctx: &CanvasRenderingContext2d) -> Result<(), CanvasError> {
    ctx.set_image_smoothing_enabled(true);
    js_sys::Reflect::set(ctx, &JsValue::from_str("imageSmoothingQuality"), &JsValue::from_str("high"))?;
    Ok(())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn pixels(v: f64) -> u32 {
    v.round().max(0.0) as u32
}

fn px(v: f64) -> String {
    format!("{v}px")
}

fn set_styles(element: &HtmlElement, props: &[(&str, String)]) -> Result<(), CanvasError> {
    let style = element.style();
    for (name, value) in props {
        style.set_property(name, value)?;
    }
    Ok(())
}

fn client_rect(element: &web_sys::Element) -> Rect {
    let r = element.get_bounding_client_rect();
    Rect::new(r.left(), r.top(), r.width(), r.height())
}

/// Canvas, wrapper and background image of one mounted engine.
pub struct WebSurface {
    document: Document,
    canvas: HtmlCanvasElement,
    wrapper: HtmlElement,
    ctx: CanvasRenderingContext2d,
    image: HtmlImageElement,
    downsampled: Option<HtmlCanvasElement>,
    overlays: HashMap<OverlayId, HtmlElement>,
    /// Called as `renderer(element, entityId)` for each new panel.
    panel_renderer: Option<js_sys::Function>,
}

impl WebSurface {
    /// # Errors
    ///
    /// Returns [`CanvasError::MissingContext`] if the canvas has no 2D context,
    /// or a JS error if its smoothing quality cannot be set.
    pub fn new(
        document: Document,
        canvas: HtmlCanvasElement,
        wrapper: HtmlElement,
        image: HtmlImageElement,
    ) -> Result<Self, CanvasError> {
        let ctx = context_2d(&canvas)?;
        smooth(&ctx)?;
        Ok(Self {
            document,
            canvas,
            wrapper,
            ctx,
            image,
            downsampled: None,
            overlays: HashMap::new(),
            panel_renderer: None,
        })
    }

    /// The canvas element, for export.
    #[must_use]
    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    /// The element panels and leader lines are appended to.
    #[must_use]
    pub fn wrapper(&self) -> &HtmlElement {
        &self.wrapper
    }

    #[must_use]
    pub fn image(&self) -> &HtmlImageElement {
        &self.image
    }

    /// Fill new panel elements from the host.
    pub fn set_panel_renderer(&mut self, renderer: js_sys::Function) {
        self.panel_renderer = Some(renderer);
    }

    /// Decoded size of the background, `None` until it has loaded.
    #[must_use]
    pub fn natural_size(&self) -> Option<Size> {
        let (w, h) = (self.image.natural_width(), self.image.natural_height());
        (self.image.complete() && w > 0 && h > 0).then(|| Size::new(f64::from(w), f64::from(h)))
    }

    /// Width available to the canvas: its parent's, else the wrapper's.
    #[must_use]
    pub fn container_width(&self) -> f64 {
        match self.canvas.parent_element() {
            Some(parent) => client_rect(&parent).width,
            None => client_rect(&self.wrapper).width,
        }
    }

    /// Size the backing store and the CSS box for `spaces`.
    ///
    /// # Errors
    ///
    /// Returns an error if the canvas style cannot be written.
    pub fn set_display(&mut self, spaces: &Spaces) -> Result<(), CanvasError> {
        let backing = spaces.backing_size();
        self.canvas.set_width(pixels(backing.width));
        self.canvas.set_height(pixels(backing.height));
        set_styles(&self.canvas, &[("width", px(spaces.display.width)), ("height", px(spaces.display.height))])?;
        // Resizing the backing store resets context state.
        smooth(&self.ctx)
    }

    /// Draw the background into an offscreen canvas of `target` size.
    ///
    /// # Errors
    ///
    /// Returns an error if the offscreen canvas cannot be created or drawn.
    pub fn prepare_downsampled(&mut self, target: Size) -> Result<(), CanvasError> {
        let copy = self.document.create_element("canvas")?.dyn_into::<HtmlCanvasElement>().map_err(JsValue::from)?;
        copy.set_width(pixels(target.width));
        copy.set_height(pixels(target.height));
        let ctx = context_2d(&copy)?;
        smooth(&ctx)?;
        ctx.draw_image_with_html_image_element_and_dw_and_dh(&self.image, 0.0, 0.0, target.width, target.height)?;
        self.downsampled = Some(copy);
        Ok(())
    }

    fn trace(&self, points: &[Point]) {
        self.ctx.begin_path();
        if let Some((first, rest)) = points.split_first() {
            self.ctx.move_to(first.x, first.y);
            for p in rest {
                self.ctx.line_to(p.x, p.y);
            }
        }
    }

    fn new_overlay(&self, id: OverlayId, class: &str) -> Result<HtmlElement, CanvasError> {
        let element = self.document.create_element("div")?.dyn_into::<HtmlElement>().map_err(JsValue::from)?;
        element.set_class_name(class);
        element.set_attribute("data-overlay-id", &id.to_string())?;
        set_styles(&element, &[("position", "absolute".into())])?;
        Ok(element)
    }
}

impl Surface for WebSurface {
    fn measure(&self) -> Result<CanvasBounds, CanvasError> {
        Ok(CanvasBounds::new(client_rect(&self.canvas), client_rect(&self.wrapper)))
    }

    fn clear(&mut self) -> Result<(), CanvasError> {
        self.ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)?;
        self.ctx.clear_rect(0.0, 0.0, f64::from(self.canvas.width()), f64::from(self.canvas.height()));
        Ok(())
    }

    fn set_transform(&mut self, transform: &DrawTransform) -> Result<(), CanvasError> {
        let [a, b, c, d, e, f] = transform.matrix();
        self.ctx.set_transform(a, b, c, d, e, f)?;
        Ok(())
    }

    fn reset_transform(&mut self) -> Result<(), CanvasError> {
        self.ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)?;
        Ok(())
    }

    fn draw_image(&mut self, source: ImageSource, size: Size) -> Result<(), CanvasError> {
        match (source, &self.downsampled) {
            (ImageSource::Downsampled, Some(copy)) => {
                self.ctx.draw_image_with_html_canvas_element_and_dw_and_dh(copy, 0.0, 0.0, size.width, size.height)?;
            }
            _ => {
                self.ctx
                    .draw_image_with_html_image_element_and_dw_and_dh(&self.image, 0.0, 0.0, size.width, size.height)?;
            }
        }
        Ok(())
    }

    fn fill_polygon(&mut self, points: &[Point], color: &str) -> Result<(), CanvasError> {
        self.trace(points);
        self.ctx.close_path();
        self.ctx.set_fill_style_str(color);
        self.ctx.fill();
        Ok(())
    }

    fn stroke_path(&mut self, points: &[Point], closed: bool, stroke: &Stroke) -> Result<(), CanvasError> {
        self.trace(points);
        if closed {
            self.ctx.close_path();
        }
        self.ctx.set_stroke_style_str(&stroke.color);
        self.ctx.set_line_width(stroke.width);
        if let Some(dash) = stroke.dash {
            let dash_array = js_sys::Array::new();
            dash_array.push(&dash.into());
            dash_array.push(&dash.into());
            self.ctx.set_line_dash(&dash_array)?;
            self.ctx.stroke();
            self.ctx.set_line_dash(&js_sys::Array::new())?;
        } else {
            self.ctx.stroke();
        }
        Ok(())
    }

    fn fill_circle(&mut self, center: Point, radius: f64, color: &str) -> Result<(), CanvasError> {
        self.ctx.begin_path();
        self.ctx.arc(center.x, center.y, radius, 0.0, 2.0 * PI)?;
        self.ctx.set_fill_style_str(color);
        self.ctx.fill();
        Ok(())
    }

    fn fill_text(&mut self, text: &str, at: Point, font: &str, color: &str) -> Result<(), CanvasError> {
        self.ctx.set_font(font);
        self.ctx.set_text_align("center");
        self.ctx.set_text_baseline("middle");
        self.ctx.set_fill_style_str(color);
        self.ctx.fill_text(text, at.x, at.y)?;
        Ok(())
    }

    #[allow(clippy::cast_precision_loss)]
    fn create_overlay(&mut self, id: OverlayId, kind: OverlayKind) -> Result<(), CanvasError> {
        let element = match kind {
            OverlayKind::Panel { entity, polygon } => {
                let element = self.new_overlay(id, PANEL_CLASS)?;
                element.set_attribute("data-polygon", &polygon.to_string())?;
                if let Some(entity) = entity {
                    element.set_attribute("data-entity", &entity.to_string())?;
                }
                if let Some(renderer) = &self.panel_renderer {
                    let entity = entity.map_or(JsValue::NULL, |e| JsValue::from_f64(e as f64));
                    renderer.call2(&JsValue::NULL, &element, &entity)?;
                }
                element
            }
            OverlayKind::Leader => {
                let element = self.new_overlay(id, LEADER_CLASS)?;
                set_styles(
                    &element,
                    &[
                        ("height", px(LEADER_THICKNESS_PX)),
                        ("background", LEADER_COLOR.into()),
                        ("transform-origin", "0 50%".into()),
                        ("pointer-events", "none".into()),
                    ],
                )?;
                element
            }
        };
        self.wrapper.append_child(&element)?;
        self.overlays.insert(id, element);
        Ok(())
    }

    fn remove_overlay(&mut self, id: OverlayId) -> Result<(), CanvasError> {
        if let Some(element) = self.overlays.remove(&id) {
            element.remove();
        }
        Ok(())
    }

    fn place_panel(&mut self, id: OverlayId, rect: &Rect) -> Result<(), CanvasError> {
        let Some(element) = self.overlays.get(&id) else {
            return Ok(());
        };
        set_styles(
            element,
            &[("left", px(rect.x)), ("top", px(rect.y)), ("width", px(rect.width)), ("height", px(rect.height))],
        )
    }

    fn place_leader(&mut self, id: OverlayId, line: &LeaderLine) -> Result<(), CanvasError> {
        let Some(element) = self.overlays.get(&id) else {
            return Ok(());
        };
        set_styles(
            element,
            &[
                ("left", px(line.start.x)),
                ("top", px(line.start.y - LEADER_THICKNESS_PX / 2.0)),
                ("width", px(line.length)),
                ("transform", format!("rotate({}rad)", line.angle)),
            ],
        )
    }
}
