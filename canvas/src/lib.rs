//! Site-plan canvas: an interactive polygon viewer and editor over a background image.
//!
//! This crate is compiled to WebAssembly and runs in the browser. The viewer
//! shows the polygons of a site map, lets visitors select them, and opens
//! entity panels joined to their polygons by leader lines. The editor draws,
//! drags and re-colors the polygons of one site-plan record. Both cores are
//! headless and return [`engine::Action`]s. The [`host`] module exports them to
//! JavaScript: it wires DOM events in, runs the frame loop, and hands store
//! writes, the entity picker and notices to a page callback.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Actions, frame scheduling, and the browser-bound engines |
//! | [`viewer`] | Testable [`viewer::ViewerCore`] |
//! | [`editor`] | Testable [`editor::EditorCore`] |
//! | [`scene`] | Polygons, entities, selection, visibility and gray overrides |
//! | [`popup`] | Entity panels and leader lines |
//! | [`geometry`] | Points, rectangles, point-in-polygon and edge math |
//! | [`space`] | Reference, display, view and screen coordinate spaces |
//! | [`viewport`] | Zoom and pan state |
//! | [`input`] | Tools, buttons, keys and the gesture state machines |
//! | [`style`] | Polygon paint rules |
//! | [`render`] | Scene, leader-line and editor passes over a [`surface::Surface`] |
//! | [`surface`] | Drawing surface trait |
//! | [`web`] | `web-sys` surface, DOM lookup and logging setup |
//! | [`host`] | `wasm-bindgen` exports: mounting, DOM listeners, frame loop |
//! | [`config`] | Viewer/editor presets and the page bootstrap payload |
//! | [`error`] | [`error::CanvasError`] |
//! | [`consts`] | Shared constants (reference size, zoom factors, colors) |

pub mod config;
pub mod consts;
pub mod editor;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod host;
pub mod input;
pub mod popup;
pub mod render;
pub mod scene;
pub mod space;
pub mod style;
pub mod surface;
pub mod viewer;
pub mod viewport;
pub mod web;

#[cfg(test)]
mod testing;
