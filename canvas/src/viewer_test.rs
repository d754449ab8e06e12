#![allow(clippy::float_cmp)]

use super::*;
use crate::geometry::Rect;
use crate::scene::{Entity, Polygon, ShapeKind};
use crate::surface::ImageSource;
use crate::testing::RecordingSurface;

// =============================================================
// Helpers
// =============================================================

const EPSILON: f64 = 1e-9;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

fn point_approx_eq(a: Point, b: Point) -> bool {
    approx_eq(a.x, b.x) && approx_eq(a.y, b.y)
}

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn square(id: i64, entity: i64, x: f64, y: f64) -> Polygon {
    Polygon {
        id,
        name: format!("Lot {id}"),
        points: vec![pt(x, y), pt(x + 100.0, y), pt(x + 100.0, y + 100.0), pt(x, y + 100.0)],
        color: "#3498db".into(),
        kind: ShapeKind::Polygon,
        entity: Some(Entity::new(entity, format!("E{entity}"))),
    }
}

/// Unlocked viewer whose canvas sits at the page origin with display = reference space.
fn viewer(polygons: Vec<Polygon>) -> ViewerCore {
    let mut core = ViewerCore::new(CanvasConfig { zoom_locked: false, ..CanvasConfig::viewer() });
    core.image_loaded(Size::new(1200.0, 800.0));
    core.resize(1200.0);
    let rect = Rect::new(0.0, 0.0, 1200.0, 800.0);
    core.set_bounds(CanvasBounds::new(rect, rect));
    core.scene.load(polygons);
    // Drop frame requests from setup.
    let mut surface = RecordingSurface::sized(Size::new(1200.0, 800.0));
    core.render_scene(&mut surface).unwrap();
    core.render_leaders(&mut surface).unwrap();
    core
}

fn row_of(n: usize) -> Vec<Polygon> {
    (0..n).map(|i| square(i as i64, 100 + i as i64, 10.0 + 110.0 * i as f64, 10.0)).collect()
}

fn has_zoom(out: &[Action]) -> bool {
    out.iter().any(|a| matches!(a, Action::ZoomChanged { .. }))
}

// =============================================================
// Click selection
// =============================================================

#[test]
fn click_selects_and_opens_panel() {
    let mut v = viewer(row_of(1));
    let out = v.click(pt(50.0, 50.0));
    assert_eq!(out, vec![Action::RequestFrame(FramePass::Scene)]);
    assert!(v.scene.is_selected(0));
    assert_eq!(v.popups.len(), 1);
    assert_eq!(v.popups.panels()[0].position, pt(880.0, 20.0));
    assert_eq!(v.popups.panels()[0].entity, Some(100));
}

#[test]
fn second_click_deselects() {
    let mut v = viewer(row_of(1));
    v.click(pt(50.0, 50.0));
    v.click(pt(50.0, 50.0));
    assert!(v.scene.selected().is_empty());
    assert!(v.popups.is_empty());
}

#[test]
fn click_on_empty_space_does_nothing() {
    let mut v = viewer(row_of(1));
    assert!(v.click(pt(900.0, 700.0)).is_empty());
    assert!(v.popups.is_empty());
}

#[test]
fn requests_coalesce_until_frame_runs() {
    let mut v = viewer(row_of(2));
    assert_eq!(v.click(pt(50.0, 50.0)), vec![Action::RequestFrame(FramePass::Scene)]);
    assert!(v.click(pt(160.0, 50.0)).is_empty());
    assert!(v.is_pending(FramePass::Scene));
}

#[test]
fn same_entity_shares_one_panel() {
    let mut polygons = row_of(2);
    polygons[1].entity = Some(Entity::new(100, "E100"));
    let mut v = viewer(polygons);
    v.click(pt(50.0, 50.0));
    v.click(pt(160.0, 50.0));
    assert_eq!(v.popups.len(), 1);
    assert_eq!(v.popups.panels()[0].origins.len(), 2);
    assert_eq!(v.scene.selected(), &[0, 1]);
}

#[test]
fn sixth_selection_evicts_oldest_and_deselects_it() {
    let mut v = viewer(row_of(6));
    for i in 0..6 {
        v.click(pt(60.0 + 110.0 * f64::from(i), 50.0));
    }
    assert_eq!(v.popups.len(), 5);
    assert!(!v.scene.is_selected(0));
    assert_eq!(v.scene.selected(), &[1, 2, 3, 4, 5]);
    assert!(v.popups.panel_of(0).is_none());
}

#[test]
fn evicted_leaders_leave_the_surface() {
    let mut v = viewer(row_of(6));
    let mut surface = RecordingSurface::sized(Size::new(1200.0, 800.0));
    v.click(pt(60.0, 50.0));
    v.render_leaders(&mut surface).unwrap();
    let first_leader = v.popups.panels()[0].origins[0].leader;
    assert!(surface.leaders.contains_key(&first_leader));

    for i in 1..6 {
        v.click(pt(60.0 + 110.0 * f64::from(i), 50.0));
    }
    v.render_leaders(&mut surface).unwrap();
    assert!(!surface.leaders.contains_key(&first_leader));
    assert!(!surface.overlays.contains_key(&first_leader));
    assert_eq!(surface.panels.len(), 5);
    assert_eq!(surface.leaders.len(), 5);
}

// =============================================================
// Gray overrides
// =============================================================

#[test]
fn interactive_gray_click_toggles_override() {
    let mut v = viewer(row_of(1));
    v.toggle_interactive_gray();
    v.click(pt(50.0, 50.0));
    assert!(v.scene.renders_sold(0));
    assert!(v.scene.selected().is_empty());
    assert!(v.popups.is_empty());
    v.click(pt(50.0, 50.0));
    assert!(!v.scene.renders_sold(0));
}

#[test]
fn interactive_gray_under_force_all_ungrays() {
    let mut v = viewer(row_of(1));
    v.toggle_force_gray();
    v.toggle_interactive_gray();
    assert!(v.scene.renders_sold(0));
    v.click(pt(50.0, 50.0));
    assert!(!v.scene.renders_sold(0));
}

#[test]
fn force_gray_toggle_resets_overrides() {
    let mut v = viewer(row_of(2));
    v.toggle_interactive_gray();
    v.click(pt(50.0, 50.0));
    let out = v.toggle_force_gray();
    assert!(v.scene.gray.grayed.is_empty());
    assert!(v.scene.gray.ungrayed.is_empty());
    assert!(out.iter().any(|a| matches!(a, Action::ControlsChanged(c) if c.force_gray)));
    // Turning it off again also leaves interactive mode.
    let out = v.toggle_force_gray();
    assert!(!v.scene.gray.interactive);
    assert!(out.contains(&Action::SetCursor("pointer".into())));
}

#[test]
fn interactive_gray_sets_cell_cursor() {
    let mut v = viewer(Vec::new());
    let out = v.toggle_interactive_gray();
    assert!(out.contains(&Action::SetCursor("cell".into())));
}

// =============================================================
// Visibility
// =============================================================

#[test]
fn hidden_polygons_only_hit_when_selected() {
    let mut v = viewer(row_of(2));
    v.click(pt(50.0, 50.0));
    let out = v.toggle_polygons();
    assert!(out.iter().any(|a| matches!(a, Action::ControlsChanged(c) if !c.polygons_visible)));
    assert!(v.click(pt(160.0, 50.0)).is_empty());
    v.click(pt(50.0, 50.0));
    assert!(v.scene.selected().is_empty());
}

// =============================================================
// Mouse pan and wheel
// =============================================================

#[test]
fn right_drag_pans() {
    let mut v = viewer(Vec::new());
    let out = v.mouse_down(pt(100.0, 100.0), Button::Secondary);
    assert_eq!(out, vec![Action::ConsumeEvent, Action::SetCursor("grabbing".into())]);
    v.mouse_move(pt(150.0, 120.0));
    assert_eq!(v.viewport.offset, pt(50.0, 20.0));
    let out = v.mouse_up(pt(150.0, 120.0));
    assert_eq!(out, vec![Action::SetCursor("pointer".into())]);
    assert_eq!(v.mode, ViewerMode::Idle);
}

#[test]
fn right_drag_divides_by_scale() {
    let mut v = viewer(Vec::new());
    v.viewport.scale = 2.0;
    v.mouse_down(pt(0.0, 0.0), Button::Secondary);
    v.mouse_move(pt(40.0, 10.0));
    assert_eq!(v.viewport.offset, pt(20.0, 5.0));
}

#[test]
fn mouse_pan_ignores_zoom_lock() {
    let mut v = viewer(Vec::new());
    v.toggle_zoom_lock();
    v.mouse_down(pt(0.0, 0.0), Button::Secondary);
    v.mouse_move(pt(30.0, 0.0));
    assert_eq!(v.viewport.offset.x, 30.0);
}

#[test]
fn primary_button_does_not_pan() {
    let mut v = viewer(Vec::new());
    assert!(v.mouse_down(pt(0.0, 0.0), Button::Primary).is_empty());
    assert!(v.mouse_move(pt(30.0, 0.0)).is_empty());
    assert_eq!(v.viewport.offset, Point::default());
}

#[test]
fn wheel_zooms_around_cursor() {
    let mut v = viewer(Vec::new());
    let cursor = pt(300.0, 200.0);
    let before = v.viewport.world_at(cursor);
    let out = v.wheel(cursor, WheelDelta { dy: -100.0 });
    assert_eq!(out[0], Action::ConsumeEvent);
    assert!(out.contains(&Action::ZoomChanged { scale: 1.1, percent: 110 }));
    assert!(point_approx_eq(v.viewport.world_at(cursor), before));
}

#[test]
fn wheel_anchor_is_canvas_local() {
    let mut v = viewer(Vec::new());
    let canvas = Rect::new(40.0, 100.0, 1200.0, 800.0);
    v.set_bounds(CanvasBounds::new(canvas, Rect::new(0.0, 0.0, 1300.0, 1000.0)));
    let before = v.viewport.world_at(pt(260.0, 100.0));
    v.wheel(pt(300.0, 200.0), WheelDelta { dy: -1.0 });
    assert!(point_approx_eq(v.viewport.world_at(pt(260.0, 100.0)), before));
}

#[test]
fn wheel_at_min_scale_consumes_without_zoom() {
    let mut v = viewer(Vec::new());
    let out = v.wheel(pt(10.0, 10.0), WheelDelta { dy: 5.0 });
    assert_eq!(out, vec![Action::ConsumeEvent]);
    assert_eq!(v.viewport.scale, 1.0);
}

#[test]
fn viewer_starts_zoom_locked() {
    let mut v = ViewerCore::default();
    assert!(v.viewport.locked);
    assert!(v.controls().zoom_locked);
    assert!(v.wheel(pt(10.0, 10.0), WheelDelta { dy: -5.0 }).is_empty());
    assert!(v.touch_start(&[pt(10.0, 10.0)]).is_empty());
    let out = v.toggle_zoom_lock();
    assert!(out.iter().any(|a| matches!(a, Action::ControlsChanged(c) if !c.zoom_locked)));
}

#[test]
fn locked_wheel_passes_through() {
    let mut v = viewer(Vec::new());
    v.toggle_zoom_lock();
    assert!(v.wheel(pt(10.0, 10.0), WheelDelta { dy: -5.0 }).is_empty());
    assert_eq!(v.viewport.scale, 1.0);
}

// =============================================================
// Touch
// =============================================================

#[test]
fn tap_on_polygon_selects() {
    let mut v = viewer(row_of(1));
    assert!(v.touch_start(&[pt(50.0, 50.0)]).is_empty());
    // Within the 15px slop that applies to touches starting on a polygon.
    v.touch_move(&[pt(60.0, 55.0)]);
    let out = v.touch_end(&[]);
    assert_eq!(out[0], Action::ConsumeEvent);
    assert!(v.scene.is_selected(0));
    assert_eq!(v.viewport.offset, Point::default());
}

#[test]
fn small_move_on_empty_space_becomes_pan() {
    let mut v = viewer(row_of(1));
    v.touch_start(&[pt(500.0, 500.0)]);
    assert!(v.touch_move(&[pt(504.0, 500.0)]).is_empty());
    assert_eq!(v.viewport.offset, Point::default());
    let out = v.touch_move(&[pt(510.0, 500.0)]);
    assert_eq!(out[0], Action::ConsumeEvent);
    // The first pan step is measured from the touch start.
    assert_eq!(v.viewport.offset, pt(10.0, 0.0));
    v.touch_move(&[pt(515.0, 502.0)]);
    assert_eq!(v.viewport.offset, pt(15.0, 2.0));
    assert!(v.touch_end(&[]).is_empty());
    assert_eq!(v.mode, ViewerMode::Idle);
}

#[test]
fn drag_starting_on_polygon_needs_larger_slop() {
    let mut v = viewer(row_of(1));
    v.touch_start(&[pt(50.0, 50.0)]);
    v.touch_move(&[pt(60.0, 50.0)]);
    assert_eq!(v.viewport.offset, Point::default());
    v.touch_move(&[pt(70.0, 50.0)]);
    assert_eq!(v.viewport.offset, pt(20.0, 0.0));
    v.touch_end(&[]);
    assert!(v.scene.selected().is_empty());
}

#[test]
fn pinch_zooms_around_midpoint() {
    let mut v = viewer(Vec::new());
    let out = v.touch_start(&[pt(400.0, 400.0), pt(600.0, 400.0)]);
    assert_eq!(out, vec![Action::ConsumeEvent]);
    let mid = pt(500.0, 400.0);
    let before = v.viewport.world_at(mid);
    let out = v.touch_move(&[pt(350.0, 400.0), pt(650.0, 400.0)]);
    assert!(has_zoom(&out));
    assert!(approx_eq(v.viewport.scale, 1.5));
    assert!(point_approx_eq(v.viewport.world_at(mid), before));
}

#[test]
fn pinch_clamps_to_max_scale() {
    let mut v = viewer(Vec::new());
    v.touch_start(&[pt(500.0, 400.0), pt(510.0, 400.0)]);
    v.touch_move(&[pt(0.0, 400.0), pt(1000.0, 400.0)]);
    assert_eq!(v.viewport.scale, 10.0);
}

#[test]
fn lifting_one_finger_pans_with_the_other() {
    let mut v = viewer(Vec::new());
    v.touch_start(&[pt(400.0, 400.0), pt(600.0, 400.0)]);
    v.touch_end(&[pt(600.0, 400.0)]);
    v.touch_move(&[pt(602.0, 401.0)]);
    assert_eq!(v.viewport.offset, pt(2.0, 1.0));
    // Lifting the last finger is not a tap.
    assert!(v.touch_end(&[]).is_empty());
}

#[test]
fn locked_touch_is_left_to_the_browser() {
    let mut v = viewer(row_of(1));
    v.toggle_zoom_lock();
    assert!(v.touch_start(&[pt(50.0, 50.0)]).is_empty());
    assert!(v.touch_move(&[pt(90.0, 50.0)]).is_empty());
    assert!(v.touch_end(&[]).is_empty());
    assert_eq!(v.viewport.offset, Point::default());
    assert!(v.scene.selected().is_empty());
    // The browser's own click still selects.
    v.click(pt(50.0, 50.0));
    assert!(v.scene.is_selected(0));
}

// =============================================================
// Zoom controls
// =============================================================

#[test]
fn zoom_buttons_keep_image_center_fixed() {
    let mut v = viewer(Vec::new());
    v.viewport.pan_by(-100.0, 40.0);
    let center = v.spaces.image_center();
    let pixel = v.viewport.pixel_of(center);
    let out = v.zoom_in();
    assert!(has_zoom(&out));
    assert!(approx_eq(v.viewport.scale, 1.2));
    assert!(point_approx_eq(v.viewport.pixel_of(center), pixel));
    v.zoom_out();
    assert!(approx_eq(v.viewport.scale, 1.0));
    assert!(point_approx_eq(v.viewport.pixel_of(center), pixel));
}

#[test]
fn zoom_out_at_minimum_is_noop() {
    let mut v = viewer(Vec::new());
    assert!(v.zoom_out().is_empty());
}

#[test]
fn slider_clamps() {
    let mut v = viewer(Vec::new());
    let out = v.set_zoom(25.0);
    assert!(out.contains(&Action::ZoomChanged { scale: 10.0, percent: 1000 }));
}

#[test]
fn reset_returns_to_identity() {
    let mut v = viewer(Vec::new());
    v.set_zoom(3.0);
    v.viewport.pan_by(10.0, 10.0);
    let out = v.reset_zoom();
    assert!(out.contains(&Action::ZoomChanged { scale: 1.0, percent: 100 }));
    assert_eq!(v.viewport.offset, Point::default());
}

#[test]
fn zoom_lock_gates_controls() {
    let mut v = viewer(Vec::new());
    let out = v.toggle_zoom_lock();
    assert!(out.iter().any(|a| matches!(a, Action::ControlsChanged(c) if c.zoom_locked)));
    assert!(v.zoom_in().is_empty());
    assert!(v.set_zoom(4.0).is_empty());
    assert_eq!(v.viewport.scale, 1.0);
    v.toggle_zoom_lock();
    assert!(!v.zoom_in().is_empty());
}

// =============================================================
// Panels
// =============================================================

#[test]
fn panel_drag_moves_and_requests_leaders() {
    let mut v = viewer(row_of(1));
    v.click(pt(50.0, 50.0));
    let id = v.popups.panels()[0].id;
    assert_eq!(v.panel_drag_start(id, pt(900.0, 30.0)), vec![Action::ConsumeEvent]);
    let out = v.panel_drag_move(pt(860.0, 60.0));
    assert!(out.contains(&Action::RequestFrame(FramePass::Leaders)));
    assert_eq!(v.popups.panel(id).unwrap().position, pt(840.0, 50.0));
    v.panel_drag_end();
    assert_eq!(v.mode, ViewerMode::Idle);
    assert!(v.panel_drag_move(pt(0.0, 0.0)).is_empty());
}

#[test]
fn panel_drag_does_not_touch_viewport() {
    let mut v = viewer(row_of(1));
    v.click(pt(50.0, 50.0));
    let id = v.popups.panels()[0].id;
    v.panel_drag_start(id, pt(900.0, 30.0));
    v.panel_drag_move(pt(800.0, 30.0));
    assert_eq!(v.viewport.offset, Point::default());
    assert_eq!(v.viewport.scale, 1.0);
}

#[test]
fn unknown_panel_drag_is_ignored() {
    let mut v = viewer(Vec::new());
    assert!(v.panel_drag_start(uuid::Uuid::new_v4(), pt(0.0, 0.0)).is_empty());
    assert_eq!(v.mode, ViewerMode::Idle);
}

#[test]
fn close_panel_deselects_its_polygons() {
    let mut polygons = row_of(2);
    polygons[1].entity = Some(Entity::new(100, "E100"));
    let mut v = viewer(polygons);
    v.click(pt(50.0, 50.0));
    v.click(pt(160.0, 50.0));
    let id = v.popups.panels()[0].id;
    v.close_panel(id);
    assert!(v.scene.selected().is_empty());
    assert!(v.popups.is_empty());
    assert!(v.close_panel(id).is_empty());
}

#[test]
fn resized_panel_requests_leaders() {
    let mut v = viewer(row_of(1));
    v.click(pt(50.0, 50.0));
    let id = v.popups.panels()[0].id;
    let out = v.panel_resized(id, Size::new(300.0, 180.0));
    assert_eq!(out, vec![Action::RequestFrame(FramePass::Leaders)]);
    assert_eq!(v.popups.panel(id).unwrap().size, Size::new(300.0, 180.0));
}

// =============================================================
// Frames
// =============================================================

#[test]
fn scene_frame_requests_leaders_when_panels_open() {
    let mut v = viewer(row_of(1));
    let mut surface = RecordingSurface::sized(Size::new(1200.0, 800.0));
    assert!(v.render_scene(&mut surface).unwrap().is_empty());
    v.click(pt(50.0, 50.0));
    let out = v.render_scene(&mut surface).unwrap();
    assert_eq!(out, vec![Action::RequestFrame(FramePass::Leaders)]);
    assert!(!v.is_pending(FramePass::Scene));
}

#[test]
fn leader_frame_remeasures_bounds() {
    let mut v = viewer(row_of(1));
    v.click(pt(50.0, 50.0));
    let mut surface = RecordingSurface::sized(Size::new(1200.0, 800.0));
    surface.bounds = CanvasBounds::new(Rect::new(0.0, 300.0, 1200.0, 800.0), Rect::new(0.0, 300.0, 1200.0, 800.0));
    v.render_leaders(&mut surface).unwrap();
    assert_eq!(v.bounds, surface.bounds);
    assert_eq!(surface.panels.len(), 1);
    assert!(!v.is_pending(FramePass::Leaders));
}

#[test]
fn failed_frame_reports_error() {
    let mut v = viewer(row_of(1));
    let mut surface = RecordingSurface::sized(Size::new(1200.0, 800.0));
    surface.broken = true;
    assert!(v.render_scene(&mut surface).is_err());
    assert!(v.render_leaders(&mut surface).is_err());
}

// =============================================================
// Layout, data and capture
// =============================================================

#[test]
fn resize_keeps_image_aspect() {
    let mut v = ViewerCore::default();
    v.resize(1000.0);
    assert_eq!(v.spaces.display, Size::new(1000.0, 600.0));
    v.image_loaded(Size::new(3000.0, 1500.0));
    v.resize(1000.0);
    assert_eq!(v.spaces.display, Size::new(1000.0, 500.0));
    assert_eq!(v.spaces.device_ratio, 2);
}

#[test]
fn load_records_closes_panels() {
    let mut v = viewer(row_of(1));
    v.click(pt(50.0, 50.0));
    let record = PolygonRecord {
        id: 1,
        name: "A".into(),
        coordinates: r#"[{"x":0,"y":0},{"x":10,"y":0},{"x":10,"y":10}]"#.into(),
        color: None,
        polygon_type: ShapeKind::Polygon,
        product: None,
    };
    v.load_records(vec![record]);
    assert!(v.popups.is_empty());
    assert!(v.popups.has_pending());
    assert_eq!(v.scene.len(), 1);
    assert_eq!(v.scene.polygons()[0].color, "#3498db");
}

#[test]
fn from_data_uses_payload_config() {
    let data = SiteMapData::from_json(
        r#"{ "imageUrl": "/a.png", "config": { "max_panels": 2, "zoom_locked": false }, "polygons": [] }"#,
    )
    .unwrap();
    let v = ViewerCore::from_data(data);
    assert!(!v.viewport.locked);
    assert!(!v.controls().zoom_locked);
    assert_eq!(v.config.max_panels, 2);
    assert!(v.is_pending(FramePass::Scene));
}

#[test]
fn capture_draws_full_resolution_then_restores() {
    let mut v = viewer(Vec::new());
    v.image_loaded(Size::new(4096.0, 2731.0));
    let mut surface = RecordingSurface::sized(Size::new(1200.0, 800.0));

    let out = v.begin_capture(&mut surface).unwrap();
    assert_eq!(out, vec![Action::Capture { scale: 4 }]);
    assert_eq!(surface.images(), vec![ImageSource::Full]);

    let out = v.capture_finished(Ok(()));
    assert!(!out.iter().any(|a| matches!(a, Action::Notify(_))));
    v.render_scene(&mut surface).unwrap();
    assert_eq!(surface.images(), vec![ImageSource::Full, ImageSource::Downsampled]);
}

#[test]
fn failed_capture_notifies_and_redraws() {
    let mut v = viewer(Vec::new());
    let mut surface = RecordingSurface::sized(Size::new(1200.0, 800.0));
    v.begin_capture(&mut surface).unwrap();
    let out = v.capture_finished(Err("tainted canvas".into()));
    assert!(out.iter().any(|a| matches!(a, Action::Notify(n) if n.message.contains("tainted canvas"))));
    assert!(v.is_pending(FramePass::Scene));
    assert!(!v.image.capturing());
}
