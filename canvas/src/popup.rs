//! Popup/annotation layer: entity panels anchored to polygons by leader lines.
//!
//! Panels live in wrapper space (relative to the element that contains the
//! canvas) and keep their position across redraws, pans and zooms. Each
//! selected polygon is an *origin* of exactly one panel and owns one leader
//! overlay. The layer never touches the DOM itself: create/remove requests are
//! queued as [`OverlayOp`]s and flushed through the surface by the leader-line
//! pass.

#[cfg(test)]
#[path = "popup_test.rs"]
mod popup_test;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::consts::LEADER_STROKE_OFFSET_PX;
use crate::geometry::{Point, Rect, Size, closest_edge_point, rect_edge_intersection};
use crate::scene::EntityId;

/// Identifier of an overlay element (panel box or leader line).
pub type OverlayId = Uuid;

/// Panel grid geometry in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelLayout {
    pub width: f64,
    pub height: f64,
    /// Gap kept between panels and the canvas edges.
    pub margin: f64,
    /// Horizontal gap between panel columns.
    pub column_spacing: f64,
}

impl Default for PanelLayout {
    fn default() -> Self {
        Self { width: 300.0, height: 230.0, margin: 20.0, column_spacing: 10.0 }
    }
}

impl PanelLayout {
    #[must_use]
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Panels per column for a canvas of `canvas_height`; at least one.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn per_column(&self, canvas_height: f64) -> usize {
        let fit = ((canvas_height - 2.0 * self.margin) / self.height).floor();
        if fit >= 1.0 { fit as usize } else { 1 }
    }

    /// Wrapper-space position of the `index`-th panel over `canvas`.
    ///
    /// Columns fill top to bottom starting at the right edge and move left;
    /// once a column would cross the left margin they restart from the left
    /// edge moving right. The result is clamped inside the canvas margins.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn position(&self, index: usize, canvas: &Rect) -> Point {
        let per_column = self.per_column(canvas.height);
        let col = (index / per_column) as f64;
        let row = (index % per_column) as f64;

        let left = canvas.x + self.margin;
        let right = canvas.right() - self.margin;
        let stride = self.width + self.column_spacing;

        let mut x = right - self.width - col * stride;
        if x < left {
            x = left + col * stride;
        }
        let y = canvas.y + self.margin + row * self.height;

        let max_x = canvas.right() - self.width - self.margin;
        let max_y = canvas.bottom() - self.height - self.margin;
        Point::new(x.min(max_x).max(left), y.min(max_y).max(canvas.y + self.margin))
    }
}

/// One selected polygon attached to a panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Origin {
    pub polygon: usize,
    /// Leader-line overlay drawn from this polygon to the panel.
    pub leader: OverlayId,
}

/// An open entity panel.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub id: OverlayId,
    pub entity: Option<EntityId>,
    /// Wrapper-relative top-left corner.
    pub position: Point,
    pub size: Size,
    pub origins: Vec<Origin>,
}

impl Panel {
    #[must_use]
    pub fn rect(&self) -> Rect {
        Rect::from_origin_size(self.position, self.size)
    }

    #[must_use]
    pub fn has_origin(&self, polygon: usize) -> bool {
        self.origins.iter().any(|o| o.polygon == polygon)
    }
}

/// Overlay element kinds the surface knows how to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayKind {
    /// Panel box; the host fills in content for `entity`.
    Panel { entity: Option<EntityId>, polygon: usize },
    /// Leader line connecting a polygon to its panel.
    Leader,
}

/// Pending overlay element change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayOp {
    Create { id: OverlayId, kind: OverlayKind },
    Remove { id: OverlayId },
}

/// Placed connector from a polygon edge to a panel edge, in wrapper space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeaderLine {
    pub start: Point,
    pub end: Point,
    pub length: f64,
    /// Rotation of the connector in radians, `atan2(end - start)`.
    pub angle: f64,
}

/// Connector from `polygon` (wrapper-space vertices) to the panel `rect`.
///
/// The start is the polygon edge point closest to the panel center, pushed out
/// along the connector by the stroke offset. The end is where the connector,
/// continued through the panel center, leaves the panel; the panel box sits
/// above the line and hides the overlap.
#[must_use]
pub fn leader_line(polygon: &[Point], rect: &Rect) -> Option<LeaderLine> {
    let center = rect.center();
    let closest = closest_edge_point(polygon, center)?;
    let angle = (center.y - closest.y).atan2(center.x - closest.x);
    let start = Point::new(
        closest.x + angle.cos() * LEADER_STROKE_OFFSET_PX,
        closest.y + angle.sin() * LEADER_STROKE_OFFSET_PX,
    );
    let end = rect_edge_intersection(rect, angle);
    Some(LeaderLine {
        start,
        end,
        length: start.distance(end),
        angle: (end.y - start.y).atan2(end.x - start.x),
    })
}

/// Result of selecting a polygon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Panel the polygon is now attached to.
    pub panel: OverlayId,
    /// A panel was created for this selection.
    pub created: bool,
    /// Polygons deselected because their panel was evicted.
    pub evicted: Vec<usize>,
}

/// Open panels in creation order, oldest first.
#[derive(Debug, Clone)]
pub struct PopupLayer {
    panels: Vec<Panel>,
    capacity: usize,
    /// Polygons of the same entity share one panel.
    multi_origin: bool,
    layout: PanelLayout,
    pending: Vec<OverlayOp>,
}

impl Default for PopupLayer {
    fn default() -> Self {
        Self::new(5, true, PanelLayout::default())
    }
}

impl PopupLayer {
    #[must_use]
    pub fn new(capacity: usize, multi_origin: bool, layout: PanelLayout) -> Self {
        Self { panels: Vec::new(), capacity: capacity.max(1), multi_origin, layout, pending: Vec::new() }
    }

    #[must_use]
    pub fn panels(&self) -> &[Panel] {
        &self.panels
    }

    #[must_use]
    pub fn panel(&self, id: OverlayId) -> Option<&Panel> {
        self.panels.iter().find(|p| p.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.panels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }

    #[must_use]
    pub fn layout(&self) -> &PanelLayout {
        &self.layout
    }

    /// Panel that `polygon` is an origin of.
    #[must_use]
    pub fn panel_of(&self, polygon: usize) -> Option<&Panel> {
        self.panels.iter().find(|p| p.has_origin(polygon))
    }

    /// Attach `polygon` to a panel, creating one when needed.
    ///
    /// `canvas` is the canvas rectangle in wrapper space, used to place a new
    /// panel. At capacity the oldest panel and all its origins are evicted
    /// first.
    pub fn select(&mut self, polygon: usize, entity: Option<EntityId>, canvas: &Rect) -> Selection {
        if let Some(panel) = self.panel_of(polygon) {
            return Selection { panel: panel.id, created: false, evicted: Vec::new() };
        }

        if self.multi_origin && entity.is_some() {
            if let Some(panel) = self.panels.iter_mut().find(|p| p.entity == entity) {
                let leader = Uuid::new_v4();
                panel.origins.push(Origin { polygon, leader });
                let id = panel.id;
                self.pending.push(OverlayOp::Create { id: leader, kind: OverlayKind::Leader });
                return Selection { panel: id, created: false, evicted: Vec::new() };
            }
        }

        let mut evicted = Vec::new();
        if self.panels.len() >= self.capacity {
            let oldest = self.panels.remove(0);
            log::debug!("evicting panel {} with {} origin(s)", oldest.id, oldest.origins.len());
            evicted = self.discard(&oldest);
        }

        let id = Uuid::new_v4();
        let leader = Uuid::new_v4();
        let position = self.layout.position(self.panels.len(), canvas);
        self.panels.push(Panel {
            id,
            entity,
            position,
            size: self.layout.size(),
            origins: vec![Origin { polygon, leader }],
        });
        self.pending.push(OverlayOp::Create { id, kind: OverlayKind::Panel { entity, polygon } });
        self.pending.push(OverlayOp::Create { id: leader, kind: OverlayKind::Leader });
        Selection { panel: id, created: true, evicted }
    }

    /// Detach `polygon`; its panel goes away with its last origin.
    /// Returns `false` if the polygon was not an origin.
    pub fn deselect(&mut self, polygon: usize) -> bool {
        let Some(index) = self.panels.iter().position(|p| p.has_origin(polygon)) else {
            return false;
        };
        let panel = &mut self.panels[index];
        let mut removed = Vec::new();
        panel.origins.retain(|o| {
            if o.polygon == polygon {
                removed.push(o.leader);
                false
            } else {
                true
            }
        });
        let emptied = panel.origins.is_empty();
        self.pending.extend(removed.into_iter().map(|id| OverlayOp::Remove { id }));
        if emptied {
            let panel = self.panels.remove(index);
            self.pending.push(OverlayOp::Remove { id: panel.id });
        }
        true
    }

    /// Close a panel from its close button. Returns the polygons to deselect.
    pub fn close(&mut self, id: OverlayId) -> Vec<usize> {
        let Some(index) = self.panels.iter().position(|p| p.id == id) else {
            return Vec::new();
        };
        let panel = self.panels.remove(index);
        self.discard(&panel)
    }

    /// Remove every panel. Returns the polygons that were origins.
    pub fn clear(&mut self) -> Vec<usize> {
        let panels = std::mem::take(&mut self.panels);
        panels.iter().flat_map(|p| self.discard(p)).collect()
    }

    /// Queue removal of an already-detached panel and its leaders.
    fn discard(&mut self, panel: &Panel) -> Vec<usize> {
        self.pending.extend(panel.origins.iter().map(|o| OverlayOp::Remove { id: o.leader }));
        self.pending.push(OverlayOp::Remove { id: panel.id });
        panel.origins.iter().map(|o| o.polygon).collect()
    }

    /// Move a panel to `origin + delta`, clamped to `[0, wrapper - size]`.
    /// Returns `false` for an unknown panel.
    pub fn drag(&mut self, id: OverlayId, origin: Point, delta: Point, wrapper: Size) -> bool {
        let Some(panel) = self.panels.iter_mut().find(|p| p.id == id) else {
            return false;
        };
        let max_x = (wrapper.width - panel.size.width).max(0.0);
        let max_y = (wrapper.height - panel.size.height).max(0.0);
        panel.position = Point::new((origin.x + delta.x).clamp(0.0, max_x), (origin.y + delta.y).clamp(0.0, max_y));
        true
    }

    /// Record the rendered size of a panel once the host has filled it.
    pub fn resize(&mut self, id: OverlayId, size: Size) -> bool {
        let Some(panel) = self.panels.iter_mut().find(|p| p.id == id) else {
            return false;
        };
        panel.size = size;
        true
    }

    /// Drain queued overlay changes in the order they happened.
    pub fn take_ops(&mut self) -> Vec<OverlayOp> {
        std::mem::take(&mut self.pending)
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}
