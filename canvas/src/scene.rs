//! Scene model: polygons, their linked entities, selection, visibility and gray overrides.
//!
//! Data flows into this layer from the host (JSON records from the store) and
//! from the viewer and editor cores (selection, drags, overrides). The render
//! pass reads from `Scene` to decide what to draw and how.
//!
//! Polygons are addressed by their index in load order. Indices are stable
//! until the next `load`, which also resets selection and overrides.

#[cfg(test)]
#[path = "scene_test.rs"]
mod scene_test;

use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::consts::{DEFAULT_POLYGON_COLOR, MIN_POLYGON_POINTS};
use crate::error::CanvasError;
use crate::geometry::{Point, point_in_polygon};

/// Persisted polygon record id.
pub type RecordId = i64;

/// Linked business entity id.
pub type EntityId = i64;

/// How a polygon was drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    /// Free-form polygon, vertex by vertex.
    #[default]
    Polygon,
    /// Axis-aligned rectangle, four corners.
    Rectangle,
}

/// Business entity linked to a polygon (a lot, unit or amenity).
///
/// Only the fields the canvas needs are typed; the rest of the payload is kept
/// for the host's popup content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_sold: bool,
    /// Amenities and other non-sellable shapes; drawn with a thin border.
    #[serde(default)]
    pub is_decoration: bool,
    /// Remaining payload fields (price, area, category, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity {
    #[must_use]
    pub fn new(id: EntityId, name: impl Into<String>) -> Self {
        Self { id, name: name.into(), is_sold: false, is_decoration: false, extra: Map::new() }
    }
}

/// Entity chosen by the host's picker when committing a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: EntityId,
    pub name: String,
}

/// A saved polygon in reference space.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub id: RecordId,
    pub name: String,
    /// Vertices in reference space; the last connects back to the first.
    pub points: Vec<Point>,
    /// CSS border color.
    pub color: String,
    pub kind: ShapeKind,
    pub entity: Option<Entity>,
}

impl Polygon {
    /// Whether the polygon has enough vertices to draw, hit-test and persist.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.points.len() >= MIN_POLYGON_POINTS
    }

    #[must_use]
    pub fn is_decoration(&self) -> bool {
        self.entity.as_ref().is_some_and(|e| e.is_decoration)
    }

    #[must_use]
    pub fn entity_id(&self) -> Option<EntityId> {
        self.entity.as_ref().map(|e| e.id)
    }
}

/// A polygon as it travels to and from the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonRecord {
    pub id: RecordId,
    #[serde(default)]
    pub name: String,
    /// JSON text of `[{"x": .., "y": ..}, ...]` in reference space.
    pub coordinates: String,
    #[serde(default, deserialize_with = "string_or_false")]
    pub color: Option<String>,
    #[serde(default)]
    pub polygon_type: ShapeKind,
    #[serde(default)]
    pub product: Option<Entity>,
}

impl PolygonRecord {
    /// Decode the coordinate text into a scene polygon.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::Json`] if `coordinates` is not a point array.
    pub fn into_polygon(self) -> Result<Polygon, CanvasError> {
        let points = parse_coordinates(&self.coordinates)?;
        Ok(Polygon {
            id: self.id,
            name: self.name,
            points,
            color: self.color.unwrap_or_else(|| DEFAULT_POLYGON_COLOR.to_owned()),
            kind: self.polygon_type,
            entity: self.product,
        })
    }
}

/// Store records send `false` for an empty color.
fn string_or_false<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) if !s.is_empty() => Some(s),
        _ => None,
    })
}

/// Parse persisted coordinate text.
///
/// # Errors
///
/// Returns [`CanvasError::Json`] if the text is not a JSON array of `{x, y}` objects.
pub fn parse_coordinates(text: &str) -> Result<Vec<Point>, CanvasError> {
    Ok(serde_json::from_str(text)?)
}

/// Serialize points for the store.
///
/// # Errors
///
/// Returns [`CanvasError::Json`] if serialization fails (non-finite values are
/// written as `null` by `serde_json`, so in practice this does not happen).
pub fn coordinates_json(points: &[Point]) -> Result<String, CanvasError> {
    Ok(serde_json::to_string(points)?)
}

/// Per-polygon overrides of the sold state, set from the viewer toolbar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrayOverrides {
    /// Gray everything except `ungrayed`.
    pub force_all: bool,
    /// Grayed by hand while `force_all` is off.
    pub grayed: BTreeSet<usize>,
    /// Un-grayed by hand while `force_all` is on.
    pub ungrayed: BTreeSet<usize>,
    /// Clicks toggle overrides instead of selecting.
    pub interactive: bool,
}

impl GrayOverrides {
    #[must_use]
    pub fn effectively_sold(&self, index: usize) -> bool {
        if self.force_all {
            !self.ungrayed.contains(&index)
        } else {
            self.grayed.contains(&index)
        }
    }

    /// Flip `force_all`. Both override sets are cleared either way; switching
    /// off also leaves interactive mode.
    pub fn toggle_force_all(&mut self) -> bool {
        self.force_all = !self.force_all;
        self.grayed.clear();
        self.ungrayed.clear();
        if !self.force_all {
            self.interactive = false;
        }
        self.force_all
    }

    pub fn toggle_interactive(&mut self) -> bool {
        self.interactive = !self.interactive;
        self.interactive
    }

    /// Interactive click on `index`: flips its membership in the set that
    /// matters for the current `force_all` state.
    pub fn toggle(&mut self, index: usize) {
        let set = if self.force_all { &mut self.ungrayed } else { &mut self.grayed };
        if !set.remove(&index) {
            set.insert(index);
        }
    }
}

/// All polygons of one canvas mount plus the viewer's presentation state.
#[derive(Debug, Clone)]
pub struct Scene {
    polygons: Vec<Polygon>,
    /// Selected indices in selection order.
    selected: Vec<usize>,
    visible: bool,
    pub gray: GrayOverrides,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self { polygons: Vec::new(), selected: Vec::new(), visible: true, gray: GrayOverrides::default() }
    }

    /// Replace all polygons. Selection and gray overrides refer to indices, so
    /// they are reset.
    pub fn load(&mut self, polygons: Vec<Polygon>) {
        self.polygons = polygons;
        self.selected.clear();
        self.gray.grayed.clear();
        self.gray.ungrayed.clear();
    }

    /// Decode store records and load them. Records with unreadable coordinates
    /// are logged and skipped. Returns the number skipped.
    pub fn load_records(&mut self, records: Vec<PolygonRecord>) -> usize {
        let total = records.len();
        let polygons: Vec<Polygon> = records
            .into_iter()
            .filter_map(|record| {
                let id = record.id;
                match record.into_polygon() {
                    Ok(polygon) => Some(polygon),
                    Err(e) => {
                        log::warn!("skipping polygon {id}: {e}");
                        None
                    }
                }
            })
            .collect();
        let skipped = total - polygons.len();
        self.load(polygons);
        skipped
    }

    #[must_use]
    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    #[must_use]
    pub fn polygon(&self, index: usize) -> Option<&Polygon> {
        self.polygons.get(index)
    }

    pub fn polygon_mut(&mut self, index: usize) -> Option<&mut Polygon> {
        self.polygons.get_mut(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    // --- selection ---

    #[must_use]
    pub fn selected(&self) -> &[usize] {
        &self.selected
    }

    #[must_use]
    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.contains(&index)
    }

    /// Add `index` to the selection. Returns `false` if it was already selected
    /// or out of range.
    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.polygons.len() || self.is_selected(index) {
            return false;
        }
        self.selected.push(index);
        true
    }

    pub fn deselect(&mut self, index: usize) -> bool {
        let before = self.selected.len();
        self.selected.retain(|&i| i != index);
        self.selected.len() != before
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    // --- visibility ---

    #[must_use]
    pub fn visible(&self) -> bool {
        self.visible
    }

    /// Show or hide unselected polygons. Returns the new state.
    pub fn toggle_visible(&mut self) -> bool {
        self.visible = !self.visible;
        self.visible
    }

    // --- queries ---

    /// Whether polygon `index` renders as sold: the entity says so or an
    /// override grays it.
    #[must_use]
    pub fn renders_sold(&self, index: usize) -> bool {
        let entity_sold = self
            .polygons
            .get(index)
            .and_then(|p| p.entity.as_ref())
            .is_some_and(|e| e.is_sold);
        entity_sold || self.gray.effectively_sold(index)
    }

    /// Topmost polygon containing reference point `point`.
    ///
    /// While polygons are hidden only selected ones can be hit.
    #[must_use]
    pub fn polygon_at(&self, point: Point) -> Option<usize> {
        self.polygons
            .iter()
            .enumerate()
            .rev()
            .filter(|(i, _)| self.visible || self.is_selected(*i))
            .find(|(_, p)| point_in_polygon(point, &p.points))
            .map(|(i, _)| i)
    }

    /// Topmost polygon containing `point`, ignoring visibility. Used by the editor.
    #[must_use]
    pub fn any_polygon_at(&self, point: Point) -> Option<usize> {
        self.polygons.iter().rposition(|p| point_in_polygon(point, &p.points))
    }

    /// Distinct border colors in use, sorted.
    #[must_use]
    pub fn used_colors(&self) -> Vec<String> {
        let colors: BTreeSet<&str> = self.polygons.iter().map(|p| p.color.as_str()).filter(|c| !c.is_empty()).collect();
        colors.into_iter().map(str::to_owned).collect()
    }

    /// Entities already linked to a polygon, sorted and deduplicated.
    #[must_use]
    pub fn assigned_entities(&self) -> Vec<EntityId> {
        let ids: BTreeSet<EntityId> = self.polygons.iter().filter_map(Polygon::entity_id).collect();
        ids.into_iter().collect()
    }
}
