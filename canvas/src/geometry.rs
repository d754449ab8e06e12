//! Geometry kernel: points, rectangles, and the polygon queries used by hit
//! testing and leader-line anchoring.
//!
//! Everything here is pure and coordinate-space agnostic. Callers decide whether
//! a [`Point`] is in reference, display or screen space.

#[cfg(test)]
#[path = "geometry_test.rs"]
mod geometry_test;

use serde::{Deserialize, Serialize};

/// A 2D point. Serialized as `{"x": .., "y": ..}`, the persisted vertex shape.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: Point) -> f64 {
        self.distance_sq(other).sqrt()
    }

    /// Squared distance to `other`.
    #[must_use]
    pub fn distance_sq(self, other: Point) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx * dx + dy * dy
    }

    /// Midpoint between `self` and `other`.
    #[must_use]
    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) * 0.5, (self.y + other.y) * 0.5)
    }

    /// Component-wise translation.
    #[must_use]
    pub fn offset(self, dx: f64, dy: f64) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }
}

/// Width and height pair.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle given by its top-left corner and size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    #[must_use]
    pub fn from_origin_size(origin: Point, size: Size) -> Self {
        Self::new(origin.x, origin.y, size.width, size.height)
    }

    #[must_use]
    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    #[must_use]
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Ray-casting parity test.
///
/// Walks edges `(v[i], v[j])` with `j = i - 1 (mod n)` and toggles on each edge
/// whose half-open y-span straddles `point.y` and whose crossing lies to the
/// right of `point`. An edge with `yi == point.y == yj` never counts. Fewer
/// than three vertices is never inside.
#[must_use]
pub fn point_in_polygon(point: Point, vertices: &[Point]) -> bool {
    if vertices.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = vertices.len() - 1;
    for (i, vi) in vertices.iter().enumerate() {
        let vj = vertices[j];
        if (vi.y > point.y) != (vj.y > point.y) {
            let cross_x = (vj.x - vi.x) * (point.y - vi.y) / (vj.y - vi.y) + vi.x;
            if point.x < cross_x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Project `p` onto the segment `a`–`b`, clamping to the segment.
///
/// A zero-length segment returns `a`.
#[must_use]
pub fn closest_point_on_segment(a: Point, b: Point, p: Point) -> Point {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length_sq = dx * dx + dy * dy;
    if length_sq == 0.0 {
        return a;
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / length_sq).clamp(0.0, 1.0);
    Point::new(a.x + t * dx, a.y + t * dy)
}

/// Closest point to `target` on the closed boundary of `polygon`.
///
/// Returns `None` for an empty vertex list. A single vertex is its own closest
/// point.
#[must_use]
pub fn closest_edge_point(polygon: &[Point], target: Point) -> Option<Point> {
    let n = polygon.len();
    let mut best: Option<(f64, Point)> = None;
    for i in 0..n {
        let candidate = closest_point_on_segment(polygon[i], polygon[(i + 1) % n], target);
        let dist = candidate.distance_sq(target);
        if best.is_none_or(|(d, _)| dist < d) {
            best = Some((dist, candidate));
        }
    }
    best.map(|(_, p)| p)
}

/// Where a ray leaving the center of `rect` at `angle` (radians) crosses the
/// rectangle boundary.
#[must_use]
pub fn rect_edge_intersection(rect: &Rect, angle: f64) -> Point {
    let center = rect.center();
    let cos = angle.cos();
    let sin = angle.sin();

    if cos.abs() > sin.abs() {
        let x = if cos > 0.0 { rect.right() } else { rect.x };
        Point::new(x, center.y + (x - center.x) * sin / cos)
    } else {
        let y = if sin > 0.0 { rect.bottom() } else { rect.y };
        Point::new(center.x + (y - center.y) * cos / sin, y)
    }
}

/// Axis-aligned bounds of `points`, or `None` when empty.
#[must_use]
pub fn bounding_box(points: &[Point]) -> Option<Rect> {
    let first = points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in points.iter().skip(1) {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Some(Rect::new(min_x, min_y, max_x - min_x, max_y - min_y))
}

/// Vertex average. Used to place labels, not an area centroid.
#[must_use]
pub fn centroid(points: &[Point]) -> Option<Point> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let (sx, sy) = points.iter().fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    Some(Point::new(sx / n, sy / n))
}

/// Translate every point by `(dx, dy)` in place.
pub fn translate_all(points: &mut [Point], dx: f64, dy: f64) {
    for p in points {
        p.x += dx;
        p.y += dy;
    }
}
