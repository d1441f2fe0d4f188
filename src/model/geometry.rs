//! Geometry types in image coordinates.
//!
//! Every geometry variant is immutable by replacement: operations such as
//! [`Geometry::moved_by`] and [`Geometry::clamped`] return a new value
//! instead of editing fields in place.

use serde::{Deserialize, Serialize};

/// Hit radius for point annotations (in image pixels).
pub const POINT_HIT_RADIUS: f64 = 10.0;

/// Default font size used to estimate the extent of text geometry.
pub const DEFAULT_FONT_SIZE: f64 = 16.0;

/// Average glyph width as a fraction of the font size.
const GLYPH_WIDTH_RATIO: f64 = 0.6;

/// A 2D point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Calculate distance to another point.
    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Midpoint between two points.
    pub fn midpoint(&self, other: &Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    /// Translate by an offset.
    pub fn offset(&self, dx: f64, dy: f64) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }
}

/// Shortest distance from `p` to the segment `a`-`b`.
pub fn distance_to_segment(p: &Point, a: &Point, b: &Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return p.distance_to(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    p.distance_to(&Point::new(a.x + t * dx, a.y + t * dy))
}

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Top-left corner X coordinate
    pub x: f64,
    /// Top-left corner Y coordinate
    pub y: f64,
    /// Width of the box
    pub width: f64,
    /// Height of the box
    pub height: f64,
}

impl Bounds {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a box from two corner points.
    pub fn from_corners(p1: Point, p2: Point) -> Self {
        Self {
            x: p1.x.min(p2.x),
            y: p1.y.min(p2.y),
            width: (p1.x - p2.x).abs(),
            height: (p1.y - p2.y).abs(),
        }
    }

    /// Smallest box containing every point. None for an empty slice.
    pub fn from_points(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }

    /// Smallest box containing both boxes.
    pub fn union(&self, other: &Bounds) -> Bounds {
        let min_x = self.x.min(other.x);
        let min_y = self.y.min(other.y);
        let max_x = self.right().max(other.right());
        let max_y = self.bottom().max(other.bottom());
        Bounds::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Check if a point is inside the box (edges inclusive).
    pub fn contains(&self, point: &Point) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// Size of the underlying image; all drawn geometry stays inside it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageBounds {
    pub width: f64,
    pub height: f64,
}

impl ImageBounds {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Clamp a point into `[0, width] x [0, height]`.
    pub fn clamp(&self, point: Point) -> Point {
        Point::new(
            point.x.clamp(0.0, self.width.max(0.0)),
            point.y.clamp(0.0, self.height.max(0.0)),
        )
    }

    pub fn contains(&self, point: &Point) -> bool {
        point.x >= 0.0 && point.x <= self.width && point.y >= 0.0 && point.y <= self.height
    }

    /// Check that a whole box lies inside the image.
    pub fn contains_bounds(&self, bounds: &Bounds) -> bool {
        bounds.x >= 0.0
            && bounds.y >= 0.0
            && bounds.right() <= self.width
            && bounds.bottom() <= self.height
    }
}

/// Optional styling carried by text geometry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
}

/// Which end of a polyline segment carries an arrow head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrowPosition {
    Start,
    End,
}

/// An arrow head attached to one segment of a polyline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrowHead {
    /// Index of the segment (segment `i` joins points `i` and `i + 1`).
    pub segment: usize,
    pub position: ArrowPosition,
}

/// The type tag of a geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GeometryKind {
    Rectangle,
    Circle,
    Ellipse,
    Polygon,
    Point,
    Text,
    PolylineArrow,
}

impl GeometryKind {
    /// Wire tag for this kind.
    pub fn tag(&self) -> &'static str {
        match self {
            GeometryKind::Rectangle => "rectangle",
            GeometryKind::Circle => "circle",
            GeometryKind::Ellipse => "ellipse",
            GeometryKind::Polygon => "polygon",
            GeometryKind::Point => "point",
            GeometryKind::Text => "text",
            GeometryKind::PolylineArrow => "polyline-arrow",
        }
    }

    /// Parse a wire tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::all().iter().copied().find(|kind| kind.tag() == tag)
    }

    /// All geometry kinds.
    pub fn all() -> &'static [GeometryKind] {
        &[
            GeometryKind::Rectangle,
            GeometryKind::Circle,
            GeometryKind::Ellipse,
            GeometryKind::Polygon,
            GeometryKind::Point,
            GeometryKind::Text,
            GeometryKind::PolylineArrow,
        ]
    }
}

impl std::fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Shape-defining payload of an annotation target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Geometry {
    Rectangle {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
    },
    Circle {
        cx: f64,
        cy: f64,
        r: f64,
    },
    Ellipse {
        cx: f64,
        cy: f64,
        rx: f64,
        ry: f64,
    },
    Polygon {
        points: Vec<Point>,
    },
    Point {
        x: f64,
        y: f64,
    },
    Text {
        x: f64,
        y: f64,
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        style: Option<TextStyle>,
    },
    PolylineArrow {
        points: Vec<Point>,
        #[serde(default)]
        arrows: Vec<ArrowHead>,
    },
}

impl Geometry {
    /// Rectangle from two opposite corners.
    pub fn rectangle_from_corners(p1: Point, p2: Point) -> Self {
        let b = Bounds::from_corners(p1, p2);
        Geometry::Rectangle {
            x: b.x,
            y: b.y,
            w: b.width,
            h: b.height,
        }
    }

    pub fn kind(&self) -> GeometryKind {
        match self {
            Geometry::Rectangle { .. } => GeometryKind::Rectangle,
            Geometry::Circle { .. } => GeometryKind::Circle,
            Geometry::Ellipse { .. } => GeometryKind::Ellipse,
            Geometry::Polygon { .. } => GeometryKind::Polygon,
            Geometry::Point { .. } => GeometryKind::Point,
            Geometry::Text { .. } => GeometryKind::Text,
            Geometry::PolylineArrow { .. } => GeometryKind::PolylineArrow,
        }
    }

    /// Axis-aligned bounding box. None when there is nothing to bound.
    pub fn bounds(&self) -> Option<Bounds> {
        match self {
            Geometry::Rectangle { x, y, w, h } => Some(Bounds::new(*x, *y, *w, *h)),
            Geometry::Circle { cx, cy, r } => Some(Bounds::new(cx - r, cy - r, 2.0 * r, 2.0 * r)),
            Geometry::Ellipse { cx, cy, rx, ry } => {
                Some(Bounds::new(cx - rx, cy - ry, 2.0 * rx, 2.0 * ry))
            }
            Geometry::Polygon { points } | Geometry::PolylineArrow { points, .. } => {
                Bounds::from_points(points)
            }
            Geometry::Point { x, y } => Some(Bounds::new(*x, *y, 0.0, 0.0)),
            Geometry::Text { x, y, text, style } => {
                let (w, h) = text_extent(text, style.as_ref());
                Some(Bounds::new(*x, *y, w, h))
            }
        }
    }

    /// Hit test. `tolerance` widens line-like geometry (polylines, points).
    pub fn contains_point(&self, point: &Point, tolerance: f64) -> bool {
        match self {
            Geometry::Rectangle { x, y, w, h } => Bounds::new(*x, *y, *w, *h).contains(point),
            Geometry::Circle { cx, cy, r } => Point::new(*cx, *cy).distance_to(point) <= *r,
            Geometry::Ellipse { cx, cy, rx, ry } => {
                if *rx <= 0.0 || *ry <= 0.0 {
                    return false;
                }
                let nx = (point.x - cx) / rx;
                let ny = (point.y - cy) / ry;
                nx * nx + ny * ny <= 1.0
            }
            Geometry::Polygon { points } => polygon_contains(points, point),
            Geometry::Point { x, y } => {
                Point::new(*x, *y).distance_to(point) < POINT_HIT_RADIUS.max(tolerance)
            }
            Geometry::Text { .. } => self.bounds().is_some_and(|b| b.contains(point)),
            Geometry::PolylineArrow { points, .. } => points
                .windows(2)
                .any(|seg| distance_to_segment(point, &seg[0], &seg[1]) <= tolerance),
        }
    }

    /// A copy translated by `(dx, dy)`.
    pub fn moved_by(&self, dx: f64, dy: f64) -> Geometry {
        match self {
            Geometry::Rectangle { x, y, w, h } => Geometry::Rectangle {
                x: x + dx,
                y: y + dy,
                w: *w,
                h: *h,
            },
            Geometry::Circle { cx, cy, r } => Geometry::Circle {
                cx: cx + dx,
                cy: cy + dy,
                r: *r,
            },
            Geometry::Ellipse { cx, cy, rx, ry } => Geometry::Ellipse {
                cx: cx + dx,
                cy: cy + dy,
                rx: *rx,
                ry: *ry,
            },
            Geometry::Polygon { points } => Geometry::Polygon {
                points: points.iter().map(|p| p.offset(dx, dy)).collect(),
            },
            Geometry::Point { x, y } => Geometry::Point {
                x: x + dx,
                y: y + dy,
            },
            Geometry::Text { x, y, text, style } => Geometry::Text {
                x: x + dx,
                y: y + dy,
                text: text.clone(),
                style: style.clone(),
            },
            Geometry::PolylineArrow { points, arrows } => Geometry::PolylineArrow {
                points: points.iter().map(|p| p.offset(dx, dy)).collect(),
                arrows: arrows.clone(),
            },
        }
    }

    /// A copy forced inside the image.
    ///
    /// Circles and ellipses keep their (clamped) centre and shrink their
    /// radii so the whole shape stays inside. Text moves its anchor so the
    /// estimated extent fits.
    pub fn clamped(&self, image: &ImageBounds) -> Geometry {
        match self {
            Geometry::Rectangle { x, y, w, h } => {
                let p1 = image.clamp(Point::new(*x, *y));
                let p2 = image.clamp(Point::new(x + w, y + h));
                Geometry::rectangle_from_corners(p1, p2)
            }
            Geometry::Circle { cx, cy, r } => {
                let c = image.clamp(Point::new(*cx, *cy));
                let max_r = c.x.min(c.y).min(image.width - c.x).min(image.height - c.y);
                Geometry::Circle {
                    cx: c.x,
                    cy: c.y,
                    r: r.min(max_r).max(0.0),
                }
            }
            Geometry::Ellipse { cx, cy, rx, ry } => {
                let c = image.clamp(Point::new(*cx, *cy));
                Geometry::Ellipse {
                    cx: c.x,
                    cy: c.y,
                    rx: rx.min(c.x.min(image.width - c.x)).max(0.0),
                    ry: ry.min(c.y.min(image.height - c.y)).max(0.0),
                }
            }
            Geometry::Polygon { points } => Geometry::Polygon {
                points: points.iter().map(|p| image.clamp(*p)).collect(),
            },
            Geometry::Point { x, y } => {
                let p = image.clamp(Point::new(*x, *y));
                Geometry::Point { x: p.x, y: p.y }
            }
            Geometry::Text { x, y, text, style } => {
                // Shift the anchor so the estimated extent fits as well
                let (w, h) = text_extent(text, style.as_ref());
                Geometry::Text {
                    x: x.min(image.width - w).max(0.0),
                    y: y.min(image.height - h).max(0.0),
                    text: text.clone(),
                    style: style.clone(),
                }
            }
            Geometry::PolylineArrow { points, arrows } => Geometry::PolylineArrow {
                points: points.iter().map(|p| image.clamp(*p)).collect(),
                arrows: arrows.clone(),
            },
        }
    }
}

/// Estimated width and height of a text run.
pub fn text_extent(text: &str, style: Option<&TextStyle>) -> (f64, f64) {
    let size = style
        .and_then(|s| s.font_size)
        .unwrap_or(DEFAULT_FONT_SIZE);
    (text.chars().count() as f64 * size * GLYPH_WIDTH_RATIO, size)
}

/// Point-in-polygon test using ray casting.
fn polygon_contains(vertices: &[Point], point: &Point) -> bool {
    if vertices.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let vi = &vertices[i];
        let vj = &vertices[j];
        if ((vi.y > point.y) != (vj.y > point.y))
            && (point.x < (vj.x - vi.x) * (point.y - vi.y) / (vj.y - vi.y) + vi.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Geometry {
        Geometry::Polygon {
            points: vec![
                Point::new(0.0, 0.0),
                Point::new(100.0, 0.0),
                Point::new(100.0, 100.0),
                Point::new(0.0, 100.0),
            ],
        }
    }

    #[test]
    fn test_point_distance() {
        let p1 = Point::new(0.0, 0.0);
        let p2 = Point::new(3.0, 4.0);
        assert!((p1.distance_to(&p2) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_distance_to_segment() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert!((distance_to_segment(&Point::new(5.0, 3.0), &a, &b) - 3.0).abs() < 1e-9);
        // Beyond the end the distance is measured to the endpoint
        assert!((distance_to_segment(&Point::new(13.0, 4.0), &a, &b) - 5.0).abs() < 1e-9);
        // Degenerate segment
        assert!((distance_to_segment(&Point::new(3.0, 4.0), &a, &a) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_bounds_union() {
        let a = Bounds::new(0.0, 0.0, 10.0, 10.0);
        let b = Bounds::new(20.0, 20.0, 10.0, 10.0);
        assert_eq!(a.union(&b), Bounds::new(0.0, 0.0, 30.0, 30.0));
    }

    #[test]
    fn test_polygon_bounds_and_contains() {
        let poly = square();
        assert_eq!(poly.bounds(), Some(Bounds::new(0.0, 0.0, 100.0, 100.0)));
        assert!(poly.contains_point(&Point::new(50.0, 50.0), 0.0));
        assert!(!poly.contains_point(&Point::new(150.0, 50.0), 0.0));
    }

    #[test]
    fn test_empty_polygon_has_no_bounds() {
        let poly = Geometry::Polygon { points: vec![] };
        assert_eq!(poly.bounds(), None);
    }

    #[test]
    fn test_polyline_hit_uses_segment_distance() {
        let line = Geometry::PolylineArrow {
            points: vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)],
            arrows: vec![],
        };
        assert!(line.contains_point(&Point::new(50.0, 4.0), 5.0));
        assert!(!line.contains_point(&Point::new(50.0, 6.0), 5.0));
    }

    #[test]
    fn test_ellipse_contains() {
        let e = Geometry::Ellipse {
            cx: 50.0,
            cy: 50.0,
            rx: 40.0,
            ry: 10.0,
        };
        assert!(e.contains_point(&Point::new(85.0, 50.0), 0.0));
        assert!(!e.contains_point(&Point::new(50.0, 65.0), 0.0));
    }

    #[test]
    fn test_moved_by_returns_new_value() {
        let rect = Geometry::Rectangle {
            x: 1.0,
            y: 2.0,
            w: 3.0,
            h: 4.0,
        };
        let moved = rect.moved_by(10.0, 20.0);
        assert_eq!(
            moved,
            Geometry::Rectangle {
                x: 11.0,
                y: 22.0,
                w: 3.0,
                h: 4.0
            }
        );
        assert_eq!(rect.kind(), moved.kind());
    }

    #[test]
    fn test_clamped_text_keeps_extent_inside() {
        let image = ImageBounds::new(100.0, 50.0);
        let text = Geometry::Text {
            x: 90.0,
            y: 45.0,
            text: "note".to_string(),
            style: None,
        };
        let (w, h) = text_extent("note", None);
        let clamped = text.clamped(&image);
        let bounds = clamped.bounds().unwrap();
        assert_eq!(bounds.x, 100.0 - w);
        assert_eq!(bounds.y, 50.0 - h);

        let wide = Geometry::Text {
            x: -5.0,
            y: 10.0,
            text: "x".repeat(40),
            style: None,
        };
        let bounds = wide.clamped(&image).bounds().unwrap();
        assert_eq!((bounds.x, bounds.y), (0.0, 10.0));
    }

    #[test]
    fn test_clamped_rectangle_and_circle() {
        let image = ImageBounds::new(100.0, 50.0);
        let rect = Geometry::Rectangle {
            x: -10.0,
            y: 10.0,
            w: 200.0,
            h: 100.0,
        };
        assert_eq!(
            rect.clamped(&image),
            Geometry::Rectangle {
                x: 0.0,
                y: 10.0,
                w: 100.0,
                h: 40.0
            }
        );

        let circle = Geometry::Circle {
            cx: 90.0,
            cy: 25.0,
            r: 30.0,
        };
        let clamped = circle.clamped(&image);
        assert!(image.contains_bounds(&clamped.bounds().unwrap()));
    }

    #[test]
    fn test_geometry_wire_tags() {
        let json = serde_json::to_value(Geometry::PolylineArrow {
            points: vec![Point::new(1.0, 2.0), Point::new(3.0, 4.0)],
            arrows: vec![ArrowHead {
                segment: 0,
                position: ArrowPosition::End,
            }],
        })
        .unwrap();
        assert_eq!(json["type"], "polyline-arrow");
        assert_eq!(json["arrows"][0]["position"], "end");

        let rect: Geometry =
            serde_json::from_str(r#"{"type":"rectangle","x":1,"y":2,"w":3,"h":4}"#).unwrap();
        assert_eq!(rect.kind(), GeometryKind::Rectangle);
        assert_eq!(GeometryKind::from_tag("polyline-arrow"), Some(GeometryKind::PolylineArrow));
        assert_eq!(GeometryKind::from_tag("star"), None);
    }
}
