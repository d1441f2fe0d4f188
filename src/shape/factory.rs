//! Construction of shapes from geometry type tags.

use crate::model::{Annotation, Geometry, GeometryKind, Point};

use super::Shape;

/// Maps a geometry type tag to shape construction.
pub struct ShapeFactory;

impl ShapeFactory {
    /// Shape for an annotation's target geometry.
    pub fn from_annotation(annotation: &Annotation) -> Shape {
        Shape::new(annotation.geometry().clone())
    }

    /// Zero-sized shape of `kind` anchored at `anchor`, used to seed drawing.
    pub fn seed(kind: GeometryKind, anchor: Point) -> Shape {
        let Point { x, y } = anchor;
        let geometry = match kind {
            GeometryKind::Rectangle => Geometry::Rectangle {
                x,
                y,
                w: 0.0,
                h: 0.0,
            },
            GeometryKind::Circle => Geometry::Circle {
                cx: x,
                cy: y,
                r: 0.0,
            },
            GeometryKind::Ellipse => Geometry::Ellipse {
                cx: x,
                cy: y,
                rx: 0.0,
                ry: 0.0,
            },
            GeometryKind::Polygon => Geometry::Polygon {
                points: vec![anchor],
            },
            GeometryKind::Point => Geometry::Point { x, y },
            GeometryKind::Text => Geometry::Text {
                x,
                y,
                text: String::new(),
                style: None,
            },
            GeometryKind::PolylineArrow => Geometry::PolylineArrow {
                points: vec![anchor],
                arrows: Vec::new(),
            },
        };
        Shape::new(geometry)
    }

    /// Seed a shape from a wire tag such as `"polyline-arrow"`.
    pub fn seed_from_tag(tag: &str, anchor: Point) -> Option<Shape> {
        GeometryKind::from_tag(tag).map(|kind| Self::seed(kind, anchor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_matches_kind() {
        for kind in GeometryKind::all() {
            let shape = ShapeFactory::seed(*kind, Point::new(1.0, 2.0));
            assert_eq!(shape.kind(), *kind);
        }
    }

    #[test]
    fn test_seed_from_tag() {
        let shape = ShapeFactory::seed_from_tag("circle", Point::new(3.0, 4.0)).unwrap();
        assert_eq!(
            shape.geometry(),
            &Geometry::Circle {
                cx: 3.0,
                cy: 4.0,
                r: 0.0
            }
        );
        assert!(ShapeFactory::seed_from_tag("hexagon", Point::new(0.0, 0.0)).is_none());
    }
}
