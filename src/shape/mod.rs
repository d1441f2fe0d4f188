//! Shapes: the plain-data model of one drawn geometry.
//!
//! A [`Shape`] is locked to the geometry kind it was created with and
//! exposes update, move, hit-test and edit-handle operations. Turning
//! shapes into SVG is the job of [`crate::render`], so everything here is
//! testable without a DOM.

mod factory;

pub use factory::ShapeFactory;

use crate::error::ShapeError;
use crate::model::{Geometry, GeometryKind, Point};

/// What an edit handle controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleRole {
    /// Rectangle corner
    Corner,
    /// Circle/ellipse centre (drag moves the shape)
    Center,
    /// Circle radius
    Radius,
    /// Ellipse horizontal radius
    RadiusX,
    /// Ellipse vertical radius
    RadiusY,
    /// Polygon or polyline vertex
    Vertex,
    /// Position of a point or text
    Anchor,
}

/// A draggable control point bound to part of a shape's geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditHandle {
    pub index: usize,
    pub position: Point,
    pub role: HandleRole,
}

/// A drawn shape holding one geometry of a fixed kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    kind: GeometryKind,
    geometry: Geometry,
}

impl Shape {
    /// Create a shape; its kind is taken from the geometry.
    pub fn new(geometry: Geometry) -> Self {
        Self {
            kind: geometry.kind(),
            geometry,
        }
    }

    pub fn kind(&self) -> GeometryKind {
        self.kind
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn into_geometry(self) -> Geometry {
        self.geometry
    }

    /// Replace the geometry. Fails if the new geometry is of another kind.
    pub fn update(&mut self, geometry: Geometry) -> Result<(), ShapeError> {
        if geometry.kind() != self.kind {
            return Err(ShapeError::GeometryMismatch {
                expected: self.kind,
                found: geometry.kind(),
            });
        }
        self.geometry = geometry;
        Ok(())
    }

    pub fn move_by(&mut self, dx: f64, dy: f64) {
        self.geometry = self.geometry.moved_by(dx, dy);
    }

    pub fn contains_point(&self, point: &Point, tolerance: f64) -> bool {
        self.geometry.contains_point(point, tolerance)
    }

    /// Edit handles in index order.
    pub fn edit_handles(&self) -> Vec<EditHandle> {
        let handle = |index, position, role| EditHandle {
            index,
            position,
            role,
        };
        match &self.geometry {
            Geometry::Rectangle { x, y, w, h } => [
                Point::new(*x, *y),
                Point::new(x + w, *y),
                Point::new(x + w, y + h),
                Point::new(*x, y + h),
            ]
            .into_iter()
            .enumerate()
            .map(|(i, p)| handle(i, p, HandleRole::Corner))
            .collect(),
            Geometry::Circle { cx, cy, r } => vec![
                handle(0, Point::new(*cx, *cy), HandleRole::Center),
                handle(1, Point::new(cx + r, *cy), HandleRole::Radius),
            ],
            Geometry::Ellipse { cx, cy, rx, ry } => vec![
                handle(0, Point::new(*cx, *cy), HandleRole::Center),
                handle(1, Point::new(cx + rx, *cy), HandleRole::RadiusX),
                handle(2, Point::new(*cx, cy + ry), HandleRole::RadiusY),
            ],
            Geometry::Polygon { points } | Geometry::PolylineArrow { points, .. } => points
                .iter()
                .enumerate()
                .map(|(i, p)| handle(i, *p, HandleRole::Vertex))
                .collect(),
            Geometry::Point { x, y } | Geometry::Text { x, y, .. } => {
                vec![handle(0, Point::new(*x, *y), HandleRole::Anchor)]
            }
        }
    }

    /// Geometry that results from dragging handle `index` to `to`.
    ///
    /// The shape itself is not modified; pass the result to [`Shape::update`]
    /// to commit it.
    pub fn drag_handle(&self, index: usize, to: Point) -> Result<Geometry, ShapeError> {
        let handles = self.edit_handles();
        let Some(handle) = handles.get(index) else {
            return Err(ShapeError::HandleOutOfRange {
                kind: self.kind,
                index,
                count: handles.len(),
            });
        };

        let dx = to.x - handle.position.x;
        let dy = to.y - handle.position.y;

        let geometry = match (&self.geometry, handle.role) {
            (Geometry::Rectangle { .. }, _) => {
                let opposite = handles[(index + 2) % 4].position;
                Geometry::rectangle_from_corners(opposite, to)
            }
            (Geometry::Circle { cx, cy, .. }, HandleRole::Radius) => Geometry::Circle {
                cx: *cx,
                cy: *cy,
                r: Point::new(*cx, *cy).distance_to(&to),
            },
            (Geometry::Ellipse { cx, cy, ry, .. }, HandleRole::RadiusX) => Geometry::Ellipse {
                cx: *cx,
                cy: *cy,
                rx: (to.x - cx).abs(),
                ry: *ry,
            },
            (Geometry::Ellipse { cx, cy, rx, .. }, HandleRole::RadiusY) => Geometry::Ellipse {
                cx: *cx,
                cy: *cy,
                rx: *rx,
                ry: (to.y - cy).abs(),
            },
            (Geometry::Polygon { points }, _) => {
                let mut points = points.clone();
                points[index] = to;
                Geometry::Polygon { points }
            }
            (Geometry::PolylineArrow { points, arrows }, _) => {
                let mut points = points.clone();
                points[index] = to;
                Geometry::PolylineArrow {
                    points,
                    arrows: arrows.clone(),
                }
            }
            // Centre and anchor handles move the whole shape
            (geometry, _) => geometry.moved_by(dx, dy),
        };
        Ok(geometry)
    }
}
