//! Rectangle tool: press, drag, release.

use crate::model::{Geometry, GeometryKind, Point};
use crate::shape::{Shape, ShapeFactory};

use super::{DEFAULT_MIN_BOX_SIZE, PointerEvent, Tool, ToolContext, ToolOutcome, ToolSettings};

/// Draws axis-aligned rectangles between the press and release points.
#[derive(Debug, Clone)]
pub struct RectangleTool {
    min_size: f64,
    anchor: Option<Point>,
    preview: Option<Shape>,
}

impl RectangleTool {
    pub fn new() -> Self {
        Self {
            min_size: DEFAULT_MIN_BOX_SIZE,
            anchor: None,
            preview: None,
        }
    }

    pub fn from_settings(settings: &ToolSettings) -> Self {
        Self {
            min_size: settings.min_box_size,
            ..Self::new()
        }
    }

    fn reset(&mut self) {
        self.anchor = None;
        self.preview = None;
    }
}

impl Default for RectangleTool {
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for RectangleTool {
    fn name(&self) -> &'static str {
        "rectangle"
    }

    fn deactivate(&mut self) {
        self.reset();
    }

    fn handle_mouse_down(
        &mut self,
        point: Point,
        _event: &PointerEvent,
        ctx: &ToolContext,
    ) -> ToolOutcome {
        let p = ctx.clamp(point);
        self.anchor = Some(p);
        self.preview = Some(ShapeFactory::seed(GeometryKind::Rectangle, p));
        ToolOutcome::Drawing
    }

    fn handle_mouse_move(
        &mut self,
        point: Point,
        _event: &PointerEvent,
        ctx: &ToolContext,
    ) -> ToolOutcome {
        let (Some(anchor), Some(preview)) = (self.anchor, self.preview.as_mut()) else {
            return ToolOutcome::Idle;
        };
        let geometry = Geometry::rectangle_from_corners(anchor, ctx.clamp(point));
        if let Err(e) = preview.update(geometry) {
            log::warn!("Rectangle preview update failed: {}", e);
        }
        ToolOutcome::Drawing
    }

    fn handle_mouse_up(
        &mut self,
        point: Point,
        _event: &PointerEvent,
        ctx: &ToolContext,
    ) -> ToolOutcome {
        let Some(anchor) = self.anchor else {
            return ToolOutcome::Idle;
        };
        self.reset();

        let geometry = Geometry::rectangle_from_corners(anchor, ctx.clamp(point));
        match geometry {
            Geometry::Rectangle { w, h, .. } if w > self.min_size && h > self.min_size => {
                ctx.complete(geometry)
            }
            _ => ToolOutcome::Cancelled,
        }
    }

    fn preview(&self) -> Option<Geometry> {
        self.preview.as_ref().map(|s| s.geometry().clone())
    }
}
