//! Ellipse tool: the drag spans the ellipse's bounding box.

use crate::model::{Bounds, Geometry, Point};

use super::{DEFAULT_MIN_CIRCLE_RADIUS, PointerEvent, Tool, ToolContext, ToolOutcome, ToolSettings};

#[derive(Debug, Clone)]
pub struct EllipseTool {
    min_radius: f64,
    anchor: Option<Point>,
    current: Option<Point>,
}

impl EllipseTool {
    pub fn new() -> Self {
        Self {
            min_radius: DEFAULT_MIN_CIRCLE_RADIUS,
            anchor: None,
            current: None,
        }
    }

    pub fn from_settings(settings: &ToolSettings) -> Self {
        Self {
            min_radius: settings.min_circle_radius,
            ..Self::new()
        }
    }

    fn ellipse(anchor: Point, current: Point) -> Geometry {
        let b = Bounds::from_corners(anchor, current);
        Geometry::Ellipse {
            cx: b.x + b.width / 2.0,
            cy: b.y + b.height / 2.0,
            rx: b.width / 2.0,
            ry: b.height / 2.0,
        }
    }
}

impl Default for EllipseTool {
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for EllipseTool {
    fn name(&self) -> &'static str {
        "ellipse"
    }

    fn deactivate(&mut self) {
        self.anchor = None;
        self.current = None;
    }

    fn handle_mouse_down(
        &mut self,
        point: Point,
        _event: &PointerEvent,
        ctx: &ToolContext,
    ) -> ToolOutcome {
        let p = ctx.clamp(point);
        self.anchor = Some(p);
        self.current = Some(p);
        ToolOutcome::Drawing
    }

    fn handle_mouse_move(
        &mut self,
        point: Point,
        _event: &PointerEvent,
        ctx: &ToolContext,
    ) -> ToolOutcome {
        if self.anchor.is_none() {
            return ToolOutcome::Idle;
        }
        self.current = Some(ctx.clamp(point));
        ToolOutcome::Drawing
    }

    fn handle_mouse_up(
        &mut self,
        point: Point,
        _event: &PointerEvent,
        ctx: &ToolContext,
    ) -> ToolOutcome {
        let Some(anchor) = self.anchor.take() else {
            return ToolOutcome::Idle;
        };
        self.current = None;

        let geometry = Self::ellipse(anchor, ctx.clamp(point));
        match geometry {
            Geometry::Ellipse { rx, ry, .. } if rx > self.min_radius && ry > self.min_radius => {
                ctx.complete(geometry)
            }
            _ => ToolOutcome::Cancelled,
        }
    }

    fn preview(&self) -> Option<Geometry> {
        Some(Self::ellipse(self.anchor?, self.current?))
    }
}
