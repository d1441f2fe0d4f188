//! Point tool: completes on mouse-down, no drag phase.

use crate::model::{Geometry, Point};

use super::{PointerEvent, Tool, ToolContext, ToolOutcome};

#[derive(Debug, Clone, Default)]
pub struct PointTool;

impl PointTool {
    pub fn new() -> Self {
        Self
    }
}

impl Tool for PointTool {
    fn name(&self) -> &'static str {
        "point"
    }

    fn deactivate(&mut self) {}

    fn handle_mouse_down(
        &mut self,
        point: Point,
        _event: &PointerEvent,
        ctx: &ToolContext,
    ) -> ToolOutcome {
        let p = ctx.clamp(point);
        ctx.complete(Geometry::Point { x: p.x, y: p.y })
    }

    fn handle_mouse_move(
        &mut self,
        _point: Point,
        _event: &PointerEvent,
        _ctx: &ToolContext,
    ) -> ToolOutcome {
        ToolOutcome::Idle
    }

    fn handle_mouse_up(
        &mut self,
        _point: Point,
        _event: &PointerEvent,
        _ctx: &ToolContext,
    ) -> ToolOutcome {
        ToolOutcome::Idle
    }

    fn preview(&self) -> Option<Geometry> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::test_support::{completed_geometry, ctx};

    #[test]
    fn test_completes_on_mouse_down() {
        let mut tool = PointTool::new();
        let ev = PointerEvent::default();
        let g = completed_geometry(tool.handle_mouse_down(Point::new(12.0, -3.0), &ev, &ctx()));
        assert_eq!(g, Geometry::Point { x: 12.0, y: 0.0 });
        assert_eq!(
            tool.handle_mouse_up(Point::new(12.0, 3.0), &ev, &ctx()),
            ToolOutcome::Idle
        );
    }
}
