//! Freehand tool: records a stroke while dragging and closes it into a polygon.

use crate::model::{Geometry, Point};

use super::{
    DEFAULT_FREEHAND_MIN_DISTANCE, MIN_POLYGON_VERTICES, PointerEvent, Tool, ToolContext,
    ToolOutcome, ToolSettings,
};

#[derive(Debug, Clone)]
pub struct FreehandTool {
    min_distance: f64,
    points: Vec<Point>,
    drawing: bool,
}

impl FreehandTool {
    pub fn new() -> Self {
        Self {
            min_distance: DEFAULT_FREEHAND_MIN_DISTANCE,
            points: Vec::new(),
            drawing: false,
        }
    }

    pub fn from_settings(settings: &ToolSettings) -> Self {
        Self {
            min_distance: settings.freehand_min_distance,
            ..Self::new()
        }
    }

    /// Append a point if it is far enough from the last recorded one.
    fn record(&mut self, p: Point) {
        match self.points.last() {
            Some(last) if last.distance_to(&p) <= self.min_distance => {}
            _ => self.points.push(p),
        }
    }
}

impl Default for FreehandTool {
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for FreehandTool {
    fn name(&self) -> &'static str {
        "freehand"
    }

    fn deactivate(&mut self) {
        self.points.clear();
        self.drawing = false;
    }

    fn handle_mouse_down(
        &mut self,
        point: Point,
        _event: &PointerEvent,
        ctx: &ToolContext,
    ) -> ToolOutcome {
        self.points.clear();
        self.points.push(ctx.clamp(point));
        self.drawing = true;
        ToolOutcome::Drawing
    }

    fn handle_mouse_move(
        &mut self,
        point: Point,
        _event: &PointerEvent,
        ctx: &ToolContext,
    ) -> ToolOutcome {
        if !self.drawing {
            return ToolOutcome::Idle;
        }
        self.record(ctx.clamp(point));
        ToolOutcome::Drawing
    }

    fn handle_mouse_up(
        &mut self,
        point: Point,
        _event: &PointerEvent,
        ctx: &ToolContext,
    ) -> ToolOutcome {
        if !self.drawing {
            return ToolOutcome::Idle;
        }
        self.record(ctx.clamp(point));
        self.drawing = false;

        let points = std::mem::take(&mut self.points);
        if points.len() < MIN_POLYGON_VERTICES {
            log::trace!("Freehand stroke too short ({} points), discarded", points.len());
            return ToolOutcome::Cancelled;
        }
        ctx.complete(Geometry::Polygon { points })
    }

    fn preview(&self) -> Option<Geometry> {
        if !self.drawing {
            return None;
        }
        Some(Geometry::Polygon {
            points: self.points.clone(),
        })
    }
}
