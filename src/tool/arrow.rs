//! Arrow tool: a clicked polyline with arrow heads on its end segments.

use crate::model::{ArrowHead, ArrowPosition, Geometry, Point};

use super::{
    DEFAULT_DOUBLE_CLICK_MS, Key, KeyEvent, PointerEvent, Tool, ToolContext, ToolOutcome,
    ToolSettings, dedup_points,
};

/// Minimum number of points for a polyline arrow.
pub const MIN_ARROW_POINTS: usize = 2;

#[derive(Debug, Clone)]
pub struct ArrowTool {
    double_click_ms: f64,
    double_headed: bool,
    points: Vec<Point>,
    cursor: Option<Point>,
    last_click_ms: Option<f64>,
}

impl ArrowTool {
    pub fn new() -> Self {
        Self {
            double_click_ms: DEFAULT_DOUBLE_CLICK_MS,
            double_headed: false,
            points: Vec::new(),
            cursor: None,
            last_click_ms: None,
        }
    }

    pub fn from_settings(settings: &ToolSettings) -> Self {
        Self {
            double_click_ms: settings.double_click_ms,
            ..Self::new()
        }
    }

    /// Also put an arrow head at the start of the first segment.
    pub fn double_headed(mut self, double_headed: bool) -> Self {
        self.double_headed = double_headed;
        self
    }

    fn reset(&mut self) {
        self.points.clear();
        self.cursor = None;
        self.last_click_ms = None;
    }

    fn arrows_for(&self, point_count: usize) -> Vec<ArrowHead> {
        let mut arrows = Vec::new();
        if point_count < MIN_ARROW_POINTS {
            return arrows;
        }
        if self.double_headed {
            arrows.push(ArrowHead {
                segment: 0,
                position: ArrowPosition::Start,
            });
        }
        arrows.push(ArrowHead {
            segment: point_count - 2,
            position: ArrowPosition::End,
        });
        arrows
    }

    fn finish(&mut self, ctx: &ToolContext) -> ToolOutcome {
        let points = dedup_points(&self.points);
        self.reset();
        if points.len() < MIN_ARROW_POINTS {
            return ToolOutcome::Cancelled;
        }
        let arrows = self.arrows_for(points.len());
        ctx.complete(Geometry::PolylineArrow { points, arrows })
    }
}

impl Default for ArrowTool {
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for ArrowTool {
    fn name(&self) -> &'static str {
        "arrow"
    }

    fn supports_keyboard(&self) -> bool {
        true
    }

    fn deactivate(&mut self) {
        self.reset();
    }

    fn handle_mouse_down(
        &mut self,
        _point: Point,
        _event: &PointerEvent,
        _ctx: &ToolContext,
    ) -> ToolOutcome {
        if self.points.is_empty() {
            ToolOutcome::Idle
        } else {
            ToolOutcome::Drawing
        }
    }

    fn handle_mouse_move(
        &mut self,
        point: Point,
        _event: &PointerEvent,
        ctx: &ToolContext,
    ) -> ToolOutcome {
        if self.points.is_empty() {
            return ToolOutcome::Idle;
        }
        self.cursor = Some(ctx.clamp(point));
        ToolOutcome::Drawing
    }

    fn handle_mouse_up(
        &mut self,
        point: Point,
        event: &PointerEvent,
        ctx: &ToolContext,
    ) -> ToolOutcome {
        let double_click = self
            .last_click_ms
            .is_some_and(|last| event.time_ms - last <= self.double_click_ms);
        if double_click {
            return self.finish(ctx);
        }

        let p = ctx.clamp(point);
        self.points.push(p);
        self.cursor = Some(p);
        self.last_click_ms = Some(event.time_ms);
        ToolOutcome::Drawing
    }

    fn handle_double_click(
        &mut self,
        _point: Point,
        _event: &PointerEvent,
        ctx: &ToolContext,
    ) -> ToolOutcome {
        if self.points.is_empty() {
            return ToolOutcome::Idle;
        }
        self.finish(ctx)
    }

    fn handle_key_down(&mut self, event: &KeyEvent, ctx: &ToolContext) -> ToolOutcome {
        if self.points.is_empty() {
            return ToolOutcome::Idle;
        }
        match event.key {
            Key::Enter => self.finish(ctx),
            Key::Escape => {
                self.reset();
                ToolOutcome::Cancelled
            }
            Key::Backspace | Key::Delete => {
                self.points.pop();
                if self.points.is_empty() {
                    self.reset();
                    ToolOutcome::Cancelled
                } else {
                    ToolOutcome::Drawing
                }
            }
            Key::Char(_) => ToolOutcome::Drawing,
        }
    }

    fn preview(&self) -> Option<Geometry> {
        if self.points.is_empty() {
            return None;
        }
        let mut points = self.points.clone();
        if let Some(cursor) = self.cursor.filter(|c| Some(c) != self.points.last()) {
            points.push(cursor);
        }
        let arrows = self.arrows_for(points.len());
        Some(Geometry::PolylineArrow { points, arrows })
    }
}
