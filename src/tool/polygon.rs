//! Polygon tool: one vertex per click.
//!
//! The polygon closes on a double click (two mouse-ups within the
//! double-click window), on `Enter`, or when clicking near the first vertex
//! once at least three vertices exist. Clicking near the first vertex only
//! snaps when that vertex is strictly the nearest one to the click, so a
//! vertex placed next to the start is still added normally.

use crate::model::{Geometry, Point};

use super::{
    DEFAULT_DOUBLE_CLICK_MS, DEFAULT_SNAP_DISTANCE, Key, KeyEvent, MIN_POLYGON_VERTICES,
    PointerEvent, Tool, ToolContext, ToolOutcome, ToolSettings, dedup_points,
};

#[derive(Debug, Clone)]
pub struct PolygonTool {
    snap_distance: f64,
    double_click_ms: f64,
    vertices: Vec<Point>,
    cursor: Option<Point>,
    last_click_ms: Option<f64>,
}

impl PolygonTool {
    pub fn new() -> Self {
        Self {
            snap_distance: DEFAULT_SNAP_DISTANCE,
            double_click_ms: DEFAULT_DOUBLE_CLICK_MS,
            vertices: Vec::new(),
            cursor: None,
            last_click_ms: None,
        }
    }

    pub fn from_settings(settings: &ToolSettings) -> Self {
        Self {
            snap_distance: settings.snap_distance,
            double_click_ms: settings.double_click_ms,
            ..Self::new()
        }
    }

    /// Vertices placed so far.
    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    fn reset(&mut self) {
        self.vertices.clear();
        self.cursor = None;
        self.last_click_ms = None;
    }

    fn snaps_to_first(&self, p: &Point) -> bool {
        if self.vertices.len() < MIN_POLYGON_VERTICES {
            return false;
        }
        let to_first = self.vertices[0].distance_to(p);
        to_first <= self.snap_distance
            && self.vertices[1..]
                .iter()
                .all(|v| v.distance_to(p) > to_first)
    }

    fn finish(&mut self, ctx: &ToolContext) -> ToolOutcome {
        let points = dedup_points(&self.vertices);
        self.reset();
        if points.len() < MIN_POLYGON_VERTICES {
            log::trace!("Polygon with {} unique vertices discarded", points.len());
            return ToolOutcome::Cancelled;
        }
        ctx.complete(Geometry::Polygon { points })
    }
}

impl Default for PolygonTool {
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for PolygonTool {
    fn name(&self) -> &'static str {
        "polygon"
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
        if self.vertices.is_empty() {
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
        if self.vertices.is_empty() {
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
        let p = ctx.clamp(point);

        let double_click = self
            .last_click_ms
            .is_some_and(|last| event.time_ms - last <= self.double_click_ms);
        if double_click || self.snaps_to_first(&p) {
            return self.finish(ctx);
        }

        self.vertices.push(p);
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
        if self.vertices.is_empty() {
            return ToolOutcome::Idle;
        }
        self.finish(ctx)
    }

    fn handle_key_down(&mut self, event: &KeyEvent, ctx: &ToolContext) -> ToolOutcome {
        if self.vertices.is_empty() {
            return ToolOutcome::Idle;
        }
        match event.key {
            Key::Enter => self.finish(ctx),
            Key::Escape => {
                self.reset();
                ToolOutcome::Cancelled
            }
            Key::Backspace | Key::Delete => {
                self.vertices.pop();
                if self.vertices.is_empty() {
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
        if self.vertices.is_empty() {
            return None;
        }
        let mut points = self.vertices.clone();
        if let Some(cursor) = self.cursor.filter(|c| Some(c) != self.vertices.last()) {
            points.push(cursor);
        }
        Some(Geometry::Polygon { points })
    }
}
