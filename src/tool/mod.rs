//! Drawing tools and the manager that routes input to them.
//!
//! Each tool consumes pointer/keyboard input in image coordinates, builds
//! geometry incrementally, and hands back a finished [`Shape`] through
//! [`ToolOutcome::Completed`]. Tools never touch annotation state; the
//! caller commits the shape.

mod arrow;
mod circle;
mod ellipse;
mod freehand;
mod manager;
mod point;
mod polygon;
mod rectangle;
mod text;

pub use arrow::ArrowTool;
pub use circle::CircleTool;
pub use ellipse::EllipseTool;
pub use freehand::FreehandTool;
pub use manager::{ToolEvent, ToolManager, ToolManagerState};
pub use point::PointTool;
pub use polygon::PolygonTool;
pub use rectangle::RectangleTool;
pub use text::TextTool;

use crate::model::{Geometry, ImageBounds, Point};
use crate::shape::Shape;

/// Snap radius for closing a polygon on its first vertex (image pixels).
pub const DEFAULT_SNAP_DISTANCE: f64 = 20.0;

/// Two mouse-ups within this window count as a double click.
pub const DEFAULT_DOUBLE_CLICK_MS: f64 = 300.0;

/// Freehand strokes only record points further than this from the last one.
pub const DEFAULT_FREEHAND_MIN_DISTANCE: f64 = 2.0;

/// Circles at or below this radius are discarded.
pub const DEFAULT_MIN_CIRCLE_RADIUS: f64 = 2.0;

/// Rectangles at or below this width/height are discarded.
pub const DEFAULT_MIN_BOX_SIZE: f64 = 1.0;

/// Minimum number of vertices required for a valid polygon.
pub const MIN_POLYGON_VERTICES: usize = 3;

/// Points closer than this are treated as the same vertex.
pub const COINCIDENT_DISTANCE: f64 = 0.5;

/// Tunable thresholds shared by the built-in tools.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSettings {
    pub snap_distance: f64,
    pub double_click_ms: f64,
    pub freehand_min_distance: f64,
    pub min_circle_radius: f64,
    pub min_box_size: f64,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            snap_distance: DEFAULT_SNAP_DISTANCE,
            double_click_ms: DEFAULT_DOUBLE_CLICK_MS,
            freehand_min_distance: DEFAULT_FREEHAND_MIN_DISTANCE,
            min_circle_radius: DEFAULT_MIN_CIRCLE_RADIUS,
            min_box_size: DEFAULT_MIN_BOX_SIZE,
        }
    }
}

/// Everything a tool needs to know about its surroundings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolContext {
    pub image: ImageBounds,
}

impl ToolContext {
    pub fn new(image: ImageBounds) -> Self {
        Self { image }
    }

    /// Clamp a point into the image.
    pub fn clamp(&self, point: Point) -> Point {
        self.image.clamp(point)
    }

    /// Wrap finished geometry into a clamped shape.
    pub fn complete(&self, geometry: Geometry) -> ToolOutcome {
        ToolOutcome::Completed(Shape::new(geometry.clamped(&self.image)))
    }
}

/// Mouse button of a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseButton {
    #[default]
    Left,
    Middle,
    Right,
}

/// Modifier keys held during an input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

/// Pointer event metadata (the position is passed separately, in image space).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerEvent {
    /// Event timestamp in milliseconds.
    pub time_ms: f64,
    pub button: MouseButton,
    pub modifiers: Modifiers,
}

impl PointerEvent {
    pub fn at(time_ms: f64) -> Self {
        Self {
            time_ms,
            ..Default::default()
        }
    }
}

/// Keys tools react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Escape,
    Backspace,
    Delete,
    Char(char),
}

/// A keyboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::default(),
        }
    }
}

/// Result of feeding one input event to a tool.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    /// Event ignored, nothing in progress.
    Idle,
    /// A shape is in progress.
    Drawing,
    /// A shape was finished; transient state has been discarded.
    Completed(Shape),
    /// The in-progress shape was discarded.
    Cancelled,
}

/// A drawing mode.
pub trait Tool {
    /// Name the tool is registered under.
    fn name(&self) -> &'static str;

    fn supports_mouse(&self) -> bool {
        true
    }

    fn supports_keyboard(&self) -> bool {
        false
    }

    fn activate(&mut self) {}

    /// Drop every transient preview and buffered point.
    fn deactivate(&mut self);

    fn handle_mouse_down(
        &mut self,
        point: Point,
        event: &PointerEvent,
        ctx: &ToolContext,
    ) -> ToolOutcome;

    fn handle_mouse_move(
        &mut self,
        point: Point,
        event: &PointerEvent,
        ctx: &ToolContext,
    ) -> ToolOutcome;

    fn handle_mouse_up(
        &mut self,
        point: Point,
        event: &PointerEvent,
        ctx: &ToolContext,
    ) -> ToolOutcome;

    fn handle_double_click(
        &mut self,
        _point: Point,
        _event: &PointerEvent,
        _ctx: &ToolContext,
    ) -> ToolOutcome {
        ToolOutcome::Idle
    }

    fn handle_key_down(&mut self, _event: &KeyEvent, _ctx: &ToolContext) -> ToolOutcome {
        ToolOutcome::Idle
    }

    fn handle_key_up(&mut self, _event: &KeyEvent, _ctx: &ToolContext) -> ToolOutcome {
        ToolOutcome::Idle
    }

    /// Geometry of the in-progress shape, for preview rendering.
    fn preview(&self) -> Option<Geometry>;
}

/// Drop points coincident with an earlier point, keeping first occurrences.
pub(crate) fn dedup_points(points: &[Point]) -> Vec<Point> {
    let mut unique: Vec<Point> = Vec::with_capacity(points.len());
    for p in points {
        if !unique.iter().any(|u| u.distance_to(p) < COINCIDENT_DISTANCE) {
            unique.push(*p);
        }
    }
    unique
}
