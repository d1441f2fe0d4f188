//! Circle tool: the press and current points span the diameter.

use crate::model::{Geometry, Point};

use super::{DEFAULT_MIN_CIRCLE_RADIUS, PointerEvent, Tool, ToolContext, ToolOutcome, ToolSettings};

/// Draws circles whose centre is the midpoint of the drag and whose radius
/// is half the drag length.
#[derive(Debug, Clone)]
pub struct CircleTool {
    min_radius: f64,
    anchor: Option<Point>,
    current: Option<Point>,
}

impl CircleTool {
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

    fn circle(anchor: Point, current: Point) -> Geometry {
        let center = anchor.midpoint(&current);
        Geometry::Circle {
            cx: center.x,
            cy: center.y,
            r: anchor.distance_to(&current) / 2.0,
        }
    }
}

impl Default for CircleTool {
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for CircleTool {
    fn name(&self) -> &'static str {
        "circle"
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

        // Radius is checked after clamping, which can shrink it
        let geometry = Self::circle(anchor, ctx.clamp(point)).clamped(&ctx.image);
        match geometry {
            Geometry::Circle { r, .. } if r > self.min_radius => ctx.complete(geometry),
            _ => ToolOutcome::Cancelled,
        }
    }

    fn preview(&self) -> Option<Geometry> {
        Some(Self::circle(self.anchor?, self.current?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ImageBounds;
    use crate::tool::test_support::{completed_geometry, ctx};

    #[test]
    fn test_radius_is_half_the_drag() {
        let mut tool = CircleTool::new();
        let ev = PointerEvent::default();
        let ctx = ctx();

        tool.handle_mouse_down(Point::new(100.0, 100.0), &ev, &ctx);
        tool.handle_mouse_move(Point::new(130.0, 140.0), &ev, &ctx);
        assert_eq!(
            tool.preview(),
            Some(Geometry::Circle {
                cx: 115.0,
                cy: 120.0,
                r: 25.0
            })
        );

        let g = completed_geometry(tool.handle_mouse_up(Point::new(160.0, 180.0), &ev, &ctx));
        assert_eq!(
            g,
            Geometry::Circle {
                cx: 130.0,
                cy: 140.0,
                r: 50.0
            }
        );
    }

    #[test]
    fn test_tiny_circle_is_discarded() {
        let mut tool = CircleTool::new();
        let ev = PointerEvent::default();
        let ctx = ctx();

        tool.handle_mouse_down(Point::new(10.0, 10.0), &ev, &ctx);
        // Diameter 4 => radius 2, not above the threshold
        assert_eq!(
            tool.handle_mouse_up(Point::new(14.0, 10.0), &ev, &ctx),
            ToolOutcome::Cancelled
        );
    }

    #[test]
    fn test_circle_stays_inside_image() {
        let mut tool = CircleTool::new();
        let ev = PointerEvent::default();
        let ctx = ToolContext::new(ImageBounds::new(100.0, 100.0));

        // Diameter near the top edge would bulge outside the image
        tool.handle_mouse_down(Point::new(10.0, 20.0), &ev, &ctx);
        let g = completed_geometry(tool.handle_mouse_up(Point::new(90.0, 20.0), &ev, &ctx));
        assert_eq!(
            g,
            Geometry::Circle {
                cx: 50.0,
                cy: 20.0,
                r: 20.0
            }
        );
        assert!(ctx.image.contains_bounds(&g.bounds().unwrap()));
    }
}
