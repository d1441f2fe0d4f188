//! Text tool: click to place, type, `Enter` to commit.
//!
//! Clicking again while text is being typed commits the pending text.

use crate::model::{Geometry, Point};

use super::{Key, KeyEvent, PointerEvent, Tool, ToolContext, ToolOutcome};

#[derive(Debug, Clone, Default)]
pub struct TextTool {
    anchor: Option<Point>,
    buffer: String,
}

impl TextTool {
    pub fn new() -> Self {
        Self::default()
    }

    fn reset(&mut self) {
        self.anchor = None;
        self.buffer.clear();
    }

    fn commit(&mut self, ctx: &ToolContext) -> ToolOutcome {
        let Some(anchor) = self.anchor else {
            return ToolOutcome::Idle;
        };
        let text = self.buffer.trim().to_string();
        self.reset();
        if text.is_empty() {
            return ToolOutcome::Cancelled;
        }
        ctx.complete(Geometry::Text {
            x: anchor.x,
            y: anchor.y,
            text,
            style: None,
        })
    }
}

impl Tool for TextTool {
    fn name(&self) -> &'static str {
        "text"
    }

    fn supports_keyboard(&self) -> bool {
        true
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
        if self.anchor.is_some() && !self.buffer.trim().is_empty() {
            return self.commit(ctx);
        }
        self.anchor = Some(ctx.clamp(point));
        self.buffer.clear();
        ToolOutcome::Drawing
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
        if self.anchor.is_some() {
            ToolOutcome::Drawing
        } else {
            ToolOutcome::Idle
        }
    }

    fn handle_key_down(&mut self, event: &KeyEvent, ctx: &ToolContext) -> ToolOutcome {
        if self.anchor.is_none() {
            return ToolOutcome::Idle;
        }
        match event.key {
            Key::Char(c) => {
                self.buffer.push(c);
                ToolOutcome::Drawing
            }
            Key::Backspace => {
                self.buffer.pop();
                ToolOutcome::Drawing
            }
            Key::Enter => self.commit(ctx),
            Key::Escape => {
                self.reset();
                ToolOutcome::Cancelled
            }
            Key::Delete => ToolOutcome::Drawing,
        }
    }

    fn preview(&self) -> Option<Geometry> {
        let anchor = self.anchor?;
        Some(Geometry::Text {
            x: anchor.x,
            y: anchor.y,
            text: self.buffer.clone(),
            style: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::test_support::{completed_geometry, ctx};

    fn type_str(tool: &mut TextTool, s: &str) {
        for c in s.chars() {
            tool.handle_key_down(&KeyEvent::new(Key::Char(c)), &ctx());
        }
    }

    #[test]
    fn test_type_and_commit() {
        let mut tool = TextTool::new();
        let ev = PointerEvent::default();
        tool.handle_mouse_down(Point::new(20.0, 30.0), &ev, &ctx());
        type_str(&mut tool, "nuclei!");
        tool.handle_key_down(&KeyEvent::new(Key::Backspace), &ctx());

        let g = completed_geometry(tool.handle_key_down(&KeyEvent::new(Key::Enter), &ctx()));
        assert_eq!(
            g,
            Geometry::Text {
                x: 20.0,
                y: 30.0,
                text: "nuclei".to_string(),
                style: None
            }
        );
        assert!(tool.preview().is_none());
    }

    #[test]
    fn test_empty_text_is_discarded() {
        let mut tool = TextTool::new();
        tool.handle_mouse_down(Point::new(20.0, 30.0), &PointerEvent::default(), &ctx());
        type_str(&mut tool, "   ");
        assert_eq!(
            tool.handle_key_down(&KeyEvent::new(Key::Enter), &ctx()),
            ToolOutcome::Cancelled
        );
    }

    #[test]
    fn test_second_click_commits_pending_text() {
        let mut tool = TextTool::new();
        let ev = PointerEvent::default();
        tool.handle_mouse_down(Point::new(5.0, 5.0), &ev, &ctx());
        type_str(&mut tool, "a");
        let g = completed_geometry(tool.handle_mouse_down(Point::new(50.0, 50.0), &ev, &ctx()));
        assert!(matches!(g, Geometry::Text { x, .. } if x == 5.0));
    }

    #[test]
    fn test_text_near_edge_moves_inside_image() {
        let mut tool = TextTool::new();
        tool.handle_mouse_down(Point::new(995.0, 795.0), &PointerEvent::default(), &ctx());
        type_str(&mut tool, "edge");

        let g = completed_geometry(tool.handle_key_down(&KeyEvent::new(Key::Enter), &ctx()));
        let bounds = g.bounds().unwrap();
        assert!(bounds.x + bounds.width <= 1000.0 + 1e-9);
        assert!(bounds.y + bounds.height <= 800.0 + 1e-9);
    }
}
