//! Tool registry and input routing.
//!
//! The manager owns every registered tool and at most one active tool.
//! Activating a tool always deactivates the previous one first, so two
//! tools are never active at once. Input is forwarded only when the manager
//! is enabled, a tool is active, and that tool supports the input device.

use std::collections::HashMap;

use crate::error::AnnotatorError;
use crate::event::{EventEmitter, ListenerId};
use crate::model::{Geometry, GeometryKind, ImageBounds, Point};
use crate::shape::Shape;

use super::{
    ArrowTool, CircleTool, EllipseTool, FreehandTool, KeyEvent, PointTool, PointerEvent,
    PolygonTool, RectangleTool, TextTool, Tool, ToolContext, ToolOutcome, ToolSettings,
};

/// Events emitted by the [`ToolManager`].
#[derive(Debug, Clone, PartialEq)]
pub enum ToolEvent {
    ToolRegistered { name: String },
    ToolUnregistered { name: String },
    ToolActivated { name: String },
    ToolDeactivated { name: String },
    DrawingStarted,
    DrawingStopped,
    /// A tool finished a shape.
    ShapeCompleted { tool: String, kind: GeometryKind },
    /// A recovered operational error.
    Error { message: String, operation: String },
}

/// Coarse state of the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolManagerState {
    Idle,
    ToolActive,
    Drawing,
}

/// Owns the drawing tools and routes input to the active one.
pub struct ToolManager {
    tools: HashMap<String, Box<dyn Tool>>,
    active: Option<String>,
    enabled: bool,
    drawing: bool,
    context: ToolContext,
    events: EventEmitter<ToolEvent>,
}

impl ToolManager {
    /// Create a manager with no tools registered.
    pub fn new(image: ImageBounds) -> Self {
        Self {
            tools: HashMap::new(),
            active: None,
            enabled: true,
            drawing: false,
            context: ToolContext::new(image),
            events: EventEmitter::new(),
        }
    }

    /// Create a manager with every built-in tool registered under its own name.
    pub fn with_builtin_tools(image: ImageBounds, settings: &ToolSettings) -> Self {
        let mut manager = Self::new(image);
        let tools: Vec<Box<dyn Tool>> = vec![
            Box::new(RectangleTool::from_settings(settings)),
            Box::new(PolygonTool::from_settings(settings)),
            Box::new(CircleTool::from_settings(settings)),
            Box::new(EllipseTool::from_settings(settings)),
            Box::new(FreehandTool::from_settings(settings)),
            Box::new(PointTool::new()),
            Box::new(TextTool::new()),
            Box::new(ArrowTool::from_settings(settings)),
        ];
        for tool in tools {
            let name = tool.name();
            if let Err(e) = manager.register_tool(name, tool) {
                log::warn!("Built-in tool registration failed: {}", e);
            }
        }
        manager
    }

    pub fn on<F>(&mut self, handler: F) -> ListenerId
    where
        F: FnMut(&ToolEvent) + 'static,
    {
        self.events.on(handler)
    }

    pub fn off(&mut self, id: ListenerId) -> bool {
        self.events.off(id)
    }

    pub(crate) fn clear_listeners(&mut self) {
        self.events.clear();
    }

    fn report(&mut self, error: &AnnotatorError) {
        log::warn!("Tool manager: {}", error);
        self.events.emit(&ToolEvent::Error {
            message: error.to_string(),
            operation: error.operation().to_string(),
        });
    }

    /// Register a tool under `name`.
    pub fn register_tool(
        &mut self,
        name: impl Into<String>,
        tool: Box<dyn Tool>,
    ) -> Result<(), AnnotatorError> {
        let name = name.into();
        if self.tools.contains_key(&name) {
            let err = AnnotatorError::DuplicateTool(name);
            self.report(&err);
            return Err(err);
        }
        log::debug!("Registered tool '{}'", name);
        self.tools.insert(name.clone(), tool);
        self.events.emit(&ToolEvent::ToolRegistered { name });
        Ok(())
    }

    /// Remove a tool, deactivating it first if it is active.
    /// Returns false if no such tool was registered.
    pub fn unregister_tool(&mut self, name: &str) -> bool {
        if self.active.as_deref() == Some(name) {
            self.deactivate_active_tool();
        }
        if self.tools.remove(name).is_none() {
            return false;
        }
        self.events.emit(&ToolEvent::ToolUnregistered {
            name: name.to_string(),
        });
        true
    }

    /// Registered tool names, sorted.
    pub fn tool_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Make `name` the active tool, deactivating the current one first.
    pub fn activate_tool(&mut self, name: &str) -> Result<(), AnnotatorError> {
        if !self.tools.contains_key(name) {
            let err = AnnotatorError::UnknownTool(name.to_string());
            self.report(&err);
            return Err(err);
        }
        if self.active.as_deref() == Some(name) {
            return Ok(());
        }

        self.deactivate_active_tool();
        if let Some(tool) = self.tools.get_mut(name) {
            tool.activate();
        }
        self.active = Some(name.to_string());
        log::info!("Activated tool '{}'", name);
        self.events.emit(&ToolEvent::ToolActivated {
            name: name.to_string(),
        });
        Ok(())
    }

    /// Deactivate the active tool, dropping any in-progress shape.
    pub fn deactivate_active_tool(&mut self) {
        let Some(name) = self.active.take() else {
            return;
        };
        if let Some(tool) = self.tools.get_mut(&name) {
            tool.deactivate();
        }
        self.stop_drawing();
        log::debug!("Deactivated tool '{}'", name);
        self.events.emit(&ToolEvent::ToolDeactivated { name });
    }

    pub fn active_tool(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Enable or disable input routing. Disabling drops any in-progress shape.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        self.enabled = enabled;
        if !enabled {
            if let Some(tool) = self.active.as_ref().and_then(|n| self.tools.get_mut(n)) {
                tool.deactivate();
                tool.activate();
            }
            self.stop_drawing();
        }
        log::debug!("Tool manager enabled = {}", enabled);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn start_drawing(&mut self) {
        if !self.drawing {
            self.drawing = true;
            self.events.emit(&ToolEvent::DrawingStarted);
        }
    }

    pub fn stop_drawing(&mut self) {
        if self.drawing {
            self.drawing = false;
            self.events.emit(&ToolEvent::DrawingStopped);
        }
    }

    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    pub fn state(&self) -> ToolManagerState {
        match (&self.active, self.drawing) {
            (None, _) => ToolManagerState::Idle,
            (Some(_), false) => ToolManagerState::ToolActive,
            (Some(_), true) => ToolManagerState::Drawing,
        }
    }

    pub fn image_bounds(&self) -> ImageBounds {
        self.context.image
    }

    pub fn set_image_bounds(&mut self, image: ImageBounds) {
        self.context = ToolContext::new(image);
    }

    /// Geometry of the active tool's in-progress shape.
    pub fn preview(&self) -> Option<Geometry> {
        let name = self.active.as_ref()?;
        self.tools.get(name)?.preview()
    }

    pub fn handle_mouse_down(&mut self, point: Point, event: &PointerEvent) -> Option<Shape> {
        self.dispatch(false, |tool, ctx| tool.handle_mouse_down(point, event, ctx))
    }

    pub fn handle_mouse_move(&mut self, point: Point, event: &PointerEvent) -> Option<Shape> {
        self.dispatch(false, |tool, ctx| tool.handle_mouse_move(point, event, ctx))
    }

    pub fn handle_mouse_up(&mut self, point: Point, event: &PointerEvent) -> Option<Shape> {
        self.dispatch(false, |tool, ctx| tool.handle_mouse_up(point, event, ctx))
    }

    pub fn handle_double_click(&mut self, point: Point, event: &PointerEvent) -> Option<Shape> {
        self.dispatch(false, |tool, ctx| {
            tool.handle_double_click(point, event, ctx)
        })
    }

    pub fn handle_key_down(&mut self, event: &KeyEvent) -> Option<Shape> {
        self.dispatch(true, |tool, ctx| tool.handle_key_down(event, ctx))
    }

    pub fn handle_key_up(&mut self, event: &KeyEvent) -> Option<Shape> {
        self.dispatch(true, |tool, ctx| tool.handle_key_up(event, ctx))
    }

    fn dispatch<F>(&mut self, keyboard: bool, f: F) -> Option<Shape>
    where
        F: FnOnce(&mut dyn Tool, &ToolContext) -> ToolOutcome,
    {
        if !self.enabled {
            return None;
        }
        let name = self.active.clone()?;
        let ctx = self.context;
        let tool = self.tools.get_mut(&name)?;
        let supported = if keyboard {
            tool.supports_keyboard()
        } else {
            tool.supports_mouse()
        };
        if !supported {
            return None;
        }

        match f(tool.as_mut(), &ctx) {
            ToolOutcome::Idle => None,
            ToolOutcome::Drawing => {
                self.start_drawing();
                None
            }
            ToolOutcome::Cancelled => {
                self.stop_drawing();
                None
            }
            ToolOutcome::Completed(shape) => {
                self.stop_drawing();
                log::debug!("Tool '{}' completed a {}", name, shape.kind());
                self.events.emit(&ToolEvent::ShapeCompleted {
                    tool: name,
                    kind: shape.kind(),
                });
                Some(shape)
            }
        }
    }
}

impl std::fmt::Debug for ToolManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolManager")
            .field("tools", &self.tool_names())
            .field("active", &self.active)
            .field("enabled", &self.enabled)
            .field("drawing", &self.drawing)
            .finish()
    }
}
