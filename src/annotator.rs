//! Top-level annotator facade.
//!
//! [`Annotator`] owns the annotation state and every manager. Viewer input
//! arrives as [`ViewerEvent`]s in viewport coordinates, gets converted to
//! image space by the [`ViewerAdapter`], and is routed to the tool manager.
//! A completed shape is committed into the state.
//!
//! Every state mutation is observed through the state's change stream and
//! fanned out to filters, groups, labels, styles and persistence. Events of
//! the sub-managers are forwarded into a single [`AnnotatorEvent`] stream,
//! delivered to listeners once the public call that caused them finishes.

use std::cell::RefCell;
use std::rc::Rc;

use web_time::Instant;

use crate::config::AnnotatorConfig;
use crate::error::AnnotatorError;
use crate::event::{EventEmitter, ListenerId};
use crate::manager::{
    Filter, FilterEvent, FilterManager, GroupEvent, GroupId, GroupManager, LabelManager,
    StyleManager,
};
use crate::model::{
    Annotation, AnnotationId, Color, Creator, Geometry, ImageBounds, Point, Style, StyleOption,
    Theme, ThemeChoice,
};
use crate::persistence::{PersistenceEvent, PersistenceManager, StorageAdapter};
use crate::render::{SvgElement, SvgRenderer};
use crate::shape::{EditHandle, Shape, ShapeFactory};
use crate::state::{AnnotationState, StateChange};
use crate::tool::{Key, KeyEvent, PointerEvent, Tool, ToolEvent, ToolManager};

/// Hit-test tolerance for selecting annotations, in image pixels.
pub const HIT_TOLERANCE: f64 = 5.0;

/// The deep-zoom viewer, as seen by the annotator.
pub trait ViewerAdapter {
    /// Convert a viewport (screen) point into image pixel coordinates.
    fn viewport_to_image(&self, point: Point) -> Point;

    /// Natural size of the displayed image.
    fn image_size(&self) -> ImageBounds;
}

/// Input forwarded from the viewer. Positions are in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewerEvent {
    CanvasPress { position: Point, event: PointerEvent },
    CanvasDrag { position: Point, event: PointerEvent },
    CanvasRelease { position: Point, event: PointerEvent },
    CanvasDoubleClick { position: Point, event: PointerEvent },
    KeyDown(KeyEvent),
    KeyUp(KeyEvent),
    /// Pan or zoom changed.
    UpdateViewport,
    /// The viewer was resized or opened another image.
    Resize,
}

/// Everything the annotator reports to its listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotatorEvent {
    Create(Annotation),
    Update {
        previous: Annotation,
        current: Annotation,
    },
    Delete(Annotation),
    Select(Option<AnnotationId>),
    Tool(ToolEvent),
    Filter(FilterEvent),
    Group(GroupEvent),
    Persistence(PersistenceEvent),
    /// A recovered operational error.
    Error { message: String, operation: String },
}

type EventQueue = Rc<RefCell<Vec<AnnotatorEvent>>>;

/// Build a listener that wraps a sub-manager event and queues it.
fn forward<E: Clone + 'static>(
    queue: &EventQueue,
    wrap: fn(E) -> AnnotatorEvent,
) -> impl FnMut(&E) + 'static {
    let queue = Rc::clone(queue);
    move |event: &E| queue.borrow_mut().push(wrap(event.clone()))
}

pub struct Annotator<V: ViewerAdapter> {
    viewer: V,
    config: AnnotatorConfig,
    state: AnnotationState,
    /// Changes emitted by `state`, waiting to be fanned out.
    changes: Rc<RefCell<Vec<StateChange>>>,
    tools: ToolManager,
    styles: StyleManager,
    filters: FilterManager,
    groups: GroupManager,
    labels: LabelManager,
    persistence: Option<PersistenceManager>,
    renderer: SvgRenderer,
    selected: Option<AnnotationId>,
    user: Option<Creator>,
    queue: EventQueue,
    events: EventEmitter<AnnotatorEvent>,
}

impl<V: ViewerAdapter> Annotator<V> {
    /// Create an annotator over a viewer, with every built-in tool registered.
    pub fn new(viewer: V, config: AnnotatorConfig) -> Self {
        let queue: EventQueue = Rc::new(RefCell::new(Vec::new()));

        let mut state = AnnotationState::new();
        let changes = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&changes);
        state.on(move |change: &StateChange| sink.borrow_mut().push(change.clone()));

        let mut tools =
            ToolManager::with_builtin_tools(viewer.image_size(), &config.tool_settings());
        tools.on(forward(&queue, AnnotatorEvent::Tool));

        let mut filters = FilterManager::new();
        filters.on(forward(&queue, AnnotatorEvent::Filter));

        let mut groups = GroupManager::new();
        groups.on(forward(&queue, AnnotatorEvent::Group));

        log::info!(
            "Annotator created ({}x{} image, theme {:?})",
            viewer.image_size().width,
            viewer.image_size().height,
            config.theme
        );

        Self {
            styles: StyleManager::new(Theme::from_choice(config.theme)),
            viewer,
            config,
            state,
            changes,
            tools,
            filters,
            groups,
            labels: LabelManager::new(),
            persistence: None,
            renderer: SvgRenderer::new(),
            selected: None,
            user: None,
            queue,
            events: EventEmitter::new(),
        }
    }

    pub fn on<F>(&mut self, handler: F) -> ListenerId
    where
        F: FnMut(&AnnotatorEvent) + 'static,
    {
        self.events.on(handler)
    }

    pub fn off(&mut self, id: ListenerId) -> bool {
        self.events.off(id)
    }

    pub fn viewer(&self) -> &V {
        &self.viewer
    }

    pub fn viewer_mut(&mut self) -> &mut V {
        &mut self.viewer
    }

    pub fn config(&self) -> &AnnotatorConfig {
        &self.config
    }

    pub fn state(&self) -> &AnnotationState {
        &self.state
    }

    /// Creator stamped on annotations drawn from now on.
    pub fn set_user(&mut self, user: Option<Creator>) {
        self.user = user;
    }

    pub fn user(&self) -> Option<&Creator> {
        self.user.as_ref()
    }

    // =========================================================================
    // Annotations
    // =========================================================================

    pub fn add_annotation(&mut self, annotation: Annotation) -> Result<(), AnnotatorError> {
        let result = self.state.add(annotation);
        self.finish(result, true)
    }

    /// Remove an annotation. Unknown ids are ignored.
    pub fn remove_annotation(&mut self, id: &str) -> Option<Annotation> {
        let removed = self.state.remove(id);
        self.process_changes(true);
        self.flush_events();
        removed
    }

    /// Replace an annotation, stamping `modified`. Returns the previous value.
    pub fn update_annotation(
        &mut self,
        mut annotation: Annotation,
    ) -> Result<Annotation, AnnotatorError> {
        annotation.touch();
        let result = self.state.update(annotation);
        self.finish(result, true)
    }

    pub fn get_annotations(&self) -> Vec<Annotation> {
        self.state.get_all()
    }

    pub fn get_annotation(&self, id: &str) -> Option<&Annotation> {
        self.state.get_annotation(id)
    }

    /// Replace every annotation.
    pub fn load_annotations(&mut self, annotations: Vec<Annotation>) {
        self.state.load(annotations);
        self.process_changes(true);
        self.flush_events();
    }

    pub fn clear_annotations(&mut self) {
        self.state.clear();
        self.process_changes(true);
        self.flush_events();
    }

    // =========================================================================
    // Tools
    // =========================================================================

    pub fn register_tool(
        &mut self,
        name: &str,
        tool: Box<dyn Tool>,
    ) -> Result<(), AnnotatorError> {
        let result = self.tools.register_tool(name, tool);
        self.flush_events();
        result
    }

    /// Activate a tool. Unknown names emit an error event and leave the
    /// active tool unchanged.
    pub fn activate_tool(&mut self, name: &str) -> Result<(), AnnotatorError> {
        let result = self.tools.activate_tool(name);
        self.flush_events();
        result
    }

    pub fn deactivate_tool(&mut self) {
        self.tools.deactivate_active_tool();
        self.flush_events();
    }

    pub fn active_tool(&self) -> Option<&str> {
        self.tools.active_tool()
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.tool_names()
    }

    pub fn set_drawing_enabled(&mut self, enabled: bool) {
        self.tools.set_enabled(enabled);
        self.flush_events();
    }

    pub fn is_drawing(&self) -> bool {
        self.tools.is_drawing()
    }

    /// Feed one viewer event. Returns the annotation it created, if any.
    pub fn handle_viewer_event(&mut self, event: ViewerEvent) -> Option<Annotation> {
        let created = match event {
            ViewerEvent::CanvasPress { position, event } => {
                let point = self.viewer.viewport_to_image(position);
                if self.tools.active_tool().is_none() {
                    self.select_at_point(point);
                    None
                } else {
                    let shape = self.tools.handle_mouse_down(point, &event);
                    self.commit_shape(shape)
                }
            }
            ViewerEvent::CanvasDrag { position, event } => {
                let point = self.viewer.viewport_to_image(position);
                let shape = self.tools.handle_mouse_move(point, &event);
                self.commit_shape(shape)
            }
            ViewerEvent::CanvasRelease { position, event } => {
                let point = self.viewer.viewport_to_image(position);
                let shape = self.tools.handle_mouse_up(point, &event);
                self.commit_shape(shape)
            }
            ViewerEvent::CanvasDoubleClick { position, event } => {
                let point = self.viewer.viewport_to_image(position);
                let shape = self.tools.handle_double_click(point, &event);
                self.commit_shape(shape)
            }
            ViewerEvent::KeyDown(key) => self.handle_key_down(&key),
            ViewerEvent::KeyUp(key) => {
                let shape = self.tools.handle_key_up(&key);
                self.commit_shape(shape)
            }
            ViewerEvent::UpdateViewport | ViewerEvent::Resize => {
                self.tools.set_image_bounds(self.viewer.image_size());
                None
            }
        };
        self.flush_events();
        created
    }

    fn handle_key_down(&mut self, key: &KeyEvent) -> Option<Annotation> {
        if !self.tools.is_drawing() {
            match key.key {
                Key::Delete | Key::Backspace if self.selected.is_some() => {
                    if let Some(id) = self.selected.clone() {
                        self.state.remove(&id);
                        self.process_changes(true);
                    }
                    return None;
                }
                Key::Escape if self.selected.is_some() => {
                    self.set_selection(None);
                    return None;
                }
                _ => {}
            }
        }
        let shape = self.tools.handle_key_down(key);
        self.commit_shape(shape)
    }

    fn commit_shape(&mut self, shape: Option<Shape>) -> Option<Annotation> {
        let mut annotation = Annotation::new(shape?.into_geometry());
        if let Some(user) = &self.user {
            annotation = annotation.with_creator(user.clone());
        }
        match self.state.add(annotation.clone()) {
            Ok(()) => {
                log::info!("Created annotation {}", annotation.id);
                self.process_changes(true);
                Some(annotation)
            }
            Err(e) => {
                self.report(&e);
                None
            }
        }
    }

    // =========================================================================
    // Selection and editing
    // =========================================================================

    /// Select the top-most visible annotation under an image point, or
    /// clear the selection when nothing is hit.
    pub fn select_at(&mut self, point: Point) -> Option<AnnotationId> {
        let hit = self.select_at_point(point);
        self.flush_events();
        hit
    }

    fn select_at_point(&mut self, point: Point) -> Option<AnnotationId> {
        let hit = self
            .state
            .iter()
            .rev()
            .filter(|a| self.filters.is_visible(&a.id))
            .find(|a| a.geometry().contains_point(&point, HIT_TOLERANCE))
            .map(|a| a.id.clone());
        self.set_selection(hit.clone());
        hit
    }

    /// Select an annotation by id, or clear with `None`. Unknown ids are ignored.
    pub fn select(&mut self, id: Option<&str>) {
        match id {
            Some(id) if !self.state.contains(id) => {}
            _ => self.set_selection(id.map(str::to_string)),
        }
        self.flush_events();
    }

    fn set_selection(&mut self, id: Option<AnnotationId>) {
        if self.selected == id {
            return;
        }
        self.selected = id.clone();
        self.queue.borrow_mut().push(AnnotatorEvent::Select(id));
    }

    pub fn selected(&self) -> Option<&Annotation> {
        self.selected
            .as_deref()
            .and_then(|id| self.state.get_annotation(id))
    }

    /// Translate an annotation, keeping it inside the image.
    pub fn move_annotation(&mut self, id: &str, dx: f64, dy: f64) -> Result<(), AnnotatorError> {
        let image = self.tools.image_bounds();
        let geometry = self.existing(id)?.geometry().clone();
        // Limit the offset so the whole shape stays inside instead of being squashed
        let (dx, dy) = match geometry.bounds() {
            Some(b) => (
                dx.max(-b.x).min(image.width - b.x - b.width),
                dy.max(-b.y).min(image.height - b.y - b.height),
            ),
            None => (dx, dy),
        };
        self.replace_geometry(id, geometry.moved_by(dx, dy).clamped(&image))
    }

    pub fn edit_handles(&self, id: &str) -> Vec<EditHandle> {
        self.state
            .get_annotation(id)
            .map(|a| ShapeFactory::from_annotation(a).edit_handles())
            .unwrap_or_default()
    }

    /// Drag one edit handle of an annotation to an image point.
    pub fn drag_handle(&mut self, id: &str, index: usize, to: Point) -> Result<(), AnnotatorError> {
        let image = self.tools.image_bounds();
        let shape = ShapeFactory::from_annotation(&self.existing(id)?);
        let geometry = match shape.drag_handle(index, image.clamp(to)) {
            Ok(geometry) => geometry.clamped(&image),
            Err(e) => {
                let e = AnnotatorError::from(e);
                self.report(&e);
                self.flush_events();
                return Err(e);
            }
        };
        self.replace_geometry(id, geometry)
    }

    /// Copy of an annotation, or a reported `AnnotationNotFound`.
    fn existing(&mut self, id: &str) -> Result<Annotation, AnnotatorError> {
        match self.state.get_annotation(id) {
            Some(annotation) => Ok(annotation.clone()),
            None => {
                let e = AnnotatorError::AnnotationNotFound(id.to_string());
                self.report(&e);
                self.flush_events();
                Err(e)
            }
        }
    }

    fn replace_geometry(&mut self, id: &str, geometry: Geometry) -> Result<(), AnnotatorError> {
        let updated = self.existing(id)?.with_geometry(geometry);
        self.update_annotation(updated).map(|_| ())
    }

    // =========================================================================
    // Styles
    // =========================================================================

    pub fn set_theme(&mut self, choice: ThemeChoice) {
        self.styles.set_theme(choice);
    }

    pub fn theme(&self) -> &Theme {
        self.styles.theme()
    }

    pub fn set_style_option(&mut self, id: &str, option: StyleOption) {
        if self.state.contains(id) {
            self.styles.set_option(id, option);
        }
    }

    pub fn clear_style(&mut self, id: &str) {
        self.styles.clear_overrides(id);
    }

    pub fn effective_style(&self, id: &str) -> Style {
        self.styles
            .effective_style(id, self.selected.as_deref() == Some(id))
    }

    // =========================================================================
    // Filters
    // =========================================================================

    pub fn add_filter(&mut self, filter: Filter) {
        self.filters.add_filter(filter, &self.state);
        self.after_filter_change();
    }

    pub fn remove_filter(&mut self, id: &str) {
        self.filters.remove_filter(id, &self.state);
        self.after_filter_change();
    }

    pub fn set_filter_enabled(&mut self, id: &str, enabled: bool) {
        self.filters.set_enabled(id, enabled, &self.state);
        self.after_filter_change();
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear(&self.state);
        self.after_filter_change();
    }

    pub fn filters(&self) -> &FilterManager {
        &self.filters
    }

    pub fn is_visible(&self, id: &str) -> bool {
        self.filters.is_visible(id)
    }

    pub fn visible_annotations(&self) -> Vec<AnnotationId> {
        self.filters.visible_ids(&self.state)
    }

    fn after_filter_change(&mut self) {
        self.labels.sync_visibility(&self.filters);
        let hidden = self
            .selected
            .as_deref()
            .is_some_and(|id| !self.filters.is_visible(id));
        if hidden {
            self.set_selection(None);
        }
        self.flush_events();
    }

    // =========================================================================
    // Groups
    // =========================================================================

    pub fn create_group(&mut self, name: &str, members: &[AnnotationId]) -> GroupId {
        let id = self.groups.create_group(name, members, &self.state);
        self.flush_events();
        id
    }

    pub fn delete_group(&mut self, id: &str) {
        self.groups.delete_group(id);
        self.flush_events();
    }

    pub fn rename_group(&mut self, id: &str, name: &str) {
        self.groups.rename_group(id, name);
        self.flush_events();
    }

    pub fn set_group_color(&mut self, id: &str, color: Option<Color>) {
        self.groups.set_color(id, color);
        self.flush_events();
    }

    pub fn add_to_group(&mut self, id: &str, members: &[AnnotationId]) {
        self.groups.add_to_group(id, members, &self.state);
        self.flush_events();
    }

    pub fn remove_from_group(&mut self, id: &str, members: &[AnnotationId]) {
        self.groups.remove_from_group(id, members, &self.state);
        self.flush_events();
    }

    pub fn select_group(&mut self, id: Option<&str>) {
        self.groups.select_group(id);
        self.flush_events();
    }

    pub fn groups(&self) -> &GroupManager {
        &self.groups
    }

    /// Replace all groups from JSON. Returns the number of groups loaded.
    pub fn import_groups(&mut self, json: &str) -> Result<usize, serde_json::Error> {
        let result = self.groups.import_json(json, &self.state);
        self.flush_events();
        result
    }

    pub fn export_groups(&self) -> Result<String, serde_json::Error> {
        self.groups.export_json()
    }

    // =========================================================================
    // Labels
    // =========================================================================

    pub fn set_labels_shown(&mut self, shown: bool) {
        self.labels.set_shown(shown);
    }

    pub fn labels(&self) -> &LabelManager {
        &self.labels
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Attach a storage backend for a resource and load its annotations,
    /// replacing the current set. A pending save of a previously attached
    /// backend is flushed first. Returns the number of loaded annotations;
    /// a failed load keeps the current set and reports an error event.
    pub fn attach_storage(
        &mut self,
        adapter: Box<dyn StorageAdapter>,
        resource_id: impl Into<String>,
    ) -> usize {
        if let Some(previous) = self.persistence.as_mut() {
            previous.flush(&self.state);
        }
        let mut persistence = PersistenceManager::new(adapter, resource_id)
            .with_debounce(self.config.save_debounce())
            .with_auto_save(self.config.auto_save);
        persistence.on(forward(&self.queue, AnnotatorEvent::Persistence));
        self.persistence = Some(persistence);
        let count = self.load_stored().unwrap_or(0);
        self.flush_events();
        count
    }

    /// Switch to another resource, flushing a pending save of the current
    /// one first, then load the new resource's annotations.
    ///
    /// If the new resource cannot be loaded the annotator stays on the
    /// current resource and keeps its annotations.
    pub fn switch_resource(&mut self, resource_id: impl Into<String>) -> usize {
        let Some(persistence) = self.persistence.as_mut() else {
            return 0;
        };
        persistence.flush(&self.state);
        let previous = persistence.resource_id().to_string();
        persistence.set_resource_id(resource_id);

        let count = match self.load_stored() {
            Some(count) => count,
            None => {
                if let Some(persistence) = self.persistence.as_mut() {
                    log::warn!(
                        "Staying on {} after failing to load {}",
                        previous,
                        persistence.resource_id()
                    );
                    persistence.set_resource_id(previous);
                }
                0
            }
        };
        self.flush_events();
        count
    }

    /// Load the attached resource into the state. `None` if the load failed.
    fn load_stored(&mut self) -> Option<usize> {
        let annotations = self.persistence.as_mut()?.load()?;
        let count = annotations.len();
        self.state.load(annotations);
        self.process_changes(false);
        Some(count)
    }

    pub fn persistence(&self) -> Option<&PersistenceManager> {
        self.persistence.as_ref()
    }

    pub fn set_auto_save(&mut self, enabled: bool) {
        self.config.auto_save = enabled;
        if let Some(persistence) = self.persistence.as_mut() {
            persistence.set_auto_save(enabled);
        }
    }

    /// Run a debounced save if it is due. Call from the host loop.
    pub fn poll(&mut self) -> bool {
        self.poll_at(Instant::now())
    }

    /// [`poll`](Self::poll) with an explicit clock.
    pub fn poll_at(&mut self, now: Instant) -> bool {
        let saved = match self.persistence.as_mut() {
            Some(persistence) => persistence.poll_at(now, &self.state),
            None => false,
        };
        self.flush_events();
        saved
    }

    /// Save the current set immediately.
    pub fn save_now(&mut self) -> bool {
        let saved = match self.persistence.as_mut() {
            Some(persistence) => persistence.save(&self.state.get_all()),
            None => false,
        };
        self.flush_events();
        saved
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// Draw the whole annotation layer: visible annotations in state order,
    /// group boxes, labels, the tool preview and the selection's handles.
    pub fn render(&self) -> SvgElement {
        let image = self.tools.image_bounds();
        let theme = self.styles.theme();
        let mut layer = SvgElement::new("svg")
            .attr("class", "dz-layer")
            .attr("viewBox", format!("0 0 {} {}", image.width, image.height))
            .attr("width", image.width)
            .attr("height", image.height);

        for annotation in self.state.iter() {
            if !self.filters.is_visible(&annotation.id) {
                continue;
            }
            let style = self.effective_style(&annotation.id);
            layer = layer.child(self.renderer.render_annotation(annotation, &style));
        }

        for group in self.groups.groups() {
            if let Some(bounds) = self.groups.bounds(&group.id) {
                layer = layer.child(self.renderer.render_group_bounds(
                    &bounds,
                    group.color,
                    &theme.group_style,
                ));
            }
        }

        for label in self.labels.visible_labels(&self.state) {
            layer = layer.child(self.renderer.render_label(label, theme.label_color));
        }

        if let Some(preview) = self.tools.preview() {
            layer = layer.child(
                self.renderer
                    .render_preview(&preview, self.styles.preview_style()),
            );
        }

        if let Some(selected) = self.selected() {
            let handles = ShapeFactory::from_annotation(selected).edit_handles();
            layer = layer.child(self.renderer.render_handles(&handles, theme.label_color));
        }

        layer
    }

    /// Tear down: flush a pending save, drop the active tool and release
    /// every listener.
    pub fn destroy(mut self) {
        if let Some(persistence) = self.persistence.as_mut() {
            persistence.flush(&self.state);
        }
        self.tools.deactivate_active_tool();
        self.flush_events();

        self.tools.clear_listeners();
        self.filters.clear_listeners();
        self.groups.clear_listeners();
        if let Some(persistence) = self.persistence.as_mut() {
            persistence.clear_listeners();
        }
        self.state.clear_listeners();
        self.events.clear();
        log::info!("Annotator destroyed");
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn finish<T>(
        &mut self,
        result: Result<T, AnnotatorError>,
        persist: bool,
    ) -> Result<T, AnnotatorError> {
        match &result {
            Ok(_) => self.process_changes(persist),
            Err(e) => self.report(e),
        }
        self.flush_events();
        result
    }

    /// Fan pending state changes out to every derived manager.
    fn process_changes(&mut self, persist: bool) {
        let changes: Vec<StateChange> = self.changes.borrow_mut().drain(..).collect();
        if changes.is_empty() {
            return;
        }
        self.filters.apply(&self.state);

        for change in &changes {
            match change {
                StateChange::Added(annotation) => {
                    self.queue
                        .borrow_mut()
                        .push(AnnotatorEvent::Create(annotation.clone()));
                    self.labels
                        .update(annotation, self.filters.is_visible(&annotation.id));
                }
                StateChange::Updated { previous, current } => {
                    self.queue.borrow_mut().push(AnnotatorEvent::Update {
                        previous: previous.clone(),
                        current: current.clone(),
                    });
                    self.labels
                        .update(current, self.filters.is_visible(&current.id));
                }
                StateChange::Removed(annotation) => {
                    self.queue
                        .borrow_mut()
                        .push(AnnotatorEvent::Delete(annotation.clone()));
                    self.labels.remove(&annotation.id);
                    self.styles.clear_overrides(&annotation.id);
                    if self.selected.as_deref() == Some(annotation.id.as_str()) {
                        self.set_selection(None);
                    }
                }
                StateChange::Reset => {
                    self.labels.refresh(&self.state, &self.filters);
                    self.styles.retain(|id| self.state.contains(id));
                    let gone = self
                        .selected
                        .as_deref()
                        .is_some_and(|id| !self.state.contains(id));
                    if gone {
                        self.set_selection(None);
                    }
                }
            }
            self.groups.handle_state_change(change, &self.state);
        }

        if persist {
            if let Some(persistence) = self.persistence.as_mut() {
                persistence.mark_dirty();
            }
        }
    }

    fn report(&mut self, error: &AnnotatorError) {
        log::warn!("Annotator: {}", error);
        self.queue.borrow_mut().push(AnnotatorEvent::Error {
            message: error.to_string(),
            operation: error.operation().to_string(),
        });
    }

    /// Deliver queued events to the listeners.
    fn flush_events(&mut self) {
        let pending: Vec<AnnotatorEvent> = self.queue.borrow_mut().drain(..).collect();
        for event in &pending {
            self.events.emit(event);
        }
    }
}

impl<V: ViewerAdapter> std::fmt::Debug for Annotator<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Annotator")
            .field("annotations", &self.state.len())
            .field("active_tool", &self.tools.active_tool())
            .field("selected", &self.selected)
            .field("persistence", &self.persistence)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::Predicate;
    use crate::model::{AnnotationBody, Bounds};
    use crate::persistence::{LocalStorageAdapter, MemoryStore};
    use std::time::Duration;

    /// Viewer whose viewport is the image scaled by 2.
    struct ScaledViewer;

    impl ViewerAdapter for ScaledViewer {
        fn viewport_to_image(&self, point: Point) -> Point {
            Point::new(point.x / 2.0, point.y / 2.0)
        }

        fn image_size(&self) -> ImageBounds {
            ImageBounds::new(200.0, 100.0)
        }
    }

    fn annotator() -> Annotator<ScaledViewer> {
        Annotator::new(ScaledViewer, AnnotatorConfig::default())
    }

    fn record(annotator: &mut Annotator<ScaledViewer>) -> Rc<RefCell<Vec<AnnotatorEvent>>> {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        annotator.on(move |e| sink.borrow_mut().push(e.clone()));
        events
    }

    fn rect(id: &str, x: f64, y: f64, w: f64, h: f64) -> Annotation {
        Annotation::with_id(id, Geometry::Rectangle { x, y, w, h })
    }

    fn press(x: f64, y: f64, ms: f64) -> ViewerEvent {
        ViewerEvent::CanvasPress {
            position: Point::new(x, y),
            event: PointerEvent::at(ms),
        }
    }

    fn drag(x: f64, y: f64, ms: f64) -> ViewerEvent {
        ViewerEvent::CanvasDrag {
            position: Point::new(x, y),
            event: PointerEvent::at(ms),
        }
    }

    fn release(x: f64, y: f64, ms: f64) -> ViewerEvent {
        ViewerEvent::CanvasRelease {
            position: Point::new(x, y),
            event: PointerEvent::at(ms),
        }
    }

    #[test]
    fn test_draw_rectangle_in_image_space() {
        let mut annotator = annotator();
        let events = record(&mut annotator);
        annotator.set_user(Some(Creator::new("u1")));
        annotator.activate_tool("rectangle").unwrap();

        assert!(annotator.handle_viewer_event(press(20.0, 20.0, 0.0)).is_none());
        assert!(annotator.handle_viewer_event(drag(60.0, 80.0, 10.0)).is_none());
        let created = annotator
            .handle_viewer_event(release(60.0, 80.0, 20.0))
            .unwrap();

        assert_eq!(
            *created.geometry(),
            Geometry::Rectangle {
                x: 10.0,
                y: 10.0,
                w: 20.0,
                h: 30.0
            }
        );
        assert_eq!(created.creator_id(), Some("u1"));
        assert_eq!(annotator.get_annotations(), vec![created.clone()]);
        assert!(
            events
                .borrow()
                .iter()
                .any(|e| *e == AnnotatorEvent::Create(created.clone()))
        );
    }

    #[test]
    fn test_drawn_geometry_is_clamped_to_image() {
        let mut annotator = annotator();
        annotator.activate_tool("rectangle").unwrap();
        annotator.handle_viewer_event(press(300.0, 100.0, 0.0));
        annotator.handle_viewer_event(drag(1000.0, 1000.0, 10.0));
        let created = annotator
            .handle_viewer_event(release(1000.0, 1000.0, 20.0))
            .unwrap();
        let bounds = created.geometry().bounds().unwrap();
        assert!(bounds.x + bounds.width <= 200.0);
        assert!(bounds.y + bounds.height <= 100.0);
    }

    #[test]
    fn test_unknown_tool_emits_error_and_keeps_active_tool() {
        let mut annotator = annotator();
        let events = record(&mut annotator);
        annotator.activate_tool("polygon").unwrap();
        assert!(annotator.activate_tool("lasso").is_err());
        assert_eq!(annotator.active_tool(), Some("polygon"));
        assert!(events.borrow().iter().any(|e| matches!(
            e,
            AnnotatorEvent::Tool(ToolEvent::Error { operation, .. }) if operation == "activateTool"
        )));
    }

    #[test]
    fn test_press_without_tool_selects_top_most() {
        let mut annotator = annotator();
        annotator.add_annotation(rect("below", 0.0, 0.0, 50.0, 50.0)).unwrap();
        annotator.add_annotation(rect("above", 10.0, 10.0, 50.0, 50.0)).unwrap();
        let events = record(&mut annotator);

        annotator.handle_viewer_event(press(40.0, 40.0, 0.0));
        assert_eq!(annotator.selected().map(|a| a.id.as_str()), Some("above"));

        annotator.handle_viewer_event(press(398.0, 198.0, 0.0));
        assert!(annotator.selected().is_none());
        assert_eq!(
            *events.borrow(),
            vec![
                AnnotatorEvent::Select(Some("above".to_string())),
                AnnotatorEvent::Select(None),
            ]
        );
    }

    #[test]
    fn test_delete_key_removes_selection() {
        let mut annotator = annotator();
        annotator.add_annotation(rect("a", 0.0, 0.0, 50.0, 50.0)).unwrap();
        annotator.select(Some("a"));
        annotator.handle_viewer_event(ViewerEvent::KeyDown(KeyEvent::new(Key::Delete)));
        assert!(annotator.get_annotation("a").is_none());
        assert!(annotator.selected().is_none());
    }

    #[test]
    fn test_update_stamps_modified_and_errors_on_unknown() {
        let mut annotator = annotator();
        let events = record(&mut annotator);
        annotator.add_annotation(rect("a", 0.0, 0.0, 5.0, 5.0)).unwrap();

        let previous = annotator
            .update_annotation(rect("a", 1.0, 1.0, 5.0, 5.0))
            .unwrap();
        assert!(previous.modified.is_none());
        assert!(annotator.get_annotation("a").unwrap().modified.is_some());

        assert!(matches!(
            annotator.update_annotation(rect("missing", 0.0, 0.0, 1.0, 1.0)),
            Err(AnnotatorError::AnnotationNotFound(_))
        ));
        assert!(matches!(
            events.borrow().last(),
            Some(AnnotatorEvent::Error { operation, .. }) if operation == "update"
        ));
    }

    #[test]
    fn test_move_and_drag_handle_stay_in_image() {
        let mut annotator = annotator();
        annotator.add_annotation(rect("a", 10.0, 10.0, 20.0, 20.0)).unwrap();

        annotator.move_annotation("a", 500.0, 0.0).unwrap();
        let bounds = annotator.get_annotation("a").unwrap().geometry().bounds().unwrap();
        assert_eq!(bounds, Bounds::new(180.0, 10.0, 20.0, 20.0));

        assert_eq!(annotator.edit_handles("a").len(), 4);
        annotator.drag_handle("a", 0, Point::new(-50.0, -50.0)).unwrap();
        let bounds = annotator.get_annotation("a").unwrap().geometry().bounds().unwrap();
        assert_eq!(bounds.x, 0.0);
        assert_eq!(bounds.y, 0.0);

        assert!(annotator.drag_handle("a", 99, Point::new(0.0, 0.0)).is_err());
        assert!(annotator.move_annotation("missing", 1.0, 1.0).is_err());
    }

    #[test]
    fn test_filters_hide_from_render_and_selection() {
        let mut annotator = annotator();
        annotator
            .add_annotation(rect("a", 0.0, 0.0, 50.0, 50.0).with_body(AnnotationBody::tag("x")))
            .unwrap();
        annotator.add_annotation(rect("b", 0.0, 0.0, 50.0, 50.0)).unwrap();
        annotator.select(Some("b"));

        annotator.add_filter(Filter::new("tag-x", "Tag x", Predicate::by_tag("x")));
        assert_eq!(annotator.visible_annotations(), vec!["a".to_string()]);
        assert!(annotator.selected().is_none());
        assert_eq!(annotator.render().count("g"), 1);

        annotator.set_filter_enabled("tag-x", false);
        assert_eq!(annotator.visible_annotations().len(), 2);
    }

    #[test]
    fn test_removing_member_updates_group() {
        let mut annotator = annotator();
        annotator.add_annotation(rect("a", 0.0, 0.0, 10.0, 10.0)).unwrap();
        annotator.add_annotation(rect("b", 20.0, 20.0, 10.0, 10.0)).unwrap();
        let group = annotator.create_group("cells", &["a".to_string(), "b".to_string()]);
        assert_eq!(
            annotator.groups().bounds(&group),
            Some(Bounds::new(0.0, 0.0, 30.0, 30.0))
        );

        annotator.remove_annotation("b");
        assert_eq!(
            annotator.groups().bounds(&group),
            Some(Bounds::new(0.0, 0.0, 10.0, 10.0))
        );
        assert_eq!(annotator.groups().group(&group).unwrap().annotations.len(), 1);
    }

    #[test]
    fn test_attach_storage_loads_and_autosaves() {
        let store = MemoryStore::new();
        let mut seed = LocalStorageAdapter::new(store.clone());
        seed.save("slide", &[rect("a", 0.0, 0.0, 5.0, 5.0)]).unwrap();

        let mut annotator = annotator();
        let adapter = LocalStorageAdapter::new(store.clone());
        let loaded = annotator.attach_storage(Box::new(adapter), "slide");
        assert_eq!(loaded, 1);
        assert!(!annotator.persistence().unwrap().has_pending_save());

        annotator.add_annotation(rect("b", 0.0, 0.0, 5.0, 5.0)).unwrap();
        let later = Instant::now() + Duration::from_secs(2);
        assert!(annotator.poll_at(later));

        let mut check = LocalStorageAdapter::new(store);
        assert_eq!(check.load("slide").unwrap().len(), 2);
    }

    #[test]
    fn test_render_includes_preview_and_handles() {
        let mut annotator = annotator();
        annotator.add_annotation(rect("a", 0.0, 0.0, 10.0, 10.0)).unwrap();
        annotator.select(Some("a"));
        annotator.activate_tool("circle").unwrap();
        annotator.handle_viewer_event(press(100.0, 100.0, 0.0));
        annotator.handle_viewer_event(drag(140.0, 100.0, 10.0));

        let layer = annotator.render();
        assert_eq!(layer.get_attr("viewBox"), Some("0 0 200 100"));
        assert!(layer.children.iter().any(|c| c.get_attr("class") == Some("dz-preview")));
        assert!(layer.children.iter().any(|c| c.get_attr("class") == Some("dz-handles")));
    }
}
