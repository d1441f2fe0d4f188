//! Annotation visibility filters.
//!
//! An annotation is visible iff every enabled filter accepts it; with no
//! enabled filters everything is visible. The visibility map is recomputed
//! in full whenever filters or tracked annotations change.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::event::{EventEmitter, ListenerId};
use crate::model::{Annotation, AnnotationId, GeometryKind, Purpose};
use crate::state::AnnotationState;

/// Identifier of a filter.
pub type FilterId = String;

/// A composable test over annotations.
#[derive(Clone)]
pub struct Predicate(Rc<dyn Fn(&Annotation) -> bool>);

impl Predicate {
    pub fn new<F>(test: F) -> Self
    where
        F: Fn(&Annotation) -> bool + 'static,
    {
        Self(Rc::new(test))
    }

    /// Accepts annotations carrying a tagging body with this value.
    pub fn by_tag(tag: impl Into<String>) -> Self {
        let tag = tag.into();
        Self::new(move |a| a.tags().any(|t| t == tag))
    }

    /// Accepts annotations created by this creator id.
    pub fn by_creator(creator: impl Into<String>) -> Self {
        let creator = creator.into();
        Self::new(move |a| a.creator_id() == Some(creator.as_str()))
    }

    /// Accepts annotations with at least one body of this purpose.
    pub fn by_purpose(purpose: Purpose) -> Self {
        Self::new(move |a| a.bodies(purpose).next().is_some())
    }

    pub fn by_geometry(kind: GeometryKind) -> Self {
        Self::new(move |a| a.geometry().kind() == kind)
    }

    pub fn and(self, other: Predicate) -> Self {
        Self::new(move |a| self.test(a) && other.test(a))
    }

    pub fn or(self, other: Predicate) -> Self {
        Self::new(move |a| self.test(a) || other.test(a))
    }

    pub fn test(&self, annotation: &Annotation) -> bool {
        (self.0)(annotation)
    }
}

impl std::ops::Not for Predicate {
    type Output = Predicate;

    fn not(self) -> Predicate {
        Predicate::new(move |a| !self.test(a))
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate(..)")
    }
}

/// A named, toggleable predicate.
#[derive(Debug, Clone)]
pub struct Filter {
    pub id: FilterId,
    pub name: String,
    pub predicate: Predicate,
    pub enabled: bool,
}

impl Filter {
    /// Create an enabled filter.
    pub fn new(id: impl Into<FilterId>, name: impl Into<String>, predicate: Predicate) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            predicate,
            enabled: true,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterEvent {
    FilterAdded { id: FilterId },
    FilterRemoved { id: FilterId },
    FilterEnabled { id: FilterId, enabled: bool },
    FiltersApplied { visible: usize, hidden: usize },
}

#[derive(Default)]
pub struct FilterManager {
    filters: Vec<Filter>,
    visibility: HashMap<AnnotationId, bool>,
    events: EventEmitter<FilterEvent>,
}

impl FilterManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&mut self, handler: F) -> ListenerId
    where
        F: FnMut(&FilterEvent) + 'static,
    {
        self.events.on(handler)
    }

    pub fn off(&mut self, id: ListenerId) -> bool {
        self.events.off(id)
    }

    pub(crate) fn clear_listeners(&mut self) {
        self.events.clear();
    }

    /// Add a filter, replacing any filter with the same id, and re-apply.
    pub fn add_filter(&mut self, filter: Filter, state: &AnnotationState) {
        let id = filter.id.clone();
        match self.filters.iter_mut().find(|f| f.id == id) {
            Some(existing) => *existing = filter,
            None => self.filters.push(filter),
        }
        log::debug!("Filter '{}' added", id);
        self.events.emit(&FilterEvent::FilterAdded { id });
        self.apply(state);
    }

    /// Remove a filter. Unknown ids are ignored.
    pub fn remove_filter(&mut self, id: &str, state: &AnnotationState) {
        let before = self.filters.len();
        self.filters.retain(|f| f.id != id);
        if self.filters.len() == before {
            return;
        }
        self.events.emit(&FilterEvent::FilterRemoved { id: id.to_string() });
        self.apply(state);
    }

    /// Enable or disable a filter. Unknown ids are ignored.
    pub fn set_enabled(&mut self, id: &str, enabled: bool, state: &AnnotationState) {
        let Some(filter) = self.filters.iter_mut().find(|f| f.id == id) else {
            return;
        };
        if filter.enabled == enabled {
            return;
        }
        filter.enabled = enabled;
        self.events.emit(&FilterEvent::FilterEnabled {
            id: id.to_string(),
            enabled,
        });
        self.apply(state);
    }

    pub fn clear(&mut self, state: &AnnotationState) {
        let removed: Vec<FilterId> = self.filters.drain(..).map(|f| f.id).collect();
        for id in removed {
            self.events.emit(&FilterEvent::FilterRemoved { id });
        }
        self.apply(state);
    }

    pub fn filter(&self, id: &str) -> Option<&Filter> {
        self.filters.iter().find(|f| f.id == id)
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Whether every enabled filter accepts the annotation.
    pub fn accepts(&self, annotation: &Annotation) -> bool {
        self.filters
            .iter()
            .filter(|f| f.enabled)
            .all(|f| f.predicate.test(annotation))
    }

    /// Recompute the visibility of every annotation.
    pub fn apply(&mut self, state: &AnnotationState) {
        let visibility: HashMap<AnnotationId, bool> = state
            .iter()
            .map(|a| (a.id.clone(), self.accepts(a)))
            .collect();
        let visible = visibility.values().filter(|v| **v).count();
        let hidden = visibility.len() - visible;
        self.visibility = visibility;
        log::debug!("Filters applied: {} visible, {} hidden", visible, hidden);
        self.events
            .emit(&FilterEvent::FiltersApplied { visible, hidden });
    }

    /// Visibility of an annotation. Ids never seen by `apply` are visible.
    pub fn is_visible(&self, id: &str) -> bool {
        self.visibility.get(id).copied().unwrap_or(true)
    }

    /// Visible ids in state order.
    pub fn visible_ids(&self, state: &AnnotationState) -> Vec<AnnotationId> {
        state
            .ids()
            .iter()
            .filter(|id| self.is_visible(id))
            .cloned()
            .collect()
    }
}

impl fmt::Debug for FilterManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterManager")
            .field("filters", &self.filters)
            .field("tracked", &self.visibility.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnnotationBody, Creator, Geometry};
    use std::cell::RefCell;

    fn annotation(id: &str, tag: &str, creator: &str) -> Annotation {
        Annotation::with_id(id, Geometry::Point { x: 1.0, y: 1.0 })
            .with_body(AnnotationBody::tag(tag))
            .with_creator(Creator::new(creator))
    }

    #[test]
    fn test_disabled_filter_is_ignored_until_enabled() {
        let mut state = AnnotationState::new();
        state.add(annotation("a", "x", "u2")).unwrap();

        let mut filters = FilterManager::new();
        filters.add_filter(Filter::new("tag", "Tag x", Predicate::by_tag("x")), &state);
        filters.add_filter(
            Filter::new("creator", "By u1", Predicate::by_creator("u1")).disabled(),
            &state,
        );
        assert!(filters.is_visible("a"));

        filters.set_enabled("creator", true, &state);
        assert!(!filters.is_visible("a"));

        filters.set_enabled("creator", false, &state);
        assert!(filters.is_visible("a"));
    }

    #[test]
    fn test_no_enabled_filters_means_all_visible() {
        let mut state = AnnotationState::new();
        state.add(annotation("a", "x", "u1")).unwrap();
        state.add(annotation("b", "y", "u1")).unwrap();

        let mut filters = FilterManager::new();
        filters.apply(&state);
        assert_eq!(filters.visible_ids(&state), vec!["a", "b"]);

        filters.add_filter(Filter::new("f", "x only", Predicate::by_tag("x")), &state);
        assert_eq!(filters.visible_ids(&state), vec!["a"]);

        filters.remove_filter("f", &state);
        filters.remove_filter("f", &state);
        assert_eq!(filters.visible_ids(&state), vec!["a", "b"]);
        assert!(filters.is_visible("unknown"));
    }

    #[test]
    fn test_combinators() {
        let a = annotation("a", "x", "u1");
        let both = Predicate::by_tag("x").and(Predicate::by_creator("u1"));
        let either = Predicate::by_tag("nope").or(Predicate::by_creator("u1"));
        let neither = !Predicate::by_tag("x");

        assert!(both.test(&a));
        assert!(either.test(&a));
        assert!(!neither.test(&a));
        assert!(Predicate::by_purpose(Purpose::Tagging).test(&a));
        assert!(!Predicate::by_geometry(GeometryKind::Rectangle).test(&a));
    }

    #[test]
    fn test_events() {
        let state = AnnotationState::from_annotations(vec![annotation("a", "x", "u1")]);
        let mut filters = FilterManager::new();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        filters.on(move |e| sink.borrow_mut().push(e.clone()));

        filters.add_filter(Filter::new("f", "none", Predicate::by_tag("y")), &state);
        filters.set_enabled("f", false, &state);
        filters.set_enabled("missing", false, &state);

        assert_eq!(
            *events.borrow(),
            vec![
                FilterEvent::FilterAdded { id: "f".into() },
                FilterEvent::FiltersApplied {
                    visible: 0,
                    hidden: 1
                },
                FilterEvent::FilterEnabled {
                    id: "f".into(),
                    enabled: false
                },
                FilterEvent::FiltersApplied {
                    visible: 1,
                    hidden: 0
                },
            ]
        );
    }
}
