//! Annotation state container.
//!
//! `AnnotationState` is the single source of truth for annotations. It keeps
//! an id map plus insertion order, so iteration (and rendering z-order) is
//! stable. Values are stored exactly as written: `get_annotation` returns the
//! last written value until the next write or removal.

use std::collections::HashMap;

use crate::error::AnnotatorError;
use crate::event::{EventEmitter, ListenerId};
use crate::model::{Annotation, AnnotationId};

/// A change applied to the state.
#[derive(Debug, Clone, PartialEq)]
pub enum StateChange {
    Added(Annotation),
    Updated {
        previous: Annotation,
        current: Annotation,
    },
    Removed(Annotation),
    /// The whole set was replaced (load) or cleared.
    Reset,
}

impl StateChange {
    /// Id of the annotation the change applies to, if any.
    pub fn id(&self) -> Option<&str> {
        match self {
            StateChange::Added(a) | StateChange::Removed(a) => Some(&a.id),
            StateChange::Updated { current, .. } => Some(&current.id),
            StateChange::Reset => None,
        }
    }
}

/// Canonical map of annotation id to annotation.
#[derive(Default)]
pub struct AnnotationState {
    annotations: HashMap<AnnotationId, Annotation>,
    order: Vec<AnnotationId>,
    events: EventEmitter<StateChange>,
}

impl AnnotationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a state from a list, keeping the last of any duplicate ids.
    pub fn from_annotations(annotations: Vec<Annotation>) -> Self {
        let mut state = Self::new();
        state.load(annotations);
        state
    }

    pub fn on<F>(&mut self, handler: F) -> ListenerId
    where
        F: FnMut(&StateChange) + 'static,
    {
        self.events.on(handler)
    }

    pub fn off(&mut self, id: ListenerId) -> bool {
        self.events.off(id)
    }

    pub(crate) fn clear_listeners(&mut self) {
        self.events.clear();
    }

    /// Insert a new annotation. Fails if the id is already present.
    pub fn add(&mut self, annotation: Annotation) -> Result<(), AnnotatorError> {
        if self.annotations.contains_key(&annotation.id) {
            return Err(AnnotatorError::DuplicateAnnotation(annotation.id));
        }
        log::debug!("State: added {}", annotation.id);
        self.order.push(annotation.id.clone());
        self.annotations
            .insert(annotation.id.clone(), annotation.clone());
        self.events.emit(&StateChange::Added(annotation));
        Ok(())
    }

    /// Replace the annotation with the same id. Returns the previous value.
    pub fn update(&mut self, annotation: Annotation) -> Result<Annotation, AnnotatorError> {
        let Some(slot) = self.annotations.get_mut(&annotation.id) else {
            return Err(AnnotatorError::AnnotationNotFound(annotation.id));
        };
        let previous = std::mem::replace(slot, annotation.clone());
        log::debug!("State: updated {}", annotation.id);
        self.events.emit(&StateChange::Updated {
            previous: previous.clone(),
            current: annotation,
        });
        Ok(previous)
    }

    /// Remove an annotation. Unknown ids are ignored.
    pub fn remove(&mut self, id: &str) -> Option<Annotation> {
        let removed = self.annotations.remove(id)?;
        self.order.retain(|existing| existing != id);
        log::debug!("State: removed {}", id);
        self.events.emit(&StateChange::Removed(removed.clone()));
        Some(removed)
    }

    /// Replace the whole set, keeping the last of any duplicate ids.
    pub fn load(&mut self, annotations: Vec<Annotation>) {
        self.annotations.clear();
        self.order.clear();
        for annotation in annotations {
            if self.annotations.contains_key(&annotation.id) {
                log::warn!("State: duplicate id {} in loaded set", annotation.id);
            } else {
                self.order.push(annotation.id.clone());
            }
            self.annotations.insert(annotation.id.clone(), annotation);
        }
        log::debug!("State: loaded {} annotations", self.order.len());
        self.events.emit(&StateChange::Reset);
    }

    pub fn clear(&mut self) {
        if self.order.is_empty() {
            return;
        }
        self.annotations.clear();
        self.order.clear();
        self.events.emit(&StateChange::Reset);
    }

    pub fn get_annotation(&self, id: &str) -> Option<&Annotation> {
        self.annotations.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.annotations.contains_key(id)
    }

    /// All annotations in insertion order.
    pub fn get_all(&self) -> Vec<Annotation> {
        self.iter().cloned().collect()
    }

    /// Iterate annotations in insertion order (bottom to top).
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Annotation> + '_ {
        self.order.iter().filter_map(|id| self.annotations.get(id))
    }

    pub fn ids(&self) -> &[AnnotationId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl std::fmt::Debug for AnnotationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnnotationState")
            .field("annotations", &self.order.len())
            .field("listeners", &self.events.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnnotationBody, Geometry};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn rect(id: &str, x: f64) -> Annotation {
        Annotation::with_id(
            id,
            Geometry::Rectangle {
                x,
                y: 0.0,
                w: 10.0,
                h: 10.0,
            },
        )
    }

    #[test]
    fn test_add_get_remove() {
        let mut state = AnnotationState::new();
        state.add(rect("a", 0.0)).unwrap();
        state.add(rect("b", 5.0)).unwrap();

        assert_eq!(state.len(), 2);
        assert_eq!(state.ids(), &["a".to_string(), "b".to_string()]);
        assert_eq!(state.get_annotation("a"), Some(&rect("a", 0.0)));

        assert!(state.remove("a").is_some());
        assert!(state.remove("a").is_none());
        assert_eq!(state.get_all().len(), 1);
    }

    #[test]
    fn test_duplicate_add_is_rejected() {
        let mut state = AnnotationState::new();
        state.add(rect("a", 0.0)).unwrap();
        let err = state.add(rect("a", 1.0)).unwrap_err();
        assert!(matches!(err, AnnotatorError::DuplicateAnnotation(id) if id == "a"));
        assert_eq!(state.get_annotation("a"), Some(&rect("a", 0.0)));
    }

    #[test]
    fn test_update_returns_exact_value_written() {
        let mut state = AnnotationState::new();
        state.add(rect("a", 0.0)).unwrap();

        let written = rect("a", 42.0).with_body(AnnotationBody::tag("cell"));
        let previous = state.update(written.clone()).unwrap();
        assert_eq!(previous, rect("a", 0.0));
        assert_eq!(state.get_annotation("a"), Some(&written));

        assert!(matches!(
            state.update(rect("zzz", 0.0)),
            Err(AnnotatorError::AnnotationNotFound(_))
        ));
    }

    #[test]
    fn test_load_keeps_last_duplicate_in_first_position() {
        let mut state = AnnotationState::new();
        state.load(vec![rect("a", 0.0), rect("b", 0.0), rect("a", 9.0)]);
        assert_eq!(state.ids(), &["a".to_string(), "b".to_string()]);
        assert_eq!(state.get_annotation("a"), Some(&rect("a", 9.0)));
    }

    #[test]
    fn test_changes_are_emitted() {
        let mut state = AnnotationState::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        state.on(move |change: &StateChange| {
            sink.borrow_mut().push(change.id().map(str::to_string));
        });

        state.add(rect("a", 0.0)).unwrap();
        state.update(rect("a", 1.0)).unwrap();
        state.remove("a");
        state.remove("a");
        state.load(Vec::new());

        assert_eq!(
            *seen.borrow(),
            vec![
                Some("a".to_string()),
                Some("a".to_string()),
                Some("a".to_string()),
                None
            ]
        );
    }
}
