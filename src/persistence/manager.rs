//! Debounced persistence of one resource's annotations.
//!
//! Every mutation calls [`PersistenceManager::mark_dirty`], which (with
//! auto-save on) pushes a single pending deadline `debounce` into the
//! future. The host loop calls [`PersistenceManager::poll`]; once the
//! deadline has passed, one save of the current state is issued. Bursts of
//! changes therefore collapse into one adapter call with the final array.
//!
//! Adapter failures never cross this boundary: they are logged and emitted
//! as [`PersistenceEvent::Error`], and the in-memory state stays
//! authoritative. There is no automatic retry.

use std::time::Duration;
use web_time::Instant;

use crate::event::{EventEmitter, ListenerId};
use crate::model::Annotation;
use crate::state::AnnotationState;

use super::{StorageAdapter, StorageError};

/// Default debounce delay between the last change and the save.
pub const DEFAULT_SAVE_DEBOUNCE: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceEvent {
    Load { resource_id: String, count: usize },
    Save { resource_id: String, count: usize },
    Delete { resource_id: String },
    Error { error: String, operation: String },
}

pub struct PersistenceManager {
    adapter: Box<dyn StorageAdapter>,
    resource_id: String,
    auto_save: bool,
    debounce: Duration,
    /// Deadline of the single pending save, if any.
    pending: Option<Instant>,
    events: EventEmitter<PersistenceEvent>,
}

impl PersistenceManager {
    /// Create a manager with auto-save on and the default debounce.
    pub fn new(adapter: Box<dyn StorageAdapter>, resource_id: impl Into<String>) -> Self {
        Self {
            adapter,
            resource_id: resource_id.into(),
            auto_save: true,
            debounce: DEFAULT_SAVE_DEBOUNCE,
            pending: None,
            events: EventEmitter::new(),
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_auto_save(mut self, auto_save: bool) -> Self {
        self.auto_save = auto_save;
        self
    }

    pub fn on<F>(&mut self, handler: F) -> ListenerId
    where
        F: FnMut(&PersistenceEvent) + 'static,
    {
        self.events.on(handler)
    }

    pub fn off(&mut self, id: ListenerId) -> bool {
        self.events.off(id)
    }

    pub(crate) fn clear_listeners(&mut self) {
        self.events.clear();
    }

    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    /// Switch to another resource. A pending save is dropped, not flushed.
    pub fn set_resource_id(&mut self, resource_id: impl Into<String>) {
        self.pending = None;
        self.resource_id = resource_id.into();
    }

    pub fn set_auto_save(&mut self, enabled: bool) {
        self.auto_save = enabled;
        if !enabled {
            self.pending = None;
        }
        log::debug!("Auto-save: enabled = {}", enabled);
    }

    pub fn is_auto_save(&self) -> bool {
        self.auto_save
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Record a change that needs saving.
    pub fn mark_dirty(&mut self) {
        self.mark_dirty_at(Instant::now());
    }

    /// [`mark_dirty`](Self::mark_dirty) with an explicit clock.
    pub fn mark_dirty_at(&mut self, now: Instant) {
        if !self.auto_save {
            return;
        }
        // Replaces any earlier deadline: only one pending save at a time.
        self.pending = Some(now + self.debounce);
        log::trace!("Auto-save: marked dirty");
    }

    pub fn has_pending_save(&self) -> bool {
        self.pending.is_some()
    }

    /// Time left until the pending save fires.
    pub fn time_until_save(&self, now: Instant) -> Option<Duration> {
        self.pending
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Save if the debounce deadline has passed. Returns true if a save ran
    /// and succeeded.
    pub fn poll(&mut self, state: &AnnotationState) -> bool {
        self.poll_at(Instant::now(), state)
    }

    /// [`poll`](Self::poll) with an explicit clock.
    pub fn poll_at(&mut self, now: Instant, state: &AnnotationState) -> bool {
        match self.pending {
            Some(deadline) if now >= deadline => {
                self.pending = None;
                log::trace!("Auto-save: debounce elapsed");
                self.save(&state.get_all())
            }
            _ => false,
        }
    }

    /// Save immediately if a save is pending.
    pub fn flush(&mut self, state: &AnnotationState) -> bool {
        if self.pending.take().is_none() {
            return false;
        }
        self.save(&state.get_all())
    }

    /// Save an annotation array now, cancelling any pending save.
    pub fn save(&mut self, annotations: &[Annotation]) -> bool {
        self.pending = None;
        let result = self.adapter.save(&self.resource_id, annotations);
        match result {
            Ok(()) => {
                log::info!(
                    "Saved {} annotations for {} ({})",
                    annotations.len(),
                    self.resource_id,
                    self.adapter.name()
                );
                self.events.emit(&PersistenceEvent::Save {
                    resource_id: self.resource_id.clone(),
                    count: annotations.len(),
                });
                true
            }
            Err(e) => {
                self.report(&e, "save");
                false
            }
        }
    }

    /// Load the resource's annotations. `None` if the adapter failed.
    pub fn load(&mut self) -> Option<Vec<Annotation>> {
        match self.adapter.load(&self.resource_id) {
            Ok(annotations) => {
                log::info!(
                    "Loaded {} annotations for {} ({})",
                    annotations.len(),
                    self.resource_id,
                    self.adapter.name()
                );
                self.events.emit(&PersistenceEvent::Load {
                    resource_id: self.resource_id.clone(),
                    count: annotations.len(),
                });
                Some(annotations)
            }
            Err(e) => {
                self.report(&e, "load");
                None
            }
        }
    }

    /// Delete the stored annotations of the resource.
    pub fn delete(&mut self) -> bool {
        self.pending = None;
        match self.adapter.delete(&self.resource_id) {
            Ok(()) => {
                log::info!("Deleted stored annotations for {}", self.resource_id);
                self.events.emit(&PersistenceEvent::Delete {
                    resource_id: self.resource_id.clone(),
                });
                true
            }
            Err(e) => {
                self.report(&e, "delete");
                false
            }
        }
    }

    fn report(&mut self, error: &StorageError, operation: &str) {
        log::warn!(
            "Persistence {} failed for {}: {}",
            operation,
            self.resource_id,
            error
        );
        self.events.emit(&PersistenceEvent::Error {
            error: error.to_string(),
            operation: operation.to_string(),
        });
    }
}

impl std::fmt::Debug for PersistenceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceManager")
            .field("adapter", &self.adapter.name())
            .field("resource_id", &self.resource_id)
            .field("auto_save", &self.auto_save)
            .field("debounce", &self.debounce)
            .field("pending", &self.pending.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Geometry;
    use crate::persistence::{LocalStorageAdapter, MemoryStore};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records every save call.
    #[derive(Default, Clone)]
    struct RecordingAdapter {
        saves: Rc<RefCell<Vec<Vec<Annotation>>>>,
        fail: bool,
    }

    impl StorageAdapter for RecordingAdapter {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn load(&mut self, _resource_id: &str) -> Result<Vec<Annotation>, StorageError> {
            if self.fail {
                return Err(StorageError::Unavailable("offline".to_string()));
            }
            Ok(self.saves.borrow().last().cloned().unwrap_or_default())
        }

        fn save(
            &mut self,
            _resource_id: &str,
            annotations: &[Annotation],
        ) -> Result<(), StorageError> {
            if self.fail {
                return Err(StorageError::Unavailable("quota exceeded".to_string()));
            }
            self.saves.borrow_mut().push(annotations.to_vec());
            Ok(())
        }

        fn delete(&mut self, _resource_id: &str) -> Result<(), StorageError> {
            Ok(())
        }
    }

    fn point(id: &str) -> Annotation {
        Annotation::with_id(id, Geometry::Point { x: 1.0, y: 1.0 })
    }

    #[test]
    fn test_burst_of_marks_saves_once_with_final_state() {
        let adapter = RecordingAdapter::default();
        let saves = Rc::clone(&adapter.saves);
        let mut manager = PersistenceManager::new(Box::new(adapter), "slide");
        let mut state = AnnotationState::new();

        let start = Instant::now();
        for i in 0..5u64 {
            state.add(point(&format!("a{}", i))).unwrap();
            let now = start + Duration::from_millis(i * 200);
            manager.mark_dirty_at(now);
            assert!(!manager.poll_at(now, &state));
        }

        // Last mark at 800ms, so nothing fires before 1800ms
        assert!(!manager.poll_at(start + Duration::from_millis(1799), &state));
        assert!(manager.poll_at(start + Duration::from_millis(1800), &state));
        assert!(!manager.poll_at(start + Duration::from_millis(5000), &state));

        assert_eq!(saves.borrow().len(), 1);
        assert_eq!(saves.borrow()[0], state.get_all());
        assert_eq!(saves.borrow()[0].len(), 5);
    }

    #[test]
    fn test_auto_save_off_never_schedules() {
        let adapter = RecordingAdapter::default();
        let saves = Rc::clone(&adapter.saves);
        let mut manager =
            PersistenceManager::new(Box::new(adapter), "slide").with_auto_save(false);
        let state = AnnotationState::new();

        let start = Instant::now();
        manager.mark_dirty_at(start);
        assert!(!manager.has_pending_save());
        assert!(!manager.poll_at(start + Duration::from_secs(10), &state));
        assert!(saves.borrow().is_empty());
    }

    #[test]
    fn test_flush_saves_pending_immediately() {
        let adapter = RecordingAdapter::default();
        let saves = Rc::clone(&adapter.saves);
        let mut manager = PersistenceManager::new(Box::new(adapter), "slide");
        let state = AnnotationState::from_annotations(vec![point("a")]);

        assert!(!manager.flush(&state));
        manager.mark_dirty();
        assert!(manager.flush(&state));
        assert!(!manager.has_pending_save());
        assert_eq!(saves.borrow().len(), 1);
    }

    #[test]
    fn test_adapter_failure_becomes_error_event() {
        let adapter = RecordingAdapter {
            fail: true,
            ..Default::default()
        };
        let mut manager = PersistenceManager::new(Box::new(adapter), "slide");
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        manager.on(move |e| sink.borrow_mut().push(e.clone()));

        assert!(!manager.save(&[point("a")]));
        assert!(manager.load().is_none());

        let events = events.borrow();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[0],
            PersistenceEvent::Error { operation, .. } if operation == "save"
        ));
        assert!(matches!(
            &events[1],
            PersistenceEvent::Error { operation, .. } if operation == "load"
        ));
    }

    #[test]
    fn test_round_trip_through_local_storage() {
        let store = MemoryStore::new();
        let mut manager =
            PersistenceManager::new(Box::new(LocalStorageAdapter::new(store.clone())), "slide");
        let saved = vec![point("a"), point("b")];

        assert!(manager.save(&saved));
        assert_eq!(manager.load(), Some(saved));
        assert!(manager.delete());
        assert!(manager.delete());
        assert_eq!(manager.load(), Some(Vec::new()));
        assert!(store.is_empty());
    }
}
