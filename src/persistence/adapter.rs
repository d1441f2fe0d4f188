//! Storage adapter trait and the key-value backed adapter.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::model::Annotation;

use super::StorageError;

/// Default key prefix for annotation sets in a key-value store.
pub const DEFAULT_STORAGE_PREFIX: &str = "annotations:";

/// Loads and stores the full annotation array of one resource.
///
/// `delete` must be idempotent, and loading a resource that was never saved
/// yields an empty array.
pub trait StorageAdapter {
    /// Short name used in log messages.
    fn name(&self) -> &'static str;

    fn load(&mut self, resource_id: &str) -> Result<Vec<Annotation>, StorageError>;

    fn save(&mut self, resource_id: &str, annotations: &[Annotation]) -> Result<(), StorageError>;

    fn delete(&mut self, resource_id: &str) -> Result<(), StorageError>;
}

/// A string key-value store, the shape of `window.localStorage`.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a key. Missing keys are not an error.
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// In-memory key-value store.
///
/// Clones share the same entries, so a caller can keep a handle to inspect
/// what an adapter wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.borrow().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// Stores each resource's annotations as one JSON string under
/// `prefix + resource_id`.
#[derive(Debug, Clone)]
pub struct LocalStorageAdapter<S> {
    store: S,
    prefix: String,
}

impl<S: KeyValueStore> LocalStorageAdapter<S> {
    pub fn new(store: S) -> Self {
        Self::with_prefix(store, DEFAULT_STORAGE_PREFIX)
    }

    pub fn with_prefix(store: S, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn key(&self, resource_id: &str) -> String {
        format!("{}{}", self.prefix, resource_id)
    }
}

impl<S: KeyValueStore> StorageAdapter for LocalStorageAdapter<S> {
    fn name(&self) -> &'static str {
        "local-storage"
    }

    fn load(&mut self, resource_id: &str) -> Result<Vec<Annotation>, StorageError> {
        match self.store.get(&self.key(resource_id))? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    fn save(&mut self, resource_id: &str, annotations: &[Annotation]) -> Result<(), StorageError> {
        let json = serde_json::to_string(annotations)?;
        let key = self.key(resource_id);
        self.store.set(&key, &json)
    }

    fn delete(&mut self, resource_id: &str) -> Result<(), StorageError> {
        let key = self.key(resource_id);
        self.store.remove(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnnotationBody, Geometry, Point};

    fn sample() -> Vec<Annotation> {
        vec![
            Annotation::new(Geometry::Rectangle {
                x: 1.0,
                y: 2.0,
                w: 3.0,
                h: 4.0,
            })
            .with_body(AnnotationBody::tag("cell")),
            Annotation::new(Geometry::Polygon {
                points: vec![
                    Point::new(0.0, 0.0),
                    Point::new(5.0, 0.0),
                    Point::new(5.0, 5.0),
                ],
            }),
        ]
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let store = MemoryStore::new();
        let mut adapter = LocalStorageAdapter::new(store.clone());
        let saved = sample();

        adapter.save("slide-1", &saved).unwrap();
        assert_eq!(store.keys(), vec!["annotations:slide-1".to_string()]);
        assert_eq!(adapter.load("slide-1").unwrap(), saved);
    }

    #[test]
    fn test_missing_resource_loads_empty() {
        let mut adapter = LocalStorageAdapter::new(MemoryStore::new());
        assert!(adapter.load("nothing").unwrap().is_empty());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let store = MemoryStore::new();
        let mut adapter = LocalStorageAdapter::with_prefix(store.clone(), "a/");
        adapter.save("r", &sample()).unwrap();
        adapter.delete("r").unwrap();
        adapter.delete("r").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_corrupt_entry_is_a_json_error() {
        let mut store = MemoryStore::new();
        store.set("annotations:r", "{not json").unwrap();
        let mut adapter = LocalStorageAdapter::new(store);
        assert!(matches!(adapter.load("r"), Err(StorageError::Json(_))));
    }
}
