//! Annotation persistence: storage adapters and the debounced manager.

mod adapter;
#[cfg(target_arch = "wasm32")]
mod browser;
mod error;
#[cfg(not(target_arch = "wasm32"))]
mod file_store;
mod indexed;
mod manager;

pub use adapter::{
    DEFAULT_STORAGE_PREFIX, KeyValueStore, LocalStorageAdapter, MemoryStore, StorageAdapter,
};
#[cfg(target_arch = "wasm32")]
pub use browser::BrowserStorage;
pub use error::StorageError;
#[cfg(not(target_arch = "wasm32"))]
pub use file_store::FileStore;
pub use indexed::{AnnotationRecord, DATABASE_VERSION, IndexedStore, Transaction};
pub use manager::{DEFAULT_SAVE_DEBOUNCE, PersistenceEvent, PersistenceManager};
