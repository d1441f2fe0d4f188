//! Deep-zoom image annotator
//!
//! Annotation state, drawing tools, styling, grouping, filtering and
//! persistence for an image annotation layer on top of a deep-zoom viewer.
//! The viewer and the storage backends are reached through small adapter
//! traits; drawing output is a plain SVG element tree.

pub mod annotator;
pub mod config;
pub mod error;
pub mod event;
pub mod manager;
pub mod model;
pub mod persistence;
pub mod render;
pub mod shape;
pub mod state;
pub mod tool;

pub use annotator::{Annotator, AnnotatorEvent, ViewerAdapter, ViewerEvent};
pub use config::{AnnotatorConfig, ConfigError, LogLevel};
pub use error::{AnnotatorError, ShapeError};
pub use event::{EventEmitter, ListenerId};
pub use model::{Annotation, AnnotationBody, Creator, Geometry, ImageBounds, Point};
pub use persistence::{StorageAdapter, StorageError};
pub use state::AnnotationState;

// WASM entry point
#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::*;
