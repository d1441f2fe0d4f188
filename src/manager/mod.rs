//! Derived views over the annotation state: styles, filters, groups and labels.
//!
//! None of these managers own annotations. They are handed `&AnnotationState`
//! when they need to look annotations up and keep only ids of their own.

mod filter;
mod group;
mod label;
mod style;

pub use filter::{Filter, FilterEvent, FilterId, FilterManager, Predicate};
pub use group::{AnnotationGroup, GroupEvent, GroupId, GroupManager};
pub use label::{Label, LabelManager};
pub use style::StyleManager;
