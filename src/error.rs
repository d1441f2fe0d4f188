//! Error types for annotation operations.

use thiserror::Error;

use crate::model::GeometryKind;

/// Invalid input passed to a shape.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShapeError {
    /// A shape was given geometry of a different kind than it renders
    #[error("Geometry mismatch: expected {expected}, found {found}")]
    GeometryMismatch {
        /// The kind the shape was created with
        expected: GeometryKind,
        /// The kind that was passed in
        found: GeometryKind,
    },

    /// Edit handle index out of range
    #[error("Edit handle {index} out of range for {kind} (has {count})")]
    HandleOutOfRange {
        /// The shape kind
        kind: GeometryKind,
        /// Requested handle index
        index: usize,
        /// Number of handles the shape has
        count: usize,
    },
}

/// Errors that can occur in the annotator and its managers.
#[derive(Error, Debug)]
pub enum AnnotatorError {
    /// Tool name not registered
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Tool name already registered
    #[error("Tool already registered: {0}")]
    DuplicateTool(String),

    /// Annotation id already present in the state
    #[error("Annotation already exists: {0}")]
    DuplicateAnnotation(String),

    /// Annotation id not present in the state
    #[error("Annotation not found: {0}")]
    AnnotationNotFound(String),

    /// Invalid shape input
    #[error(transparent)]
    Shape(#[from] ShapeError),
}

impl AnnotatorError {
    /// Short tag naming the kind of operation that failed.
    pub fn operation(&self) -> &'static str {
        match self {
            AnnotatorError::UnknownTool(_) => "activateTool",
            AnnotatorError::DuplicateTool(_) => "registerTool",
            AnnotatorError::DuplicateAnnotation(_) => "add",
            AnnotatorError::AnnotationNotFound(_) => "update",
            AnnotatorError::Shape(_) => "update",
        }
    }
}
