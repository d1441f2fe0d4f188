//! Data models: geometry, annotation records and styles.

mod annotation;
mod geometry;
mod style;

pub use annotation::{
    Annotation, AnnotationBody, AnnotationId, AnnotationType, BodyValue, Creator, Purpose,
    Selector, Target, generate_id,
};
pub use geometry::{
    ArrowHead, ArrowPosition, Bounds, DEFAULT_FONT_SIZE, Geometry, GeometryKind, ImageBounds,
    POINT_HIT_RADIUS, Point, TextStyle, distance_to_segment, text_extent,
};
pub use style::{Color, Style, StyleOption, Theme, ThemeChoice};
