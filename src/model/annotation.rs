//! Annotation records in the W3C Web Annotation shape.
//!
//! This is the persisted representation: a JSON object with `id`,
//! `type: "Annotation"`, `body[]` and `target.selector.geometry`. It
//! round-trips unchanged through every storage adapter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::geometry::Geometry;

/// Unique identifier for an annotation.
pub type AnnotationId = String;

/// Generate a fresh fragment-style annotation id (`#<uuid>`).
pub fn generate_id() -> AnnotationId {
    format!("#{}", uuid::Uuid::new_v4())
}

/// The `type` field of a Web Annotation. Only `"Annotation"` is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AnnotationType {
    #[default]
    Annotation,
}

/// Why a body is attached to an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Purpose {
    Commenting,
    Tagging,
    Classifying,
    Identifying,
    Linking,
    Describing,
    Bookmarking,
}

/// Body content. Text for comments and tags, structured for classifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BodyValue {
    Text(String),
    Structured(serde_json::Value),
}

impl BodyValue {
    /// The plain text of this value, if it has one.
    ///
    /// Structured values expose their `label` field, if present.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            BodyValue::Text(s) => Some(s),
            BodyValue::Structured(v) => v.get("label").and_then(|l| l.as_str()),
        }
    }
}

/// An agent (user or software) that created something.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creator {
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Creator {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: None,
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Content attached to an annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationBody {
    #[serde(rename = "type", default = "default_body_type")]
    pub kind: String,
    pub purpose: Purpose,
    pub value: BodyValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<Creator>,
}

fn default_body_type() -> String {
    "TextualBody".to_string()
}

impl AnnotationBody {
    /// A textual body with the given purpose.
    pub fn text(purpose: Purpose, value: impl Into<String>) -> Self {
        Self {
            kind: default_body_type(),
            purpose,
            value: BodyValue::Text(value.into()),
            creator: None,
        }
    }

    pub fn comment(value: impl Into<String>) -> Self {
        Self::text(Purpose::Commenting, value)
    }

    pub fn tag(value: impl Into<String>) -> Self {
        Self::text(Purpose::Tagging, value)
    }

    /// A classification body with a structured value.
    pub fn classification(value: serde_json::Value) -> Self {
        Self {
            kind: "Classification".to_string(),
            purpose: Purpose::Classifying,
            value: BodyValue::Structured(value),
            creator: None,
        }
    }
}

/// Wrapper around the geometry describing a region of the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selector {
    pub geometry: Geometry,
}

/// What the annotation points at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub selector: Selector,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// A single annotation on an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(rename = "@context", default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Unique identifier within a state container.
    pub id: AnnotationId,
    #[serde(rename = "type", default)]
    pub kind: AnnotationType,
    #[serde(default)]
    pub body: Vec<AnnotationBody>,
    pub target: Target,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<Creator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motivation: Option<String>,
}

impl Annotation {
    /// Create an annotation with a generated id and a `created` timestamp.
    pub fn new(geometry: Geometry) -> Self {
        Self::with_id(generate_id(), geometry).created_now()
    }

    /// Create an annotation with an explicit id and no timestamps.
    pub fn with_id(id: impl Into<AnnotationId>, geometry: Geometry) -> Self {
        Self {
            context: None,
            id: id.into(),
            kind: AnnotationType::Annotation,
            body: Vec::new(),
            target: Target {
                selector: Selector { geometry },
                source: None,
            },
            creator: None,
            created: None,
            modified: None,
            motivation: None,
        }
    }

    fn created_now(mut self) -> Self {
        self.created = Some(Utc::now());
        self
    }

    pub fn with_body(mut self, body: AnnotationBody) -> Self {
        self.body.push(body);
        self
    }

    pub fn with_creator(mut self, creator: Creator) -> Self {
        self.creator = Some(creator);
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.target.source = Some(source.into());
        self
    }

    pub fn geometry(&self) -> &Geometry {
        &self.target.selector.geometry
    }

    /// A copy of this annotation with its geometry replaced.
    pub fn with_geometry(&self, geometry: Geometry) -> Self {
        let mut updated = self.clone();
        updated.target.selector.geometry = geometry;
        updated
    }

    /// Set `modified` to now.
    pub fn touch(&mut self) {
        self.modified = Some(Utc::now());
    }

    /// Bodies with the given purpose.
    pub fn bodies(&self, purpose: Purpose) -> impl Iterator<Item = &AnnotationBody> {
        self.body.iter().filter(move |b| b.purpose == purpose)
    }

    /// Text values of every tagging body.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.bodies(Purpose::Tagging).filter_map(|b| b.value.as_text())
    }

    /// Id of the annotation's creator, if known.
    pub fn creator_id(&self) -> Option<&str> {
        self.creator.as_ref().map(|c| c.id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::geometry::Point;

    #[test]
    fn test_generated_ids_are_unique_fragments() {
        let a = Annotation::new(Geometry::Point { x: 1.0, y: 1.0 });
        let b = Annotation::new(Geometry::Point { x: 1.0, y: 1.0 });
        assert!(a.id.starts_with('#'));
        assert_ne!(a.id, b.id);
        assert!(a.created.is_some());
    }

    #[test]
    fn test_wire_format_shape() {
        let ann = Annotation::with_id(
            "#a1",
            Geometry::Rectangle {
                x: 0.0,
                y: 0.0,
                w: 10.0,
                h: 10.0,
            },
        )
        .with_body(AnnotationBody::tag("tree"))
        .with_creator(Creator::new("u1"));

        let json = serde_json::to_value(&ann).unwrap();
        assert_eq!(json["type"], "Annotation");
        assert_eq!(json["id"], "#a1");
        assert_eq!(json["body"][0]["purpose"], "tagging");
        assert_eq!(json["body"][0]["value"], "tree");
        assert_eq!(json["target"]["selector"]["geometry"]["type"], "rectangle");
        assert!(json.get("modified").is_none());
    }

    #[test]
    fn test_rejects_non_annotation_type() {
        let json = r#"{"id":"x","type":"Collection","target":{"selector":{"geometry":{"type":"point","x":1,"y":2}}}}"#;
        assert!(serde_json::from_str::<Annotation>(json).is_err());
    }

    #[test]
    fn test_parses_structured_classification() {
        let json = r##"{
            "id": "#c",
            "type": "Annotation",
            "body": [
                {"type": "Classification", "purpose": "classifying", "value": {"label": "cell", "confidence": 0.9}},
                {"purpose": "commenting", "value": "looks odd"}
            ],
            "target": {"source": "slide.dzi", "selector": {"geometry": {"type": "polygon", "points": [{"x":0,"y":0},{"x":5,"y":0},{"x":5,"y":5}]}}}
        }"##;
        let ann: Annotation = serde_json::from_str(json).unwrap();
        assert_eq!(ann.body.len(), 2);
        assert_eq!(ann.body[0].value.as_text(), Some("cell"));
        assert_eq!(ann.body[1].kind, "TextualBody");
        assert_eq!(ann.target.source.as_deref(), Some("slide.dzi"));
        assert_eq!(
            ann.geometry(),
            &Geometry::Polygon {
                points: vec![Point::new(0.0, 0.0), Point::new(5.0, 0.0), Point::new(5.0, 5.0)]
            }
        );
    }

    #[test]
    fn test_tags_and_creator() {
        let ann = Annotation::with_id("#t", Geometry::Point { x: 0.0, y: 0.0 })
            .with_body(AnnotationBody::tag("x"))
            .with_body(AnnotationBody::comment("not a tag"))
            .with_body(AnnotationBody::tag("y"))
            .with_creator(Creator::new("u2").with_name("Uma"));
        assert_eq!(ann.tags().collect::<Vec<_>>(), vec!["x", "y"]);
        assert_eq!(ann.creator_id(), Some("u2"));
    }
}
