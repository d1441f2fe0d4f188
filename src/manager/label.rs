//! Text labels derived from annotation bodies.

use std::collections::HashMap;

use crate::manager::FilterManager;
use crate::model::{Annotation, AnnotationId, Point, Purpose};
use crate::state::AnnotationState;

/// Body purposes that can produce a label, highest priority first.
const LABEL_PRIORITY: [Purpose; 4] = [
    Purpose::Identifying,
    Purpose::Classifying,
    Purpose::Tagging,
    Purpose::Commenting,
];

#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub annotation_id: AnnotationId,
    pub text: String,
    pub purpose: Purpose,
    /// Top-left corner of the annotation's bounds.
    pub anchor: Point,
    /// False while the annotation is filtered out.
    pub visible: bool,
}

impl Label {
    /// Derive the label of an annotation, if any body yields text.
    pub fn for_annotation(annotation: &Annotation) -> Option<Label> {
        let anchor = annotation.geometry().bounds()?.top_left();
        LABEL_PRIORITY.iter().find_map(|purpose| {
            annotation
                .bodies(*purpose)
                .find_map(|b| b.value.as_text())
                .filter(|text| !text.trim().is_empty())
                .map(|text| Label {
                    annotation_id: annotation.id.clone(),
                    text: text.to_string(),
                    purpose: *purpose,
                    anchor,
                    visible: true,
                })
        })
    }
}

#[derive(Debug, Clone)]
pub struct LabelManager {
    labels: HashMap<AnnotationId, Label>,
    shown: bool,
}

impl LabelManager {
    pub fn new() -> Self {
        Self {
            labels: HashMap::new(),
            shown: true,
        }
    }

    /// Rebuild every label from the state.
    pub fn refresh(&mut self, state: &AnnotationState, filters: &FilterManager) {
        self.labels = state
            .iter()
            .filter_map(|a| {
                Label::for_annotation(a).map(|mut label| {
                    label.visible = filters.is_visible(&a.id);
                    (a.id.clone(), label)
                })
            })
            .collect();
        log::debug!("Labels refreshed: {}", self.labels.len());
    }

    /// Recompute the label of one annotation.
    pub fn update(&mut self, annotation: &Annotation, visible: bool) {
        match Label::for_annotation(annotation) {
            Some(mut label) => {
                label.visible = visible;
                self.labels.insert(annotation.id.clone(), label);
            }
            None => {
                self.labels.remove(&annotation.id);
            }
        }
    }

    pub fn remove(&mut self, id: &str) {
        self.labels.remove(id);
    }

    /// Apply current filter visibility without rebuilding labels.
    pub fn sync_visibility(&mut self, filters: &FilterManager) {
        for (id, label) in self.labels.iter_mut() {
            label.visible = filters.is_visible(id);
        }
    }

    /// Show or hide every label.
    pub fn set_shown(&mut self, shown: bool) {
        self.shown = shown;
    }

    pub fn is_shown(&self) -> bool {
        self.shown
    }

    pub fn label(&self, id: &str) -> Option<&Label> {
        self.labels.get(id)
    }

    /// Labels to draw, in state order. Empty while labels are hidden.
    pub fn visible_labels<'a>(&'a self, state: &'a AnnotationState) -> Vec<&'a Label> {
        if !self.shown {
            return Vec::new();
        }
        state
            .ids()
            .iter()
            .filter_map(|id| self.labels.get(id))
            .filter(|l| l.visible)
            .collect()
    }
}

impl Default for LabelManager {
    fn default() -> Self {
        Self::new()
    }
}
