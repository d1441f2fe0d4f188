//! Effective style resolution.
//!
//! `effective_style(id) = theme default ⊕ override(id)`, with the theme's
//! selected options layered on top for the selected annotation. Nothing here
//! is persisted.

use std::collections::HashMap;

use crate::model::{AnnotationId, Style, StyleOption, Theme, ThemeChoice};

#[derive(Debug, Clone, Default)]
pub struct StyleManager {
    theme: Theme,
    overrides: HashMap<AnnotationId, Vec<StyleOption>>,
}

impl StyleManager {
    pub fn new(theme: Theme) -> Self {
        Self {
            theme,
            overrides: HashMap::new(),
        }
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// Switch theme presets. Per-annotation overrides are kept.
    pub fn set_theme(&mut self, choice: ThemeChoice) {
        if self.theme.choice != choice {
            log::debug!("Style: theme set to {:?}", choice);
            self.theme = Theme::from_choice(choice);
        }
    }

    /// Set one override option for an annotation, replacing any earlier
    /// option for the same property.
    pub fn set_option(&mut self, id: &str, option: StyleOption) {
        let options = self.overrides.entry(id.to_string()).or_default();
        options.retain(|existing| !existing.same_property(&option));
        options.push(option);
    }

    /// Replace every override of an annotation.
    pub fn set_overrides(&mut self, id: &str, options: Vec<StyleOption>) {
        if options.is_empty() {
            self.overrides.remove(id);
        } else {
            self.overrides.insert(id.to_string(), options);
        }
    }

    pub fn overrides(&self, id: &str) -> Option<&[StyleOption]> {
        self.overrides.get(id).map(Vec::as_slice)
    }

    pub fn clear_overrides(&mut self, id: &str) {
        self.overrides.remove(id);
    }

    /// Drop overrides of annotations that no longer exist.
    pub fn retain<F>(&mut self, mut exists: F)
    where
        F: FnMut(&str) -> bool,
    {
        self.overrides.retain(|id, _| exists(id));
    }

    pub fn effective_style(&self, id: &str, selected: bool) -> Style {
        let mut style = match self.overrides.get(id) {
            Some(options) => self.theme.default_style.with_options(options),
            None => self.theme.default_style.clone(),
        };
        if selected {
            for option in &self.theme.selected {
                style.apply(option);
            }
        }
        style
    }

    pub fn preview_style(&self) -> &Style {
        &self.theme.preview_style
    }
}
