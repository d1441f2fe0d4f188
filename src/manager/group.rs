//! Annotation groups.
//!
//! Membership is many-to-many: a group lists annotation ids and one
//! annotation may appear in several groups. Each group caches the union of
//! its members' bounds, recomputed when membership or a member's geometry
//! changes. Members whose annotation disappears are dropped; the group
//! itself stays until deleted.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::{EventEmitter, ListenerId};
use crate::model::{AnnotationId, Bounds, Color};
use crate::state::{AnnotationState, StateChange};

pub type GroupId = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationGroup {
    pub id: GroupId,
    pub name: String,
    pub annotations: Vec<AnnotationId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl AnnotationGroup {
    fn new(name: String, color: Color) -> Self {
        let now = Utc::now();
        Self {
            id: format!("group-{}", uuid::Uuid::new_v4()),
            name,
            annotations: Vec::new(),
            color: Some(color),
            metadata: serde_json::Map::new(),
            created: now,
            modified: now,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.annotations.iter().any(|a| a == id)
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupEvent {
    GroupCreated { id: GroupId },
    GroupUpdated { id: GroupId },
    GroupDeleted { id: GroupId },
    /// Selection changed; `None` when cleared.
    GroupSelected { id: Option<GroupId> },
}

#[derive(Default)]
pub struct GroupManager {
    groups: Vec<AnnotationGroup>,
    bounds: HashMap<GroupId, Bounds>,
    selected: Option<GroupId>,
    created_count: u32,
    events: EventEmitter<GroupEvent>,
}

impl GroupManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&mut self, handler: F) -> ListenerId
    where
        F: FnMut(&GroupEvent) + 'static,
    {
        self.events.on(handler)
    }

    pub fn off(&mut self, id: ListenerId) -> bool {
        self.events.off(id)
    }

    pub(crate) fn clear_listeners(&mut self) {
        self.events.clear();
    }

    /// Create a group from existing annotations. Unknown ids are skipped.
    pub fn create_group(
        &mut self,
        name: impl Into<String>,
        members: &[AnnotationId],
        state: &AnnotationState,
    ) -> GroupId {
        let color = Color::from_index(self.created_count);
        self.created_count = self.created_count.saturating_add(1);

        let mut group = AnnotationGroup::new(name.into(), color);
        for id in members {
            if state.contains(id) && !group.contains(id) {
                group.annotations.push(id.clone());
            }
        }
        let id = group.id.clone();
        log::debug!(
            "Group '{}' created with {} members",
            group.name,
            group.annotations.len()
        );
        self.groups.push(group);
        self.recompute_bounds(&id, state);
        self.events.emit(&GroupEvent::GroupCreated { id: id.clone() });
        id
    }

    /// Delete a group. Unknown ids are ignored.
    pub fn delete_group(&mut self, id: &str) {
        let before = self.groups.len();
        self.groups.retain(|g| g.id != id);
        if self.groups.len() == before {
            return;
        }
        self.bounds.remove(id);
        if self.selected.as_deref() == Some(id) {
            self.select_group(None);
        }
        self.events.emit(&GroupEvent::GroupDeleted { id: id.to_string() });
    }

    pub fn rename_group(&mut self, id: &str, name: impl Into<String>) {
        let name = name.into();
        self.modify(id, |g| g.name = name);
    }

    pub fn set_color(&mut self, id: &str, color: Option<Color>) {
        self.modify(id, |g| g.color = color);
    }

    pub fn set_metadata(&mut self, id: &str, key: impl Into<String>, value: serde_json::Value) {
        let key = key.into();
        self.modify(id, |g| {
            g.metadata.insert(key, value);
        });
    }

    /// Add existing annotations to a group.
    pub fn add_to_group(&mut self, id: &str, members: &[AnnotationId], state: &AnnotationState) {
        self.modify(id, |g| {
            for member in members {
                if state.contains(member) && !g.contains(member) {
                    g.annotations.push(member.clone());
                }
            }
        });
        self.recompute_bounds(id, state);
    }

    pub fn remove_from_group(
        &mut self,
        id: &str,
        members: &[AnnotationId],
        state: &AnnotationState,
    ) {
        self.modify(id, |g| g.annotations.retain(|a| !members.contains(a)));
        self.recompute_bounds(id, state);
    }

    fn modify<F>(&mut self, id: &str, f: F)
    where
        F: FnOnce(&mut AnnotationGroup),
    {
        let Some(group) = self.groups.iter_mut().find(|g| g.id == id) else {
            return;
        };
        let before = group.clone();
        f(group);
        if *group == before {
            return;
        }
        group.modified = Utc::now();
        self.events.emit(&GroupEvent::GroupUpdated { id: id.to_string() });
    }

    /// Select a group (or clear the selection with `None`).
    pub fn select_group(&mut self, id: Option<&str>) {
        let id = id.filter(|id| self.group(id).is_some()).map(str::to_string);
        if self.selected == id {
            return;
        }
        self.selected = id.clone();
        self.events.emit(&GroupEvent::GroupSelected { id });
    }

    pub fn selected_group(&self) -> Option<&AnnotationGroup> {
        self.selected.as_deref().and_then(|id| self.group(id))
    }

    pub fn group(&self, id: &str) -> Option<&AnnotationGroup> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn groups(&self) -> &[AnnotationGroup] {
        &self.groups
    }

    /// Every group the annotation belongs to.
    pub fn groups_of(&self, annotation_id: &str) -> Vec<&AnnotationGroup> {
        self.groups
            .iter()
            .filter(|g| g.contains(annotation_id))
            .collect()
    }

    /// Cached union of the members' bounds; `None` for empty groups.
    pub fn bounds(&self, id: &str) -> Option<Bounds> {
        self.bounds.get(id).copied()
    }

    fn recompute_bounds(&mut self, id: &str, state: &AnnotationState) {
        let Some(group) = self.groups.iter().find(|g| g.id == id) else {
            return;
        };
        let bounds = group
            .annotations
            .iter()
            .filter_map(|member| state.get_annotation(member))
            .filter_map(|a| a.geometry().bounds())
            .reduce(|acc, b| acc.union(&b));
        match bounds {
            Some(b) => {
                self.bounds.insert(id.to_string(), b);
            }
            None => {
                self.bounds.remove(id);
            }
        }
    }

    /// Keep membership and cached bounds in step with the state.
    pub fn handle_state_change(&mut self, change: &StateChange, state: &AnnotationState) {
        match change {
            StateChange::Added(_) => {}
            StateChange::Updated { current, .. } => {
                let affected: Vec<GroupId> = self
                    .groups_of(&current.id)
                    .into_iter()
                    .map(|g| g.id.clone())
                    .collect();
                for id in affected {
                    self.recompute_bounds(&id, state);
                    self.events.emit(&GroupEvent::GroupUpdated { id });
                }
            }
            StateChange::Removed(removed) => {
                let affected: Vec<GroupId> = self
                    .groups_of(&removed.id)
                    .into_iter()
                    .map(|g| g.id.clone())
                    .collect();
                for id in affected {
                    self.modify(&id, |g| g.annotations.retain(|a| *a != removed.id));
                    self.recompute_bounds(&id, state);
                }
            }
            StateChange::Reset => self.prune(state),
        }
    }

    /// Drop members that no longer exist and recompute every bounding box.
    pub fn prune(&mut self, state: &AnnotationState) {
        let ids: Vec<GroupId> = self.groups.iter().map(|g| g.id.clone()).collect();
        for id in ids {
            self.modify(&id, |g| g.annotations.retain(|a| state.contains(a)));
            self.recompute_bounds(&id, state);
        }
    }

    /// Serialize every group as a JSON array.
    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.groups)
    }

    /// Replace all groups with a JSON array produced by [`export_json`].
    /// Members missing from the state are dropped. Returns the group count.
    ///
    /// [`export_json`]: GroupManager::export_json
    pub fn import_json(
        &mut self,
        json: &str,
        state: &AnnotationState,
    ) -> Result<usize, serde_json::Error> {
        let mut groups: Vec<AnnotationGroup> = serde_json::from_str(json)?;
        for group in &mut groups {
            group.annotations.retain(|a| state.contains(a));
        }

        let old: Vec<GroupId> = self.groups.drain(..).map(|g| g.id).collect();
        self.bounds.clear();
        for id in old {
            self.events.emit(&GroupEvent::GroupDeleted { id });
        }
        self.select_group(None);

        let imported = u32::try_from(groups.len()).unwrap_or(u32::MAX);
        self.created_count = self.created_count.max(imported);
        self.groups = groups;
        let ids: Vec<GroupId> = self.groups.iter().map(|g| g.id.clone()).collect();
        for id in &ids {
            self.recompute_bounds(id, state);
            self.events.emit(&GroupEvent::GroupCreated { id: id.clone() });
        }
        log::info!("Imported {} groups", ids.len());
        Ok(ids.len())
    }
}

impl std::fmt::Debug for GroupManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupManager")
            .field("groups", &self.groups.len())
            .field("selected", &self.selected)
            .finish()
    }
}
