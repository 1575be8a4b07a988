//! The serializable layout document and its structural validation.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::item::{ItemId, LayoutItem};
use crate::registry::ModelRegistry;

/// A named, ordered list of layout items.
///
/// Item order affects render order only. This is the exact shape written to
/// layout files and to the autosave slot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDocument {
    /// Display name of the layout.
    #[serde(default, alias = "sceneName")]
    pub document_name: String,
    /// Items in render order.
    #[serde(default, alias = "objects")]
    pub items: Vec<LayoutItem>,
}

impl LayoutDocument {
    /// Create an empty document.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            document_name: name.into(),
            items: Vec::new(),
        }
    }

    /// Parse a layout file, accepting legacy field names.
    ///
    /// This only checks the JSON shape; call [`LayoutDocument::validate`]
    /// before committing the result anywhere.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Serialization`] if the JSON is malformed.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        let mut doc: Self = serde_json::from_str(json)?;
        for item in &mut doc.items {
            item.params.normalize_legacy_keys();
        }
        Ok(doc)
    }

    /// Serialize as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Serialization`] if serialization fails.
    pub fn to_json(&self) -> CoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Get an item by id.
    #[must_use]
    pub fn get(&self, id: &ItemId) -> Option<&LayoutItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    /// Get a mutable item by id.
    pub fn get_mut(&mut self, id: &ItemId) -> Option<&mut LayoutItem> {
        self.items.iter_mut().find(|item| &item.id == id)
    }

    /// Whether an item with this id exists.
    #[must_use]
    pub fn contains(&self, id: &ItemId) -> bool {
        self.get(id).is_some()
    }

    /// Remove an item, returning it.
    pub fn remove(&mut self, id: &ItemId) -> Option<LayoutItem> {
        let index = self.items.iter().position(|item| &item.id == id)?;
        Some(self.items.remove(index))
    }

    /// The desk, if any.
    #[must_use]
    pub fn desk(&self) -> Option<&LayoutItem> {
        self.items.iter().find(|item| item.is_desk())
    }

    /// Height of the desk's working surface, or 0 without a desk.
    #[must_use]
    pub fn desk_top(&self) -> f32 {
        self.desk().map_or(0.0, |desk| {
            desk.position.y + desk.params.f32("height").unwrap_or(0.0)
        })
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the document has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Check every structural invariant.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidDocument`] describing the first violation.
    pub fn validate(&self, registry: &ModelRegistry) -> CoreResult<()> {
        let mut seen = HashSet::with_capacity(self.items.len());
        for item in &self.items {
            if !seen.insert(&item.id) {
                return Err(invalid(format!("duplicate item id {}", item.id)));
            }
            if !registry.contains(item.kind) {
                return Err(CoreError::UnknownKind(item.kind.to_string()));
            }
            if !item.position.is_finite() || !item.rotation.is_finite() {
                return Err(invalid(format!("item {} has a non-finite transform", item.id)));
            }
        }

        let desks = self.items.iter().filter(|item| item.is_desk()).count();
        if desks > 1 {
            return Err(invalid(format!("{desks} desks, at most one allowed")));
        }

        for item in &self.items {
            if let Some(host_id) = &item.mounted_to_id {
                if item.is_desk() {
                    return Err(invalid(format!("desk {} is mounted on {host_id}", item.id)));
                }
                let host = self
                    .get(host_id)
                    .ok_or_else(|| invalid(format!("{} is mounted on missing {host_id}", item.id)))?;
                if host.id == item.id {
                    return Err(invalid(format!("{} is mounted on itself", item.id)));
                }
                if !registry.is_mount_host(host.kind) {
                    return Err(invalid(format!("{} is mounted on non-host {}", item.id, host.kind)));
                }
                if host.params.mounted_item_id().as_ref() != Some(&item.id) {
                    return Err(invalid(format!(
                        "{host_id} does not point back to mounted item {}",
                        item.id
                    )));
                }
            }

            if let Some(dependent_id) = item.params.mounted_item_id() {
                if !registry.is_mount_host(item.kind) {
                    return Err(invalid(format!("{} ({}) cannot host items", item.id, item.kind)));
                }
                let dependent = self.get(&dependent_id).ok_or_else(|| {
                    invalid(format!("{} hosts missing item {dependent_id}", item.id))
                })?;
                if dependent.mounted_to_id.as_ref() != Some(&item.id) {
                    return Err(invalid(format!(
                        "{dependent_id} does not point back to host {}",
                        item.id
                    )));
                }
            }

            if self.mount_chain_cycles(item) {
                return Err(invalid(format!("mount cycle through {}", item.id)));
            }
        }

        Ok(())
    }

    /// Whether following `mounted_to_id` from `start` returns to `start`.
    fn mount_chain_cycles(&self, start: &LayoutItem) -> bool {
        let mut current = start.mounted_to_id.as_ref();
        for _ in 0..self.items.len() {
            match current {
                Some(id) if id == &start.id => return true,
                Some(id) => current = self.get(id).and_then(|item| item.mounted_to_id.as_ref()),
                None => return false,
            }
        }
        current.is_some()
    }
}

fn invalid(message: String) -> CoreError {
    CoreError::InvalidDocument(message)
}
