//! The layout store: single source of truth for the current document.
//!
//! Every mutation validates first and commits second, so an `Err` always
//! leaves the document untouched. Successful commits record a history
//! checkpoint (unless a gesture is open), queue a [`ReconcileRequest`] for the
//! scene side, and notify subscribers.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::document::LayoutDocument;
use crate::error::CoreResult;
use crate::event::{ChangeClass, ReconcileRequest, StoreEvent, SubscriptionId};
use crate::history::History;
use crate::item::{Coord3, ItemId, ItemKind, LayoutItem, LEGACY_MOUNT_SLOT, MOUNT_SLOT};
use crate::persist::AutosaveSlot;
use crate::registry::ModelRegistry;

/// Result type for store mutations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Reasons a store mutation was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The referenced item does not exist.
    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),
    /// A desk already exists.
    #[error("A desk already exists; only one is allowed")]
    DeskCapacityExceeded,
    /// Asynchronously resolved kinds go through `add_imported`.
    #[error("{0} items must be added with add_imported")]
    AsyncKind(ItemKind),
    /// No recipe is registered for the kind.
    #[error("No recipe registered for kind: {0}")]
    UnregisteredKind(ItemKind),
    /// The item cannot host a mounted item.
    #[error("Item {0} cannot host a mounted item")]
    NotMountHost(ItemId),
    /// The host's slot is taken.
    #[error("Host {host} already holds {occupant}")]
    HostOccupied {
        /// Host item.
        host: ItemId,
        /// Current occupant.
        occupant: ItemId,
    },
    /// The mount would break a structural invariant.
    #[error("Cannot mount {item} on {host}: {reason}")]
    InvalidMount {
        /// Host item.
        host: ItemId,
        /// Item to mount.
        item: ItemId,
        /// What would break.
        reason: String,
    },
    /// The host has nothing mounted.
    #[error("Host {0} has nothing mounted")]
    NotMounted(ItemId),
    /// The patch touches fields that cannot be patched.
    #[error("Invalid patch: {0}")]
    InvalidPatch(String),
}

/// A partial update of one item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemPatch {
    /// New position.
    pub position: Option<Coord3>,
    /// New rotation (degrees).
    pub rotation: Option<Coord3>,
    /// New display name.
    pub name: Option<String>,
    /// Params to merge.
    pub params: Map<String, Value>,
}

impl ItemPatch {
    /// An empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the position.
    #[must_use]
    pub fn position(mut self, position: Coord3) -> Self {
        self.position = Some(position);
        self
    }

    /// Set the rotation.
    #[must_use]
    pub fn rotation(mut self, rotation: Coord3) -> Self {
        self.rotation = Some(rotation);
        self
    }

    /// Set the name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Merge one param.
    #[must_use]
    pub fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    /// How applying this patch affects the scene.
    #[must_use]
    pub fn classify(&self) -> ChangeClass {
        if !self.params.is_empty() {
            ChangeClass::Topology
        } else if self.position.is_some() || self.rotation.is_some() {
            ChangeClass::Transform
        } else {
            ChangeClass::DataOnly
        }
    }

    fn check(&self) -> StoreResult<()> {
        if self.params.contains_key(MOUNT_SLOT) || self.params.contains_key(LEGACY_MOUNT_SLOT) {
            return Err(StoreError::InvalidPatch(
                "the mount slot is managed by mount/unmount".to_string(),
            ));
        }
        let finite = |c: &Option<Coord3>| c.iter().all(|v| v.is_finite());
        if !finite(&self.position) || !finite(&self.rotation) {
            return Err(StoreError::InvalidPatch("non-finite transform".to_string()));
        }
        Ok(())
    }
}

type Listener = Box<dyn FnMut(&StoreEvent)>;

/// Owner of the live [`LayoutDocument`] and its undo history.
pub struct LayoutStore {
    document: LayoutDocument,
    registry: Arc<ModelRegistry>,
    history: History,
    autosave: Option<Box<dyn AutosaveSlot>>,
    autosave_enabled: bool,
    gesture_active: bool,
    pending: Option<ReconcileRequest>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl fmt::Debug for LayoutStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutStore")
            .field("document", &self.document)
            .field("history_index", &self.history.index())
            .field("autosave", &self.autosave.is_some())
            .field("gesture_active", &self.gesture_active)
            .field("pending", &self.pending)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl LayoutStore {
    /// An empty, unnamed store without autosave.
    #[must_use]
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self {
            document: LayoutDocument::default(),
            registry,
            history: History::new(),
            autosave: None,
            autosave_enabled: true,
            gesture_active: false,
            pending: None,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Attach an autosave slot written after every checkpoint.
    #[must_use]
    pub fn with_autosave(mut self, slot: Box<dyn AutosaveSlot>) -> Self {
        self.autosave = Some(slot);
        self
    }

    /// Bound the history to `capacity` snapshots.
    #[must_use]
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history = History::with_capacity(capacity);
        self
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// The live document.
    #[must_use]
    pub fn document(&self) -> &LayoutDocument {
        &self.document
    }

    /// The model registry.
    #[must_use]
    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// A shared handle to the model registry.
    #[must_use]
    pub fn registry_handle(&self) -> Arc<ModelRegistry> {
        Arc::clone(&self.registry)
    }

    /// The undo history.
    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Get an item by id.
    #[must_use]
    pub fn get(&self, id: &ItemId) -> Option<&LayoutItem> {
        self.document.get(id)
    }

    /// Whether the document has a desk.
    #[must_use]
    pub fn has_desk(&self) -> bool {
        self.document.desk().is_some()
    }

    /// The desk, if any.
    #[must_use]
    pub fn desk(&self) -> Option<&LayoutItem> {
        self.document.desk()
    }

    /// Desk surface height, or 0 without a desk.
    #[must_use]
    pub fn desk_top(&self) -> f32 {
        self.document.desk_top()
    }

    /// Mount hosts whose slot is free.
    #[must_use]
    pub fn available_hosts(&self) -> Vec<&LayoutItem> {
        self.document
            .items
            .iter()
            .filter(|item| {
                self.registry.is_mount_host(item.kind) && item.params.mounted_item_id().is_none()
            })
            .collect()
    }

    /// Whether a gesture (drag) is open.
    #[must_use]
    pub fn is_gesture_active(&self) -> bool {
        self.gesture_active
    }

    /// Take the accumulated reconcile work, leaving none pending.
    pub fn take_reconcile_request(&mut self) -> Option<ReconcileRequest> {
        self.pending.take()
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    /// Register a listener called synchronously after each commit.
    pub fn subscribe(&mut self, listener: impl FnMut(&StoreEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sub, _)| *sub != id);
        self.listeners.len() != before
    }

    // ------------------------------------------------------------------
    // Item mutations
    // ------------------------------------------------------------------

    /// Add a default item of `kind`, resting on the desk top (or the floor).
    ///
    /// # Errors
    ///
    /// [`StoreError::DeskCapacityExceeded`] for a second desk,
    /// [`StoreError::AsyncKind`] for imported models and
    /// [`StoreError::UnregisteredKind`] for kinds without a recipe.
    pub fn add(&mut self, kind: ItemKind) -> StoreResult<ItemId> {
        if self.registry.is_async(kind) {
            return Err(self.reject(StoreError::AsyncKind(kind)));
        }
        let item = self.create_item(kind)?;
        Ok(self.append(item))
    }

    /// Add an imported model carrying its file as a data URL.
    ///
    /// # Errors
    ///
    /// [`StoreError::UnregisteredKind`] if the registry has no imported-model recipe.
    pub fn add_imported(&mut self, file_name: &str, data_url: &str) -> StoreResult<ItemId> {
        let mut item = self.create_item(ItemKind::ImportedModel)?;
        item.params.set("fileName", file_name);
        item.params.set("dataUrl", data_url);
        item.name = Some(file_name.to_string());
        Ok(self.append(item))
    }

    fn create_item(&self, kind: ItemKind) -> StoreResult<LayoutItem> {
        if kind.is_desk() && self.has_desk() {
            return Err(self.reject(StoreError::DeskCapacityExceeded));
        }
        self.registry
            .create_default(kind, ItemId::new(), self.desk_top())
            .map_err(|_| self.reject(StoreError::UnregisteredKind(kind)))
    }

    fn append(&mut self, item: LayoutItem) -> ItemId {
        let id = item.id.clone();
        tracing::debug!(id = %id, kind = %item.kind, "item added");
        self.document.items.push(item);
        self.request(ReconcileRequest::Full);
        self.emit(&StoreEvent::ItemAdded { id: id.clone() });
        self.checkpoint();
        id
    }

    /// Patch an item.
    ///
    /// # Errors
    ///
    /// [`StoreError::ItemNotFound`] or [`StoreError::InvalidPatch`].
    pub fn update(&mut self, id: &ItemId, patch: ItemPatch) -> StoreResult<ChangeClass> {
        if let Err(e) = patch.check() {
            return Err(self.reject(e));
        }
        let change = patch.classify();
        let Some(item) = self.document.get_mut(id) else {
            return Err(self.reject(StoreError::ItemNotFound(id.clone())));
        };

        if let Some(position) = patch.position {
            item.position = position;
        }
        if let Some(rotation) = patch.rotation {
            item.rotation = rotation;
        }
        if let Some(name) = patch.name {
            item.name = Some(name);
        }
        item.params.merge(&patch.params);

        match change {
            ChangeClass::Topology => self.request(ReconcileRequest::Full),
            ChangeClass::Transform => {
                self.request(ReconcileRequest::Transforms(BTreeSet::from([id.clone()])));
            }
            ChangeClass::DataOnly => {}
        }
        self.emit(&StoreEvent::ItemUpdated {
            id: id.clone(),
            change,
        });
        if !self.gesture_active {
            self.checkpoint();
        }
        Ok(change)
    }

    /// Mount `item_id` on the host `stand_id`.
    ///
    /// # Errors
    ///
    /// Any violated precondition: missing ids, a non-host, an occupied slot,
    /// mounting a desk or an already mounted item, or creating a cycle.
    pub fn mount(&mut self, stand_id: &ItemId, item_id: &ItemId) -> StoreResult<()> {
        if let Err(e) = self.check_mount(stand_id, item_id) {
            return Err(self.reject(e));
        }

        if let Some(stand) = self.document.get_mut(stand_id) {
            stand.params.set_mounted_item_id(Some(item_id));
        }
        if let Some(item) = self.document.get_mut(item_id) {
            item.mounted_to_id = Some(stand_id.clone());
        }
        tracing::debug!(host = %stand_id, item = %item_id, "item mounted");

        self.request(ReconcileRequest::Full);
        self.emit(&StoreEvent::Mounted {
            host: stand_id.clone(),
            item: item_id.clone(),
        });
        self.checkpoint();
        Ok(())
    }

    fn check_mount(&self, stand_id: &ItemId, item_id: &ItemId) -> StoreResult<()> {
        let stand = self
            .get(stand_id)
            .ok_or_else(|| StoreError::ItemNotFound(stand_id.clone()))?;
        let item = self
            .get(item_id)
            .ok_or_else(|| StoreError::ItemNotFound(item_id.clone()))?;
        let invalid = |reason: &str| StoreError::InvalidMount {
            host: stand_id.clone(),
            item: item_id.clone(),
            reason: reason.to_string(),
        };

        if stand_id == item_id {
            return Err(invalid("an item cannot host itself"));
        }
        if !self.registry.is_mount_host(stand.kind) {
            return Err(StoreError::NotMountHost(stand_id.clone()));
        }
        if let Some(occupant) = stand.params.mounted_item_id() {
            return Err(StoreError::HostOccupied {
                host: stand_id.clone(),
                occupant,
            });
        }
        if item.is_desk() {
            return Err(invalid("desks cannot be mounted"));
        }
        if item.is_mounted() {
            return Err(invalid("item is already mounted"));
        }

        // Walk up from the stand; reaching the item means a loop.
        let mut host = stand.mounted_to_id.as_ref();
        for _ in 0..self.document.len() {
            match host {
                Some(id) if id == item_id => return Err(invalid("mount would create a cycle")),
                Some(id) => host = self.get(id).and_then(|h| h.mounted_to_id.as_ref()),
                None => break,
            }
        }
        Ok(())
    }

    /// Release whatever is mounted on `stand_id`. Returns the freed item.
    ///
    /// # Errors
    ///
    /// [`StoreError::ItemNotFound`] or [`StoreError::NotMounted`].
    pub fn unmount(&mut self, stand_id: &ItemId) -> StoreResult<ItemId> {
        match self.release(stand_id) {
            Ok(item_id) => {
                self.request(ReconcileRequest::Full);
                self.checkpoint();
                Ok(item_id)
            }
            Err(e) => Err(self.reject(e)),
        }
    }

    /// Clear both sides of a mount and drop the freed item onto the desk top
    /// under the stand.
    fn release(&mut self, stand_id: &ItemId) -> StoreResult<ItemId> {
        let desk_top = self.desk_top();
        let stand = self
            .document
            .get_mut(stand_id)
            .ok_or_else(|| StoreError::ItemNotFound(stand_id.clone()))?;
        let item_id = stand
            .params
            .mounted_item_id()
            .ok_or_else(|| StoreError::NotMounted(stand_id.clone()))?;
        stand.params.set_mounted_item_id(None);
        let footprint = stand.position;

        if let Some(item) = self.document.get_mut(&item_id) {
            item.mounted_to_id = None;
            item.position = Coord3::new(footprint.x, desk_top, footprint.z);
        }
        tracing::debug!(host = %stand_id, item = %item_id, "item unmounted");
        self.emit(&StoreEvent::Unmounted {
            host: stand_id.clone(),
            item: item_id.clone(),
        });
        Ok(item_id)
    }

    /// Delete an item. Deleting the desk clears the whole document.
    ///
    /// The pre-delete state is checkpointed first (unless it already is the
    /// current snapshot) and the post-delete state after, so the delete can be
    /// both undone and redone.
    ///
    /// # Errors
    ///
    /// [`StoreError::ItemNotFound`].
    pub fn delete(&mut self, id: &ItemId) -> StoreResult<()> {
        let Some(item) = self.get(id).cloned() else {
            return Err(self.reject(StoreError::ItemNotFound(id.clone())));
        };

        let already_saved = self
            .history
            .current()
            .is_some_and(|snapshot| snapshot.document() == &self.document);
        if !already_saved {
            self.checkpoint();
        }

        if item.params.mounted_item_id().is_some() {
            self.release(id)?;
        }
        if let Some(host) = &item.mounted_to_id {
            self.release(host)?;
        }

        let cascade = item.is_desk();
        if cascade {
            self.document.items.clear();
        } else {
            self.document.remove(id);
        }
        tracing::debug!(id = %id, cascade, "item deleted");

        self.request(ReconcileRequest::Full);
        self.emit(&StoreEvent::ItemDeleted {
            id: id.clone(),
            cascade,
        });
        self.checkpoint();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Document-level operations
    // ------------------------------------------------------------------

    /// Start a fresh, empty layout. History is reset without a checkpoint.
    pub fn new_layout(&mut self, name: impl Into<String>) {
        self.document = LayoutDocument::new(name);
        self.history.clear();
        self.autosave_enabled = true;
        self.gesture_active = false;
        tracing::info!(name = %self.document.document_name, "new layout");
        self.request(ReconcileRequest::Full);
        self.emit(&StoreEvent::DocumentReplaced);
    }

    /// Rename the layout.
    pub fn rename(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.document.document_name.clone_from(&name);
        self.emit(&StoreEvent::Renamed { name });
        self.checkpoint();
    }

    /// Replace the whole document after validating it.
    ///
    /// # Errors
    ///
    /// [`CoreError::InvalidDocument`](crate::CoreError::InvalidDocument) or
    /// [`CoreError::UnknownKind`](crate::CoreError::UnknownKind); the live
    /// document is untouched on error.
    pub fn replace_document(&mut self, mut document: LayoutDocument) -> CoreResult<()> {
        for item in &mut document.items {
            item.params.normalize_legacy_keys();
        }
        if let Err(e) = document.validate(&self.registry) {
            tracing::debug!("rejected document: {e}");
            return Err(e);
        }
        tracing::info!(
            name = %document.document_name,
            items = document.len(),
            "document replaced"
        );
        self.document = document;
        self.autosave_enabled = true;
        self.request(ReconcileRequest::Full);
        self.emit(&StoreEvent::DocumentReplaced);
        self.checkpoint();
        Ok(())
    }

    /// Parse and import a layout file.
    ///
    /// # Errors
    ///
    /// Any parse or validation error; the live document is untouched on error.
    pub fn import_json(&mut self, json: &str) -> CoreResult<()> {
        let document = LayoutDocument::from_json(json)?;
        self.replace_document(document)
    }

    /// Serialize the live document as a layout file.
    ///
    /// # Errors
    ///
    /// Returns a serialization error.
    pub fn export_json(&self) -> CoreResult<String> {
        self.document.to_json()
    }

    /// Load the autosave slot, if one is attached and holds a valid document.
    ///
    /// A corrupt slot is logged and cleared. Returns whether a document was
    /// restored.
    pub fn restore_autosave(&mut self) -> bool {
        let payload = match self.autosave.as_ref().map(|slot| slot.read()) {
            None | Some(Ok(None)) => return false,
            Some(Ok(Some(payload))) => payload,
            Some(Err(e)) => {
                tracing::warn!("Failed to read autosave: {e}");
                return false;
            }
        };

        let parsed = LayoutDocument::from_json(&payload)
            .and_then(|doc| doc.validate(&self.registry).map(|()| doc));
        match parsed {
            Ok(document) => {
                tracing::info!(
                    name = %document.document_name,
                    items = document.len(),
                    "autosave restored"
                );
                self.document = document;
                self.history.clear();
                self.history.checkpoint(&self.document);
                self.autosave_enabled = true;
                self.request(ReconcileRequest::Full);
                self.emit(&StoreEvent::DocumentReplaced);
                true
            }
            Err(e) => {
                tracing::warn!("Discarding corrupt autosave: {e}");
                if let Some(slot) = self.autosave.as_mut() {
                    if let Err(e) = slot.clear() {
                        tracing::warn!("Failed to clear autosave: {e}");
                    }
                }
                false
            }
        }
    }

    /// Close the layout: clear the document, the history and the autosave slot.
    pub fn exit(&mut self) {
        self.document = LayoutDocument::default();
        self.history.clear();
        self.gesture_active = false;
        self.autosave_enabled = false;
        if let Some(slot) = self.autosave.as_mut() {
            if let Err(e) = slot.clear() {
                tracing::warn!("Failed to clear autosave: {e}");
            }
        }
        tracing::info!("layout closed");
        self.request(ReconcileRequest::Full);
        self.emit(&StoreEvent::DocumentReplaced);
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    /// Record the live document in history and autosave it.
    ///
    /// Returns the new history index.
    pub fn checkpoint(&mut self) -> usize {
        let index = self.history.checkpoint(&self.document);
        self.write_autosave();
        self.emit(&StoreEvent::Checkpointed { index });
        index
    }

    fn write_autosave(&mut self) {
        if !self.autosave_enabled {
            return;
        }
        let Some(slot) = self.autosave.as_mut() else {
            return;
        };
        let json = match self.document.to_json() {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("Failed to serialize autosave: {e}");
                return;
            }
        };
        if let Err(e) = slot.write(&json) {
            tracing::warn!("Failed to write autosave: {e}");
        }
    }

    /// Restore the previous snapshot. Returns `false` at the start of history.
    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(document) => self.restore_snapshot(document),
            None => false,
        }
    }

    /// Restore the next snapshot. Returns `false` at the end of history.
    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(document) => self.restore_snapshot(document),
            None => false,
        }
    }

    fn restore_snapshot(&mut self, document: LayoutDocument) -> bool {
        self.document = document;
        self.request(ReconcileRequest::Full);
        self.emit(&StoreEvent::HistoryMoved {
            index: self.history.index(),
        });
        true
    }

    /// Open a gesture: updates stop checkpointing until [`end_gesture`](Self::end_gesture).
    pub fn begin_gesture(&mut self) {
        self.gesture_active = true;
    }

    /// Close the gesture with exactly one checkpoint. Returns `false` if none was open.
    pub fn end_gesture(&mut self) -> bool {
        if !self.gesture_active {
            return false;
        }
        self.gesture_active = false;
        self.checkpoint();
        true
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn request(&mut self, request: ReconcileRequest) {
        self.pending = Some(match self.pending.take() {
            Some(pending) => pending.merge(request),
            None => request,
        });
    }

    fn emit(&mut self, event: &StoreEvent) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }

    #[allow(clippy::unused_self)]
    fn reject(&self, error: StoreError) -> StoreError {
        tracing::debug!("rejected: {error}");
        error
    }
}

impl Default for LayoutStore {
    fn default() -> Self {
        Self::new(Arc::new(ModelRegistry::with_builtin()))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::persist::MemoryAutosave;

    fn store() -> LayoutStore {
        let mut store = LayoutStore::default();
        store.new_layout("test");
        store
    }

    // ------------------------------------------------------------------
    // add
    // ------------------------------------------------------------------

    #[test]
    fn test_add_lands_on_desk_top() {
        let mut store = store();
        let desk = store.add(ItemKind::DeskRect).expect("desk");
        let monitor = store.add(ItemKind::Monitor).expect("monitor");

        let height = store.get(&desk).and_then(|d| d.params.f32("height")).expect("height");
        let y = store.get(&monitor).expect("monitor").position.y;
        assert!((y - height).abs() < 1e-6);
        assert_eq!(store.history().index(), Some(1));
    }

    #[test]
    fn test_second_desk_is_rejected() {
        let mut store = store();
        store.add(ItemKind::DeskRect).expect("desk");
        let before = store.document().clone();
        assert_eq!(store.add(ItemKind::DeskL), Err(StoreError::DeskCapacityExceeded));
        assert_eq!(store.document(), &before);
    }

    #[test]
    fn test_imported_kind_needs_add_imported() {
        let mut store = store();
        assert_eq!(
            store.add(ItemKind::ImportedModel),
            Err(StoreError::AsyncKind(ItemKind::ImportedModel))
        );
        let id = store
            .add_imported("chair.glb", "data:model/gltf-binary;base64,AAAA")
            .expect("imported");
        let item = store.get(&id).expect("item");
        assert_eq!(item.params.str("fileName"), Some("chair.glb"));
        assert_eq!(item.name.as_deref(), Some("chair.glb"));
    }

    // ------------------------------------------------------------------
    // update
    // ------------------------------------------------------------------

    #[test]
    fn test_update_classification_drives_requests() {
        let mut store = store();
        let id = store.add(ItemKind::CustomBox).expect("box");
        store.take_reconcile_request();

        let change = store
            .update(&id, ItemPatch::new().position(Coord3::new(0.5, 0.0, 0.0)))
            .expect("move");
        assert_eq!(change, ChangeClass::Transform);
        assert_eq!(
            store.take_reconcile_request(),
            Some(ReconcileRequest::Transforms(BTreeSet::from([id.clone()])))
        );

        let change = store.update(&id, ItemPatch::new().param("width", 0.3)).expect("resize");
        assert_eq!(change, ChangeClass::Topology);
        assert_eq!(store.take_reconcile_request(), Some(ReconcileRequest::Full));

        let change = store.update(&id, ItemPatch::new().name("crate")).expect("rename");
        assert_eq!(change, ChangeClass::DataOnly);
        assert_eq!(store.take_reconcile_request(), None);
    }

    #[test]
    fn test_update_rejects_mount_slot_and_missing_item() {
        let mut store = store();
        let stand = store.add(ItemKind::UniversalStand).expect("stand");
        let index = store.history().index();

        let patch = ItemPatch::new().param(MOUNT_SLOT, "x");
        assert!(matches!(store.update(&stand, patch), Err(StoreError::InvalidPatch(_))));

        let missing = ItemId::from("missing");
        assert_eq!(
            store.update(&missing, ItemPatch::new().name("n")),
            Err(StoreError::ItemNotFound(missing))
        );
        assert_eq!(store.history().index(), index);
    }

    #[test]
    fn test_gesture_collapses_to_one_checkpoint() {
        let mut store = store();
        let id = store.add(ItemKind::Mouse).expect("mouse");
        let start = store.history().len();

        store.begin_gesture();
        for step in 0..10u8 {
            let x = f32::from(step) * 0.01;
            store
                .update(&id, ItemPatch::new().position(Coord3::new(x, 0.0, 0.0)))
                .expect("drag frame");
        }
        assert_eq!(store.history().len(), start);
        assert!(store.end_gesture());
        assert_eq!(store.history().len(), start + 1);
        assert!(!store.end_gesture());
    }

    // ------------------------------------------------------------------
    // mount / unmount
    // ------------------------------------------------------------------

    #[test]
    fn test_mount_sets_both_sides() {
        let mut store = store();
        let stand = store.add(ItemKind::UniversalStand).expect("stand");
        let phone = store.add(ItemKind::Phone).expect("phone");
        assert_eq!(store.available_hosts().len(), 1);

        store.mount(&stand, &phone).expect("mount");
        assert_eq!(store.get(&phone).and_then(|p| p.mounted_to_id.clone()), Some(stand.clone()));
        assert_eq!(store.get(&stand).and_then(|s| s.params.mounted_item_id()), Some(phone));
        assert!(store.available_hosts().is_empty());
        store.document().validate(store.registry()).expect("consistent");
    }

    #[test]
    fn test_mount_preconditions() {
        let mut store = store();
        let desk = store.add(ItemKind::DeskRect).expect("desk");
        let monitor = store.add(ItemKind::Monitor).expect("monitor");
        let stand = store.add(ItemKind::UniversalStand).expect("stand");
        let arm = store.add(ItemKind::MonitorArm).expect("arm");
        let before = store.document().clone();

        assert_eq!(store.mount(&monitor, &desk), Err(StoreError::NotMountHost(monitor.clone())));
        assert!(matches!(store.mount(&stand, &desk), Err(StoreError::InvalidMount { .. })));
        assert!(matches!(store.mount(&stand, &stand), Err(StoreError::InvalidMount { .. })));
        assert_eq!(
            store.mount(&stand, &ItemId::from("ghost")),
            Err(StoreError::ItemNotFound(ItemId::from("ghost")))
        );
        assert_eq!(store.document(), &before);

        store.mount(&stand, &monitor).expect("mount");
        assert!(matches!(store.mount(&stand, &arm), Err(StoreError::HostOccupied { .. })));
        assert!(matches!(store.mount(&arm, &monitor), Err(StoreError::InvalidMount { .. })));
    }

    #[test]
    fn test_mount_rejects_cycle() {
        let mut store = store();
        let a = store.add(ItemKind::UniversalStand).expect("a");
        let b = store.add(ItemKind::UniversalStand).expect("b");
        store.mount(&a, &b).expect("b on a");
        assert!(matches!(store.mount(&b, &a), Err(StoreError::InvalidMount { .. })));
    }

    #[test]
    fn test_unmount_relocates_to_stand_footprint() {
        let mut store = store();
        store.add(ItemKind::DeskRect).expect("desk");
        let stand = store.add(ItemKind::UniversalStand).expect("stand");
        let laptop = store.add(ItemKind::Macbook).expect("laptop");
        store
            .update(&stand, ItemPatch::new().position(Coord3::new(0.4, 0.75, -0.2)))
            .expect("move stand");
        store.mount(&stand, &laptop).expect("mount");

        assert_eq!(store.unmount(&stand), Ok(laptop.clone()));
        let item = store.get(&laptop).expect("laptop");
        assert!(!item.is_mounted());
        assert_eq!(item.position, Coord3::new(0.4, 0.75, -0.2));
        assert_eq!(store.unmount(&stand), Err(StoreError::NotMounted(stand)));
    }

    // ------------------------------------------------------------------
    // delete
    // ------------------------------------------------------------------

    #[test]
    fn test_delete_desk_cascades() {
        let mut store = store();
        let desk = store.add(ItemKind::DeskRect).expect("desk");
        store.add(ItemKind::Keyboard).expect("keyboard");
        store.add(ItemKind::Mouse).expect("mouse");

        store.delete(&desk).expect("delete");
        assert!(store.document().is_empty());
        assert!(store.undo());
        assert_eq!(store.document().len(), 3);
        assert!(store.redo());
        assert!(store.document().is_empty());
    }

    #[test]
    fn test_delete_mounted_item_frees_host() {
        let mut store = store();
        let stand = store.add(ItemKind::RoundBaseStand).expect("stand");
        let tablet = store.add(ItemKind::Tablet).expect("tablet");
        store.mount(&stand, &tablet).expect("mount");

        store.delete(&tablet).expect("delete");
        assert!(store.get(&stand).expect("stand").params.mounted_item_id().is_none());
        store.document().validate(store.registry()).expect("consistent");
    }

    #[test]
    fn test_delete_host_frees_dependent() {
        let mut store = store();
        let stand = store.add(ItemKind::MonitorArm).expect("arm");
        let monitor = store.add(ItemKind::Monitor).expect("monitor");
        store.mount(&stand, &monitor).expect("mount");

        store.delete(&stand).expect("delete");
        assert!(!store.get(&monitor).expect("monitor").is_mounted());
        store.document().validate(store.registry()).expect("consistent");
    }

    #[test]
    fn test_delete_does_not_duplicate_checkpoint() {
        let mut store = store();
        let id = store.add(ItemKind::Mouse).expect("mouse");
        assert_eq!(store.history().len(), 1);
        store.delete(&id).expect("delete");
        assert_eq!(store.history().len(), 2);
    }

    // ------------------------------------------------------------------
    // documents, autosave, observation
    // ------------------------------------------------------------------

    #[test]
    fn test_replace_document_is_validate_then_commit() {
        let mut store = store();
        store.add(ItemKind::Keyboard).expect("keyboard");
        let before = store.document().clone();
        let index = store.history().index();

        let bad = r#"{"documentName": "bad", "items": [
            {"id": "a", "kind": "desk-rect"}, {"id": "b", "kind": "desk-l"}
        ]}"#;
        assert!(store.import_json(bad).is_err());
        assert!(store.import_json("not json").is_err());
        assert_eq!(store.document(), &before);
        assert_eq!(store.history().index(), index);

        let good = r#"{"documentName": "good", "items": [{"id": "m", "kind": "mouse"}]}"#;
        store.import_json(good).expect("import");
        assert_eq!(store.document().document_name, "good");
        assert_eq!(store.take_reconcile_request(), Some(ReconcileRequest::Full));
    }

    #[test]
    fn test_checkpoint_writes_autosave() {
        let slot = MemoryAutosave::new();
        let mut store = LayoutStore::default().with_autosave(Box::new(slot.clone()));
        store.new_layout("saved");
        store.add(ItemKind::Mouse).expect("mouse");

        let payload = slot.payload().expect("autosaved");
        let doc = LayoutDocument::from_json(&payload).expect("parse");
        assert_eq!(doc.document_name, "saved");
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn test_restore_autosave_and_corrupt_slot() {
        let mut source = store();
        source.add(ItemKind::Phone).expect("phone");
        let json = source.export_json().expect("export");

        let slot = MemoryAutosave::with_payload(json);
        let mut store = LayoutStore::default().with_autosave(Box::new(slot.clone()));
        assert!(store.restore_autosave());
        assert_eq!(store.document().len(), 1);
        assert_eq!(store.history().index(), Some(0));

        let corrupt = MemoryAutosave::with_payload("{ not json");
        let mut store = LayoutStore::default().with_autosave(Box::new(corrupt.clone()));
        assert!(!store.restore_autosave());
        assert!(corrupt.payload().is_none());
    }

    #[test]
    fn test_exit_clears_everything() {
        let slot = MemoryAutosave::new();
        let mut store = LayoutStore::default().with_autosave(Box::new(slot.clone()));
        store.new_layout("x");
        store.add(ItemKind::Mouse).expect("mouse");
        assert!(slot.payload().is_some());

        store.exit();
        assert!(store.document().is_empty());
        assert!(store.history().is_empty());
        assert!(slot.payload().is_none());
    }

    #[test]
    fn test_subscribers_see_commits_until_unsubscribed() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut store = store();
        let sub = store.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        let id = store.add(ItemKind::Mouse).expect("mouse");
        assert!(seen.borrow().contains(&StoreEvent::ItemAdded { id }));

        assert!(store.unsubscribe(sub));
        let count = seen.borrow().len();
        store.add(ItemKind::Keyboard).expect("keyboard");
        assert_eq!(seen.borrow().len(), count);
        assert!(!store.unsubscribe(sub));
    }
}
