//! Change notifications emitted by the layout store.

use std::collections::BTreeSet;

use crate::item::ItemId;

/// How an update affects the rendered scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeClass {
    /// Geometry or parenting changed; the scene must be rebuilt.
    Topology,
    /// Only position/rotation changed; nodes can be patched in place.
    Transform,
    /// Nothing visible changed.
    DataOnly,
}

/// Work the scene side owes the store, accumulated between drains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileRequest {
    /// Discard and rebuild every render node.
    Full,
    /// Re-apply the free-standing transform of these items.
    Transforms(BTreeSet<ItemId>),
}

impl ReconcileRequest {
    /// Combine two requests. A full rebuild subsumes everything.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        match (self, other) {
            (Self::Transforms(mut a), Self::Transforms(b)) => {
                a.extend(b);
                Self::Transforms(a)
            }
            _ => Self::Full,
        }
    }

    /// Whether this is a full rebuild request.
    #[must_use]
    pub fn is_full(&self) -> bool {
        matches!(self, Self::Full)
    }
}

/// Identifies a store subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

/// A committed store change.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// An item was appended.
    ItemAdded {
        /// New item.
        id: ItemId,
    },
    /// An item's fields were patched.
    ItemUpdated {
        /// Patched item.
        id: ItemId,
        /// What kind of change it was.
        change: ChangeClass,
    },
    /// An item was mounted on a host.
    Mounted {
        /// Host item.
        host: ItemId,
        /// Mounted item.
        item: ItemId,
    },
    /// A host released its item.
    Unmounted {
        /// Host item.
        host: ItemId,
        /// Released item.
        item: ItemId,
    },
    /// An item was deleted. `cascade` is set when a desk took everything with it.
    ItemDeleted {
        /// Deleted item.
        id: ItemId,
        /// Whether the whole document was cleared.
        cascade: bool,
    },
    /// The whole document was replaced (import, new layout, restore, exit).
    DocumentReplaced,
    /// The layout was renamed.
    Renamed {
        /// New name.
        name: String,
    },
    /// Undo or redo moved the history cursor.
    HistoryMoved {
        /// Cursor after the move.
        index: Option<usize>,
    },
    /// A snapshot was recorded.
    Checkpointed {
        /// Index of the new snapshot.
        index: usize,
    },
}
