//! Linear undo/redo history of document snapshots.

use crate::document::LayoutDocument;

/// An immutable deep copy of a document at a checkpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    document: LayoutDocument,
}

impl Snapshot {
    /// The captured document.
    #[must_use]
    pub fn document(&self) -> &LayoutDocument {
        &self.document
    }
}

/// Snapshot list with a cursor.
///
/// `index` is `None` before the first checkpoint. A checkpoint after an undo
/// discards the redo tail.
#[derive(Debug, Clone, Default)]
pub struct History {
    snapshots: Vec<Snapshot>,
    index: Option<usize>,
    capacity: Option<usize>,
}

impl History {
    /// An unbounded, empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A history that keeps at most `capacity` snapshots, dropping the oldest.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity.max(1)),
            ..Self::default()
        }
    }

    /// Record a snapshot of `document` and make it current.
    ///
    /// Returns the new index.
    pub fn checkpoint(&mut self, document: &LayoutDocument) -> usize {
        let keep = self.index.map_or(0, |i| i + 1);
        self.snapshots.truncate(keep);
        self.snapshots.push(Snapshot {
            document: document.clone(),
        });
        if let Some(capacity) = self.capacity {
            if self.snapshots.len() > capacity {
                let excess = self.snapshots.len() - capacity;
                self.snapshots.drain(..excess);
            }
        }
        let index = self.snapshots.len() - 1;
        self.index = Some(index);
        index
    }

    /// Step back. Returns a copy of the snapshot to restore, or `None` at the start.
    pub fn undo(&mut self) -> Option<LayoutDocument> {
        match self.index {
            Some(i) if i > 0 => {
                self.index = Some(i - 1);
                Some(self.snapshots[i - 1].document.clone())
            }
            _ => None,
        }
    }

    /// Step forward. Returns a copy of the snapshot to restore, or `None` at the end.
    pub fn redo(&mut self) -> Option<LayoutDocument> {
        let next = self.index.map_or(0, |i| i + 1);
        if next < self.snapshots.len() {
            self.index = Some(next);
            Some(self.snapshots[next].document.clone())
        } else {
            None
        }
    }

    /// Whether [`History::undo`] would do anything.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.index.is_some_and(|i| i > 0)
    }

    /// Whether [`History::redo`] would do anything.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.index.map_or(0, |i| i + 1) < self.snapshots.len()
    }

    /// Current cursor position.
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// The snapshot under the cursor.
    #[must_use]
    pub fn current(&self) -> Option<&Snapshot> {
        self.index.and_then(|i| self.snapshots.get(i))
    }

    /// Number of stored snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Whether no snapshot has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Drop every snapshot.
    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.index = None;
    }
}
