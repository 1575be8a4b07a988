//! Scene error types.

use desk_core::{CoreError, ItemId, StoreError};
use thiserror::Error;

/// Result type for scene operations.
pub type SceneResult<T> = Result<T, SceneError>;

/// Errors that can occur on the scene side.
#[derive(Debug, Error)]
pub enum SceneError {
    /// The scene context has no backend yet, or was disposed.
    #[error("Scene context is not initialized")]
    NotInitialized,

    /// A full rebuild was requested while one is suspended by a drag.
    #[error("Reconciler is busy")]
    ReconcileBusy,

    /// A node id is stale or unknown.
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// Operation on an item that has no render node.
    #[error("Item has no render node: {0}")]
    ItemNotRendered(ItemId),

    /// Operation needs a selection.
    #[error("Nothing is selected")]
    NoSelection,

    /// Mounted items follow their host and cannot be dragged.
    #[error("Item {0} is mounted and follows its host")]
    MountedItem(ItemId),

    /// Attaching a node would make it its own ancestor.
    #[error("Cannot attach node {0} below itself")]
    Cycle(String),

    /// Export with the desk was requested but there is no desk.
    #[error("The layout has no desk")]
    NoDesk,

    /// An imported model could not be resolved.
    #[error("Failed to resolve model: {0}")]
    Resolve(String),

    /// The backend failed to render.
    #[error("Frame render failed: {0}")]
    Render(String),

    /// A document-level error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A rejected store mutation.
    #[error(transparent)]
    Store(#[from] StoreError),
}
