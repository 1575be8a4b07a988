//! # Desk Core
//!
//! Layout data model and editing logic for the desk planner.
//! Pure and synchronous; the scene side lives in `desk-scene`.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                  desk-core                  │
//! ├─────────────────────────────────────────────┤
//! │  Model Registry   │  Layout Store           │
//! │  - Kind recipes   │  - Add / update / delete│
//! │  - Part trees     │  - Mount / unmount      │
//! │  - Mount anchors  │  - Reconcile requests   │
//! ├─────────────────────────────────────────────┤
//! │  History          │  Persistence            │
//! │  - Snapshots      │  - Autosave slot        │
//! │  - Undo / redo    │  - Layout JSON files    │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod document;
pub mod error;
pub mod event;
pub mod history;
pub mod item;
pub mod parts;
pub mod persist;
pub mod registry;
pub mod store;

pub use document::LayoutDocument;
pub use error::{BuildError, CoreError, CoreResult};
pub use event::{ChangeClass, ReconcileRequest, StoreEvent, SubscriptionId};
pub use history::{History, Snapshot};
pub use item::{Coord3, ItemId, ItemKind, LayoutItem, Params, MOUNT_SLOT};
pub use parts::{MaterialSpec, MeshSpec, PartNode, PartTransform, Shape};
pub use persist::{AutosaveSlot, FileAutosave, MemoryAutosave, AUTOSAVE_KEY};
pub use registry::{CatalogCategory, CatalogGroup, ModelRecipe, ModelRegistry, MountAnchor};
pub use store::{ItemPatch, LayoutStore, StoreError, StoreResult};

/// Desk core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
