//! # Desk Scene
//!
//! Scene side of the desk planner: turns the layout held by
//! [`desk_core::LayoutStore`] into a live render graph and turns pointer input
//! back into layout edits.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                   Editor                    │
//! ├──────────────┬──────────────┬───────────────┤
//! │ Reconciler   │ Controller   │ SceneContext  │
//! │ - rebuild    │ - picking    │ - backend     │
//! │ - patch      │ - gizmo/drag │ - camera      │
//! │ - async GLTF │ - drop       │ - frames      │
//! ├──────────────┴──────────────┴───────────────┤
//! │        SceneGraph + ResourcePool            │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod camera;
pub mod config;
pub mod context;
pub mod controller;
pub mod editor;
pub mod error;
pub mod export;
pub mod graph;
pub mod picking;
pub mod reconciler;
pub mod resolver;
pub mod resources;

pub use backend::{HeadlessBackend, RenderBackend};
pub use camera::Camera;
pub use config::EditorConfig;
pub use context::{FrameScheduler, SceneContext};
pub use controller::{Controller, GizmoMode, OverlayMode, PickOutcome};
pub use editor::Editor;
pub use error::{SceneError, SceneResult};
pub use export::{ExportNode, ExportOptions, SceneExporter};
pub use graph::{Node, NodeId, SceneGraph};
pub use picking::{Hit, Ray};
pub use reconciler::{RebuildReport, Reconciler};
pub use resolver::{GltfResolver, ModelResolver};
pub use resources::{ResourceHandle, ResourcePool};
