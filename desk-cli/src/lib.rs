//! # Desk CLI
//!
//! Headless command-line host for the desk planner.
//!
//! Each invocation opens a layout (an explicit file, or the autosave slot in
//! the data directory), runs one command against a live [`Editor`] and prints
//! the result as JSON on stdout.
//!
//! ## Usage
//!
//! ```bash
//! desk --data-dir ~/.desk add desk-rect
//! desk --data-dir ~/.desk add monitor
//! desk --data-dir ~/.desk export-scene --include-desk
//! ```
//!
//! ## Architecture
//!
//! - `CliArgs` - Command-line arguments parsed with clap
//! - `Command` - One editing or inspection step
//! - `execute` - Runs a command against an [`Editor`] and returns its JSON result

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use desk_core::{Coord3, ItemId, ItemKind, ItemPatch};
use desk_scene::{Editor, EditorConfig, ExportOptions};

/// Command-line arguments for the desk planner.
#[derive(Debug, Clone, Parser)]
#[command(name = "desk")]
#[command(about = "Parametric desk-setup planner")]
#[command(version)]
pub struct CliArgs {
    /// Layout JSON file to open instead of the autosave slot
    #[arg(long, env = "DESK_LAYOUT")]
    pub layout: Option<PathBuf>,

    /// Directory holding the autosave slot
    #[arg(long, env = "DESK_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Do not write the autosave slot
    #[arg(long)]
    pub no_autosave: bool,

    /// Write the resulting layout JSON to this file
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Maximum number of undo snapshots
    #[arg(long)]
    pub history: Option<usize>,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// One step run against the opened layout.
#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// List the catalog of placeable kinds
    Kinds,
    /// Place a new item of the given kind
    Add {
        /// Kind key, e.g. `monitor` or `desk-rect`
        kind: String,
    },
    /// Import a glTF/GLB model file
    ImportModel {
        /// Path to a `.gltf` or `.glb` file
        path: PathBuf,
    },
    /// Delete an item
    Delete {
        /// Item id
        id: String,
    },
    /// Mount an item on a stand
    Mount {
        /// Stand id
        stand: String,
        /// Item id
        item: String,
    },
    /// Release whatever is mounted on a stand
    Unmount {
        /// Stand id
        stand: String,
    },
    /// Move an item to a new position (meters)
    Move {
        /// Item id
        id: String,
        /// X coordinate
        #[arg(allow_negative_numbers = true)]
        x: f32,
        /// Y coordinate
        #[arg(allow_negative_numbers = true)]
        y: f32,
        /// Z coordinate
        #[arg(allow_negative_numbers = true)]
        z: f32,
    },
    /// Drop an item straight down onto whatever is below it
    Drop {
        /// Item id
        id: String,
    },
    /// Summarize the layout and its scene
    Inspect,
    /// Export the scene tree for 3D/AR viewing
    ExportScene {
        /// Include the desk and everything on it
        #[arg(long)]
        include_desk: bool,
    },
    /// Close the layout and clear the autosave slot
    Exit,
}

impl Command {
    /// Whether the command changes the layout.
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Self::Kinds | Self::Inspect | Self::ExportScene { .. })
    }
}

impl From<&CliArgs> for EditorConfig {
    fn from(args: &CliArgs) -> Self {
        Self {
            autosave: !args.no_autosave,
            data_dir: args.data_dir.clone(),
            history_capacity: args.history,
            ..EditorConfig::new()
        }
    }
}

/// Build a base64 data URL for a model file, typed by its extension.
#[must_use]
pub fn model_data_url(path: &Path, bytes: &[u8]) -> String {
    let is_binary = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("glb"));
    let mime = if is_binary {
        "model/gltf-binary"
    } else {
        "model/gltf+json"
    };
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Run one command against the editor.
///
/// # Errors
///
/// Returns the underlying store or scene error, or an I/O error when a model
/// file cannot be read.
pub async fn execute(editor: &mut Editor, command: &Command) -> anyhow::Result<Value> {
    tracing::debug!("Executing {:?}", command);
    let value = match command {
        Command::Kinds => {
            let catalog = editor.store().registry_handle().catalog();
            let groups: serde_json::Map<String, Value> = catalog
                .into_iter()
                .map(|group| {
                    let kinds = group
                        .kinds
                        .iter()
                        .map(|kind| Value::String(kind.to_string()))
                        .collect();
                    (group.key.to_string(), Value::Array(kinds))
                })
                .collect();
            Value::Object(groups)
        }
        Command::Add { kind } => {
            let kind: ItemKind = kind.parse()?;
            let id = editor.add(kind)?;
            json!({ "id": id.as_str() })
        }
        Command::ImportModel { path } => {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            let file_name = path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("model");
            let id = editor.add_imported(file_name, &model_data_url(path, &bytes))?;
            let linked = editor.settle().await;
            json!({
                "id": id.as_str(),
                "rendered": editor.reconciler().node_for(&id).is_some(),
                "linked": linked,
            })
        }
        Command::Delete { id } => {
            editor.delete(&ItemId::from_string(id.as_str()))?;
            json!({ "deleted": id })
        }
        Command::Mount { stand, item } => {
            editor.mount(
                &ItemId::from_string(stand.as_str()),
                &ItemId::from_string(item.as_str()),
            )?;
            json!({ "stand": stand, "mounted": item })
        }
        Command::Unmount { stand } => {
            let released = editor.unmount(&ItemId::from_string(stand.as_str()))?;
            json!({ "stand": stand, "released": released.as_str() })
        }
        Command::Move { id, x, y, z } => {
            let id = ItemId::from_string(id.as_str());
            editor.update(&id, ItemPatch::new().position(Coord3::new(*x, *y, *z)))?;
            json!({ "id": id.as_str(), "position": [x, y, z] })
        }
        Command::Drop { id } => {
            let id = ItemId::from_string(id.as_str());
            editor.select(id.clone());
            let landed = editor.drop_to_surface()?;
            let position = editor.store().get(&id).map(|item| item.position);
            json!({ "id": id.as_str(), "landed": landed, "position": position })
        }
        Command::Inspect => inspect(editor),
        Command::ExportScene { include_desk } => {
            let tree = editor.export_scene(ExportOptions {
                include_desk: *include_desk,
            })?;
            serde_json::to_value(tree)?
        }
        Command::Exit => {
            editor.exit();
            json!({ "closed": true })
        }
    };
    Ok(value)
}

fn inspect(editor: &Editor) -> Value {
    let document = editor.store().document();
    let reconciler = editor.reconciler();
    let failures: Vec<Value> = editor
        .last_report()
        .map(|report| {
            report
                .failures
                .iter()
                .map(|(id, err)| json!({ "id": id.as_str(), "error": err.to_string() }))
                .collect()
        })
        .unwrap_or_default();
    json!({
        "documentName": document.document_name,
        "items": document
            .items
            .iter()
            .map(|item| json!({
                "id": item.id.as_str(),
                "kind": item.kind.to_string(),
                "name": item.name,
                "rendered": reconciler.node_for(&item.id).is_some(),
                "mounted": item.params.mounted_item_id().map(|id| id.as_str().to_string()),
            }))
            .collect::<Vec<_>>(),
        "deskTop": document.desk_top(),
        "nodes": reconciler.graph().node_count(),
        "liveResources": reconciler.graph().resources().live_count(),
        "pendingModels": reconciler.pending_count(),
        "failures": failures,
    })
}
