//! Scene export for 3D/AR preview.
//!
//! Clones the live render graph into a serializable [`ExportNode`] tree.
//! Encoding that tree into a model file format is left to the consumer.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use desk_core::{CoreError, ItemId, LayoutDocument, MeshSpec};

use crate::error::{SceneError, SceneResult};
use crate::graph::{NodeId, SceneGraph};
use crate::reconciler::Reconciler;

/// Configuration for scene export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOptions {
    /// Export the desk with everything on it. Without it, items are re-rooted
    /// at the world origin with the desk top height removed.
    pub include_desk: bool,
}

/// One node of an exported scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportNode {
    /// Node label.
    pub name: String,
    /// Item this node stands for, on item roots only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<ItemId>,
    /// Local translation.
    pub translation: Vec3,
    /// Local rotation quaternion.
    pub rotation: Quat,
    /// Local scale.
    pub scale: Vec3,
    /// Geometry and material, if drawable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh: Option<MeshSpec>,
    /// Child nodes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ExportNode>,
}

impl ExportNode {
    fn group(name: &str) -> Self {
        Self {
            name: name.to_string(),
            item_id: None,
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            mesh: None,
            children: Vec::new(),
        }
    }

    /// Number of drawable nodes in this subtree.
    #[must_use]
    pub fn mesh_count(&self) -> usize {
        usize::from(self.mesh.is_some())
            + self.children.iter().map(ExportNode::mesh_count).sum::<usize>()
    }

    /// Item ids present in this subtree, in preorder.
    #[must_use]
    pub fn item_ids(&self) -> Vec<&ItemId> {
        let mut out = Vec::new();
        self.collect_ids(&mut out);
        out
    }

    fn collect_ids<'a>(&'a self, out: &mut Vec<&'a ItemId>) {
        out.extend(self.item_id.as_ref());
        for child in &self.children {
            child.collect_ids(out);
        }
    }
}

/// Builds [`ExportNode`] trees from the live graph.
#[derive(Debug, Clone, Default)]
pub struct SceneExporter {
    options: ExportOptions,
}

impl SceneExporter {
    /// Create a new exporter with the given options.
    #[must_use]
    pub fn new(options: ExportOptions) -> Self {
        Self { options }
    }

    /// Create an exporter with default options.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(ExportOptions::default())
    }

    /// Export the current scene.
    ///
    /// # Errors
    ///
    /// [`SceneError::NoDesk`] when the desk is requested but absent or not
    /// rendered.
    pub fn export(&self, reconciler: &Reconciler, document: &LayoutDocument) -> SceneResult<ExportNode> {
        let graph = reconciler.graph();
        let mut root = ExportNode::group(&document.document_name);

        if self.options.include_desk {
            let desk_node = document
                .desk()
                .and_then(|desk| reconciler.node_for(&desk.id))
                .ok_or(SceneError::NoDesk)?;
            root.children.push(clone_subtree(graph, desk_node, true));
        } else {
            let desk_top = document.desk_top();
            for item in document.items.iter().filter(|item| !item.is_desk()) {
                let Some(node) = reconciler.node_for(&item.id) else {
                    continue;
                };
                let mut clone = clone_subtree(graph, node, false);
                let (scale, rotation, mut translation) =
                    graph.world_matrix(node).to_scale_rotation_translation();
                translation.y -= desk_top;
                clone.translation = translation;
                clone.rotation = rotation;
                clone.scale = scale;
                root.children.push(clone);
            }
        }

        tracing::debug!(
            "Exported {} top-level nodes, {} meshes (include_desk={})",
            root.children.len(),
            root.mesh_count(),
            self.options.include_desk
        );
        Ok(root)
    }

    /// Export as pretty JSON.
    ///
    /// # Errors
    ///
    /// As [`SceneExporter::export`], or a serialization error.
    pub fn export_json(&self, reconciler: &Reconciler, document: &LayoutDocument) -> SceneResult<String> {
        let tree = self.export(reconciler, document)?;
        serde_json::to_string_pretty(&tree)
            .map_err(|e| SceneError::Core(CoreError::Serialization(e)))
    }
}

/// Clone a node and its descendants. With `nested_items` false, tagged
/// descendants are left out; they are exported as their own roots.
fn clone_subtree(graph: &SceneGraph, id: NodeId, nested_items: bool) -> ExportNode {
    let Some(node) = graph.get(id) else {
        return ExportNode::group("missing");
    };
    let mut out = ExportNode {
        name: node.label.clone(),
        item_id: node.tag.clone(),
        translation: node.translation,
        rotation: node.rotation,
        scale: node.scale,
        mesh: graph.mesh_spec(id).cloned(),
        children: Vec::new(),
    };
    for &child in graph.children(id) {
        if !nested_items && graph.tag(child).is_some() {
            continue;
        }
        out.children.push(clone_subtree(graph, child, nested_items));
    }
    out
}
