//! Arena-backed render graph.
//!
//! Nodes live in generation-checked slots so a stale [`NodeId`] held across a
//! rebuild resolves to nothing instead of to a recycled node. The graph owns
//! the [`ResourcePool`]: mesh resources are acquired when a drawable node is
//! spawned and released the moment its subtree is removed.

use std::fmt;

use desk_core::{ItemId, MeshSpec, PartNode};
use glam::{EulerRot, Mat4, Quat, Vec3};

use crate::error::{SceneError, SceneResult};
use crate::resources::{ResourceHandle, ResourcePool};

/// Generation-checked node handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}v{}", self.index, self.generation)
    }
}

/// One render node.
#[derive(Debug, Clone)]
pub struct Node {
    /// Debug label.
    pub label: String,
    /// Parent node, `None` for the root and for detached nodes.
    pub parent: Option<NodeId>,
    /// Child nodes in draw order.
    pub children: Vec<NodeId>,
    /// Local translation.
    pub translation: Vec3,
    /// Local rotation.
    pub rotation: Quat,
    /// Local scale.
    pub scale: Vec3,
    /// Item this node represents, set on item container nodes only.
    pub tag: Option<ItemId>,
    /// Mesh resource, if drawable.
    pub mesh: Option<ResourceHandle>,
}

impl Node {
    fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            parent: None,
            children: Vec::new(),
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            tag: None,
            mesh: None,
        }
    }

    /// Local transform matrix.
    #[must_use]
    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// The scene graph.
#[derive(Debug)]
pub struct SceneGraph {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
    resources: ResourcePool,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    /// A graph holding only the scene root.
    #[must_use]
    pub fn new() -> Self {
        let mut graph = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
            resources: ResourcePool::new(),
        };
        graph.root = graph.insert(Node::new("scene"));
        graph
    }

    /// The scene root.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Resources held by drawable nodes.
    #[must_use]
    pub fn resources(&self) -> &ResourcePool {
        &self.resources
    }

    /// Number of live nodes, root included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.node.is_some()).count()
    }

    /// Whether `id` refers to a live node.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Borrow a node.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    fn node_mut(&mut self, id: NodeId) -> SceneResult<&mut Node> {
        self.get_mut(id)
            .ok_or_else(|| SceneError::NodeNotFound(id.to_string()))
    }

    /// Children of a node (empty for unknown ids).
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
    }

    /// The mesh behind a drawable node.
    #[must_use]
    pub fn mesh_spec(&self, id: NodeId) -> Option<&MeshSpec> {
        self.get(id)
            .and_then(|node| node.mesh)
            .and_then(|handle| self.resources.get(handle))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn insert(&mut self, node: Node) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeId {
                index,
                generation: 0,
            }
        }
    }

    /// Create a detached empty node.
    pub fn spawn(&mut self, label: impl Into<String>) -> NodeId {
        self.insert(Node::new(label))
    }

    /// Create a detached drawable node, acquiring its resource.
    pub fn spawn_mesh(&mut self, label: impl Into<String>, spec: MeshSpec) -> NodeId {
        let mut node = Node::new(label);
        node.mesh = Some(self.resources.acquire(spec));
        self.insert(node)
    }

    /// Materialize a recipe part tree as a detached subtree. Returns its top node.
    pub fn instantiate(&mut self, part: &PartNode) -> NodeId {
        let id = match &part.mesh {
            Some(spec) => self.spawn_mesh(part.label.clone(), spec.clone()),
            None => self.spawn(part.label.clone()),
        };
        if let Some(node) = self.get_mut(id) {
            let r = part.transform.rotation;
            node.translation = part.transform.translation;
            node.rotation = Quat::from_euler(EulerRot::XYZ, r.x, r.y, r.z);
            node.scale = part.transform.scale;
        }
        for child in &part.children {
            let child_id = self.instantiate(child);
            self.link(child_id, id);
        }
        id
    }

    /// Tag a node as the container of an item.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NodeNotFound`] for stale ids.
    pub fn set_tag(&mut self, id: NodeId, tag: Option<ItemId>) -> SceneResult<()> {
        self.node_mut(id)?.tag = tag;
        Ok(())
    }

    /// Set a node's local translation and rotation.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NodeNotFound`] for stale ids.
    pub fn set_local_transform(
        &mut self,
        id: NodeId,
        translation: Vec3,
        rotation: Quat,
    ) -> SceneResult<()> {
        let node = self.node_mut(id)?;
        node.translation = translation;
        node.rotation = rotation;
        Ok(())
    }

    /// Re-parent `child` under `parent`.
    ///
    /// # Errors
    ///
    /// [`SceneError::NodeNotFound`] for stale ids, [`SceneError::Cycle`] if
    /// `parent` lies inside `child`'s subtree.
    pub fn attach(&mut self, child: NodeId, parent: NodeId) -> SceneResult<()> {
        if !self.contains(child) {
            return Err(SceneError::NodeNotFound(child.to_string()));
        }
        if !self.contains(parent) {
            return Err(SceneError::NodeNotFound(parent.to_string()));
        }
        if self.is_in_subtree(parent, child) {
            return Err(SceneError::Cycle(child.to_string()));
        }
        self.detach(child);
        self.link(child, parent);
        Ok(())
    }

    fn link(&mut self, child: NodeId, parent: NodeId) {
        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.get_mut(parent) {
            node.children.push(child);
        }
    }

    /// Unlink a node from its parent, keeping its subtree alive.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.get_mut(id).and_then(|node| node.parent.take()) else {
            return;
        };
        if let Some(parent) = self.get_mut(parent) {
            parent.children.retain(|&c| c != id);
        }
    }

    /// Remove a node and everything below it, releasing their resources.
    ///
    /// Returns the number of nodes removed. The root cannot be removed; use
    /// [`SceneGraph::clear`].
    pub fn remove_subtree(&mut self, id: NodeId) -> usize {
        if id == self.root || !self.contains(id) {
            return 0;
        }
        self.detach(id);
        let doomed = self.subtree(id);
        for node_id in &doomed {
            let slot = &mut self.slots[node_id.index as usize];
            if let Some(node) = slot.node.take() {
                if let Some(handle) = node.mesh {
                    self.resources.release(handle);
                }
            }
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(node_id.index);
        }
        doomed.len()
    }

    /// Remove every node except the root. Returns the number removed.
    pub fn clear(&mut self) -> usize {
        let top: Vec<NodeId> = self.children(self.root).to_vec();
        top.into_iter().map(|id| self.remove_subtree(id)).sum()
    }

    /// `id` and all its descendants, parents before children.
    #[must_use]
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.get(next) {
                out.push(next);
                stack.extend(node.children.iter().rev());
            }
        }
        out
    }

    /// Whether `node` is `ancestor` or lies below it.
    #[must_use]
    pub fn is_in_subtree(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.get(id).and_then(|n| n.parent);
        }
        false
    }

    /// Nearest node at or above `id` that carries an item tag.
    #[must_use]
    pub fn tagged_ancestor(&self, id: NodeId) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.get(node_id)?;
            if node.tag.is_some() {
                return Some(node_id);
            }
            current = node.parent;
        }
        None
    }

    /// Item tag of a node.
    #[must_use]
    pub fn tag(&self, id: NodeId) -> Option<&ItemId> {
        self.get(id).and_then(|node| node.tag.as_ref())
    }

    /// World transform: product of local matrices from the root down.
    #[must_use]
    pub fn world_matrix(&self, id: NodeId) -> Mat4 {
        let mut matrix = Mat4::IDENTITY;
        let mut current = Some(id);
        while let Some(node_id) = current {
            let Some(node) = self.get(node_id) else { break };
            matrix = node.local_matrix() * matrix;
            current = node.parent;
        }
        matrix
    }

    /// World-space axis-aligned bounds of every mesh in the subtree.
    #[must_use]
    pub fn world_bounds(&self, id: NodeId) -> Option<(Vec3, Vec3)> {
        let mut bounds: Option<(Vec3, Vec3)> = None;
        for node_id in self.subtree(id) {
            let Some(spec) = self.mesh_spec(node_id) else {
                continue;
            };
            let world = self.world_matrix(node_id);
            let (min, max) = spec.shape.local_bounds();
            for corner in box_corners(min, max) {
                let p = world.transform_point3(corner);
                bounds = Some(match bounds {
                    Some((lo, hi)) => (lo.min(p), hi.max(p)),
                    None => (p, p),
                });
            }
        }
        bounds
    }
}

fn box_corners(min: Vec3, max: Vec3) -> [Vec3; 8] {
    [
        Vec3::new(min.x, min.y, min.z),
        Vec3::new(max.x, min.y, min.z),
        Vec3::new(min.x, max.y, min.z),
        Vec3::new(max.x, max.y, min.z),
        Vec3::new(min.x, min.y, max.z),
        Vec3::new(max.x, min.y, max.z),
        Vec3::new(min.x, max.y, max.z),
        Vec3::new(max.x, max.y, max.z),
    ]
}
