//! Keeps the render graph in step with the layout document.
//!
//! Two strategies:
//!
//! - **Full rebuild**: drop every item node (releasing its resources), build
//!   every item again through the registry, then link desks, free items and
//!   mounted items.
//! - **Transform patch**: write the local transform of existing nodes in
//!   place. Mounted items are skipped since their placement comes from the
//!   host.
//!
//! Asynchronous kinds get no node during a rebuild. Their resolution future
//! is queued and linked later by [`Reconciler::pump`] or
//! [`Reconciler::settle`], but only if the request is still current and the
//! item still exists.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use glam::{EulerRot, Quat, Vec3};

use desk_core::{
    BuildError, ItemId, LayoutDocument, LayoutItem, ModelRegistry, PartNode, ReconcileRequest,
};

use crate::error::{SceneError, SceneResult};
use crate::graph::{NodeId, SceneGraph};
use crate::resolver::ModelResolver;

/// Outcome of one full rebuild.
#[derive(Debug, Default)]
pub struct RebuildReport {
    /// Items that received a node.
    pub built: usize,
    /// Asynchronous items still waiting for their geometry.
    pub deferred: Vec<ItemId>,
    /// Items whose recipe failed. They have no node.
    pub failures: Vec<(ItemId, BuildError)>,
}

impl RebuildReport {
    /// Whether every item was built.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.deferred.is_empty() && self.failures.is_empty()
    }
}

struct Resolution {
    id: ItemId,
    token: u64,
    data_url: String,
    result: SceneResult<PartNode>,
}

struct Pending {
    token: u64,
    data_url: String,
}

/// Maps layout items onto render nodes.
pub struct Reconciler {
    graph: SceneGraph,
    registry: Arc<ModelRegistry>,
    resolver: Arc<dyn ModelResolver>,
    nodes: HashMap<ItemId, NodeId>,
    surface_root: Option<NodeId>,
    next_token: u64,
    awaiting: HashMap<ItemId, Pending>,
    resolved: HashMap<ItemId, (String, PartNode)>,
    in_flight: FuturesUnordered<BoxFuture<'static, Resolution>>,
    suspended: bool,
    rebuilds: u64,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("nodes", &self.nodes.len())
            .field("surface_root", &self.surface_root)
            .field("awaiting", &self.awaiting.len())
            .field("in_flight", &self.in_flight.len())
            .field("suspended", &self.suspended)
            .field("rebuilds", &self.rebuilds)
            .finish_non_exhaustive()
    }
}

/// Rotation of an item: Euler XYZ degrees to a quaternion.
#[must_use]
pub fn item_rotation(item: &LayoutItem) -> Quat {
    euler_degrees(item.rotation.to_vec3())
}

/// Euler XYZ degrees to a quaternion.
#[must_use]
pub fn euler_degrees(degrees: Vec3) -> Quat {
    Quat::from_euler(
        EulerRot::XYZ,
        degrees.x.to_radians(),
        degrees.y.to_radians(),
        degrees.z.to_radians(),
    )
}

impl Reconciler {
    /// Create a reconciler with an empty graph.
    #[must_use]
    pub fn new(registry: Arc<ModelRegistry>, resolver: Arc<dyn ModelResolver>) -> Self {
        Self {
            graph: SceneGraph::new(),
            registry,
            resolver,
            nodes: HashMap::new(),
            surface_root: None,
            next_token: 0,
            awaiting: HashMap::new(),
            resolved: HashMap::new(),
            in_flight: FuturesUnordered::new(),
            suspended: false,
            rebuilds: 0,
        }
    }

    /// The render graph.
    #[must_use]
    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    /// Mutable render graph, for gesture feedback.
    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    /// Node of an item.
    #[must_use]
    pub fn node_for(&self, id: &ItemId) -> Option<NodeId> {
        self.nodes.get(id).copied()
    }

    /// Item a node represents.
    #[must_use]
    pub fn item_for(&self, node: NodeId) -> Option<&ItemId> {
        self.graph.tag(node)
    }

    /// Ids that currently have a node.
    pub fn rendered_ids(&self) -> impl Iterator<Item = &ItemId> {
        self.nodes.keys()
    }

    /// Number of item nodes.
    #[must_use]
    pub fn rendered_count(&self) -> usize {
        self.nodes.len()
    }

    /// The desk node, or the scene root without a desk.
    #[must_use]
    pub fn surface_root(&self) -> NodeId {
        self.surface_root.unwrap_or_else(|| self.graph.root())
    }

    /// Asynchronous items still resolving.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.awaiting.len()
    }

    /// Full rebuilds performed.
    #[must_use]
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }

    /// Block full rebuilds while a gesture writes node transforms.
    pub fn suspend(&mut self) {
        self.suspended = true;
    }

    /// Allow full rebuilds again.
    pub fn resume(&mut self) {
        self.suspended = false;
    }

    /// Whether full rebuilds are blocked.
    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Apply a drained reconcile request.
    ///
    /// # Errors
    ///
    /// [`SceneError::ReconcileBusy`] for a full request while suspended.
    pub fn apply(
        &mut self,
        document: &LayoutDocument,
        request: &ReconcileRequest,
    ) -> SceneResult<Option<RebuildReport>> {
        match request {
            ReconcileRequest::Full => self.full_rebuild(document).map(Some),
            ReconcileRequest::Transforms(ids) => {
                self.patch_transforms(document, ids.iter());
                Ok(None)
            }
        }
    }

    /// Discard all item nodes and build the document again.
    ///
    /// # Errors
    ///
    /// [`SceneError::ReconcileBusy`] while suspended. Per-item build failures
    /// are collected in the report instead.
    pub fn full_rebuild(&mut self, document: &LayoutDocument) -> SceneResult<RebuildReport> {
        if self.suspended {
            return Err(SceneError::ReconcileBusy);
        }
        let removed = self.graph.clear();
        self.nodes.clear();
        self.surface_root = None;
        self.awaiting.retain(|id, _| document.contains(id));
        self.resolved.retain(|id, _| document.contains(id));

        let mut report = RebuildReport::default();
        for item in &document.items {
            if self.registry.is_async(item.kind) {
                if self.instantiate_resolved(item) {
                    report.built += 1;
                } else {
                    self.request_resolution(item);
                    report.deferred.push(item.id.clone());
                }
                continue;
            }
            match self.registry.build(item) {
                Ok(parts) => {
                    self.instantiate(&item.id, &parts);
                    report.built += 1;
                }
                Err(e) => {
                    tracing::warn!("Failed to build {} ({}): {}", item.id, item.kind, e);
                    report.failures.push((item.id.clone(), e));
                }
            }
        }

        // Desk first so it becomes the surface root for everything else.
        if let Some(desk) = document.desk() {
            if let Some(node) = self.node_for(&desk.id) {
                self.place(node, self.graph.root(), desk);
                self.surface_root = Some(node);
            }
        }
        for item in document.items.iter().filter(|item| !item.is_desk()) {
            self.link(item, document);
        }

        self.rebuilds += 1;
        tracing::debug!(
            "Full rebuild #{}: removed {} nodes, built {}, deferred {}, failed {}",
            self.rebuilds,
            removed,
            report.built,
            report.deferred.len(),
            report.failures.len()
        );
        Ok(report)
    }

    /// Write item transforms into existing nodes. Returns how many were patched.
    pub fn patch_transforms<'a>(
        &mut self,
        document: &LayoutDocument,
        ids: impl IntoIterator<Item = &'a ItemId>,
    ) -> usize {
        let mut patched = 0;
        for id in ids {
            let Some(item) = document.get(id) else {
                continue;
            };
            if item.is_mounted() {
                tracing::trace!("Skipping transform patch of mounted item {}", id);
                continue;
            }
            let Some(node) = self.node_for(id) else {
                continue;
            };
            if self
                .graph
                .set_local_transform(node, item.position.to_vec3(), item_rotation(item))
                .is_ok()
            {
                patched += 1;
            }
        }
        patched
    }

    /// Link every finished resolution without waiting. Returns how many
    /// items received a node.
    pub fn pump(&mut self, document: &LayoutDocument) -> usize {
        let mut linked = 0;
        while let Some(Some(resolution)) = self.in_flight.next().now_or_never() {
            if self.complete(resolution, document) {
                linked += 1;
            }
        }
        linked
    }

    /// Wait for every queued resolution and link the results.
    pub async fn settle(&mut self, document: &LayoutDocument) -> usize {
        let mut linked = 0;
        while let Some(resolution) = self.in_flight.next().await {
            if self.complete(resolution, document) {
                linked += 1;
            }
        }
        linked
    }

    fn request_resolution(&mut self, item: &LayoutItem) {
        let data_url = item.params.str("dataUrl").unwrap_or_default().to_string();
        if self
            .awaiting
            .get(&item.id)
            .is_some_and(|pending| pending.data_url == data_url)
        {
            return;
        }
        let token = self.next_token;
        self.next_token += 1;
        self.awaiting.insert(
            item.id.clone(),
            Pending {
                token,
                data_url: data_url.clone(),
            },
        );

        let resolver = Arc::clone(&self.resolver);
        let item = item.clone();
        self.in_flight.push(
            async move {
                let result = resolver.resolve(&item).await;
                Resolution {
                    id: item.id,
                    token,
                    data_url,
                    result,
                }
            }
            .boxed(),
        );
    }

    fn complete(&mut self, resolution: Resolution, document: &LayoutDocument) -> bool {
        let Resolution {
            id,
            token,
            data_url,
            result,
        } = resolution;
        if self.awaiting.get(&id).map(|pending| pending.token) != Some(token) {
            tracing::debug!("Ignoring stale model resolution for {}", id);
            return false;
        }
        self.awaiting.remove(&id);
        let Some(item) = document.get(&id) else {
            tracing::debug!("Resolved model for {} arrived after it was deleted", id);
            return false;
        };

        match result {
            Ok(parts) => {
                self.resolved.insert(id.clone(), (data_url, parts));
                if !self.instantiate_resolved(item) {
                    return false;
                }
                self.link(item, document);
                tracing::debug!("Linked resolved model {}", id);
                true
            }
            Err(e) => {
                tracing::warn!("Failed to resolve imported model {}: {}", id, e);
                false
            }
        }
    }

    fn instantiate_resolved(&mut self, item: &LayoutItem) -> bool {
        let data_url = item.params.str("dataUrl").unwrap_or_default();
        let Some(parts) = self
            .resolved
            .get(&item.id)
            .filter(|(url, _)| url == data_url)
            .map(|(_, parts)| PartNode::group(item.id.as_str()).with_child(parts.clone()))
        else {
            return false;
        };
        self.instantiate(&item.id, &parts);
        true
    }

    fn instantiate(&mut self, id: &ItemId, parts: &PartNode) {
        let node = self.graph.instantiate(parts);
        if self.graph.set_tag(node, Some(id.clone())).is_ok() {
            self.nodes.insert(id.clone(), node);
        }
    }

    fn link(&mut self, item: &LayoutItem, document: &LayoutDocument) {
        let Some(node) = self.node_for(&item.id) else {
            return;
        };
        if let Some(host_id) = &item.mounted_to_id {
            let host = document.get(host_id);
            let host_node = self.node_for(host_id);
            match (host, host_node) {
                (Some(host), Some(host_node)) => match self.registry.mount_anchor(host) {
                    Ok(anchor) => {
                        let r = anchor.rotation;
                        let rotation = Quat::from_euler(EulerRot::XYZ, r.x, r.y, r.z);
                        if self.graph.attach(node, host_node).is_ok()
                            && self
                                .graph
                                .set_local_transform(node, anchor.translation, rotation)
                                .is_ok()
                        {
                            return;
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Host {} has no usable mount anchor: {}", host_id, e);
                    }
                },
                _ => tracing::debug!(
                    "Host {} of {} has no node, placing on the surface",
                    host_id,
                    item.id
                ),
            }
        }
        self.place(node, self.surface_root(), item);
    }

    fn place(&mut self, node: NodeId, parent: NodeId, item: &LayoutItem) {
        let attached = self.graph.attach(node, parent).and_then(|()| {
            self.graph
                .set_local_transform(node, item.position.to_vec3(), item_rotation(item))
        });
        if let Err(e) = attached {
            tracing::warn!("Failed to link {}: {}", item.id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use desk_core::{Coord3, ItemKind, MaterialSpec, Shape, MOUNT_SLOT};

    struct FixedResolver;

    #[async_trait]
    impl ModelResolver for FixedResolver {
        async fn resolve(&self, _item: &LayoutItem) -> SceneResult<PartNode> {
            Ok(PartNode::mesh(
                "proxy",
                Shape::cuboid(0.1, 0.1, 0.1),
                MaterialSpec::default(),
            ))
        }
    }

    fn reconciler() -> Reconciler {
        Reconciler::new(Arc::new(ModelRegistry::with_builtin()), Arc::new(FixedResolver))
    }

    fn item(registry: &ModelRegistry, id: &str, kind: ItemKind) -> LayoutItem {
        registry
            .create_default(kind, ItemId::from(id), 0.75)
            .expect("default item")
    }

    fn mounted_pair(registry: &ModelRegistry) -> LayoutDocument {
        let mut stand = item(registry, "stand", ItemKind::UniversalStand);
        let mut phone = item(registry, "phone", ItemKind::Phone);
        stand.params.set_mounted_item_id(Some(&phone.id));
        phone.mounted_to_id = Some(stand.id.clone());
        let mut doc = LayoutDocument::new("test");
        doc.items = vec![item(registry, "desk", ItemKind::DeskRect), stand, phone];
        doc
    }

    #[test]
    fn test_full_rebuild_tags_every_item() {
        let registry = ModelRegistry::with_builtin();
        let doc = mounted_pair(&registry);
        let mut rec = reconciler();
        let report = rec.full_rebuild(&doc).expect("rebuild");
        assert!(report.is_clean());
        assert_eq!(report.built, 3);

        let desk = rec.node_for(&ItemId::from("desk")).expect("desk node");
        assert_eq!(rec.surface_root(), desk);
        let stand = rec.node_for(&ItemId::from("stand")).expect("stand node");
        let phone = rec.node_for(&ItemId::from("phone")).expect("phone node");
        assert_eq!(rec.graph().get(stand).and_then(|n| n.parent), Some(desk));
        assert_eq!(rec.graph().get(phone).and_then(|n| n.parent), Some(stand));
        let local = rec.graph().get(phone).expect("phone").translation;
        assert!((local - Vec3::new(0.3, 0.42, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_missing_host_falls_back_to_surface() {
        let registry = ModelRegistry::with_builtin();
        let mut phone = item(&registry, "phone", ItemKind::Phone);
        phone.mounted_to_id = Some(ItemId::from("ghost"));
        let mut doc = LayoutDocument::new("test");
        doc.items = vec![phone];

        let mut rec = reconciler();
        rec.full_rebuild(&doc).expect("rebuild");
        let node = rec.node_for(&ItemId::from("phone")).expect("node");
        assert_eq!(rec.graph().get(node).and_then(|n| n.parent), Some(rec.graph().root()));
    }

    #[test]
    fn test_build_failure_is_isolated() {
        let registry = ModelRegistry::with_builtin();
        let mut broken = item(&registry, "box", ItemKind::CustomBox);
        broken.params.remove("width");
        let mut doc = LayoutDocument::new("test");
        doc.items = vec![broken, item(&registry, "kb", ItemKind::Keyboard)];

        let mut rec = reconciler();
        let report = rec.full_rebuild(&doc).expect("rebuild");
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.built, 1);
        assert!(rec.node_for(&ItemId::from("kb")).is_some());
        assert!(rec.node_for(&ItemId::from("box")).is_none());
    }

    #[test]
    fn test_suspended_rebuild_is_busy() {
        let mut rec = reconciler();
        rec.suspend();
        assert!(matches!(
            rec.full_rebuild(&LayoutDocument::default()),
            Err(SceneError::ReconcileBusy)
        ));
        rec.resume();
        assert!(rec.full_rebuild(&LayoutDocument::default()).is_ok());
    }

    #[test]
    fn test_patch_skips_mounted_items() {
        let registry = ModelRegistry::with_builtin();
        let mut doc = mounted_pair(&registry);
        let mut rec = reconciler();
        rec.full_rebuild(&doc).expect("rebuild");

        for item in &mut doc.items {
            item.position = Coord3::new(0.5, 0.8, 0.1);
        }
        let ids: Vec<ItemId> = doc.items.iter().map(|i| i.id.clone()).collect();
        assert_eq!(rec.patch_transforms(&doc, &ids), 2);

        let stand = rec.node_for(&ItemId::from("stand")).expect("stand");
        assert_eq!(rec.graph().get(stand).expect("stand").translation, Vec3::new(0.5, 0.8, 0.1));
        let phone = rec.node_for(&ItemId::from("phone")).expect("phone");
        assert!((rec.graph().get(phone).expect("phone").translation.x - 0.3).abs() < 1e-5);
    }

    #[test]
    fn test_pump_links_resolved_model() {
        let registry = ModelRegistry::with_builtin();
        let mut model = item(&registry, "model", ItemKind::ImportedModel);
        model.params.set("dataUrl", "data:model/gltf-binary;base64,AA==");
        let mut doc = LayoutDocument::new("test");
        doc.items = vec![model];

        let mut rec = reconciler();
        let report = rec.full_rebuild(&doc).expect("rebuild");
        assert_eq!(report.deferred, vec![ItemId::from("model")]);
        assert!(rec.node_for(&ItemId::from("model")).is_none());

        assert_eq!(rec.pump(&doc), 1);
        assert_eq!(rec.pending_count(), 0);
        let node = rec.node_for(&ItemId::from("model")).expect("linked");
        assert_eq!(rec.graph().resources().live_count(), 1);
        assert_eq!(rec.graph().tag(node), Some(&ItemId::from("model")));

        // Rebuilding reuses the resolved geometry.
        let report = rec.full_rebuild(&doc).expect("rebuild");
        assert!(report.deferred.is_empty());
        assert!(rec.node_for(&ItemId::from("model")).is_some());
    }

    #[test]
    fn test_host_params_drive_anchor() {
        let registry = ModelRegistry::with_builtin();
        let mut doc = mounted_pair(&registry);
        if let Some(stand) = doc.get_mut(&ItemId::from("stand")) {
            stand.params.set("armLength", 0.5);
            assert!(stand.params.contains(MOUNT_SLOT));
        }
        let mut rec = reconciler();
        rec.full_rebuild(&doc).expect("rebuild");
        let phone = rec.node_for(&ItemId::from("phone")).expect("phone");
        assert!((rec.graph().get(phone).expect("phone").translation.x - 0.5).abs() < 1e-5);
    }
}
