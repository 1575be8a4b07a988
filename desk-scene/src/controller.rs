//! Selection, gizmo and drag handling.
//!
//! The controller owns no scene state of its own beyond the selection. Every
//! operation borrows the store, the reconciler and the context it needs, so
//! the editor stays the single owner of all three.

use glam::{EulerRot, Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use desk_core::{Coord3, ItemId, ItemPatch, LayoutDocument, LayoutStore};

use crate::camera::Camera;
use crate::context::SceneContext;
use crate::error::{SceneError, SceneResult};
use crate::graph::NodeId;
use crate::picking::{intersect, pick_item, Ray};
use crate::reconciler::Reconciler;

/// Transform gizmo mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GizmoMode {
    /// Move along axes.
    #[default]
    Translate,
    /// Rotate about axes.
    Rotate,
}

impl GizmoMode {
    /// The other mode.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Translate => Self::Rotate,
            Self::Rotate => Self::Translate,
        }
    }
}

/// What clicks do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayMode {
    /// Clicks select items.
    #[default]
    Select,
    /// Clicks report surface points to the measurement overlay.
    Measure,
}

/// Result of a click.
#[derive(Debug, Clone, PartialEq)]
pub enum PickOutcome {
    /// A different item is now selected; the gizmo is back in translate mode.
    Selected(ItemId),
    /// The selected item was clicked again.
    ModeToggled(GizmoMode),
    /// Nothing was hit; the selection was cleared.
    Cleared,
    /// Measurement hit in world space.
    Surface {
        /// Hit point.
        point: Vec3,
        /// Unit surface normal.
        normal: Vec3,
    },
    /// Measurement click that hit nothing.
    Missed,
}

/// Selection and transform tool.
#[derive(Debug, Default)]
pub struct Controller {
    selected: Option<ItemId>,
    gizmo_mode: GizmoMode,
    overlay_mode: OverlayMode,
    gizmo_target: Option<NodeId>,
    dragging: Option<ItemId>,
}

impl Controller {
    /// A controller with nothing selected.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Selected item.
    #[must_use]
    pub fn selected(&self) -> Option<&ItemId> {
        self.selected.as_ref()
    }

    /// Current gizmo mode.
    #[must_use]
    pub fn gizmo_mode(&self) -> GizmoMode {
        self.gizmo_mode
    }

    /// Node the gizmo is attached to.
    #[must_use]
    pub fn gizmo_target(&self) -> Option<NodeId> {
        self.gizmo_target
    }

    /// Current overlay mode.
    #[must_use]
    pub fn overlay_mode(&self) -> OverlayMode {
        self.overlay_mode
    }

    /// Switch between selection and measurement clicks.
    pub fn set_overlay_mode(&mut self, mode: OverlayMode) {
        self.overlay_mode = mode;
    }

    /// Whether a drag is in progress.
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.dragging.is_some()
    }

    /// Select an item directly, attaching the gizmo to its node.
    pub fn select(&mut self, id: ItemId, reconciler: &Reconciler) {
        self.gizmo_target = reconciler.node_for(&id);
        if self.selected.as_ref() != Some(&id) {
            self.gizmo_mode = GizmoMode::Translate;
        }
        self.selected = Some(id);
    }

    /// Drop the selection and detach the gizmo.
    pub fn clear_selection(&mut self) {
        self.selected = None;
        self.gizmo_target = None;
    }

    /// Handle a click at `ndc` (normalized device coordinates).
    pub fn handle_click(&mut self, reconciler: &Reconciler, camera: &Camera, ndc: Vec2) -> PickOutcome {
        let ray = camera.ray_from_ndc(ndc);
        let graph = reconciler.graph();

        if self.overlay_mode == OverlayMode::Measure {
            return match intersect(graph, &ray, &[graph.root()], None) {
                Some(hit) => PickOutcome::Surface {
                    point: hit.point,
                    normal: hit.normal,
                },
                None => PickOutcome::Missed,
            };
        }

        let picked = pick_item(graph, &ray).and_then(|(node, _)| reconciler.item_for(node).cloned());
        match picked {
            Some(id) if self.selected.as_ref() == Some(&id) => {
                self.gizmo_mode = self.gizmo_mode.toggled();
                tracing::debug!("Gizmo mode toggled to {:?}", self.gizmo_mode);
                PickOutcome::ModeToggled(self.gizmo_mode)
            }
            Some(id) => {
                tracing::debug!("Selected {}", id);
                self.select(id.clone(), reconciler);
                PickOutcome::Selected(id)
            }
            None => {
                self.clear_selection();
                PickOutcome::Cleared
            }
        }
    }

    /// Begin dragging the selected item.
    ///
    /// Suspends full reconciliation, disables orbit input and opens a store
    /// gesture so the whole drag yields one checkpoint.
    ///
    /// # Errors
    ///
    /// [`SceneError::NoSelection`], [`SceneError::MountedItem`] or
    /// [`SceneError::ItemNotRendered`].
    pub fn drag_start(
        &mut self,
        store: &mut LayoutStore,
        reconciler: &mut Reconciler,
        context: &mut SceneContext,
    ) -> SceneResult<()> {
        if self.dragging.is_some() {
            return Ok(());
        }
        let id = self.selected.clone().ok_or(SceneError::NoSelection)?;
        let item = store
            .get(&id)
            .ok_or_else(|| SceneError::ItemNotRendered(id.clone()))?;
        if item.is_mounted() {
            return Err(SceneError::MountedItem(id));
        }
        let node = reconciler
            .node_for(&id)
            .ok_or_else(|| SceneError::ItemNotRendered(id.clone()))?;

        reconciler.suspend();
        context.set_orbit_enabled(false);
        store.begin_gesture();
        self.gizmo_target = Some(node);
        self.dragging = Some(id);
        Ok(())
    }

    /// Apply one frame of gizmo movement: local translation and rotation of
    /// the dragged node, mirrored into the store in degrees.
    ///
    /// # Errors
    ///
    /// [`SceneError::NoSelection`] outside a drag, or a rejected store update.
    pub fn drag_frame(
        &mut self,
        store: &mut LayoutStore,
        reconciler: &mut Reconciler,
        context: &mut SceneContext,
        translation: Vec3,
        rotation: Quat,
    ) -> SceneResult<()> {
        let id = self.dragging.clone().ok_or(SceneError::NoSelection)?;
        let node = reconciler
            .node_for(&id)
            .ok_or_else(|| SceneError::ItemNotRendered(id.clone()))?;
        reconciler
            .graph_mut()
            .set_local_transform(node, translation, rotation)?;

        let (x, y, z) = rotation.to_euler(EulerRot::XYZ);
        let patch = ItemPatch::new()
            .position(Coord3::from(translation))
            .rotation(Coord3::new(x.to_degrees(), y.to_degrees(), z.to_degrees()));
        store.update(&id, patch)?;
        context.request_render();
        Ok(())
    }

    /// Finish a drag. Returns whether the gesture produced a checkpoint.
    pub fn drag_end(
        &mut self,
        store: &mut LayoutStore,
        reconciler: &mut Reconciler,
        context: &mut SceneContext,
    ) -> bool {
        if self.dragging.take().is_none() {
            return false;
        }
        reconciler.resume();
        context.set_orbit_enabled(true);
        store.end_gesture()
    }

    /// Snap the selected item down onto the nearest surface below its origin.
    ///
    /// Returns `Ok(false)` and leaves the item untouched when nothing is below.
    ///
    /// # Errors
    ///
    /// [`SceneError::NoSelection`], [`SceneError::MountedItem`],
    /// [`SceneError::ItemNotRendered`] or a rejected store update.
    pub fn drop_to_surface(
        &mut self,
        store: &mut LayoutStore,
        reconciler: &Reconciler,
    ) -> SceneResult<bool> {
        let id = self.selected.clone().ok_or(SceneError::NoSelection)?;
        let item = store
            .get(&id)
            .ok_or_else(|| SceneError::ItemNotRendered(id.clone()))?;
        if item.is_mounted() {
            return Err(SceneError::MountedItem(id));
        }
        let node = reconciler
            .node_for(&id)
            .ok_or_else(|| SceneError::ItemNotRendered(id.clone()))?;
        let graph = reconciler.graph();
        let Some((min, _)) = graph.world_bounds(node) else {
            return Ok(false);
        };

        let origin = graph.world_matrix(node).transform_point3(Vec3::ZERO);
        let offset = origin.y - min.y;
        let Some(hit) = intersect(graph, &Ray::down(origin), &[graph.root()], Some(node)) else {
            tracing::debug!("Nothing below {}, drop skipped", id);
            return Ok(false);
        };

        let target = Vec3::new(origin.x, hit.point.y + offset, origin.z);
        let parent = graph.get(node).and_then(|n| n.parent);
        let local = parent.map_or(target, |p| {
            graph.world_matrix(p).inverse().transform_point3(target)
        });
        store.update(&id, ItemPatch::new().position(Coord3::from(local)))?;
        tracing::debug!("Dropped {} onto surface at y={:.4}", id, target.y);
        Ok(true)
    }

    /// Re-attach the gizmo after a full rebuild. A selection whose item is gone
    /// is cleared.
    pub fn reattach(&mut self, reconciler: &Reconciler, document: &LayoutDocument) -> Option<NodeId> {
        let Some(id) = self.selected.clone() else {
            self.gizmo_target = None;
            return None;
        };
        if !document.contains(&id) {
            self.clear_selection();
            return None;
        }
        self.gizmo_target = reconciler.node_for(&id);
        self.gizmo_target
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::backend::HeadlessBackend;
    use crate::resolver::GltfResolver;
    use desk_core::{ItemKind, ModelRegistry};

    struct Fixture {
        store: LayoutStore,
        reconciler: Reconciler,
        context: SceneContext,
        controller: Controller,
    }

    impl Fixture {
        fn new() -> Self {
            let registry = Arc::new(ModelRegistry::with_builtin());
            let mut context = SceneContext::default();
            context
                .init(Box::new(HeadlessBackend::new()), 800, 600)
                .expect("init");
            Self {
                store: LayoutStore::new(Arc::clone(&registry)),
                reconciler: Reconciler::new(registry, Arc::new(GltfResolver::new())),
                context,
                controller: Controller::new(),
            }
        }

        fn rebuild(&mut self) {
            self.store.take_reconcile_request();
            self.reconciler
                .full_rebuild(self.store.document())
                .expect("rebuild");
        }
    }

    fn top_down_camera() -> Camera {
        Camera {
            position: Vec3::new(0.0, 3.0, 0.5),
            target: Vec3::ZERO,
            ..Camera::default()
        }
    }

    #[test]
    fn test_click_selects_then_toggles() {
        let mut fx = Fixture::new();
        let desk = fx.store.add(ItemKind::DeskRect).expect("desk");
        fx.rebuild();
        let camera = top_down_camera();

        let outcome = fx.controller.handle_click(&fx.reconciler, &camera, Vec2::ZERO);
        assert_eq!(outcome, PickOutcome::Selected(desk.clone()));
        assert_eq!(fx.controller.gizmo_target(), fx.reconciler.node_for(&desk));

        let outcome = fx.controller.handle_click(&fx.reconciler, &camera, Vec2::ZERO);
        assert_eq!(outcome, PickOutcome::ModeToggled(GizmoMode::Rotate));

        let outcome = fx.controller.handle_click(&fx.reconciler, &camera, Vec2::new(0.99, 0.99));
        assert_eq!(outcome, PickOutcome::Cleared);
        assert!(fx.controller.selected().is_none());
    }

    #[test]
    fn test_measure_click_keeps_selection() {
        let mut fx = Fixture::new();
        let desk = fx.store.add(ItemKind::DeskRect).expect("desk");
        fx.rebuild();
        fx.controller.select(desk.clone(), &fx.reconciler);
        fx.controller.set_overlay_mode(OverlayMode::Measure);

        let outcome = fx.controller.handle_click(&fx.reconciler, &top_down_camera(), Vec2::ZERO);
        let PickOutcome::Surface { point, normal } = outcome else {
            panic!("expected a surface hit, got {outcome:?}");
        };
        assert!((point.y - 0.75).abs() < 1e-3);
        assert!(normal.y > 0.99);
        assert_eq!(fx.controller.selected(), Some(&desk));
    }

    #[test]
    fn test_drag_yields_one_checkpoint() {
        let mut fx = Fixture::new();
        let id = fx.store.add(ItemKind::Keyboard).expect("keyboard");
        fx.rebuild();
        fx.controller.select(id.clone(), &fx.reconciler);
        let before = fx.store.history().len();

        fx.controller
            .drag_start(&mut fx.store, &mut fx.reconciler, &mut fx.context)
            .expect("start");
        assert!(fx.reconciler.is_suspended());
        assert!(!fx.context.is_orbit_enabled());
        for step in 1..=5u8 {
            let x = f32::from(step) * 0.01;
            fx.controller
                .drag_frame(
                    &mut fx.store,
                    &mut fx.reconciler,
                    &mut fx.context,
                    Vec3::new(x, 0.75, 0.0),
                    Quat::from_rotation_y(0.1),
                )
                .expect("frame");
        }
        assert!(fx.controller.drag_end(&mut fx.store, &mut fx.reconciler, &mut fx.context));

        assert_eq!(fx.store.history().len(), before + 1);
        assert!(!fx.reconciler.is_suspended());
        let item = fx.store.get(&id).expect("item");
        assert!((item.position.x - 0.05).abs() < 1e-6);
        assert!((item.rotation.y - 0.1f32.to_degrees()).abs() < 1e-3);
    }

    #[test]
    fn test_drag_needs_selection() {
        let mut fx = Fixture::new();
        assert!(matches!(
            fx.controller
                .drag_start(&mut fx.store, &mut fx.reconciler, &mut fx.context),
            Err(SceneError::NoSelection)
        ));
    }

    #[test]
    fn test_drop_to_surface_lands_on_desk() {
        let mut fx = Fixture::new();
        fx.store.add(ItemKind::DeskRect).expect("desk");
        let id = fx.store.add(ItemKind::CustomBox).expect("box");
        fx.store
            .update(&id, ItemPatch::new().position(Coord3::new(0.0, 1.5, 0.0)))
            .expect("lift");
        fx.rebuild();
        fx.controller.select(id.clone(), &fx.reconciler);

        assert!(fx
            .controller
            .drop_to_surface(&mut fx.store, &fx.reconciler)
            .expect("drop"));
        fx.reconciler.patch_transforms(fx.store.document(), [&id]);
        let node = fx.reconciler.node_for(&id).expect("node");
        let (min, _) = fx.reconciler.graph().world_bounds(node).expect("bounds");
        assert!((min.y - 0.75).abs() < 1e-4);
    }

    #[test]
    fn test_reattach_clears_deleted_selection() {
        let mut fx = Fixture::new();
        let id = fx.store.add(ItemKind::Mouse).expect("mouse");
        fx.rebuild();
        fx.controller.select(id.clone(), &fx.reconciler);
        assert!(fx.controller.reattach(&fx.reconciler, fx.store.document()).is_some());

        fx.store.delete(&id).expect("delete");
        fx.rebuild();
        assert!(fx.controller.reattach(&fx.reconciler, fx.store.document()).is_none());
        assert!(fx.controller.selected().is_none());
    }
}
