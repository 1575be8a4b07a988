//! Editor session.
//!
//! The [`Editor`] owns the store, the reconciler, the controller and the
//! scene context, and runs the control loop between them:
//!
//! ```text
//! user action ─► LayoutStore ─► checkpoint ─► reconcile request
//!                                                  │
//!                         Editor::sync ◄───────────┘
//!                              │
//!            Reconciler (full rebuild | transform patch)
//!                              │
//!                   Controller::reattach ─► request_render
//! ```
//!
//! Full rebuilds requested while a drag is active are held back and run when
//! the drag ends.

use std::sync::Arc;

use glam::{Quat, Vec2, Vec3};

use desk_core::{
    ChangeClass, CoreResult, ItemId, ItemKind, ItemPatch, LayoutStore, ModelRegistry,
    ReconcileRequest, StoreResult,
};

use crate::backend::RenderBackend;
use crate::camera::Camera;
use crate::config::EditorConfig;
use crate::context::SceneContext;
use crate::controller::{Controller, PickOutcome};
use crate::error::{SceneError, SceneResult};
use crate::export::{ExportNode, ExportOptions, SceneExporter};
use crate::reconciler::{RebuildReport, Reconciler};
use crate::resolver::{GltfResolver, ModelResolver};

/// One editing session over one layout.
#[derive(Debug)]
pub struct Editor {
    store: LayoutStore,
    reconciler: Reconciler,
    controller: Controller,
    context: SceneContext,
    deferred: Option<ReconcileRequest>,
    last_report: Option<RebuildReport>,
}

impl Editor {
    /// Create an editor from a configuration, with the builtin registry and
    /// the glTF resolver.
    ///
    /// # Errors
    ///
    /// Returns an error if the autosave slot cannot be prepared.
    pub fn new(config: &EditorConfig) -> SceneResult<Self> {
        let registry = Arc::new(ModelRegistry::with_builtin());
        let store = config.build_store(Arc::clone(&registry))?;
        Ok(Self::from_parts(
            store,
            Arc::new(GltfResolver::new()),
            config.camera.clone(),
        ))
    }

    /// Assemble an editor around an existing store.
    #[must_use]
    pub fn from_parts(store: LayoutStore, resolver: Arc<dyn ModelResolver>, camera: Camera) -> Self {
        let reconciler = Reconciler::new(store.registry_handle(), resolver);
        Self {
            store,
            reconciler,
            controller: Controller::new(),
            context: SceneContext::new(camera),
            deferred: None,
            last_report: None,
        }
    }

    /// The layout store.
    #[must_use]
    pub fn store(&self) -> &LayoutStore {
        &self.store
    }

    /// The reconciler and its render graph.
    #[must_use]
    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// The selection controller.
    #[must_use]
    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    /// Mutable selection controller, for mode switches.
    pub fn controller_mut(&mut self) -> &mut Controller {
        &mut self.controller
    }

    /// The render context.
    #[must_use]
    pub fn context(&self) -> &SceneContext {
        &self.context
    }

    /// Mutable render context, for camera input.
    pub fn context_mut(&mut self) -> &mut SceneContext {
        &mut self.context
    }

    /// Report of the most recent full rebuild.
    #[must_use]
    pub fn last_report(&self) -> Option<&RebuildReport> {
        self.last_report.as_ref()
    }

    /// Whether a full rebuild is waiting for a drag to end.
    #[must_use]
    pub fn has_deferred_rebuild(&self) -> bool {
        self.deferred.as_ref().is_some_and(ReconcileRequest::is_full)
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Attach a render backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the viewport size.
    pub fn init(&mut self, backend: Box<dyn RenderBackend>, width: u32, height: u32) -> SceneResult<()> {
        self.context.init(backend, width, height)
    }

    /// Detach the render backend.
    pub fn dispose(&mut self) {
        self.context.dispose();
    }

    /// Load the starting layout: `layout` if given, otherwise the autosave
    /// slot. Returns whether a document was loaded.
    ///
    /// # Errors
    ///
    /// Returns the import error for an invalid explicit layout.
    pub fn open(&mut self, layout: Option<&str>) -> SceneResult<bool> {
        let loaded = match layout {
            Some(json) => {
                self.store.import_json(json)?;
                true
            }
            None => self.store.restore_autosave(),
        };
        self.sync();
        Ok(loaded)
    }

    // ------------------------------------------------------------------
    // Store access
    // ------------------------------------------------------------------

    /// Run a store mutation, then reconcile whatever it requested.
    pub fn edit<R>(&mut self, mutate: impl FnOnce(&mut LayoutStore) -> R) -> R {
        let result = mutate(&mut self.store);
        self.sync();
        result
    }

    /// Add an item of `kind`.
    ///
    /// # Errors
    ///
    /// Any store rejection.
    pub fn add(&mut self, kind: ItemKind) -> StoreResult<ItemId> {
        self.edit(|store| store.add(kind))
    }

    /// Add an imported model from a data URL.
    ///
    /// # Errors
    ///
    /// Any store rejection.
    pub fn add_imported(&mut self, file_name: &str, data_url: &str) -> StoreResult<ItemId> {
        self.edit(|store| store.add_imported(file_name, data_url))
    }

    /// Patch an item.
    ///
    /// # Errors
    ///
    /// Any store rejection.
    pub fn update(&mut self, id: &ItemId, patch: ItemPatch) -> StoreResult<ChangeClass> {
        self.edit(|store| store.update(id, patch))
    }

    /// Mount `item_id` on `stand_id`.
    ///
    /// # Errors
    ///
    /// Any store rejection.
    pub fn mount(&mut self, stand_id: &ItemId, item_id: &ItemId) -> StoreResult<()> {
        self.edit(|store| store.mount(stand_id, item_id))
    }

    /// Free the item mounted on `stand_id`.
    ///
    /// # Errors
    ///
    /// Any store rejection.
    pub fn unmount(&mut self, stand_id: &ItemId) -> StoreResult<ItemId> {
        self.edit(|store| store.unmount(stand_id))
    }

    /// Delete an item.
    ///
    /// # Errors
    ///
    /// Any store rejection.
    pub fn delete(&mut self, id: &ItemId) -> StoreResult<()> {
        self.edit(|store| store.delete(id))
    }

    /// Step back in history.
    pub fn undo(&mut self) -> bool {
        self.edit(LayoutStore::undo)
    }

    /// Step forward in history.
    pub fn redo(&mut self) -> bool {
        self.edit(LayoutStore::redo)
    }

    /// Replace the layout with a parsed file.
    ///
    /// # Errors
    ///
    /// Parse or validation errors; nothing changes on error.
    pub fn import_json(&mut self, json: &str) -> CoreResult<()> {
        self.edit(|store| store.import_json(json))
    }

    /// Close the layout and clear the autosave slot.
    pub fn exit(&mut self) {
        self.controller.clear_selection();
        self.edit(LayoutStore::exit);
    }

    /// Drain the store's reconcile request and apply it. Returns whether the
    /// graph changed.
    pub fn sync(&mut self) -> bool {
        let request = match (self.deferred.take(), self.store.take_reconcile_request()) {
            (Some(held), Some(fresh)) => held.merge(fresh),
            (Some(held), None) => held,
            (None, Some(fresh)) => fresh,
            (None, None) => return false,
        };

        match self.reconciler.apply(self.store.document(), &request) {
            Ok(Some(report)) => {
                self.controller.reattach(&self.reconciler, self.store.document());
                self.last_report = Some(report);
            }
            Ok(None) => {}
            Err(SceneError::ReconcileBusy) => {
                tracing::debug!("Full rebuild deferred until the drag ends");
                self.deferred = Some(request);
                return false;
            }
            Err(e) => {
                tracing::warn!("Reconcile failed: {}", e);
                return false;
            }
        }
        self.context.request_render();
        true
    }

    // ------------------------------------------------------------------
    // Pointer input
    // ------------------------------------------------------------------

    /// Handle a click at normalized device coordinates.
    pub fn click(&mut self, ndc: Vec2) -> PickOutcome {
        let outcome = self
            .controller
            .handle_click(&self.reconciler, self.context.camera(), ndc);
        self.context.request_render();
        outcome
    }

    /// Select an item programmatically.
    pub fn select(&mut self, id: ItemId) {
        self.controller.select(id, &self.reconciler);
        self.context.request_render();
    }

    /// Begin dragging the selection.
    ///
    /// # Errors
    ///
    /// See [`Controller::drag_start`].
    pub fn drag_start(&mut self) -> SceneResult<()> {
        self.controller
            .drag_start(&mut self.store, &mut self.reconciler, &mut self.context)
    }

    /// Move the dragged item.
    ///
    /// # Errors
    ///
    /// See [`Controller::drag_frame`].
    pub fn drag_frame(&mut self, translation: Vec3, rotation: Quat) -> SceneResult<()> {
        self.controller.drag_frame(
            &mut self.store,
            &mut self.reconciler,
            &mut self.context,
            translation,
            rotation,
        )?;
        self.sync();
        Ok(())
    }

    /// Finish the drag and run any deferred rebuild. Returns whether a
    /// checkpoint was recorded.
    pub fn drag_end(&mut self) -> bool {
        let checkpointed =
            self.controller
                .drag_end(&mut self.store, &mut self.reconciler, &mut self.context);
        self.sync();
        checkpointed
    }

    /// Snap the selection onto the surface below it.
    ///
    /// # Errors
    ///
    /// See [`Controller::drop_to_surface`].
    pub fn drop_to_surface(&mut self) -> SceneResult<bool> {
        let dropped = self
            .controller
            .drop_to_surface(&mut self.store, &self.reconciler)?;
        if dropped {
            self.sync();
        }
        Ok(dropped)
    }

    // ------------------------------------------------------------------
    // Async models and frames
    // ------------------------------------------------------------------

    /// Link imported models whose geometry is ready. Returns how many were linked.
    pub fn pump(&mut self) -> usize {
        let linked = self.reconciler.pump(self.store.document());
        self.after_resolution(linked)
    }

    /// Wait for every imported model and link it.
    pub async fn settle(&mut self) -> usize {
        let linked = self.reconciler.settle(self.store.document()).await;
        self.after_resolution(linked)
    }

    fn after_resolution(&mut self, linked: usize) -> usize {
        if linked > 0 {
            self.controller.reattach(&self.reconciler, self.store.document());
            self.context.request_render();
        }
        linked
    }

    /// Render a frame if one was requested.
    ///
    /// # Errors
    ///
    /// [`SceneError::NotInitialized`] before [`Editor::init`], or a backend error.
    pub fn frame(&mut self) -> SceneResult<bool> {
        self.context.frame(self.reconciler.graph())
    }

    // ------------------------------------------------------------------
    // Views and export
    // ------------------------------------------------------------------

    /// World bounds of the selected item, for the selection box.
    #[must_use]
    pub fn selection_bounds(&self) -> Option<(Vec3, Vec3)> {
        let node = self.controller.gizmo_target()?;
        self.reconciler.graph().world_bounds(node)
    }

    /// Enter preview: clear the selection and frame the whole scene.
    /// Returns whether there was anything to frame.
    pub fn preview(&mut self) -> bool {
        self.controller.clear_selection();
        let graph = self.reconciler.graph();
        let Some((min, max)) = graph.world_bounds(graph.root()) else {
            return false;
        };
        self.context.camera_mut().frame_bounds(min, max);
        true
    }

    /// Clone the scene for 3D/AR viewing.
    ///
    /// # Errors
    ///
    /// [`SceneError::NoDesk`] when the desk is requested but absent.
    pub fn export_scene(&self, options: ExportOptions) -> SceneResult<ExportNode> {
        SceneExporter::new(options).export(&self.reconciler, self.store.document())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HeadlessBackend;
    use desk_core::Coord3;

    fn editor() -> Editor {
        let mut editor = Editor::new(&EditorConfig::default()).expect("editor");
        editor
            .init(Box::new(HeadlessBackend::new()), 800, 600)
            .expect("init");
        editor
    }

    #[test]
    fn test_edits_reconcile() {
        let mut editor = editor();
        let desk = editor.add(ItemKind::DeskRect).expect("desk");
        let kb = editor.add(ItemKind::Keyboard).expect("keyboard");
        assert_eq!(editor.reconciler().rendered_count(), 2);
        assert_eq!(editor.reconciler().surface_root(), editor.reconciler().node_for(&desk).expect("desk"));

        editor
            .update(&kb, ItemPatch::new().position(Coord3::new(0.2, 0.75, 0.1)))
            .expect("move");
        let node = editor.reconciler().node_for(&kb).expect("node");
        assert_eq!(
            editor.reconciler().graph().get(node).expect("kb").translation,
            Vec3::new(0.2, 0.75, 0.1)
        );
        assert_eq!(editor.reconciler().rebuild_count(), 2);
    }

    #[test]
    fn test_rebuild_deferred_during_drag() {
        let mut editor = editor();
        let kb = editor.add(ItemKind::Keyboard).expect("keyboard");
        editor.select(kb.clone());
        editor.drag_start().expect("drag");

        let mouse = editor.add(ItemKind::Mouse).expect("mouse");
        assert!(editor.has_deferred_rebuild());
        assert!(editor.reconciler().node_for(&mouse).is_none());

        editor
            .drag_frame(Vec3::new(0.1, 0.0, 0.0), Quat::IDENTITY)
            .expect("frame");
        assert!(editor.drag_end());
        assert!(!editor.has_deferred_rebuild());
        assert!(editor.reconciler().node_for(&mouse).is_some());
        assert_eq!(editor.controller().selected(), Some(&kb));
        assert!(editor.controller().gizmo_target().is_some());
    }

    #[test]
    fn test_render_coalescing() {
        let mut editor = editor();
        for _ in 0..4 {
            editor.add(ItemKind::Mouse).expect("mouse");
        }
        assert!(editor.frame().expect("frame"));
        assert!(!editor.frame().expect("idle"));
        assert_eq!(editor.context().frames_rendered(), 1);
    }

    #[test]
    fn test_preview_frames_scene() {
        let mut editor = editor();
        assert!(!editor.preview());
        let desk = editor.add(ItemKind::DeskRect).expect("desk");
        editor.select(desk);
        assert!(editor.selection_bounds().is_some());
        assert!(editor.preview());
        assert!(editor.controller().selected().is_none());
        assert!((editor.context().camera().target.y - 0.375).abs() < 1e-4);
    }

    #[test]
    fn test_open_without_layout_or_autosave() {
        let mut editor = editor();
        assert!(!editor.open(None).expect("open"));
        assert!(editor.open(Some("{ not json")).is_err());
        assert!(editor.store().document().is_empty());
    }
}
