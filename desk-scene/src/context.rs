//! Render context: backend ownership, camera and frame scheduling.
//!
//! A [`SceneContext`] has an explicit lifecycle. Nothing renders before
//! [`SceneContext::init`] or after [`SceneContext::dispose`].

use glam::Vec2;

use crate::backend::RenderBackend;
use crate::camera::Camera;
use crate::error::{SceneError, SceneResult};
use crate::graph::SceneGraph;

/// Coalesces render requests: any number of requests between two frames
/// produce one render.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameScheduler {
    pending: bool,
    requests: u64,
}

impl FrameScheduler {
    /// Ask for a frame.
    pub fn request_render(&mut self) {
        self.pending = true;
        self.requests += 1;
    }

    /// Whether a frame is pending.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Consume the pending request, if any.
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }

    /// Total requests seen.
    #[must_use]
    pub fn requests(&self) -> u64 {
        self.requests
    }
}

/// Owns the backend, camera and render scheduling.
pub struct SceneContext {
    backend: Option<Box<dyn RenderBackend>>,
    camera: Camera,
    scheduler: FrameScheduler,
    orbit_enabled: bool,
    frames_rendered: u64,
}

impl std::fmt::Debug for SceneContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneContext")
            .field("backend", &self.backend.as_ref().map(|b| b.name()))
            .field("camera", &self.camera)
            .field("scheduler", &self.scheduler)
            .field("orbit_enabled", &self.orbit_enabled)
            .field("frames_rendered", &self.frames_rendered)
            .finish()
    }
}

impl Default for SceneContext {
    fn default() -> Self {
        Self::new(Camera::default())
    }
}

impl SceneContext {
    /// An uninitialized context.
    #[must_use]
    pub fn new(camera: Camera) -> Self {
        Self {
            backend: None,
            camera,
            scheduler: FrameScheduler::default(),
            orbit_enabled: true,
            frames_rendered: 0,
        }
    }

    /// Attach a backend and size the viewport. Replaces any previous backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the size.
    pub fn init(
        &mut self,
        mut backend: Box<dyn RenderBackend>,
        width: u32,
        height: u32,
    ) -> SceneResult<()> {
        backend.resize(width, height)?;
        self.camera.set_viewport(width, height);
        tracing::info!("Scene context initialized with {} backend", backend.name());
        self.backend = Some(backend);
        self.scheduler.request_render();
        Ok(())
    }

    /// Drop the backend. Pending requests are discarded.
    pub fn dispose(&mut self) {
        if let Some(backend) = self.backend.take() {
            tracing::info!("Scene context disposed ({} backend)", backend.name());
        }
        self.scheduler.take();
    }

    /// Whether a backend is attached.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.backend.is_some()
    }

    /// Resize the viewport.
    ///
    /// # Errors
    ///
    /// [`SceneError::NotInitialized`] without a backend.
    pub fn resize(&mut self, width: u32, height: u32) -> SceneResult<()> {
        let backend = self.backend.as_mut().ok_or(SceneError::NotInitialized)?;
        backend.resize(width, height)?;
        self.camera.set_viewport(width, height);
        self.scheduler.request_render();
        Ok(())
    }

    /// Ask for a frame on the next [`SceneContext::frame`].
    pub fn request_render(&mut self) {
        self.scheduler.request_render();
    }

    /// Whether a frame is pending.
    #[must_use]
    pub fn is_render_pending(&self) -> bool {
        self.scheduler.is_pending()
    }

    /// Render if a frame was requested. Returns whether a frame was drawn.
    ///
    /// # Errors
    ///
    /// [`SceneError::NotInitialized`] without a backend, or a backend error.
    pub fn frame(&mut self, graph: &SceneGraph) -> SceneResult<bool> {
        let backend = self.backend.as_mut().ok_or(SceneError::NotInitialized)?;
        if !self.scheduler.take() {
            return Ok(false);
        }
        backend.render(graph, &self.camera)?;
        self.frames_rendered += 1;
        Ok(true)
    }

    /// Frames drawn since creation.
    #[must_use]
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// The camera.
    #[must_use]
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Mutable camera access. Requests a frame.
    pub fn camera_mut(&mut self) -> &mut Camera {
        self.scheduler.request_render();
        &mut self.camera
    }

    /// Enable or disable orbit input.
    pub fn set_orbit_enabled(&mut self, enabled: bool) {
        self.orbit_enabled = enabled;
    }

    /// Whether orbit input is accepted.
    #[must_use]
    pub fn is_orbit_enabled(&self) -> bool {
        self.orbit_enabled
    }

    /// Orbit the camera if orbit input is enabled. Returns whether it moved.
    pub fn orbit(&mut self, delta: Vec2) -> bool {
        if !self.orbit_enabled {
            return false;
        }
        self.camera.orbit(delta.x, delta.y);
        self.scheduler.request_render();
        true
    }
}
