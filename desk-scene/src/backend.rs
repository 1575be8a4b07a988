//! Rendering backends.

use crate::camera::Camera;
use crate::error::SceneResult;
use crate::graph::SceneGraph;

/// Trait for rendering backends.
pub trait RenderBackend {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Draw one frame of the graph as seen by the camera.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn render(&mut self, graph: &SceneGraph, camera: &Camera) -> SceneResult<()>;

    /// Resize the rendering surface.
    ///
    /// # Errors
    ///
    /// Returns an error if resizing fails.
    fn resize(&mut self, width: u32, height: u32) -> SceneResult<()>;
}

/// Backend that draws nothing and counts frames. Used by the CLI and tests.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    frames: u64,
    width: u32,
    height: u32,
}

impl HeadlessBackend {
    /// Create a new headless backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames rendered so far.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Current surface size.
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl RenderBackend for HeadlessBackend {
    fn name(&self) -> &'static str {
        "headless"
    }

    fn render(&mut self, graph: &SceneGraph, camera: &Camera) -> SceneResult<()> {
        self.frames += 1;
        tracing::trace!(
            "Headless frame {}: {} nodes, {} meshes, eye {:?}",
            self.frames,
            graph.node_count(),
            graph.resources().live_count(),
            camera.position
        );
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) -> SceneResult<()> {
        self.width = width;
        self.height = height;
        tracing::debug!("Headless backend resized to {}x{}", width, height);
        Ok(())
    }
}
