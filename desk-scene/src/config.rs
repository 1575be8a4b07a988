//! Editor configuration.

use std::path::PathBuf;
use std::sync::Arc;

use desk_core::{CoreResult, FileAutosave, LayoutStore, ModelRegistry};

use crate::camera::Camera;

/// Editor session configuration.
#[derive(Debug, Clone)]
pub struct EditorConfig {
    /// Viewport width in pixels.
    pub width: u32,
    /// Viewport height in pixels.
    pub height: u32,
    /// Initial camera.
    pub camera: Camera,
    /// Whether checkpoints are written to the autosave slot.
    pub autosave: bool,
    /// Directory holding the autosave file. Without one there is no slot.
    pub data_dir: Option<PathBuf>,
    /// Maximum number of history snapshots, unbounded if `None`.
    pub history_capacity: Option<usize>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            width: 1280,
            height: 720,
            camera: Camera::default(),
            autosave: true,
            data_dir: None,
            history_capacity: None,
        }
    }

    /// Build the layout store this configuration describes.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the autosave directory cannot be created.
    pub fn build_store(&self, registry: Arc<ModelRegistry>) -> CoreResult<LayoutStore> {
        let mut store = LayoutStore::new(registry);
        if let Some(capacity) = self.history_capacity {
            store = store.with_history_capacity(capacity);
        }
        if self.autosave {
            if let Some(dir) = &self.data_dir {
                let slot = FileAutosave::new(dir)?;
                tracing::debug!("Autosave slot at {}", slot.path().display());
                store = store.with_autosave(Box::new(slot));
            }
        }
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use desk_core::ItemKind;

    #[test]
    fn test_store_writes_autosave_in_data_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = EditorConfig {
            data_dir: Some(dir.path().to_path_buf()),
            history_capacity: Some(3),
            ..EditorConfig::default()
        };
        let mut store = config
            .build_store(Arc::new(ModelRegistry::with_builtin()))
            .expect("store");
        for _ in 0..5 {
            store.add(ItemKind::Mouse).expect("add");
        }
        assert_eq!(store.history().len(), 3);
        assert!(dir
            .path()
            .join(format!("{}.json", desk_core::AUTOSAVE_KEY))
            .exists());
    }

    #[test]
    fn test_autosave_disabled() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = EditorConfig {
            data_dir: Some(dir.path().to_path_buf()),
            autosave: false,
            ..EditorConfig::default()
        };
        let mut store = config
            .build_store(Arc::new(ModelRegistry::with_builtin()))
            .expect("store");
        store.add(ItemKind::Mouse).expect("add");
        assert_eq!(std::fs::read_dir(dir.path()).expect("read dir").count(), 0);
    }
}
