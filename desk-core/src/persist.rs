//! Single-slot autosave persistence.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::CoreResult;

/// Key of the one autosave slot.
pub const AUTOSAVE_KEY: &str = "ar-desk-planner-autosave";

/// A place the current document is written after every checkpoint.
///
/// Writes are best-effort: the store logs failures and carries on.
pub trait AutosaveSlot {
    /// Overwrite the slot.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium rejects the write.
    fn write(&mut self, payload: &str) -> CoreResult<()>;

    /// Read the slot. `Ok(None)` means nothing was saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium cannot be read.
    fn read(&self) -> CoreResult<Option<String>>;

    /// Empty the slot.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium rejects the removal.
    fn clear(&mut self) -> CoreResult<()>;
}

/// Autosave slot stored as `<data_dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileAutosave {
    path: PathBuf,
}

impl FileAutosave {
    /// Use the default key inside `data_dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(data_dir: impl AsRef<Path>) -> CoreResult<Self> {
        Self::with_key(data_dir, AUTOSAVE_KEY)
    }

    /// Use a custom key inside `data_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn with_key(data_dir: impl AsRef<Path>, key: &str) -> CoreResult<Self> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir)?;
        Ok(Self {
            path: data_dir.join(format!("{}.json", sanitize_filename(key))),
        })
    }

    /// Path of the slot file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AutosaveSlot for FileAutosave {
    fn write(&mut self, payload: &str) -> CoreResult<()> {
        std::fs::write(&self.path, payload)?;
        Ok(())
    }

    fn read(&self) -> CoreResult<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn clear(&mut self) -> CoreResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory autosave slot. Clones share the same payload, so a test can keep
/// a handle after giving the slot to a store.
#[derive(Debug, Clone, Default)]
pub struct MemoryAutosave {
    payload: Arc<Mutex<Option<String>>>,
}

impl MemoryAutosave {
    /// An empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A slot pre-filled with `payload`.
    #[must_use]
    pub fn with_payload(payload: impl Into<String>) -> Self {
        Self {
            payload: Arc::new(Mutex::new(Some(payload.into()))),
        }
    }

    /// Current payload.
    #[must_use]
    pub fn payload(&self) -> Option<String> {
        self.payload
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AutosaveSlot for MemoryAutosave {
    fn write(&mut self, payload: &str) -> CoreResult<()> {
        *self.payload.lock().unwrap_or_else(PoisonError::into_inner) = Some(payload.to_string());
        Ok(())
    }

    fn read(&self) -> CoreResult<Option<String>> {
        Ok(self.payload())
    }

    fn clear(&mut self) -> CoreResult<()> {
        *self.payload.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Replace every character outside `[A-Za-z0-9_-]` with `_`.
fn sanitize_filename(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_slot_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut slot = FileAutosave::new(dir.path()).expect("slot");
        assert_eq!(
            slot.path(),
            dir.path().join("ar-desk-planner-autosave.json")
        );

        assert!(slot.read().expect("read").is_none());
        slot.write("{\"documentName\":\"x\"}").expect("write");
        assert_eq!(
            slot.read().expect("read").as_deref(),
            Some("{\"documentName\":\"x\"}")
        );

        slot.clear().expect("clear");
        assert!(slot.read().expect("read").is_none());
        slot.clear().expect("clearing twice is fine");
    }

    #[test]
    fn test_file_slot_creates_missing_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("a").join("b");
        let mut slot = FileAutosave::new(&nested).expect("slot");
        slot.write("{}").expect("write");
        assert!(nested.exists());
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("ar-desk-planner-autosave"), "ar-desk-planner-autosave");
        assert_eq!(sanitize_filename("../etc/passwd"), "___etc_passwd");
    }

    #[test]
    fn test_memory_slot_clones_share_payload() {
        let handle = MemoryAutosave::new();
        let mut slot = handle.clone();
        slot.write("saved").expect("write");
        assert_eq!(handle.payload().as_deref(), Some("saved"));
        slot.clear().expect("clear");
        assert!(handle.payload().is_none());
    }
}
