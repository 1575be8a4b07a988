//! Error types for desk-layout operations.

use thiserror::Error;

use crate::item::ItemKind;

/// Result type for core document operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by document parsing, validation and persistence.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A kind tag outside the known set.
    #[error("Unknown item kind: {0}")]
    UnknownKind(String),

    /// The document breaks a structural invariant.
    #[error("Invalid layout document: {0}")]
    InvalidDocument(String),

    /// Document serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An I/O error occurred during persistence.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while building the part tree of an item.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    /// A required parameter is absent.
    #[error("{kind}: missing parameter '{key}'")]
    MissingParam {
        /// Kind being built.
        kind: ItemKind,
        /// Parameter key.
        key: String,
    },

    /// A parameter is present but unusable.
    #[error("{kind}: invalid parameter '{key}': {reason}")]
    InvalidParam {
        /// Kind being built.
        kind: ItemKind,
        /// Parameter key.
        key: String,
        /// What is wrong with it.
        reason: String,
    },

    /// No recipe is registered for the kind.
    #[error("No recipe registered for kind: {0}")]
    UnregisteredKind(ItemKind),

    /// The kind has no mount anchor.
    #[error("{0} cannot host a mounted item")]
    NotMountHost(ItemKind),
}
