//! Error types shared across fracstore components.

use thiserror::Error;

use crate::types::EntityKind;

/// A specialized `Result` type for fracstore operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the metadata repository and the components built on it.
///
/// Repository failures propagate unmodified through every event handler; no
/// retries happen below the transport layer.
#[derive(Debug, Error)]
pub enum Error {
    /// A referenced entity does not exist in the metadata repository.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Kind of the missing entity.
        kind: EntityKind,
        /// Id that was looked up.
        id: u64,
    },

    /// An I/O failure in the repository backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A write conflicted with an existing record.
    #[error("conflicting write: {0}")]
    Conflict(String),

    /// Invalid or unparseable configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Shorthand for a [`Error::NotFound`] value.
    #[must_use]
    pub fn not_found(kind: EntityKind, id: u64) -> Self {
        Self::NotFound { kind, id }
    }

    /// Returns true if this error is a missing-entity error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
