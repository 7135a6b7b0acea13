//! # Storage Traits
//!
//! This module defines the storage abstraction the roster service persists
//! through, so the domain layer works against any backend (JSON file,
//! in-memory) without modification.

use shared::ParticipantRecord;
use thiserror::Error;

/// Failures a roster storage backend can report
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored roster snapshot is unreadable: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Trait defining the persistence port for the roster.
///
/// The roster is always read and written as one whole snapshot; there is
/// no partial persistence.
pub trait RosterStorage: Send + Sync {
    /// Load the stored snapshot. A backend with nothing stored yet returns
    /// an empty list rather than an error.
    fn load(&self) -> Result<Vec<ParticipantRecord>, StorageError>;

    /// Replace the stored snapshot with `snapshot`
    fn save(&self, snapshot: &[ParticipantRecord]) -> Result<(), StorageError>;
}
