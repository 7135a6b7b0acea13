//! In-memory roster storage, used for tests and for running without a data
//! directory.

use shared::ParticipantRecord;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use super::traits::{RosterStorage, StorageError};

#[derive(Debug, Default)]
pub struct MemoryRosterStorage {
    records: Mutex<Vec<ParticipantRecord>>,
    save_count: AtomicUsize,
    corrupt: AtomicBool,
    fail_saves: AtomicBool,
}

impl MemoryRosterStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage preloaded with an existing snapshot
    pub fn with_records(records: Vec<ParticipantRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    /// Storage whose `load` reports a corrupt snapshot
    pub fn corrupt() -> Self {
        let storage = Self::default();
        storage.corrupt.store(true, Ordering::SeqCst);
        storage
    }

    /// Make subsequent saves fail with an I/O error
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Copy of the last saved snapshot
    pub fn snapshot(&self) -> Vec<ParticipantRecord> {
        self.lock().clone()
    }

    pub fn save_count(&self) -> usize {
        self.save_count.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ParticipantRecord>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RosterStorage for MemoryRosterStorage {
    fn load(&self) -> Result<Vec<ParticipantRecord>, StorageError> {
        if self.corrupt.load(Ordering::SeqCst) {
            if let Err(error) = serde_json::from_str::<Vec<ParticipantRecord>>("{") {
                return Err(error.into());
            }
        }
        Ok(self.lock().clone())
    }

    fn save(&self, snapshot: &[ParticipantRecord]) -> Result<(), StorageError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "memory storage is read-only",
            )));
        }
        *self.lock() = snapshot.to_vec();
        self.save_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
