//! # JSON Roster Repository
//!
//! File-backed roster storage. The whole roster lives in one JSON document
//! named after the storage key:
//!
//! ```text
//! data/
//! ├── config.yaml          ← optional, see `config`
//! └── event-data.json      ← this module manages this file
//! ```
//!
//! ```json
//! [
//!   {"id": "participant::…", "number": 1, "name": "Alice", "tag": "kol",
//!    "isWinner": false, "isCheckedIn": true, "checkinTime": "2025/1/15 14:30:00", "note": ""}
//! ]
//! ```
//!
//! Writes go to a temp file first and are renamed into place.

use log::{debug, info};
use shared::ParticipantRecord;
use std::fs;
use std::path::PathBuf;

use super::connection::JsonConnection;
use crate::backend::storage::traits::{RosterStorage, StorageError};

/// Default key the roster snapshot is stored under
pub const DEFAULT_STORAGE_KEY: &str = "event-data";

#[derive(Clone, Debug)]
pub struct JsonRosterRepository {
    connection: JsonConnection,
    storage_key: String,
}

impl JsonRosterRepository {
    pub fn new(connection: JsonConnection) -> Self {
        Self::with_key(connection, DEFAULT_STORAGE_KEY)
    }

    pub fn with_key(connection: JsonConnection, storage_key: impl Into<String>) -> Self {
        Self {
            connection,
            storage_key: storage_key.into(),
        }
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.connection.snapshot_path(&self.storage_key)
    }
}

impl RosterStorage for JsonRosterRepository {
    fn load(&self) -> Result<Vec<ParticipantRecord>, StorageError> {
        let path = self.snapshot_path();

        if !path.exists() {
            info!("No roster snapshot at {:?}, starting empty", path);
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path)?;
        let records: Vec<ParticipantRecord> = serde_json::from_str(&content)?;
        debug!("Loaded {} participants from {:?}", records.len(), path);
        Ok(records)
    }

    fn save(&self, snapshot: &[ParticipantRecord]) -> Result<(), StorageError> {
        let path = self.snapshot_path();
        let base_dir = self.connection.base_directory();

        if !base_dir.exists() {
            fs::create_dir_all(base_dir)?;
            info!("Created data directory: {:?}", base_dir);
        }

        let json = serde_json::to_string_pretty(snapshot)?;

        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, json)?;
        fs::rename(&temp_path, &path)?;

        debug!("Saved {} participants to {:?}", snapshot.len(), path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::storage::json::test_utils::TestEnvironment;

    fn record(number: u32, name: &str) -> ParticipantRecord {
        ParticipantRecord {
            id: format!("participant::{}", number),
            number,
            name: name.to_string(),
            tag: String::new(),
            is_winner: false,
            is_checked_in: false,
            checkin_time: String::new(),
            note: String::new(),
        }
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let env = TestEnvironment::new().unwrap();
        let repo = JsonRosterRepository::new(env.connection.clone());
        assert!(repo.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_and_load_snapshot() {
        let env = TestEnvironment::new().unwrap();
        let repo = JsonRosterRepository::new(env.connection.clone());

        let snapshot = vec![record(1, "Alice"), record(2, "Bob")];
        repo.save(&snapshot).unwrap();

        assert!(env.base_directory().join("event-data.json").exists());
        assert!(!env.base_directory().join("event-data.tmp").exists());
        assert_eq!(repo.load().unwrap(), snapshot);
    }

    #[test]
    fn test_save_replaces_whole_snapshot() {
        let env = TestEnvironment::new().unwrap();
        let repo = JsonRosterRepository::new(env.connection.clone());

        repo.save(&[record(1, "Alice"), record(2, "Bob")]).unwrap();
        repo.save(&[record(2, "Bob")]).unwrap();

        let loaded = repo.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "Bob");
    }

    #[test]
    fn test_corrupt_snapshot_reports_error() {
        let env = TestEnvironment::new().unwrap();
        let repo = JsonRosterRepository::with_key(env.connection.clone(), "broken");
        fs::write(repo.snapshot_path(), "{ not json").unwrap();

        assert!(matches!(repo.load(), Err(StorageError::Corrupt(_))));
    }

    #[test]
    fn test_custom_key_uses_separate_file() {
        let env = TestEnvironment::new().unwrap();
        let repo = JsonRosterRepository::with_key(env.connection.clone(), "spring-gala");
        repo.save(&[record(1, "Alice")]).unwrap();

        assert!(env.base_directory().join("spring-gala.json").exists());
        assert!(JsonRosterRepository::new(env.connection.clone())
            .load()
            .unwrap()
            .is_empty());
    }
}
