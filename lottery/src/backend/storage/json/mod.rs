//! # JSON Storage Module
//!
//! File-based roster storage: one pretty-printed JSON array per storage key
//! inside the data directory, written atomically on every save.

pub mod connection;
pub mod roster_repository;

#[cfg(test)]
pub mod test_utils;

pub use connection::{default_data_directory, JsonConnection};
pub use roster_repository::{JsonRosterRepository, DEFAULT_STORAGE_KEY};
