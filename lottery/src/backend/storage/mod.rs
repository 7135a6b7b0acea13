//! # Storage Module
//!
//! Handles persistence of the roster snapshot.
//!
//! The domain layer only sees the [`RosterStorage`] port; implementations
//! can be swapped without touching roster or draw logic.
//!
//! ## Implementations
//!
//! - **json**: one JSON document per storage key in the data directory
//! - **memory**: process-local snapshot for tests and throwaway sessions

pub mod json;
pub mod memory;
pub mod traits;

pub use json::{JsonConnection, JsonRosterRepository};
pub use memory::MemoryRosterStorage;
pub use traits::{RosterStorage, StorageError};
