//! Event check-in roster and lucky draw.
//!
//! [`backend`] holds the roster store, the timer-driven draw controller and
//! CSV export; [`config`] loads the optional YAML settings; [`console`] is the
//! operator front end used by the `event-lottery` binary.

pub mod backend;
pub mod config;
pub mod console;
