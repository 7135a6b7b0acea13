//! # Domain Module
//!
//! Contains the business logic for running an event's check-in desk and its
//! lucky draw.
//!
//! ## Module Organization
//!
//! - **models**: `Participant` and the closed `Tag` category set
//! - **tag_resolver**: free-text tag tokens to `Tag`
//! - **roster_service**: the roster store; every mutation persists and notifies
//! - **draw_controller**: timer-driven draw state machine over the eligible set
//! - **export_service**: CSV export of the roster
//! - **commands**: input structs passed from hosts into the services
//!
//! ## Business Rules
//!
//! - A participant is eligible for a draw iff checked in and not yet a winner
//! - Entries added at the door start checked in, batch imports start checked out
//! - Display numbers are never renumbered after a delete
//! - The winner flag is only ever set by a draw commit, once per draw
//! - Exporting never mutates the roster

pub mod commands;
pub mod draw_controller;
pub mod export_service;
pub mod models;
pub mod roster_service;
pub mod tag_resolver;

pub use draw_controller::{DrawController, DrawPhase, DrawTimings, StartOutcome, StopOutcome};
pub use export_service::{ExportConfig, ExportLocale, ExportService};
pub use roster_service::{NumberingPolicy, RosterService};
pub use tag_resolver::TagResolver;
