//! # Backend Module
//!
//! Contains all non-UI logic for the event lottery.
//!
//! This module brings together:
//! - **Domain**: roster rules, the draw state machine and CSV export
//! - **Storage**: roster snapshot persistence behind the `RosterStorage` port
//! - **Scheduling**: cancellable one-shot timers that drive the draw
//! - **Mappers**: conversions between domain models and `shared` DTOs
//! - **Events**: notifications pushed to whatever presents the draw
//!
//! ## Architecture
//!
//! ```text
//! Host (console, tests)
//!     ↓ commands            ↑ LotteryEvent / fired TimerId
//! Domain Layer (RosterService, DrawController, ExportService)
//!     ↓
//! Storage Layer (JSON snapshot, in-memory)
//! ```
//!
//! Everything runs on a single thread of control. The host owns the
//! [`Backend`] and hands fired timer ids back to the draw controller.

pub mod domain;
pub mod events;
pub mod mappers;
pub mod scheduling;
pub mod storage;

use anyhow::Result;
use log::info;
use std::sync::Arc;

use crate::config::AppConfig;
use domain::{DrawController, ExportService, RosterService};
use events::EventSink;
use scheduling::Scheduler;
use storage::{JsonConnection, JsonRosterRepository, RosterStorage};

/// All services for one running event
pub struct Backend<S: Scheduler> {
    pub roster_service: RosterService,
    pub draw_controller: DrawController<S>,
    pub export_service: ExportService,
}

impl<S: Scheduler> Backend<S> {
    /// Assemble the services over an already constructed storage
    pub fn with_storage(
        config: &AppConfig,
        storage: Arc<dyn RosterStorage>,
        scheduler: S,
        events: EventSink,
    ) -> Self {
        let roster_service = RosterService::new(
            storage,
            config.tag_resolver(),
            config.numbering,
            events.clone(),
        );
        let draw_controller = DrawController::new(scheduler, config.draw, events);
        let export_service = ExportService::new(config.export.clone());

        Self {
            roster_service,
            draw_controller,
            export_service,
        }
    }

    /// Start a draw over the current roster
    pub fn start_draw(&mut self) -> domain::StartOutcome {
        self.draw_controller.start(&self.roster_service)
    }

    /// Route a fired timer to the draw controller
    pub fn on_timer(&mut self, id: scheduling::TimerId) {
        self.draw_controller.on_timer(id, &mut self.roster_service);
    }
}

/// Initialize the backend with JSON storage in the configured data directory
pub fn initialize_backend<S: Scheduler>(
    config: &AppConfig,
    scheduler: S,
    events: EventSink,
) -> Result<Backend<S>> {
    let data_directory = config.data_directory()?;
    info!("Setting up storage in {}", data_directory.display());
    let connection = JsonConnection::new(&data_directory)?;
    let repository = JsonRosterRepository::with_key(connection, config.storage_key.clone());

    info!("Setting up domain services");
    let backend = Backend::with_storage(config, Arc::new(repository), scheduler, events);

    info!(
        "Backend ready with {} participants",
        backend.roster_service.participants().len()
    );
    Ok(backend)
}
