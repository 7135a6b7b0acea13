//! # Scheduling
//!
//! One-shot, cancellable delayed callbacks. The draw controller builds its
//! repeating tick by re-arming a timer from inside the firing handler, so a
//! scheduler only ever needs to answer two requests: "wake me after this
//! delay" and "never mind".
//!
//! A scheduler does not call back into the controller itself. It reports the
//! [`TimerId`] that came due and the host passes it to
//! `DrawController::on_timer`, which ignores ids it no longer holds. That
//! keeps cancellation effective even when a firing is already in flight.
//!
//! - [`ManualScheduler`]: virtual clock for tests and simulations
//! - [`TokioScheduler`]: real time, one `tokio::time::sleep` task per timer

pub mod manual;
pub mod runtime;

use std::fmt;
use std::time::Duration;

pub use manual::ManualScheduler;
pub use runtime::TokioScheduler;

/// Handle identifying one scheduled firing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer::{}", self.0)
    }
}

/// Cancellable one-shot timer source.
///
/// Timers with the same deadline fire in the order they were scheduled.
/// Cancelling a timer that already fired or was already cancelled is a no-op.
pub trait Scheduler {
    fn schedule(&mut self, delay: Duration) -> TimerId;

    fn cancel(&mut self, id: TimerId);
}
