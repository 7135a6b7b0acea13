//! # Draw Controller
//!
//! Runs the "slot machine" prize draw over the roster's eligible participants.
//!
//! ```text
//!            start()                 stop()                  last slowdown step
//!   Idle ─────────────▶ Drawing ─────────────▶ Stopping ─────────────────────▶ Idle
//!    ▲                  │  ▲ tick                │  ▲ slowdown step            (winner committed,
//!    │                  └──┘ (fixed interval)    └──┘ (growing delay)          reveal scheduled)
//!    └──────────────── teardown() from any state: timer cancelled, nothing committed
//! ```
//!
//! The eligible set is captured once at `start` and used for the whole draw,
//! so check-ins or deletions during a draw do not change the pool. The winner
//! is picked the moment `stop` is called; the slowdown frames that follow are
//! random candidates for show and have no influence on the outcome.

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use shared::{DisplayedCandidate, LotteryEvent};
use std::time::Duration;

use crate::backend::domain::models::Participant;
use crate::backend::domain::roster_service::RosterService;
use crate::backend::events::EventSink;
use crate::backend::mappers::ParticipantMapper;
use crate::backend::scheduling::{ManualScheduler, Scheduler, TimerId};

/// Animation timing for a draw, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawTimings {
    /// Interval between candidates while drawing
    pub tick_interval_ms: u64,
    /// Number of candidates shown after stop is pressed
    pub slowdown_steps: u32,
    /// Delay after slowdown step `k` is `base + k * increment`
    pub slowdown_base_ms: u64,
    pub slowdown_increment_ms: u64,
    /// Pause between committing the winner and the reveal event
    pub reveal_delay_ms: u64,
}

impl Default for DrawTimings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 80,
            slowdown_steps: 6,
            slowdown_base_ms: 60,
            slowdown_increment_ms: 40,
            reveal_delay_ms: 200,
        }
    }
}

impl DrawTimings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn slowdown_delay(&self, step: u32) -> Duration {
        let growth = u64::from(step).saturating_mul(self.slowdown_increment_ms);
        Duration::from_millis(self.slowdown_base_ms.saturating_add(growth))
    }

    pub fn reveal_delay(&self) -> Duration {
        Duration::from_millis(self.reveal_delay_ms)
    }

    /// Time from `stop` until the winner is committed
    pub fn total_slowdown(&self) -> Duration {
        (1..=self.slowdown_steps)
            .map(|step| self.slowdown_delay(step))
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawPhase {
    Idle,
    Drawing,
    Stopping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started { pool_size: usize },
    /// Nobody is checked in without having already won
    NoEligible,
    /// A draw is already drawing or stopping
    AlreadyRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Winner chosen, slowdown animation running
    Stopping,
    /// The draw had an empty pool and was dropped without a winner
    Abandoned,
    /// Not currently drawing
    NotDrawing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerPurpose {
    Tick,
    Slowdown { step: u32 },
    Reveal,
}

/// Timer-driven draw state machine.
///
/// The controller owns exactly one outstanding timer at a time. Hosts feed
/// fired timer ids back through [`DrawController::on_timer`]; ids the
/// controller no longer holds are ignored.
pub struct DrawController<S: Scheduler> {
    scheduler: S,
    timings: DrawTimings,
    rng: StdRng,
    events: EventSink,
    phase: DrawPhase,
    snapshot: Vec<Participant>,
    chosen_winner: Option<Participant>,
    pending_timer: Option<(TimerId, TimerPurpose)>,
    displayed: DisplayedCandidate,
    last_winner: Option<Participant>,
}

impl<S: Scheduler> DrawController<S> {
    pub fn new(scheduler: S, timings: DrawTimings, events: EventSink) -> Self {
        Self {
            scheduler,
            timings,
            rng: StdRng::from_entropy(),
            events,
            phase: DrawPhase::Idle,
            snapshot: Vec::new(),
            chosen_winner: None,
            pending_timer: None,
            displayed: DisplayedCandidate::placeholder(),
            last_winner: None,
        }
    }

    /// Replace the random source, e.g. with a seeded one for reproducible runs
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn phase(&self) -> DrawPhase {
        self.phase
    }

    pub fn displayed(&self) -> &DisplayedCandidate {
        &self.displayed
    }

    /// Winner of the most recent draw, if any. When that participant left
    /// the roster before the commit, this is their snapshot copy with
    /// `is_winner` still false.
    pub fn last_winner(&self) -> Option<&Participant> {
        self.last_winner.as_ref()
    }

    /// Candidate pool of the draw in flight (empty while idle)
    pub fn snapshot(&self) -> &[Participant] {
        &self.snapshot
    }

    pub fn has_pending_timer(&self) -> bool {
        self.pending_timer.is_some()
    }

    pub fn timings(&self) -> &DrawTimings {
        &self.timings
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Begin a draw over the currently eligible participants.
    pub fn start(&mut self, roster: &RosterService) -> StartOutcome {
        if self.phase != DrawPhase::Idle {
            warn!("Ignoring start: a draw is already {:?}", self.phase);
            return StartOutcome::AlreadyRunning;
        }

        let pool: Vec<Participant> = roster.eligible().into_iter().cloned().collect();
        if pool.is_empty() {
            info!("Draw requested with no eligible participants");
            self.displayed = DisplayedCandidate::no_eligible();
            self.events.emit(LotteryEvent::NoEligibleParticipants);
            return StartOutcome::NoEligible;
        }

        // The previous winner's reveal may still be pending
        self.reveal_now_if_pending();
        self.cancel_pending();

        let pool_size = pool.len();
        self.snapshot = pool;
        self.chosen_winner = None;
        self.phase = DrawPhase::Drawing;
        info!("Draw started with {} eligible participants", pool_size);
        self.events.emit(LotteryEvent::DrawStarted { pool_size });

        self.show_random_candidate();
        self.arm(self.timings.tick_interval(), TimerPurpose::Tick);

        StartOutcome::Started { pool_size }
    }

    /// Pick the winner now and play the slowdown animation.
    pub fn stop(&mut self) -> StopOutcome {
        if self.phase != DrawPhase::Drawing {
            debug!("Ignoring stop while {:?}", self.phase);
            return StopOutcome::NotDrawing;
        }

        let Some(winner) = self.snapshot.choose(&mut self.rng).cloned() else {
            warn!("Stop with an empty draw pool, abandoning draw");
            self.cancel_pending();
            self.phase = DrawPhase::Idle;
            return StopOutcome::Abandoned;
        };

        info!("Draw stopping, winner #{} chosen", winner.display_number());
        self.chosen_winner = Some(winner);
        self.cancel_pending();
        self.phase = DrawPhase::Stopping;
        self.events.emit(LotteryEvent::DrawStopping);

        if self.timings.slowdown_steps == 0 {
            self.arm(Duration::ZERO, TimerPurpose::Slowdown { step: 0 });
        } else {
            self.show_slowdown_step(1);
        }

        StopOutcome::Stopping
    }

    /// Handle a fired timer. Ids other than the one currently held are stale
    /// (cancelled or superseded) and are ignored.
    pub fn on_timer(&mut self, id: TimerId, roster: &mut RosterService) {
        let purpose = match self.pending_timer {
            Some((pending_id, purpose)) if pending_id == id => purpose,
            _ => {
                debug!("Ignoring stale {}", id);
                return;
            }
        };
        self.pending_timer = None;

        match purpose {
            TimerPurpose::Tick => {
                self.show_random_candidate();
                self.arm(self.timings.tick_interval(), TimerPurpose::Tick);
            }
            TimerPurpose::Slowdown { step } if step < self.timings.slowdown_steps => {
                self.show_slowdown_step(step + 1);
            }
            TimerPurpose::Slowdown { .. } => self.finish(roster),
            TimerPurpose::Reveal => self.reveal(),
        }
    }

    fn reveal(&self) {
        if let Some(winner) = &self.last_winner {
            info!("Revealing winner #{} {}", winner.display_number(), winner.name);
            self.events
                .emit(ParticipantMapper::to_winner_revealed_event(winner));
        }
    }

    /// Deliver a reveal that is still waiting on its timer
    fn reveal_now_if_pending(&mut self) {
        if let Some((id, TimerPurpose::Reveal)) = self.pending_timer {
            self.pending_timer = None;
            self.scheduler.cancel(id);
            self.reveal();
        }
    }

    /// Abandon whatever is in flight. No further timers fire and the roster
    /// is not touched.
    pub fn teardown(&mut self) {
        self.cancel_pending();
        if self.phase != DrawPhase::Idle {
            info!("Draw abandoned while {:?}", self.phase);
        }
        self.phase = DrawPhase::Idle;
        self.snapshot.clear();
        self.chosen_winner = None;
    }

    fn finish(&mut self, roster: &mut RosterService) {
        self.phase = DrawPhase::Idle;
        self.snapshot.clear();

        let Some(winner) = self.chosen_winner.take() else {
            warn!("Slowdown finished without a chosen winner");
            return;
        };
        self.show(DisplayedCandidate::new(winner.number, winner.name.clone()));

        let committed = if roster.commit_winner(&winner.id) {
            roster.get(&winner.id).cloned()
        } else {
            warn!(
                "Winner #{} {} left the roster during the draw, nothing committed",
                winner.display_number(),
                winner.name
            );
            None
        };
        if let Some(committed) = &committed {
            self.events
                .emit(ParticipantMapper::to_winner_committed_event(committed));
        }

        self.last_winner = Some(committed.unwrap_or(winner));
        self.arm(self.timings.reveal_delay(), TimerPurpose::Reveal);
    }

    fn show_slowdown_step(&mut self, step: u32) {
        self.show_random_candidate();
        self.arm(self.timings.slowdown_delay(step), TimerPurpose::Slowdown { step });
    }

    fn show_random_candidate(&mut self) {
        if let Some(candidate) = self.snapshot.choose(&mut self.rng) {
            let candidate = DisplayedCandidate::new(candidate.number, candidate.name.clone());
            self.show(candidate);
        }
    }

    fn show(&mut self, candidate: DisplayedCandidate) {
        self.events.emit(LotteryEvent::CandidateUpdated {
            number: candidate.number.clone(),
            name: candidate.name.clone(),
        });
        self.displayed = candidate;
    }

    /// Schedule the next firing, replacing any timer still held
    fn arm(&mut self, delay: Duration, purpose: TimerPurpose) {
        self.cancel_pending();
        let id = self.scheduler.schedule(delay);
        self.pending_timer = Some((id, purpose));
    }

    fn cancel_pending(&mut self) {
        if let Some((id, _)) = self.pending_timer.take() {
            self.scheduler.cancel(id);
        }
    }
}

impl DrawController<ManualScheduler> {
    /// Advance virtual time by `by`, firing every timer that comes due
    /// (including ones armed along the way). Returns the number fired.
    pub fn advance(&mut self, by: Duration, roster: &mut RosterService) -> usize {
        let until = self.scheduler.now() + by;
        let mut fired = 0;
        while let Some(id) = self.scheduler.pop_due(until) {
            self.on_timer(id, roster);
            fired += 1;
        }
        self.scheduler.advance_to(until);
        fired
    }
}

impl<S: Scheduler> Drop for DrawController<S> {
    fn drop(&mut self) {
        self.teardown();
    }
}
