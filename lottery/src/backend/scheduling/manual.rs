use log::debug;
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;
use std::time::Duration;

use super::{Scheduler, TimerId};

#[derive(Debug, Default)]
struct VirtualClock {
    now: Duration,
    next_id: u64,
    /// Ordered by deadline, then by scheduling order
    queue: BTreeSet<(Duration, TimerId)>,
    deadlines: HashMap<TimerId, Duration>,
    fired: usize,
}

/// Deterministic scheduler driven by a virtual clock.
///
/// Clones share the same clock, so a test can keep a handle after giving
/// one to the draw controller and inspect what is still pending.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    clock: Rc<RefCell<VirtualClock>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time since the scheduler was created
    pub fn now(&self) -> Duration {
        self.clock.borrow().now
    }

    pub fn pending_count(&self) -> usize {
        self.clock.borrow().queue.len()
    }

    /// Total number of timers handed out by `pop_due`
    pub fn fired_count(&self) -> usize {
        self.clock.borrow().fired
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.clock
            .borrow()
            .queue
            .iter()
            .next()
            .map(|(deadline, _)| *deadline)
    }

    /// Remove and return the earliest timer due at or before `until`,
    /// moving the clock to its deadline.
    pub fn pop_due(&self, until: Duration) -> Option<TimerId> {
        let mut clock = self.clock.borrow_mut();
        let (deadline, id) = *clock.queue.iter().next()?;
        if deadline > until {
            return None;
        }

        clock.queue.remove(&(deadline, id));
        clock.deadlines.remove(&id);
        clock.now = clock.now.max(deadline);
        clock.fired += 1;
        Some(id)
    }

    /// Move the clock forward without firing anything
    pub fn advance_to(&self, until: Duration) {
        let mut clock = self.clock.borrow_mut();
        clock.now = clock.now.max(until);
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&mut self, delay: Duration) -> TimerId {
        let mut clock = self.clock.borrow_mut();
        clock.next_id += 1;
        let id = TimerId::new(clock.next_id);
        let deadline = clock.now + delay;

        clock.queue.insert((deadline, id));
        clock.deadlines.insert(id, deadline);
        debug!("Scheduled {} at {:?}", id, deadline);
        id
    }

    fn cancel(&mut self, id: TimerId) {
        let mut clock = self.clock.borrow_mut();
        if let Some(deadline) = clock.deadlines.remove(&id) {
            clock.queue.remove(&(deadline, id));
            debug!("Cancelled {}", id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn test_fires_in_deadline_then_schedule_order() {
        let mut scheduler = ManualScheduler::new();
        let late = scheduler.schedule(ms(80));
        let early = scheduler.schedule(ms(40));
        let tie = scheduler.schedule(ms(80));

        assert_eq!(scheduler.pop_due(ms(100)), Some(early));
        assert_eq!(scheduler.now(), ms(40));
        assert_eq!(scheduler.pop_due(ms(100)), Some(late));
        assert_eq!(scheduler.pop_due(ms(100)), Some(tie));
        assert_eq!(scheduler.pop_due(ms(100)), None);
        assert_eq!(scheduler.fired_count(), 3);
    }

    #[test]
    fn test_pop_due_respects_until() {
        let mut scheduler = ManualScheduler::new();
        scheduler.schedule(ms(80));

        assert_eq!(scheduler.pop_due(ms(79)), None);
        assert_eq!(scheduler.next_deadline(), Some(ms(80)));
        scheduler.advance_to(ms(79));
        assert_eq!(scheduler.now(), ms(79));
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut scheduler = ManualScheduler::new();
        let id = scheduler.schedule(ms(10));

        scheduler.cancel(id);
        scheduler.cancel(id);
        assert_eq!(scheduler.pending_count(), 0);
        assert_eq!(scheduler.pop_due(ms(1_000)), None);

        let fired = scheduler.schedule(ms(5));
        assert_eq!(scheduler.pop_due(ms(1_000)), Some(fired));
        scheduler.cancel(fired);
    }

    #[test]
    fn test_delays_are_relative_to_current_time() {
        let mut scheduler = ManualScheduler::new();
        scheduler.advance_to(ms(500));
        scheduler.schedule(ms(60));
        assert_eq!(scheduler.next_deadline(), Some(ms(560)));
    }

    #[test]
    fn test_clones_share_the_clock() {
        let mut scheduler = ManualScheduler::new();
        let observer = scheduler.clone();
        scheduler.schedule(ms(10));
        assert_eq!(observer.pending_count(), 1);
    }
}
