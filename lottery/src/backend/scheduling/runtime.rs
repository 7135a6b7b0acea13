use log::debug;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use super::{Scheduler, TimerId};

/// Real-time scheduler backed by the tokio runtime.
///
/// Each timer is a spawned task that sleeps and then sends its [`TimerId`]
/// on the channel returned by [`TokioScheduler::new`]. Cancelling aborts the
/// task. Must be used from within a tokio runtime.
pub struct TokioScheduler {
    fired_tx: UnboundedSender<TimerId>,
    tasks: HashMap<TimerId, JoinHandle<()>>,
    next_id: u64,
}

impl TokioScheduler {
    /// Create the scheduler and the receiver that yields fired timer ids
    pub fn new() -> (Self, UnboundedReceiver<TimerId>) {
        let (fired_tx, fired_rx) = unbounded_channel();
        (
            Self {
                fired_tx,
                tasks: HashMap::new(),
                next_id: 0,
            },
            fired_rx,
        )
    }

    /// Timers scheduled and not yet fired or cancelled
    pub fn pending_count(&self) -> usize {
        self.tasks.values().filter(|task| !task.is_finished()).count()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&mut self, delay: Duration) -> TimerId {
        self.tasks.retain(|_, task| !task.is_finished());

        self.next_id += 1;
        let id = TimerId::new(self.next_id);
        let fired_tx = self.fired_tx.clone();

        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if fired_tx.send(id).is_err() {
                debug!("Timer {} fired after its receiver closed", id);
            }
        });
        self.tasks.insert(id, task);
        id
    }

    fn cancel(&mut self, id: TimerId) {
        if let Some(task) = self.tasks.remove(&id) {
            task.abort();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}
