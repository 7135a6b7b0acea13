//! Outbound notifications for the presentation layer.

use log::debug;
use shared::LotteryEvent;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Cheap, cloneable handle used by services to publish [`LotteryEvent`]s.
///
/// A detached sink (or one whose receiver was dropped) swallows events.
#[derive(Clone, Debug, Default)]
pub struct EventSink {
    sender: Option<UnboundedSender<LotteryEvent>>,
}

impl EventSink {
    /// Create a connected sink and the receiver that drains it
    pub fn channel() -> (Self, UnboundedReceiver<LotteryEvent>) {
        let (sender, receiver) = unbounded_channel();
        (
            Self {
                sender: Some(sender),
            },
            receiver,
        )
    }

    pub fn detached() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: LotteryEvent) {
        if let Some(sender) = &self.sender {
            if sender.send(event).is_err() {
                debug!("Event receiver dropped, discarding event");
            }
        }
    }
}
