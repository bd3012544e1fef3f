//! Change notifications for group data.
//!
//! Writers publish a [`ChangeEvent`] after a successful commit; views subscribe
//! per group and reload what changed. Delivery is best effort: a subscriber that
//! falls behind skips the missed events and keeps going, which is fine because
//! every event only means "reload this".

use tokio::sync::broadcast;
use tracing::{trace, warn};

const DEFAULT_CAPACITY: usize = 256;

/// Which part of a group changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// Total budget, allocations or locks
    Budget,
    /// Expenses added or removed
    Expenses,
    /// Members joined, left, or changed shares/wallets
    Members,
    /// Finalized plan proposed, voted on or locked
    FinalizedPlan,
}

/// A change to one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Group that changed
    pub group_id: i64,
    /// What changed
    pub kind: ChangeKind,
}

/// Broadcast hub for [`ChangeEvent`]s. Cloning shares the same channel.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ChangeFeed {
    /// Creates a feed that buffers up to `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event, returning how many subscribers received it.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        trace!(?event, "publishing change");
        self.sender.send(event).unwrap_or(0)
    }

    /// Shorthand for publishing a change of `kind` to `group_id`.
    pub fn notify(&self, group_id: i64, kind: ChangeKind) -> usize {
        self.publish(ChangeEvent { group_id, kind })
    }

    /// Subscribes to changes of a single group.
    #[must_use]
    pub fn subscribe(&self, group_id: i64) -> Subscription {
        Subscription {
            group_id,
            receiver: self.sender.subscribe(),
        }
    }
}

/// A subscription to one group's changes. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    group_id: i64,
    receiver: broadcast::Receiver<ChangeEvent>,
}

impl Subscription {
    /// Group this subscription follows.
    #[must_use]
    pub const fn group_id(&self) -> i64 {
        self.group_id
    }

    /// Waits for the next change to the subscribed group.
    ///
    /// Returns `None` once every [`ChangeFeed`] handle has been dropped.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.group_id == self.group_id => return Some(event),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(
                        "Subscription for group {} lagged, skipped {} events",
                        self.group_id, skipped
                    );
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
