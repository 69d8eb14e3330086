//! Event bus for chain and cross-page refresh signals.
//!
//! Replaces ad-hoc global events with a typed publish/subscribe channel.
//! Slow subscribers lag rather than block publishers; a lagged receiver
//! gets `RecvError::Lagged` and continues from the oldest retained event.

use crate::chain::ChainKey;
use rust_decimal::Decimal;
use tokio::sync::broadcast;
use tracing::trace;

/// Events published by the refresh coordinator and its collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainEvent {
    /// A new `(symbol, expiry)` key took effect.
    KeyChanged {
        /// The new key.
        key: ChainKey,
        /// Its generation.
        generation: u64,
    },
    /// A snapshot replaced the previous one.
    SnapshotApplied {
        /// The chain key.
        key: ChainKey,
        /// Key generation.
        generation: u64,
        /// Number of strikes in the snapshot.
        strikes: usize,
        /// Listed ATM strike, if resolvable.
        atm_strike: Option<Decimal>,
    },
    /// A fetch failed; the previous view is still shown.
    FetchFailed {
        /// The chain key.
        key: ChainKey,
        /// Key generation.
        generation: u64,
        /// Displayable message.
        message: String,
    },
    /// Orders changed elsewhere; order lists should reload.
    OrdersUpdated,
    /// Positions changed elsewhere; position lists should reload.
    PositionsUpdated,
}

/// Broadcast channel of [`ChainEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ChainEvent>,
}

impl EventBus {
    /// Creates a bus retaining up to `capacity` events per lagging receiver.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribes to events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ChainEvent> {
        self.sender.subscribe()
    }

    /// Publishes an event, returning how many subscribers received it.
    pub fn publish(&self, event: ChainEvent) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(event)) => {
                trace!(?event, "no subscribers");
                0
            }
        }
    }

    /// Signals that orders changed.
    pub fn publish_orders_updated(&self) -> usize {
        self.publish(ChainEvent::OrdersUpdated)
    }

    /// Signals that positions changed.
    pub fn publish_positions_updated(&self) -> usize {
        self.publish(ChainEvent::PositionsUpdated)
    }

    /// Returns the number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
