//! Refresh coordinator driver.
//!
//! [`RefreshCoordinator`] runs the [`RefreshState`] machine on a single
//! tokio task: a fixed-interval timer, a command queue fed by
//! [`CoordinatorHandle`]s, and a result queue fed by fetch tasks all funnel
//! into one loop, so transitions are applied strictly one at a time without
//! locks. Each transition publishes a fresh [`ChainStatus`] on a `watch`
//! channel and an event on the [`EventBus`].

use super::events::{ChainEvent, EventBus};
use super::source::ChainSource;
use super::state::{
    ChainStatus, Completion, FetchTicket, RefreshState, RefreshTrigger, check_generation,
};
use crate::chain::{ChainSnapshot, ChainView, OptionType, OrderLegDescriptor, Side};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

enum Command {
    Select {
        symbol: String,
        expiry: NaiveDate,
        ack: oneshot::Sender<()>,
    },
    Refresh {
        ack: oneshot::Sender<()>,
    },
    TakeScrollTarget {
        reply: oneshot::Sender<Option<usize>>,
    },
    Shutdown,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Select { symbol, expiry, .. } => write!(f, "Select({symbol}, {expiry})"),
            Self::Refresh { .. } => f.write_str("Refresh"),
            Self::TakeScrollTarget { .. } => f.write_str("TakeScrollTarget"),
            Self::Shutdown => f.write_str("Shutdown"),
        }
    }
}

type FetchResult = (FetchTicket, Result<ChainSnapshot>);

/// Drives periodic and manual refreshes for the current chain key.
pub struct RefreshCoordinator<S: ChainSource> {
    source: Arc<S>,
    state: RefreshState,
    interval: Duration,
    status: watch::Sender<ChainStatus>,
    events: EventBus,
    results: mpsc::UnboundedSender<FetchResult>,
}

impl<S: ChainSource> RefreshCoordinator<S> {
    /// Spawns the coordinator on the current tokio runtime.
    ///
    /// The task runs until [`CoordinatorHandle::shutdown`] is called or every
    /// handle is dropped.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if `config` fails validation.
    pub fn spawn(source: S, config: EngineConfig) -> Result<(CoordinatorHandle, JoinHandle<()>)> {
        config.validate()?;
        let config = Arc::new(config);

        let state = RefreshState::new(Arc::clone(&config));
        let (status, status_rx) = watch::channel(state.status());
        let (commands, commands_rx) = mpsc::channel(config.command_capacity);
        let (results, results_rx) = mpsc::unbounded_channel();
        let events = EventBus::new(config.event_capacity);

        let coordinator = Self {
            source: Arc::new(source),
            state,
            interval: config.refresh_interval(),
            status,
            events: events.clone(),
            results,
        };
        let task = tokio::spawn(coordinator.run(commands_rx, results_rx));

        let handle = CoordinatorHandle {
            commands,
            status: status_rx,
            events,
        };
        Ok((handle, task))
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut results: mpsc::UnboundedReceiver<FetchResult>,
    ) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(interval = ?self.interval, "refresh coordinator started");

        loop {
            tokio::select! {
                _ = ticker.tick() => self.start(RefreshTrigger::Interval),
                command = commands.recv() => match command {
                    Some(Command::Select { symbol, expiry, ack }) => {
                        self.select(&symbol, expiry);
                        let _ = ack.send(());
                    }
                    Some(Command::Refresh { ack }) => {
                        self.start(RefreshTrigger::Manual);
                        let _ = ack.send(());
                    }
                    Some(Command::TakeScrollTarget { reply }) => {
                        let _ = reply.send(self.state.take_scroll_target());
                    }
                    Some(Command::Shutdown) | None => break,
                },
                Some((ticket, result)) = results.recv() => self.finish(&ticket, result),
            }
        }

        info!("refresh coordinator stopped");
    }

    fn select(&mut self, symbol: &str, expiry: NaiveDate) {
        let Some(ticket) = self.state.select(symbol, expiry) else {
            return;
        };
        self.events.publish(ChainEvent::KeyChanged {
            key: ticket.key().clone(),
            generation: ticket.generation(),
        });
        self.publish_status();
        self.dispatch(ticket);
    }

    fn start(&mut self, trigger: RefreshTrigger) {
        if let Some(ticket) = self.state.begin(trigger) {
            self.publish_status();
            self.dispatch(ticket);
        }
    }

    fn finish(&mut self, ticket: &FetchTicket, result: Result<ChainSnapshot>) {
        match self.state.complete(ticket, result, Utc::now()) {
            Completion::Applied(view) => {
                self.events.publish(ChainEvent::SnapshotApplied {
                    key: view.key().clone(),
                    generation: view.generation(),
                    strikes: view.stats().total_strikes,
                    atm_strike: view.atm_strike(),
                });
            }
            Completion::Failed(message) => {
                self.events.publish(ChainEvent::FetchFailed {
                    key: ticket.key().clone(),
                    generation: ticket.generation(),
                    message,
                });
            }
            Completion::Discarded => return,
        }

        let pending = self.state.take_pending();
        self.publish_status();
        if let Some(ticket) = pending {
            self.dispatch(ticket);
        }
    }

    fn dispatch(&self, ticket: FetchTicket) {
        debug!(key = %ticket.key(), trigger = ?ticket.trigger(), "dispatching fetch");
        let source = Arc::clone(&self.source);
        let results = self.results.clone();
        tokio::spawn(async move {
            let key = ticket.key().clone();
            let fetch = tokio::spawn(async move { source.fetch(&key).await });
            // A panicking or aborted fetch still has to release the in-flight slot.
            let result = fetch.await.unwrap_or_else(|err| {
                let message = if err.is_panic() {
                    "fetch task panicked"
                } else {
                    "fetch task cancelled"
                };
                warn!(key = %ticket.key(), error = %err, "{message}");
                Err(Error::fetch(ticket.key(), message))
            });
            // The coordinator may already be gone; nothing to deliver to then.
            let _ = results.send((ticket, result));
        });
    }

    fn publish_status(&self) {
        self.status.send_replace(self.state.status());
    }
}

/// Cloneable client of a running [`RefreshCoordinator`].
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    commands: mpsc::Sender<Command>,
    status: watch::Receiver<ChainStatus>,
    events: EventBus,
}

impl CoordinatorHandle {
    /// Selects a `(symbol, expiry)` key.
    ///
    /// Returns once the coordinator has applied the change: from then on the
    /// published status carries the new key with all derived state reset.
    ///
    /// # Errors
    ///
    /// Returns `Error::CoordinatorClosed` if the coordinator has stopped.
    pub async fn select(&self, display_symbol: &str, expiry: NaiveDate) -> Result<()> {
        let (ack, done) = oneshot::channel();
        self.send(Command::Select {
            symbol: display_symbol.to_string(),
            expiry,
            ack,
        })
        .await?;
        done.await.map_err(|_| Error::CoordinatorClosed)
    }

    /// Requests a manual refresh of the current key.
    ///
    /// # Errors
    ///
    /// Returns `Error::CoordinatorClosed` if the coordinator has stopped.
    pub async fn refresh(&self) -> Result<()> {
        let (ack, done) = oneshot::channel();
        self.send(Command::Refresh { ack }).await?;
        done.await.map_err(|_| Error::CoordinatorClosed)
    }

    /// Returns the ATM row index to scroll to, once per key.
    ///
    /// # Errors
    ///
    /// Returns `Error::CoordinatorClosed` if the coordinator has stopped.
    pub async fn take_scroll_target(&self) -> Result<Option<usize>> {
        let (reply, answer) = oneshot::channel();
        self.send(Command::TakeScrollTarget { reply }).await?;
        answer.await.map_err(|_| Error::CoordinatorClosed)
    }

    /// Stops the coordinator.
    ///
    /// # Errors
    ///
    /// Returns `Error::CoordinatorClosed` if it has already stopped.
    pub async fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown).await
    }

    /// Returns the latest published status.
    #[must_use]
    pub fn status(&self) -> ChainStatus {
        self.status.borrow().clone()
    }

    /// Returns the latest view for the current key.
    #[must_use]
    pub fn current_view(&self) -> Option<Arc<ChainView>> {
        self.status.borrow().view.clone()
    }

    /// Returns a receiver notified on every status change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ChainStatus> {
        self.status.clone()
    }

    /// Returns the event bus.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Builds a leg from `view`, provided it belongs to the current key.
    ///
    /// `Ok(None)` means the leg is unavailable (strike outside the window
    /// or non-positive premium).
    ///
    /// # Errors
    ///
    /// Returns `Error::StaleView` if the key changed since `view` was derived.
    pub fn build_leg(
        &self,
        view: &ChainView,
        strike: Decimal,
        option_type: OptionType,
        side: Side,
    ) -> Result<Option<OrderLegDescriptor>> {
        check_generation(view, self.status.borrow().generation)?;
        Ok(view.build_leg(strike, option_type, side))
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| Error::CoordinatorClosed)
    }
}
