//! Refresh state machine.
//!
//! [`RefreshState`] owns the single "current key" value and everything
//! derived from it. It is driven synchronously: the coordinator asks it for
//! a [`FetchTicket`] when a refresh should start and hands back the ticket
//! with the fetch result. Tickets carry the key generation they were issued
//! under, so results for a superseded key are discarded on arrival.
//!
//! ```text
//!            tick / manual / key change
//!   Idle ─────────────────────────────► Fetching
//!   Ready ───────────────────────────►    │  │
//!   Failed ──────────────────────────►    │  └──► Failed (last view retained)
//!                                         └─────► Ready  (snapshot replaced)
//! ```

use crate::chain::{
    AtmAnchor, ChainKey, ChainSnapshot, ChainView, LegContext, OptionType, OrderLegDescriptor,
    Side, SymbolResolver,
};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Phase of the refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefreshPhase {
    /// No fetch has been issued for the current key.
    Idle,
    /// A fetch for the current key is in flight.
    Fetching,
    /// The last fetch succeeded.
    Ready,
    /// The last fetch failed; the previous view, if any, is retained.
    Failed,
}

impl fmt::Display for RefreshPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::Ready => "ready",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What started a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefreshTrigger {
    /// Periodic timer.
    Interval,
    /// Explicit user request.
    Manual,
    /// The `(symbol, expiry)` key changed.
    KeyChange,
}

/// Permission to run one fetch for a key generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    key: ChainKey,
    generation: u64,
    trigger: RefreshTrigger,
}

impl FetchTicket {
    /// Returns the key to fetch.
    #[must_use]
    pub const fn key(&self) -> &ChainKey {
        &self.key
    }

    /// Returns the key generation the ticket was issued under.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns what started the fetch.
    #[must_use]
    pub const fn trigger(&self) -> RefreshTrigger {
        self.trigger
    }
}

/// Outcome of handing a fetch result back to the state machine.
#[derive(Debug, Clone)]
pub enum Completion {
    /// The snapshot replaced the previous one.
    Applied(Arc<ChainView>),
    /// The fetch failed; carries the displayable message.
    Failed(String),
    /// The result belonged to a superseded key and was dropped.
    Discarded,
}

/// Published state of the coordinator.
#[derive(Debug, Clone)]
pub struct ChainStatus {
    /// Current phase.
    pub phase: RefreshPhase,
    /// Current key generation; bumps on every key change.
    pub generation: u64,
    /// Current key, if one is selected.
    pub key: Option<ChainKey>,
    /// Latest view for the current key, possibly stale after a failure.
    pub view: Option<Arc<ChainView>>,
    /// Message of the last failed fetch, cleared on success.
    pub last_error: Option<String>,
}

impl ChainStatus {
    /// Returns true if a view is shown alongside an error.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.view.is_some() && self.last_error.is_some()
    }
}

/// The refresh state machine.
#[derive(Debug)]
pub struct RefreshState {
    config: Arc<EngineConfig>,
    resolver: SymbolResolver,
    context: Option<LegContext>,
    generation: u64,
    phase: RefreshPhase,
    in_flight: bool,
    pending_manual: bool,
    snapshot: Option<Arc<ChainSnapshot>>,
    view: Option<Arc<ChainView>>,
    anchor: AtmAnchor,
    last_error: Option<String>,
    scroll_pending: bool,
}

impl RefreshState {
    /// Creates an idle state machine with no key selected.
    #[must_use]
    pub fn new(config: Arc<EngineConfig>) -> Self {
        Self {
            resolver: SymbolResolver::new(&config),
            config,
            context: None,
            generation: 0,
            phase: RefreshPhase::Idle,
            in_flight: false,
            pending_manual: false,
            snapshot: None,
            view: None,
            anchor: AtmAnchor::new(),
            last_error: None,
            scroll_pending: false,
        }
    }

    /// Returns the current key, if any.
    #[must_use]
    pub fn key(&self) -> Option<ChainKey> {
        self.context.as_ref().map(ChainKey::from)
    }

    /// Returns the current phase.
    #[must_use]
    pub const fn phase(&self) -> RefreshPhase {
        self.phase
    }

    /// Returns the current key generation.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns the last applied snapshot for the current key.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<ChainSnapshot>> {
        self.snapshot.clone()
    }

    /// Returns the current view.
    #[must_use]
    pub fn view(&self) -> Option<Arc<ChainView>> {
        self.view.clone()
    }

    /// Selects a `(symbol, expiry)` key.
    ///
    /// Selecting the key already in effect is a no-op. Otherwise every
    /// derived anchor is reset together with the key and a fetch for the
    /// new key is issued immediately.
    pub fn select(&mut self, display_symbol: &str, expiry: NaiveDate) -> Option<FetchTicket> {
        let context = LegContext::resolve(&self.resolver, display_symbol, expiry);
        let key = ChainKey::from(&context);
        if self.key().as_ref() == Some(&key) {
            debug!(%key, "key unchanged");
            return None;
        }

        self.generation += 1;
        self.context = Some(context);
        self.phase = RefreshPhase::Idle;
        self.in_flight = false;
        self.pending_manual = false;
        self.snapshot = None;
        self.view = None;
        self.anchor.reset();
        self.last_error = None;
        self.scroll_pending = true;
        info!(%key, generation = self.generation, "chain key changed");

        self.begin(RefreshTrigger::KeyChange)
    }

    /// Starts a fetch for the current key.
    ///
    /// Returns `None` when no key is selected or a fetch is already in
    /// flight. A manual request arriving mid-flight is remembered and can be
    /// issued with [`RefreshState::take_pending`] once the fetch completes;
    /// an interval tick arriving mid-flight is skipped.
    pub fn begin(&mut self, trigger: RefreshTrigger) -> Option<FetchTicket> {
        let key = self.key()?;
        if self.in_flight {
            if trigger == RefreshTrigger::Manual {
                self.pending_manual = true;
            }
            debug!(%key, ?trigger, "fetch in flight, not starting another");
            return None;
        }

        self.in_flight = true;
        self.phase = RefreshPhase::Fetching;
        debug!(%key, ?trigger, generation = self.generation, "fetch started");
        Some(FetchTicket {
            key,
            generation: self.generation,
            trigger,
        })
    }

    /// Applies a fetch result.
    ///
    /// A success replaces the snapshot wholesale and derives a fresh view. A
    /// failure keeps the last good view and records the message. Results for
    /// an older generation are discarded without touching any state.
    pub fn complete(
        &mut self,
        ticket: &FetchTicket,
        result: Result<ChainSnapshot>,
        received_at: DateTime<Utc>,
    ) -> Completion {
        if ticket.generation != self.generation {
            warn!(
                key = %ticket.key,
                ticket_generation = ticket.generation,
                generation = self.generation,
                "discarding result for superseded key"
            );
            return Completion::Discarded;
        }
        self.in_flight = false;

        let Some(context) = self.context.clone() else {
            return Completion::Discarded;
        };

        match result {
            Ok(snapshot) => {
                self.anchor.observe(&snapshot);
                let view = Arc::new(ChainView::derive(
                    context,
                    self.generation,
                    &snapshot,
                    &self.anchor,
                    &self.config,
                    received_at,
                ));
                self.snapshot = Some(Arc::new(snapshot));
                self.view = Some(Arc::clone(&view));
                self.phase = RefreshPhase::Ready;
                self.last_error = None;
                debug!(stats = %view.stats(), "snapshot applied");
                Completion::Applied(view)
            }
            Err(err) => {
                let message = err.to_string();
                warn!(key = %ticket.key, error = %message, "fetch failed, keeping last view");
                self.phase = RefreshPhase::Failed;
                self.last_error = Some(message.clone());
                Completion::Failed(message)
            }
        }
    }

    /// Issues the manual refresh deferred while a fetch was in flight.
    pub fn take_pending(&mut self) -> Option<FetchTicket> {
        if !self.pending_manual || self.in_flight {
            return None;
        }
        self.pending_manual = false;
        self.begin(RefreshTrigger::Manual)
    }

    /// Returns the ATM row index once per key, as soon as it is known.
    pub fn take_scroll_target(&mut self) -> Option<usize> {
        if !self.scroll_pending {
            return None;
        }
        let index = self.view.as_ref().and_then(|v| v.atm_index())?;
        self.scroll_pending = false;
        Some(index)
    }

    /// Builds a leg against a view, rejecting views of a superseded key.
    ///
    /// # Errors
    ///
    /// Returns `Error::StaleView` if `view` was derived under another
    /// generation than the current one.
    pub fn build_leg(
        &self,
        view: &ChainView,
        strike: Decimal,
        option_type: OptionType,
        side: Side,
    ) -> Result<Option<OrderLegDescriptor>> {
        check_generation(view, self.generation)?;
        Ok(view.build_leg(strike, option_type, side))
    }

    /// Returns the publishable status.
    #[must_use]
    pub fn status(&self) -> ChainStatus {
        ChainStatus {
            phase: self.phase,
            generation: self.generation,
            key: self.key(),
            view: self.view.clone(),
            last_error: self.last_error.clone(),
        }
    }
}

pub(crate) fn check_generation(view: &ChainView, current: u64) -> Result<()> {
    if view.generation() == current {
        Ok(())
    } else {
        Err(Error::StaleView {
            view: view.generation(),
            current,
        })
    }
}
