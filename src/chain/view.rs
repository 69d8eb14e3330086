//! Chain view module.
//!
//! A [`ChainView`] is the output of one derivation pass over a snapshot:
//! resolved lot size, ATM strike, display rows, the centered window and the
//! ATM scroll target, tagged with the key and generation it belongs to.
//! Views are immutable; the refresh coordinator publishes a new one for every
//! applied snapshot.

use super::atm::AtmAnchor;
use super::leg::{LegContext, OrderLegDescriptor, Side, build_leg};
use super::rows::{DisplayStrikeRow, derive_rows, effective_atm_strike};
use super::snapshot::{ChainSnapshot, OptionType};
use super::window::{atm_row_index, select_window};
use crate::config::EngineConfig;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::fmt;

/// Identifies one chain: canonical underlying plus expiry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChainKey {
    symbol: String,
    expiry: NaiveDate,
}

impl ChainKey {
    /// Creates a key from a canonical symbol and expiry.
    #[must_use]
    pub fn new(symbol: impl Into<String>, expiry: NaiveDate) -> Self {
        Self {
            symbol: symbol.into(),
            expiry,
        }
    }

    /// Returns the canonical symbol.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Returns the expiry.
    #[must_use]
    pub const fn expiry(&self) -> NaiveDate {
        self.expiry
    }
}

impl From<&LegContext> for ChainKey {
    fn from(context: &LegContext) -> Self {
        Self::new(context.underlying.clone(), context.expiry)
    }
}

impl fmt::Display for ChainKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.symbol, self.expiry.format("%Y-%m-%d"))
    }
}

/// Derived, immutable view of one snapshot.
#[derive(Debug, Clone)]
pub struct ChainView {
    key: ChainKey,
    context: LegContext,
    generation: u64,
    underlying_price: Option<Decimal>,
    atm: Option<Decimal>,
    atm_strike: Option<Decimal>,
    lot_size: u32,
    total_strikes: usize,
    window: Vec<DisplayStrikeRow>,
    atm_index: Option<usize>,
    received_at: DateTime<Utc>,
}

impl ChainView {
    /// Derives a view from `snapshot`.
    ///
    /// `anchor` must already have observed `snapshot`. The lot size comes
    /// from the snapshot when positive, otherwise from the static table.
    #[must_use]
    pub fn derive(
        context: LegContext,
        generation: u64,
        snapshot: &ChainSnapshot,
        anchor: &AtmAnchor,
        config: &EngineConfig,
        received_at: DateTime<Utc>,
    ) -> Self {
        let lot_size = snapshot
            .lot_size()
            .unwrap_or_else(|| config.lot_size_for(&context.underlying));
        let atm = anchor.resolve(snapshot);
        let rows = derive_rows(snapshot, atm, lot_size);
        let window = select_window(&rows, atm, config.window_size);
        let atm_index = atm_row_index(&window, atm);

        Self {
            key: ChainKey::from(&context),
            context,
            generation,
            underlying_price: snapshot.underlying_price(),
            atm,
            atm_strike: effective_atm_strike(snapshot, atm),
            lot_size,
            total_strikes: snapshot.strike_count(),
            window,
            atm_index,
            received_at,
        }
    }

    /// Returns the chain key.
    #[must_use]
    pub const fn key(&self) -> &ChainKey {
        &self.key
    }

    /// Returns the leg context.
    #[must_use]
    pub const fn context(&self) -> &LegContext {
        &self.context
    }

    /// Returns the generation of the key this view was derived under.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns the underlying price, if known.
    #[must_use]
    pub const fn underlying_price(&self) -> Option<Decimal> {
        self.underlying_price
    }

    /// Returns the computed ATM strike (may be unlisted).
    #[must_use]
    pub const fn atm(&self) -> Option<Decimal> {
        self.atm
    }

    /// Returns the listed strike flagged as ATM.
    #[must_use]
    pub const fn atm_strike(&self) -> Option<Decimal> {
        self.atm_strike
    }

    /// Returns the resolved lot size.
    #[must_use]
    pub const fn lot_size(&self) -> u32 {
        self.lot_size
    }

    /// Returns the windowed rows in ascending strike order.
    #[must_use]
    pub fn rows(&self) -> &[DisplayStrikeRow] {
        &self.window
    }

    /// Returns the row index the presentation layer should scroll to.
    #[must_use]
    pub const fn atm_index(&self) -> Option<usize> {
        self.atm_index
    }

    /// Returns when the underlying snapshot was applied.
    #[must_use]
    pub const fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    /// Returns true if the view has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Finds a windowed row by strike.
    #[must_use]
    pub fn row(&self, strike: Decimal) -> Option<&DisplayStrikeRow> {
        self.window.iter().find(|r| r.strike == strike)
    }

    /// Builds a leg from a windowed row.
    ///
    /// `None` if the strike is not in the window or its premium is not
    /// positive.
    #[must_use]
    pub fn build_leg(
        &self,
        strike: Decimal,
        option_type: OptionType,
        side: Side,
    ) -> Option<OrderLegDescriptor> {
        self.row(strike)
            .and_then(|row| build_leg(&self.context, row, option_type, side))
    }

    /// Returns statistics about this view.
    #[must_use]
    pub fn stats(&self) -> ChainStats {
        ChainStats {
            key: self.key.clone(),
            total_strikes: self.total_strikes,
            window_rows: self.window.len(),
            atm_strike: self.atm_strike,
            lot_size: self.lot_size,
            received_at: self.received_at,
        }
    }
}

/// Statistics about a chain view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainStats {
    /// The chain key.
    pub key: ChainKey,
    /// Number of strikes in the snapshot.
    pub total_strikes: usize,
    /// Number of rows in the window.
    pub window_rows: usize,
    /// Listed ATM strike, if resolvable.
    pub atm_strike: Option<Decimal>,
    /// Resolved lot size.
    pub lot_size: u32,
    /// When the snapshot was applied.
    pub received_at: DateTime<Utc>,
}

impl fmt::Display for ChainStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let atm = self
            .atm_strike
            .map_or_else(|| "n/a".to_string(), |s| s.to_string());
        write!(
            f,
            "{}: {} strikes, {} in window, ATM {}, lot {}",
            self.key, self.total_strikes, self.window_rows, atm, self.lot_size
        )
    }
}
