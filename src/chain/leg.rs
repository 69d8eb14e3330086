//! Order leg construction.
//!
//! This module provides [`build_leg`], which turns a display row plus the
//! static [`LegContext`] of the current chain into an
//! [`OrderLegDescriptor`] for the order-submission collaborator. Quote
//! fields are captured at the moment of the call; a leg never changes after
//! it is built, even if the chain refreshes before submission.

use super::resolver::{ExchangeSegment, SymbolResolver};
use super::rows::DisplayStrikeRow;
use super::snapshot::OptionType;
use crate::utils::{format_expiry, format_expiry_label};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order side of a leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Buy.
    #[serde(rename = "BUY")]
    Buy,
    /// Sell.
    #[serde(rename = "SELL")]
    Sell,
}

impl Side {
    /// Returns the opposite side.
    #[must_use]
    pub const fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => f.write_str("BUY"),
            Self::Sell => f.write_str("SELL"),
        }
    }
}

/// Static context shared by every leg of one chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegContext {
    /// Display name the chain was opened with.
    pub display_symbol: String,
    /// Canonical underlying ticker.
    pub underlying: String,
    /// Exchange segment for routing.
    pub segment: ExchangeSegment,
    /// Contract expiry.
    pub expiry: NaiveDate,
}

impl LegContext {
    /// Resolves the context for a display name and expiry.
    #[must_use]
    pub fn resolve(resolver: &SymbolResolver, display_symbol: &str, expiry: NaiveDate) -> Self {
        let underlying = resolver.resolve_symbol(display_symbol);
        Self {
            display_symbol: display_symbol.trim().to_string(),
            segment: resolver.resolve_segment(&underlying),
            underlying,
            expiry,
        }
    }
}

/// One instrument leg ready for submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderLegDescriptor {
    /// Contract label, e.g. `NIFTY 30 OCT 24500 CE`.
    pub symbol: String,
    /// Order side.
    pub action: Side,
    /// Reference premium (last traded price at build time).
    pub ltp: Decimal,
    /// Contract multiplier.
    #[serde(rename = "lotSize")]
    pub lot_size: u32,
    /// Canonical underlying ticker.
    pub underlying: String,
    /// Exchange instrument token.
    pub security_id: Option<String>,
    /// Exchange segment for routing.
    pub exchange_segment: ExchangeSegment,
    /// Best bid at build time.
    pub bid: Decimal,
    /// Best ask at build time.
    pub ask: Decimal,
    /// Strike price.
    pub strike: Decimal,
    /// Call or put.
    #[serde(rename = "optionType")]
    pub option_type: OptionType,
    /// Market depth at build time.
    pub depth: Option<serde_json::Value>,
    /// Expiry as `YYYY-MM-DD`.
    pub expiry: String,
}

/// Returns true if a leg may be built for this row and option type.
#[must_use]
pub fn is_tradable(row: &DisplayStrikeRow, option_type: OptionType) -> bool {
    row.premium(option_type) > Decimal::ZERO
}

/// Builds a leg, or `None` when the premium is not strictly positive.
///
/// A `None` means the action is unavailable; callers disable it rather than
/// treat it as a failure.
#[must_use]
pub fn build_leg(
    context: &LegContext,
    row: &DisplayStrikeRow,
    option_type: OptionType,
    side: Side,
) -> Option<OrderLegDescriptor> {
    if !is_tradable(row, option_type) {
        return None;
    }
    let quote = row.leg(option_type);
    Some(OrderLegDescriptor {
        symbol: format!(
            "{} {} {} {}",
            context.underlying,
            format_expiry_label(context.expiry),
            row.strike.normalize(),
            option_type
        ),
        action: side,
        ltp: quote.last_price,
        lot_size: row.lot_size,
        underlying: context.underlying.clone(),
        security_id: quote.instrument_token.clone(),
        exchange_segment: context.segment,
        bid: quote.bid,
        ask: quote.ask,
        strike: row.strike,
        option_type,
        depth: quote.depth.clone(),
        expiry: format_expiry(context.expiry),
    })
}
