//! Chain snapshot module.
//!
//! This module provides [`ChainSnapshot`], the authoritative point-in-time
//! view of all strikes for one `(symbol, expiry)` pair, along with the
//! per-strike [`StrikeQuote`] and per-option [`LegQuote`] it is made of.
//!
//! A snapshot is immutable once built. The refresh coordinator replaces it
//! wholesale on every refresh; nothing in the engine patches it in place.
//!
//! ## Wire format
//!
//! ```text
//! {
//!   "underlying_ltp": 24485.35,
//!   "strike_interval": 50,
//!   "lot_size": 75,
//!   "strikes": {
//!     "24500": { "CE": { "ltp": 120.5, "bid": 120, "ask": 121, "token": 4512, ... },
//!                "PE": { ... } }
//!   }
//! }
//! ```

use crate::error::{Error, Result};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

/// Option type of a leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionType {
    /// Call option.
    #[serde(rename = "CE")]
    Call,
    /// Put option.
    #[serde(rename = "PE")]
    Put,
}

impl OptionType {
    /// Returns the exchange tag (`CE` or `PE`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "CE",
            Self::Put => "PE",
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quote state for one option (call or put) at one strike.
///
/// Prices of zero mean "no quote yet".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LegQuote {
    /// Last traded price.
    pub last_price: Decimal,
    /// Best bid.
    pub bid: Decimal,
    /// Best ask.
    pub ask: Decimal,
    /// Opaque market depth payload.
    pub depth: Option<serde_json::Value>,
    /// Exchange instrument token (security id).
    pub instrument_token: Option<String>,
    /// Greeks by name.
    pub greeks: BTreeMap<String, Decimal>,
    /// Source tag, e.g. `live`.
    pub source: Option<String>,
}

impl LegQuote {
    /// Creates a quote with prices only.
    #[must_use]
    pub fn new(last_price: Decimal, bid: Decimal, ask: Decimal) -> Self {
        Self {
            last_price,
            bid,
            ask,
            ..Self::default()
        }
    }

    /// Sets the instrument token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.instrument_token = Some(token.into());
        self
    }

    /// Returns true if the leg has traded at a positive price.
    #[must_use]
    pub fn is_tradable(&self) -> bool {
        self.last_price > Decimal::ZERO
    }
}

/// Call/put quote pair at a strike.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StrikeQuote {
    /// Call side.
    pub call: LegQuote,
    /// Put side.
    pub put: LegQuote,
}

impl StrikeQuote {
    /// Creates a strike quote from both legs.
    #[must_use]
    pub const fn new(call: LegQuote, put: LegQuote) -> Self {
        Self { call, put }
    }

    /// Returns the leg for the given option type.
    #[must_use]
    pub const fn get(&self, option_type: OptionType) -> &LegQuote {
        match option_type {
            OptionType::Call => &self.call,
            OptionType::Put => &self.put,
        }
    }
}

/// Point-in-time chain state for one `(symbol, expiry)` pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChainSnapshot {
    /// Last traded price of the underlying; zero before the first tick.
    underlying_price: Decimal,
    /// Spacing between adjacent strikes; zero when unknown.
    strike_interval: Decimal,
    /// Contract multiplier reported by the source.
    lot_size: Option<u32>,
    /// Quotes keyed by normalized strike.
    strikes: BTreeMap<Decimal, StrikeQuote>,
}

impl ChainSnapshot {
    /// Creates an empty snapshot.
    ///
    /// Negative price or interval inputs are treated as unknown (zero), and a
    /// zero lot size as absent.
    #[must_use]
    pub fn new(underlying_price: Decimal, strike_interval: Decimal, lot_size: Option<u32>) -> Self {
        Self {
            underlying_price: underlying_price.max(Decimal::ZERO),
            strike_interval: strike_interval.max(Decimal::ZERO),
            lot_size: lot_size.filter(|l| *l > 0),
            strikes: BTreeMap::new(),
        }
    }

    /// Adds a strike, builder style. A repeated strike replaces the earlier one.
    #[must_use]
    pub fn with_strike(mut self, strike: Decimal, quote: StrikeQuote) -> Self {
        self.strikes.insert(strike.normalize(), quote);
        self
    }

    /// Parses a snapshot from its JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` if the payload does not match the wire shape and
    /// `Error::InvalidSnapshot` for unparsable or duplicate strike keys.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let wire: WireSnapshot = serde_json::from_str(raw)?;
        wire.try_into()
    }

    /// Parses a snapshot from an already-decoded JSON value.
    ///
    /// # Errors
    ///
    /// Same as [`ChainSnapshot::from_json_str`].
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let wire: WireSnapshot = serde_json::from_value(value)?;
        wire.try_into()
    }

    /// Returns the underlying price, or `None` before the first tick.
    #[must_use]
    pub fn underlying_price(&self) -> Option<Decimal> {
        (self.underlying_price > Decimal::ZERO).then_some(self.underlying_price)
    }

    /// Returns the strike interval, or `None` if unknown.
    #[must_use]
    pub fn strike_interval(&self) -> Option<Decimal> {
        (self.strike_interval > Decimal::ZERO).then_some(self.strike_interval)
    }

    /// Returns the raw underlying price (zero when unknown).
    #[must_use]
    pub const fn raw_underlying_price(&self) -> Decimal {
        self.underlying_price
    }

    /// Returns the raw strike interval (zero when unknown).
    #[must_use]
    pub const fn raw_strike_interval(&self) -> Decimal {
        self.strike_interval
    }

    /// Returns the lot size reported by the source, if any.
    #[must_use]
    pub const fn lot_size(&self) -> Option<u32> {
        self.lot_size
    }

    /// Returns the number of strikes.
    #[must_use]
    pub fn strike_count(&self) -> usize {
        self.strikes.len()
    }

    /// Returns true if there are no strikes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strikes.is_empty()
    }

    /// Returns all strike prices (sorted).
    pub fn strike_prices(&self) -> Vec<Decimal> {
        self.strikes.keys().copied().collect()
    }

    /// Iterates strikes in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (&Decimal, &StrikeQuote)> {
        self.strikes.iter()
    }

    /// Gets the quote pair at a strike.
    ///
    /// # Errors
    ///
    /// Returns `Error::StrikeNotFound` if the strike does not exist.
    pub fn get(&self, strike: Decimal) -> Result<&StrikeQuote> {
        self.strikes
            .get(&strike.normalize())
            .ok_or_else(|| Error::strike_not_found(strike))
    }

    /// Returns the strike closest to `price`, the lower one on a tie.
    ///
    /// # Errors
    ///
    /// Returns `Error::NoDataAvailable` if there are no strikes.
    pub fn nearest_strike(&self, price: Decimal) -> Result<Decimal> {
        super::atm::nearest_strike(self.strikes.keys().copied(), price)
            .ok_or_else(|| Error::no_data("no strikes available"))
    }
}

#[derive(Debug, Deserialize)]
struct WireSnapshot {
    #[serde(default)]
    underlying_ltp: Option<Decimal>,
    #[serde(default)]
    strike_interval: Option<Decimal>,
    #[serde(default)]
    lot_size: Option<Decimal>,
    #[serde(default)]
    strikes: Option<HashMap<String, WireStrike>>,
}

#[derive(Debug, Default, Deserialize)]
struct WireStrike {
    #[serde(rename = "CE", default)]
    ce: Option<WireLeg>,
    #[serde(rename = "PE", default)]
    pe: Option<WireLeg>,
}

#[derive(Debug, Default, Deserialize)]
struct WireLeg {
    #[serde(default)]
    ltp: Option<Decimal>,
    #[serde(default)]
    bid: Option<Decimal>,
    #[serde(default)]
    ask: Option<Decimal>,
    #[serde(default)]
    token: Option<WireToken>,
    #[serde(default)]
    depth: Option<serde_json::Value>,
    #[serde(default)]
    greeks: Option<BTreeMap<String, Option<Decimal>>>,
    #[serde(default)]
    source: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireToken {
    Number(u64),
    Text(String),
}

impl From<WireLeg> for LegQuote {
    fn from(wire: WireLeg) -> Self {
        let non_negative = |v: Option<Decimal>| v.unwrap_or_default().max(Decimal::ZERO);
        Self {
            last_price: non_negative(wire.ltp),
            bid: non_negative(wire.bid),
            ask: non_negative(wire.ask),
            depth: wire.depth.filter(|d| !d.is_null()),
            instrument_token: wire.token.and_then(|t| match t {
                WireToken::Number(n) => Some(n.to_string()),
                WireToken::Text(s) if s.trim().is_empty() => None,
                WireToken::Text(s) => Some(s),
            }),
            greeks: wire
                .greeks
                .unwrap_or_default()
                .into_iter()
                .filter_map(|(name, value)| value.map(|v| (name, v)))
                .collect(),
            source: wire.source,
        }
    }
}

impl TryFrom<WireSnapshot> for ChainSnapshot {
    type Error = Error;

    fn try_from(wire: WireSnapshot) -> Result<Self> {
        let lot_size = wire
            .lot_size
            .filter(|l| *l > Decimal::ZERO)
            .and_then(|l| l.trunc().to_u32());
        let mut snapshot = Self::new(
            wire.underlying_ltp.unwrap_or_default(),
            wire.strike_interval.unwrap_or_default(),
            lot_size,
        );

        for (key, strike) in wire.strikes.unwrap_or_default() {
            let price = Decimal::from_str(key.trim())
                .map_err(|e| Error::invalid_snapshot(format!("strike key {key:?}: {e}")))?
                .normalize();
            if price <= Decimal::ZERO {
                return Err(Error::invalid_snapshot(format!(
                    "strike key {key:?} is not positive"
                )));
            }
            let quote = StrikeQuote::new(
                strike.ce.map(LegQuote::from).unwrap_or_default(),
                strike.pe.map(LegQuote::from).unwrap_or_default(),
            );
            if snapshot.strikes.insert(price, quote).is_some() {
                return Err(Error::invalid_snapshot(format!(
                    "duplicate strike {price}"
                )));
            }
        }

        Ok(snapshot)
    }
}
