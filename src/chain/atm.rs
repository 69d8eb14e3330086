//! ATM strike calculation.
//!
//! The at-the-money strike is derived arithmetically from the underlying
//! price and the strike interval. When either is unknown, the calculator
//! falls back to the nearest listed strike to the last known price, kept by
//! an [`AtmAnchor`] that lives as long as the current `(symbol, expiry)` key.

use super::snapshot::ChainSnapshot;
use rust_decimal::{Decimal, RoundingStrategy};

/// Computes the ATM strike.
///
/// With a positive price and interval the result is
/// `round(price / interval) * interval`, rounding half up on the quotient.
/// That value need not be a listed strike. Otherwise, or when the quotient
/// is out of `Decimal` range, `fallback` is returned as is; `None` means no
/// ATM can be resolved.
///
/// # Examples
///
/// ```rust
/// use option_chain_window::chain::compute_atm;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(compute_atm(dec!(24485), dec!(50), None), Some(dec!(24500)));
/// assert_eq!(compute_atm(dec!(0), dec!(50), Some(dec!(24450))), Some(dec!(24450)));
/// assert_eq!(compute_atm(dec!(0), dec!(0), None), None);
/// ```
#[must_use]
pub fn compute_atm(
    underlying_price: Decimal,
    strike_interval: Decimal,
    fallback: Option<Decimal>,
) -> Option<Decimal> {
    if underlying_price <= Decimal::ZERO || strike_interval <= Decimal::ZERO {
        return fallback;
    }
    underlying_price
        .checked_div(strike_interval)
        .map(|q| q.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|steps| steps.checked_mul(strike_interval))
        .map(|atm| atm.normalize())
        .or(fallback)
}

/// Returns the strike with minimum distance to `price`.
///
/// Ties go to the lower strike regardless of iteration order.
#[must_use]
pub fn nearest_strike<I>(strikes: I, price: Decimal) -> Option<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    strikes
        .into_iter()
        .min_by(|a, b| {
            (*a - price)
                .abs()
                .cmp(&(*b - price).abs())
                .then_with(|| a.cmp(b))
        })
}

/// Fallback source for ATM resolution.
///
/// Remembers the last positive underlying price seen for the current key and
/// the listed strike nearest to it in the latest snapshot. Reset on every
/// key change so no anchor survives a symbol switch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AtmAnchor {
    last_known_price: Option<Decimal>,
    nearest: Option<Decimal>,
}

impl AtmAnchor {
    /// Creates an empty anchor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates the anchor from a freshly applied snapshot.
    pub fn observe(&mut self, snapshot: &ChainSnapshot) {
        if let Some(price) = snapshot.underlying_price() {
            self.last_known_price = Some(price);
        }
        self.nearest = self
            .last_known_price
            .and_then(|price| snapshot.nearest_strike(price).ok());
    }

    /// Returns the nearest-strike fallback, if any.
    #[must_use]
    pub const fn fallback(&self) -> Option<Decimal> {
        self.nearest
    }

    /// Returns the last positive underlying price observed.
    #[must_use]
    pub const fn last_known_price(&self) -> Option<Decimal> {
        self.last_known_price
    }

    /// Resolves the ATM strike for `snapshot`, the interval calculation
    /// taking precedence over the fallback.
    #[must_use]
    pub fn resolve(&self, snapshot: &ChainSnapshot) -> Option<Decimal> {
        compute_atm(
            snapshot.raw_underlying_price(),
            snapshot.raw_strike_interval(),
            self.fallback(),
        )
    }

    /// Clears all state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
