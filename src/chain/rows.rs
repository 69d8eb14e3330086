//! Display row derivation.

use super::atm::nearest_strike;
use super::snapshot::{ChainSnapshot, LegQuote, OptionType};
use rust_decimal::Decimal;
use serde::Serialize;

/// One derived row per strike, rebuilt from every new snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayStrikeRow {
    /// Strike price.
    pub strike: Decimal,
    /// True for the single row closest to the ATM strike.
    pub is_atm: bool,
    /// Call side quote.
    pub call: LegQuote,
    /// Put side quote.
    pub put: LegQuote,
    /// Resolved lot size.
    pub lot_size: u32,
}

impl DisplayStrikeRow {
    /// Returns the quote for the given option type.
    #[must_use]
    pub const fn leg(&self, option_type: OptionType) -> &LegQuote {
        match option_type {
            OptionType::Call => &self.call,
            OptionType::Put => &self.put,
        }
    }

    /// Returns the last traded price for the given option type.
    #[must_use]
    pub fn premium(&self, option_type: OptionType) -> Decimal {
        self.leg(option_type).last_price
    }
}

/// Returns the listed strike that represents `atm` in the chain.
///
/// That is `atm` itself when listed, otherwise the nearest listed strike.
#[must_use]
pub fn effective_atm_strike(snapshot: &ChainSnapshot, atm: Option<Decimal>) -> Option<Decimal> {
    atm.and_then(|atm| nearest_strike(snapshot.strike_prices(), atm))
}

/// Derives one row per strike, in ascending strike order.
///
/// The row at [`effective_atm_strike`] is flagged `is_atm`; with no ATM no
/// row is flagged.
#[must_use]
pub fn derive_rows(
    snapshot: &ChainSnapshot,
    atm: Option<Decimal>,
    lot_size: u32,
) -> Vec<DisplayStrikeRow> {
    let atm_row = effective_atm_strike(snapshot, atm);
    snapshot
        .iter()
        .map(|(strike, quote)| DisplayStrikeRow {
            strike: *strike,
            is_atm: atm_row == Some(*strike),
            call: quote.call.clone(),
            put: quote.put.clone(),
            lot_size,
        })
        .collect()
}
