//! Engine configuration.
//!
//! [`EngineConfig`] carries the static inputs of the engine: refresh cadence,
//! window size, the per-underlying lot-size fallback table, the underlyings
//! routed to the alternate exchange segment, and display-name aliases.
//! Every field has a default, so a partial JSON document is enough.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Default refresh cadence in milliseconds.
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 1_000;

/// Default number of strikes in the display window.
pub const DEFAULT_WINDOW_SIZE: usize = 31;

fn default_lot_sizes() -> HashMap<String, u32> {
    [
        ("NIFTY", 65),
        ("BANKNIFTY", 30),
        ("FINNIFTY", 25),
        ("MIDCPNIFTY", 50),
        ("SENSEX", 10),
        ("BANKEX", 15),
    ]
    .into_iter()
    .map(|(symbol, lots)| (symbol.to_string(), lots))
    .collect()
}

fn default_alternate_segment_underlyings() -> Vec<String> {
    vec!["SENSEX".to_string(), "BANKEX".to_string()]
}

fn default_symbol_aliases() -> HashMap<String, String> {
    [
        ("NIFTY 50", "NIFTY"),
        ("NIFTY50", "NIFTY"),
        ("NIFTY BANK", "BANKNIFTY"),
        ("BANK NIFTY", "BANKNIFTY"),
        ("NIFTY FIN SERVICE", "FINNIFTY"),
        ("NIFTY FINANCIAL SERVICES", "FINNIFTY"),
        ("NIFTY MID SELECT", "MIDCPNIFTY"),
        ("NIFTY MIDCAP SELECT", "MIDCPNIFTY"),
        ("BSE SENSEX", "SENSEX"),
        ("S&P BSE SENSEX", "SENSEX"),
        ("BSE BANKEX", "BANKEX"),
    ]
    .into_iter()
    .map(|(alias, canonical)| (alias.to_string(), canonical.to_string()))
    .collect()
}

/// Static configuration for the derivation pipeline and refresh coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Interval between automatic refreshes, in milliseconds.
    pub refresh_interval_ms: u64,

    /// Number of strikes kept in the display window.
    pub window_size: usize,

    /// Lot size per canonical underlying, used when a snapshot carries none.
    pub lot_sizes: HashMap<String, u32>,

    /// Lot size for underlyings missing from `lot_sizes`.
    pub default_lot_size: u32,

    /// Underlyings routed to the alternate exchange segment.
    pub alternate_segment_underlyings: Vec<String>,

    /// Display-name aliases mapped to canonical tickers.
    pub symbol_aliases: HashMap<String, String>,

    /// Buffer size of the event bus.
    pub event_capacity: usize,

    /// Buffer size of the coordinator command queue.
    pub command_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
            window_size: DEFAULT_WINDOW_SIZE,
            lot_sizes: default_lot_sizes(),
            default_lot_size: 1,
            alternate_segment_underlyings: default_alternate_segment_underlyings(),
            symbol_aliases: default_symbol_aliases(),
            event_capacity: 64,
            command_capacity: 32,
        }
    }
}

impl EngineConfig {
    /// Loads a configuration from JSON, filling missing fields with defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` on malformed input and `Error::InvalidConfig`
    /// if the resulting configuration fails [`EngineConfig::validate`].
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the configuration can drive the engine.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` describing the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.refresh_interval_ms == 0 {
            return Err(Error::invalid_config("refresh_interval_ms must be positive"));
        }
        if self.window_size == 0 {
            return Err(Error::invalid_config("window_size must be positive"));
        }
        if self.default_lot_size == 0 {
            return Err(Error::invalid_config("default_lot_size must be positive"));
        }
        if let Some((symbol, _)) = self.lot_sizes.iter().find(|(_, lots)| **lots == 0) {
            return Err(Error::invalid_config(format!(
                "lot size for {symbol} must be positive"
            )));
        }
        if self.event_capacity == 0 || self.command_capacity == 0 {
            return Err(Error::invalid_config("channel capacities must be positive"));
        }
        Ok(())
    }

    /// Returns the refresh cadence.
    #[must_use]
    pub const fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    /// Returns the statically configured lot size for a canonical underlying.
    #[must_use]
    pub fn lot_size_for(&self, canonical_symbol: &str) -> u32 {
        self.lot_sizes
            .iter()
            .find(|(symbol, _)| symbol.eq_ignore_ascii_case(canonical_symbol))
            .map_or(self.default_lot_size, |(_, lots)| *lots)
    }
}
