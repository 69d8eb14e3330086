//! Symbol and segment resolution.
//!
//! This module provides the [`SymbolResolver`], which maps human-facing
//! underlying names to canonical tickers and canonical tickers to the
//! [`ExchangeSegment`] used for order routing. Resolution never fails:
//! unknown names pass through normalized and route to the default segment.

use crate::config::EngineConfig;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Exchange segment used for order routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExchangeSegment {
    /// NSE futures and options (default).
    #[serde(rename = "NSE_FNO")]
    NseFno,
    /// BSE futures and options.
    #[serde(rename = "BSE_FNO")]
    BseFno,
}

impl ExchangeSegment {
    /// Returns the wire tag of the segment.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NseFno => "NSE_FNO",
            Self::BseFno => "BSE_FNO",
        }
    }
}

impl fmt::Display for ExchangeSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolves display names to canonical symbols and exchange segments.
#[derive(Debug, Clone)]
pub struct SymbolResolver {
    /// Upper-cased alias -> canonical ticker.
    aliases: HashMap<String, String>,
    /// Upper-cased underlyings routed to [`ExchangeSegment::BseFno`].
    alternate: HashSet<String>,
}

impl Default for SymbolResolver {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl SymbolResolver {
    /// Creates a resolver from the aliases and segment table of `config`.
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            aliases: config
                .symbol_aliases
                .iter()
                .map(|(alias, canonical)| (normalize(alias), normalize(canonical)))
                .collect(),
            alternate: config
                .alternate_segment_underlyings
                .iter()
                .map(|s| normalize(s))
                .collect(),
        }
    }

    /// Maps a display name to its canonical ticker.
    ///
    /// Whitespace is collapsed and case folded; names without an alias are
    /// returned in that normalized form.
    #[must_use]
    pub fn resolve_symbol(&self, display_name: &str) -> String {
        let normalized = normalize(display_name);
        match self.aliases.get(&normalized) {
            Some(canonical) => canonical.clone(),
            None => normalized,
        }
    }

    /// Maps a canonical ticker to its exchange segment (case-insensitive).
    #[must_use]
    pub fn resolve_segment(&self, canonical_symbol: &str) -> ExchangeSegment {
        if self.alternate.contains(&normalize(canonical_symbol)) {
            ExchangeSegment::BseFno
        } else {
            ExchangeSegment::NseFno
        }
    }
}

fn normalize(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}
