//! Option chain derivation pipeline.
//!
//! This module turns a raw [`ChainSnapshot`] into everything the
//! presentation layer and the order collaborator need:
//!
//! ## Pipeline
//!
//! ```text
//! display name ──► SymbolResolver ──► ChainKey + LegContext
//!                                        │
//! ChainSnapshot ──► AtmAnchor / compute_atm ──► ATM strike
//!        │                                        │
//!        └──► derive_rows ──► select_window ◄─────┘
//!                                  │
//!                              ChainView ──► build_leg ──► OrderLegDescriptor
//! ```
//!
//! ## Components
//!
//! - [`SymbolResolver`]: display name to canonical ticker and [`ExchangeSegment`]
//! - [`ChainSnapshot`]: immutable strike-indexed quotes for one `(symbol, expiry)`
//! - [`compute_atm`] / [`AtmAnchor`]: ATM strike with nearest-strike fallback
//! - [`derive_rows`]: one [`DisplayStrikeRow`] per strike
//! - [`select_window`]: fixed-size contiguous window centered on ATM
//! - [`build_leg`]: [`OrderLegDescriptor`] from a row, option type and side
//! - [`ChainView`]: one derivation pass, tagged with key and generation
//!
//! Every step is synchronous and pure; a view can be discarded and rebuilt
//! from its snapshot at any time.

mod atm;
mod leg;
mod resolver;
mod rows;
mod snapshot;
mod view;
mod window;

pub use atm::{AtmAnchor, compute_atm, nearest_strike};
pub use leg::{LegContext, OrderLegDescriptor, Side, build_leg, is_tradable};
pub use resolver::{ExchangeSegment, SymbolResolver};
pub use rows::{DisplayStrikeRow, derive_rows, effective_atm_strike};
pub use snapshot::{ChainSnapshot, LegQuote, OptionType, StrikeQuote};
pub use view::{ChainKey, ChainStats, ChainView};
pub use window::{atm_row_index, closest_index, select_window, window_bounds};
