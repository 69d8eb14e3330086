//! # Option Chain Window - Live Option Chain Derivation Engine
//!
//! A Rust library that turns a frequently refreshed option chain snapshot
//! into the views a trading front end needs: a stable at-the-money (ATM)
//! reference strike, a bounded window of strikes centered on it, and
//! normalized order-leg descriptors ready for submission.
//!
//! ## Key Features
//!
//! - **Symbol & Segment Resolution**: Collapses display aliases
//!   ("NIFTY 50", "NIFTY BANK") to canonical tickers and routes each
//!   underlying to its exchange segment. Never fails.
//!
//! - **ATM Strike Calculation**: Interval arithmetic with round-half-up,
//!   falling back to the listed strike nearest the last known price.
//!
//! - **Fixed-Size Windowing**: A contiguous, 31-strike (configurable) window
//!   centered on ATM, clamped at both ends of the strike universe, plus the
//!   ATM row index as an explicit scroll target.
//!
//! - **Snapshot-at-Click Legs**: Order legs capture premium, bid/ask, depth
//!   and instrument token at build time and never change afterwards.
//!
//! - **Refresh Coordination**: A single tokio task drives interval and manual
//!   refreshes, discards results for superseded keys, and keeps the last good
//!   view visible when a fetch fails.
//!
//! - **Exact Arithmetic**: Prices and strikes are `rust_decimal::Decimal`.
//!
//! ## Architecture
//!
//! ```text
//! RefreshCoordinator (tokio task, one per screen)
//!   ├── ChainSource::fetch(key) ──► ChainSnapshot (replaced wholesale)
//!   └── RefreshState
//!         ├── SymbolResolver ──► ChainKey + LegContext
//!         ├── AtmAnchor ──► compute_atm
//!         └── ChainView (per applied snapshot)
//!               ├── derive_rows ──► DisplayStrikeRow (one per strike)
//!               ├── select_window ──► centered window + atm_index
//!               └── build_leg ──► OrderLegDescriptor
//! ```
//!
//! ## Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`chain`] | Snapshot model and the pure derivation pipeline |
//! | [`refresh`] | Refresh state machine, tokio driver and event bus |
//! | [`config`] | Engine configuration with defaults |
//! | [`error`] | Error types and `Result` type alias |
//! | [`utils`] | Expiry parsing and formatting |
//!
//! ## Example Usage
//!
//! ### Deriving a View From a Snapshot
//!
//! ```rust
//! use option_chain_window::chain::{
//!     AtmAnchor, ChainSnapshot, ChainView, LegContext, LegQuote, OptionType, Side,
//!     StrikeQuote, SymbolResolver,
//! };
//! use option_chain_window::config::EngineConfig;
//! use option_chain_window::utils::parse_expiry;
//! use rust_decimal::Decimal;
//! use rust_decimal_macros::dec;
//!
//! let snapshot = (0..50).fold(ChainSnapshot::new(dec!(24485), dec!(50), None), |s, i| {
//!     let quote = StrikeQuote::new(LegQuote::new(dec!(100), dec!(99), dec!(101)), LegQuote::default());
//!     s.with_strike(Decimal::from(23000 + i * 50), quote)
//! });
//!
//! let config = EngineConfig::default();
//! let context = LegContext::resolve(
//!     &SymbolResolver::new(&config),
//!     "NIFTY 50",
//!     parse_expiry("2025-10-30").unwrap(),
//! );
//! let mut anchor = AtmAnchor::new();
//! anchor.observe(&snapshot);
//!
//! let view = ChainView::derive(context, 1, &snapshot, &anchor, &config, chrono::Utc::now());
//! assert_eq!(view.atm(), Some(dec!(24500)));
//! assert_eq!(view.rows().len(), 31);
//! assert_eq!(view.atm_index(), Some(15));
//!
//! let leg = view.build_leg(dec!(24500), OptionType::Call, Side::Buy).unwrap();
//! assert_eq!(leg.underlying, "NIFTY");
//! assert_eq!(leg.lot_size, 65);
//! ```
//!
//! ### Running the Refresh Coordinator
//!
//! ```rust,ignore
//! use option_chain_window::refresh::RefreshCoordinator;
//!
//! let (handle, _task) = RefreshCoordinator::spawn(my_source, EngineConfig::default())?;
//! handle.select("NIFTY 50", parse_expiry("2025-10-30")?).await?;
//!
//! let mut status = handle.subscribe();
//! while status.changed().await.is_ok() {
//!     if let Some(view) = status.borrow().view.clone() {
//!         println!("{}", view.stats());
//!     }
//! }
//! ```
//!
//! ## Benchmarks
//!
//! Run with:
//! ```bash
//! cargo bench
//! cargo bench -- window_benches
//! ```
//!
//! ## Dependencies
//!
//! - **rust_decimal** (1.39): Precise decimal arithmetic
//! - **tokio** (1.48): Timer, channels and task for the refresh coordinator
//! - **async-trait** (0.1): Async snapshot source trait
//! - **serde / serde_json** (1.0): Snapshot and leg wire formats, configuration
//! - **chrono** (0.4): Expiry dates and snapshot timestamps
//! - **thiserror** (2.0): Error handling
//! - **tracing** (0.1): Structured logging

pub mod chain;
pub mod config;
pub mod error;
pub mod refresh;
pub mod utils;

pub use error::{Error, Result};
