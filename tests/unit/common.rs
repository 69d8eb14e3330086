//! Shared fixtures for the integration tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use option_chain_window::chain::{ChainKey, ChainSnapshot, LegQuote, StrikeQuote};
use option_chain_window::refresh::ChainSource;
use option_chain_window::{Error, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

pub fn expiry() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 10, 30).unwrap()
}

/// `count` strikes from `first` spaced by `step`, calls quoted at 100 and
/// puts without a trade.
pub fn ladder(price: Decimal, interval: Decimal, first: i64, count: i64, step: i64) -> ChainSnapshot {
    (0..count).fold(ChainSnapshot::new(price, interval, None), |s, i| {
        let strike = Decimal::from(first + i * step);
        let call = LegQuote::new(dec!(100), dec!(99.5), dec!(100.5))
            .with_token(format!("{}", 40000 + i));
        s.with_strike(strike, StrikeQuote::new(call, LegQuote::default()))
    })
}

/// Source returning a 50-strike NIFTY-like ladder, with per-symbol delays
/// and a switchable failure mode.
pub struct ScriptedSource {
    calls: AtomicUsize,
    fail: AtomicBool,
    delays: HashMap<String, Duration>,
    fetched: Mutex<Vec<String>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::with_delays(&[])
    }

    pub fn with_delays(delays: &[(&str, u64)]) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            delays: delays
                .iter()
                .map(|(symbol, ms)| (symbol.to_string(), Duration::from_millis(*ms)))
                .collect(),
            fetched: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainSource for ScriptedSource {
    async fn fetch(&self, key: &ChainKey) -> Result<ChainSnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.fetched.lock().unwrap().push(key.symbol().to_string());
        if let Some(delay) = self.delays.get(key.symbol()) {
            tokio::time::sleep(*delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::fetch(key, "backend down"));
        }
        Ok(ladder(dec!(24485), dec!(50), 23000, 50, 50))
    }
}
