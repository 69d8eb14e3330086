//! Example: Live Option Chain
//!
//! This example drives the refresh coordinator against a synthetic snapshot
//! source whose underlying drifts on every fetch. It shows the ATM window
//! following the price, a key switch, and snapshot-at-click order legs.
//!
//! Run with: `cargo run --example live_chain`

use async_trait::async_trait;
use option_chain_window::chain::{
    ChainKey, ChainSnapshot, LegQuote, OptionType, Side, StrikeQuote,
};
use option_chain_window::config::EngineConfig;
use option_chain_window::refresh::{ChainEvent, ChainSource, RefreshCoordinator};
use option_chain_window::utils::parse_expiry;
use option_chain_window::Result;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tracing::info;

/// Synthetic source: 80 strikes around a base price that moves 35 points
/// per fetch.
struct DriftingSource {
    tick: AtomicI64,
}

#[async_trait]
impl ChainSource for DriftingSource {
    async fn fetch(&self, key: &ChainKey) -> Result<ChainSnapshot> {
        let tick = self.tick.fetch_add(1, Ordering::Relaxed);
        let (base, interval) = match key.symbol() {
            "BANKNIFTY" => (dec!(51240), dec!(100)),
            _ => (dec!(24485), dec!(50)),
        };
        let price = base + Decimal::from(tick * 35);
        let first = (base / interval).floor() * interval - interval * dec!(40);

        tokio::time::sleep(Duration::from_millis(120)).await;
        Ok((0..80).fold(ChainSnapshot::new(price, interval, None), |s, i| {
            let strike = first + interval * Decimal::from(i);
            let call_premium = (price - strike).max(Decimal::ZERO) + dec!(40);
            let put_premium = (strike - price).max(Decimal::ZERO) + dec!(40);
            let quote = StrikeQuote::new(
                LegQuote::new(call_premium, call_premium - dec!(0.5), call_premium + dec!(0.5))
                    .with_token(format!("{}", 50000 + i * 2)),
                LegQuote::new(put_premium, put_premium - dec!(0.5), put_premium + dec!(0.5))
                    .with_token(format!("{}", 50001 + i * 2)),
            );
            s.with_strike(strike, quote)
        }))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();
    info!("=== Live Option Chain Example ===\n");

    let config = EngineConfig::from_json_str(r#"{ "refresh_interval_ms": 500 }"#)?;
    let source = DriftingSource {
        tick: AtomicI64::new(0),
    };
    let (handle, task) = RefreshCoordinator::spawn(source, config)?;

    let mut events = handle.events().subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let ChainEvent::FetchFailed { key, message, .. } = event {
                info!("fetch failed for {}: {}", key, message);
            }
        }
    });

    // === Select NIFTY and follow a few refreshes ===
    info!("--- Selecting NIFTY 50 ---");
    let expiry = parse_expiry("2025-10-30")?;
    handle.select("NIFTY 50", expiry).await?;

    let mut status = handle.subscribe();
    let mut seen = 0;
    while seen < 4 && status.changed().await.is_ok() {
        let view = status.borrow_and_update().view.clone();
        if let Some(view) = view {
            seen += 1;
            info!("{}", view.stats());
            if let Some(target) = handle.take_scroll_target().await? {
                info!("scroll to row {}", target);
            }
        }
    }

    // === Snapshot-at-click legs ===
    info!("\n--- Building legs from the current view ---");
    if let Some(view) = handle.current_view()
        && let Some(strike) = view.atm_strike()
    {
        for (option_type, side) in [(OptionType::Call, Side::Buy), (OptionType::Put, Side::Sell)] {
            if let Some(leg) = handle.build_leg(&view, strike, option_type, side)? {
                info!(
                    "{} {} @ {} (lot {}, {})",
                    leg.action, leg.symbol, leg.ltp, leg.lot_size, leg.exchange_segment
                );
            }
        }
    }

    // === Switch key ===
    info!("\n--- Switching to NIFTY BANK ---");
    handle.select("NIFTY BANK", expiry).await?;
    handle.refresh().await?;
    while status.changed().await.is_ok() {
        let view = status.borrow_and_update().view.clone();
        if let Some(view) = view.filter(|v| v.key().symbol() == "BANKNIFTY") {
            info!("{}", view.stats());
            break;
        }
    }

    handle.shutdown().await?;
    task.await.ok();
    info!("\n=== Example Complete ===");
    Ok(())
}
