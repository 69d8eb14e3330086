//! Integration tests for the refresh coordinator.

use crate::common::{ScriptedSource, expiry, ladder};
use async_trait::async_trait;
use option_chain_window::chain::{ChainKey, ChainSnapshot, ChainView, OptionType, Side};
use option_chain_window::config::EngineConfig;
use option_chain_window::refresh::{
    ChainEvent, ChainSource, CoordinatorHandle, RefreshCoordinator, RefreshPhase,
};
use option_chain_window::{Error, Result};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::broadcast;

/// Panics on the second fetch, succeeds otherwise.
struct PanicOnSecondFetch {
    calls: AtomicUsize,
}

#[async_trait]
impl ChainSource for PanicOnSecondFetch {
    async fn fetch(&self, _key: &ChainKey) -> Result<ChainSnapshot> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 1 {
            panic!("source exploded");
        }
        Ok(ladder(dec!(24485), dec!(50), 23000, 50, 50))
    }
}

async fn wait_for_view(handle: &CoordinatorHandle, symbol: &str) -> Arc<ChainView> {
    let mut status = handle.subscribe();
    let wait = async {
        loop {
            let view = status.borrow_and_update().view.clone();
            if let Some(view) = view.filter(|v| v.key().symbol() == symbol) {
                return view;
            }
            status.changed().await.unwrap();
        }
    };
    tokio::time::timeout(Duration::from_secs(30), wait)
        .await
        .expect("view not published")
}

fn drain(events: &mut broadcast::Receiver<ChainEvent>) -> Vec<ChainEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

fn quiet_config() -> EngineConfig {
    EngineConfig {
        refresh_interval_ms: 60_000,
        ..EngineConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_select_publishes_view() {
    let source = Arc::new(ScriptedSource::new());
    let (handle, _task) =
        RefreshCoordinator::spawn(Arc::clone(&source), EngineConfig::default()).unwrap();
    let mut events = handle.events().subscribe();

    handle.select("NIFTY 50", expiry()).await.unwrap();
    let view = wait_for_view(&handle, "NIFTY").await;

    assert_eq!(view.atm(), Some(dec!(24500)));
    assert_eq!(view.rows().len(), 31);
    assert_eq!(handle.status().phase, RefreshPhase::Ready);

    let events = drain(&mut events);
    assert!(matches!(events[0], ChainEvent::KeyChanged { generation: 1, .. }));
    assert!(events.iter().any(|e| matches!(
        e,
        ChainEvent::SnapshotApplied { strikes: 50, atm_strike: Some(_), .. }
    )));
}

#[tokio::test(start_paused = true)]
async fn test_interval_refresh() {
    let source = Arc::new(ScriptedSource::new());
    let (handle, _task) =
        RefreshCoordinator::spawn(Arc::clone(&source), EngineConfig::default()).unwrap();

    handle.select("NIFTY", expiry()).await.unwrap();
    wait_for_view(&handle, "NIFTY").await;
    let after_select = source.calls();

    tokio::time::sleep(Duration::from_millis(3_500)).await;
    let ticks = source.calls() - after_select;
    assert!((3..=4).contains(&ticks), "unexpected tick count {ticks}");
}

#[tokio::test(start_paused = true)]
async fn test_no_fetch_without_key() {
    let source = Arc::new(ScriptedSource::new());
    let (handle, _task) =
        RefreshCoordinator::spawn(Arc::clone(&source), EngineConfig::default()).unwrap();

    tokio::time::sleep(Duration::from_millis(2_500)).await;
    assert_eq!(source.calls(), 0);
    assert_eq!(handle.status().phase, RefreshPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_failure_keeps_stale_view() {
    let source = Arc::new(ScriptedSource::new());
    let (handle, _task) =
        RefreshCoordinator::spawn(Arc::clone(&source), EngineConfig::default()).unwrap();

    handle.select("NIFTY", expiry()).await.unwrap();
    wait_for_view(&handle, "NIFTY").await;

    source.set_failing(true);
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    let status = handle.status();
    assert_eq!(status.phase, RefreshPhase::Failed);
    assert!(status.is_stale());
    assert!(status.last_error.unwrap().contains("backend down"));
    assert_eq!(status.view.unwrap().atm(), Some(dec!(24500)));

    // Every tick retries; recovery clears the error.
    source.set_failing(false);
    tokio::time::sleep(Duration::from_millis(1_000)).await;
    let status = handle.status();
    assert_eq!(status.phase, RefreshPhase::Ready);
    assert!(status.last_error.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_panicking_fetch_fails_and_next_tick_retries() {
    let source = Arc::new(PanicOnSecondFetch {
        calls: AtomicUsize::new(0),
    });
    let (handle, _task) =
        RefreshCoordinator::spawn(Arc::clone(&source), EngineConfig::default()).unwrap();

    handle.select("NIFTY", expiry()).await.unwrap();
    wait_for_view(&handle, "NIFTY").await;

    // The tick at 1s panics inside the source.
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    let status = handle.status();
    assert_eq!(status.phase, RefreshPhase::Failed);
    assert!(status.last_error.unwrap().contains("fetch task panicked"));
    assert_eq!(status.view.unwrap().atm(), Some(dec!(24500)));

    tokio::time::sleep(Duration::from_millis(1_000)).await;
    assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    assert_eq!(handle.status().phase, RefreshPhase::Ready);
    handle.refresh().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_superseded_key_result_discarded() {
    let source = Arc::new(ScriptedSource::with_delays(&[("NIFTY", 5_000)]));
    let (handle, _task) =
        RefreshCoordinator::spawn(Arc::clone(&source), EngineConfig::default()).unwrap();
    let mut events = handle.events().subscribe();

    handle.select("NIFTY", expiry()).await.unwrap();
    handle.select("NIFTY BANK", expiry()).await.unwrap();
    wait_for_view(&handle, "BANKNIFTY").await;

    // Let the slow NIFTY fetch land.
    tokio::time::sleep(Duration::from_millis(6_000)).await;

    let status = handle.status();
    assert_eq!(status.generation, 2);
    assert_eq!(status.key.unwrap().symbol(), "BANKNIFTY");
    assert_eq!(status.view.unwrap().key().symbol(), "BANKNIFTY");
    assert!(source.fetched().iter().any(|s| s == "NIFTY"));

    let applied_nifty = drain(&mut events).into_iter().any(|e| {
        matches!(e, ChainEvent::SnapshotApplied { ref key, .. } if key.symbol() == "NIFTY")
    });
    assert!(!applied_nifty);
}

#[tokio::test(start_paused = true)]
async fn test_manual_refresh_coalesced_while_in_flight() {
    let source = Arc::new(ScriptedSource::with_delays(&[("NIFTY", 500)]));
    let (handle, _task) = RefreshCoordinator::spawn(Arc::clone(&source), quiet_config()).unwrap();

    handle.select("NIFTY", expiry()).await.unwrap();
    handle.refresh().await.unwrap();
    handle.refresh().await.unwrap();
    handle.refresh().await.unwrap();

    tokio::time::sleep(Duration::from_millis(2_000)).await;
    assert_eq!(source.calls(), 2);

    handle.refresh().await.unwrap();
    tokio::time::sleep(Duration::from_millis(1_000)).await;
    assert_eq!(source.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_reselecting_same_key_is_noop() {
    let source = Arc::new(ScriptedSource::new());
    let (handle, _task) = RefreshCoordinator::spawn(Arc::clone(&source), quiet_config()).unwrap();

    handle.select("NIFTY 50", expiry()).await.unwrap();
    wait_for_view(&handle, "NIFTY").await;
    handle.select("nifty", expiry()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(source.calls(), 1);
    assert_eq!(handle.status().generation, 1);
    assert!(handle.current_view().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_leg_from_superseded_view_rejected() {
    let source = Arc::new(ScriptedSource::with_delays(&[("BANKNIFTY", 1_000)]));
    let (handle, _task) = RefreshCoordinator::spawn(Arc::clone(&source), quiet_config()).unwrap();

    handle.select("NIFTY", expiry()).await.unwrap();
    let view = wait_for_view(&handle, "NIFTY").await;
    let leg = handle
        .build_leg(&view, dec!(24500), OptionType::Call, Side::Buy)
        .unwrap()
        .unwrap();
    assert_eq!(leg.underlying, "NIFTY");

    // Key switch resets the view before the new snapshot arrives.
    handle.select("BANKNIFTY", expiry()).await.unwrap();
    assert!(handle.current_view().is_none());
    assert!(matches!(
        handle.build_leg(&view, dec!(24500), OptionType::Call, Side::Buy),
        Err(Error::StaleView { view: 1, current: 2 })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_scroll_target_once_per_key() {
    let source = Arc::new(ScriptedSource::new());
    let (handle, _task) = RefreshCoordinator::spawn(Arc::clone(&source), quiet_config()).unwrap();

    handle.select("NIFTY", expiry()).await.unwrap();
    wait_for_view(&handle, "NIFTY").await;
    assert_eq!(handle.take_scroll_target().await.unwrap(), Some(15));
    assert_eq!(handle.take_scroll_target().await.unwrap(), None);

    handle.select("FINNIFTY", expiry()).await.unwrap();
    wait_for_view(&handle, "FINNIFTY").await;
    assert_eq!(handle.take_scroll_target().await.unwrap(), Some(15));
}

#[tokio::test(start_paused = true)]
async fn test_cross_page_signals() {
    let source = Arc::new(ScriptedSource::new());
    let (handle, _task) = RefreshCoordinator::spawn(Arc::clone(&source), quiet_config()).unwrap();
    let mut events = handle.events().subscribe();

    let other = handle.clone();
    other.events().publish_orders_updated();
    other.events().publish_positions_updated();

    assert_eq!(events.recv().await.unwrap(), ChainEvent::OrdersUpdated);
    assert_eq!(events.recv().await.unwrap(), ChainEvent::PositionsUpdated);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown() {
    let source = Arc::new(ScriptedSource::new());
    let (handle, task) = RefreshCoordinator::spawn(Arc::clone(&source), quiet_config()).unwrap();

    handle.shutdown().await.unwrap();
    task.await.unwrap();
    assert!(matches!(handle.refresh().await, Err(Error::CoordinatorClosed)));
}

#[test]
fn test_spawn_rejects_invalid_config() {
    let config = EngineConfig {
        window_size: 0,
        ..EngineConfig::default()
    };
    let result = RefreshCoordinator::spawn(ScriptedSource::new(), config);
    assert!(matches!(result, Err(Error::InvalidConfig(_))));
}
