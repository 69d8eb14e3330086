//! Integration tests for the derivation pipeline.

use crate::common::{expiry, ladder};
use chrono::Utc;
use option_chain_window::chain::{
    AtmAnchor, ChainSnapshot, ChainView, ExchangeSegment, LegContext, LegQuote, OptionType,
    Side, StrikeQuote, SymbolResolver, closest_index, compute_atm, derive_rows, select_window,
};
use option_chain_window::config::EngineConfig;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

fn derive(snapshot: &ChainSnapshot, name: &str) -> ChainView {
    let config = EngineConfig::default();
    let context = LegContext::resolve(&SymbolResolver::new(&config), name, expiry());
    let mut anchor = AtmAnchor::new();
    anchor.observe(snapshot);
    ChainView::derive(context, 1, snapshot, &anchor, &config, Utc::now())
}

#[test]
fn test_small_universe_is_not_windowed() {
    let snapshot = ladder(dec!(24485), dec!(50), 24000, 20, 50);
    let view = derive(&snapshot, "NIFTY");

    assert_eq!(view.atm(), Some(dec!(24500)));
    assert_eq!(view.rows().len(), 20);
    assert_eq!(view.rows()[0].strike, dec!(24000));
    assert_eq!(view.rows()[19].strike, dec!(24950));
    assert_eq!(view.atm_index(), Some(10));
}

#[test]
fn test_large_universe_window_is_centered() {
    let snapshot = ladder(dec!(24485), dec!(50), 23000, 50, 50);
    let view = derive(&snapshot, "NIFTY");

    assert_eq!(view.atm(), Some(dec!(24500)));
    assert_eq!(view.rows().len(), 31);
    assert_eq!(view.rows()[0].strike, dec!(23750));
    assert_eq!(view.rows()[30].strike, dec!(25250));
    assert_eq!(view.rows()[15].strike, dec!(24500));
    assert!(view.rows()[15].is_atm);
}

#[test]
fn test_no_price_no_interval() {
    let snapshot = ladder(dec!(0), dec!(0), 23000, 50, 50);
    let view = derive(&snapshot, "NIFTY");

    assert_eq!(view.atm(), None);
    assert_eq!(view.rows().len(), 50);
    assert!(view.rows().iter().all(|r| !r.is_atm));
}

#[test]
fn test_price_without_interval_uses_nearest_strike() {
    let snapshot = ladder(dec!(24488), dec!(0), 23000, 50, 50);
    let view = derive(&snapshot, "NIFTY");

    assert_eq!(view.atm(), Some(dec!(24500)));
    assert_eq!(view.rows().len(), 31);
}

#[test]
fn test_row_count_matches_strikes() {
    for count in [0, 1, 7, 31, 32, 100] {
        let snapshot = ladder(dec!(24485), dec!(50), 23000, count, 50);
        let rows = derive_rows(&snapshot, Some(dec!(24500)), 1);
        assert_eq!(rows.len(), snapshot.strike_count());
        assert_eq!(rows.len() as i64, count);
    }
}

#[test]
fn test_window_size_property() {
    let window_size = 31;
    for count in [1_i64, 5, 30, 31, 32, 45, 80] {
        let snapshot = ladder(dec!(0), dec!(0), 1000, count, 10);
        let rows = derive_rows(&snapshot, None, 1);
        let sorted: Vec<Decimal> = rows.iter().map(|r| r.strike).collect();

        for probe in [dec!(0), dec!(1000), dec!(1234), dec!(1500), dec!(99999)] {
            let window = select_window(&rows, Some(probe), window_size);
            assert_eq!(window.len(), (count as usize).min(window_size));

            let first = sorted.iter().position(|s| *s == window[0].strike).unwrap();
            let strikes: Vec<Decimal> = window.iter().map(|r| r.strike).collect();
            assert_eq!(strikes, sorted[first..first + window.len()].to_vec());

            let nearest = sorted[closest_index(&sorted, probe).unwrap()];
            assert!(strikes.contains(&nearest), "{nearest} missing for probe {probe}");
        }
    }
}

#[test]
fn test_atm_within_half_interval() {
    let interval = dec!(50);
    for cents in (2_400_000..2_410_000).step_by(1_337) {
        let price = Decimal::new(cents, 2);
        let atm = compute_atm(price, interval, None).unwrap();
        assert!((atm - price).abs() <= interval / dec!(2));
        assert_eq!(atm % interval, Decimal::ZERO);
    }
}

#[test]
fn test_legs_from_parsed_snapshot() {
    let raw = r#"{
        "underlying_ltp": 81520.4,
        "strike_interval": 100,
        "lot_size": 20,
        "strikes": {
            "81400": { "CE": { "ltp": 410.5, "bid": 410, "ask": 411, "token": 1001 },
                       "PE": { "ltp": 250, "bid": 249.5, "ask": 250.5, "token": 1002 } },
            "81500": { "CE": { "ltp": 350, "bid": 349, "ask": 351, "token": 1003,
                               "depth": { "bids": [[349, 40]] } },
                       "PE": { "ltp": 0, "bid": 0, "ask": 0, "token": 1004 } },
            "81600": { "CE": { "ltp": 300, "token": 1005 } }
        }
    }"#;
    let snapshot = ChainSnapshot::from_json_str(raw).unwrap();
    let view = derive(&snapshot, "BSE SENSEX");

    assert_eq!(view.atm(), Some(dec!(81500)));
    assert_eq!(view.lot_size(), 20);

    let leg = view
        .build_leg(dec!(81500), OptionType::Call, Side::Sell)
        .unwrap();
    assert_eq!(leg.underlying, "SENSEX");
    assert_eq!(leg.exchange_segment, ExchangeSegment::BseFno);
    assert_eq!(leg.security_id.as_deref(), Some("1003"));
    assert_eq!(leg.ltp, dec!(350));
    assert!(leg.depth.is_some());
    assert_eq!(leg.expiry, "2025-10-30");

    // Zero premium: the action is unavailable.
    assert!(view.build_leg(dec!(81500), OptionType::Put, Side::Buy).is_none());
    // Missing PE side at 81600 defaults to no quote.
    assert!(view.build_leg(dec!(81600), OptionType::Put, Side::Buy).is_none());
}

#[test]
fn test_leg_snapshot_at_click() {
    let first = derive(&ladder(dec!(24485), dec!(50), 23000, 50, 50), "NIFTY");
    let leg = first
        .build_leg(dec!(24500), OptionType::Call, Side::Buy)
        .unwrap();

    // Next refresh: the 24500 call trades elsewhere with a new token and depth.
    let mut repriced = LegQuote::new(dec!(140), dec!(139), dec!(141)).with_token("90001");
    repriced.depth = Some(json!({ "bids": [[139, 25]] }));
    let next = ladder(dec!(24485), dec!(50), 23000, 50, 50)
        .with_strike(dec!(24500), StrikeQuote::new(repriced, LegQuote::default()));
    let second = derive(&next, "NIFTY");

    assert_eq!(leg.ltp, dec!(100));
    assert_eq!(leg.bid, dec!(99.5));
    assert_eq!(leg.ask, dec!(100.5));
    assert_eq!(leg.security_id.as_deref(), Some("40030"));
    assert!(leg.depth.is_none());

    let fresh = second
        .build_leg(dec!(24500), OptionType::Call, Side::Buy)
        .unwrap();
    assert_eq!(fresh.ltp, dec!(140));
    assert_eq!(fresh.bid, dec!(139));
    assert_eq!(fresh.ask, dec!(141));
    assert_eq!(fresh.security_id.as_deref(), Some("90001"));
    assert_eq!(fresh.depth, Some(json!({ "bids": [[139, 25]] })));
    assert_ne!(leg, fresh);
}
