//! Benchmarks for option-chain-window library.
//!
//! This module provides benchmarks for the derivation pipeline:
//!
//! - **atm_bench**: ATM arithmetic and nearest-strike fallback
//! - **window_bench**: Window selection over growing strike universes
//! - **view_bench**: Full snapshot-to-view derivation and leg building


use criterion::{criterion_group, criterion_main};

// ATM resolution benchmarks
criterion_group!(
    atm_benches,
    atm_bench::atm_operations,
    atm_bench::nearest_strike_scaling,
);

// Window selection benchmarks
criterion_group!(
    window_benches,
    window_bench::window_operations,
    window_bench::window_scaling,
);

// View derivation benchmarks
criterion_group!(
    view_benches,
    view_bench::view_operations,
    view_bench::view_scaling,
);

criterion_main!(atm_benches, window_benches, view_benches);
