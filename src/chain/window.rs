//! Chain window selection.
//!
//! Reduces the full strike universe to a contiguous, fixed-size range of
//! strikes centered on the ATM strike, so the cost of rendering and
//! re-deriving a chain does not grow with the number of listed strikes.

use super::rows::DisplayStrikeRow;
use rust_decimal::Decimal;
use std::ops::RangeInclusive;

/// Returns the index of `target` in `sorted`, or of the closest value.
///
/// Ties resolve to the first (lower) index. `None` if `sorted` is empty.
#[must_use]
pub fn closest_index(sorted: &[Decimal], target: Decimal) -> Option<usize> {
    if let Ok(index) = sorted.binary_search(&target) {
        return Some(index);
    }
    sorted
        .iter()
        .enumerate()
        .min_by(|(ia, a), (ib, b)| {
            (**a - target)
                .abs()
                .cmp(&(**b - target).abs())
                .then_with(|| ia.cmp(ib))
        })
        .map(|(index, _)| index)
}

/// Computes the inclusive index range of the window within `sorted`.
///
/// The window starts `window_size / 2` entries before the ATM index and is
/// shifted back inside the universe when it would run past either end, so
/// it is exactly `window_size` wide unless the universe is smaller. A
/// `window_size` of zero is treated as one.
#[must_use]
pub fn window_bounds(
    sorted: &[Decimal],
    atm: Decimal,
    window_size: usize,
) -> Option<RangeInclusive<usize>> {
    let center = closest_index(sorted, atm)?;
    let size = window_size.max(1);
    let last = sorted.len() - 1;

    let mut start = center.saturating_sub(size / 2);
    let mut end = start + size - 1;
    if end > last {
        end = last;
        start = (end + 1).saturating_sub(size);
    }
    Some(start..=end)
}

/// Selects the display window from `rows`.
///
/// - Empty input yields an empty window.
/// - Without an ATM strike the rows are returned unmodified.
/// - When the universe fits in the window every row is returned, sorted.
/// - Otherwise the rows whose strike lies within [`window_bounds`] are
///   returned in ascending strike order.
#[must_use]
pub fn select_window(
    rows: &[DisplayStrikeRow],
    atm: Option<Decimal>,
    window_size: usize,
) -> Vec<DisplayStrikeRow> {
    if rows.is_empty() {
        return Vec::new();
    }
    let Some(atm) = atm else {
        return rows.to_vec();
    };

    let mut sorted: Vec<Decimal> = rows.iter().map(|r| r.strike).collect();
    sorted.sort_unstable();
    sorted.dedup();

    let mut selected: Vec<DisplayStrikeRow> = if sorted.len() <= window_size.max(1) {
        rows.to_vec()
    } else {
        match window_bounds(&sorted, atm, window_size) {
            Some(range) => {
                let (lo, hi) = (sorted[*range.start()], sorted[*range.end()]);
                rows.iter()
                    .filter(|r| r.strike >= lo && r.strike <= hi)
                    .cloned()
                    .collect()
            }
            None => rows.to_vec(),
        }
    };
    selected.sort_by(|a, b| a.strike.cmp(&b.strike));
    selected
}

/// Returns the scroll target for a window: the index of the ATM row.
///
/// Uses the row flagged `is_atm`; if none is flagged, the row closest to
/// `atm`. `None` when there is no ATM or the window is empty.
#[must_use]
pub fn atm_row_index(window: &[DisplayStrikeRow], atm: Option<Decimal>) -> Option<usize> {
    let atm = atm?;
    window.iter().position(|r| r.is_atm).or_else(|| {
        let strikes: Vec<Decimal> = window.iter().map(|r| r.strike).collect();
        closest_index(&strikes, atm)
    })
}
