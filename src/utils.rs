//! Utility functions for the option-chain-window library.

use crate::error::{Error, Result};
use chrono::NaiveDate;

/// Parses an expiry in `YYYY-MM-DD` format.
///
/// # Errors
///
/// Returns `Error::InvalidExpiry` if the string is not a valid calendar date.
///
/// # Examples
///
/// ```rust
/// use option_chain_window::utils::parse_expiry;
///
/// let expiry = parse_expiry("2025-10-30").unwrap();
/// assert_eq!(expiry.to_string(), "2025-10-30");
/// ```
pub fn parse_expiry(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| Error::invalid_expiry(format!("{raw}: {e}")))
}

/// Formats an expiry as `YYYY-MM-DD`, the shape the order collaborator expects.
#[must_use]
pub fn format_expiry(expiry: NaiveDate) -> String {
    expiry.format("%Y-%m-%d").to_string()
}

/// Formats an expiry as a short contract label, e.g. `30 OCT`.
#[must_use]
pub fn format_expiry_label(expiry: NaiveDate) -> String {
    expiry.format("%d %b").to_string().to_uppercase()
}
