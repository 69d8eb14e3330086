//! Error types for the option chain window engine.
//!
//! All fallible operations return [`Result<T>`]. Resolution of unknown
//! underlyings, missing prices and empty chains are not errors; they are
//! modelled with `Option` and empty collections by the callers.

use rust_decimal::Decimal;
use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the engine.
#[derive(Debug, Error)]
pub enum Error {
    /// The snapshot payload is structurally invalid.
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// JSON decoding failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The snapshot collaborator failed to deliver a chain.
    #[error("fetch failed for {key}: {message}")]
    Fetch {
        /// The `(symbol, expiry)` key being fetched.
        key: String,
        /// Displayable failure message.
        message: String,
    },

    /// The requested strike is not part of the chain.
    #[error("strike not found: {strike}")]
    StrikeNotFound {
        /// The missing strike.
        strike: Decimal,
    },

    /// No data is available to answer the request.
    #[error("no data available: {0}")]
    NoDataAvailable(String),

    /// An expiry string could not be parsed.
    #[error("invalid expiry: {0}")]
    InvalidExpiry(String),

    /// The engine configuration is invalid.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A leg was requested against a view that is no longer current.
    #[error("stale view: generation {view} superseded by {current}")]
    StaleView {
        /// Generation of the view the caller holds.
        view: u64,
        /// Generation currently in effect.
        current: u64,
    },

    /// The refresh coordinator task has stopped.
    #[error("refresh coordinator closed")]
    CoordinatorClosed,
}

impl Error {
    /// Creates an [`Error::InvalidSnapshot`].
    pub fn invalid_snapshot(msg: impl Into<String>) -> Self {
        Self::InvalidSnapshot(msg.into())
    }

    /// Creates an [`Error::Fetch`] for the given key.
    pub fn fetch(key: impl ToString, message: impl Into<String>) -> Self {
        Self::Fetch {
            key: key.to_string(),
            message: message.into(),
        }
    }

    /// Creates an [`Error::StrikeNotFound`].
    #[must_use]
    pub const fn strike_not_found(strike: Decimal) -> Self {
        Self::StrikeNotFound { strike }
    }

    /// Creates an [`Error::NoDataAvailable`].
    pub fn no_data(msg: impl Into<String>) -> Self {
        Self::NoDataAvailable(msg.into())
    }

    /// Creates an [`Error::InvalidExpiry`].
    pub fn invalid_expiry(msg: impl Into<String>) -> Self {
        Self::InvalidExpiry(msg.into())
    }

    /// Creates an [`Error::InvalidConfig`].
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
