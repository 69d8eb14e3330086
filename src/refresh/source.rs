//! Snapshot source abstraction.

use crate::chain::{ChainKey, ChainSnapshot};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Supplies complete chain snapshots for a `(symbol, expiry)` key.
///
/// Implementations own transport and caching. Every successful fetch must
/// return a complete snapshot; the coordinator never merges partial ones.
/// Failures should be reported as `Error::Fetch` with a displayable message.
#[async_trait]
pub trait ChainSource: Send + Sync + 'static {
    /// Fetches the current snapshot for `key`.
    async fn fetch(&self, key: &ChainKey) -> Result<ChainSnapshot>;
}

#[async_trait]
impl<T: ChainSource + ?Sized> ChainSource for Arc<T> {
    async fn fetch(&self, key: &ChainKey) -> Result<ChainSnapshot> {
        (**self).fetch(key).await
    }
}
