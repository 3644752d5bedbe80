//! Price oracle port.

use async_trait::async_trait;

use crate::domain::{MarketKind, Price};
use crate::error::Result;

/// A source of observed values for market kinds.
///
/// Implementations may fail for any reason (network, empty response, unknown
/// symbol). Callers treat failures and non-positive values as unresolvable.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Current value of the market's observable.
    async fn observed_value(&self, market: &MarketKind) -> Result<Price>;
}
