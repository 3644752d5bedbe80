//! Oracle resolution with bounded calls.
//!
//! Every observation is wrapped in a timeout; a slow feed counts as a
//! failure for this cycle instead of stalling the caller's pass. Failures and
//! non-positive values never decide a side.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::debug;

use crate::domain::{MarketKind, Price, Resolution, Room, Side};
use crate::port::outbound::PriceOracle;

/// Timeouts for oracle calls.
#[derive(Debug, Clone, Copy)]
pub struct OracleSettings {
    pub timeout: Duration,
    pub retry_delay: Duration,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(4000),
            retry_delay: Duration::from_millis(500),
        }
    }
}

/// Turns oracle observations into verdicts.
pub struct OracleResolver {
    oracle: Arc<dyn PriceOracle>,
    settings: OracleSettings,
}

impl OracleResolver {
    pub fn new(oracle: Arc<dyn PriceOracle>, settings: OracleSettings) -> Self {
        Self { oracle, settings }
    }

    /// One bounded observation. The error is a human-readable reason.
    pub async fn observe(&self, market: &MarketKind) -> Result<Price, String> {
        if matches!(market, MarketKind::Custom) {
            return Err("custom market requires an admin decision".into());
        }
        match tokio::time::timeout(self.settings.timeout, self.oracle.observed_value(market)).await
        {
            Err(_) => Err(format!(
                "{} timed out after {}ms",
                self.oracle.name(),
                self.settings.timeout.as_millis()
            )),
            Ok(Err(e)) => Err(format!("{}: {e}", self.oracle.name())),
            Ok(Ok(value)) if value <= Decimal::ZERO => Err(format!(
                "{} returned non-positive value {value}",
                self.oracle.name()
            )),
            Ok(Ok(value)) => Ok(value),
        }
    }

    /// Observe, retrying once after the configured delay.
    pub async fn observe_with_retry(&self, market: &MarketKind) -> Result<Price, String> {
        match self.observe(market).await {
            Ok(value) => Ok(value),
            Err(first) if !matches!(market, MarketKind::Custom) => {
                debug!(market = %market, error = %first, "Oracle observation failed, retrying");
                tokio::time::sleep(self.settings.retry_delay).await;
                self.observe(market).await
            }
            Err(reason) => Err(reason),
        }
    }

    /// Verdict for a market at `now`.
    pub async fn resolve(
        &self,
        market: &MarketKind,
        target: Price,
        target_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Resolution {
        if now < target_time {
            return Resolution::NotYetDue;
        }
        match self.observe(market).await {
            Ok(observed) => Resolution::from_observation(observed, target),
            Err(reason) => Resolution::unresolvable(reason),
        }
    }

    /// Verdict for a room at its settle time.
    pub async fn resolve_room(&self, room: &Room, now: DateTime<Utc>) -> Resolution {
        self.resolve(&room.market, room.target, room.settle_at, now)
            .await
    }

    /// Admin-supplied verdict; bypasses the data source.
    #[must_use]
    pub fn admin_resolve(&self, decision: Side) -> Resolution {
        Resolution::admin(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use parking_lot::Mutex;
    use rust_decimal_macros::dec;

    struct Scripted {
        values: Mutex<Vec<Result<Price>>>,
        delay: Duration,
    }

    impl Scripted {
        fn new(values: Vec<Result<Price>>) -> Arc<Self> {
            Arc::new(Self {
                values: Mutex::new(values),
                delay: Duration::ZERO,
            })
        }
    }

    #[async_trait]
    impl PriceOracle for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn observed_value(&self, _market: &MarketKind) -> Result<Price> {
            tokio::time::sleep(self.delay).await;
            let mut values = self.values.lock();
            if values.is_empty() {
                return Err(Error::Oracle("exhausted".into()));
            }
            values.remove(0)
        }
    }

    fn sol() -> MarketKind {
        MarketKind::FixedPrice {
            symbol: "SOL".into(),
        }
    }

    fn fast() -> OracleSettings {
        OracleSettings {
            timeout: Duration::from_millis(200),
            retry_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn decides_yes_when_target_reached() {
        let resolver = OracleResolver::new(Scripted::new(vec![Ok(dec!(201))]), fast());
        let now = Utc::now();
        let verdict = resolver.resolve(&sol(), dec!(200), now, now).await;
        assert_eq!(
            verdict,
            Resolution::Decided {
                winning_side: Side::Yes,
                observed: Some(dec!(201))
            }
        );
    }

    #[tokio::test]
    async fn not_yet_due_before_target_time() {
        let resolver = OracleResolver::new(Scripted::new(vec![Ok(dec!(500))]), fast());
        let now = Utc::now();
        let verdict = resolver
            .resolve(&sol(), dec!(200), now + ChronoDuration::minutes(1), now)
            .await;
        assert_eq!(verdict, Resolution::NotYetDue);
    }

    #[tokio::test]
    async fn zero_price_is_unresolvable() {
        let resolver = OracleResolver::new(Scripted::new(vec![Ok(dec!(0))]), fast());
        let now = Utc::now();
        let verdict = resolver.resolve(&sol(), dec!(200), now, now).await;
        assert!(matches!(verdict, Resolution::Unresolvable { .. }));
    }

    #[tokio::test]
    async fn custom_markets_are_unresolvable() {
        let resolver = OracleResolver::new(Scripted::new(vec![Ok(dec!(1))]), fast());
        let now = Utc::now();
        let verdict = resolver
            .resolve(&MarketKind::Custom, dec!(1), now, now)
            .await;
        assert!(matches!(verdict, Resolution::Unresolvable { .. }));
    }

    #[tokio::test]
    async fn slow_feed_times_out() {
        let oracle = Arc::new(Scripted {
            values: Mutex::new(vec![Ok(dec!(1))]),
            delay: Duration::from_millis(500),
        });
        let resolver = OracleResolver::new(oracle, fast());
        let err = resolver.observe(&sol()).await.unwrap_err();
        assert!(err.contains("timed out"));
    }

    #[tokio::test]
    async fn retry_recovers_from_one_failure() {
        let oracle = Scripted::new(vec![Err(Error::Oracle("flaky".into())), Ok(dec!(3050000))]);
        let resolver = OracleResolver::new(oracle, fast());
        assert_eq!(resolver.observe_with_retry(&sol()).await.unwrap(), dec!(3050000));
    }

    #[test]
    fn admin_resolution_bypasses_oracle() {
        let resolver = OracleResolver::new(Scripted::new(vec![]), fast());
        assert_eq!(resolver.admin_resolve(Side::No), Resolution::admin(Side::No));
    }
}
