//! Price feed configuration.

use std::time::Duration;

use serde::Deserialize;

/// Longest chain of sequential requests one price lookup can make:
/// CryptoCompare, Binance, then CoinGecko search and price.
pub const PRICE_REQUESTS: u64 = 4;

/// `[oracle]` section: resolver timings and feed endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OracleConfig {
    /// Budget for one observation across every fallback source, in
    /// milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Delay before the single retry on the instant-target path.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_cryptocompare_url")]
    pub cryptocompare_url: String,
    #[serde(default = "default_binance_url")]
    pub binance_url: String,
    #[serde(default = "default_coingecko_url")]
    pub coingecko_url: String,
    #[serde(default = "default_dexscreener_url")]
    pub dexscreener_url: String,
    /// CryptoCompare key. Populated from `CRYPTOCOMPARE_API_KEY`, never from
    /// the file.
    #[serde(skip)]
    pub cryptocompare_api_key: Option<String>,
}

const fn default_timeout_ms() -> u64 {
    4_000
}

const fn default_retry_delay_ms() -> u64 {
    500
}

fn default_cryptocompare_url() -> String {
    "https://min-api.cryptocompare.com".into()
}

fn default_binance_url() -> String {
    "https://api.binance.com".into()
}

fn default_coingecko_url() -> String {
    "https://api.coingecko.com".into()
}

fn default_dexscreener_url() -> String {
    "https://api.dexscreener.com".into()
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            retry_delay_ms: default_retry_delay_ms(),
            cryptocompare_url: default_cryptocompare_url(),
            binance_url: default_binance_url(),
            coingecko_url: default_coingecko_url(),
            dexscreener_url: default_dexscreener_url(),
            cryptocompare_api_key: None,
        }
    }
}

impl OracleConfig {
    /// Timeout for a single HTTP request. A source that hangs leaves the
    /// rest of the observation budget to the sources after it.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis((self.timeout_ms / PRICE_REQUESTS).max(1))
    }
}
