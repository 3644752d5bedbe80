//! HTTP price oracle over public market-data APIs.
//!
//! Coin prices try CryptoCompare (only with an API key), then Binance's
//! `<SYMBOL>USDT` ticker, then CoinGecko. Market caps come from the first
//! DexScreener pair for the token address. A source that fails or returns
//! nothing usable falls through to the next one. Each request gets a slice
//! of the observation budget so the whole chain fits inside it.

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::dto::{
    BinanceTicker, CoinGeckoPrices, CoinGeckoSearch, CryptoComparePrice, DexScreenerTokens,
};
use super::settings::OracleConfig;
use crate::domain::{MarketKind, Price};
use crate::error::{Error, Result};
use crate::port::outbound::PriceOracle;

pub struct HttpPriceOracle {
    http: HttpClient,
    config: OracleConfig,
}

impl HttpPriceOracle {
    #[must_use]
    pub fn new(config: OracleConfig) -> Self {
        let http = HttpClient::builder()
            .timeout(config.request_timeout())
            .build()
            .unwrap_or_else(|err| {
                warn!(error = %err, "Failed to build HTTP client, using defaults");
                HttpClient::new()
            });
        Self { http, config }
    }

    async fn get_json<T>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        authorization: Option<String>,
    ) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let mut request = self.http.get(url).query(query);
        if let Some(value) = authorization {
            request = request.header(reqwest::header::AUTHORIZATION, value);
        }
        let response = request.send().await?.error_for_status()?;
        Ok(response.json::<T>().await?)
    }

    /// Latest USD price for a coin symbol.
    pub async fn coin_price(&self, symbol: &str) -> Result<Price> {
        let symbol = symbol.trim().to_ascii_uppercase();

        if self.config.cryptocompare_api_key.is_some() {
            match self.cryptocompare(&symbol).await {
                Ok(Some(price)) => return Ok(price),
                Ok(None) => debug!(symbol = %symbol, "CryptoCompare returned no price"),
                Err(e) => debug!(symbol = %symbol, error = %e, "CryptoCompare failed"),
            }
        }

        match self.binance(&symbol).await {
            Ok(Some(price)) => return Ok(price),
            Ok(None) => debug!(symbol = %symbol, "Binance returned no price"),
            Err(e) => debug!(symbol = %symbol, error = %e, "Binance failed"),
        }

        match self.coingecko(&symbol).await {
            Ok(Some(price)) => Ok(price),
            Ok(None) => Err(Error::Oracle(format!("no price source knows {symbol}"))),
            Err(e) => Err(Error::Oracle(format!("all price sources failed for {symbol}: {e}"))),
        }
    }

    /// Market capitalisation of a token by address.
    pub async fn market_cap(&self, token_ref: &str) -> Result<Price> {
        let url = format!(
            "{}/latest/dex/tokens/{}",
            self.config.dexscreener_url,
            token_ref.trim()
        );
        let tokens: DexScreenerTokens = self.get_json(&url, &[], None).await?;
        tokens
            .pairs
            .and_then(|pairs| pairs.into_iter().next())
            .and_then(|pair| pair.market_cap)
            .ok_or_else(|| Error::Oracle(format!("no trading pairs for {token_ref}")))
    }

    async fn cryptocompare(&self, symbol: &str) -> Result<Option<Price>> {
        let url = format!("{}/data/price", self.config.cryptocompare_url);
        let auth = self
            .config
            .cryptocompare_api_key
            .as_ref()
            .map(|key| format!("Apikey {key}"));
        let body: CryptoComparePrice = self
            .get_json(&url, &[("fsym", symbol), ("tsyms", "USD")], auth)
            .await?;
        Ok(body.usd.filter(|p| *p > Decimal::ZERO))
    }

    async fn binance(&self, symbol: &str) -> Result<Option<Price>> {
        let url = format!("{}/api/v3/ticker/price", self.config.binance_url);
        let pair = format!("{symbol}USDT");
        let ticker: BinanceTicker = self.get_json(&url, &[("symbol", pair.as_str())], None).await?;
        Ok(Some(ticker.price).filter(|p| *p > Decimal::ZERO))
    }

    async fn coingecko(&self, symbol: &str) -> Result<Option<Price>> {
        let search_url = format!("{}/api/v3/search", self.config.coingecko_url);
        let search: CoinGeckoSearch = self
            .get_json(&search_url, &[("query", symbol)], None)
            .await?;
        let Some(coin) = search
            .coins
            .into_iter()
            .find(|c| c.symbol.eq_ignore_ascii_case(symbol))
        else {
            return Ok(None);
        };

        let price_url = format!("{}/api/v3/simple/price", self.config.coingecko_url);
        let prices: CoinGeckoPrices = self
            .get_json(
                &price_url,
                &[("ids", coin.id.as_str()), ("vs_currencies", "usd")],
                None,
            )
            .await?;
        Ok(prices
            .get(&coin.id)
            .and_then(|by_currency| by_currency.get("usd"))
            .copied()
            .filter(|p| *p > Decimal::ZERO))
    }
}

#[async_trait]
impl PriceOracle for HttpPriceOracle {
    fn name(&self) -> &str {
        "http"
    }

    async fn observed_value(&self, market: &MarketKind) -> Result<Price> {
        match market {
            MarketKind::FixedPrice { symbol } => self.coin_price(symbol).await,
            MarketKind::MarketCap { token_ref } => self.market_cap(token_ref).await,
            MarketKind::Custom => Err(Error::Oracle("custom markets have no price feed".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn custom_markets_are_never_observed() {
        let oracle = HttpPriceOracle::new(OracleConfig::default());
        let err = oracle.observed_value(&MarketKind::Custom).await.unwrap_err();
        assert!(matches!(err, Error::Oracle(_)));
    }

    #[tokio::test]
    async fn unreachable_feed_is_an_error() {
        let oracle = HttpPriceOracle::new(OracleConfig {
            timeout_ms: 200,
            dexscreener_url: "http://127.0.0.1:9".into(),
            ..OracleConfig::default()
        });
        let market = MarketKind::MarketCap {
            token_ref: "token".into(),
        };
        assert!(oracle.observed_value(&market).await.is_err());
    }
}
