//! Response bodies of the public price APIs.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Deserialize;

/// CryptoCompare `/data/price?fsym=X&tsyms=USD`.
#[derive(Debug, Deserialize)]
pub struct CryptoComparePrice {
    #[serde(rename = "USD")]
    pub usd: Option<Decimal>,
}

/// Binance `/api/v3/ticker/price`.
#[derive(Debug, Deserialize)]
pub struct BinanceTicker {
    pub price: Decimal,
}

/// CoinGecko `/api/v3/search`.
#[derive(Debug, Deserialize)]
pub struct CoinGeckoSearch {
    #[serde(default)]
    pub coins: Vec<CoinGeckoCoin>,
}

#[derive(Debug, Deserialize)]
pub struct CoinGeckoCoin {
    pub id: String,
    pub symbol: String,
}

/// CoinGecko `/api/v3/simple/price`, keyed by coin id then currency.
pub type CoinGeckoPrices = HashMap<String, HashMap<String, Decimal>>;

/// DexScreener `/latest/dex/tokens/{address}`.
#[derive(Debug, Deserialize)]
pub struct DexScreenerTokens {
    #[serde(default)]
    pub pairs: Option<Vec<DexScreenerPair>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DexScreenerPair {
    #[serde(default)]
    pub market_cap: Option<Decimal>,
    #[serde(default)]
    pub price_usd: Option<Decimal>,
}
