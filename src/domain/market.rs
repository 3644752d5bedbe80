//! Market specifications: what observable a room is betting on.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// The observable a room resolves against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarketKind {
    /// Spot price of a listed asset (e.g. `SOL`).
    FixedPrice {
        /// Ticker symbol.
        symbol: String,
    },
    /// Market capitalisation of a token identified by its mint/contract address.
    MarketCap {
        /// Token address.
        token_ref: String,
    },
    /// Manually resolved market; never settled by an oracle.
    Custom,
}

impl MarketKind {
    /// Stable storage tag.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::FixedPrice { .. } => "FIXED_PRICE",
            Self::MarketCap { .. } => "MARKET_CAP",
            Self::Custom => "CUSTOM",
        }
    }

    /// Symbol or token address, if any.
    #[must_use]
    pub fn reference(&self) -> Option<&str> {
        match self {
            Self::FixedPrice { symbol } => Some(symbol),
            Self::MarketCap { token_ref } => Some(token_ref),
            Self::Custom => None,
        }
    }

    /// Threshold kinds can be settled early once the target is reached.
    #[must_use]
    pub const fn supports_early_resolution(&self) -> bool {
        !matches!(self, Self::Custom)
    }

    /// Rebuild a market kind from its storage tag and reference.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidMarket`] for unknown tags or a missing
    /// reference on threshold kinds.
    pub fn from_parts(label: &str, reference: Option<&str>) -> Result<Self, DomainError> {
        let reference = reference.map(str::trim).filter(|r| !r.is_empty());
        match (label.to_ascii_uppercase().as_str(), reference) {
            ("FIXED_PRICE", Some(symbol)) => Ok(Self::FixedPrice {
                symbol: symbol.to_ascii_uppercase(),
            }),
            ("MARKET_CAP", Some(token_ref)) => Ok(Self::MarketCap {
                token_ref: token_ref.to_string(),
            }),
            ("CUSTOM", _) => Ok(Self::Custom),
            ("FIXED_PRICE" | "MARKET_CAP", None) => Err(DomainError::InvalidMarket(format!(
                "{label} requires a symbol or token address"
            ))),
            (other, _) => Err(DomainError::InvalidMarket(format!(
                "unknown market kind '{other}'"
            ))),
        }
    }
}

impl fmt::Display for MarketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FixedPrice { symbol } => write!(f, "{symbol} price"),
            Self::MarketCap { token_ref } => write!(f, "{token_ref} market cap"),
            Self::Custom => f.write_str("custom"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_custom_markets_need_an_admin() {
        assert!(MarketKind::FixedPrice { symbol: "SOL".into() }.supports_early_resolution());
        assert!(MarketKind::MarketCap { token_ref: "abc".into() }.supports_early_resolution());
        assert!(!MarketKind::Custom.supports_early_resolution());
    }

    #[test]
    fn from_parts_restores_stored_kinds() {
        let kind = MarketKind::FixedPrice { symbol: "BTC".into() };
        let restored = MarketKind::from_parts(kind.label(), kind.reference()).unwrap();
        assert_eq!(restored, kind);

        assert_eq!(
            MarketKind::from_parts("fixed_price", Some("sol")).unwrap(),
            MarketKind::FixedPrice { symbol: "SOL".into() }
        );
        assert_eq!(MarketKind::from_parts("CUSTOM", None).unwrap(), MarketKind::Custom);
    }

    #[test]
    fn from_parts_rejects_missing_reference() {
        assert!(MarketKind::from_parts("MARKET_CAP", None).is_err());
        assert!(MarketKind::from_parts("MARKET_CAP", Some("  ")).is_err());
        assert!(MarketKind::from_parts("LOTTERY", Some("x")).is_err());
    }
}
