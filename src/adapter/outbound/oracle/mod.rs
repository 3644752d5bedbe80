//! Price oracle adapters.

mod dto;
pub mod feed;
pub mod settings;

pub use feed::HttpPriceOracle;
pub use settings::OracleConfig;
