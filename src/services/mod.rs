//! External market data integrations.

pub mod binance;
pub mod market_data;

pub use binance::BinanceRestClient;
pub use market_data::KlineSource;
