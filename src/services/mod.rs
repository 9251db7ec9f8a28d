//! External collaborators: market data and brokerage.

pub mod alpaca;
pub mod brokerage;
pub mod market_data;
pub mod polygon;
mod rest;

pub use alpaca::AlpacaClient;
pub use brokerage::{AccountSource, FlattenSummary, OrderSink};
pub use market_data::QuoteSource;
pub use polygon::PolygonClient;
