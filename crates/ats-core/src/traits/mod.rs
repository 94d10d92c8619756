//! Core traits for the market data pipeline.

mod data_source;
mod indicator;
mod store;

pub use data_source::MarketDataSource;
pub use indicator::{Indicator, MultiOutputIndicator};
pub use store::PriceStore;
