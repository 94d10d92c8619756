//! Core types and traits for the market data pipeline.
//!
//! This crate provides the foundational building blocks including:
//! - Daily price records and the indicator set stored alongside them
//! - Raw provider items and paged fetch results
//! - Core traits for price stores, market data sources and indicators

pub mod types;
pub mod traits;
pub mod error;

pub use error::CollectorError;
pub use types::*;
pub use traits::*;
