//! Technical indicators for daily closing prices.
//!
//! This crate provides the indicators behind the stored indicator set:
//! - Moving averages (SMA, EMA seeded with the first close)
//! - Momentum indicators (RSI over simple averages, MACD with signal line)
//! - The `IndicatorEngine`, which turns one price history into an `IndicatorSet`

pub mod engine;
pub mod momentum;
pub mod moving_average;

pub use engine::{IndicatorEngine, MIN_HISTORY};
pub use momentum::{Macd, MacdOutput, Rsi};
pub use moving_average::{Ema, Sma};
