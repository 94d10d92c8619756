//! Batch pipeline: rate-limited collection, indicator runs and ranking.

pub mod collector;
pub mod indicator_runner;
pub mod ranking;
pub mod retry;

#[cfg(test)]
mod testing;

pub use collector::{upsert_series, CollectorConfig, RateLimitedBatchCollector, UpsertSummary};
pub use indicator_runner::{IndicatorBatchRunner, IndicatorRunnerConfig};
pub use ranking::{buy_candidates, sell_candidates, CANDIDATE_LIMIT};
pub use retry::RetryPolicy;
