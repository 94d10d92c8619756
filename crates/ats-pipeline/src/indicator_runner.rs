//! Per-date indicator computation across every instrument with data.

use ats_core::error::CollectorError;
use ats_core::traits::PriceStore;
use ats_core::types::{closes, CollectionOutcome};
use ats_indicators::{IndicatorEngine, MIN_HISTORY};
use chrono::NaiveDate;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

/// Indicator batch settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorRunnerConfig {
    /// Instruments processed concurrently before the next chunk starts
    pub chunk_size: usize,
    /// Rows read per instrument, newest first
    pub history_limit: usize,
    /// Fewer rows than this is a skip
    pub min_history: usize,
}

impl Default for IndicatorRunnerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 100,
            history_limit: 100,
            min_history: MIN_HISTORY,
        }
    }
}

/// Fans the indicator engine out over all instruments with a record on a date.
pub struct IndicatorBatchRunner {
    store: Arc<dyn PriceStore>,
    engine: IndicatorEngine,
    config: IndicatorRunnerConfig,
}

impl IndicatorBatchRunner {
    pub fn new(store: Arc<dyn PriceStore>, config: IndicatorRunnerConfig) -> Self {
        let config = IndicatorRunnerConfig {
            chunk_size: config.chunk_size.max(1),
            ..config
        };
        Self {
            store,
            engine: IndicatorEngine::with_min_history(config.min_history),
            config,
        }
    }

    /// Compute and persist indicators for every instrument with data on `date`.
    ///
    /// Instruments are processed in chunks; each chunk runs concurrently and
    /// finishes before the next one starts. Per-instrument failures are
    /// logged and counted.
    pub async fn compute_indicators(
        &self,
        date: NaiveDate,
    ) -> Result<CollectionOutcome, CollectorError> {
        let span = info_span!("indicators", run_id = %Uuid::new_v4(), %date);
        self.compute_for_date(date).instrument(span).await
    }

    /// Run [`Self::compute_indicators`] for each calendar day in `[start, end]`,
    /// one day after another.
    pub async fn compute_indicators_for_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<CollectionOutcome, CollectorError> {
        if start > end {
            return Err(CollectorError::Validation(format!(
                "start {} is after end {}",
                start, end
            )));
        }

        let mut total = CollectionOutcome::empty();
        for date in start.iter_days().take_while(|d| *d <= end) {
            let outcome = self.compute_indicators(date).await?;
            total.absorb(&outcome);
        }

        info!(
            %start,
            %end,
            succeeded = total.succeeded,
            failed = total.failed,
            skipped = total.skipped,
            "Indicator range complete"
        );
        Ok(total)
    }

    /// Start a range run in the background and return immediately.
    ///
    /// Progress is only observable through logs.
    pub fn spawn_range(self: Arc<Self>, start: NaiveDate, end: NaiveDate) -> JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(e) = self.compute_indicators_for_range(start, end).await {
                error!(%start, %end, error = %e, "Indicator run failed");
            }
        })
    }

    async fn compute_for_date(&self, date: NaiveDate) -> Result<CollectionOutcome, CollectorError> {
        let started = Instant::now();
        let codes: Vec<String> = self
            .store
            .find_instruments_with_data(date)
            .await?
            .into_iter()
            .map(|record| record.instrument_code)
            .collect();

        let mut outcome = CollectionOutcome {
            attempted: codes.len(),
            ..CollectionOutcome::empty()
        };

        for chunk in codes.chunks(self.config.chunk_size) {
            let results = join_all(chunk.iter().map(|code| self.compute_one(code, date))).await;

            for (code, result) in chunk.iter().zip(results) {
                match result {
                    Ok(true) => outcome.succeeded += 1,
                    Ok(false) => outcome.skipped += 1,
                    Err(e) => {
                        outcome.failed += 1;
                        error!(instrument = %code, error = %e, "Indicator computation failed");
                    }
                }
            }
        }

        outcome.elapsed = started.elapsed();
        info!(
            attempted = outcome.attempted,
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            skipped = outcome.skipped,
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "Indicators complete"
        );
        Ok(outcome)
    }

    /// `Ok(false)` when the history is too short.
    async fn compute_one(&self, instrument: &str, date: NaiveDate) -> Result<bool, CollectorError> {
        let mut history = self
            .store
            .find_recent_history(instrument, date, self.config.history_limit)
            .await?;

        if history.len() < self.config.min_history {
            debug!(instrument = %instrument, rows = history.len(), "Insufficient history");
            return Ok(false);
        }

        history.reverse();
        let indicators = self.engine.compute(&closes(&history))?;
        self.store.save_indicators(instrument, date, indicators).await?;
        Ok(true)
    }
}
