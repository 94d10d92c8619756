//! Rate-limited batch collection across the instrument universe.

use ats_core::error::{CollectorError, SourceError};
use ats_core::traits::{MarketDataSource, PriceStore};
use ats_core::types::{
    CollectionOutcome, Credential, InvestorFlowItem, OutcomeCounters, Page, RawDailyItem,
    RawFinancialRatioItem, RawFundamentalItem,
};
use ats_data::normalize::{self, parse_date, parse_optional_decimal, parse_quantity};
use ats_data::SeriesMerger;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, info_span, trace, warn, Instrument};
use uuid::Uuid;

use crate::retry::RetryPolicy;

/// Collector tuning for one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Concurrency permits, kept below the provider's throttling threshold
    pub max_concurrency: usize,
    /// Throttling retry and pacing
    pub retry: RetryPolicy,
    /// Pause between consecutive pages of one instrument
    pub page_delay: Duration,
    /// Hard ceiling on pages per instrument
    pub max_pages: usize,
}

impl CollectorConfig {
    /// Defaults for the Kiwoom daily series.
    pub fn kiwoom() -> Self {
        Self {
            max_concurrency: 10,
            retry: RetryPolicy::default(),
            page_delay: Duration::from_millis(50),
            max_pages: 20,
        }
    }

    /// Defaults for KIS, which throttles harder.
    pub fn kis() -> Self {
        Self {
            max_concurrency: 5,
            retry: RetryPolicy::default().with_success_delay(Duration::from_millis(200)),
            ..Self::kiwoom()
        }
    }

    /// Defaults for the Kiwoom basic information sweep: a wide fan-out with
    /// a short pause after each instrument.
    pub fn kiwoom_fundamentals() -> Self {
        Self {
            max_concurrency: 20,
            retry: RetryPolicy::default().with_success_delay(Duration::from_millis(50)),
            ..Self::kiwoom()
        }
    }

    /// Defaults for KIS financial ratios: four permits, each held a full
    /// second after a success.
    pub fn kis_financial_ratio() -> Self {
        Self {
            max_concurrency: 4,
            retry: RetryPolicy {
                max_attempts: 3,
                backoff: Duration::from_millis(2000),
                success_delay: Duration::from_millis(1000),
            },
            ..Self::kis()
        }
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self::kiwoom()
    }
}

/// Lifecycle of one instrument inside a batch, reported at trace level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InstrumentState {
    Pending,
    PermitAcquired,
    Fetching,
    Success,
    Skipped,
    Failed,
    PermitReleased,
}

/// Terminal result of one instrument task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskResult {
    Success,
    Skipped,
}

#[derive(Debug, Clone, Copy)]
enum Job {
    /// Paged daily series ending at a date
    Daily { date: NaiveDate },
    /// One period series call per instrument
    Period { start: NaiveDate, end: NaiveDate },
    /// Investor flow for records already stored on a date
    InvestorFlow { date: NaiveDate },
    /// Paged valuation figures, stamped with the refresh date
    Fundamentals { date: NaiveDate },
    /// Every reported period of financial ratios
    FinancialRatio,
}

impl Job {
    fn label(&self) -> &'static str {
        match self {
            Job::Daily { .. } => "daily",
            Job::Period { .. } => "period",
            Job::InvestorFlow { .. } => "investor_flow",
            Job::Fundamentals { .. } => "fundamentals",
            Job::FinancialRatio => "financial_ratio",
        }
    }
}

/// Counts of one upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpsertSummary {
    pub inserted: usize,
    pub updated: usize,
}

/// Normalise, merge and persist one instrument's fetched items.
///
/// Existing rows for the batch's date span are read in a single query and
/// written back in a single bulk save. Returns `None` when nothing was
/// persisted; the store is not touched for an empty batch.
pub async fn upsert_series(
    store: &dyn PriceStore,
    instrument: &str,
    items: &[RawDailyItem],
) -> Result<Option<UpsertSummary>, CollectorError> {
    let normalized = SeriesMerger::normalize(instrument, items);
    let Some((start, end)) = SeriesMerger::date_span(&normalized) else {
        return Ok(None);
    };

    let existing = store.find_existing_records(instrument, start, end).await?;
    let output = SeriesMerger::merge(instrument, normalized, existing);
    let summary = UpsertSummary {
        inserted: output.inserted,
        updated: output.updated,
    };

    store.save_all(output.records).await?;
    Ok(Some(summary))
}

/// Per-task context. Cloned into every spawned instrument task.
#[derive(Clone)]
struct Worker {
    store: Arc<dyn PriceStore>,
    source: Arc<dyn MarketDataSource>,
    config: CollectorConfig,
    credential: Credential,
}

impl Worker {
    async fn process(&self, job: Job, instrument: &str) -> Result<TaskResult, CollectorError> {
        let retry = self.config.retry;
        match job {
            Job::Daily { date } => {
                let items = self
                    .walk_pages(instrument, move |key| async move {
                        self.source
                            .fetch_daily_series(&self.credential, instrument, date, key.as_deref())
                            .await
                    })
                    .await?;
                self.persist(instrument, &items).await
            }
            Job::Period { start, end } => {
                let items = retry
                    .run(instrument, move |_| {
                        self.source
                            .fetch_period_series(&self.credential, instrument, start, end)
                    })
                    .await?;
                self.persist(instrument, &items).await
            }
            Job::InvestorFlow { date } => {
                let items = retry
                    .run(instrument, move |_| {
                        self.source
                            .fetch_investor_flow(&self.credential, instrument, date)
                    })
                    .await?;
                self.apply_investor_flow(instrument, date, items).await
            }
            Job::Fundamentals { date } => {
                let items = self
                    .walk_pages(instrument, move |key| async move {
                        self.source
                            .fetch_fundamentals(&self.credential, instrument, key.as_deref())
                            .await
                    })
                    .await?;
                self.save_fundamental(instrument, date, items).await
            }
            Job::FinancialRatio => {
                let items = retry
                    .run(instrument, move |_| {
                        self.source.fetch_financial_ratios(&self.credential, instrument)
                    })
                    .await?;
                self.save_financial_ratios(instrument, items).await
            }
        }
    }

    /// Follow continuation keys until the provider reports no more pages
    /// or the page ceiling is hit. A throttled page is retried on its own
    /// key; pages already fetched are kept.
    async fn walk_pages<T, F, Fut>(
        &self,
        instrument: &str,
        mut fetch: F,
    ) -> Result<Vec<T>, SourceError>
    where
        F: FnMut(Option<String>) -> Fut,
        Fut: Future<Output = Result<Page<T>, SourceError>>,
    {
        let mut items = Vec::new();
        let mut continuation: Option<String> = None;
        let mut pages = 0;

        loop {
            let page = self
                .config
                .retry
                .run(instrument, |_| fetch(continuation.clone()))
                .await?;
            pages += 1;

            let next = page.continuation().map(str::to_string);
            items.extend(page.items);

            match next {
                Some(key) if pages < self.config.max_pages => {
                    tokio::time::sleep(self.config.page_delay).await;
                    continuation = Some(key);
                }
                Some(_) => {
                    warn!(instrument = %instrument, pages, "Page ceiling reached");
                    break;
                }
                None => break,
            }
        }

        debug!(instrument = %instrument, pages, items = items.len(), "Fetched pages");
        Ok(items)
    }

    async fn persist(
        &self,
        instrument: &str,
        items: &[RawDailyItem],
    ) -> Result<TaskResult, CollectorError> {
        match upsert_series(self.store.as_ref(), instrument, items).await? {
            Some(summary) => {
                debug!(
                    instrument = %instrument,
                    inserted = summary.inserted,
                    updated = summary.updated,
                    "Merged series"
                );
                Ok(TaskResult::Success)
            }
            None => Ok(TaskResult::Skipped),
        }
    }

    async fn apply_investor_flow(
        &self,
        instrument: &str,
        date: NaiveDate,
        items: Vec<InvestorFlowItem>,
    ) -> Result<TaskResult, CollectorError> {
        let Some(item) = items
            .into_iter()
            .find(|item| parse_date(&item.date).ok() == Some(date))
        else {
            warn!(instrument = %instrument, %date, "No investor flow for date");
            return Ok(TaskResult::Skipped);
        };

        if item
            .individual_net
            .as_deref()
            .map_or(true, |v| v.trim().is_empty())
        {
            warn!(instrument = %instrument, %date, "Investor flow is blank");
            return Ok(TaskResult::Skipped);
        }

        let Some(mut record) = self.store.find_record(instrument, date).await? else {
            return Ok(TaskResult::Skipped);
        };

        record.change_rate = parse_optional_decimal(item.change_rate.as_deref()).or(record.change_rate);
        record.individual_net = parse_quantity(item.individual_net.as_deref());
        record.institution_net = parse_quantity(item.institution_net.as_deref());
        record.foreign_net = parse_quantity(item.foreign_net.as_deref());

        self.store.save_all(vec![record]).await?;
        Ok(TaskResult::Success)
    }

    /// Keep the last page's figures; earlier pages are superseded.
    async fn save_fundamental(
        &self,
        instrument: &str,
        date: NaiveDate,
        items: Vec<RawFundamentalItem>,
    ) -> Result<TaskResult, CollectorError> {
        let Some(item) = items.iter().rev().find(|item| !item.is_blank()) else {
            warn!(instrument = %instrument, "No fundamentals returned");
            return Ok(TaskResult::Skipped);
        };

        self.store
            .save_fundamental(normalize::fundamental(instrument, date, item))
            .await?;
        Ok(TaskResult::Success)
    }

    async fn save_financial_ratios(
        &self,
        instrument: &str,
        items: Vec<RawFinancialRatioItem>,
    ) -> Result<TaskResult, CollectorError> {
        let ratios: Vec<_> = items
            .iter()
            .filter_map(|item| normalize::financial_ratio(instrument, item))
            .collect();
        if ratios.is_empty() {
            warn!(instrument = %instrument, "No financial ratios returned");
            return Ok(TaskResult::Skipped);
        }

        debug!(instrument = %instrument, periods = ratios.len(), "Saving financial ratios");
        self.store.save_financial_ratios(ratios).await?;
        Ok(TaskResult::Success)
    }
}

/// Drives fetch and merge for many instruments from one provider.
///
/// One task is spawned per instrument; a semaphore caps how many hold a
/// permit at once. A task keeps its permit through every retry and the
/// post-success delay. Failures are counted, never propagated to sibling
/// tasks. Dropping the returned future aborts all outstanding tasks.
pub struct RateLimitedBatchCollector {
    store: Arc<dyn PriceStore>,
    source: Arc<dyn MarketDataSource>,
    config: CollectorConfig,
    permits: Arc<Semaphore>,
}

impl RateLimitedBatchCollector {
    /// Create a collector. A zero concurrency setting is raised to one.
    pub fn new(
        store: Arc<dyn PriceStore>,
        source: Arc<dyn MarketDataSource>,
        mut config: CollectorConfig,
    ) -> Self {
        config.max_concurrency = config.max_concurrency.max(1);
        let permits = Arc::new(Semaphore::new(config.max_concurrency));
        Self {
            store,
            source,
            config,
            permits,
        }
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Collect the paged daily series for every instrument missing `date`.
    pub async fn collect_all(
        &self,
        date: NaiveDate,
        credential: &Credential,
    ) -> Result<CollectionOutcome, CollectorError> {
        let worklist = self.store.find_instruments_with_gap(date).await?;
        Ok(self.run_batch(Job::Daily { date }, worklist, credential).await)
    }

    /// Collect the period series for `[start, end]`.
    ///
    /// A single-day period only visits instruments missing that day; a real
    /// range is a backfill over the whole universe.
    pub async fn collect_period(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        credential: &Credential,
    ) -> Result<CollectionOutcome, CollectorError> {
        if start > end {
            return Err(CollectorError::Validation(format!(
                "start {} is after end {}",
                start, end
            )));
        }

        let worklist = if start == end {
            self.store.find_instruments_with_gap(start).await?
        } else {
            self.store.find_all_instruments().await?
        };
        Ok(self
            .run_batch(Job::Period { start, end }, worklist, credential)
            .await)
    }

    /// Fill investor flow into records on `date` that lack it.
    pub async fn collect_investor_flow(
        &self,
        date: NaiveDate,
        credential: &Credential,
    ) -> Result<CollectionOutcome, CollectorError> {
        let worklist = self.store.find_instruments_missing_flow(date).await?;
        Ok(self
            .run_batch(Job::InvestorFlow { date }, worklist, credential)
            .await)
    }

    /// Refresh valuation figures for every instrument not yet refreshed on
    /// `date`.
    pub async fn collect_fundamentals(
        &self,
        date: NaiveDate,
        credential: &Credential,
    ) -> Result<CollectionOutcome, CollectorError> {
        let worklist = self.store.find_instruments_missing_fundamentals(date).await?;
        Ok(self
            .run_batch(Job::Fundamentals { date }, worklist, credential)
            .await)
    }

    /// Fetch the financial ratios of the whole universe.
    pub async fn collect_financial_ratios(
        &self,
        credential: &Credential,
    ) -> Result<CollectionOutcome, CollectorError> {
        let worklist = self.store.find_all_instruments().await?;
        Ok(self
            .run_batch(Job::FinancialRatio, worklist, credential)
            .await)
    }

    async fn run_batch(
        &self,
        job: Job,
        worklist: Vec<String>,
        credential: &Credential,
    ) -> CollectionOutcome {
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "batch",
            %run_id,
            provider = %self.source.name(),
            job = job.label()
        );

        self.fan_out(job, worklist, credential).instrument(span).await
    }

    async fn fan_out(
        &self,
        job: Job,
        worklist: Vec<String>,
        credential: &Credential,
    ) -> CollectionOutcome {
        let started = Instant::now();
        let attempted = worklist.len();

        if attempted == 0 {
            info!("Nothing to collect");
            return CollectionOutcome::empty();
        }

        info!(
            instruments = attempted,
            max_concurrency = self.config.max_concurrency,
            "Starting batch"
        );

        let counters = Arc::new(OutcomeCounters::new());
        let worker = Worker {
            store: Arc::clone(&self.store),
            source: Arc::clone(&self.source),
            config: self.config.clone(),
            credential: credential.clone(),
        };

        let mut tasks = JoinSet::new();
        for instrument in worklist {
            let worker = worker.clone();
            let permits = Arc::clone(&self.permits);
            let counters = Arc::clone(&counters);

            tasks.spawn(
                async move {
                    trace!(instrument = %instrument, state = ?InstrumentState::Pending);
                    let permit = match permits.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => {
                            counters.record_failure();
                            return;
                        }
                    };
                    trace!(instrument = %instrument, state = ?InstrumentState::PermitAcquired);
                    trace!(instrument = %instrument, state = ?InstrumentState::Fetching);

                    match worker.process(job, &instrument).await {
                        Ok(TaskResult::Success) => {
                            counters.record_success();
                            trace!(instrument = %instrument, state = ?InstrumentState::Success);
                            if !worker.config.retry.success_delay.is_zero() {
                                tokio::time::sleep(worker.config.retry.success_delay).await;
                            }
                        }
                        Ok(TaskResult::Skipped) => {
                            counters.record_skip();
                            trace!(instrument = %instrument, state = ?InstrumentState::Skipped);
                        }
                        Err(e) => {
                            counters.record_failure();
                            error!(instrument = %instrument, error = %e, "Instrument failed");
                            trace!(instrument = %instrument, state = ?InstrumentState::Failed);
                        }
                    }

                    drop(permit);
                    trace!(instrument = %instrument, state = ?InstrumentState::PermitReleased);
                }
                .in_current_span(),
            );
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                counters.record_failure();
                error!(error = %e, "Instrument task aborted");
            }
        }

        let outcome = counters.snapshot(attempted, started.elapsed());
        info!(
            attempted = outcome.attempted,
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            skipped = outcome.skipped,
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "Batch complete"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{credential, day, ScriptedSource};
    use ats_core::types::{DailyPriceRecord, IndicatorSet, Instrument, Market};
    use ats_data::InMemoryPriceStore;
    use rust_decimal_macros::dec;

    fn universe(n: usize) -> Vec<Instrument> {
        (0..n)
            .map(|i| Instrument::new(format!("{:06}", i), format!("Instrument {}", i), Market::Kospi))
            .collect()
    }

    fn fast_config(max_concurrency: usize) -> CollectorConfig {
        CollectorConfig {
            max_concurrency,
            retry: RetryPolicy {
                max_attempts: 3,
                backoff: Duration::from_millis(5),
                success_delay: Duration::ZERO,
            },
            page_delay: Duration::from_millis(1),
            max_pages: 20,
        }
    }

    fn collector(
        store: &Arc<InMemoryPriceStore>,
        source: &Arc<ScriptedSource>,
        config: CollectorConfig,
    ) -> RateLimitedBatchCollector {
        RateLimitedBatchCollector::new(store.clone(), source.clone(), config)
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let store = Arc::new(InMemoryPriceStore::with_instruments(universe(10)));
        let source = Arc::new(
            ScriptedSource::new()
                .failing("000002")
                .failing("000005")
                .failing("000007"),
        );

        let outcome = collector(&store, &source, fast_config(4))
            .collect_all(day(4), &credential())
            .await
            .unwrap();

        assert_eq!(outcome.attempted, 10);
        assert_eq!(outcome.succeeded, 7);
        assert_eq!(outcome.failed, 3);
        assert_eq!(store.len().await, 7);
        // non-retryable errors are tried once
        assert_eq!(source.calls("000002"), 1);
    }

    #[tokio::test]
    async fn test_concurrency_ceiling_is_respected() {
        let store = Arc::new(InMemoryPriceStore::with_instruments(universe(40)));
        let source = Arc::new(ScriptedSource::new().with_latency(Duration::from_millis(10)));

        let outcome = collector(&store, &source, fast_config(4))
            .collect_all(day(4), &credential())
            .await
            .unwrap();

        assert_eq!(outcome.succeeded, 40);
        assert!(source.max_in_flight() <= 4, "saw {}", source.max_in_flight());
        assert!(source.max_in_flight() >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_retried_with_backoff() {
        let store = Arc::new(InMemoryPriceStore::with_instruments(universe(3)));
        let source = Arc::new(
            ScriptedSource::new()
                .throttled("000000", 2)
                .throttled("000001", 3),
        );
        let mut config = CollectorConfig::kis();
        config.page_delay = Duration::ZERO;

        let outcome = collector(&store, &source, config)
            .collect_all(day(4), &credential())
            .await
            .unwrap();

        // recovered on the third attempt
        assert_eq!(source.calls("000000"), 3);
        // still throttled after three attempts
        assert_eq!(source.calls("000001"), 3);
        assert_eq!(outcome.succeeded, 2);
        assert_eq!(outcome.failed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permit_held_through_backoff() {
        let store = Arc::new(InMemoryPriceStore::with_instruments(universe(2)));
        let source = Arc::new(ScriptedSource::new().throttled("000000", 2));
        let mut config = CollectorConfig::kis();
        config.max_concurrency = 1;

        let outcome = collector(&store, &source, config)
            .collect_all(day(4), &credential())
            .await
            .unwrap();

        assert_eq!(outcome.succeeded, 2);
        let log = source.call_log();
        assert_eq!(log.len(), 4);
        // the throttled instrument's attempts run back to back
        let first = log.iter().position(|code| code == "000000").unwrap();
        assert!(log[first..first + 3].iter().all(|code| code == "000000"), "{:?}", log);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_batch_stops_outstanding_calls() {
        let store = Arc::new(InMemoryPriceStore::with_instruments(universe(6)));
        let source = Arc::new(ScriptedSource::new().with_latency(Duration::from_secs(1)));
        let batch = collector(&store, &source, fast_config(2));

        let cut_short = tokio::time::timeout(
            Duration::from_millis(1500),
            batch.collect_all(day(4), &credential()),
        )
        .await;
        assert!(cut_short.is_err());

        let started = source.total_calls();
        assert!(started < 6, "all {} calls started", started);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(source.total_calls(), started);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttled_page_retried_on_its_own_key() {
        let store = Arc::new(InMemoryPriceStore::with_instruments(universe(1)));
        let source = Arc::new(
            ScriptedSource::new()
                .paged("000000", 3)
                .throttled_on_page("000000", 1, 1),
        );

        let outcome = collector(&store, &source, fast_config(1))
            .collect_all(day(10), &credential())
            .await
            .unwrap();

        assert_eq!(outcome.succeeded, 1);
        assert_eq!(
            source.continuations(),
            vec![
                None,
                Some("1".to_string()),
                Some("1".to_string()),
                Some("2".to_string())
            ]
        );
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn test_pages_accumulate_into_one_merge() {
        let store = Arc::new(InMemoryPriceStore::with_instruments(universe(1)));
        let source = Arc::new(ScriptedSource::new().paged("000000", 3));

        let outcome = collector(&store, &source, fast_config(2))
            .collect_all(day(10), &credential())
            .await
            .unwrap();

        assert_eq!(outcome.succeeded, 1);
        assert_eq!(
            source.continuations(),
            vec![None, Some("1".to_string()), Some("2".to_string())]
        );
        let stored = store
            .find_existing_records("000000", day(8), day(10))
            .await
            .unwrap();
        assert_eq!(stored.len(), 3);
    }

    #[tokio::test]
    async fn test_page_ceiling() {
        let store = Arc::new(InMemoryPriceStore::with_instruments(universe(1)));
        let source = Arc::new(ScriptedSource::new().paged("000000", 50));
        let mut config = fast_config(1);
        config.max_pages = 5;

        collector(&store, &source, config)
            .collect_all(day(20), &credential())
            .await
            .unwrap();

        assert_eq!(source.calls("000000"), 5);
        assert_eq!(store.len().await, 5);
    }

    #[tokio::test]
    async fn test_daily_run_only_visits_gaps() {
        let store = Arc::new(InMemoryPriceStore::with_instruments(universe(3)));
        store
            .save_all(vec![DailyPriceRecord::new("000001", day(4))])
            .await
            .unwrap();
        let source = Arc::new(ScriptedSource::new());

        let outcome = collector(&store, &source, fast_config(2))
            .collect_all(day(4), &credential())
            .await
            .unwrap();

        assert_eq!(outcome.attempted, 2);
        assert_eq!(source.calls("000001"), 0);
    }

    #[tokio::test]
    async fn test_period_backfill_preserves_indicators() {
        let store = Arc::new(InMemoryPriceStore::with_instruments(universe(2)));
        let mut stored = DailyPriceRecord::new("000000", day(4));
        stored.indicators = Some(IndicatorSet {
            rsi14: Some(dec!(55.55)),
            ..Default::default()
        });
        store.save_all(vec![stored]).await.unwrap();
        let source = Arc::new(ScriptedSource::new());

        let outcome = collector(&store, &source, fast_config(2))
            .collect_period(day(1), day(5), &credential())
            .await
            .unwrap();

        // a range visits the whole universe, stored rows included
        assert_eq!(outcome.attempted, 2);
        assert_eq!(outcome.succeeded, 2);
        assert_eq!(store.len().await, 10);

        let record = store.find_record("000000", day(4)).await.unwrap().unwrap();
        assert_eq!(record.close, dec!(1001));
        assert_eq!(record.indicators.unwrap().rsi14, Some(dec!(55.55)));
    }

    #[tokio::test]
    async fn test_period_rejects_inverted_range() {
        let store = Arc::new(InMemoryPriceStore::new());
        let source = Arc::new(ScriptedSource::new());

        let err = collector(&store, &source, fast_config(1))
            .collect_period(day(5), day(1), &credential())
            .await
            .unwrap_err();
        assert!(matches!(err, CollectorError::Validation(_)));
    }

    #[tokio::test]
    async fn test_empty_fetch_is_skipped() {
        let store = Arc::new(InMemoryPriceStore::with_instruments(universe(2)));
        let source = Arc::new(ScriptedSource::new().empty("000001"));

        let outcome = collector(&store, &source, fast_config(2))
            .collect_all(day(4), &credential())
            .await
            .unwrap();

        assert_eq!(outcome.succeeded, 1);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.failed, 0);
    }

    #[tokio::test]
    async fn test_empty_worklist() {
        let store = Arc::new(InMemoryPriceStore::new());
        let source = Arc::new(ScriptedSource::new());

        let outcome = collector(&store, &source, fast_config(2))
            .collect_all(day(4), &credential())
            .await
            .unwrap();

        assert_eq!(outcome, CollectionOutcome::empty());
    }

    #[tokio::test]
    async fn test_investor_flow_fills_missing_records() {
        let store = Arc::new(InMemoryPriceStore::with_instruments(universe(3)));
        let mut complete = DailyPriceRecord::new("000002", day(4));
        complete.individual_net = Some(1);
        complete.institution_net = Some(1);
        complete.foreign_net = Some(1);
        store
            .save_all(vec![
                DailyPriceRecord::new("000000", day(4)),
                DailyPriceRecord::new("000001", day(4)),
                complete,
            ])
            .await
            .unwrap();
        let source = Arc::new(ScriptedSource::new().empty("000001"));

        let outcome = collector(&store, &source, fast_config(2))
            .collect_investor_flow(day(4), &credential())
            .await
            .unwrap();

        assert_eq!(outcome.attempted, 2);
        assert_eq!(outcome.succeeded, 1);
        assert_eq!(outcome.skipped, 1);

        let record = store.find_record("000000", day(4)).await.unwrap().unwrap();
        assert_eq!(record.individual_net, Some(12000));
        assert_eq!(record.institution_net, Some(-7000));
        assert_eq!(record.foreign_net, Some(-5000));
        assert_eq!(record.change_rate, Some(dec!(-1.50)));
        assert_eq!(source.calls("000002"), 0);
    }

    #[tokio::test]
    async fn test_fundamentals_keep_last_page() {
        let store = Arc::new(InMemoryPriceStore::with_instruments(universe(3)));
        store
            .save_fundamental(normalize::fundamental(
                "000001",
                day(4),
                &RawFundamentalItem::default(),
            ))
            .await
            .unwrap();
        let source = Arc::new(ScriptedSource::new().paged("000000", 2).empty("000002"));

        let outcome = collector(&store, &source, fast_config(4))
            .collect_fundamentals(day(4), &credential())
            .await
            .unwrap();

        // refreshed today already
        assert_eq!(source.calls("000001"), 0);
        assert_eq!(outcome.attempted, 2);
        assert_eq!(outcome.succeeded, 1);
        assert_eq!(outcome.skipped, 1);

        let saved = store.find_fundamental("000000").await.unwrap().unwrap();
        assert_eq!(saved.as_of, day(4));
        assert_eq!(saved.per, Some(dec!(11.5)));
        assert_eq!(saved.market_cap, Some(dec!(4310000)));
        assert_eq!(saved.roe, None);
        assert!(store.find_fundamental("000002").await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_financial_ratios_for_whole_universe() {
        let store = Arc::new(InMemoryPriceStore::with_instruments(universe(3)));
        let source = Arc::new(ScriptedSource::new().throttled("000001", 1).empty("000002"));
        let started = tokio::time::Instant::now();

        let outcome = collector(&store, &source, CollectorConfig::kis_financial_ratio())
            .collect_financial_ratios(&credential())
            .await
            .unwrap();

        assert_eq!(outcome.attempted, 3);
        assert_eq!(outcome.succeeded, 2);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(source.calls("000001"), 2);
        // one 2s backoff plus the 1s hold after success
        assert!(started.elapsed() >= Duration::from_millis(3000));

        let ratios = store.find_financial_ratios("000001").await.unwrap();
        let periods: Vec<&str> = ratios.iter().map(|r| r.period.as_str()).collect();
        assert_eq!(periods, vec!["202312", "202212"]);
        assert_eq!(ratios[0].debt_ratio, Some(dec!(25.36)));
    }

    #[test]
    fn test_batch_presets() {
        let fundamentals = CollectorConfig::kiwoom_fundamentals();
        assert_eq!(fundamentals.max_concurrency, 20);
        assert_eq!(fundamentals.retry.success_delay, Duration::from_millis(50));
        assert_eq!(fundamentals.page_delay, Duration::from_millis(50));

        let ratios = CollectorConfig::kis_financial_ratio();
        assert_eq!(ratios.max_concurrency, 4);
        assert_eq!(ratios.retry.backoff, Duration::from_millis(2000));
        assert_eq!(ratios.retry.success_delay, Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn test_upsert_series_empty_batch() {
        let store = InMemoryPriceStore::new();
        let summary = upsert_series(&store, "005930", &[]).await.unwrap();

        assert!(summary.is_none());
        assert!(store.is_empty().await);
    }
}
