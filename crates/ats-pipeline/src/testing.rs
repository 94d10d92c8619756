//! Instrumented test doubles shared by the pipeline tests.

use async_trait::async_trait;
use ats_core::error::SourceError;
use ats_core::traits::MarketDataSource;
use ats_core::types::{
    Credential, DailyPage, InvestorFlowItem, Page, RawDailyItem, RawFinancialRatioItem,
    RawFundamentalItem,
};
use chrono::{Duration as ChronoDuration, NaiveDate};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
}

pub fn credential() -> Credential {
    Credential::new("test-token").unwrap()
}

fn throttled() -> SourceError {
    SourceError::RateLimited {
        provider: "scripted".into(),
        message: "EGW00201".into(),
    }
}

/// Provider double with scripted failures, paging and an in-flight gauge.
#[derive(Default)]
pub struct ScriptedSource {
    /// Instruments that fail with a non-retryable error
    pub failing: HashSet<String>,
    /// Instruments rate limited this many times before succeeding
    pub throttle_first: HashMap<String, usize>,
    /// Pages returned per instrument for paged calls (default 1)
    pub pages: HashMap<String, usize>,
    /// (instrument, page) pairs rate limited this many times before succeeding
    pub page_throttle: HashMap<(String, usize), usize>,
    /// Instruments returning no items
    pub empty: HashSet<String>,
    /// Simulated network latency
    pub latency: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: Mutex<HashMap<String, usize>>,
    page_calls: Mutex<HashMap<(String, usize), usize>>,
    call_log: Mutex<Vec<String>>,
    continuations: Mutex<Vec<Option<String>>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn failing(mut self, code: &str) -> Self {
        self.failing.insert(code.to_string());
        self
    }

    pub fn throttled(mut self, code: &str, times: usize) -> Self {
        self.throttle_first.insert(code.to_string(), times);
        self
    }

    pub fn paged(mut self, code: &str, pages: usize) -> Self {
        self.pages.insert(code.to_string(), pages);
        self
    }

    /// Rate limit one page of `code`, counted from 0, `times` times.
    pub fn throttled_on_page(mut self, code: &str, page: usize, times: usize) -> Self {
        self.page_throttle.insert((code.to_string(), page), times);
        self
    }

    pub fn empty(mut self, code: &str) -> Self {
        self.empty.insert(code.to_string());
        self
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self, code: &str) -> usize {
        self.calls.lock().unwrap().get(code).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    /// Instrument of every call, in the order calls started.
    pub fn call_log(&self) -> Vec<String> {
        self.call_log.lock().unwrap().clone()
    }

    pub fn continuations(&self) -> Vec<Option<String>> {
        self.continuations.lock().unwrap().clone()
    }

    /// Track one call and apply the scripted outcome for `code`.
    async fn enter(&self, code: &str) -> Result<(), SourceError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let call = {
            let mut calls = self.calls.lock().unwrap();
            let entry = calls.entry(code.to_string()).or_insert(0);
            *entry += 1;
            *entry
        };
        self.call_log.lock().unwrap().push(code.to_string());

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(code) {
            return Err(SourceError::Provider {
                provider: "scripted".into(),
                status: 500,
                message: "internal error".into(),
            });
        }
        if call <= self.throttle_first.get(code).copied().unwrap_or(0) {
            return Err(throttled());
        }
        Ok(())
    }

    /// Page number of a continuation key, with the per-page throttle applied.
    fn page(&self, code: &str, continuation: Option<&str>) -> Result<usize, SourceError> {
        let page_no: usize = continuation.and_then(|k| k.parse().ok()).unwrap_or(0);
        let key = (code.to_string(), page_no);
        let call = {
            let mut calls = self.page_calls.lock().unwrap();
            let entry = calls.entry(key.clone()).or_insert(0);
            *entry += 1;
            *entry
        };
        if call <= self.page_throttle.get(&key).copied().unwrap_or(0) {
            return Err(throttled());
        }
        Ok(page_no)
    }

    fn continues(&self, code: &str, page_no: usize) -> bool {
        page_no + 1 < self.pages.get(code).copied().unwrap_or(1)
    }

    fn items(&self, code: &str, end: NaiveDate, count: i64) -> Vec<RawDailyItem> {
        if self.empty.contains(code) {
            return vec![];
        }
        (0..count)
            .map(|offset| {
                let date = end - ChronoDuration::days(offset);
                RawDailyItem {
                    date: date.format("%Y%m%d").to_string(),
                    open: Some("+1,000".into()),
                    high: Some("+1,100".into()),
                    low: Some("-900".into()),
                    close: Some(format!("+{}", 1000 + offset)),
                    volume: Some("1,000".into()),
                    turnover: Some("1".into()),
                    change_rate: Some("+0.10".into()),
                    individual_net: None,
                    institution_net: None,
                    foreign_net: None,
                }
            })
            .collect()
    }
}

#[async_trait]
impl MarketDataSource for ScriptedSource {
    async fn fetch_daily_series(
        &self,
        _credential: &Credential,
        instrument: &str,
        date: NaiveDate,
        continuation: Option<&str>,
    ) -> Result<DailyPage, SourceError> {
        self.continuations
            .lock()
            .unwrap()
            .push(continuation.map(str::to_string));
        self.enter(instrument).await?;
        let page_no = self.page(instrument, continuation)?;

        // One item per page, walking back one day per page.
        let page_date = date - ChronoDuration::days(page_no as i64);
        let has_more = self.continues(instrument, page_no);

        Ok(DailyPage {
            items: self.items(instrument, page_date, 1),
            has_more,
            next_key: has_more.then(|| (page_no + 1).to_string()),
        })
    }

    async fn fetch_period_series(
        &self,
        _credential: &Credential,
        instrument: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawDailyItem>, SourceError> {
        self.enter(instrument).await?;
        let count = (end - start).num_days() + 1;
        Ok(self.items(instrument, end, count))
    }

    async fn fetch_investor_flow(
        &self,
        _credential: &Credential,
        instrument: &str,
        date: NaiveDate,
    ) -> Result<Vec<InvestorFlowItem>, SourceError> {
        self.enter(instrument).await?;
        if self.empty.contains(instrument) {
            return Ok(vec![]);
        }
        Ok(vec![
            InvestorFlowItem {
                date: date.format("%Y%m%d").to_string(),
                change_rate: Some("-1.50".into()),
                individual_net: Some("+12,000".into()),
                institution_net: Some("-7,000".into()),
                foreign_net: Some("-5,000".into()),
            },
            InvestorFlowItem {
                date: (date - ChronoDuration::days(1)).format("%Y%m%d").to_string(),
                change_rate: Some("0.30".into()),
                individual_net: Some("1".into()),
                institution_net: Some("1".into()),
                foreign_net: Some("1".into()),
            },
        ])
    }

    async fn fetch_fundamentals(
        &self,
        _credential: &Credential,
        instrument: &str,
        continuation: Option<&str>,
    ) -> Result<Page<RawFundamentalItem>, SourceError> {
        self.enter(instrument).await?;
        let page_no = self.page(instrument, continuation)?;
        let has_more = self.continues(instrument, page_no);

        // PER grows by one per page so the kept page is visible.
        let items = if self.empty.contains(instrument) {
            vec![]
        } else {
            vec![RawFundamentalItem {
                market_cap: Some("4,310,000".into()),
                volume: Some("11,234,567".into()),
                per: Some(format!("{}.5", 10 + page_no)),
                roe: Some("".into()),
                ..Default::default()
            }]
        };
        Ok(Page {
            items,
            has_more,
            next_key: has_more.then(|| (page_no + 1).to_string()),
        })
    }

    async fn fetch_financial_ratios(
        &self,
        _credential: &Credential,
        instrument: &str,
    ) -> Result<Vec<RawFinancialRatioItem>, SourceError> {
        self.enter(instrument).await?;
        if self.empty.contains(instrument) {
            return Ok(vec![]);
        }
        Ok(vec![
            RawFinancialRatioItem {
                period: "202312".into(),
                revenue_growth: Some("-14.33".into()),
                debt_ratio: Some("25.36".into()),
                ..Default::default()
            },
            RawFinancialRatioItem {
                period: "202212".into(),
                revenue_growth: Some("8.09".into()),
                debt_ratio: Some("26.41".into()),
                ..Default::default()
            },
            RawFinancialRatioItem {
                period: " ".into(),
                ..Default::default()
            },
        ])
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
