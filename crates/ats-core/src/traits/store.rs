//! Price store trait definition.

use crate::error::StoreError;
use crate::types::{CrossType, DailyPriceRecord, FinancialRatio, Fundamental, IndicatorSet};
use async_trait::async_trait;
use chrono::NaiveDate;

/// Durable store of daily price records keyed by (instrument, date).
///
/// The pipeline relies on single-row write atomicity only; rows for
/// different instruments never contend.
#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Records for one instrument within `[start, end]`, ascending by date.
    async fn find_existing_records(
        &self,
        instrument: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyPriceRecord>, StoreError>;

    /// Insert or replace records by key in one call.
    async fn save_all(&self, records: Vec<DailyPriceRecord>) -> Result<(), StoreError>;

    /// Up to `limit` records at or before `as_of`, newest first.
    async fn find_recent_history(
        &self,
        instrument: &str,
        as_of: NaiveDate,
        limit: usize,
    ) -> Result<Vec<DailyPriceRecord>, StoreError>;

    /// Codes of instruments in the universe with no record on `date`.
    async fn find_instruments_with_gap(&self, date: NaiveDate) -> Result<Vec<String>, StoreError>;

    /// Codes of every instrument in the universe.
    async fn find_all_instruments(&self) -> Result<Vec<String>, StoreError>;

    /// Every record on `date`.
    async fn find_instruments_with_data(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<DailyPriceRecord>, StoreError>;

    /// Codes of instruments with a record on `date` whose investor flow is unset.
    async fn find_instruments_missing_flow(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<String>, StoreError>;

    /// The record for one key.
    async fn find_record(
        &self,
        instrument: &str,
        date: NaiveDate,
    ) -> Result<Option<DailyPriceRecord>, StoreError>;

    /// Replace the whole indicator set of one record.
    async fn save_indicators(
        &self,
        instrument: &str,
        date: NaiveDate,
        indicators: IndicatorSet,
    ) -> Result<(), StoreError>;

    /// Records on `date` carrying the given cross type.
    async fn find_by_cross_type(
        &self,
        date: NaiveDate,
        cross_type: CrossType,
    ) -> Result<Vec<DailyPriceRecord>, StoreError>;

    /// Codes of instruments whose fundamentals were not refreshed on or
    /// after `date`.
    async fn find_instruments_missing_fundamentals(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<String>, StoreError>;

    /// Insert or replace the fundamentals of one instrument.
    async fn save_fundamental(&self, fundamental: Fundamental) -> Result<(), StoreError>;

    async fn find_fundamental(&self, instrument: &str) -> Result<Option<Fundamental>, StoreError>;

    /// Insert or replace ratios by (instrument, period) in one call.
    async fn save_financial_ratios(&self, ratios: Vec<FinancialRatio>) -> Result<(), StoreError>;

    /// All stored periods for one instrument, newest first.
    async fn find_financial_ratios(
        &self,
        instrument: &str,
    ) -> Result<Vec<FinancialRatio>, StoreError>;

    /// Whether a record exists for one key.
    async fn exists(&self, instrument: &str, date: NaiveDate) -> Result<bool, StoreError> {
        Ok(self.find_record(instrument, date).await?.is_some())
    }
}
