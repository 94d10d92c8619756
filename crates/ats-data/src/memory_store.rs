//! In-memory price store.

use async_trait::async_trait;
use ats_core::error::StoreError;
use ats_core::traits::PriceStore;
use ats_core::types::{
    CrossType, DailyPriceRecord, FinancialRatio, Fundamental, IndicatorSet, Instrument,
};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

type RecordKey = (String, NaiveDate);

/// Price store backed by an ordered map keyed by (instrument, date).
///
/// Ordering by key makes per-instrument range reads a map range scan.
#[derive(Debug, Default)]
pub struct InMemoryPriceStore {
    instruments: RwLock<Vec<Instrument>>,
    records: RwLock<BTreeMap<RecordKey, DailyPriceRecord>>,
    fundamentals: RwLock<BTreeMap<String, Fundamental>>,
    ratios: RwLock<BTreeMap<(String, String), FinancialRatio>>,
}

impl InMemoryPriceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store over a known instrument universe.
    pub fn with_instruments(instruments: Vec<Instrument>) -> Self {
        Self {
            instruments: RwLock::new(instruments),
            ..Self::default()
        }
    }

    /// The instrument universe.
    pub async fn instruments(&self) -> Vec<Instrument> {
        self.instruments.read().await.clone()
    }

    /// Every record, ordered by (instrument, date).
    pub async fn all_records(&self) -> Vec<DailyPriceRecord> {
        self.records.read().await.values().cloned().collect()
    }

    /// Every fundamentals row, ordered by instrument.
    pub async fn all_fundamentals(&self) -> Vec<Fundamental> {
        self.fundamentals.read().await.values().cloned().collect()
    }

    /// Every financial ratio row, ordered by (instrument, period).
    pub async fn all_financial_ratios(&self) -> Vec<FinancialRatio> {
        self.ratios.read().await.values().cloned().collect()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    fn key(instrument: &str, date: NaiveDate) -> RecordKey {
        (instrument.to_string(), date)
    }
}

#[async_trait]
impl PriceStore for InMemoryPriceStore {
    async fn find_existing_records(
        &self,
        instrument: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyPriceRecord>, StoreError> {
        if start > end {
            return Ok(Vec::new());
        }
        let records = self.records.read().await;
        Ok(records
            .range(Self::key(instrument, start)..=Self::key(instrument, end))
            .map(|(_, r)| r.clone())
            .collect())
    }

    async fn save_all(&self, batch: Vec<DailyPriceRecord>) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        for record in batch {
            records.insert(Self::key(&record.instrument_code, record.trading_date), record);
        }
        Ok(())
    }

    async fn find_recent_history(
        &self,
        instrument: &str,
        as_of: NaiveDate,
        limit: usize,
    ) -> Result<Vec<DailyPriceRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .range(Self::key(instrument, NaiveDate::MIN)..=Self::key(instrument, as_of))
            .rev()
            .take(limit)
            .map(|(_, r)| r.clone())
            .collect())
    }

    async fn find_instruments_with_gap(&self, date: NaiveDate) -> Result<Vec<String>, StoreError> {
        let instruments = self.instruments.read().await;
        let records = self.records.read().await;
        Ok(instruments
            .iter()
            .filter(|i| !records.contains_key(&Self::key(&i.code, date)))
            .map(|i| i.code.clone())
            .collect())
    }

    async fn find_all_instruments(&self) -> Result<Vec<String>, StoreError> {
        Ok(self
            .instruments
            .read()
            .await
            .iter()
            .map(|i| i.code.clone())
            .collect())
    }

    async fn find_instruments_with_data(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<DailyPriceRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|r| r.trading_date == date)
            .cloned()
            .collect())
    }

    async fn find_instruments_missing_flow(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<String>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|r| r.trading_date == date && !r.has_investor_flow())
            .map(|r| r.instrument_code.clone())
            .collect())
    }

    async fn find_record(
        &self,
        instrument: &str,
        date: NaiveDate,
    ) -> Result<Option<DailyPriceRecord>, StoreError> {
        Ok(self.records.read().await.get(&Self::key(instrument, date)).cloned())
    }

    async fn save_indicators(
        &self,
        instrument: &str,
        date: NaiveDate,
        indicators: IndicatorSet,
    ) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&Self::key(instrument, date))
            .ok_or_else(|| StoreError::NotFound {
                instrument: instrument.to_string(),
                date: date.to_string(),
            })?;
        record.indicators = Some(indicators);
        Ok(())
    }

    async fn find_by_cross_type(
        &self,
        date: NaiveDate,
        cross_type: CrossType,
    ) -> Result<Vec<DailyPriceRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|r| r.trading_date == date && r.indicators.is_some())
            .filter(|r| r.cross_type() == cross_type)
            .cloned()
            .collect())
    }

    async fn find_instruments_missing_fundamentals(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<String>, StoreError> {
        let instruments = self.instruments.read().await;
        let fundamentals = self.fundamentals.read().await;
        Ok(instruments
            .iter()
            .filter(|i| fundamentals.get(&i.code).map_or(true, |f| f.as_of < date))
            .map(|i| i.code.clone())
            .collect())
    }

    async fn save_fundamental(&self, fundamental: Fundamental) -> Result<(), StoreError> {
        self.fundamentals
            .write()
            .await
            .insert(fundamental.instrument_code.clone(), fundamental);
        Ok(())
    }

    async fn find_fundamental(&self, instrument: &str) -> Result<Option<Fundamental>, StoreError> {
        Ok(self.fundamentals.read().await.get(instrument).cloned())
    }

    async fn save_financial_ratios(&self, batch: Vec<FinancialRatio>) -> Result<(), StoreError> {
        let mut ratios = self.ratios.write().await;
        for ratio in batch {
            ratios.insert((ratio.instrument_code.clone(), ratio.period.clone()), ratio);
        }
        Ok(())
    }

    async fn find_financial_ratios(
        &self,
        instrument: &str,
    ) -> Result<Vec<FinancialRatio>, StoreError> {
        let ratios = self.ratios.read().await;
        Ok(ratios
            .iter()
            .filter(|((code, _), _)| code == instrument)
            .rev()
            .map(|(_, r)| r.clone())
            .collect())
    }
}
