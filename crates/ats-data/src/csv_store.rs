//! CSV snapshots of the instrument universe, daily records, fundamentals
//! and financial ratios.

use ats_core::error::StoreError;
use ats_core::traits::PriceStore;
use ats_core::types::{
    CrossType, DailyPriceRecord, FinancialRatio, Fundamental, IndicatorSet, Instrument, Market,
};
use chrono::NaiveDate;
use csv::{ReaderBuilder, WriterBuilder};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::memory_store::InMemoryPriceStore;

const INSTRUMENTS_FILE: &str = "instruments.csv";
const RECORDS_FILE: &str = "daily_prices.csv";
const FUNDAMENTALS_FILE: &str = "fundamentals.csv";
const RATIOS_FILE: &str = "financial_ratios.csv";

/// Instrument file row.
#[derive(Debug, Serialize, Deserialize)]
struct InstrumentRow {
    #[serde(alias = "stock_code", alias = "Code")]
    code: String,
    #[serde(alias = "stock_name", alias = "Name", default)]
    name: String,
    #[serde(alias = "Market", default)]
    market: String,
}

/// Flat daily record row. Indicator columns are empty until computed.
#[derive(Debug, Serialize, Deserialize)]
struct RecordRow {
    instrument_code: String,
    trading_date: NaiveDate,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    volume: u64,
    turnover: Decimal,
    change_rate: Option<Decimal>,
    individual_net: Option<i64>,
    institution_net: Option<i64>,
    foreign_net: Option<i64>,
    sma20: Option<Decimal>,
    sma50: Option<Decimal>,
    ema9: Option<Decimal>,
    ema12: Option<Decimal>,
    ema26: Option<Decimal>,
    rsi14: Option<Decimal>,
    macd: Option<Decimal>,
    macd_signal: Option<Decimal>,
    cross_type: Option<i8>,
    recommend: Option<bool>,
}

impl From<&DailyPriceRecord> for RecordRow {
    fn from(r: &DailyPriceRecord) -> Self {
        let set = r.indicators.as_ref();
        Self {
            instrument_code: r.instrument_code.clone(),
            trading_date: r.trading_date,
            open: r.open,
            high: r.high,
            low: r.low,
            close: r.close,
            volume: r.volume,
            turnover: r.turnover,
            change_rate: r.change_rate,
            individual_net: r.individual_net,
            institution_net: r.institution_net,
            foreign_net: r.foreign_net,
            sma20: set.and_then(|s| s.sma20),
            sma50: set.and_then(|s| s.sma50),
            ema9: set.and_then(|s| s.ema9),
            ema12: set.and_then(|s| s.ema12),
            ema26: set.and_then(|s| s.ema26),
            rsi14: set.and_then(|s| s.rsi14),
            macd: set.and_then(|s| s.macd),
            macd_signal: set.and_then(|s| s.macd_signal),
            cross_type: set.map(|s| s.cross_type.code()),
            recommend: set.map(|s| s.recommend),
        }
    }
}

impl TryFrom<RecordRow> for DailyPriceRecord {
    type Error = StoreError;

    fn try_from(row: RecordRow) -> Result<Self, Self::Error> {
        // A written indicator set always carries its cross type.
        let indicators = match row.cross_type {
            Some(code) => Some(IndicatorSet {
                sma20: row.sma20,
                sma50: row.sma50,
                ema9: row.ema9,
                ema12: row.ema12,
                ema26: row.ema26,
                rsi14: row.rsi14,
                macd: row.macd,
                macd_signal: row.macd_signal,
                cross_type: CrossType::try_from(code).map_err(StoreError::Snapshot)?,
                recommend: row.recommend.unwrap_or(false),
            }),
            None => None,
        };

        Ok(DailyPriceRecord {
            instrument_code: row.instrument_code,
            trading_date: row.trading_date,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
            turnover: row.turnover,
            change_rate: row.change_rate,
            individual_net: row.individual_net,
            institution_net: row.institution_net,
            foreign_net: row.foreign_net,
            indicators,
        })
    }
}

/// A directory holding one CSV file per stored table.
#[derive(Debug, Clone)]
pub struct CsvSnapshot {
    dir: PathBuf,
}

impl CsvSnapshot {
    /// Create a snapshot handle. The directory need not exist yet.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Snapshot directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load the snapshot into a fresh in-memory store. Missing files load as empty.
    pub async fn load(&self) -> Result<InMemoryPriceStore, StoreError> {
        let instruments = self.load_instruments()?;
        let records = self.load_records()?;
        let fundamentals: Vec<Fundamental> = self.read_rows(FUNDAMENTALS_FILE)?;
        let ratios: Vec<FinancialRatio> = self.read_rows(RATIOS_FILE)?;

        info!(
            dir = %self.dir.display(),
            instruments = instruments.len(),
            records = records.len(),
            fundamentals = fundamentals.len(),
            ratios = ratios.len(),
            "Loaded snapshot"
        );

        let store = InMemoryPriceStore::with_instruments(instruments);
        store.save_all(records).await?;
        for fundamental in fundamentals {
            store.save_fundamental(fundamental).await?;
        }
        store.save_financial_ratios(ratios).await?;
        Ok(store)
    }

    /// Write the store back to the snapshot directory.
    pub async fn save(&self, store: &InMemoryPriceStore) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| StoreError::Snapshot(e.to_string()))?;

        let instruments = store.instruments().await;
        let rows: Vec<InstrumentRow> = instruments
            .iter()
            .map(|i| InstrumentRow {
                code: i.code.clone(),
                name: i.name.clone(),
                market: i.market.to_string(),
            })
            .collect();
        self.write_rows(INSTRUMENTS_FILE, &rows)?;

        let records = store.all_records().await;
        let rows: Vec<RecordRow> = records.iter().map(RecordRow::from).collect();
        self.write_rows(RECORDS_FILE, &rows)?;

        let fundamentals = store.all_fundamentals().await;
        self.write_rows(FUNDAMENTALS_FILE, &fundamentals)?;
        let ratios = store.all_financial_ratios().await;
        self.write_rows(RATIOS_FILE, &ratios)?;

        info!(
            dir = %self.dir.display(),
            instruments = instruments.len(),
            records = records.len(),
            fundamentals = fundamentals.len(),
            ratios = ratios.len(),
            "Saved snapshot"
        );
        Ok(())
    }

    fn load_instruments(&self) -> Result<Vec<Instrument>, StoreError> {
        let rows: Vec<InstrumentRow> = self.read_rows(INSTRUMENTS_FILE)?;
        rows.into_iter()
            .map(|row| {
                let market = row
                    .market
                    .parse::<Market>()
                    .map_err(StoreError::Snapshot)?;
                Ok(Instrument::new(row.code.trim(), row.name, market))
            })
            .collect()
    }

    fn load_records(&self) -> Result<Vec<DailyPriceRecord>, StoreError> {
        let rows: Vec<RecordRow> = self.read_rows(RECORDS_FILE)?;
        rows.into_iter().map(DailyPriceRecord::try_from).collect()
    }

    fn read_rows<T: for<'de> Deserialize<'de>>(&self, file: &str) -> Result<Vec<T>, StoreError> {
        let path = self.dir.join(file);
        if !path.exists() {
            debug!(path = %path.display(), "Snapshot file absent");
            return Ok(Vec::new());
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&path)
            .map_err(|e| StoreError::Snapshot(e.to_string()))?;

        reader
            .deserialize()
            .map(|row| row.map_err(|e| StoreError::Snapshot(format!("{}: {}", path.display(), e))))
            .collect()
    }

    fn write_rows<T: Serialize>(&self, file: &str, rows: &[T]) -> Result<(), StoreError> {
        let path = self.dir.join(file);
        let mut writer = WriterBuilder::new()
            .has_headers(true)
            .from_path(&path)
            .map_err(|e| StoreError::Snapshot(e.to_string()))?;

        for row in rows {
            writer
                .serialize(row)
                .map_err(|e| StoreError::Snapshot(e.to_string()))?;
        }
        writer.flush().map_err(|e| StoreError::Snapshot(e.to_string()))
    }
}
