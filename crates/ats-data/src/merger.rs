//! Reconciles a freshly fetched batch with persisted records.

use ats_core::types::{DailyPriceRecord, RawDailyItem};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

use crate::normalize::{
    parse_date, parse_decimal, parse_optional_decimal, parse_price, parse_quantity, parse_volume,
};

/// A provider item with a parsed date and canonical numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedItem {
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: u64,
    pub turnover: Decimal,
    pub change_rate: Option<Decimal>,
    pub individual_net: Option<i64>,
    pub institution_net: Option<i64>,
    pub foreign_net: Option<i64>,
}

impl NormalizedItem {
    /// Normalise one raw item. Fails only on an unparsable date.
    pub fn from_raw(raw: &RawDailyItem) -> Result<Self, ats_core::error::MergeError> {
        Ok(Self {
            date: parse_date(&raw.date)?,
            open: parse_price(raw.open.as_deref()),
            high: parse_price(raw.high.as_deref()),
            low: parse_price(raw.low.as_deref()),
            close: parse_price(raw.close.as_deref()),
            volume: parse_volume(raw.volume.as_deref()),
            turnover: parse_decimal(raw.turnover.as_deref()).abs(),
            change_rate: parse_optional_decimal(raw.change_rate.as_deref()),
            individual_net: parse_quantity(raw.individual_net.as_deref()),
            institution_net: parse_quantity(raw.institution_net.as_deref()),
            foreign_net: parse_quantity(raw.foreign_net.as_deref()),
        })
    }

    /// Overwrite the raw fields of `record`. Optional fields the item does
    /// not carry keep their stored value; indicators are never touched.
    fn apply_to(&self, record: &mut DailyPriceRecord) {
        record.open = self.open;
        record.high = self.high;
        record.low = self.low;
        record.close = self.close;
        record.volume = self.volume;
        record.turnover = self.turnover;
        if self.change_rate.is_some() {
            record.change_rate = self.change_rate;
        }
        if self.individual_net.is_some() {
            record.individual_net = self.individual_net;
        }
        if self.institution_net.is_some() {
            record.institution_net = self.institution_net;
        }
        if self.foreign_net.is_some() {
            record.foreign_net = self.foreign_net;
        }
    }
}

/// Records ready for one bulk save.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutput {
    /// Updated and new records, ascending by date
    pub records: Vec<DailyPriceRecord>,
    /// Records with no stored counterpart
    pub inserted: usize,
    /// Records that replace a stored row
    pub updated: usize,
}

impl MergeOutput {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Pure batch reconciler. It never reads or writes the store itself; the
/// caller loads existing records for [`SeriesMerger::date_span`] in one query.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeriesMerger;

impl SeriesMerger {
    /// Normalise a raw batch, ordered by date.
    ///
    /// Items with an unparsable date are dropped with a warning. When a date
    /// repeats, the item that comes last in the input wins.
    pub fn normalize(instrument: &str, items: &[RawDailyItem]) -> Vec<NormalizedItem> {
        let mut by_date: BTreeMap<NaiveDate, NormalizedItem> = BTreeMap::new();

        for raw in items {
            match NormalizedItem::from_raw(raw) {
                Ok(item) => {
                    by_date.insert(item.date, item);
                }
                Err(e) => warn!(instrument = %instrument, error = %e, "Skipping item"),
            }
        }

        by_date.into_values().collect()
    }

    /// Inclusive date span of a normalised batch.
    pub fn date_span(items: &[NormalizedItem]) -> Option<(NaiveDate, NaiveDate)> {
        let first = items.iter().map(|i| i.date).min()?;
        let last = items.iter().map(|i| i.date).max()?;
        Some((first, last))
    }

    /// Build the insert/update set for one instrument.
    ///
    /// Existing rows are matched by trading date. Matched rows keep their
    /// indicator set exactly; new rows start without one. The output holds
    /// at most one record per date: a repeated date keeps the later item.
    pub fn merge(
        instrument: &str,
        items: Vec<NormalizedItem>,
        existing: Vec<DailyPriceRecord>,
    ) -> MergeOutput {
        let mut existing_by_date: HashMap<NaiveDate, DailyPriceRecord> = existing
            .into_iter()
            .filter(|r| r.instrument_code == instrument)
            .map(|r| (r.trading_date, r))
            .collect();

        let by_date: BTreeMap<NaiveDate, NormalizedItem> =
            items.into_iter().map(|item| (item.date, item)).collect();

        let mut output = MergeOutput::default();

        for item in by_date.into_values() {
            let record = match existing_by_date.remove(&item.date) {
                Some(mut record) => {
                    item.apply_to(&mut record);
                    output.updated += 1;
                    record
                }
                None => {
                    let mut record = DailyPriceRecord::new(instrument, item.date);
                    item.apply_to(&mut record);
                    output.inserted += 1;
                    record
                }
            };
            output.records.push(record);
        }

        output
    }
}
