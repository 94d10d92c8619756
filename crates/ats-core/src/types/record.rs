//! Daily price records and the indicator set stored with them.

use chrono::NaiveDate;
use num_traits::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// MACD / signal crossover classification for one trading day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(into = "i8", try_from = "i8")]
pub enum CrossType {
    /// No crossover between the previous and current day
    #[default]
    None,
    /// MACD crossed above its signal line
    Golden,
    /// MACD crossed below its signal line
    Dead,
}

impl CrossType {
    /// Classify the transition between two consecutive (MACD, signal) pairs.
    ///
    /// Both comparisons are strict: touching the signal line is not a cross.
    pub fn classify(prev_macd: f64, prev_signal: f64, macd: f64, signal: f64) -> Self {
        if prev_macd < prev_signal && macd > signal {
            CrossType::Golden
        } else if prev_macd > prev_signal && macd < signal {
            CrossType::Dead
        } else {
            CrossType::None
        }
    }

    /// Numeric code used by downstream ranking: 1, -1 or 0.
    pub fn code(&self) -> i8 {
        match self {
            CrossType::None => 0,
            CrossType::Golden => 1,
            CrossType::Dead => -1,
        }
    }
}

impl From<CrossType> for i8 {
    fn from(value: CrossType) -> Self {
        value.code()
    }
}

impl TryFrom<i8> for CrossType {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(CrossType::None),
            1 => Ok(CrossType::Golden),
            -1 => Ok(CrossType::Dead),
            other => Err(format!("Invalid cross type code: {}", other)),
        }
    }
}

impl fmt::Display for CrossType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CrossType::None => "none",
            CrossType::Golden => "golden",
            CrossType::Dead => "dead",
        };
        write!(f, "{}", s)
    }
}

/// Technical indicators computed for one instrument as of one date.
///
/// The set is always written as a whole. Individual fields stay `None`
/// when the history was too short for that particular indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct IndicatorSet {
    pub sma20: Option<Decimal>,
    pub sma50: Option<Decimal>,
    pub ema9: Option<Decimal>,
    pub ema12: Option<Decimal>,
    pub ema26: Option<Decimal>,
    pub rsi14: Option<Decimal>,
    pub macd: Option<Decimal>,
    pub macd_signal: Option<Decimal>,
    pub cross_type: CrossType,
    pub recommend: bool,
}

/// One trading session for one instrument, keyed by (instrument, date).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyPriceRecord {
    /// Instrument short code
    pub instrument_code: String,
    /// Trading date
    pub trading_date: NaiveDate,
    /// Opening price
    pub open: Decimal,
    /// Highest price
    pub high: Decimal,
    /// Lowest price
    pub low: Decimal,
    /// Closing price
    pub close: Decimal,
    /// Traded quantity
    pub volume: u64,
    /// Traded value
    pub turnover: Decimal,
    /// Day-over-day change in percent
    pub change_rate: Option<Decimal>,
    /// Net quantity bought by individuals
    pub individual_net: Option<i64>,
    /// Net quantity bought by institutions
    pub institution_net: Option<i64>,
    /// Net quantity bought by foreigners
    pub foreign_net: Option<i64>,
    /// Indicators, unset until the indicator pass runs for this date
    pub indicators: Option<IndicatorSet>,
}

impl DailyPriceRecord {
    /// Create an empty record for the given key.
    pub fn new(instrument_code: impl Into<String>, trading_date: NaiveDate) -> Self {
        Self {
            instrument_code: instrument_code.into(),
            trading_date,
            open: Decimal::ZERO,
            high: Decimal::ZERO,
            low: Decimal::ZERO,
            close: Decimal::ZERO,
            volume: 0,
            turnover: Decimal::ZERO,
            change_rate: None,
            individual_net: None,
            institution_net: None,
            foreign_net: None,
            indicators: None,
        }
    }

    /// Set the closing price.
    pub fn with_close(mut self, close: Decimal) -> Self {
        self.close = close;
        self
    }

    /// Closing price as f64 for indicator math.
    #[inline]
    pub fn close_f64(&self) -> f64 {
        self.close.to_f64().unwrap_or(0.0)
    }

    /// Whether all three investor-flow quantities are populated.
    pub fn has_investor_flow(&self) -> bool {
        self.individual_net.is_some() && self.institution_net.is_some() && self.foreign_net.is_some()
    }

    /// Cross type, `None` when indicators are unset.
    pub fn cross_type(&self) -> CrossType {
        self.indicators
            .as_ref()
            .map(|set| set.cross_type)
            .unwrap_or_default()
    }
}

/// Extract closes from records ordered oldest to newest.
pub fn closes(records: &[DailyPriceRecord]) -> Vec<f64> {
    records.iter().map(|r| r.close_f64()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_cross_classification() {
        assert_eq!(CrossType::classify(-1.0, 0.0, 1.0, 0.0), CrossType::Golden);
        assert_eq!(CrossType::classify(1.0, 0.0, -1.0, 0.0), CrossType::Dead);
        assert_eq!(CrossType::classify(1.0, 0.0, 2.0, 0.0), CrossType::None);
        // Touching is not crossing
        assert_eq!(CrossType::classify(0.0, 0.0, 1.0, 0.0), CrossType::None);
    }

    #[test]
    fn test_cross_type_codes() {
        assert_eq!(CrossType::Golden.code(), 1);
        assert_eq!(CrossType::Dead.code(), -1);
        assert_eq!(CrossType::try_from(-1).unwrap(), CrossType::Dead);
        assert!(CrossType::try_from(2).is_err());

        let json = serde_json::to_string(&CrossType::Golden).unwrap();
        assert_eq!(json, "1");
    }

    #[test]
    fn test_new_record_has_no_indicators() {
        let record = DailyPriceRecord::new("005930", date(2));
        assert!(record.indicators.is_none());
        assert_eq!(record.cross_type(), CrossType::None);
        assert!(!record.has_investor_flow());
    }

    #[test]
    fn test_closes_extraction() {
        let records = vec![
            DailyPriceRecord::new("005930", date(2)).with_close(dec!(70000)),
            DailyPriceRecord::new("005930", date(3)).with_close(dec!(70500.5)),
        ];
        assert_eq!(closes(&records), vec![70000.0, 70500.5]);
    }
}
