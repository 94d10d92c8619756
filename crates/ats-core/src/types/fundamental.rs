//! Per-instrument fundamentals and reported financial ratios.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Valuation snapshot as a provider returned it, numbers still textual.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawFundamentalItem {
    pub market_cap: Option<String>,
    pub volume: Option<String>,
    pub per: Option<String>,
    pub pbr: Option<String>,
    pub eps: Option<String>,
    pub bps: Option<String>,
    pub roe: Option<String>,
}

impl RawFundamentalItem {
    /// Whether the provider sent nothing usable.
    pub fn is_blank(&self) -> bool {
        [
            &self.market_cap,
            &self.volume,
            &self.per,
            &self.pbr,
            &self.eps,
            &self.bps,
            &self.roe,
        ]
        .iter()
        .all(|field| field.as_deref().map_or(true, |v| v.trim().is_empty()))
    }
}

/// Latest valuation figures for one instrument. One row per instrument,
/// replaced on every refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fundamental {
    pub instrument_code: String,
    /// Date of the refresh that produced these figures
    pub as_of: NaiveDate,
    pub market_cap: Option<Decimal>,
    pub volume: Option<u64>,
    pub per: Option<Decimal>,
    pub pbr: Option<Decimal>,
    pub eps: Option<Decimal>,
    pub bps: Option<Decimal>,
    pub roe: Option<Decimal>,
}

/// One reporting period of financial ratios as a provider returned it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawFinancialRatioItem {
    /// Settlement year and month, `YYYYMM`
    pub period: String,
    pub revenue_growth: Option<String>,
    pub operating_profit_growth: Option<String>,
    pub net_income_growth: Option<String>,
    pub roe: Option<String>,
    pub eps: Option<String>,
    pub sps: Option<String>,
    pub bps: Option<String>,
    pub reserve_ratio: Option<String>,
    pub debt_ratio: Option<String>,
}

/// Financial ratios of one instrument for one settlement period, keyed by
/// (instrument, period).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialRatio {
    pub instrument_code: String,
    /// Settlement year and month, `YYYYMM`
    pub period: String,
    pub revenue_growth: Option<Decimal>,
    pub operating_profit_growth: Option<Decimal>,
    pub net_income_growth: Option<Decimal>,
    pub roe: Option<Decimal>,
    pub eps: Option<Decimal>,
    pub sps: Option<Decimal>,
    pub bps: Option<Decimal>,
    pub reserve_ratio: Option<Decimal>,
    pub debt_ratio: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_fundamental_item() {
        assert!(RawFundamentalItem::default().is_blank());

        let spaces = RawFundamentalItem {
            per: Some("  ".into()),
            ..Default::default()
        };
        assert!(spaces.is_blank());

        let with_per = RawFundamentalItem {
            per: Some("12.3".into()),
            ..Default::default()
        };
        assert!(!with_per.is_blank());
    }
}
