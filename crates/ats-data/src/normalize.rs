//! Lenient parsing of provider numeric and date strings.
//!
//! Providers send numbers with thousands separators, explicit `+` signs and
//! percent suffixes. A value that still fails to parse becomes zero so one
//! bad field never sinks a whole batch.

use ats_core::error::MergeError;
use ats_core::types::{FinancialRatio, Fundamental, RawFinancialRatioItem, RawFundamentalItem};
use chrono::NaiveDate;
use num_traits::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Strip separators, `+` signs, percent suffixes and whitespace.
pub fn clean(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, ',' | '+' | '%') && !c.is_whitespace())
        .collect()
}

/// Parse a decimal, defaulting to zero.
pub fn parse_decimal(raw: Option<&str>) -> Decimal {
    raw.map(clean)
        .and_then(|s| Decimal::from_str(&s).ok())
        .unwrap_or(Decimal::ZERO)
}

/// Parse a price. Providers prefix prices with a direction sign, so the
/// magnitude is kept.
pub fn parse_price(raw: Option<&str>) -> Decimal {
    parse_decimal(raw).abs()
}

/// Parse an optional signed decimal; absent or blank input stays `None`.
pub fn parse_optional_decimal(raw: Option<&str>) -> Option<Decimal> {
    raw.filter(|s| !s.trim().is_empty())
        .map(|s| parse_decimal(Some(s)))
}

/// Parse an optional signed quantity; absent or blank input stays `None`.
pub fn parse_quantity(raw: Option<&str>) -> Option<i64> {
    parse_optional_decimal(raw).map(|d| d.trunc().to_i64().unwrap_or(0))
}

/// Parse a traded volume as a non-negative count.
pub fn parse_volume(raw: Option<&str>) -> u64 {
    parse_decimal(raw).abs().trunc().to_u64().unwrap_or(0)
}

/// Parse a trading date in `YYYYMMDD` or `YYYY-MM-DD` form.
pub fn parse_date(raw: &str) -> Result<NaiveDate, MergeError> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, "%Y%m%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y-%m-%d"))
        .map_err(|_| MergeError::InvalidDate(raw.to_string()))
}

/// Format a date the way providers expect it in requests.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Valuation figures for one instrument refreshed on `as_of`. Blank fields stay unset.
pub fn fundamental(instrument: &str, as_of: NaiveDate, item: &RawFundamentalItem) -> Fundamental {
    Fundamental {
        instrument_code: instrument.to_string(),
        as_of,
        market_cap: parse_optional_decimal(item.market_cap.as_deref()).map(|d| d.abs()),
        volume: parse_optional_decimal(item.volume.as_deref())
            .map(|d| d.abs().trunc().to_u64().unwrap_or(0)),
        per: parse_optional_decimal(item.per.as_deref()),
        pbr: parse_optional_decimal(item.pbr.as_deref()),
        eps: parse_optional_decimal(item.eps.as_deref()),
        bps: parse_optional_decimal(item.bps.as_deref()),
        roe: parse_optional_decimal(item.roe.as_deref()),
    }
}

/// One period of financial ratios, or `None` when the period is blank.
pub fn financial_ratio(instrument: &str, item: &RawFinancialRatioItem) -> Option<FinancialRatio> {
    let period = item.period.trim();
    if period.is_empty() {
        return None;
    }
    let field = |raw: &Option<String>| parse_optional_decimal(raw.as_deref());
    Some(FinancialRatio {
        instrument_code: instrument.to_string(),
        period: period.to_string(),
        revenue_growth: field(&item.revenue_growth),
        operating_profit_growth: field(&item.operating_profit_growth),
        net_income_growth: field(&item.net_income_growth),
        roe: field(&item.roe),
        eps: field(&item.eps),
        sps: field(&item.sps),
        bps: field(&item.bps),
        reserve_ratio: field(&item.reserve_ratio),
        debt_ratio: field(&item.debt_ratio),
    })
}
