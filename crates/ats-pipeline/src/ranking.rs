//! Buy and sell candidate ranking from stored cross signals.

use ats_core::error::StoreError;
use ats_core::traits::PriceStore;
use ats_core::types::{CrossType, DailyPriceRecord};
use chrono::NaiveDate;
use std::cmp::Ordering;

/// Candidates returned per side.
pub const CANDIDATE_LIMIT: usize = 100;

/// Golden-cross records on `date`, lowest RSI first.
pub async fn buy_candidates(
    store: &dyn PriceStore,
    date: NaiveDate,
    limit: usize,
) -> Result<Vec<DailyPriceRecord>, StoreError> {
    let records = store.find_by_cross_type(date, CrossType::Golden).await?;
    Ok(rank(records, Ordering::Less, limit))
}

/// Dead-cross records on `date`, highest RSI first.
pub async fn sell_candidates(
    store: &dyn PriceStore,
    date: NaiveDate,
    limit: usize,
) -> Result<Vec<DailyPriceRecord>, StoreError> {
    let records = store.find_by_cross_type(date, CrossType::Dead).await?;
    Ok(rank(records, Ordering::Greater, limit))
}

/// Sort by RSI in the given direction; rows without RSI go last and ties
/// fall back to the instrument code.
fn rank(mut records: Vec<DailyPriceRecord>, first: Ordering, limit: usize) -> Vec<DailyPriceRecord> {
    let rsi = |r: &DailyPriceRecord| r.indicators.as_ref().and_then(|set| set.rsi14);

    records.sort_by(|a, b| {
        let by_rsi = match (rsi(a), rsi(b)) {
            (Some(x), Some(y)) if first == Ordering::Less => x.cmp(&y),
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_rsi.then_with(|| a.instrument_code.cmp(&b.instrument_code))
    });
    records.truncate(limit);
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use ats_core::types::IndicatorSet;
    use ats_data::InMemoryPriceStore;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
    }

    fn signal(code: &str, cross_type: CrossType, rsi: Option<Decimal>) -> DailyPriceRecord {
        let mut record = DailyPriceRecord::new(code, date());
        record.indicators = Some(IndicatorSet {
            rsi14: rsi,
            cross_type,
            ..Default::default()
        });
        record
    }

    async fn store() -> InMemoryPriceStore {
        let store = InMemoryPriceStore::new();
        store
            .save_all(vec![
                signal("000001", CrossType::Golden, Some(dec!(45.10))),
                signal("000002", CrossType::Golden, None),
                signal("000003", CrossType::Golden, Some(dec!(28.70))),
                signal("000004", CrossType::Dead, Some(dec!(61.00))),
                signal("000005", CrossType::Dead, Some(dec!(82.35))),
                signal("000006", CrossType::None, Some(dec!(10.00))),
                DailyPriceRecord::new("000007", date()),
            ])
            .await
            .unwrap();
        store
    }

    fn codes(records: &[DailyPriceRecord]) -> Vec<&str> {
        records.iter().map(|r| r.instrument_code.as_str()).collect()
    }

    #[tokio::test]
    async fn test_buy_candidates_lowest_rsi_first() {
        let store = store().await;
        let buys = buy_candidates(&store, date(), CANDIDATE_LIMIT).await.unwrap();

        assert_eq!(codes(&buys), vec!["000003", "000001", "000002"]);
    }

    #[tokio::test]
    async fn test_sell_candidates_highest_rsi_first() {
        let store = store().await;
        let sells = sell_candidates(&store, date(), CANDIDATE_LIMIT).await.unwrap();

        assert_eq!(codes(&sells), vec!["000005", "000004"]);
    }

    #[tokio::test]
    async fn test_limit_applies() {
        let store = store().await;
        let buys = buy_candidates(&store, date(), 1).await.unwrap();

        assert_eq!(codes(&buys), vec!["000003"]);
    }
}
