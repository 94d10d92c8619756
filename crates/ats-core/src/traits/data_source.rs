//! Market data source trait definitions.

use crate::error::SourceError;
use crate::types::{
    Credential, DailyPage, InvestorFlowItem, Page, RawDailyItem, RawFinancialRatioItem,
    RawFundamentalItem,
};
use async_trait::async_trait;
use chrono::NaiveDate;

/// Trait for external market data providers.
///
/// Each provider supports a subset of the operations; the defaults report
/// `SourceError::Unsupported`. Implementations must map their throttling
/// signature onto `SourceError::RateLimited` so the collector can retry it.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Fetch one page of the daily series ending at `date`.
    ///
    /// # Arguments
    /// * `credential` - Access token supplied by the caller
    /// * `instrument` - Instrument short code
    /// * `date` - Most recent date to include
    /// * `continuation` - Key returned by the previous page, if any
    async fn fetch_daily_series(
        &self,
        credential: &Credential,
        instrument: &str,
        date: NaiveDate,
        continuation: Option<&str>,
    ) -> Result<DailyPage, SourceError> {
        let _ = (credential, instrument, date, continuation);
        Err(SourceError::Unsupported {
            provider: self.name().to_string(),
            operation: "daily series",
        })
    }

    /// Fetch the daily series between `start` and `end` inclusive.
    async fn fetch_period_series(
        &self,
        credential: &Credential,
        instrument: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawDailyItem>, SourceError> {
        let _ = (credential, instrument, start, end);
        Err(SourceError::Unsupported {
            provider: self.name().to_string(),
            operation: "period series",
        })
    }

    /// Fetch investor net-buy quantities around `date`.
    async fn fetch_investor_flow(
        &self,
        credential: &Credential,
        instrument: &str,
        date: NaiveDate,
    ) -> Result<Vec<InvestorFlowItem>, SourceError> {
        let _ = (credential, instrument, date);
        Err(SourceError::Unsupported {
            provider: self.name().to_string(),
            operation: "investor flow",
        })
    }

    /// Fetch one page of valuation figures for an instrument.
    async fn fetch_fundamentals(
        &self,
        credential: &Credential,
        instrument: &str,
        continuation: Option<&str>,
    ) -> Result<Page<RawFundamentalItem>, SourceError> {
        let _ = (credential, instrument, continuation);
        Err(SourceError::Unsupported {
            provider: self.name().to_string(),
            operation: "fundamentals",
        })
    }

    /// Fetch every reported period of financial ratios for an instrument.
    async fn fetch_financial_ratios(
        &self,
        credential: &Credential,
        instrument: &str,
    ) -> Result<Vec<RawFinancialRatioItem>, SourceError> {
        let _ = (credential, instrument);
        Err(SourceError::Unsupported {
            provider: self.name().to_string(),
            operation: "financial ratios",
        })
    }

    /// Get the provider name.
    fn name(&self) -> &str;
}
