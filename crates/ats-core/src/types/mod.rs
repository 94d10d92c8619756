//! Core data types for the market data pipeline.

mod fundamental;
mod instrument;
mod outcome;
mod provider;
mod record;

pub use fundamental::{FinancialRatio, Fundamental, RawFinancialRatioItem, RawFundamentalItem};
pub use instrument::{Instrument, Market};
pub use outcome::{CollectionOutcome, OutcomeCounters};
pub use provider::{Credential, DailyPage, InvestorFlowItem, Page, RawDailyItem};
pub use record::{closes, CrossType, DailyPriceRecord, IndicatorSet};
