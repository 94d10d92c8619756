//! Market data acquisition and storage.
//!
//! - Provider clients for the Kiwoom and KIS REST APIs
//! - Lenient normalisation of provider numbers and dates
//! - `SeriesMerger`, the pure fetch-vs-stored reconciler
//! - An in-memory `PriceStore` with CSV snapshots

mod csv_store;
mod memory_store;
mod merger;
pub mod normalize;
pub mod providers;

pub use csv_store::CsvSnapshot;
pub use memory_store::InMemoryPriceStore;
pub use merger::{MergeOutput, NormalizedItem, SeriesMerger};
pub use providers::{
    HttpSettings, KisConfig, KisSource, KiwoomConfig, KiwoomSource, RateLimitSignatures,
};
