//! CLI command implementations.

pub mod candidates;
pub mod collect;
pub mod collect_period;
pub mod financial_ratio;
pub mod fundamentals;
pub mod indicators;
pub mod investor_flow;
pub mod validate;

use anyhow::{Context, Result};
use ats_config::{load_config, AppConfig, BatchSettings};
use ats_core::traits::MarketDataSource;
use ats_core::types::{CollectionOutcome, Credential};
use ats_data::{CsvSnapshot, InMemoryPriceStore, KisSource, KiwoomSource};
use ats_pipeline::CollectorConfig;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::cli::{Provider, TokenArgs};

/// Configuration plus the loaded snapshot for one command run.
pub(crate) struct Workspace {
    pub config: AppConfig,
    pub snapshot: CsvSnapshot,
    pub store: Arc<InMemoryPriceStore>,
}

impl Workspace {
    pub async fn open(config_path: &Path) -> Result<Self> {
        let config = load_config(config_path)
            .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;
        let snapshot = CsvSnapshot::new(&config.storage.snapshot_dir);
        let store = snapshot
            .load()
            .await
            .with_context(|| format!("Failed to load snapshot from {}", snapshot.dir().display()))?;

        info!(
            dir = %snapshot.dir().display(),
            instruments = store.instruments().await.len(),
            records = store.len().await,
            "Snapshot loaded"
        );

        Ok(Self {
            config,
            snapshot,
            store: Arc::new(store),
        })
    }

    pub async fn save(&self) -> Result<()> {
        self.snapshot
            .save(&self.store)
            .await
            .with_context(|| format!("Failed to save snapshot to {}", self.snapshot.dir().display()))
    }

    /// Build the provider client and its collector tuning.
    pub fn source(&self, provider: Provider) -> Result<(Arc<dyn MarketDataSource>, CollectorConfig)> {
        let providers = &self.config.providers;
        match provider {
            Provider::Kiwoom => {
                let source: Arc<dyn MarketDataSource> = Arc::new(
                    KiwoomSource::new(providers.kiwoom_config(&self.config.http))
                        .context("Failed to build Kiwoom client")?,
                );
                Ok((source, providers.kiwoom.collector_config()))
            }
            Provider::Kis => {
                let config = providers
                    .kis_config(&self.config.http)
                    .context("KIS app credentials are not configured")?;
                let source: Arc<dyn MarketDataSource> =
                    Arc::new(KisSource::new(config).context("Failed to build KIS client")?);
                Ok((source, providers.kis.collector_config()))
            }
        }
    }

    /// Build the provider client with a batch job's pacing layered over it.
    pub fn batch_source(
        &self,
        provider: Provider,
        batch: &BatchSettings,
    ) -> Result<(Arc<dyn MarketDataSource>, CollectorConfig)> {
        let (source, _) = self.source(provider)?;
        let settings = match provider {
            Provider::Kiwoom => &self.config.providers.kiwoom,
            Provider::Kis => &self.config.providers.kis,
        };
        Ok((source, settings.batch_config(batch)))
    }
}

pub(crate) fn credential(args: TokenArgs) -> Result<Credential> {
    Credential::new(args.token).context("Access token must not be blank")
}

pub(crate) fn print_outcome(title: &str, outcome: &CollectionOutcome) {
    println!("{}", title);
    println!("  attempted: {}", outcome.attempted);
    println!("  succeeded: {}", outcome.succeeded);
    println!("  failed:    {}", outcome.failed);
    println!("  skipped:   {}", outcome.skipped);
    println!("  elapsed:   {:.1}s", outcome.elapsed.as_secs_f64());
}
