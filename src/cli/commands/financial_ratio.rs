//! Financial ratio collection command.

use anyhow::{Context, Result};
use ats_pipeline::RateLimitedBatchCollector;
use std::path::Path;
use tracing::info;

use super::{credential, print_outcome, Workspace};
use crate::cli::FinancialRatioArgs;

pub async fn run(args: FinancialRatioArgs, config_path: &Path) -> Result<()> {
    let workspace = Workspace::open(config_path).await?;
    let credential = credential(args.auth)?;
    let (source, config) =
        workspace.batch_source(args.provider, &workspace.config.providers.financial_ratio)?;

    info!(provider = ?args.provider, "Collecting financial ratios");

    let collector = RateLimitedBatchCollector::new(workspace.store.clone(), source, config);
    let outcome = collector
        .collect_financial_ratios(&credential)
        .await
        .context("Financial ratio collection failed")?;

    workspace.save().await?;
    print_outcome("Financial ratios", &outcome);
    Ok(())
}
