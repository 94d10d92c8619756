//! Investor-flow fill command.

use anyhow::{Context, Result};
use ats_pipeline::RateLimitedBatchCollector;
use std::path::Path;
use tracing::info;

use super::{credential, print_outcome, Workspace};
use crate::cli::InvestorFlowArgs;

pub async fn run(args: InvestorFlowArgs, config_path: &Path) -> Result<()> {
    let workspace = Workspace::open(config_path).await?;
    let credential = credential(args.auth)?;
    let (source, config) = workspace.source(args.provider)?;

    info!(date = %args.date, provider = ?args.provider, "Collecting investor flow");

    let collector = RateLimitedBatchCollector::new(workspace.store.clone(), source, config);
    let outcome = collector
        .collect_investor_flow(args.date, &credential)
        .await
        .context("Investor-flow collection failed")?;

    workspace.save().await?;
    print_outcome(&format!("Investor flow for {}", args.date), &outcome);
    Ok(())
}
