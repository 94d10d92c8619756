//! Daily series collection command.

use anyhow::{Context, Result};
use ats_pipeline::RateLimitedBatchCollector;
use std::path::Path;
use tracing::info;

use super::{credential, print_outcome, Workspace};
use crate::cli::CollectArgs;

pub async fn run(args: CollectArgs, config_path: &Path) -> Result<()> {
    let workspace = Workspace::open(config_path).await?;
    let credential = credential(args.auth)?;
    let (source, config) = workspace.source(args.provider)?;

    info!(date = %args.date, provider = ?args.provider, "Collecting daily series");

    let collector = RateLimitedBatchCollector::new(workspace.store.clone(), source, config);
    let outcome = collector
        .collect_all(args.date, &credential)
        .await
        .context("Collection failed")?;

    workspace.save().await?;
    print_outcome(&format!("Daily series for {}", args.date), &outcome);
    Ok(())
}
