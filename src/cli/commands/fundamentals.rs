//! Fundamentals refresh command.

use anyhow::{Context, Result};
use ats_pipeline::RateLimitedBatchCollector;
use chrono::Local;
use std::path::Path;
use tracing::info;

use super::{credential, print_outcome, Workspace};
use crate::cli::FundamentalsArgs;

pub async fn run(args: FundamentalsArgs, config_path: &Path) -> Result<()> {
    let workspace = Workspace::open(config_path).await?;
    let credential = credential(args.auth)?;
    let (source, config) =
        workspace.batch_source(args.provider, &workspace.config.providers.fundamentals)?;
    let date = args.date.unwrap_or_else(|| Local::now().date_naive());

    info!(%date, provider = ?args.provider, "Refreshing fundamentals");

    let collector = RateLimitedBatchCollector::new(workspace.store.clone(), source, config);
    let outcome = collector
        .collect_fundamentals(date, &credential)
        .await
        .context("Fundamentals collection failed")?;

    workspace.save().await?;
    print_outcome(&format!("Fundamentals as of {}", date), &outcome);
    Ok(())
}
