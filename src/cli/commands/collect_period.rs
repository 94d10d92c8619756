//! Period collection and backfill command.

use anyhow::{Context, Result};
use ats_pipeline::RateLimitedBatchCollector;
use std::path::Path;
use tracing::info;

use super::{credential, print_outcome, Workspace};
use crate::cli::CollectPeriodArgs;

pub async fn run(args: CollectPeriodArgs, config_path: &Path) -> Result<()> {
    if args.start > args.end {
        anyhow::bail!("--start {} is after --end {}", args.start, args.end);
    }

    let workspace = Workspace::open(config_path).await?;
    let credential = credential(args.auth)?;
    let (source, config) = workspace.source(args.provider)?;

    info!(start = %args.start, end = %args.end, provider = ?args.provider, "Collecting period series");

    let collector = RateLimitedBatchCollector::new(workspace.store.clone(), source, config);
    let outcome = collector
        .collect_period(args.start, args.end, &credential)
        .await
        .context("Period collection failed")?;

    workspace.save().await?;
    print_outcome(
        &format!("Period series {} to {}", args.start, args.end),
        &outcome,
    );
    Ok(())
}
