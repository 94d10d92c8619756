//! Indicator computation command.

use anyhow::{Context, Result};
use ats_pipeline::IndicatorBatchRunner;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use super::{print_outcome, Workspace};
use crate::cli::IndicatorArgs;

pub async fn run(args: IndicatorArgs, config_path: &Path) -> Result<()> {
    let workspace = Workspace::open(config_path).await?;
    let runner = Arc::new(IndicatorBatchRunner::new(
        workspace.store.clone(),
        workspace.config.indicators.runner_config(),
    ));

    match (args.date, args.start, args.end) {
        (Some(date), _, _) => {
            let outcome = runner
                .compute_indicators(date)
                .await
                .context("Indicator computation failed")?;
            workspace.save().await?;
            print_outcome(&format!("Indicators for {}", date), &outcome);
        }
        (None, Some(start), Some(end)) if args.background => {
            if start > end {
                anyhow::bail!("--start {} is after --end {}", start, end);
            }
            info!(%start, %end, "Indicator range started in the background");
            runner
                .spawn_range(start, end)
                .await
                .context("Background indicator task panicked")?;
            workspace.save().await?;
            println!("Indicator range {} to {} finished; see logs for totals", start, end);
        }
        (None, Some(start), Some(end)) => {
            let outcome = runner
                .compute_indicators_for_range(start, end)
                .await
                .context("Indicator computation failed")?;
            workspace.save().await?;
            print_outcome(&format!("Indicators {} to {}", start, end), &outcome);
        }
        _ => anyhow::bail!("Provide --date or both --start and --end"),
    }

    Ok(())
}
