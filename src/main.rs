//! Market data collection CLI application.

mod cli;
mod logging;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands, LogLevel};
use logging::setup_logging;
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // A broken config falls back to default logging; the command itself
    // reports the error.
    let logging = ats_config::load_config(&cli.config)
        .map(|config| config.logging)
        .unwrap_or_default()
        .with_overrides(cli.log_level.as_ref().map(LogLevel::as_str), cli.json_logs);
    let _guard = setup_logging(
        &logging.level,
        logging.is_json(),
        logging.file.as_deref().map(Path::new),
    );

    match cli.command {
        Commands::Collect(args) => cli::commands::collect::run(args, &cli.config).await,
        Commands::CollectPeriod(args) => cli::commands::collect_period::run(args, &cli.config).await,
        Commands::InvestorFlow(args) => cli::commands::investor_flow::run(args, &cli.config).await,
        Commands::Fundamentals(args) => cli::commands::fundamentals::run(args, &cli.config).await,
        Commands::FinancialRatio(args) => {
            cli::commands::financial_ratio::run(args, &cli.config).await
        }
        Commands::Indicators(args) => cli::commands::indicators::run(args, &cli.config).await,
        Commands::Candidates(args) => cli::commands::candidates::run(args, &cli.config).await,
        Commands::ValidateConfig => cli::commands::validate::run(&cli.config).await,
    }
}
