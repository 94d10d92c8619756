//! Validate configuration command.

use anyhow::{Context, Result};
use ats_config::load_config;
use std::path::Path;

pub async fn run(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {:?}", config_path);

    match load_config(config_path) {
        Ok(config) => {
            println!("Configuration is valid!");
            println!();
            println!("App: {}", config.app.name);
            println!("Environment: {}", config.app.environment);
            println!("Log level: {}", config.logging.level);
            for (name, provider) in [("Kiwoom", &config.providers.kiwoom), ("KIS", &config.providers.kis)] {
                println!(
                    "{}: {} (concurrency {}, attempts {}, success delay {}ms)",
                    name,
                    provider.base_url,
                    provider.max_concurrency,
                    provider.max_attempts,
                    provider.success_delay_ms
                );
            }
            println!(
                "Indicators: chunk {}, history {}, minimum {}",
                config.indicators.chunk_size,
                config.indicators.history_limit,
                config.indicators.min_history
            );
            for (name, batch) in [
                ("Fundamentals", &config.providers.fundamentals),
                ("Financial ratio", &config.providers.financial_ratio),
            ] {
                println!(
                    "{}: concurrency {}, backoff {}ms, success delay {}ms",
                    name, batch.max_concurrency, batch.backoff_ms, batch.success_delay_ms
                );
            }
            println!("Snapshot directory: {}", config.storage.snapshot_dir);
            println!();
            println!("Effective configuration:");
            println!("{}", config.to_toml().context("Failed to render configuration")?);
        }
        Err(e) => {
            println!("Configuration error: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}
