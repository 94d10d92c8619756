//! Candidate listing command.

use anyhow::{Context, Result};
use ats_core::types::DailyPriceRecord;
use ats_pipeline::{buy_candidates, sell_candidates};
use serde::Serialize;
use std::path::Path;

use super::Workspace;
use crate::cli::CandidateArgs;

#[derive(Serialize)]
struct Candidates {
    buy: Vec<DailyPriceRecord>,
    sell: Vec<DailyPriceRecord>,
}

pub async fn run(args: CandidateArgs, config_path: &Path) -> Result<()> {
    let workspace = Workspace::open(config_path).await?;
    let store = workspace.store.as_ref();

    let candidates = Candidates {
        buy: buy_candidates(store, args.date, args.limit)
            .await
            .context("Failed to rank buy candidates")?,
        sell: sell_candidates(store, args.date, args.limit)
            .await
            .context("Failed to rank sell candidates")?,
    };

    match args.output.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&candidates)?),
        _ => {
            print_side(&format!("Buy candidates for {}", args.date), &candidates.buy);
            println!();
            print_side(&format!("Sell candidates for {}", args.date), &candidates.sell);
        }
    }

    Ok(())
}

fn print_side(title: &str, records: &[DailyPriceRecord]) {
    println!("{} ({})", title, records.len());
    for record in records {
        let rsi = record
            .indicators
            .as_ref()
            .and_then(|set| set.rsi14)
            .map(|r| r.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("  {:<8} close {:>12}  rsi {:>6}", record.instrument_code, record.close, rsi);
    }
}
