//! CLI definitions.

pub mod commands;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ats")]
#[command(author, version, about = "Daily market data collection and indicator pipeline")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Log level, overriding `logging.level`
    #[arg(short, long)]
    pub log_level: Option<LogLevel>,

    /// Force JSON log format, overriding `logging.format`
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Provider {
    Kiwoom,
    Kis,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Collect the daily series for instruments missing a date
    Collect(CollectArgs),
    /// Collect or backfill a date range
    CollectPeriod(CollectPeriodArgs),
    /// Fill investor net-buy quantities for a date
    InvestorFlow(InvestorFlowArgs),
    /// Refresh valuation figures not yet refreshed on a date
    Fundamentals(FundamentalsArgs),
    /// Collect reported financial ratios for every instrument
    FinancialRatio(FinancialRatioArgs),
    /// Compute indicators for a date or a date range
    Indicators(IndicatorArgs),
    /// Show buy and sell candidates for a date
    Candidates(CandidateArgs),
    /// Validate configuration
    ValidateConfig,
}

#[derive(clap::Args)]
pub struct TokenArgs {
    /// Provider access token
    #[arg(long, env = "ATS_TOKEN", hide_env_values = true)]
    pub token: String,
}

#[derive(clap::Args)]
pub struct CollectArgs {
    /// Trading date (YYYY-MM-DD)
    #[arg(short, long)]
    pub date: NaiveDate,

    /// Provider to collect from
    #[arg(short, long, value_enum, default_value = "kiwoom")]
    pub provider: Provider,

    #[command(flatten)]
    pub auth: TokenArgs,
}

#[derive(clap::Args)]
pub struct CollectPeriodArgs {
    /// First date (YYYY-MM-DD)
    #[arg(long)]
    pub start: NaiveDate,

    /// Last date (YYYY-MM-DD), inclusive
    #[arg(long)]
    pub end: NaiveDate,

    /// Provider to collect from
    #[arg(short, long, value_enum, default_value = "kis")]
    pub provider: Provider,

    #[command(flatten)]
    pub auth: TokenArgs,
}

#[derive(clap::Args)]
pub struct InvestorFlowArgs {
    /// Trading date (YYYY-MM-DD)
    #[arg(short, long)]
    pub date: NaiveDate,

    /// Provider to collect from
    #[arg(short, long, value_enum, default_value = "kis")]
    pub provider: Provider,

    #[command(flatten)]
    pub auth: TokenArgs,
}

#[derive(clap::Args)]
pub struct FundamentalsArgs {
    /// Refresh date (YYYY-MM-DD), defaults to today
    #[arg(short, long)]
    pub date: Option<NaiveDate>,

    /// Provider to collect from
    #[arg(short, long, value_enum, default_value = "kiwoom")]
    pub provider: Provider,

    #[command(flatten)]
    pub auth: TokenArgs,
}

#[derive(clap::Args)]
pub struct FinancialRatioArgs {
    /// Provider to collect from
    #[arg(short, long, value_enum, default_value = "kis")]
    pub provider: Provider,

    #[command(flatten)]
    pub auth: TokenArgs,
}

#[derive(clap::Args)]
pub struct IndicatorArgs {
    /// Single trading date (YYYY-MM-DD)
    #[arg(short, long, conflicts_with_all = ["start", "end"])]
    pub date: Option<NaiveDate>,

    /// First date of a range (YYYY-MM-DD)
    #[arg(long, requires = "end")]
    pub start: Option<NaiveDate>,

    /// Last date of a range (YYYY-MM-DD), inclusive
    #[arg(long, requires = "start")]
    pub end: Option<NaiveDate>,

    /// Run the range as a background task and wait for it
    #[arg(long)]
    pub background: bool,
}

#[derive(clap::Args)]
pub struct CandidateArgs {
    /// Trading date (YYYY-MM-DD)
    #[arg(short, long)]
    pub date: NaiveDate,

    /// Candidates per side
    #[arg(long, default_value_t = ats_pipeline::CANDIDATE_LIMIT)]
    pub limit: usize,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    pub output: String,
}
