//! flow-tracker: US sector ETF capital flows mapped to Taiwan industry groups.
//!
//! Usage:
//!   cargo run -p flow-tracker                          # one pass, daily closes
//!   cargo run -p flow-tracker -- --mode realtime --interval 5m
//!   cargo run -p flow-tracker -- --loop-minutes 30     # repeat until Ctrl-C

use analysis_core::QuoteSource;
use anyhow::Result;
use clap::Parser;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use yahoo_client::YahooClient;

mod config;
mod output;
mod pipeline;

use config::{FetchMode, TrackerConfig};

#[derive(Debug, Parser)]
#[command(name = "flow-tracker")]
#[command(about = "US sector ETF flows mapped to Taiwan industry groups", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Track only the 11 core sectors
    #[arg(long)]
    pub no_themes: bool,

    /// Daily closes or today's intraday bars
    #[arg(long, value_enum)]
    pub mode: Option<FetchMode>,

    /// Lookback window in trading days (daily mode)
    #[arg(long)]
    pub days: Option<u32>,

    /// Bar interval in realtime mode (1m, 5m, 15m, 30m, 1h)
    #[arg(long)]
    pub interval: Option<String>,

    /// Repeat every N minutes instead of running once
    #[arg(long)]
    pub loop_minutes: Option<u64>,

    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// JSON file replacing the built-in sector mapping
    #[arg(long)]
    pub mapping_file: Option<PathBuf>,

    #[arg(long)]
    pub top_n: Option<usize>,

    #[arg(long)]
    pub bottom_n: Option<usize>,

    /// IANA timezone for report timestamps
    #[arg(long)]
    pub timezone: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

fn default_filter(log_level: Option<&str>) -> String {
    match log_level {
        Some(level) => format!("flow_tracker={level},flow_map={level},yahoo_client={level}"),
        None => "flow_tracker=info,flow_map=info,yahoo_client=warn".to_string(),
    }
}

fn init_tracing(log_level: Option<&str>) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter(log_level)));

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json_logging {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let mut config = TrackerConfig::from_env()?;
    config.apply_cli(&cli)?;
    config.validate()?;

    tracing::info!("Starting sector flow tracker");
    tracing::info!("  Mode: {:?} ({})", config.fetch_mode, config.lookback());
    tracing::info!("  Themes included: {}", config.include_themes);
    tracing::info!("  Output dir: {}", config.output_dir.display());
    tracing::info!("  Report timezone: {}", config.timezone);
    tracing::debug!(config = %serde_json::to_string(&config)?, "Resolved configuration");

    let source = YahooClient::with_base_url(&config.yahoo_base_url, config.http_timeout())?;

    match config.loop_interval() {
        None => {
            if let Err(e) = pipeline::run_iteration(&config, &source).await {
                tracing::error!("Run failed: {:#}", e);
                return Err(e);
            }
        }
        Some(every) => {
            run_loop(&config, &source, every, tokio::signal::ctrl_c()).await;
        }
    }

    tracing::info!("Sector flow tracker stopped");
    Ok(())
}

/// Run every `every` until `shutdown` resolves. Shutdown is also honoured
/// while a pass is in flight; that pass is abandoned. Returns the number of
/// passes started.
async fn run_loop<F>(config: &TrackerConfig, source: &dyn QuoteSource, every: Duration, shutdown: F) -> u64
where
    F: Future,
{
    tracing::info!("=== Loop mode (every {} min) ===", every.as_secs() / 60);

    tokio::pin!(shutdown);
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut iteration: u64 = 0;

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!(iterations = iteration, "Shutdown signal received, stopping loop");
                break;
            }
            _ = interval.tick() => {
                iteration += 1;
                tracing::info!(iteration, "=== Run started ===");

                let interrupted = tokio::select! {
                    _ = &mut shutdown => true,
                    result = pipeline::run_iteration(config, source) => {
                        match result {
                            Ok(stats) => tracing::info!(
                                iteration,
                                reported = stats.reported,
                                "=== Run complete, next in {} min ===",
                                every.as_secs() / 60
                            ),
                            Err(e) => tracing::error!(
                                iteration,
                                "Run failed: {:#}, retrying in {} min",
                                e,
                                every.as_secs() / 60
                            ),
                        }
                        false
                    }
                };

                if interrupted {
                    tracing::info!(iteration, "Shutdown signal received mid-run, stopping loop");
                    break;
                }
            }
        }
    }

    iteration
}
