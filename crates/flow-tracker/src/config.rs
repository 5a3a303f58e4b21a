use analysis_core::{Lookback, Timeframe};
use anyhow::{anyhow, bail, Context, Result};
use chrono_tz::Tz;
use clap::ValueEnum;
use flow_map::ReportOptions;
use serde::Serialize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::Cli;

/// How quotes are sampled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    /// Daily closes over the lookback window
    Daily,
    /// Today's intraday bars
    Realtime,
}

impl FromStr for FetchMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(FetchMode::Daily),
            "realtime" | "intraday" => Ok(FetchMode::Realtime),
            other => Err(anyhow!("unknown fetch mode '{}', expected daily or realtime", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackerConfig {
    pub include_themes: bool,
    pub fetch_mode: FetchMode,
    pub lookback_days: u32,
    #[serde(serialize_with = "serialize_display")]
    pub intraday_interval: Timeframe,
    /// None runs once and exits
    pub loop_minutes: Option<u64>,
    pub output_dir: PathBuf,
    /// Replaces the built-in mapping table when set
    pub mapping_file: Option<PathBuf>,
    pub top_n: usize,
    pub bottom_n: usize,
    #[serde(serialize_with = "serialize_display")]
    pub timezone: Tz,
    pub yahoo_base_url: String,
    pub yahoo_timeout_secs: u64,
}

fn serialize_display<T: std::fmt::Display, S: serde::Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

impl TrackerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Missing keys take their defaults, malformed ones are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let config = Self {
            include_themes: parse_bool(&get("FLOW_INCLUDE_THEMES", "true"))
                .context("FLOW_INCLUDE_THEMES")?,
            fetch_mode: get("FLOW_FETCH_MODE", "daily")
                .parse()
                .context("FLOW_FETCH_MODE")?,
            lookback_days: get("FLOW_LOOKBACK_DAYS", "5")
                .parse()
                .context("FLOW_LOOKBACK_DAYS must be a positive integer")?,
            intraday_interval: get("FLOW_INTRADAY_INTERVAL", "5m")
                .parse()
                .map_err(|e| anyhow!("FLOW_INTRADAY_INTERVAL: {}", e))?,
            loop_minutes: lookup("FLOW_LOOP_MINUTES")
                .filter(|v| !v.trim().is_empty())
                .map(|v| v.trim().parse())
                .transpose()
                .context("FLOW_LOOP_MINUTES must be a whole number of minutes")?,
            output_dir: PathBuf::from(get("FLOW_OUTPUT_DIR", "output")),
            mapping_file: lookup("FLOW_MAPPING_FILE")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            top_n: get("FLOW_TOP_N", "5").parse().context("FLOW_TOP_N")?,
            bottom_n: get("FLOW_BOTTOM_N", "5").parse().context("FLOW_BOTTOM_N")?,
            timezone: parse_timezone(&get("FLOW_TIMEZONE", "Asia/Taipei"))?,
            yahoo_base_url: get("YAHOO_BASE_URL", yahoo_client::DEFAULT_BASE_URL),
            yahoo_timeout_secs: get("YAHOO_TIMEOUT_SECS", "30")
                .parse()
                .context("YAHOO_TIMEOUT_SECS")?,
        };

        Ok(config)
    }

    /// Command-line flags win over the environment
    pub fn apply_cli(&mut self, cli: &Cli) -> Result<()> {
        if cli.no_themes {
            self.include_themes = false;
        }
        if let Some(mode) = cli.mode {
            self.fetch_mode = mode;
        }
        if let Some(days) = cli.days {
            self.lookback_days = days;
        }
        if let Some(interval) = &cli.interval {
            self.intraday_interval = interval
                .parse()
                .map_err(|e| anyhow!("--interval: {}", e))?;
        }
        if cli.loop_minutes.is_some() {
            self.loop_minutes = cli.loop_minutes;
        }
        if let Some(dir) = &cli.output_dir {
            self.output_dir = dir.clone();
        }
        if let Some(path) = &cli.mapping_file {
            self.mapping_file = Some(path.clone());
        }
        if let Some(n) = cli.top_n {
            self.top_n = n;
        }
        if let Some(n) = cli.bottom_n {
            self.bottom_n = n;
        }
        if let Some(tz) = &cli.timezone {
            self.timezone = parse_timezone(tz)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_n == 0 || self.bottom_n == 0 {
            bail!("top_n and bottom_n must be at least 1");
        }
        if self.fetch_mode == FetchMode::Daily && self.lookback_days < 2 {
            bail!("lookback_days must be at least 2 to have a previous close");
        }
        if self.fetch_mode == FetchMode::Realtime && self.intraday_interval == Timeframe::Day1 {
            bail!("realtime mode needs an intraday interval (1m, 5m, 15m, 30m, 1h), got 1d");
        }
        if self.loop_minutes == Some(0) {
            bail!("loop interval must be at least 1 minute");
        }
        if self.yahoo_timeout_secs == 0 {
            bail!("YAHOO_TIMEOUT_SECS must be at least 1");
        }
        Ok(())
    }

    pub fn lookback(&self) -> Lookback {
        match self.fetch_mode {
            FetchMode::Daily => Lookback::Daily {
                days: self.lookback_days,
            },
            FetchMode::Realtime => Lookback::Intraday {
                interval: self.intraday_interval,
            },
        }
    }

    pub fn report_options(&self) -> ReportOptions {
        ReportOptions {
            top_n: self.top_n,
            bottom_n: self.bottom_n,
        }
    }

    pub fn loop_interval(&self) -> Option<Duration> {
        self.loop_minutes.map(|m| Duration::from_secs(m * 60))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.yahoo_timeout_secs)
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(anyhow!("expected true or false, got '{}'", other)),
    }
}

fn parse_timezone(value: &str) -> Result<Tz> {
    value
        .trim()
        .parse::<Tz>()
        .map_err(|e| anyhow!("invalid timezone '{}': {}", value, e))
}
