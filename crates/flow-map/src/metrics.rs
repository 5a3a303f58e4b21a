//! Quote Metrics
//!
//! Turns a raw price/volume series into a sector quote with percentage change
//! and volume ratio. Values are carried unrounded; rounding only happens when
//! a record is serialized or rendered.

use analysis_core::{Bar, Lookback};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// Why a series could not produce a quote
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QuoteDropped {
    #[error("need at least 2 samples, got {samples}")]
    InsufficientData { samples: usize },

    #[error("previous close is zero or missing")]
    ZeroPreviousClose,
}

/// One ETF's observed market state at fetch time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorQuote {
    pub ticker: String,
    pub display_name: String,
    #[serde(serialize_with = "round2")]
    pub price: f64,
    #[serde(serialize_with = "round2")]
    pub prev_close: f64,
    #[serde(serialize_with = "round2")]
    pub change_pct: f64,
    pub volume: u64,
    #[serde(serialize_with = "round2")]
    pub volume_ratio: f64,
}

impl SectorQuote {
    /// Percentage change weighted by relative volume
    pub fn flow_strength(&self) -> f64 {
        self.change_pct * self.volume_ratio
    }
}

/// Build a quote for the given lookback. Daily series compare the last two
/// closes; intraday series compare against the prior session's close.
pub fn compute_for(
    lookback: Lookback,
    ticker: &str,
    display_name: &str,
    series: &[Bar],
) -> Result<SectorQuote, QuoteDropped> {
    match lookback {
        Lookback::Daily { .. } => compute(ticker, display_name, series),
        Lookback::Intraday { .. } => compute_intraday(ticker, display_name, series),
    }
}

/// Build a quote from a series ordered oldest first.
pub fn compute(ticker: &str, display_name: &str, series: &[Bar]) -> Result<SectorQuote, QuoteDropped> {
    if series.len() < 2 {
        return Err(QuoteDropped::InsufficientData { samples: series.len() });
    }

    let prev_close = series[series.len() - 2].close;
    build_quote(ticker, display_name, prev_close, series)
}

/// Build a quote from intraday bars spanning several sessions, oldest first.
///
/// The latest session is every bar sharing the last bar's UTC date; US
/// sessions never cross UTC midnight. `prev_close` is the last close before
/// that session, or the session's first open when no earlier bars exist.
/// Volume ratio is taken over the latest session only.
pub fn compute_intraday(ticker: &str, display_name: &str, series: &[Bar]) -> Result<SectorQuote, QuoteDropped> {
    if series.len() < 2 {
        return Err(QuoteDropped::InsufficientData { samples: series.len() });
    }

    let session_date = series[series.len() - 1].timestamp.date_naive();
    let session_start = series
        .iter()
        .rposition(|b| b.timestamp.date_naive() != session_date)
        .map_or(0, |i| i + 1);
    let session = &series[session_start..];

    let prev_close = match session_start {
        0 => session[0].open,
        i => series[i - 1].close,
    };
    build_quote(ticker, display_name, prev_close, session)
}

fn build_quote(
    ticker: &str,
    display_name: &str,
    prev_close: f64,
    window: &[Bar],
) -> Result<SectorQuote, QuoteDropped> {
    let latest = window
        .last()
        .ok_or(QuoteDropped::InsufficientData { samples: 0 })?;

    if prev_close == 0.0 || !prev_close.is_finite() {
        return Err(QuoteDropped::ZeroPreviousClose);
    }

    let change_pct = (latest.close - prev_close) / prev_close * 100.0;

    let volumes: Vec<f64> = window.iter().map(|b| b.volume).collect();
    let avg_volume = mean(&volumes);
    let volume_ratio = if avg_volume > 0.0 && avg_volume.is_finite() {
        latest.volume / avg_volume
    } else {
        1.0
    };

    Ok(SectorQuote {
        ticker: ticker.to_string(),
        display_name: display_name.to_string(),
        price: latest.close,
        prev_close,
        change_pct,
        volume: latest.volume.max(0.0).round() as u64,
        volume_ratio,
    })
}

fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Round to `places` decimal places for display
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

pub(crate) fn round2<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round_to(*value, 2))
}
