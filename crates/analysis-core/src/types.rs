use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::AnalysisError;

/// OHLCV bar data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    #[serde(default)]
    pub vwap: Option<f64>,
}

impl Bar {
    /// Bar carrying only a close and a volume, as some sources report partial candles.
    pub fn close_only(timestamp: DateTime<Utc>, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open: close,
            high: close,
            low: close,
            close,
            volume,
            vwap: None,
        }
    }
}

/// Bar interval for intraday requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Timeframe {
    Minute1,
    Minute5,
    Minute15,
    Minute30,
    Hour1,
    Day1,
}

impl Timeframe {
    /// Short code used on the command line and by chart APIs ("5m", "1h", "1d").
    pub fn code(&self) -> &'static str {
        match self {
            Timeframe::Minute1 => "1m",
            Timeframe::Minute5 => "5m",
            Timeframe::Minute15 => "15m",
            Timeframe::Minute30 => "30m",
            Timeframe::Hour1 => "1h",
            Timeframe::Day1 => "1d",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Timeframe {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1m" => Ok(Timeframe::Minute1),
            "5m" => Ok(Timeframe::Minute5),
            "15m" => Ok(Timeframe::Minute15),
            "30m" => Ok(Timeframe::Minute30),
            "1h" | "60m" => Ok(Timeframe::Hour1),
            "1d" => Ok(Timeframe::Day1),
            other => Err(AnalysisError::ConfigError(format!(
                "unsupported interval '{}'",
                other
            ))),
        }
    }
}

/// How far back a quote request looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lookback {
    /// End-of-day closes over the last `days` sessions
    Daily { days: u32 },
    /// Bars of the current session at the given interval
    Intraday { interval: Timeframe },
}

impl Default for Lookback {
    fn default() -> Self {
        Lookback::Daily { days: 5 }
    }
}

impl fmt::Display for Lookback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookback::Daily { days } => write!(f, "daily/{}d", days),
            Lookback::Intraday { interval } => write!(f, "intraday/{}", interval),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeframe_parse() {
        assert_eq!("5m".parse::<Timeframe>().unwrap(), Timeframe::Minute5);
        assert_eq!("60m".parse::<Timeframe>().unwrap(), Timeframe::Hour1);
        assert_eq!(" 1D ".parse::<Timeframe>().unwrap(), Timeframe::Day1);
        assert!("7m".parse::<Timeframe>().is_err());
    }

    #[test]
    fn test_timeframe_code_round_trip() {
        for tf in [
            Timeframe::Minute1,
            Timeframe::Minute5,
            Timeframe::Minute15,
            Timeframe::Minute30,
            Timeframe::Hour1,
            Timeframe::Day1,
        ] {
            assert_eq!(tf.code().parse::<Timeframe>().unwrap(), tf);
        }
    }

    #[test]
    fn test_lookback_display() {
        assert_eq!(Lookback::default().to_string(), "daily/5d");
        let intraday = Lookback::Intraday { interval: Timeframe::Minute15 };
        assert_eq!(intraday.to_string(), "intraday/15m");
    }
}
