use analysis_core::{AnalysisError, Bar, Lookback, QuoteSource};
use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com";
const INTRADAY_RANGE_DAYS: u32 = 5;
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Yahoo Finance chart client.
///
/// Requests are issued one at a time; the only guard is the per-request
/// timeout configured on the underlying HTTP client.
#[derive(Clone)]
pub struct YahooClient {
    client: Client,
    base_url: String,
}

impl YahooClient {
    pub fn new(timeout: Duration) -> Result<Self, AnalysisError> {
        Self::with_base_url(DEFAULT_BASE_URL, timeout)
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, AnalysisError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| AnalysisError::ConfigError(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get chart bars for a symbol, oldest first
    pub async fn get_chart(&self, symbol: &str, lookback: Lookback) -> Result<Vec<Bar>, AnalysisError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        let (range, interval) = chart_params(lookback);

        tracing::debug!(symbol, %range, interval, "Requesting Yahoo chart");

        let response = self
            .client
            .get(&url)
            .query(&[("range", range.as_str()), ("interval", interval)])
            .send()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(AnalysisError::SymbolNotFound(symbol.to_string()));
        }
        if !status.is_success() {
            return Err(AnalysisError::ApiError(format!(
                "HTTP {}: {}",
                status,
                response.text().await.unwrap_or_default()
            )));
        }

        let chart: ChartResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::InvalidData(e.to_string()))?;

        parse_chart(symbol, chart)
    }
}

#[async_trait]
impl QuoteSource for YahooClient {
    async fn fetch_series(&self, symbol: &str, lookback: Lookback) -> Result<Vec<Bar>, AnalysisError> {
        self.get_chart(symbol, lookback).await
    }

    fn name(&self) -> &str {
        "yahoo"
    }
}

/// Map a lookback onto the chart endpoint's `range` and `interval` parameters.
///
/// Intraday requests span several sessions so the prior session's close is
/// available as a baseline.
pub fn chart_params(lookback: Lookback) -> (String, &'static str) {
    match lookback {
        Lookback::Daily { days } => (format!("{}d", days), "1d"),
        Lookback::Intraday { interval } => (format!("{}d", INTRADAY_RANGE_DAYS), interval.code()),
    }
}

/// Convert a decoded chart payload into bars.
///
/// Samples without a close (the still-forming candle, halted sessions) are
/// skipped. A missing volume counts as zero.
pub fn parse_chart(symbol: &str, response: ChartResponse) -> Result<Vec<Bar>, AnalysisError> {
    if let Some(err) = response.chart.error {
        return Err(AnalysisError::ApiError(format!(
            "{}: {}",
            err.code,
            err.description.unwrap_or_default()
        )));
    }

    let result = response
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| AnalysisError::InsufficientData(format!("No chart data for {}", symbol)))?;

    let timestamps = match result.timestamp {
        Some(ts) => ts,
        None => return Ok(Vec::new()),
    };

    let quote = result
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| AnalysisError::InvalidData(format!("No quote indicators for {}", symbol)))?;

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, ts) in timestamps.iter().enumerate() {
        let close = match value_at(&quote.close, i) {
            Some(c) => c,
            None => continue,
        };
        let timestamp = DateTime::from_timestamp(*ts, 0)
            .ok_or_else(|| AnalysisError::InvalidData(format!("Invalid timestamp {}", ts)))?;

        bars.push(Bar {
            timestamp,
            open: value_at(&quote.open, i).unwrap_or(close),
            high: value_at(&quote.high, i).unwrap_or(close),
            low: value_at(&quote.low, i).unwrap_or(close),
            close,
            volume: value_at(&quote.volume, i).unwrap_or(0.0),
            vwap: None,
        });
    }

    Ok(bars)
}

fn value_at(series: &Option<Vec<Option<f64>>>, i: usize) -> Option<f64> {
    series.as_ref().and_then(|s| s.get(i).copied().flatten())
}

// Chart endpoint payload
#[derive(Debug, Deserialize)]
pub struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    open: Option<Vec<Option<f64>>>,
    high: Option<Vec<Option<f64>>>,
    low: Option<Vec<Option<f64>>>,
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<f64>>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::Timeframe;

    fn decode(json: &str) -> ChartResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_chart_params() {
        assert_eq!(chart_params(Lookback::Daily { days: 5 }), ("5d".to_string(), "1d"));
        assert_eq!(
            chart_params(Lookback::Intraday { interval: Timeframe::Minute5 }),
            ("5d".to_string(), "5m")
        );
    }

    #[test]
    fn test_parse_chart_skips_null_closes() {
        let json = r#"{"chart":{"result":[{
            "meta":{"symbol":"XLK","currency":"USD"},
            "timestamp":[1700000000,1700086400,1700172800],
            "indicators":{"quote":[{
                "open":[94.0,96.0,null],
                "high":[96.0,101.0,null],
                "low":[93.5,95.5,null],
                "close":[95.0,100.0,null],
                "volume":[1000000,null,null]
            }]}
        }],"error":null}}"#;

        let bars = parse_chart("XLK", decode(json)).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 95.0);
        assert_eq!(bars[0].volume, 1_000_000.0);
        assert_eq!(bars[1].close, 100.0);
        assert_eq!(bars[1].volume, 0.0);
        assert!(bars[0].timestamp < bars[1].timestamp);
    }

    #[test]
    fn test_parse_chart_error_payload() {
        let json = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let err = parse_chart("ZZZZ", decode(json)).unwrap_err();
        assert!(matches!(err, AnalysisError::ApiError(msg) if msg.contains("delisted")));
    }

    #[test]
    fn test_parse_chart_without_timestamps_is_empty() {
        let json = r#"{"chart":{"result":[{"meta":{},"indicators":{"quote":[{}]}}],"error":null}}"#;
        let bars = parse_chart("XLK", decode(json)).unwrap();
        assert!(bars.is_empty());
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = YahooClient::with_base_url("http://localhost:9999/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:9999");
    }
}
