use async_trait::async_trait;
use crate::{AnalysisError, Bar, Lookback};

/// A provider of price/volume history for a single symbol.
///
/// Implementations return bars oldest first. An empty vector is a valid
/// answer; callers decide whether the series is long enough to use.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch_series(&self, symbol: &str, lookback: Lookback) -> Result<Vec<Bar>, AnalysisError>;

    /// Short name used in log lines
    fn name(&self) -> &str;
}
