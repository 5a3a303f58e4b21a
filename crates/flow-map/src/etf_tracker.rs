//! Sector ETF Tracking
//!
//! The tracked ETF universe and the pipeline that turns fetched series into
//! a ranked flow report.

use analysis_core::{AnalysisError, Bar, Lookback, QuoteSource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::metrics;
use crate::report::{FlowReport, ReportOptions};
use crate::sector_flows::{map_quote, FlowRecord};
use crate::sector_mapping::SectorMapping;
use crate::stats::RunStats;

/// Whether an ETF tracks one of the 11 broad sectors or a narrower theme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectorCategory {
    Core,
    Thematic,
}

impl SectorCategory {
    pub fn label(&self) -> &'static str {
        match self {
            SectorCategory::Core => "核心板塊",
            SectorCategory::Thematic => "主題板塊",
        }
    }
}

/// A tracked US ETF
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorETF {
    pub symbol: String,
    pub name_en: String,
    pub name_zh: String,
    pub category: SectorCategory,
}

const CORE_SECTORS: &[(&str, &str, &str)] = &[
    ("XLK", "科技", "Technology"),
    ("XLF", "金融", "Financials"),
    ("XLV", "醫療保健", "Healthcare"),
    ("XLE", "能源", "Energy"),
    ("XLI", "工業", "Industrials"),
    ("XLP", "必需消費", "Consumer Staples"),
    ("XLY", "非必需消費", "Consumer Discretionary"),
    ("XLB", "原物料", "Materials"),
    ("XLRE", "房地產", "Real Estate"),
    ("XLU", "公用事業", "Utilities"),
    ("XLC", "通訊服務", "Communication Services"),
];

const THEME_ETFS: &[(&str, &str, &str)] = &[
    ("TAN", "太陽能", "Solar Energy"),
    ("SOXX", "半導體", "Semiconductors"),
    ("IGV", "應用軟件", "Software"),
    ("IHI", "醫療設備", "Medical Devices"),
    ("XRT", "零售", "Retail"),
    ("ARKK", "創新科技", "Innovation"),
    ("BOTZ", "機器人與AI", "Robotics & AI"),
    ("FINX", "金融科技", "FinTech"),
    ("CLOU", "雲端運算", "Cloud Computing"),
    ("HACK", "網路安全", "Cybersecurity"),
];

impl SectorETF {
    pub fn new(symbol: &str, name_zh: &str, name_en: &str, category: SectorCategory) -> Self {
        Self {
            symbol: symbol.to_string(),
            name_en: name_en.to_string(),
            name_zh: name_zh.to_string(),
            category,
        }
    }

    /// The SPDR select sector ETFs
    pub fn core_sectors() -> Vec<SectorETF> {
        CORE_SECTORS
            .iter()
            .map(|(symbol, zh, en)| SectorETF::new(symbol, zh, en, SectorCategory::Core))
            .collect()
    }

    /// Theme ETFs tracked alongside the core sectors
    pub fn theme_etfs() -> Vec<SectorETF> {
        THEME_ETFS
            .iter()
            .map(|(symbol, zh, en)| SectorETF::new(symbol, zh, en, SectorCategory::Thematic))
            .collect()
    }

    /// Core sectors first, then themes when requested
    pub fn universe(include_themes: bool) -> Vec<SectorETF> {
        let mut etfs = Self::core_sectors();
        if include_themes {
            etfs.extend(Self::theme_etfs());
        }
        etfs
    }

    /// Bilingual name, e.g. "科技 Technology"
    pub fn display_name(&self) -> String {
        format!("{} {}", self.name_zh, self.name_en)
    }
}

/// Result of fetching one ETF. Failures are carried, not raised.
#[derive(Debug)]
pub struct FetchOutcome {
    pub etf: SectorETF,
    pub result: Result<Vec<Bar>, AnalysisError>,
}

/// Output of one pipeline pass
#[derive(Debug, Clone)]
pub struct TrackerRun {
    pub report: FlowReport,
    pub stats: RunStats,
}

/// Fetches the ETF universe and builds a flow report from it
pub struct SectorETFTracker {
    etfs: Vec<SectorETF>,
    mapping: SectorMapping,
    lookback: Lookback,
    options: ReportOptions,
}

impl SectorETFTracker {
    /// Tracker over the full universe with default lookback and report sizes
    pub fn new(mapping: SectorMapping) -> Self {
        Self {
            etfs: SectorETF::universe(true),
            mapping,
            lookback: Lookback::default(),
            options: ReportOptions::default(),
        }
    }

    pub fn with_etfs(mut self, etfs: Vec<SectorETF>) -> Self {
        self.etfs = etfs;
        self
    }

    pub fn with_lookback(mut self, lookback: Lookback) -> Self {
        self.lookback = lookback;
        self
    }

    pub fn with_options(mut self, options: ReportOptions) -> Self {
        self.options = options;
        self
    }

    /// Get ETF symbols to track
    pub fn symbols(&self) -> Vec<String> {
        self.etfs.iter().map(|e| e.symbol.clone()).collect()
    }

    pub fn lookback(&self) -> Lookback {
        self.lookback
    }

    /// Fetch every ETF one at a time. One outcome per ETF, in universe order.
    pub async fn fetch_all<S: QuoteSource + ?Sized>(&self, source: &S) -> Vec<FetchOutcome> {
        let mut outcomes = Vec::with_capacity(self.etfs.len());

        for etf in &self.etfs {
            tracing::debug!(ticker = %etf.symbol, source = source.name(), lookback = %self.lookback, "Fetching");
            let result = source.fetch_series(&etf.symbol, self.lookback).await;
            outcomes.push(FetchOutcome {
                etf: etf.clone(),
                result,
            });
        }

        outcomes
    }

    /// Turn fetch outcomes into a ranked report. Every skipped ticker gets one log line.
    pub fn process(&self, outcomes: Vec<FetchOutcome>, generated_at: DateTime<Utc>) -> TrackerRun {
        let mut stats = RunStats {
            requested: outcomes.len(),
            ..Default::default()
        };
        let mut records: Vec<FlowRecord> = Vec::with_capacity(outcomes.len());

        for FetchOutcome { etf, result } in outcomes {
            let series = match result {
                Ok(series) => series,
                Err(e) => {
                    tracing::warn!(ticker = %etf.symbol, error = %e, "Fetch failed, skipping");
                    stats.fetch_failed += 1;
                    continue;
                }
            };

            let quote = match metrics::compute_for(self.lookback, &etf.symbol, &etf.display_name(), &series) {
                Ok(quote) => quote,
                Err(reason) => {
                    tracing::warn!(ticker = %etf.symbol, reason = %reason, "Quote dropped");
                    stats.dropped += 1;
                    continue;
                }
            };

            match map_quote(quote, &self.mapping) {
                Some(record) => {
                    tracing::info!(
                        ticker = %record.ticker(),
                        change_pct = %format!("{:+.2}", record.quote.change_pct),
                        volume_ratio = %format!("{:.2}", record.quote.volume_ratio),
                        flow_strength = %format!("{:.2}", record.flow_strength),
                        signal = record.signal.as_str(),
                        "Sector processed"
                    );
                    records.push(record);
                }
                None => {
                    tracing::info!(ticker = %etf.symbol, "No Taiwan mapping, excluded");
                    stats.unmapped += 1;
                }
            }
        }

        stats.reported = records.len();
        let report = FlowReport::build(records, self.options, generated_at);

        TrackerRun { report, stats }
    }

    /// Fetch and process in one pass
    pub async fn run<S: QuoteSource + ?Sized>(&self, source: &S) -> TrackerRun {
        let started = Instant::now();
        let outcomes = self.fetch_all(source).await;
        let mut run = self.process(outcomes, Utc::now());
        run.stats.elapsed = started.elapsed();
        run
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::FlowSignal;
    use crate::sector_mapping::MappingEntry;
    use async_trait::async_trait;
    use chrono::Duration;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// In-memory quote source keyed by ticker
    #[derive(Default)]
    struct StubSource {
        series: HashMap<String, Vec<(f64, f64)>>,
        calls: Mutex<Vec<String>>,
    }

    impl StubSource {
        fn with(mut self, ticker: &str, samples: &[(f64, f64)]) -> Self {
            self.series.insert(ticker.to_string(), samples.to_vec());
            self
        }
    }

    #[async_trait]
    impl QuoteSource for StubSource {
        async fn fetch_series(&self, symbol: &str, _lookback: Lookback) -> Result<Vec<Bar>, AnalysisError> {
            self.calls.lock().unwrap().push(symbol.to_string());
            let samples = self
                .series
                .get(symbol)
                .ok_or_else(|| AnalysisError::SymbolNotFound(symbol.to_string()))?;
            let start = Utc::now() - Duration::days(samples.len() as i64);
            Ok(samples
                .iter()
                .enumerate()
                .map(|(i, (close, volume))| Bar::close_only(start + Duration::days(i as i64), *close, *volume))
                .collect())
        }

        fn name(&self) -> &str {
            "stub"
        }
    }

    fn entry(category: SectorCategory, group: &str) -> MappingEntry {
        MappingEntry {
            category,
            tw_groups: vec![group.to_string()],
            tw_stocks: vec![],
            related_themes: vec![],
        }
    }

    fn etf(symbol: &str) -> SectorETF {
        SectorETF::new(symbol, symbol, symbol, SectorCategory::Core)
    }

    #[test]
    fn test_universe() {
        assert_eq!(SectorETF::core_sectors().len(), 11);
        assert_eq!(SectorETF::theme_etfs().len(), 10);
        assert_eq!(SectorETF::universe(false).len(), 11);

        let all = SectorETF::universe(true);
        assert_eq!(all.len(), 21);
        assert_eq!(all[0].display_name(), "科技 Technology");
        assert!(all[11..].iter().all(|e| e.category == SectorCategory::Thematic));
    }

    #[test]
    fn test_core_sectors_all_mapped() {
        let mapping = SectorMapping::taiwan_default();
        assert!(SectorETF::core_sectors().iter().all(|e| mapping.contains(&e.symbol)));
    }

    #[tokio::test]
    async fn test_pipeline_skips_failures_drops_and_misses() {
        let mapping = SectorMapping::default()
            .with_entry("AAA", entry(SectorCategory::Core, "半導體"))
            .with_entry("BBB", entry(SectorCategory::Core, "金融"))
            .with_entry("MISSING", entry(SectorCategory::Core, "航運"));

        let source = StubSource::default()
            .with("AAA", &[(95.0, 1_000_000.0), (100.0, 3_000_000.0)])
            // previous close of zero
            .with("BBB", &[(0.0, 1_000.0), (10.0, 1_000.0)])
            // no mapping entry
            .with("CCC", &[(10.0, 1_000.0), (11.0, 1_000.0)]);

        let tracker = SectorETFTracker::new(mapping)
            .with_etfs(vec![etf("AAA"), etf("BBB"), etf("CCC"), etf("MISSING")]);

        let run = tracker.run(&source).await;

        assert_eq!(*source.calls.lock().unwrap(), vec!["AAA", "BBB", "CCC", "MISSING"]);
        assert_eq!(run.stats.requested, 4);
        assert_eq!(run.stats.fetch_failed, 1);
        assert_eq!(run.stats.dropped, 1);
        assert_eq!(run.stats.unmapped, 1);
        assert_eq!(run.stats.reported, 1);

        let records = run.report.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].ticker(), "AAA");
        assert_eq!(records[0].signal, FlowSignal::StrongInflow);
        assert_eq!(records[0].strength_level, 4);
        assert_eq!(records[0].tw_groups, vec!["半導體".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_run_is_valid() {
        let tracker = SectorETFTracker::new(SectorMapping::taiwan_default()).with_etfs(vec![etf("XLK")]);
        let run = tracker.run(&StubSource::default()).await;

        assert!(run.report.is_empty());
        assert_eq!(run.report.summary().top_sector, None);
        assert_eq!(run.report.summary().worst_sector, None);
        assert_eq!(run.stats.fetch_failed, 1);
    }

    #[tokio::test]
    async fn test_equal_strengths_keep_universe_order() {
        let mapping = SectorMapping::default()
            .with_entry("P", entry(SectorCategory::Core, "p"))
            .with_entry("Q", entry(SectorCategory::Thematic, "q"))
            .with_entry("R", entry(SectorCategory::Core, "r"));
        let flat = [(100.0, 1_000.0), (101.0, 1_000.0)];
        let source = StubSource::default().with("P", &flat).with("Q", &flat).with("R", &flat);

        let tracker = SectorETFTracker::new(mapping).with_etfs(vec![etf("R"), etf("P"), etf("Q")]);
        let run = tracker.run(&source).await;

        let order: Vec<&str> = run.report.records().iter().map(|r| r.ticker()).collect();
        assert_eq!(order, vec!["R", "P", "Q"]);
        assert_eq!(run.report.summary().thematic_count, 1);
    }

    /// Collects formatted log output for assertions
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_zero_previous_close_logged_once() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();

        let now = Utc::now();
        let outcomes = vec![
            FetchOutcome {
                etf: etf("XLE"),
                result: Ok(vec![
                    Bar::close_only(now - Duration::days(1), 0.0, 1_000.0),
                    Bar::close_only(now, 50.0, 1_000.0),
                ]),
            },
            FetchOutcome {
                etf: etf("XLK"),
                result: Ok(vec![
                    Bar::close_only(now - Duration::days(1), 95.0, 1_000_000.0),
                    Bar::close_only(now, 100.0, 3_000_000.0),
                ]),
            },
        ];
        let tracker = SectorETFTracker::new(SectorMapping::taiwan_default());

        let run = tracing::subscriber::with_default(subscriber, || tracker.process(outcomes, now));

        let output = logs.contents();
        let warnings: Vec<&str> = output.lines().filter(|line| line.contains("WARN")).collect();
        assert_eq!(warnings.len(), 1, "unexpected warnings: {:?}", warnings);
        assert!(warnings[0].contains("Quote dropped"));
        assert!(warnings[0].contains("ticker=XLE"));
        assert_eq!(output.matches("XLE").count(), 1);

        assert_eq!(run.stats.dropped, 1);
        assert_eq!(run.stats.reported, 1);
        assert_eq!(run.report.records()[0].ticker(), "XLK");
    }

    #[test]
    fn test_process_counts_short_series_as_dropped() {
        let tracker = SectorETFTracker::new(SectorMapping::taiwan_default());
        let outcomes = vec![FetchOutcome {
            etf: etf("XLK"),
            result: Ok(vec![Bar::close_only(Utc::now(), 10.0, 100.0)]),
        }];

        let run = tracker.process(outcomes, Utc::now());
        assert_eq!(run.stats.dropped, 1);
        assert!(run.report.is_empty());
    }
}
