//! One full tracker pass: fetch, rank, write.

use analysis_core::QuoteSource;
use anyhow::{Context, Result};
use flow_map::{RunStats, SectorETF, SectorETFTracker, SectorMapping};

use crate::config::TrackerConfig;
use crate::output;

/// Built-in table unless a mapping file is configured
pub fn load_mapping(config: &TrackerConfig) -> Result<SectorMapping> {
    match &config.mapping_file {
        Some(path) => {
            let mapping = SectorMapping::from_json_file(path)
                .with_context(|| format!("failed to load mapping from {}", path.display()))?;
            tracing::info!(path = %path.display(), entries = mapping.len(), "Loaded sector mapping");
            Ok(mapping)
        }
        None => Ok(SectorMapping::taiwan_default()),
    }
}

pub fn build_tracker(config: &TrackerConfig, mapping: SectorMapping) -> SectorETFTracker {
    SectorETFTracker::new(mapping)
        .with_etfs(SectorETF::universe(config.include_themes))
        .with_lookback(config.lookback())
        .with_options(config.report_options())
}

/// Run the pipeline once. Per-ticker problems are logged and skipped; only
/// mapping or output failures surface as errors.
pub async fn run_iteration(config: &TrackerConfig, source: &dyn QuoteSource) -> Result<RunStats> {
    let mapping = load_mapping(config)?;
    let tracker = build_tracker(config, mapping);

    tracing::info!(
        tickers = tracker.symbols().len(),
        lookback = %tracker.lookback(),
        source = source.name(),
        "Fetching sector ETFs"
    );

    let run = tracker.run(source).await;
    let markdown = run.report.render_markdown(config.timezone);

    let paths = output::write_all(&config.output_dir, &run.report, &markdown, config.timezone)?;

    tracing::info!("\n{}", markdown);
    tracing::info!(
        json = %paths.json.display(),
        csv = %paths.csv.display(),
        markdown = %paths.markdown.display(),
        heatmap = %paths.heatmap.display(),
        "Outputs written"
    );
    run.stats.log_summary("sector flow");

    Ok(run.stats)
}
