//! File writers for a finished run.

use anyhow::{Context, Result};
use chrono_tz::Tz;
use flow_map::{round_to, FlowRecord, FlowReport, GroupHeatmap};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

pub const JSON_FILE: &str = "sector_flow_data.json";
pub const CSV_FILE: &str = "sector_flow_history.csv";
pub const MARKDOWN_FILE: &str = "SECTOR_REPORT.md";
pub const HEATMAP_FILE: &str = "tw_groups_ranked.json";

const LIST_SEPARATOR: &str = "|";

/// Paths written by `write_all`
#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub json: PathBuf,
    pub csv: PathBuf,
    pub markdown: PathBuf,
    pub heatmap: PathBuf,
}

/// One history row. List fields are joined with `|`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRow {
    pub ticker: String,
    pub display_name: String,
    pub price: f64,
    pub prev_close: f64,
    pub change_pct: f64,
    pub volume: u64,
    pub volume_ratio: f64,
    pub flow_strength: f64,
    pub signal: String,
    pub strength_level: u8,
    pub sector_category: String,
    pub tw_groups: String,
    pub tw_stocks: String,
    pub related_themes: String,
    pub date: String,
}

impl HistoryRow {
    pub fn from_record(record: &FlowRecord, date: &str) -> Self {
        Self {
            ticker: record.ticker().to_string(),
            display_name: record.display_name().to_string(),
            price: round_to(record.quote.price, 2),
            prev_close: round_to(record.quote.prev_close, 2),
            change_pct: round_to(record.quote.change_pct, 2),
            volume: record.quote.volume,
            volume_ratio: round_to(record.quote.volume_ratio, 2),
            flow_strength: round_to(record.flow_strength, 2),
            signal: record.signal.as_str().to_string(),
            strength_level: record.strength_level,
            sector_category: match record.sector_category {
                flow_map::SectorCategory::Core => "core".to_string(),
                flow_map::SectorCategory::Thematic => "thematic".to_string(),
            },
            tw_groups: record.tw_groups.join(LIST_SEPARATOR),
            tw_stocks: record.tw_stocks.join(LIST_SEPARATOR),
            related_themes: record.related_themes.join(LIST_SEPARATOR),
            date: date.to_string(),
        }
    }
}

/// Overwrite the JSON snapshot
pub fn write_json(dir: &Path, report: &FlowReport, tz: Tz) -> Result<PathBuf> {
    let path = dir.join(JSON_FILE);
    let json = serde_json::to_string_pretty(&report.to_export(tz))?;
    fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

/// Append one row per record. The header is written only when the file is new or empty.
pub fn append_csv(dir: &Path, report: &FlowReport, tz: Tz) -> Result<PathBuf> {
    let path = dir.join(CSV_FILE);
    let needs_header = fs::metadata(&path).map(|m| m.len() == 0).unwrap_or(true);

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_header)
        .from_writer(file);

    let date = report.run_date(tz);
    for record in report.records() {
        writer.serialize(HistoryRow::from_record(record, &date))?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;

    Ok(path)
}

/// Overwrite the Markdown report
pub fn write_markdown(dir: &Path, markdown: &str) -> Result<PathBuf> {
    let path = dir.join(MARKDOWN_FILE);
    fs::write(&path, markdown).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

pub fn write_heatmap(dir: &Path, heatmap: &GroupHeatmap) -> Result<PathBuf> {
    let path = dir.join(HEATMAP_FILE);
    let json = serde_json::to_string_pretty(heatmap)?;
    fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

/// Write every output for one run, creating `dir` if needed
pub fn write_all(dir: &Path, report: &FlowReport, markdown: &str, tz: Tz) -> Result<OutputPaths> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create output dir {}", dir.display()))?;

    let heatmap = GroupHeatmap::from_records(report.records());

    Ok(OutputPaths {
        json: write_json(dir, report, tz)?,
        csv: append_csv(dir, report, tz)?,
        markdown: write_markdown(dir, markdown)?,
        heatmap: write_heatmap(dir, &heatmap)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use flow_map::{map_quote, FlowExport, ReportOptions, SectorMapping, SectorQuote};

    fn report(tickers: &[(&str, f64)]) -> FlowReport {
        let mapping = SectorMapping::taiwan_default();
        let records = tickers
            .iter()
            .filter_map(|(ticker, change_pct)| {
                map_quote(
                    SectorQuote {
                        ticker: ticker.to_string(),
                        display_name: format!("{} name", ticker),
                        price: 101.234,
                        prev_close: 100.0,
                        change_pct: *change_pct,
                        volume: 5_000,
                        volume_ratio: 1.0,
                    },
                    &mapping,
                )
            })
            .collect();
        let at = Utc.with_ymd_and_hms(2024, 5, 10, 20, 0, 0).unwrap();
        FlowReport::build(records, ReportOptions::default(), at)
    }

    #[test]
    fn test_csv_appends_without_second_header() {
        let dir = tempfile::tempdir().unwrap();
        let report = report(&[("XLK", 3.0), ("XLF", -1.0)]);

        append_csv(dir.path(), &report, chrono_tz::Asia::Taipei).unwrap();
        append_csv(dir.path(), &report, chrono_tz::Asia::Taipei).unwrap();

        let content = fs::read_to_string(dir.path().join(CSV_FILE)).unwrap();
        assert_eq!(content.matches("ticker,display_name").count(), 1);

        let mut reader = csv::Reader::from_path(dir.path().join(CSV_FILE)).unwrap();
        let rows: Vec<HistoryRow> = reader.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].ticker, "XLK");
        assert_eq!(rows[0].date, "2024-05-11");
        assert_eq!(rows[0].price, 101.23);
        assert_eq!(rows[0].sector_category, "core");
        assert!(rows[0].tw_groups.contains(LIST_SEPARATOR));
    }

    #[test]
    fn test_unmapped_ticker_absent_from_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let report = report(&[("XLK", 3.0), ("ARKK", 9.0)]);
        let markdown = report.render_markdown(chrono_tz::Asia::Taipei);

        let paths = write_all(dir.path(), &report, &markdown, chrono_tz::Asia::Taipei).unwrap();

        let json = fs::read_to_string(&paths.json).unwrap();
        let export: FlowExport = serde_json::from_str(&json).unwrap();
        assert_eq!(export.data_count, 1);
        assert!(!json.contains("ARKK\""));

        let csv = fs::read_to_string(&paths.csv).unwrap();
        assert!(!csv.contains("ARKK,"));
        assert!(paths.markdown.exists());
        assert!(paths.heatmap.exists());
    }

    #[test]
    fn test_empty_report_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("out");
        let report = report(&[]);
        let markdown = report.render_markdown(chrono_tz::Asia::Taipei);

        let paths = write_all(&out, &report, &markdown, chrono_tz::Asia::Taipei).unwrap();

        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&paths.json).unwrap()).unwrap();
        assert_eq!(json["data_count"], 0);
        assert!(json["summary"]["top_sector"].is_null());
        assert_eq!(fs::read_to_string(&paths.heatmap).unwrap(), "[]");
    }
}
