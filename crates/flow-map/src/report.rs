//! Flow Report
//!
//! Ranks flow records and renders them. Everything here works on records
//! that are already computed; nothing is re-derived.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::etf_tracker::SectorCategory;
use crate::sector_flows::FlowRecord;

/// Section sizes for the inflow/outflow views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportOptions {
    pub top_n: usize,
    pub bottom_n: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self { top_n: 5, bottom_n: 5 }
    }
}

/// Aggregate view of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowSummary {
    pub inflow_count: usize,
    pub outflow_count: usize,
    pub top_sector: Option<String>,
    pub worst_sector: Option<String>,
    #[serde(skip)]
    pub core_count: usize,
    #[serde(skip)]
    pub thematic_count: usize,
}

impl FlowSummary {
    fn from_sorted(records: &[FlowRecord]) -> Self {
        Self {
            inflow_count: records.iter().filter(|r| r.is_inflow()).count(),
            outflow_count: records.iter().filter(|r| r.is_outflow()).count(),
            top_sector: records.first().map(|r| r.display_name().to_string()),
            worst_sector: records.last().map(|r| r.display_name().to_string()),
            core_count: records
                .iter()
                .filter(|r| r.sector_category == SectorCategory::Core)
                .count(),
            thematic_count: records
                .iter()
                .filter(|r| r.sector_category == SectorCategory::Thematic)
                .count(),
        }
    }
}

/// JSON document written for each run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowExport {
    pub update_time: String,
    pub data_count: usize,
    pub sectors: Vec<FlowRecord>,
    pub summary: FlowSummary,
}

/// Ranked records of one run
#[derive(Debug, Clone)]
pub struct FlowReport {
    records: Vec<FlowRecord>,
    summary: FlowSummary,
    options: ReportOptions,
    generated_at: DateTime<Utc>,
}

fn sort_key(value: f64) -> f64 {
    if value.is_nan() {
        f64::NEG_INFINITY
    } else {
        value
    }
}

/// Stable sort by flow strength, strongest first. Ties keep input order.
pub fn sort_by_flow(records: &mut [FlowRecord]) {
    records.sort_by(|a, b| {
        sort_key(b.flow_strength)
            .partial_cmp(&sort_key(a.flow_strength))
            .unwrap_or(Ordering::Equal)
    });
}

impl FlowReport {
    pub fn build(mut records: Vec<FlowRecord>, options: ReportOptions, generated_at: DateTime<Utc>) -> Self {
        sort_by_flow(&mut records);
        let summary = FlowSummary::from_sorted(&records);

        Self {
            records,
            summary,
            options,
            generated_at,
        }
    }

    /// All records, strongest flow first
    pub fn records(&self) -> &[FlowRecord] {
        &self.records
    }

    pub fn summary(&self) -> &FlowSummary {
        &self.summary
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Strongest `top_n` records
    pub fn top_inflows(&self) -> &[FlowRecord] {
        let n = self.options.top_n.min(self.records.len());
        &self.records[..n]
    }

    /// Weakest `bottom_n` records, still in ranked order.
    /// May overlap with `top_inflows` when there are few records.
    pub fn bottom_outflows(&self) -> &[FlowRecord] {
        let n = self.options.bottom_n.min(self.records.len());
        &self.records[self.records.len() - n..]
    }

    pub fn update_time(&self, tz: Tz) -> String {
        self.generated_at
            .with_timezone(&tz)
            .format("%Y-%m-%d %H:%M:%S %Z")
            .to_string()
    }

    /// Calendar date of the run in `tz`, used for history rows
    pub fn run_date(&self, tz: Tz) -> String {
        self.generated_at.with_timezone(&tz).format("%Y-%m-%d").to_string()
    }

    pub fn to_export(&self, tz: Tz) -> FlowExport {
        FlowExport {
            update_time: self.update_time(tz),
            data_count: self.records.len(),
            sectors: self.records.clone(),
            summary: self.summary.clone(),
        }
    }

    pub fn render_markdown(&self, tz: Tz) -> String {
        let mut out = String::new();

        out.push_str("# 🌐 美股板塊資金流向 → 台股族群對應報告\n\n");
        out.push_str(&format!("**更新時間:** {}\n\n", self.update_time(tz)));
        out.push_str("---\n\n");

        out.push_str("## 📊 統計摘要\n\n");
        out.push_str(&format!(
            "- 核心板塊: {} 個 | 主題板塊: {} 個\n",
            self.summary.core_count, self.summary.thematic_count
        ));
        out.push_str(&format!(
            "- 資金流入: {} 個 | 資金流出: {} 個\n\n",
            self.summary.inflow_count, self.summary.outflow_count
        ));
        out.push_str("---\n\n");

        out.push_str(&format!("## 🔥 資金流入排名 (TOP {})\n\n", self.options.top_n));
        for (i, record) in self.top_inflows().iter().enumerate() {
            render_inflow_entry(&mut out, i + 1, record);
        }
        out.push_str("---\n\n");

        out.push_str(&format!("## ❄️ 資金流出警示 (BOTTOM {})\n\n", self.options.bottom_n));
        for (i, record) in self.bottom_outflows().iter().enumerate() {
            render_outflow_entry(&mut out, i + 1, record);
        }
        out.push_str("---\n\n");

        out.push_str("## 💡 投資建議\n\n");
        if let Some(top) = self.records.first() {
            out.push_str(&format!(
                "- ✅ **強勢板塊:** {} ({:+.2}%)\n  - 台股對應: {}\n  - 操作策略: 順勢做多，關注 {}\n",
                top.display_name(),
                top.quote.change_pct,
                join_or_none(&top.tw_groups),
                join_or_none(top.lead_stocks(2)),
            ));
        }
        if let Some(weak) = self.records.last() {
            out.push_str(&format!(
                "- ⚠️ **弱勢板塊:** {} ({:+.2}%)\n  - 台股對應: {}\n  - 操作策略: 避開或等待反彈，觀望 {}\n",
                weak.display_name(),
                weak.quote.change_pct,
                join_or_none(&weak.tw_groups),
                join_or_none(weak.lead_stocks(2)),
            ));
        }

        out
    }
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "（無對應）".to_string()
    } else {
        items.join(", ")
    }
}

fn render_inflow_entry(out: &mut String, rank: usize, record: &FlowRecord) {
    out.push_str(&format!(
        "### {}. {} {} {}\n\n",
        rank,
        record.signal.label(),
        "⭐".repeat(record.strength_level as usize),
        record.display_name()
    ));
    out.push_str(&format!("- **類型:** {}\n", record.sector_category.label()));
    out.push_str(&format!("- **美股代碼:** {}\n", record.ticker()));
    out.push_str(&format!("- **美股價格:** ${:.2}\n", record.quote.price));
    out.push_str(&format!("- **漲跌幅:** {:+.2}%\n", record.quote.change_pct));
    out.push_str(&format!("- **量能比:** {:.2}x\n", record.quote.volume_ratio));
    out.push_str(&format!("- **資金強度:** {:.2}\n", record.flow_strength));
    out.push_str(&format!("- **📍 對應台股族群:** {}\n", join_or_none(&record.tw_groups)));
    out.push_str(&format!("- **💡 建議關注個股:** {}\n", join_or_none(record.lead_stocks(3))));
    if !record.related_themes.is_empty() {
        out.push_str(&format!("- **🔗 相關主題:** {}\n", record.related_themes.join(", ")));
    }
    out.push('\n');
}

fn render_outflow_entry(out: &mut String, rank: usize, record: &FlowRecord) {
    out.push_str(&format!(
        "### {}. {} {}\n\n",
        rank,
        record.signal.label(),
        record.display_name()
    ));
    out.push_str(&format!("- **類型:** {}\n", record.sector_category.label()));
    out.push_str(&format!("- **美股代碼:** {}\n", record.ticker()));
    out.push_str(&format!("- **漲跌幅:** {:+.2}%\n", record.quote.change_pct));
    out.push_str(&format!("- **資金強度:** {:.2}\n", record.flow_strength));
    out.push_str(&format!("- **⚠️ 對應台股族群:** {}\n", join_or_none(&record.tw_groups)));
    out.push_str(&format!("- **⚠️ 建議觀望個股:** {}\n", join_or_none(record.lead_stocks(3))));
    out.push('\n');
}
