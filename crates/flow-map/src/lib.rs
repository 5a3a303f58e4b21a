//! Flow Map Module
//!
//! Estimates capital flows into US sector and theme ETFs and maps them onto
//! Taiwan industry groups and representative stocks.

pub mod classifier;
pub mod etf_tracker;
pub mod heatmap;
pub mod metrics;
pub mod report;
pub mod sector_flows;
pub mod sector_mapping;
pub mod stats;

pub use classifier::{classify, FlowSignal, INFLOW_THRESHOLD, OUTFLOW_THRESHOLD};
pub use etf_tracker::{FetchOutcome, SectorCategory, SectorETF, SectorETFTracker, TrackerRun};
pub use heatmap::{GroupHeat, GroupHeatmap, HeatSource};
pub use metrics::{compute, compute_for, compute_intraday, round_to, QuoteDropped, SectorQuote};
pub use report::{sort_by_flow, FlowExport, FlowReport, FlowSummary, ReportOptions};
pub use sector_flows::{map_quote, FlowRecord};
pub use sector_mapping::{MappingEntry, MappingError, SectorMapping};
pub use stats::RunStats;
