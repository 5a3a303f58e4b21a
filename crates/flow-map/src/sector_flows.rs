//! Sector Flow Records
//!
//! Joins a computed quote with its Taiwan-side mapping.

use serde::{Deserialize, Serialize};

use crate::classifier::{classify, FlowSignal, INFLOW_THRESHOLD, OUTFLOW_THRESHOLD};
use crate::etf_tracker::SectorCategory;
use crate::metrics::{round2, SectorQuote};
use crate::sector_mapping::SectorMapping;

/// A sector quote enriched with its flow classification and Taiwan mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowRecord {
    #[serde(flatten)]
    pub quote: SectorQuote,
    /// change_pct × volume_ratio
    #[serde(serialize_with = "round2")]
    pub flow_strength: f64,
    pub signal: FlowSignal,
    /// 1 (outflow) to 5 (extreme inflow)
    pub strength_level: u8,
    pub sector_category: SectorCategory,
    pub tw_groups: Vec<String>,
    pub tw_stocks: Vec<String>,
    pub related_themes: Vec<String>,
}

impl FlowRecord {
    pub fn ticker(&self) -> &str {
        &self.quote.ticker
    }

    pub fn display_name(&self) -> &str {
        &self.quote.display_name
    }

    pub fn is_inflow(&self) -> bool {
        self.flow_strength > INFLOW_THRESHOLD
    }

    pub fn is_outflow(&self) -> bool {
        self.flow_strength < OUTFLOW_THRESHOLD
    }

    /// First `n` representative stocks
    pub fn lead_stocks(&self, n: usize) -> &[String] {
        &self.tw_stocks[..n.min(self.tw_stocks.len())]
    }
}

/// Join a quote with the mapping table.
///
/// Returns `None` when the ticker has no entry. An entry with empty lists
/// still produces a record.
pub fn map_quote(quote: SectorQuote, mapping: &SectorMapping) -> Option<FlowRecord> {
    let entry = mapping.get(&quote.ticker)?;
    let flow_strength = quote.flow_strength();
    let (signal, strength_level) = classify(flow_strength);

    Some(FlowRecord {
        quote,
        flow_strength,
        signal,
        strength_level,
        sector_category: entry.category,
        tw_groups: entry.tw_groups.clone(),
        tw_stocks: entry.tw_stocks.clone(),
        related_themes: entry.related_themes.clone(),
    })
}
