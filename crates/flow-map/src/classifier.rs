//! Flow Signal Classification
//!
//! Maps a flow strength score onto a discrete signal and a 1-5 strength level.

use serde::{Deserialize, Serialize};

/// Records above this flow strength count as inflows in report summaries
pub const INFLOW_THRESHOLD: f64 = 2.0;
/// Records below this flow strength count as outflows in report summaries
pub const OUTFLOW_THRESHOLD: f64 = -2.0;

/// Discrete capital flow signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlowSignal {
    StrongInflowExtreme,
    StrongInflow,
    MildInflow,
    Neutral,
    MildOutflow,
    StrongOutflow,
    StrongOutflowExtreme,
}

impl FlowSignal {
    /// Classify a flow strength. Bands are closed on their upper bound.
    pub fn from_flow_strength(flow_strength: f64) -> Self {
        if flow_strength > 10.0 {
            FlowSignal::StrongInflowExtreme
        } else if flow_strength > 5.0 {
            FlowSignal::StrongInflow
        } else if flow_strength > INFLOW_THRESHOLD {
            FlowSignal::MildInflow
        } else if flow_strength > OUTFLOW_THRESHOLD {
            FlowSignal::Neutral
        } else if flow_strength > -5.0 {
            FlowSignal::MildOutflow
        } else if flow_strength > -10.0 {
            FlowSignal::StrongOutflow
        } else if flow_strength <= -10.0 {
            FlowSignal::StrongOutflowExtreme
        } else {
            // NaN
            FlowSignal::Neutral
        }
    }

    /// Strength level from 1 (outflow) to 5 (extreme inflow).
    ///
    /// All outflow tiers share level 1; the signal keeps the finer resolution.
    pub fn level(&self) -> u8 {
        match self {
            FlowSignal::StrongInflowExtreme => 5,
            FlowSignal::StrongInflow => 4,
            FlowSignal::MildInflow => 3,
            FlowSignal::Neutral => 2,
            FlowSignal::MildOutflow | FlowSignal::StrongOutflow | FlowSignal::StrongOutflowExtreme => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FlowSignal::StrongInflowExtreme => "strong-inflow-extreme",
            FlowSignal::StrongInflow => "strong-inflow",
            FlowSignal::MildInflow => "mild-inflow",
            FlowSignal::Neutral => "neutral",
            FlowSignal::MildOutflow => "mild-outflow",
            FlowSignal::StrongOutflow => "strong-outflow",
            FlowSignal::StrongOutflowExtreme => "strong-outflow-extreme",
        }
    }

    /// Label shown in the Markdown report
    pub fn label(&self) -> &'static str {
        match self {
            FlowSignal::StrongInflowExtreme => "🔥🔥 爆量流入",
            FlowSignal::StrongInflow => "🔥 強勁流入",
            FlowSignal::MildInflow => "📈 資金流入",
            FlowSignal::Neutral => "➡️ 持平",
            FlowSignal::MildOutflow => "📉 資金流出",
            FlowSignal::StrongOutflow => "❄️ 大量流出",
            FlowSignal::StrongOutflowExtreme => "❄️❄️ 恐慌流出",
        }
    }

    pub fn is_inflow(&self) -> bool {
        matches!(
            self,
            FlowSignal::StrongInflowExtreme | FlowSignal::StrongInflow | FlowSignal::MildInflow
        )
    }

    pub fn is_outflow(&self) -> bool {
        matches!(
            self,
            FlowSignal::MildOutflow | FlowSignal::StrongOutflow | FlowSignal::StrongOutflowExtreme
        )
    }
}

/// Classify a flow strength into its signal and strength level
pub fn classify(flow_strength: f64) -> (FlowSignal, u8) {
    let signal = FlowSignal::from_flow_strength(flow_strength);
    (signal, signal.level())
}
