//! Taiwan group heat ranking.
//!
//! A Taiwan group can be reached from several US ETFs. Its score is the best
//! `change_pct` among them.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::metrics::round2;
use crate::sector_flows::FlowRecord;

/// A US ETF contributing to a group's score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatSource {
    pub ticker: String,
    pub display_name: String,
    #[serde(serialize_with = "round2")]
    pub change_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupHeat {
    pub tw_group: String,
    #[serde(serialize_with = "round2")]
    pub score_change_pct: f64,
    /// Strongest source first
    pub sources: Vec<HeatSource>,
    /// Representative stocks pooled from every source, first seen first
    pub stocks: Vec<String>,
}

/// Groups ranked by score, hottest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupHeatmap {
    groups: Vec<GroupHeat>,
}

fn by_change_desc(a: f64, b: f64) -> Ordering {
    let key = |v: f64| if v.is_nan() { f64::NEG_INFINITY } else { v };
    key(b).partial_cmp(&key(a)).unwrap_or(Ordering::Equal)
}

impl GroupHeatmap {
    pub fn from_records(records: &[FlowRecord]) -> Self {
        let mut groups: Vec<GroupHeat> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for record in records {
            let source = HeatSource {
                ticker: record.ticker().to_string(),
                display_name: record.display_name().to_string(),
                change_pct: record.quote.change_pct,
            };

            for group in &record.tw_groups {
                let slot = *index.entry(group.clone()).or_insert_with(|| {
                    groups.push(GroupHeat {
                        tw_group: group.clone(),
                        score_change_pct: f64::NEG_INFINITY,
                        sources: Vec::new(),
                        stocks: Vec::new(),
                    });
                    groups.len() - 1
                });

                let heat = &mut groups[slot];
                if source.change_pct > heat.score_change_pct {
                    heat.score_change_pct = source.change_pct;
                }
                heat.sources.push(source.clone());
                for stock in &record.tw_stocks {
                    if !heat.stocks.contains(stock) {
                        heat.stocks.push(stock.clone());
                    }
                }
            }
        }

        for heat in &mut groups {
            heat.sources.sort_by(|a, b| by_change_desc(a.change_pct, b.change_pct));
        }
        groups.sort_by(|a, b| by_change_desc(a.score_change_pct, b.score_change_pct));

        Self { groups }
    }

    pub fn groups(&self) -> &[GroupHeat] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::classify;
    use crate::etf_tracker::SectorCategory;
    use crate::metrics::SectorQuote;

    fn record(ticker: &str, change_pct: f64, groups: &[&str], stocks: &[&str]) -> FlowRecord {
        let (signal, strength_level) = classify(change_pct);
        FlowRecord {
            quote: SectorQuote {
                ticker: ticker.to_string(),
                display_name: ticker.to_lowercase(),
                price: 10.0,
                prev_close: 10.0,
                change_pct,
                volume: 1,
                volume_ratio: 1.0,
            },
            flow_strength: change_pct,
            signal,
            strength_level,
            sector_category: SectorCategory::Core,
            tw_groups: groups.iter().map(|s| s.to_string()).collect(),
            tw_stocks: stocks.iter().map(|s| s.to_string()).collect(),
            related_themes: vec![],
        }
    }

    #[test]
    fn test_group_takes_max_change() {
        let records = vec![
            record("XLK", 1.5, &["半導體", "IC設計"], &["2330 台積電"]),
            record("SOXX", 3.25, &["半導體"], &["2330 台積電", "2303 聯電"]),
            record("XLU", -0.5, &["電力"], &["9908 大台北"]),
        ];

        let heatmap = GroupHeatmap::from_records(&records);
        let names: Vec<&str> = heatmap.groups().iter().map(|g| g.tw_group.as_str()).collect();
        assert_eq!(names, vec!["半導體", "IC設計", "電力"]);

        let semis = &heatmap.groups()[0];
        assert_eq!(semis.score_change_pct, 3.25);
        assert_eq!(semis.sources[0].ticker, "SOXX");
        assert_eq!(semis.sources[1].ticker, "XLK");
        assert_eq!(semis.stocks, vec!["2330 台積電".to_string(), "2303 聯電".to_string()]);
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let records = vec![
            record("A", 2.0, &["甲"], &[]),
            record("B", 2.0, &["乙"], &[]),
        ];
        let heatmap = GroupHeatmap::from_records(&records);
        assert_eq!(heatmap.groups()[0].tw_group, "甲");
        assert_eq!(heatmap.groups()[1].tw_group, "乙");
    }

    #[test]
    fn test_empty_records() {
        let heatmap = GroupHeatmap::from_records(&[]);
        assert!(heatmap.is_empty());
        assert_eq!(serde_json::to_string(&heatmap).unwrap(), "[]");
    }

    #[test]
    fn test_score_rounded_in_json() {
        let heatmap = GroupHeatmap::from_records(&[record("A", 1.23456, &["甲"], &[])]);
        let json = serde_json::to_value(&heatmap).unwrap();
        assert_eq!(json[0]["score_change_pct"], serde_json::json!(1.23));
        assert_eq!(json[0]["sources"][0]["change_pct"], serde_json::json!(1.23));
    }
}
