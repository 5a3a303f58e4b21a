//! US Sector → Taiwan Group Mapping
//!
//! Static configuration associating each US sector/theme ETF with Taiwan
//! industry groups and representative stocks. Built once at startup, either
//! from the built-in table or from a JSON file, and handed to the mapper.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

use crate::etf_tracker::SectorCategory;

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("failed to read mapping file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid mapping JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("mapping table is empty")]
    Empty,
}

/// Taiwan-side counterpart of one US ticker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub category: SectorCategory,
    /// Taiwan industry group names
    #[serde(default)]
    pub tw_groups: Vec<String>,
    /// Representative stocks as "code name"
    #[serde(default)]
    pub tw_stocks: Vec<String>,
    /// Related theme ETF tickers
    #[serde(default)]
    pub related_themes: Vec<String>,
}

/// Read-only ticker → Taiwan mapping table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectorMapping {
    entries: BTreeMap<String, MappingEntry>,
}

type Row = (
    &'static str,
    SectorCategory,
    &'static [&'static str],
    &'static [&'static str],
    &'static [&'static str],
);

const DEFAULT_TABLE: &[Row] = &[
    (
        "XLK",
        SectorCategory::Core,
        &["半導體", "IC設計", "電腦及週邊設備", "電子零組件", "光電"],
        &["2330 台積電", "2454 聯發科", "2317 鴻海", "2303 聯電", "3711 日月光投控"],
        &["SOXX", "IGV", "CLOU"],
    ),
    (
        "XLF",
        SectorCategory::Core,
        &["金控", "銀行", "證券", "保險"],
        &["2881 富邦金", "2882 國泰金", "2886 兆豐金", "2891 中信金", "2884 玉山金"],
        &["FINX"],
    ),
    (
        "XLV",
        SectorCategory::Core,
        &["生技醫療", "醫療器材"],
        &["4736 泰博", "6547 高端疫苗", "6446 藥華藥", "1789 神隆", "4174 浩鼎"],
        &["IHI"],
    ),
    (
        "XLE",
        SectorCategory::Core,
        &["油電燃氣", "綠能環保", "太陽能"],
        &["6505 台塑化", "1326 台化", "3481 群創", "6488 環球晶", "3576 聯合再生"],
        &["TAN"],
    ),
    (
        "XLI",
        SectorCategory::Core,
        &["航運", "塑膠", "水泥", "機械", "電機"],
        &["2603 長榮", "2609 陽明", "2615 萬海", "1101 台泥", "2207 和泰車"],
        &["BOTZ"],
    ),
    (
        "XLP",
        SectorCategory::Core,
        &["食品", "貿易百貨", "觀光餐飲"],
        &["1301 台塑", "1216 統一", "2912 統一超", "2105 正新", "1227 佳格"],
        &[],
    ),
    (
        "XLY",
        SectorCategory::Core,
        &["汽車", "紡織", "電商零售", "百貨"],
        &["2201 裕隆", "2207 和泰車", "2371 大同", "2915 潤泰全", "2845 遠東銀"],
        &["XRT"],
    ),
    (
        "XLB",
        SectorCategory::Core,
        &["鋼鐵", "化學", "塑膠", "水泥"],
        &["2002 中鋼", "1303 南亞", "1326 台化", "6505 台塑化", "1101 台泥"],
        &[],
    ),
    (
        "XLRE",
        SectorCategory::Core,
        &["營建", "不動產", "REITs"],
        &["2501 國建", "2515 中工", "5522 遠雄", "2542 興富發", "9945 潤泰新"],
        &[],
    ),
    (
        "XLU",
        SectorCategory::Core,
        &["電信", "電力", "天然氣"],
        &["3045 台灣大", "4904 遠傳", "2412 中華電", "9802 鈺齊-KY"],
        &[],
    ),
    (
        "XLC",
        SectorCategory::Core,
        &["電信", "媒體", "網路服務"],
        &["2412 中華電", "3045 台灣大", "4904 遠傳", "2498 宏達電", "3008 大立光"],
        &[],
    ),
    (
        "TAN",
        SectorCategory::Thematic,
        &["太陽能", "綠能", "電池"],
        &["6488 環球晶", "3576 聯合再生", "6443 元晶", "3514 昱晶", "6869 雲豹能源"],
        &[],
    ),
    (
        "SOXX",
        SectorCategory::Thematic,
        &["半導體", "IC設計", "晶圓代工", "封測"],
        &["2330 台積電", "2454 聯發科", "2303 聯電", "3711 日月光投控", "3034 聯詠"],
        &[],
    ),
    (
        "IGV",
        SectorCategory::Thematic,
        &["軟體", "資訊服務", "雲端"],
        &["6488 環球晶", "3293 鈊象", "6263 普萊德", "6462 神盾"],
        &[],
    ),
    (
        "IHI",
        SectorCategory::Thematic,
        &["醫療器材", "生技醫療"],
        &["4736 泰博", "4743 合一", "6547 高端疫苗", "6446 藥華藥", "4174 浩鼎"],
        &[],
    ),
    (
        "XRT",
        SectorCategory::Thematic,
        &["百貨", "電商", "零售通路"],
        &["2912 統一超", "2915 潤泰全", "2845 遠東銀", "2888 新光金", "9945 潤泰新"],
        &[],
    ),
];

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl SectorMapping {
    /// Built-in table for the 11 core sectors and the mapped theme ETFs
    pub fn taiwan_default() -> Self {
        DEFAULT_TABLE
            .iter()
            .fold(Self::default(), |mapping, (ticker, category, groups, stocks, themes)| {
                mapping.with_entry(
                    ticker,
                    MappingEntry {
                        category: *category,
                        tw_groups: owned(groups),
                        tw_stocks: owned(stocks),
                        related_themes: owned(themes),
                    },
                )
            })
    }

    /// Add or replace an entry. Tickers are stored upper-case.
    pub fn with_entry(mut self, ticker: &str, entry: MappingEntry) -> Self {
        self.entries.insert(ticker.trim().to_uppercase(), entry);
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self, MappingError> {
        let raw: BTreeMap<String, MappingEntry> = serde_json::from_str(json)?;
        if raw.is_empty() {
            return Err(MappingError::Empty);
        }
        Ok(raw
            .into_iter()
            .fold(Self::default(), |mapping, (ticker, entry)| mapping.with_entry(&ticker, entry)))
    }

    pub fn from_json_file(path: &Path) -> Result<Self, MappingError> {
        let json = std::fs::read_to_string(path).map_err(|source| MappingError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn get(&self, ticker: &str) -> Option<&MappingEntry> {
        self.entries.get(&ticker.to_uppercase())
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.get(ticker).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
