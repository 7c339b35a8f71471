//! JSON run summary shared between the analysis and the report renderer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Classes holding the maximum of a headline metric.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInsights {
    pub highest_volume_sentiment: Option<String>,
    pub highest_avg_pnl_sentiment: Option<String>,
    pub highest_win_rate_sentiment: Option<String>,
}

/// First and last trade date, formatted `YYYY-MM-DD`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<String>,
    pub end: Option<String>,
}

/// Contents of `analysis_summary.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    /// Local time of the run, `YYYY-MM-DD HH:MM:SS`
    pub analysis_date: String,

    pub total_trades: usize,

    /// Trades whose date matched a known classification
    pub trades_with_sentiment: usize,

    pub date_range: DateRange,

    /// Classification label -> number of trades
    #[serde(default)]
    pub sentiment_distribution: BTreeMap<String, usize>,

    pub key_insights: KeyInsights,
}

impl AnalysisSummary {
    /// Classes ordered by trade count, most active first.
    pub fn ranked_distribution(&self) -> Vec<(&str, usize)> {
        let mut ranked: Vec<(&str, usize)> = self
            .sentiment_distribution
            .iter()
            .map(|(label, count)| (label.as_str(), *count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }
}
