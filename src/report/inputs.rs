//! Data products the report is rendered from.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::analysis::AnalysisConfig;
use crate::export::read_summary;
use crate::export::tables::{PROFITABILITY_TABLE, RISK_TABLE, SENTIMENT_TABLE};
use crate::models::AnalysisSummary;

/// A row of the sentiment aggregate table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SentimentLine {
    pub classification: String,
    pub total_trades: u64,
    pub total_volume_usd: f64,
    pub avg_pnl: Option<f64>,
    pub win_rate: f64,
    pub avg_abs_pnl: Option<f64>,
}

/// A row of the profitability table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProfitabilityLine {
    pub classification: String,
    pub total_pnl: f64,
    pub profit_margin: Option<f64>,
}

/// A row of the risk table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RiskLine {
    pub classification: String,
    pub avg_abs_pnl: Option<f64>,
    pub avg_risk_reward: Option<f64>,
    pub pnl_std: Option<f64>,
}

/// Everything the report needs, read back from a finished analysis run.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportInputs {
    pub summary: AnalysisSummary,
    pub sentiment: Vec<SentimentLine>,
    pub profitability: Vec<ProfitabilityLine>,
    pub risk: Vec<RiskLine>,
}

impl ReportInputs {
    pub fn load(config: &AnalysisConfig) -> Result<Self> {
        let inputs = Self {
            summary: read_summary(&config.summary_path())?,
            sentiment: read_rows(&config.table_path(SENTIMENT_TABLE))?,
            profitability: read_rows(&config.table_path(PROFITABILITY_TABLE))?,
            risk: read_rows(&config.table_path(RISK_TABLE))?,
        };

        debug!(
            sentiment_rows = inputs.sentiment.len(),
            profitability_rows = inputs.profitability.len(),
            risk_rows = inputs.risk.len(),
            "Loaded report inputs"
        );
        Ok(inputs)
    }

    pub fn profitability_of(&self, classification: &str) -> Option<&ProfitabilityLine> {
        self.profitability.iter().find(|p| p.classification == classification)
    }

    pub fn risk_of(&self, classification: &str) -> Option<&RiskLine> {
        self.risk.iter().find(|r| r.classification == classification)
    }
}

/// Deserialize every row of a CSV table by header name.
pub fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open table: {}", path.display()))?;
    let mut reader = ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);

    reader
        .deserialize()
        .collect::<std::result::Result<Vec<T>, csv::Error>>()
        .with_context(|| format!("Failed to parse table: {}", path.display()))
}
