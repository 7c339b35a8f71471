//! JSON run summary.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::debug;

use crate::models::{AnalysisResults, AnalysisSummary, DateRange};

/// Format of `analysis_date`.
pub const ANALYSIS_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current local time in summary format.
pub fn analysis_timestamp() -> String {
    Local::now().format(ANALYSIS_DATE_FORMAT).to_string()
}

/// Build the summary for a run stamped `analysis_date`.
pub fn build_summary(results: &AnalysisResults, analysis_date: String) -> AnalysisSummary {
    let totals = &results.totals;

    AnalysisSummary {
        analysis_date,
        total_trades: totals.total_trades,
        trades_with_sentiment: totals.trades_with_sentiment,
        date_range: DateRange {
            start: totals.first_date.map(|d| d.format("%Y-%m-%d").to_string()),
            end: totals.last_date.map(|d| d.format("%Y-%m-%d").to_string()),
        },
        sentiment_distribution: totals
            .distribution
            .iter()
            .map(|(class, count)| (class.to_string(), *count))
            .collect(),
        key_insights: results.insights.clone(),
    }
}

pub fn write_summary(summary: &AnalysisSummary, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create summary file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, summary)
        .with_context(|| format!("Failed to serialize summary: {}", path.display()))?;
    writer.flush()?;

    debug!(path = %path.display(), "Wrote summary");
    Ok(())
}

pub fn read_summary(path: &Path) -> Result<AnalysisSummary> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open summary file: {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse summary file: {}", path.display()))
}
