//! End-to-end analysis run: load, normalize, join, derive, aggregate, export.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use super::aggregator::Aggregator;
use super::config::AnalysisConfig;
use super::join::left_join;
use crate::data::{normalize_sentiment, normalize_trades, RawTable, SentimentDataset, TradeDataset};
use crate::export::{analysis_timestamp, build_summary, render_charts, write_summary, write_tables};
use crate::metrics::MetricDeriver;
use crate::models::{AnalysisResults, AnalyzedTrade};

/// Files produced by one run.
#[derive(Debug)]
pub struct AnalysisOutputs {
    pub results: AnalysisResults,
    pub tables: Vec<PathBuf>,
    pub charts: Vec<PathBuf>,
    pub summary: PathBuf,
}

/// Pure part of the run: every aggregate view plus the per-trade rows they came from.
pub fn analyze(
    trades: TradeDataset,
    sentiment: &SentimentDataset,
    top_accounts: usize,
) -> (AnalysisResults, Vec<AnalyzedTrade>) {
    let columns = trades.columns;
    let joined = left_join(trades.records, &sentiment.records);
    let analyzed = MetricDeriver::new(columns.side).apply(joined);

    let results = Aggregator::new(&analyzed, columns)
        .with_top_accounts(top_accounts)
        .run();

    (results, analyzed)
}

/// Runs the analysis against files on disk.
pub struct Pipeline {
    config: AnalysisConfig,
}

impl Pipeline {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Read and coerce both input files.
    pub fn load(&self) -> Result<(SentimentDataset, TradeDataset)> {
        let sentiment_path = self.config.sentiment_path();
        let trades_path = self.config.trades_path();

        let sentiment = RawTable::from_path(&sentiment_path)
            .and_then(|table| normalize_sentiment(&table))
            .with_context(|| format!("Failed to load sentiment index from {}", sentiment_path.display()))?;

        let trades = RawTable::from_path(&trades_path)
            .and_then(|table| normalize_trades(&table))
            .with_context(|| format!("Failed to load trade history from {}", trades_path.display()))?;

        Ok((sentiment, trades))
    }

    pub fn run(&self) -> Result<AnalysisOutputs> {
        info!(
            sentiment = %self.config.sentiment_path().display(),
            trades = %self.config.trades_path().display(),
            "Starting analysis"
        );

        let (sentiment, trades) = self.load()?;
        let (results, analyzed) = analyze(trades, &sentiment, self.config.top_accounts);

        ensure_dir(&self.config.output_dir)?;
        ensure_dir(&self.config.csv_dir)?;

        let tables = write_tables(&results, &self.config.csv_dir)?;
        info!(count = tables.len(), dir = %self.config.csv_dir.display(), "Tables written");

        let charts = if self.config.charts.enabled {
            render_charts(&results, &analyzed, &self.config.charts, &self.config.output_dir)?
        } else {
            info!("Chart rendering disabled");
            Vec::new()
        };

        let summary_path = self.config.summary_path();
        let summary = build_summary(&results, analysis_timestamp());
        write_summary(&summary, &summary_path)?;
        info!(path = %summary_path.display(), "Summary written");

        Ok(AnalysisOutputs {
            results,
            tables,
            charts,
            summary: summary_path,
        })
    }
}

fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create directory: {}", dir.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::read_summary;

    const SENTIMENT: &str = "\
timestamp,value,classification,date
1704067200,20,Fear,2024-01-01
1704153600,75,Greed,2024-01-02
1704240000,50,Neutral,2024-01-03
";

    const TRADES: &str = "\
Account,Coin,Execution Price,Size Tokens,Size USD,Side,Timestamp IST,Closed PnL,Fee
0xa,BTC,100,1,100,BUY,01-01-2024 10:00,10,0.1
0xb,BTC,100,0.5,50,SELL,01-01-2024 11:00,-5,0.05
0xa,ETH,10,20,200,BUY,02-01-2024 09:30,30,0.2
0xc,ETH,10,5,50,SELL,03-01-2024 23:59,0,0.05
0xd,SOL,1,7,7,BUY,15-03-2024 12:00,1,0.01
0xe,SOL,1,7,7,BUY,garbage,1,0.01
";

    fn workspace() -> (tempfile::TempDir, AnalysisConfig) {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        fs::create_dir_all(&data).unwrap();
        fs::write(data.join("fear_greed_index.csv"), SENTIMENT).unwrap();
        fs::write(data.join("historical_data.csv"), TRADES).unwrap();

        let mut config = AnalysisConfig {
            data_dir: data,
            output_dir: dir.path().join("outputs"),
            csv_dir: dir.path().join("csv_files"),
            report_path: dir.path().join("ds_report.pdf"),
            ..Default::default()
        };
        config.charts.dpi = 10;
        (dir, config)
    }

    #[test]
    fn test_analyze_counts() {
        let (_dir, config) = workspace();
        let pipeline = Pipeline::new(config);
        let (sentiment, trades) = pipeline.load().unwrap();

        let (results, analyzed) = analyze(trades, &sentiment, 5);
        assert_eq!(analyzed.len(), 6);
        assert_eq!(results.totals.total_trades, 6);
        assert_eq!(results.totals.trades_with_sentiment, 4);

        let fear = results
            .sentiment
            .iter()
            .find(|r| r.classification.as_str() == "Fear")
            .unwrap();
        assert_eq!(fear.total_trades, 2);
        assert!((fear.total_pnl - 5.0).abs() < 1e-9);
        assert!((fear.win_rate - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_run_writes_outputs() {
        let (_dir, config) = workspace();
        let outputs = Pipeline::new(config.clone()).run().unwrap();

        assert_eq!(outputs.tables.len(), 7);
        assert_eq!(outputs.charts.len(), 9);
        for path in outputs.tables.iter().chain(outputs.charts.iter()) {
            assert!(path.exists(), "missing {}", path.display());
        }

        let summary = read_summary(&outputs.summary).unwrap();
        assert_eq!(summary.total_trades, 6);
        assert_eq!(summary.trades_with_sentiment, 4);
        assert_eq!(summary.date_range.start.as_deref(), Some("2024-01-01"));
        assert_eq!(summary.date_range.end.as_deref(), Some("2024-03-15"));
        assert_eq!(summary.sentiment_distribution.get("Fear"), Some(&2));
        assert_eq!(summary.key_insights.highest_volume_sentiment.as_deref(), Some("Greed"));

        let volume = fs::read_to_string(config.table_path("volume_analysis_by_sentiment.csv")).unwrap();
        assert!(volume.lines().next().unwrap().ends_with("total_tokens,avg_tokens"));
    }

    #[test]
    fn test_run_without_charts() {
        let (_dir, mut config) = workspace();
        config.charts.enabled = false;

        let outputs = Pipeline::new(config.clone()).run().unwrap();
        assert!(outputs.charts.is_empty());
        assert!(!config.output_dir.join("1_trades_per_sentiment.png").exists());
        assert!(config.summary_path().exists());
    }

    #[test]
    fn test_missing_input_is_fatal() {
        let (dir, mut config) = workspace();
        config.data_dir = dir.path().join("nowhere");

        let err = Pipeline::new(config).run().unwrap_err();
        assert!(format!("{:#}", err).contains("sentiment"));
    }
}
