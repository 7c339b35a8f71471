//! Analysis configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::aggregator::DEFAULT_TOP_ACCOUNTS;

/// Chart rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    /// Whether to render PNG charts at all
    pub enabled: bool,

    /// Dots per inch; pixel size is figure inches times this
    pub dpi: u32,

    /// Number of bins in the PnL distribution histogram
    pub histogram_bins: usize,

    /// PnL range covered by the histogram (values outside are not counted)
    pub histogram_range: (f64, f64),
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dpi: 300,
            histogram_bins: 50,
            histogram_range: (-1000.0, 1000.0),
        }
    }
}

/// Input and output locations plus tunables for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Directory holding both input files
    pub data_dir: PathBuf,

    /// Fear & Greed index file name
    pub sentiment_file: String,

    /// Trade history file name
    pub trades_file: String,

    /// Charts and the JSON summary go here
    pub output_dir: PathBuf,

    /// Aggregate tables go here
    pub csv_dir: PathBuf,

    /// Where the PDF report is written
    pub report_path: PathBuf,

    /// Accounts kept per sentiment class
    pub top_accounts: usize,

    pub charts: ChartConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            sentiment_file: "fear_greed_index.csv".to_string(),
            trades_file: "historical_data.csv".to_string(),
            output_dir: PathBuf::from("outputs"),
            csv_dir: PathBuf::from("csv_files"),
            report_path: PathBuf::from("ds_report.pdf"),
            top_accounts: DEFAULT_TOP_ACCOUNTS,
            charts: ChartConfig::default(),
        }
    }
}

/// File name of the JSON run summary inside `output_dir`.
pub const SUMMARY_FILE: &str = "analysis_summary.json";

impl AnalysisConfig {
    pub fn sentiment_path(&self) -> PathBuf {
        self.data_dir.join(&self.sentiment_file)
    }

    pub fn trades_path(&self) -> PathBuf {
        self.data_dir.join(&self.trades_file)
    }

    pub fn summary_path(&self) -> PathBuf {
        self.output_dir.join(SUMMARY_FILE)
    }

    /// Path of an aggregate table inside `csv_dir`.
    pub fn table_path(&self, file_name: &str) -> PathBuf {
        self.csv_dir.join(file_name)
    }

    pub fn report_path(&self) -> &Path {
        &self.report_path
    }
}
