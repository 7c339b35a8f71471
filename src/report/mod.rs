//! PDF report rendered from a finished analysis run.
//!
//! The report only reads the data products on disk (the JSON summary and three
//! of the CSV tables), so it can be regenerated without repeating the analysis.

mod document;
mod format;
mod inputs;
mod pdf;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use document::build_document;
use inputs::ReportInputs;
use pdf::render_pdf;

use crate::analysis::AnalysisConfig;

/// Load the analysis outputs named by `config` and write the PDF report.
pub fn generate_report(config: &AnalysisConfig) -> Result<PathBuf> {
    let inputs = ReportInputs::load(config)
        .context("Report inputs missing; run `tradesent analyze` first")?;
    let document = build_document(&inputs);

    let path = config.report_path().to_path_buf();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let pages = render_pdf(&document, &path)?;
    info!(path = %path.display(), pages, blocks = document.blocks.len(), "Report generated");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Pipeline;

    const SENTIMENT: &str = "date,classification,value\n2024-01-01,Fear,20\n2024-01-02,Extreme Greed,90\n";
    const TRADES: &str = "\
Account,Side,Size USD,Size Tokens,Closed PnL,Fee,Timestamp IST
0xa,BUY,100,1,10,0.1,01-01-2024 10:00
0xb,SELL,50,1,-5,0.1,01-01-2024 12:00
0xc,BUY,300,3,40,0.3,02-01-2024 08:00
";

    #[test]
    fn test_report_after_analysis() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        fs::create_dir_all(&data).unwrap();
        fs::write(data.join("fear_greed_index.csv"), SENTIMENT).unwrap();
        fs::write(data.join("historical_data.csv"), TRADES).unwrap();

        let mut config = AnalysisConfig {
            data_dir: data,
            output_dir: dir.path().join("outputs"),
            csv_dir: dir.path().join("csv_files"),
            report_path: dir.path().join("reports").join("ds_report.pdf"),
            ..Default::default()
        };
        config.charts.enabled = false;

        Pipeline::new(config.clone()).run().unwrap();

        let inputs = ReportInputs::load(&config).unwrap();
        assert_eq!(inputs.summary.total_trades, 3);
        assert_eq!(inputs.sentiment.len(), 2);
        assert_eq!(inputs.sentiment[0].classification, "Fear");
        assert_eq!(inputs.sentiment[0].total_trades, 2);
        assert_eq!(inputs.sentiment[0].avg_pnl, Some(2.5));

        let path = generate_report(&config).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_report_without_analysis_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = AnalysisConfig {
            output_dir: dir.path().join("outputs"),
            csv_dir: dir.path().join("csv_files"),
            report_path: dir.path().join("ds_report.pdf"),
            ..Default::default()
        };

        let err = generate_report(&config).unwrap_err();
        assert!(format!("{:#}", err).contains("analyze"));
        assert!(!config.report_path.exists());
    }
}
