//! Trade Sentiment Analyzer
//!
//! Correlates a trader's historical fills with the daily Crypto Fear & Greed
//! index: per-sentiment aggregate tables, charts, a JSON summary and a PDF report.

mod analysis;
mod data;
mod export;
mod metrics;
mod models;
mod report;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::analysis::{AnalysisConfig, Pipeline};
use crate::report::generate_report;

/// Trade vs market sentiment analysis CLI.
#[derive(Parser)]
#[command(name = "tradesent")]
#[command(about = "Analyze trading behavior against the Fear & Greed index", long_about = None)]
struct Cli {
    /// Directory holding the input files
    #[arg(long, env = "TRADESENT_DATA_DIR", default_value = "data", global = true)]
    data_dir: PathBuf,

    /// Fear & Greed index file name
    #[arg(long, env = "TRADESENT_SENTIMENT_FILE", default_value = "fear_greed_index.csv", global = true)]
    sentiment_file: String,

    /// Trade history file name
    #[arg(long, env = "TRADESENT_TRADES_FILE", default_value = "historical_data.csv", global = true)]
    trades_file: String,

    /// Directory for charts and the JSON summary
    #[arg(long, env = "TRADESENT_OUTPUT_DIR", default_value = "outputs", global = true)]
    output_dir: PathBuf,

    /// Directory for the aggregate CSV tables
    #[arg(long, env = "TRADESENT_CSV_DIR", default_value = "csv_files", global = true)]
    csv_dir: PathBuf,

    /// PDF report path
    #[arg(long, env = "TRADESENT_REPORT_PATH", default_value = "ds_report.pdf", global = true)]
    report_path: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "TRADESENT_LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Join trades with sentiment and write tables, charts and the summary
    Analyze {
        /// Accounts kept per sentiment in the top-accounts table
        #[arg(short, long, default_value = "5")]
        top_accounts: usize,

        /// Chart resolution in dots per inch
        #[arg(long, default_value = "300")]
        dpi: u32,

        /// Skip chart rendering
        #[arg(long)]
        no_charts: bool,
    },

    /// Render the PDF report from a previous analysis run
    Report,

    /// Show the effective configuration
    Config {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    fn analysis_config(&self) -> AnalysisConfig {
        AnalysisConfig {
            data_dir: self.data_dir.clone(),
            sentiment_file: self.sentiment_file.clone(),
            trades_file: self.trades_file.clone(),
            output_dir: self.output_dir.clone(),
            csv_dir: self.csv_dir.clone(),
            report_path: self.report_path.clone(),
            ..Default::default()
        }
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = cli.analysis_config();

    match cli.command {
        Commands::Analyze {
            top_accounts,
            dpi,
            no_charts,
        } => {
            config.top_accounts = top_accounts;
            config.charts.dpi = dpi;
            config.charts.enabled = !no_charts;

            let outputs = Pipeline::new(config).run()?;
            println!("{}", outputs.results);

            println!("\nTables:  {}", outputs.tables.len());
            println!("Charts:  {}", outputs.charts.len());
            println!("Summary: {}", outputs.summary.display());
            info!("Analysis complete");
        }

        Commands::Report => {
            let path = generate_report(&config)?;
            println!("PDF report generated: {}", path.display());
        }

        Commands::Config { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
                return Ok(());
            }

            println!("\n=== Analysis Configuration ===\n");
            println!("Inputs:");
            println!("  Sentiment Index:      {}", config.sentiment_path().display());
            println!("  Trade History:        {}", config.trades_path().display());

            println!("\nOutputs:");
            println!("  Charts + Summary:     {}", config.output_dir.display());
            println!("  CSV Tables:           {}", config.csv_dir.display());
            println!("  Summary File:         {}", config.summary_path().display());
            println!("  PDF Report:           {}", config.report_path().display());

            println!("\nAnalysis:");
            println!("  Top Accounts:         {}", config.top_accounts);

            println!("\nCharts:");
            println!("  Enabled:              {}", config.charts.enabled);
            println!("  DPI:                  {}", config.charts.dpi);
            println!("  Histogram Bins:       {}", config.charts.histogram_bins);
            println!(
                "  Histogram Range:      {} to {}",
                config.charts.histogram_range.0, config.charts.histogram_range.1
            );
        }
    }

    Ok(())
}
