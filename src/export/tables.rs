//! Aggregate views written as CSV tables.
//!
//! Every numeric cell is rounded to two decimals here and nowhere else. Null
//! statistics are written as empty cells.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::Writer;
use rust_decimal::Decimal;
use tracing::debug;

use crate::models::{
    AccountRow, AnalysisResults, MonthlyRow, ProfitabilityRow, RiskRow, SentimentMetrics,
    SideRow, VolumeAnalysis,
};

pub const SENTIMENT_TABLE: &str = "sentiment_aggregated_metrics.csv";
pub const PROFITABILITY_TABLE: &str = "profitability_by_sentiment.csv";
pub const VOLUME_TABLE: &str = "volume_analysis_by_sentiment.csv";
pub const RISK_TABLE: &str = "risk_analysis_by_sentiment.csv";
pub const SIDE_TABLE: &str = "buy_sell_analysis.csv";
pub const MONTHLY_TABLE: &str = "time_trends.csv";
pub const TOP_ACCOUNTS_TABLE: &str = "top_accounts_by_sentiment.csv";

/// An in-memory table ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub file_name: &'static str,
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    fn new(file_name: &'static str, headers: Vec<&'static str>) -> Self {
        Self {
            file_name,
            headers,
            rows: Vec::new(),
        }
    }

    /// Write the table to `dir/<file_name>`, replacing any previous file.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(self.file_name);
        let file = File::create(&path)
            .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
        let mut writer = Writer::from_writer(file);

        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;

        debug!(path = %path.display(), rows = self.rows.len(), "Wrote table");
        Ok(path)
    }
}

/// Round half-to-even to exactly two decimals for output.
///
/// The value goes through its shortest decimal form first, so `1.005` and
/// `2.675` round as written rather than by their binary approximations.
pub fn round2(value: f64) -> String {
    match value.to_string().parse::<Decimal>() {
        Ok(d) => {
            let mut rounded = d.round_dp(2);
            rounded.rescale(2);
            if rounded.is_zero() {
                rounded.set_sign_positive(true);
            }
            rounded.to_string()
        }
        // Outside Decimal's range
        Err(_) => format!("{:.2}", value),
    }
}

fn cell(value: Option<f64>) -> String {
    value.map(round2).unwrap_or_default()
}

fn flag(value: bool) -> String {
    if value { "True" } else { "False" }.to_string()
}

pub fn sentiment_table(rows: &[SentimentMetrics]) -> Table {
    let mut table = Table::new(
        SENTIMENT_TABLE,
        vec![
            "classification",
            "total_trades",
            "total_volume_usd",
            "avg_trade_size_usd",
            "std_trade_size",
            "total_pnl",
            "avg_pnl",
            "std_pnl",
            "median_pnl",
            "win_rate",
            "avg_abs_pnl",
            "total_fees",
        ],
    );
    for r in rows {
        table.rows.push(vec![
            r.classification.to_string(),
            r.total_trades.to_string(),
            round2(r.total_volume_usd),
            cell(r.avg_trade_size_usd),
            cell(r.std_trade_size),
            round2(r.total_pnl),
            cell(r.avg_pnl),
            cell(r.std_pnl),
            cell(r.median_pnl),
            round2(r.win_rate),
            cell(r.avg_abs_pnl),
            round2(r.total_fees),
        ]);
    }
    table
}

pub fn profitability_table(rows: &[ProfitabilityRow]) -> Table {
    let mut table = Table::new(
        PROFITABILITY_TABLE,
        vec![
            "classification",
            "total_pnl",
            "avg_pnl",
            "median_pnl",
            "winning_trades",
            "losing_trades",
            "wins",
            "losses",
            "profit_margin",
        ],
    );
    for r in rows {
        table.rows.push(vec![
            r.classification.to_string(),
            round2(r.total_pnl),
            cell(r.avg_pnl),
            cell(r.median_pnl),
            r.winning_trades.to_string(),
            r.losing_trades.to_string(),
            r.wins.to_string(),
            r.losses.to_string(),
            cell(r.profit_margin),
        ]);
    }
    table
}

pub fn volume_table(volume: &VolumeAnalysis) -> Table {
    let mut headers = vec![
        "classification",
        "total_volume_usd",
        "avg_volume_usd",
        "median_volume_usd",
        "trade_count",
    ];
    if volume.include_tokens {
        headers.extend(["total_tokens", "avg_tokens"]);
    }

    let mut table = Table::new(VOLUME_TABLE, headers);
    for r in &volume.rows {
        let mut row = vec![
            r.classification.to_string(),
            round2(r.total_volume_usd),
            cell(r.avg_volume_usd),
            cell(r.median_volume_usd),
            r.trade_count.to_string(),
        ];
        if volume.include_tokens {
            row.push(cell(r.tokens.map(|t| t.total_tokens)));
            row.push(cell(r.tokens.and_then(|t| t.avg_tokens)));
        }
        table.rows.push(row);
    }
    table
}

pub fn risk_table(rows: &[RiskRow]) -> Table {
    let mut table = Table::new(
        RISK_TABLE,
        vec![
            "classification",
            "avg_abs_pnl",
            "median_abs_pnl",
            "std_abs_pnl",
            "avg_risk_reward",
            "median_risk_reward",
            "pnl_std",
            "pnl_q25",
            "pnl_q75",
        ],
    );
    for r in rows {
        table.rows.push(vec![
            r.classification.to_string(),
            cell(r.avg_abs_pnl),
            cell(r.median_abs_pnl),
            cell(r.std_abs_pnl),
            cell(r.avg_risk_reward),
            cell(r.median_risk_reward),
            cell(r.pnl_std),
            cell(r.pnl_q25),
            cell(r.pnl_q75),
        ]);
    }
    table
}

pub fn side_table(rows: &[SideRow]) -> Table {
    let mut table = Table::new(
        SIDE_TABLE,
        vec![
            "classification",
            "is_buy",
            "trade_count",
            "total_volume",
            "total_pnl",
            "avg_pnl",
            "side",
        ],
    );
    for r in rows {
        table.rows.push(vec![
            r.classification.to_string(),
            flag(r.is_buy()),
            r.trade_count.to_string(),
            round2(r.total_volume),
            round2(r.total_pnl),
            cell(r.avg_pnl),
            r.side.as_str().to_string(),
        ]);
    }
    table
}

pub fn monthly_table(rows: &[MonthlyRow]) -> Table {
    let mut table = Table::new(
        MONTHLY_TABLE,
        vec!["year_month", "classification", "trade_count", "volume", "pnl"],
    );
    for r in rows {
        table.rows.push(vec![
            r.year_month.clone(),
            r.classification.to_string(),
            r.trade_count.to_string(),
            round2(r.volume),
            round2(r.pnl),
        ]);
    }
    table
}

pub fn top_accounts_table(rows: &[AccountRow]) -> Table {
    let mut table = Table::new(
        TOP_ACCOUNTS_TABLE,
        vec!["classification", "Account", "total_pnl", "trade_count", "total_volume"],
    );
    for r in rows {
        table.rows.push(vec![
            r.classification.to_string(),
            r.account.clone(),
            round2(r.total_pnl),
            r.trade_count.to_string(),
            round2(r.total_volume),
        ]);
    }
    table
}

/// All seven tables, in output order.
pub fn build_tables(results: &AnalysisResults) -> Vec<Table> {
    vec![
        sentiment_table(&results.sentiment),
        profitability_table(&results.profitability),
        volume_table(&results.volume),
        risk_table(&results.risk),
        side_table(&results.sides),
        monthly_table(&results.monthly),
        top_accounts_table(&results.top_accounts),
    ]
}

/// Write every table into `dir`.
pub fn write_tables(results: &AnalysisResults, dir: &Path) -> Result<Vec<PathBuf>> {
    build_tables(results)
        .iter()
        .map(|table| table.write_to(dir))
        .collect()
}
