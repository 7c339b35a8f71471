//! Aggregate rows produced for each analysis view.
//!
//! Values are kept unrounded here; rounding to two decimals happens only when a
//! view is written out.

use std::fmt;

use chrono::NaiveDate;

use super::sentiment::SentimentClass;
use super::summary::KeyInsights;
use super::trade::TradeSide;

/// Overall metrics for one sentiment class.
#[derive(Debug, Clone, PartialEq)]
pub struct SentimentMetrics {
    pub classification: SentimentClass,

    // === Activity ===
    /// Number of trades on days with this sentiment
    pub total_trades: usize,

    /// Summed USD notional
    pub total_volume_usd: f64,

    pub avg_trade_size_usd: Option<f64>,

    /// Sample standard deviation of USD size
    pub std_trade_size: Option<f64>,

    // === Profitability ===
    pub total_pnl: f64,

    pub avg_pnl: Option<f64>,

    pub std_pnl: Option<f64>,

    pub median_pnl: Option<f64>,

    /// Share of trades with positive PnL (0.0 to 1.0)
    pub win_rate: f64,

    /// Mean absolute PnL, the risk proxy
    pub avg_abs_pnl: Option<f64>,

    pub total_fees: f64,
}

/// Profitability breakdown for one sentiment class.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfitabilityRow {
    pub classification: SentimentClass,
    pub total_pnl: f64,
    pub avg_pnl: Option<f64>,
    pub median_pnl: Option<f64>,
    /// Trades with PnL > 0
    pub winning_trades: usize,
    /// Trades with PnL < 0
    pub losing_trades: usize,
    /// Sum of win flags
    pub wins: usize,
    /// Sum of loss flags
    pub losses: usize,
    /// Signed share of the absolute PnL across all classes, in percent
    pub profit_margin: Option<f64>,
}

/// Token-denominated volume, present only when the export carries token sizes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenVolume {
    pub total_tokens: f64,
    pub avg_tokens: Option<f64>,
}

/// Volume statistics for one sentiment class.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeRow {
    pub classification: SentimentClass,
    pub total_volume_usd: f64,
    pub avg_volume_usd: Option<f64>,
    pub median_volume_usd: Option<f64>,
    /// Trades with a known USD size
    pub trade_count: usize,
    pub tokens: Option<TokenVolume>,
}

/// Volume view; token columns are emitted only when `include_tokens` is set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VolumeAnalysis {
    pub include_tokens: bool,
    pub rows: Vec<VolumeRow>,
}

/// Risk statistics for one sentiment class.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskRow {
    pub classification: SentimentClass,
    pub avg_abs_pnl: Option<f64>,
    pub median_abs_pnl: Option<f64>,
    pub std_abs_pnl: Option<f64>,
    pub avg_risk_reward: Option<f64>,
    pub median_risk_reward: Option<f64>,
    pub pnl_std: Option<f64>,
    /// 25th percentile of closed PnL
    pub pnl_q25: Option<f64>,
    /// 75th percentile of closed PnL
    pub pnl_q75: Option<f64>,
}

/// Buy or sell activity within one sentiment class.
#[derive(Debug, Clone, PartialEq)]
pub struct SideRow {
    pub classification: SentimentClass,
    pub side: TradeSide,
    pub trade_count: usize,
    pub total_volume: f64,
    pub total_pnl: f64,
    pub avg_pnl: Option<f64>,
}

impl SideRow {
    pub fn is_buy(&self) -> bool {
        self.side == TradeSide::Buy
    }
}

/// Monthly roll-up for one sentiment class.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyRow {
    /// `YYYY-MM`
    pub year_month: String,
    pub classification: SentimentClass,
    pub trade_count: usize,
    pub volume: f64,
    pub pnl: f64,
}

/// An account's activity within one sentiment class.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountRow {
    pub classification: SentimentClass,
    pub account: String,
    pub total_pnl: f64,
    pub trade_count: usize,
    pub total_volume: f64,
}

/// Ungrouped totals over the whole joined table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunTotals {
    /// Every trade row, dated or not
    pub total_trades: usize,

    /// Rows that matched a known classification
    pub trades_with_sentiment: usize,

    pub first_date: Option<NaiveDate>,

    pub last_date: Option<NaiveDate>,

    /// Row count per classification, in scale order
    pub distribution: Vec<(SentimentClass, usize)>,
}

/// Every view produced by one analysis run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResults {
    /// Sorted by trade count, descending
    pub sentiment: Vec<SentimentMetrics>,
    pub profitability: Vec<ProfitabilityRow>,
    pub volume: VolumeAnalysis,
    pub risk: Vec<RiskRow>,
    pub sides: Vec<SideRow>,
    pub monthly: Vec<MonthlyRow>,
    pub top_accounts: Vec<AccountRow>,
    pub totals: RunTotals,
    pub insights: KeyInsights,
}

fn opt(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".to_string())
}

impl fmt::Display for AnalysisResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n{:=^100}", " OVERALL METRICS BY SENTIMENT ")?;
        writeln!(
            f,
            "{:<14} {:>8} {:>16} {:>10} {:>14} {:>10} {:>10} {:>9} {:>12}",
            "SENTIMENT", "TRADES", "VOLUME USD", "AVG SIZE", "TOTAL PNL", "AVG PNL", "MED PNL", "WIN %", "FEES"
        )?;
        for row in &self.sentiment {
            writeln!(
                f,
                "{:<14} {:>8} {:>16.2} {:>10} {:>14.2} {:>10} {:>10} {:>8.1}% {:>12.2}",
                row.classification,
                row.total_trades,
                row.total_volume_usd,
                opt(row.avg_trade_size_usd),
                row.total_pnl,
                opt(row.avg_pnl),
                opt(row.median_pnl),
                row.win_rate * 100.0,
                row.total_fees
            )?;
        }

        writeln!(f, "\n{:=^100}", " PROFITABILITY ")?;
        writeln!(
            f,
            "{:<14} {:>14} {:>10} {:>10} {:>8} {:>8} {:>10}",
            "SENTIMENT", "TOTAL PNL", "AVG PNL", "MED PNL", "WINS", "LOSSES", "MARGIN %"
        )?;
        for row in &self.profitability {
            writeln!(
                f,
                "{:<14} {:>14.2} {:>10} {:>10} {:>8} {:>8} {:>10}",
                row.classification,
                row.total_pnl,
                opt(row.avg_pnl),
                opt(row.median_pnl),
                row.wins,
                row.losses,
                opt(row.profit_margin)
            )?;
        }

        writeln!(f, "\n{:=^100}", " VOLUME ")?;
        for row in &self.volume.rows {
            write!(
                f,
                "{:<14} total ${:.2} | avg {} | median {} | {} sized trades",
                row.classification,
                row.total_volume_usd,
                opt(row.avg_volume_usd),
                opt(row.median_volume_usd),
                row.trade_count
            )?;
            if let Some(tokens) = &row.tokens {
                write!(f, " | tokens {:.2} (avg {})", tokens.total_tokens, opt(tokens.avg_tokens))?;
            }
            writeln!(f)?;
        }

        writeln!(f, "\n{:=^100}", " RISK ")?;
        writeln!(
            f,
            "{:<14} {:>12} {:>12} {:>12} {:>10} {:>12} {:>10} {:>10}",
            "SENTIMENT", "AVG |PNL|", "MED |PNL|", "STD |PNL|", "AVG R/R", "PNL STD", "Q25", "Q75"
        )?;
        for row in &self.risk {
            writeln!(
                f,
                "{:<14} {:>12} {:>12} {:>12} {:>10} {:>12} {:>10} {:>10}",
                row.classification,
                opt(row.avg_abs_pnl),
                opt(row.median_abs_pnl),
                opt(row.std_abs_pnl),
                opt(row.avg_risk_reward),
                opt(row.pnl_std),
                opt(row.pnl_q25),
                opt(row.pnl_q75)
            )?;
        }

        writeln!(f, "\n{:=^100}", " BUY VS SELL ")?;
        for row in &self.sides {
            writeln!(
                f,
                "{:<14} {:<4} {:>8} trades | volume ${:.2} | pnl ${:.2} | avg {}",
                row.classification,
                row.side.as_str(),
                row.trade_count,
                row.total_volume,
                row.total_pnl,
                opt(row.avg_pnl)
            )?;
        }

        writeln!(f, "\n{:=^100}", " TOP ACCOUNTS ")?;
        for row in &self.top_accounts {
            writeln!(
                f,
                "{:<14} {:<44} {:>14.2} {:>6} trades",
                row.classification, row.account, row.total_pnl, row.trade_count
            )?;
        }

        writeln!(f, "\n{:=^100}", " TOTALS ")?;
        writeln!(f, "Trades:          {}", self.totals.total_trades)?;
        writeln!(f, "With sentiment:  {}", self.totals.trades_with_sentiment)?;
        if let (Some(first), Some(last)) = (self.totals.first_date, self.totals.last_date) {
            writeln!(f, "Period:          {} to {}", first, last)?;
        }
        writeln!(f, "Monthly rows:    {}", self.monthly.len())?;
        writeln!(f, "{:=^100}", "")?;
        Ok(())
    }
}
