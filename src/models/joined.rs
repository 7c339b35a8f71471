//! Trades enriched with the sentiment of their day and per-trade derived metrics.

use chrono::NaiveDate;

use super::sentiment::SentimentClass;
use super::trade::TradeRecord;

/// A trade after the left join against the sentiment index.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedTrade {
    /// The original trade, untouched by the join
    pub trade: TradeRecord,

    /// Join key (calendar date of the execution)
    pub date: Option<NaiveDate>,

    /// Sentiment of that date, `None` when no reading matched
    pub classification: Option<SentimentClass>,

    /// Index value of that date
    pub sentiment_value: Option<f64>,
}

/// Per-trade flags and ratios computed after the join.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DerivedMetrics {
    /// Closed PnL strictly positive
    pub win: bool,

    /// Closed PnL strictly negative
    pub loss: bool,

    pub is_buy: bool,

    pub is_sell: bool,

    /// Absolute closed PnL
    pub abs_pnl: Option<f64>,

    /// |PnL| / |size USD|, `None` when PnL is zero or either side is unknown
    pub risk_reward_ratio: Option<f64>,
}

/// A joined trade together with its derived metrics; the unit every aggregate works on.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedTrade {
    pub joined: JoinedTrade,
    pub metrics: DerivedMetrics,
}

impl AnalyzedTrade {
    pub fn classification(&self) -> Option<SentimentClass> {
        self.joined.classification
    }

    pub fn account(&self) -> &str {
        &self.joined.trade.account
    }

    pub fn pnl(&self) -> Option<f64> {
        self.joined.trade.closed_pnl
    }

    pub fn size_usd(&self) -> Option<f64> {
        self.joined.trade.size_usd
    }

    pub fn size_tokens(&self) -> Option<f64> {
        self.joined.trade.size_tokens
    }

    pub fn fee(&self) -> Option<f64> {
        self.joined.trade.fee
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.joined.date
    }

    pub fn year_month(&self) -> Option<String> {
        self.joined.trade.year_month()
    }
}
