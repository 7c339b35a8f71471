//! Trade model representing individual fills from the exchange history export.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Direction of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "BUY",
            TradeSide::Sell => "SELL",
        }
    }

    /// Match a side label case-insensitively against `BUY` / `SELL`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_uppercase().as_str() {
            "BUY" => Some(TradeSide::Buy),
            "SELL" => Some(TradeSide::Sell),
            _ => None,
        }
    }
}

/// Individual trade record after numeric and timestamp coercion.
///
/// Every numeric field is optional: a value that fails to parse is carried as
/// `None` instead of rejecting the row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradeRecord {
    /// Trader account address
    pub account: String,

    /// Raw side label, `None` when the export has no side column
    pub side: Option<String>,

    /// Fill price
    pub execution_price: Option<f64>,

    /// Notional size in USD
    pub size_usd: Option<f64>,

    /// Size in base-asset units
    pub size_tokens: Option<f64>,

    /// Fee paid
    pub fee: Option<f64>,

    /// Realized profit or loss in USD
    pub closed_pnl: Option<f64>,

    /// Execution time
    pub timestamp: Option<NaiveDateTime>,
}

impl TradeRecord {
    /// Calendar date of the execution, used as the join key.
    pub fn trade_date(&self) -> Option<NaiveDate> {
        self.timestamp.map(|ts| ts.date())
    }

    /// Calendar month of the execution as `YYYY-MM`.
    pub fn year_month(&self) -> Option<String> {
        self.timestamp.map(|ts| ts.format("%Y-%m").to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_from_label() {
        assert_eq!(TradeSide::from_label("BUY"), Some(TradeSide::Buy));
        assert_eq!(TradeSide::from_label("sell"), Some(TradeSide::Sell));
        assert_eq!(TradeSide::from_label("Sell"), Some(TradeSide::Sell));
        assert_eq!(TradeSide::from_label("LONG"), None);
    }

    #[test]
    fn test_date_keys() {
        let trade = TradeRecord {
            account: "0xabc".to_string(),
            timestamp: NaiveDate::from_ymd_opt(2024, 3, 9)
                .and_then(|d| d.and_hms_opt(23, 59, 0)),
            ..Default::default()
        };

        assert_eq!(trade.trade_date(), NaiveDate::from_ymd_opt(2024, 3, 9));
        assert_eq!(trade.year_month().as_deref(), Some("2024-03"));

        let undated = TradeRecord::default();
        assert_eq!(undated.trade_date(), None);
        assert_eq!(undated.year_month(), None);
    }
}
