//! Per-trade derived fields: win/loss and side flags, absolute PnL, risk-reward ratio.

use crate::models::{AnalyzedTrade, DerivedMetrics, JoinedTrade, TradeSide};

/// Computes [`DerivedMetrics`] for joined trades.
pub struct MetricDeriver {
    /// Whether the export carried a side column at all
    side_present: bool,
}

impl MetricDeriver {
    pub fn new(side_present: bool) -> Self {
        Self { side_present }
    }

    /// Attach derived metrics to every joined trade, preserving order.
    pub fn apply(&self, joined: Vec<JoinedTrade>) -> Vec<AnalyzedTrade> {
        joined
            .into_iter()
            .map(|row| {
                let metrics = self.derive(&row);
                AnalyzedTrade { joined: row, metrics }
            })
            .collect()
    }

    /// Derive the metrics for a single trade.
    pub fn derive(&self, row: &JoinedTrade) -> DerivedMetrics {
        let trade = &row.trade;
        let pnl = trade.closed_pnl;

        let side = if self.side_present {
            trade.side.as_deref().and_then(TradeSide::from_label)
        } else {
            None
        };

        DerivedMetrics {
            win: pnl.is_some_and(|p| p > 0.0),
            loss: pnl.is_some_and(|p| p < 0.0),
            is_buy: side == Some(TradeSide::Buy),
            is_sell: side == Some(TradeSide::Sell),
            abs_pnl: pnl.map(f64::abs),
            risk_reward_ratio: risk_reward_ratio(pnl, trade.size_usd),
        }
    }
}

/// |PnL| / |size|. Undefined for a zero PnL, an unknown or zero size, or an unknown PnL.
pub fn risk_reward_ratio(pnl: Option<f64>, size_usd: Option<f64>) -> Option<f64> {
    let pnl = pnl.filter(|p| *p != 0.0)?;
    let size = size_usd.filter(|s| *s != 0.0)?;
    Some(pnl.abs() / size.abs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TradeRecord;

    fn joined(pnl: Option<f64>, size: Option<f64>, side: Option<&str>) -> JoinedTrade {
        JoinedTrade {
            trade: TradeRecord {
                account: "0xabc".to_string(),
                side: side.map(str::to_string),
                size_usd: size,
                closed_pnl: pnl,
                ..Default::default()
            },
            date: None,
            classification: None,
            sentiment_value: None,
        }
    }

    #[test]
    fn test_win_loss_flags() {
        let deriver = MetricDeriver::new(true);

        let cases = [
            (Some(10.0), true, false),
            (Some(-5.0), false, true),
            (Some(0.0), false, false),
            (None, false, false),
        ];

        for (pnl, win, loss) in cases {
            let m = deriver.derive(&joined(pnl, Some(100.0), Some("BUY")));
            assert_eq!(m.win, win, "win flag for {:?}", pnl);
            assert_eq!(m.loss, loss, "loss flag for {:?}", pnl);
            assert!(!(m.win && m.loss));
        }
    }

    #[test]
    fn test_risk_reward_ratio() {
        let deriver = MetricDeriver::new(true);

        let m = deriver.derive(&joined(Some(-25.0), Some(-100.0), None));
        assert_eq!(m.abs_pnl, Some(25.0));
        assert_eq!(m.risk_reward_ratio, Some(0.25));

        // Zero PnL never yields a ratio
        let m = deriver.derive(&joined(Some(0.0), Some(100.0), None));
        assert_eq!(m.risk_reward_ratio, None);
        assert_eq!(m.abs_pnl, Some(0.0));

        assert_eq!(risk_reward_ratio(Some(5.0), None), None);
        assert_eq!(risk_reward_ratio(Some(5.0), Some(0.0)), None);
        assert_eq!(risk_reward_ratio(None, Some(10.0)), None);
    }

    #[test]
    fn test_side_flags() {
        let deriver = MetricDeriver::new(true);
        let buy = deriver.derive(&joined(Some(1.0), Some(1.0), Some("buy")));
        assert!(buy.is_buy && !buy.is_sell);

        let sell = deriver.derive(&joined(Some(1.0), Some(1.0), Some("SELL")));
        assert!(sell.is_sell && !sell.is_buy);

        let other = deriver.derive(&joined(Some(1.0), Some(1.0), Some("Open Long")));
        assert!(!other.is_buy && !other.is_sell);
    }

    #[test]
    fn test_side_column_absent() {
        let deriver = MetricDeriver::new(false);
        let m = deriver.derive(&joined(Some(1.0), Some(1.0), Some("BUY")));
        assert!(!m.is_buy);
        assert!(!m.is_sell);
    }

    #[test]
    fn test_apply_preserves_rows() {
        let deriver = MetricDeriver::new(true);
        let rows = vec![
            joined(Some(1.0), Some(10.0), Some("BUY")),
            joined(Some(-1.0), Some(10.0), Some("SELL")),
            joined(None, None, None),
        ];
        let analyzed = deriver.apply(rows.clone());

        assert_eq!(analyzed.len(), rows.len());
        for (a, r) in analyzed.iter().zip(rows.iter()) {
            assert_eq!(&a.joined, r);
        }
    }
}
