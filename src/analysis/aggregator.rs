//! Group-and-summarize views over the analyzed trades.
//!
//! Every view groups by sentiment class and ignores trades whose day has no
//! known classification; those trades still count in [`RunTotals`].

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::data::ColumnPresence;
use crate::metrics::Sample;
use crate::models::{
    AccountRow, AnalysisResults, AnalyzedTrade, KeyInsights, MonthlyRow, ProfitabilityRow,
    RiskRow, RunTotals, SentimentClass, SentimentMetrics, SideRow, TokenVolume, TradeSide,
    VolumeAnalysis, VolumeRow,
};

/// Default number of accounts kept per sentiment class.
pub const DEFAULT_TOP_ACCOUNTS: usize = 5;

type Group<'a> = (SentimentClass, Vec<&'a AnalyzedTrade>);

/// Builds every aggregate view from one slice of analyzed trades.
pub struct Aggregator<'a> {
    trades: &'a [AnalyzedTrade],
    columns: ColumnPresence,
    top_accounts: usize,
}

impl<'a> Aggregator<'a> {
    pub fn new(trades: &'a [AnalyzedTrade], columns: ColumnPresence) -> Self {
        Self {
            trades,
            columns,
            top_accounts: DEFAULT_TOP_ACCOUNTS,
        }
    }

    /// Number of accounts kept per class in the top-accounts view.
    pub fn with_top_accounts(mut self, n: usize) -> Self {
        self.top_accounts = n;
        self
    }

    /// Compute all views.
    pub fn run(&self) -> AnalysisResults {
        let sentiment = self.by_sentiment();
        let insights = key_insights(&sentiment);

        let results = AnalysisResults {
            profitability: self.profitability(),
            volume: self.volume(),
            risk: self.risk(),
            sides: self.by_side(),
            monthly: self.monthly(),
            top_accounts: self.top_accounts(),
            totals: self.totals(),
            sentiment,
            insights,
        };

        debug!(
            classes = results.sentiment.len(),
            months = results.monthly.len(),
            accounts = results.top_accounts.len(),
            "Aggregation complete"
        );
        results
    }

    /// Trades bucketed by classification, in scale order. Empty classes are absent.
    fn groups(&self) -> Vec<Group<'a>> {
        let mut buckets: BTreeMap<SentimentClass, Vec<&'a AnalyzedTrade>> = BTreeMap::new();
        for trade in self.trades {
            if let Some(class) = trade.classification() {
                buckets.entry(class).or_default().push(trade);
            }
        }
        buckets.into_iter().collect()
    }

    /// Overall metrics per class, most active class first.
    pub fn by_sentiment(&self) -> Vec<SentimentMetrics> {
        let mut rows: Vec<SentimentMetrics> = self
            .groups()
            .into_iter()
            .map(|(classification, trades)| {
                let size = sample(&trades, AnalyzedTrade::size_usd);
                let pnl = sample(&trades, AnalyzedTrade::pnl);
                let abs_pnl = sample(&trades, |t| t.metrics.abs_pnl);
                let fees = sample(&trades, AnalyzedTrade::fee);
                let wins = trades.iter().filter(|t| t.metrics.win).count();

                SentimentMetrics {
                    classification,
                    total_trades: trades.len(),
                    total_volume_usd: size.sum(),
                    avg_trade_size_usd: size.mean(),
                    std_trade_size: size.std_dev(),
                    total_pnl: pnl.sum(),
                    avg_pnl: pnl.mean(),
                    std_pnl: pnl.std_dev(),
                    median_pnl: pnl.median(),
                    win_rate: wins as f64 / trades.len() as f64,
                    avg_abs_pnl: abs_pnl.mean(),
                    total_fees: fees.sum(),
                }
            })
            .collect();

        // Stable: classes with equal counts keep scale order
        rows.sort_by(|a, b| b.total_trades.cmp(&a.total_trades));
        rows
    }

    /// PnL breakdown with each class's signed share of total absolute PnL.
    pub fn profitability(&self) -> Vec<ProfitabilityRow> {
        let mut rows: Vec<ProfitabilityRow> = self
            .groups()
            .into_iter()
            .map(|(classification, trades)| {
                let pnl = sample(&trades, AnalyzedTrade::pnl);
                let wins = trades.iter().filter(|t| t.metrics.win).count();
                let losses = trades.iter().filter(|t| t.metrics.loss).count();

                ProfitabilityRow {
                    classification,
                    total_pnl: pnl.sum(),
                    avg_pnl: pnl.mean(),
                    median_pnl: pnl.median(),
                    winning_trades: pnl.values().iter().filter(|p| **p > 0.0).count(),
                    losing_trades: pnl.values().iter().filter(|p| **p < 0.0).count(),
                    wins,
                    losses,
                    profit_margin: None,
                }
            })
            .collect();

        let absolute_total: f64 = rows.iter().map(|r| r.total_pnl.abs()).sum();
        if absolute_total > 0.0 {
            for row in &mut rows {
                row.profit_margin = Some(row.total_pnl / absolute_total * 100.0);
            }
        }

        rows
    }

    /// USD volume per class, plus token volume when the export has token sizes.
    pub fn volume(&self) -> VolumeAnalysis {
        let include_tokens = self.columns.size_tokens;

        let rows = self
            .groups()
            .into_iter()
            .map(|(classification, trades)| {
                let size = sample(&trades, AnalyzedTrade::size_usd);
                let tokens = include_tokens.then(|| {
                    let tokens = sample(&trades, AnalyzedTrade::size_tokens);
                    TokenVolume {
                        total_tokens: tokens.sum(),
                        avg_tokens: tokens.mean(),
                    }
                });

                VolumeRow {
                    classification,
                    total_volume_usd: size.sum(),
                    avg_volume_usd: size.mean(),
                    median_volume_usd: size.median(),
                    trade_count: size.count(),
                    tokens,
                }
            })
            .collect();

        VolumeAnalysis {
            include_tokens,
            rows,
        }
    }

    /// Dispersion of outcomes per class.
    pub fn risk(&self) -> Vec<RiskRow> {
        self.groups()
            .into_iter()
            .map(|(classification, trades)| {
                let abs_pnl = sample(&trades, |t| t.metrics.abs_pnl);
                let risk_reward = sample(&trades, |t| t.metrics.risk_reward_ratio);
                let pnl = sample(&trades, AnalyzedTrade::pnl);

                RiskRow {
                    classification,
                    avg_abs_pnl: abs_pnl.mean(),
                    median_abs_pnl: abs_pnl.median(),
                    std_abs_pnl: abs_pnl.std_dev(),
                    avg_risk_reward: risk_reward.mean(),
                    median_risk_reward: risk_reward.median(),
                    pnl_std: pnl.std_dev(),
                    pnl_q25: pnl.quantile(0.25),
                    pnl_q75: pnl.quantile(0.75),
                }
            })
            .collect()
    }

    /// Buy and sell activity per class. Trades that are neither are left out.
    pub fn by_side(&self) -> Vec<SideRow> {
        let mut rows = Vec::new();

        for (classification, trades) in self.groups() {
            for side in [TradeSide::Sell, TradeSide::Buy] {
                let matching: Vec<&AnalyzedTrade> = trades
                    .iter()
                    .copied()
                    .filter(|t| match side {
                        TradeSide::Buy => t.metrics.is_buy,
                        TradeSide::Sell => t.metrics.is_sell,
                    })
                    .collect();

                if matching.is_empty() {
                    continue;
                }

                let size = sample(&matching, AnalyzedTrade::size_usd);
                let pnl = sample(&matching, AnalyzedTrade::pnl);

                rows.push(SideRow {
                    classification,
                    side,
                    trade_count: matching.len(),
                    total_volume: size.sum(),
                    total_pnl: pnl.sum(),
                    avg_pnl: pnl.mean(),
                });
            }
        }

        rows
    }

    /// Calendar-month roll-up per class, ordered by month then class.
    pub fn monthly(&self) -> Vec<MonthlyRow> {
        let mut buckets: BTreeMap<(String, SentimentClass), (usize, f64, f64)> = BTreeMap::new();

        for trade in self.trades {
            let (Some(class), Some(month)) = (trade.classification(), trade.year_month()) else {
                continue;
            };
            let entry = buckets.entry((month, class)).or_insert((0, 0.0, 0.0));
            entry.0 += 1;
            entry.1 += trade.size_usd().unwrap_or(0.0);
            entry.2 += trade.pnl().unwrap_or(0.0);
        }

        buckets
            .into_iter()
            .map(|((year_month, classification), (trade_count, volume, pnl))| MonthlyRow {
                year_month,
                classification,
                trade_count,
                volume,
                pnl,
            })
            .collect()
    }

    /// The most profitable accounts of each class.
    ///
    /// Ties on PnL keep the order in which the accounts first appear in the input.
    pub fn top_accounts(&self) -> Vec<AccountRow> {
        let mut result = Vec::new();

        for (classification, trades) in self.groups() {
            let mut accounts: Vec<AccountRow> = Vec::new();
            let mut position: HashMap<&str, usize> = HashMap::new();

            for trade in trades {
                let account = trade.account();
                if account.is_empty() {
                    continue;
                }
                let idx = *position.entry(account).or_insert_with(|| {
                    accounts.push(AccountRow {
                        classification,
                        account: account.to_string(),
                        total_pnl: 0.0,
                        trade_count: 0,
                        total_volume: 0.0,
                    });
                    accounts.len() - 1
                });

                let row = &mut accounts[idx];
                row.total_pnl += trade.pnl().unwrap_or(0.0);
                row.trade_count += 1;
                row.total_volume += trade.size_usd().unwrap_or(0.0);
            }

            accounts.sort_by(|a, b| b.total_pnl.total_cmp(&a.total_pnl));
            accounts.truncate(self.top_accounts);
            result.extend(accounts);
        }

        result
    }

    /// Ungrouped totals over every trade.
    pub fn totals(&self) -> RunTotals {
        let mut counts: BTreeMap<SentimentClass, usize> = BTreeMap::new();
        for class in self.trades.iter().filter_map(AnalyzedTrade::classification) {
            *counts.entry(class).or_default() += 1;
        }

        let dates = self.trades.iter().filter_map(AnalyzedTrade::date);

        RunTotals {
            total_trades: self.trades.len(),
            trades_with_sentiment: counts.values().sum(),
            first_date: dates.clone().min(),
            last_date: dates.max(),
            distribution: counts.into_iter().collect(),
        }
    }
}

/// Classes holding the highest total volume, average PnL and win rate.
///
/// Rows are scanned in the given order and the first maximum wins.
pub fn key_insights(rows: &[SentimentMetrics]) -> KeyInsights {
    KeyInsights {
        highest_volume_sentiment: argmax(rows, |r| Some(r.total_volume_usd)),
        highest_avg_pnl_sentiment: argmax(rows, |r| r.avg_pnl),
        highest_win_rate_sentiment: argmax(rows, |r| Some(r.win_rate)),
    }
}

fn argmax<F>(rows: &[SentimentMetrics], value: F) -> Option<String>
where
    F: Fn(&SentimentMetrics) -> Option<f64>,
{
    let mut best: Option<(f64, SentimentClass)> = None;
    for row in rows {
        let Some(v) = value(row) else { continue };
        if best.map_or(true, |(b, _)| v > b) {
            best = Some((v, row.classification));
        }
    }
    best.map(|(_, class)| class.to_string())
}

fn sample<F>(trades: &[&AnalyzedTrade], field: F) -> Sample
where
    F: Fn(&AnalyzedTrade) -> Option<f64>,
{
    Sample::from_options(trades.iter().map(|t| field(*t)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::join::left_join;
    use crate::metrics::MetricDeriver;
    use crate::models::{SentimentRecord, TradeRecord};
    use chrono::NaiveDate;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn trade(account: &str, side: &str, pnl: Option<f64>, size: f64, date: Option<NaiveDate>) -> TradeRecord {
        TradeRecord {
            account: account.to_string(),
            side: Some(side.to_string()),
            size_usd: Some(size),
            size_tokens: Some(size / 10.0),
            fee: Some(0.5),
            closed_pnl: pnl,
            timestamp: date.and_then(|d| d.and_hms_opt(9, 30, 0)),
            ..Default::default()
        }
    }

    fn reading(date: NaiveDate, class: SentimentClass) -> SentimentRecord {
        SentimentRecord {
            date,
            classification: Some(class),
            value: Some(50.0),
        }
    }

    fn analyze(trades: Vec<TradeRecord>, sentiment: &[SentimentRecord]) -> Vec<AnalyzedTrade> {
        MetricDeriver::new(true).apply(left_join(trades, sentiment))
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn fixture() -> Vec<AnalyzedTrade> {
        let sentiment = vec![
            reading(day(1, 1), SentimentClass::Fear),
            reading(day(1, 2), SentimentClass::Greed),
            reading(day(2, 1), SentimentClass::Fear),
        ];
        let trades = vec![
            trade("0xa", "BUY", Some(100.0), 1000.0, Some(day(1, 1))),
            trade("0xb", "SELL", Some(-40.0), 500.0, Some(day(1, 1))),
            trade("0xa", "SELL", Some(0.0), 200.0, Some(day(2, 1))),
            trade("0xc", "BUY", Some(30.0), 300.0, Some(day(1, 2))),
            trade("0xd", "BUY", Some(-90.0), 900.0, Some(day(1, 2))),
            trade("0xe", "BUY", Some(500.0), 100.0, Some(day(3, 9))),
            trade("0xf", "BUY", Some(7.0), 70.0, None),
        ];
        analyze(trades, &sentiment)
    }

    #[test]
    fn test_fear_scenario() {
        let sentiment = vec![SentimentRecord {
            date: day(1, 1),
            classification: Some(SentimentClass::Fear),
            value: Some(20.0),
        }];
        let trades = vec![
            trade("0xa", "BUY", Some(10.0), 100.0, Some(day(1, 1))),
            trade("0xb", "SELL", Some(-5.0), 100.0, Some(day(1, 1))),
        ];
        let analyzed = analyze(trades, &sentiment);
        let rows = Aggregator::new(&analyzed, ColumnPresence::default()).by_sentiment();

        assert_eq!(rows.len(), 1);
        let fear = &rows[0];
        assert_eq!(fear.classification, SentimentClass::Fear);
        assert_eq!(fear.total_trades, 2);
        assert!(approx(fear.total_pnl, 5.0));
        assert!(approx(fear.win_rate, 0.5));
    }

    #[test]
    fn test_by_sentiment_sorted_by_trade_count() {
        let analyzed = fixture();
        let rows = Aggregator::new(&analyzed, ColumnPresence::default()).by_sentiment();

        assert_eq!(rows.len(), 2);
        // Fear has three trades, Greed two; ties would keep scale order
        assert_eq!(rows[0].classification, SentimentClass::Fear);
        assert_eq!(rows[0].total_trades, 3);
        assert!(approx(rows[0].total_volume_usd, 1700.0));
        assert!(approx(rows[0].total_pnl, 60.0));
        assert!(approx(rows[0].median_pnl.unwrap(), 0.0));
        assert!(approx(rows[0].win_rate, 1.0 / 3.0));
        assert!(approx(rows[0].total_fees, 1.5));
        assert_eq!(rows[1].classification, SentimentClass::Greed);
    }

    #[test]
    fn test_unmatched_trades_excluded_from_groups_but_counted() {
        let analyzed = fixture();
        let aggregator = Aggregator::new(&analyzed, ColumnPresence::default());

        let grouped: usize = aggregator.by_sentiment().iter().map(|r| r.total_trades).sum();
        let totals = aggregator.totals();

        assert_eq!(grouped, 5);
        assert_eq!(totals.total_trades, 7);
        assert_eq!(totals.trades_with_sentiment, 5);
        assert_eq!(totals.first_date, Some(day(1, 1)));
        assert_eq!(totals.last_date, Some(day(3, 9)));
        assert_eq!(
            totals.distribution,
            vec![(SentimentClass::Fear, 3), (SentimentClass::Greed, 2)]
        );
    }

    #[test]
    fn test_profit_margin_uses_unrounded_sums() {
        let analyzed = fixture();
        let rows = Aggregator::new(&analyzed, ColumnPresence::default()).profitability();

        let denominator: f64 = rows.iter().map(|r| r.total_pnl.abs()).sum();
        for row in &rows {
            assert_eq!(row.profit_margin, Some(row.total_pnl / denominator * 100.0));
        }

        let fear = rows.iter().find(|r| r.classification == SentimentClass::Fear).unwrap();
        assert_eq!(fear.winning_trades, 1);
        assert_eq!(fear.losing_trades, 1);
        assert_eq!(fear.wins, 1);
        assert_eq!(fear.losses, 1);
        // Fear +60, Greed -60: margins are +50% and -50%
        assert!(approx(fear.profit_margin.unwrap(), 50.0));
    }

    #[test]
    fn test_profit_margin_undefined_without_pnl() {
        let sentiment = vec![reading(day(1, 1), SentimentClass::Neutral)];
        let trades = vec![trade("0xa", "BUY", Some(0.0), 10.0, Some(day(1, 1)))];
        let analyzed = analyze(trades, &sentiment);
        let rows = Aggregator::new(&analyzed, ColumnPresence::default()).profitability();

        assert_eq!(rows[0].profit_margin, None);
    }

    #[test]
    fn test_volume_token_columns_follow_input() {
        let analyzed = fixture();

        let with_tokens = Aggregator::new(&analyzed, ColumnPresence::default()).volume();
        assert!(with_tokens.include_tokens);
        assert!(with_tokens.rows.iter().all(|r| r.tokens.is_some()));

        let columns = ColumnPresence {
            size_tokens: false,
            ..Default::default()
        };
        let without = Aggregator::new(&analyzed, columns).volume();
        assert!(!without.include_tokens);
        assert!(without.rows.iter().all(|r| r.tokens.is_none()));
        assert_eq!(without.rows[0].trade_count, 3);
    }

    #[test]
    fn test_risk_view() {
        let analyzed = fixture();
        let rows = Aggregator::new(&analyzed, ColumnPresence::default()).risk();

        let fear = rows.iter().find(|r| r.classification == SentimentClass::Fear).unwrap();
        // |PnL| = 100, 40, 0
        assert!(approx(fear.avg_abs_pnl.unwrap(), 140.0 / 3.0));
        assert!(approx(fear.median_abs_pnl.unwrap(), 40.0));
        // Ratios skip the zero-PnL trade: 0.1 and 0.08
        assert!(approx(fear.avg_risk_reward.unwrap(), 0.09));
        // PnL sorted: -40, 0, 100
        assert!(approx(fear.pnl_q25.unwrap(), -20.0));
        assert!(approx(fear.pnl_q75.unwrap(), 50.0));
    }

    #[test]
    fn test_by_side() {
        let analyzed = fixture();
        let rows = Aggregator::new(&analyzed, ColumnPresence::default()).by_side();

        let fear: Vec<&SideRow> = rows.iter().filter(|r| r.classification == SentimentClass::Fear).collect();
        assert_eq!(fear.len(), 2);
        assert_eq!(fear[0].side, TradeSide::Sell);
        assert_eq!(fear[0].trade_count, 2);
        assert!(approx(fear[0].total_pnl, -40.0));
        assert!(fear[1].is_buy());
        assert_eq!(fear[1].trade_count, 1);

        // Greed has only buys
        let greed: Vec<&SideRow> = rows.iter().filter(|r| r.classification == SentimentClass::Greed).collect();
        assert_eq!(greed.len(), 1);
        assert!(approx(greed[0].avg_pnl.unwrap(), -30.0));
    }

    #[test]
    fn test_monthly_rollup() {
        let analyzed = fixture();
        let rows = Aggregator::new(&analyzed, ColumnPresence::default()).monthly();

        let keys: Vec<(&str, SentimentClass)> =
            rows.iter().map(|r| (r.year_month.as_str(), r.classification)).collect();
        assert_eq!(
            keys,
            vec![
                ("2024-01", SentimentClass::Fear),
                ("2024-01", SentimentClass::Greed),
                ("2024-02", SentimentClass::Fear),
            ]
        );
        assert_eq!(rows[0].trade_count, 2);
        assert!(approx(rows[0].volume, 1500.0));
        assert!(approx(rows[0].pnl, 60.0));
    }

    #[test]
    fn test_top_accounts_limit_and_order() {
        let sentiment = vec![reading(day(1, 1), SentimentClass::Greed)];
        let pnls = [5.0, 50.0, -10.0, 50.0, 20.0, 1.0, 35.0, 0.0];
        let trades: Vec<TradeRecord> = pnls
            .iter()
            .enumerate()
            .map(|(i, p)| trade(&format!("0x{}", i), "BUY", Some(*p), 10.0, Some(day(1, 1))))
            .collect();
        let analyzed = analyze(trades, &sentiment);

        let rows = Aggregator::new(&analyzed, ColumnPresence::default()).top_accounts();
        assert_eq!(rows.len(), 5);

        let accounts: Vec<&str> = rows.iter().map(|r| r.account.as_str()).collect();
        // Equal PnL (0x1, 0x3) keeps first-seen order
        assert_eq!(accounts, vec!["0x1", "0x3", "0x6", "0x4", "0x0"]);

        let min_kept = rows.iter().map(|r| r.total_pnl).fold(f64::INFINITY, f64::min);
        let excluded = [-10.0, 1.0, 0.0];
        assert!(excluded.iter().all(|p| *p <= min_kept));
    }

    #[test]
    fn test_top_accounts_sums_per_account() {
        let analyzed = fixture();
        let rows = Aggregator::new(&analyzed, ColumnPresence::default())
            .with_top_accounts(1)
            .top_accounts();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].classification, SentimentClass::Fear);
        assert_eq!(rows[0].account, "0xa");
        assert!(approx(rows[0].total_pnl, 100.0));
        assert_eq!(rows[0].trade_count, 2);
        assert!(approx(rows[0].total_volume, 1200.0));
    }

    #[test]
    fn test_key_insights() {
        let analyzed = fixture();
        let results = Aggregator::new(&analyzed, ColumnPresence::default()).run();

        assert_eq!(results.insights.highest_volume_sentiment.as_deref(), Some("Fear"));
        assert_eq!(results.insights.highest_avg_pnl_sentiment.as_deref(), Some("Fear"));
        assert_eq!(results.insights.highest_win_rate_sentiment.as_deref(), Some("Greed"));

        assert_eq!(key_insights(&[]), KeyInsights::default());
    }
}
