//! Data models for trades, sentiment readings, joined rows, aggregates and the run summary.

mod aggregates;
mod joined;
mod sentiment;
mod summary;
mod trade;

pub use aggregates::{
    AccountRow, AnalysisResults, MonthlyRow, ProfitabilityRow, RiskRow, RunTotals,
    SentimentMetrics, SideRow, TokenVolume, VolumeAnalysis, VolumeRow,
};
pub use joined::{AnalyzedTrade, DerivedMetrics, JoinedTrade};
pub use sentiment::{SentimentClass, SentimentRecord};
pub use summary::{AnalysisSummary, DateRange, KeyInsights};
pub use trade::{TradeRecord, TradeSide};
