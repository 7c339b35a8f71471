//! Input side of the pipeline: CSV loading and type coercion.

mod loader;
mod normalize;

pub use loader::RawTable;
pub use normalize::{
    normalize_sentiment, normalize_trades, ColumnPresence, SentimentDataset, TradeDataset,
};

/// Column names of the two input files, as they appear after header trimming.
pub mod columns {
    // Sentiment index
    pub const DATE: &str = "date";
    pub const CLASSIFICATION: &str = "classification";
    pub const VALUE: &str = "value";

    // Trade history
    pub const ACCOUNT: &str = "Account";
    pub const SIDE: &str = "Side";
    pub const CLOSED_PNL: &str = "Closed PnL";
    pub const SIZE_USD: &str = "Size USD";
    pub const SIZE_TOKENS: &str = "Size Tokens";
    pub const EXECUTION_PRICE: &str = "Execution Price";
    pub const FEE: &str = "Fee";
    pub const TIMESTAMP_IST: &str = "Timestamp IST";
    pub const TIMESTAMP: &str = "Timestamp";
}
