//! Left join of trades onto the daily sentiment index.

use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::models::{JoinedTrade, SentimentRecord, TradeRecord};

/// Sentiment readings keyed by calendar date.
///
/// The index is unique per date: when the input repeats a date, the first
/// reading is kept so the join can never fan out.
pub struct SentimentIndex<'a> {
    by_date: HashMap<NaiveDate, &'a SentimentRecord>,
}

impl<'a> SentimentIndex<'a> {
    pub fn new(records: &'a [SentimentRecord]) -> Self {
        let mut by_date = HashMap::with_capacity(records.len());
        let mut duplicates = 0;

        for record in records {
            if by_date.contains_key(&record.date) {
                duplicates += 1;
                continue;
            }
            by_date.insert(record.date, record);
        }

        if duplicates > 0 {
            warn!(count = duplicates, "Duplicate sentiment dates ignored (first reading kept)");
        }

        Self { by_date }
    }

    pub fn get(&self, date: NaiveDate) -> Option<&'a SentimentRecord> {
        self.by_date.get(&date).copied()
    }

    /// Number of distinct dates with a reading.
    pub fn days(&self) -> usize {
        self.by_date.len()
    }
}

/// Attach the sentiment of each trade's date. Every trade is kept, in input order;
/// trades without a date or without a reading for their date get nulls.
pub fn left_join(trades: Vec<TradeRecord>, sentiment: &[SentimentRecord]) -> Vec<JoinedTrade> {
    let index = SentimentIndex::new(sentiment);

    let joined: Vec<JoinedTrade> = trades
        .into_iter()
        .map(|trade| {
            let date = trade.trade_date();
            let reading = date.and_then(|d| index.get(d));
            JoinedTrade {
                trade,
                date,
                classification: reading.and_then(|r| r.classification),
                sentiment_value: reading.and_then(|r| r.value),
            }
        })
        .collect();

    let matched = joined.iter().filter(|j| j.classification.is_some()).count();
    info!(
        rows = joined.len(),
        with_sentiment = matched,
        sentiment_days = index.days(),
        "Joined trades to sentiment"
    );

    joined
}
