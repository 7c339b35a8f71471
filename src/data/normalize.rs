//! Type coercion for the raw sentiment and trade tables.
//!
//! Coercion never fails a row: an unparseable cell becomes `None`. Only a
//! missing required column aborts.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::{debug, info, warn};

use anyhow::Result;

use super::columns;
use super::loader::{cell, RawTable};
use crate::models::{SentimentClass, SentimentRecord, TradeRecord};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

const STANDARD_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DAY_FIRST_DATETIME_FORMATS: &[&str] = &[
    "%d-%m-%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
];

const DAY_FIRST_DATE_FORMATS: &[&str] = &["%d-%m-%Y", "%d/%m/%Y", "%d.%m.%Y"];

/// Which trade column the execution time was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampSource {
    /// `Timestamp IST`, day-first
    DayFirst,
    /// `Timestamp`, ISO / epoch milliseconds
    Standard,
    /// Neither column present; every timestamp is null
    Missing,
}

/// Optional trade columns found in the export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnPresence {
    pub side: bool,
    pub size_tokens: bool,
    pub execution_price: bool,
    pub timestamp: TimestampSource,
}

impl Default for ColumnPresence {
    fn default() -> Self {
        Self {
            side: true,
            size_tokens: true,
            execution_price: true,
            timestamp: TimestampSource::DayFirst,
        }
    }
}

/// Sentiment readings kept after coercion.
#[derive(Debug, Clone, Default)]
pub struct SentimentDataset {
    pub records: Vec<SentimentRecord>,
    /// Rows discarded for an unparseable date or empty classification
    pub dropped: usize,
}

/// Coerced trades plus the optional columns they were read with.
#[derive(Debug, Clone, Default)]
pub struct TradeDataset {
    pub records: Vec<TradeRecord>,
    pub columns: ColumnPresence,
}

/// Coerce a numeric cell. Empty, malformed and non-finite values become `None`.
pub fn parse_numeric(raw: Option<&str>) -> Option<f64> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Smallest value read as epoch milliseconds (early March 1973). Smaller
/// numbers are years, compact dates or epoch seconds, none of which are taken.
const MIN_EPOCH_MILLIS: f64 = 1e11;

/// Parse a day-level date as published by the sentiment index.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| parse_iso_timestamp(raw).map(|ts| ts.date()))
}

/// RFC 3339 or year-first `YYYY-MM-DD[ HH:MM[:SS]]` notation.
fn parse_iso_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.naive_local());
    }

    STANDARD_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Parse a timestamp in standard (year-first) notation, or epoch milliseconds.
pub fn parse_standard_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some(ts) = parse_iso_timestamp(raw) {
        return Some(ts);
    }

    // Exchange exports carry epoch milliseconds in the plain `Timestamp` column
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= MIN_EPOCH_MILLIS)
        .and_then(|ms| DateTime::from_timestamp_millis(ms as i64))
        .map(|ts| ts.naive_utc())
}

/// Parse a day-first timestamp (`DD-MM-YYYY HH:MM`), accepting ISO input as well.
pub fn parse_day_first_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    DAY_FIRST_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DAY_FIRST_DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .or_else(|| parse_iso_timestamp(raw))
}

/// Coerce the sentiment table. Rows with an unparseable date or an empty
/// classification are dropped; unknown labels are kept with no classification.
pub fn normalize_sentiment(table: &RawTable) -> Result<SentimentDataset> {
    let date_col = table.require_column(columns::DATE)?;
    let class_col = table.require_column(columns::CLASSIFICATION)?;
    let value_col = table.require_column(columns::VALUE)?;

    let mut dataset = SentimentDataset::default();
    let mut unknown_labels = 0usize;

    for row in table.rows() {
        let date = row.get(date_col).and_then(parse_date);
        let label = row.get(class_col).map(str::trim).unwrap_or_default();

        let Some(date) = date else {
            dataset.dropped += 1;
            continue;
        };
        if label.is_empty() {
            dataset.dropped += 1;
            continue;
        }

        let classification = SentimentClass::from_label(label);
        if classification.is_none() {
            unknown_labels += 1;
            debug!(label = %label, date = %date, "Unknown sentiment label");
        }

        dataset.records.push(SentimentRecord {
            date,
            classification,
            value: parse_numeric(row.get(value_col)),
        });
    }

    if unknown_labels > 0 {
        warn!(count = unknown_labels, "Sentiment rows with unrecognised classification");
    }
    info!(
        kept = dataset.records.len(),
        dropped = dataset.dropped,
        "Normalized sentiment index"
    );

    Ok(dataset)
}

/// Coerce the trade table.
pub fn normalize_trades(table: &RawTable) -> Result<TradeDataset> {
    let account_col = table.require_column(columns::ACCOUNT)?;
    let pnl_col = table.require_column(columns::CLOSED_PNL)?;
    let size_usd_col = table.require_column(columns::SIZE_USD)?;
    let fee_col = table.require_column(columns::FEE)?;

    let side_col = table.column(columns::SIDE);
    let tokens_col = table.column(columns::SIZE_TOKENS);
    let price_col = table.column(columns::EXECUTION_PRICE);

    let (timestamp, ts_col) = if let Some(i) = table.column(columns::TIMESTAMP_IST) {
        (TimestampSource::DayFirst, Some(i))
    } else if let Some(i) = table.column(columns::TIMESTAMP) {
        (TimestampSource::Standard, Some(i))
    } else {
        warn!("Trade export has no timestamp column; trades cannot be matched to sentiment");
        (TimestampSource::Missing, None)
    };

    let columns = ColumnPresence {
        side: side_col.is_some(),
        size_tokens: tokens_col.is_some(),
        execution_price: price_col.is_some(),
        timestamp,
    };

    let mut records = Vec::with_capacity(table.row_count());
    let mut bad_timestamps = 0usize;

    for row in table.rows() {
        let raw_ts = cell(row, ts_col);
        let ts = raw_ts.and_then(|raw| match timestamp {
            TimestampSource::DayFirst => parse_day_first_timestamp(raw),
            TimestampSource::Standard => parse_standard_timestamp(raw),
            TimestampSource::Missing => None,
        });
        if ts.is_none() && ts_col.is_some() {
            bad_timestamps += 1;
        }

        records.push(TradeRecord {
            account: row.get(account_col).map(str::trim).unwrap_or_default().to_string(),
            side: cell(row, side_col).map(str::to_string),
            execution_price: parse_numeric(cell(row, price_col)),
            size_usd: parse_numeric(row.get(size_usd_col)),
            size_tokens: parse_numeric(cell(row, tokens_col)),
            fee: parse_numeric(row.get(fee_col)),
            closed_pnl: parse_numeric(row.get(pnl_col)),
            timestamp: ts,
        });
    }

    if bad_timestamps > 0 {
        warn!(count = bad_timestamps, "Trades with unparseable timestamps");
    }
    info!(
        trades = records.len(),
        side = columns.side,
        size_tokens = columns.size_tokens,
        timestamp = ?columns.timestamp,
        "Normalized trade history"
    );

    Ok(TradeDataset { records, columns })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_numeric() {
        assert_eq!(parse_numeric(Some("12.5")), Some(12.5));
        assert_eq!(parse_numeric(Some(" -3 ")), Some(-3.0));
        assert_eq!(parse_numeric(Some("1,234")), None);
        assert_eq!(parse_numeric(Some("abc")), None);
        assert_eq!(parse_numeric(Some("")), None);
        assert_eq!(parse_numeric(Some("NaN")), None);
        assert_eq!(parse_numeric(None), None);
    }

    #[test]
    fn test_parse_dates() {
        assert_eq!(parse_date("2024-01-05"), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_date("2024/01/05"), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_date("01/05/2024"), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_date("2024-01-05 13:00:00"), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_date("not a date"), None);
    }

    #[test]
    fn test_numeric_dates_are_not_epochs() {
        // Epoch seconds and bare years are not calendar dates
        assert_eq!(parse_date("1704067200"), None);
        assert_eq!(parse_date("1704067200000"), None);
        assert_eq!(parse_date("2024"), None);

        assert_eq!(parse_standard_timestamp("2024"), None);
        assert_eq!(parse_standard_timestamp("20240105"), None);
        assert_eq!(parse_standard_timestamp("1704067200"), None);
    }

    #[test]
    fn test_day_first_timestamp() {
        let ts = parse_day_first_timestamp("02-12-2024 22:50").unwrap();
        assert_eq!(ts.date(), ymd(2024, 12, 2));

        let ts = parse_day_first_timestamp("13/01/2025 08:05:10").unwrap();
        assert_eq!(ts.date(), ymd(2025, 1, 13));

        let ts = parse_day_first_timestamp("2024-01-05T10:00:00Z").unwrap();
        assert_eq!(ts, ymd(2024, 1, 5).and_hms_opt(10, 0, 0).unwrap());

        let ts = parse_day_first_timestamp("2024-01-05T23:30:00+05:30").unwrap();
        assert_eq!(ts.date(), ymd(2024, 1, 5));

        assert_eq!(parse_day_first_timestamp("31-31-2024 10:00"), None);
        assert_eq!(parse_day_first_timestamp("garbage"), None);
    }

    #[test]
    fn test_standard_timestamp() {
        let ts = parse_standard_timestamp("2024-03-01 10:15:00").unwrap();
        assert_eq!(ts.date(), ymd(2024, 3, 1));

        let ts = parse_standard_timestamp("2024-03-01T23:30:00+05:30").unwrap();
        assert_eq!(ts.date(), ymd(2024, 3, 1));

        // 2024-01-01T00:00:00Z in milliseconds
        let ts = parse_standard_timestamp("1704067200000").unwrap();
        assert_eq!(ts.date(), ymd(2024, 1, 1));
    }

    #[test]
    fn test_normalize_sentiment_drops_and_keeps() {
        let csv = "\
date,classification,value
2024-01-01,Fear,20
bad-date,Greed,70
2024-01-02,,50
2024-01-03,Euphoria,90
2024-01-04,Greed,oops
";
        let table = RawTable::from_reader(csv.as_bytes()).unwrap();
        let dataset = normalize_sentiment(&table).unwrap();

        assert_eq!(dataset.dropped, 2);
        assert_eq!(dataset.records.len(), 3);
        assert_eq!(dataset.records[0].classification, Some(SentimentClass::Fear));
        assert_eq!(dataset.records[0].value, Some(20.0));
        // Unknown label kept, but unclassified
        assert_eq!(dataset.records[1].classification, None);
        assert_eq!(dataset.records[1].value, Some(90.0));
        assert_eq!(dataset.records[2].value, None);
    }

    #[test]
    fn test_normalize_trades_prefers_ist_column() {
        let csv = "\
Account,Side,Closed PnL,Size USD,Fee,Timestamp IST,Timestamp
0xa,BUY,10,100,0.1,01-01-2024 10:00,2023-06-01 00:00:00
0xb,SELL,x,200,0.2,not a time,2023-06-01 00:00:00
";
        let table = RawTable::from_reader(csv.as_bytes()).unwrap();
        let dataset = normalize_trades(&table).unwrap();

        assert_eq!(dataset.columns.timestamp, TimestampSource::DayFirst);
        assert!(dataset.columns.side);
        assert!(!dataset.columns.size_tokens);
        assert!(!dataset.columns.execution_price);

        let first = &dataset.records[0];
        assert_eq!(first.trade_date(), Some(ymd(2024, 1, 1)));
        assert_eq!(first.closed_pnl, Some(10.0));
        assert_eq!(first.size_tokens, None);

        // Column-level choice: no per-row fallback to `Timestamp`
        let second = &dataset.records[1];
        assert_eq!(second.timestamp, None);
        assert_eq!(second.closed_pnl, None);
        assert_eq!(second.size_usd, Some(200.0));
    }

    #[test]
    fn test_normalize_trades_fallback_and_missing_timestamp() {
        let csv = "Account,Closed PnL,Size USD,Fee,Timestamp\n0xa,1,10,0,2024-02-03 04:05:06\n";
        let table = RawTable::from_reader(csv.as_bytes()).unwrap();
        let dataset = normalize_trades(&table).unwrap();
        assert_eq!(dataset.columns.timestamp, TimestampSource::Standard);
        assert_eq!(dataset.records[0].trade_date(), Some(ymd(2024, 2, 3)));
        assert!(!dataset.columns.side);
        assert_eq!(dataset.records[0].side, None);

        let csv = "Account,Closed PnL,Size USD,Fee\n0xa,1,10,0\n";
        let table = RawTable::from_reader(csv.as_bytes()).unwrap();
        let dataset = normalize_trades(&table).unwrap();
        assert_eq!(dataset.columns.timestamp, TimestampSource::Missing);
        assert_eq!(dataset.records[0].timestamp, None);
    }

    #[test]
    fn test_normalize_trades_requires_pnl() {
        let csv = "Account,Size USD,Fee\n0xa,10,0\n";
        let table = RawTable::from_reader(csv.as_bytes()).unwrap();
        assert!(normalize_trades(&table).is_err());
    }
}
