//! Daily market sentiment from the Fear & Greed index.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Sentiment classification published for a calendar day.
///
/// Ordering follows the scale, from fear to greed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SentimentClass {
    #[serde(rename = "Extreme Fear")]
    ExtremeFear,
    Fear,
    Neutral,
    Greed,
    #[serde(rename = "Extreme Greed")]
    ExtremeGreed,
}

impl SentimentClass {
    /// Every classification, in scale order.
    pub const ALL: [SentimentClass; 5] = [
        SentimentClass::ExtremeFear,
        SentimentClass::Fear,
        SentimentClass::Neutral,
        SentimentClass::Greed,
        SentimentClass::ExtremeGreed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentClass::ExtremeFear => "Extreme Fear",
            SentimentClass::Fear => "Fear",
            SentimentClass::Neutral => "Neutral",
            SentimentClass::Greed => "Greed",
            SentimentClass::ExtremeGreed => "Extreme Greed",
        }
    }

    /// Parse a published label. Matching ignores case and surrounding whitespace;
    /// anything outside the five known labels yields `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|class| class.as_str().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for SentimentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One day of the sentiment index.
#[derive(Debug, Clone, PartialEq)]
pub struct SentimentRecord {
    /// Calendar day the reading applies to
    pub date: NaiveDate,

    /// Classification, `None` when the published label is not one of the known five
    pub classification: Option<SentimentClass>,

    /// Index value (0-100)
    pub value: Option<f64>,
}
