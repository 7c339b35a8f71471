//! Per-trade metric derivation and the statistics used by the aggregator.

mod deriver;
mod stats;

pub use deriver::MetricDeriver;
pub use stats::{pearson, Sample};
