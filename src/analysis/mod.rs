//! Sentiment analysis: join, aggregation and the end-to-end pipeline.

pub(crate) mod aggregator;
mod config;
mod join;
mod pipeline;

pub use config::{AnalysisConfig, ChartConfig};
pub use pipeline::Pipeline;
