//! Output side of the analysis: CSV tables, PNG charts and the JSON summary.

pub mod canvas;
pub mod charts;
pub mod summary;
pub mod tables;

pub use charts::render_charts;
pub use summary::{analysis_timestamp, build_summary, read_summary, write_summary};
pub use tables::write_tables;
