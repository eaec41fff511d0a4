//! Single-pass analytics over a batch of raw API access-log records.
//!
//! [`Analyzer`] validates the batch, aggregates it once, and derives every
//! report section from that aggregation.

pub mod aggregator;
pub mod caching;
pub mod cost;
pub mod endpoint_stats;
pub mod engine;
pub mod performance;
pub mod rate_limit;
pub mod recommendations;
pub mod report;
pub mod summary;
pub mod validator;

pub use engine::{AnalysisRun, Analyzer, RunStats};
pub use report::{AnalysisReport, ReportTail};
