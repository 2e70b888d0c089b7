#![doc = include_str!("../README.md")]

pub mod error;
pub mod junit;
pub mod summary;

pub use error::ReportError;
pub use junit::{FailureDetail, MAX_REASON_CHARS, TestResultSummary, parse_junit, parse_results};
pub use summary::{RunSummary, build_summary, write_summary};
