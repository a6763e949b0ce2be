//! Report output
//!
//! The sample stream goes to stdout through [`ReportFormatter`]. Human-facing
//! run information goes to stderr through [`RunBanner`], so piping stdout
//! into another tool always yields bare numbers.

mod banner;
mod formatter;

pub use banner::RunBanner;
pub use formatter::{ReportFormatter, ReportSummary};
