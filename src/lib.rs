//! Pingpong Latency
//!
//! A paced ping-pong benchmark that measures one-way or round-trip message
//! latency between two endpoints. The initiator sends fixed-size payloads on
//! a steady schedule, records send and receive timestamps for every
//! iteration, and prints one latency line per reported iteration.

pub mod app;
pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod executor;
pub mod ledger;
pub mod logging;
pub mod models;
pub mod output;
pub mod pacing;
pub mod protocol;
pub mod transport;
pub mod types;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, MonotonicClock, Nanos, Timestamp};
pub use error::{AppError, Result};
pub use executor::{run_initiator, run_local, run_responder, RunOutcome};
pub use ledger::{IterationSample, Ledger};
pub use models::{Config, RunConfig, Termination};
pub use output::{ReportFormatter, ReportSummary};
pub use pacing::PacingController;
pub use transport::{LocalTransport, TcpTransport, Transport};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Build metadata exported by build.rs
pub mod build_info {
    pub const BUILD_TIME: &str = env!("BUILD_TIME");
    pub const TARGET_TRIPLE: &str = env!("TARGET_TRIPLE");
    pub const GIT_COMMIT: Option<&str> = option_env!("GIT_COMMIT");
    pub const OPTIMIZED: bool = cfg!(release_build);

    /// One-line description for `--debug` output
    pub fn describe() -> String {
        match GIT_COMMIT {
            Some(commit) => format!("{} v{} ({}, {}, built {})", crate::PKG_NAME, crate::VERSION, commit, TARGET_TRIPLE, BUILD_TIME),
            None => format!("{} v{} ({}, built {})", crate::PKG_NAME, crate::VERSION, TARGET_TRIPLE, BUILD_TIME),
        }
    }
}

/// Default configuration values
pub mod defaults {
    use crate::types::TimeUnit;
    use std::time::Duration;

    pub const DEFAULT_ITERATIONS: u64 = 20;
    pub const DEFAULT_SKIP: u64 = 0;
    pub const DEFAULT_FREQUENCY_US: u64 = 0;
    pub const DEFAULT_UNITS: TimeUnit = TimeUnit::Us;
    pub const DEFAULT_MESSAGE_SIZE: usize = 4;
    pub const DEFAULT_PAGE_SIZE: usize = crate::ledger::DEFAULT_PAGE_CAPACITY;
    pub const DEFAULT_ADDRESS: &str = "127.0.0.1:7878";
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_ENABLE_COLOR: bool = true;

    /// Nanoseconds expressed in seconds need nine places; more is noise
    pub const MAX_PRECISION: usize = 9;
    /// Pages smaller than this allocate noticeably often inside the timed loop
    pub const MIN_RECOMMENDED_PAGE_SIZE: usize = 64;
    pub const LARGE_MESSAGE_SIZE: usize = 1024 * 1024;
}
