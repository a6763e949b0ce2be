//! Data models for the ping-pong benchmark

pub mod config;

// Re-export main model types
pub use config::{Config, RunConfig, Termination};
