//! Configuration data model and validation

use crate::clock::Nanos;
use crate::transport::MAX_FRAME_SIZE;
use crate::types::{AppError, ExchangeMode, Result, TimeUnit, TransportMode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Timed iterations to report
    #[serde(default = "default_iterations")]
    pub iterations: u64,

    /// Run length in seconds; a positive value replaces the iteration count
    #[serde(default)]
    pub duration_secs: f64,

    /// Leading iterations executed but not reported
    #[serde(default)]
    pub skip: u64,

    /// Microseconds between sends, 0 for back-to-back
    #[serde(default)]
    pub frequency_us: u64,

    /// Output unit
    #[serde(default)]
    pub units: TimeUnit,

    /// Decimal places; unit default when absent
    #[serde(default)]
    pub precision: Option<usize>,

    /// Payload size in bytes, control byte included
    #[serde(default = "default_message_size")]
    pub message_size: usize,

    /// Samples per ledger page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Responder echoes every payload
    #[serde(default)]
    pub echo: bool,

    /// Print the relative send time before each latency
    #[serde(default)]
    pub timestamps: bool,

    #[serde(default)]
    pub transport: TransportMode,

    /// Rank of this process in TCP mode
    #[serde(default)]
    pub rank: u32,

    /// Address the responder listens on and the initiator connects to
    #[serde(default = "default_address")]
    pub address: String,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            duration_secs: 0.0,
            skip: crate::defaults::DEFAULT_SKIP,
            frequency_us: crate::defaults::DEFAULT_FREQUENCY_US,
            units: crate::defaults::DEFAULT_UNITS,
            precision: None,
            message_size: default_message_size(),
            page_size: default_page_size(),
            echo: false,
            timestamps: false,
            transport: TransportMode::default(),
            rank: 0,
            address: default_address(),
            connect_timeout_secs: default_connect_timeout_secs(),
            enable_color: default_enable_color(),
            verbose: false,
            debug: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_duration_mode(&self) -> bool {
        self.duration_secs > 0.0
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Precision actually used for output
    pub fn effective_precision(&self) -> usize {
        self.precision.unwrap_or_else(|| self.units.default_precision())
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Result<()> {
        if !self.duration_secs.is_finite() || self.duration_secs < 0.0 {
            return Err(AppError::config(format!(
                "Duration must be a non-negative number of seconds, got {}",
                self.duration_secs
            )));
        }

        if !self.is_duration_mode() && self.iterations == 0 {
            return Err(AppError::config("Iterations must be greater than 0 unless a duration is given"));
        }

        if self.message_size == 0 {
            return Err(AppError::config("Message size must be at least 1 byte"));
        }

        if self.message_size > MAX_FRAME_SIZE {
            return Err(AppError::config(format!(
                "Message size cannot exceed {} bytes",
                MAX_FRAME_SIZE
            )));
        }

        if self.page_size == 0 {
            return Err(AppError::config("Page size must be greater than 0"));
        }

        if let Some(precision) = self.precision {
            if precision > crate::defaults::MAX_PRECISION {
                return Err(AppError::config(format!(
                    "Precision cannot exceed {} digits",
                    crate::defaults::MAX_PRECISION
                )));
            }
        }

        if self.rank > 1 {
            return Err(AppError::config(format!("Rank must be 0 or 1, got {}", self.rank)));
        }

        if self.transport == TransportMode::Tcp {
            if self.address.trim().is_empty() {
                return Err(AppError::config("Address cannot be empty in TCP mode"));
            }
            if self.connect_timeout_secs == 0 {
                return Err(AppError::config("Connect timeout must be greater than 0"));
            }
        }

        Ok(())
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Ok(iterations) = std::env::var("PINGPONG_ITERATIONS") {
            self.iterations = iterations.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid PINGPONG_ITERATIONS value '{}': {}", iterations, e)))?;
        }

        if let Ok(skip) = std::env::var("PINGPONG_SKIP") {
            self.skip = skip.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid PINGPONG_SKIP value '{}': {}", skip, e)))?;
        }

        if let Ok(frequency) = std::env::var("PINGPONG_FREQUENCY_US") {
            self.frequency_us = frequency.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid PINGPONG_FREQUENCY_US value '{}': {}", frequency, e)))?;
        }

        if let Ok(duration) = std::env::var("PINGPONG_DURATION") {
            self.duration_secs = duration.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid PINGPONG_DURATION value '{}': {}", duration, e)))?;
        }

        if let Ok(units) = std::env::var("PINGPONG_UNITS") {
            self.units = units.parse()
                .map_err(|e: AppError| AppError::config(format!("Invalid PINGPONG_UNITS value: {}", e)))?;
        }

        if let Ok(precision) = std::env::var("PINGPONG_PRECISION") {
            self.precision = Some(precision.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid PINGPONG_PRECISION value '{}': {}", precision, e)))?);
        }

        if let Ok(size) = std::env::var("PINGPONG_MESSAGE_SIZE") {
            self.message_size = size.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid PINGPONG_MESSAGE_SIZE value '{}': {}", size, e)))?;
        }

        if let Ok(size) = std::env::var("PINGPONG_PAGE_SIZE") {
            self.page_size = size.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid PINGPONG_PAGE_SIZE value '{}': {}", size, e)))?;
        }

        if let Ok(address) = std::env::var("PINGPONG_ADDRESS") {
            self.address = address.trim().to_string();
        }

        if let Ok(enable_color) = std::env::var("PINGPONG_ENABLE_COLOR") {
            self.enable_color = enable_color.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid PINGPONG_ENABLE_COLOR value '{}': {}", enable_color, e)))?;
        }

        Ok(())
    }

    /// Resolve into the immutable parameters of one benchmark run
    pub fn run_config(&self) -> RunConfig {
        let termination = if self.is_duration_mode() {
            Termination::Duration(Nanos::from_secs_f64(self.duration_secs))
        } else {
            Termination::Iterations(self.iterations)
        };

        RunConfig {
            termination,
            skip: self.skip,
            pacing_interval: Nanos::from_micros(self.frequency_us),
            message_size: self.message_size,
            mode: ExchangeMode::from_echo_flag(self.echo),
            unit: self.units,
            precision: self.effective_precision(),
            timestamps: self.timestamps,
            page_size: self.page_size,
        }
    }
}

/// What ends the timed loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// Fixed number of reported iterations
    Iterations(u64),
    /// Wall-clock length measured from the first reported send
    Duration(Nanos),
}

/// Immutable parameters of one benchmark run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    pub termination: Termination,
    pub skip: u64,
    pub pacing_interval: Nanos,
    pub message_size: usize,
    pub mode: ExchangeMode,
    pub unit: TimeUnit,
    pub precision: usize,
    pub timestamps: bool,
    pub page_size: usize,
}

impl RunConfig {
    /// Iteration count announced in the setup message; 0 in duration mode
    pub fn setup_iterations(&self) -> u64 {
        match self.termination {
            Termination::Iterations(requested) => requested.saturating_add(self.skip),
            Termination::Duration(_) => 0,
        }
    }

    pub fn is_duration_mode(&self) -> bool {
        matches!(self.termination, Termination::Duration(_))
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Config::default().run_config()
    }
}

// Default value functions for serde
fn default_iterations() -> u64 {
    crate::defaults::DEFAULT_ITERATIONS
}

fn default_message_size() -> usize {
    crate::defaults::DEFAULT_MESSAGE_SIZE
}

fn default_page_size() -> usize {
    crate::defaults::DEFAULT_PAGE_SIZE
}

fn default_address() -> String {
    crate::defaults::DEFAULT_ADDRESS.to_string()
}

fn default_connect_timeout_secs() -> u64 {
    crate::defaults::DEFAULT_CONNECT_TIMEOUT.as_secs()
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.iterations, 20);
        assert_eq!(config.units, TimeUnit::Us);
        assert_eq!(config.message_size, 4);
        assert_eq!(config.page_size, 1024);
    }

    #[test]
    fn test_zero_iterations_invalid_without_duration() {
        let mut config = Config::default();
        config.iterations = 0;
        assert!(config.validate().is_err());

        config.duration_secs = 1.5;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_negative_duration_invalid() {
        let mut config = Config::default();
        config.duration_secs = -1.0;
        assert!(config.validate().is_err());
        config.duration_secs = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_sizes_invalid() {
        let mut config = Config::default();
        config.message_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.page_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.message_size = MAX_FRAME_SIZE + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rank_and_tcp_settings() {
        let mut config = Config::default();
        config.rank = 2;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.transport = TransportMode::Tcp;
        config.address = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duration_overrides_iterations() {
        let mut config = Config::default();
        config.iterations = 50;
        config.duration_secs = 2.0;

        let run = config.run_config();
        assert_eq!(run.termination, Termination::Duration(Nanos::new(2_000_000_000)));
        assert_eq!(run.setup_iterations(), 0);
        assert!(run.is_duration_mode());
    }

    #[test]
    fn test_run_config_resolution() {
        let mut config = Config::default();
        config.iterations = 20;
        config.skip = 5;
        config.frequency_us = 250;
        config.units = TimeUnit::Ms;
        config.echo = true;

        let run = config.run_config();
        assert_eq!(run.termination, Termination::Iterations(20));
        assert_eq!(run.setup_iterations(), 25);
        assert_eq!(run.pacing_interval, Nanos::new(250_000));
        assert_eq!(run.precision, 6);
        assert_eq!(run.mode, ExchangeMode::Echo);
    }

    #[test]
    fn test_explicit_precision_wins() {
        let mut config = Config::default();
        config.units = TimeUnit::S;
        config.precision = Some(2);
        assert_eq!(config.run_config().precision, 2);

        config.precision = Some(crate::defaults::MAX_PRECISION + 1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: Config = serde_json::from_str(r#"{"iterations": 7, "units": "ns"}"#).unwrap();
        assert_eq!(config.iterations, 7);
        assert_eq!(config.units, TimeUnit::Ns);
        assert_eq!(config.page_size, crate::defaults::DEFAULT_PAGE_SIZE);
    }
}
