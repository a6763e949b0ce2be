//! Command-line interface

use crate::types::{TimeUnit, TransportMode};
use clap::Parser;
use std::path::PathBuf;

/// Ping-pong latency benchmark - paced round-trip and one-way message timing
#[derive(Parser, Debug, Clone)]
#[command(name = "pingpong")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Echo every payload back and time the full round trip
    #[arg(short = 'r', long)]
    pub receive: bool,

    /// Reported iterations [default: 20]
    #[arg(short, long)]
    pub iterations: Option<u64>,

    /// Run length in seconds; overrides --iterations when positive
    #[arg(short, long, value_parser = parse_duration)]
    pub duration: Option<f64>,

    /// Leading iterations executed but not reported [default: 0]
    #[arg(short, long)]
    pub skip: Option<u64>,

    /// Microseconds between sends, 0 for back-to-back [default: 0]
    #[arg(short, long, value_name = "MICROSECONDS")]
    pub frequency: Option<u64>,

    /// Output unit: s, ms, us or ns [default: us]
    #[arg(short, long, value_parser = parse_unit)]
    pub units: Option<TimeUnit>,

    /// Decimal places [default: 9 for s, 6 for ms, 3 for us, 0 for ns]
    #[arg(short, long)]
    pub precision: Option<usize>,

    /// Print the send time relative to the first reported send before each latency
    #[arg(short, long)]
    pub timestamp: bool,

    /// Payload size in bytes, control byte included [default: 4]
    #[arg(short, long, value_name = "BYTES")]
    pub message_size: Option<usize>,

    /// Samples per results page [default: 1024]
    #[arg(long, value_name = "SAMPLES")]
    pub page_size: Option<usize>,

    /// Transport: local (both roles in this process) or tcp [default: local]
    #[arg(long, value_parser = parse_transport)]
    pub transport: Option<TransportMode>,

    /// Role in tcp mode: 0 drives the run, 1 responds [default: 0]
    #[arg(long)]
    pub rank: Option<u32>,

    /// Address rank 1 listens on and rank 0 connects to [default: 127.0.0.1:7878]
    #[arg(long, value_name = "HOST:PORT")]
    pub address: Option<String>,

    /// Seconds rank 0 keeps retrying the connection [default: 10]
    #[arg(long, value_name = "SECONDS")]
    pub connect_timeout: Option<u64>,

    /// Force colored diagnostics
    #[arg(long)]
    pub color: bool,

    /// Disable colored diagnostics
    #[arg(long)]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,

    /// List supported environment variables and exit
    #[arg(long)]
    pub env_help: bool,

    /// Write an example .env file to PATH and exit
    #[arg(long, value_name = "PATH")]
    pub write_env_example: Option<PathBuf>,
}

impl Cli {
    /// Validate CLI arguments for conflicts and requirements
    pub fn validate(&self) -> Result<(), String> {
        if self.color && self.no_color {
            return Err("Cannot specify both --color and --no-color".to_string());
        }

        if let Some(rank) = self.rank {
            if rank > 1 {
                return Err(format!("--rank must be 0 or 1, got {}", rank));
            }
            if self.transport != Some(TransportMode::Tcp) {
                return Err("--rank requires --transport tcp".to_string());
            }
        }

        if self.message_size == Some(0) {
            return Err("--message-size must be at least 1".to_string());
        }

        if self.page_size == Some(0) {
            return Err("--page-size must be greater than 0".to_string());
        }

        Ok(())
    }

    /// True when the process only prints help material
    pub fn is_info_request(&self) -> bool {
        self.env_help || self.write_env_example.is_some()
    }

    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        if self.color {
            true
        } else if self.no_color {
            false
        } else {
            supports_color()
        }
    }

    /// Get configuration summary for display
    pub fn get_config_summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str("Command-line Overrides:\n");
        if let Some(iterations) = self.iterations {
            summary.push_str(&format!("  Iterations: {}\n", iterations));
        }
        if let Some(duration) = self.duration {
            summary.push_str(&format!("  Duration: {}s\n", duration));
        }
        if let Some(skip) = self.skip {
            summary.push_str(&format!("  Skip: {}\n", skip));
        }
        if let Some(frequency) = self.frequency {
            summary.push_str(&format!("  Send interval: {}us\n", frequency));
        }
        if let Some(units) = self.units {
            summary.push_str(&format!("  Units: {}\n", units));
        }
        if let Some(transport) = self.transport {
            summary.push_str(&format!("  Transport: {}\n", transport));
        }
        summary.push_str(&format!("  Echo: {}\n", self.receive));
        summary.push_str(&format!("  Timestamps: {}\n", self.timestamp));
        summary.push_str(&format!("  Colored output: {}\n", self.use_colors()));
        summary.push_str(&format!("  Verbose mode: {}\n", self.verbose));
        summary.push_str(&format!("  Debug mode: {}\n", self.debug));

        summary
    }
}

/// Parse a run length in seconds
fn parse_duration(s: &str) -> Result<f64, String> {
    let secs: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("Invalid duration: {}", s))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(format!("Duration must be a non-negative number of seconds: {}", s));
    }
    Ok(secs)
}

fn parse_unit(s: &str) -> Result<TimeUnit, String> {
    s.parse::<TimeUnit>().map_err(|e| e.to_string())
}

fn parse_transport(s: &str) -> Result<TransportMode, String> {
    s.parse::<TransportMode>().map_err(|e| e.to_string())
}

/// Check if the terminal supports color output
fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    #[cfg(unix)]
    {
        true
    }
    #[cfg(not(unix))]
    {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_leave_overrides_unset() {
        let cli = Cli::parse_from(["pingpong"]);
        assert!(cli.iterations.is_none());
        assert!(cli.duration.is_none());
        assert!(cli.units.is_none());
        assert!(!cli.receive);
        assert!(!cli.timestamp);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_short_flags() {
        let cli = Cli::parse_from([
            "pingpong", "-r", "-i", "50", "-s", "5", "-f", "100", "-u", "ns", "-p", "2", "-t", "-m", "64",
        ]);
        assert!(cli.receive);
        assert_eq!(cli.iterations, Some(50));
        assert_eq!(cli.skip, Some(5));
        assert_eq!(cli.frequency, Some(100));
        assert_eq!(cli.units, Some(TimeUnit::Ns));
        assert_eq!(cli.precision, Some(2));
        assert!(cli.timestamp);
        assert_eq!(cli.message_size, Some(64));
    }

    #[test]
    fn test_duration_parsing() {
        let cli = Cli::parse_from(["pingpong", "-d", "0.5"]);
        assert_eq!(cli.duration, Some(0.5));

        assert!(Cli::try_parse_from(["pingpong", "-d", "-1"]).is_err());
        assert!(Cli::try_parse_from(["pingpong", "-d", "soon"]).is_err());
    }

    #[test]
    fn test_invalid_unit_rejected() {
        assert!(Cli::try_parse_from(["pingpong", "-u", "minutes"]).is_err());
    }

    #[test]
    fn test_tcp_options() {
        let cli = Cli::parse_from([
            "pingpong", "--transport", "tcp", "--rank", "1", "--address", "0.0.0.0:9000", "--connect-timeout", "3",
        ]);
        assert_eq!(cli.transport, Some(TransportMode::Tcp));
        assert_eq!(cli.rank, Some(1));
        assert_eq!(cli.address.as_deref(), Some("0.0.0.0:9000"));
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_validation_conflicts() {
        let cli = Cli::parse_from(["pingpong", "--color", "--no-color"]);
        assert!(cli.validate().is_err());

        let cli = Cli::parse_from(["pingpong", "--rank", "1"]);
        assert!(cli.validate().unwrap_err().contains("--transport tcp"));

        let cli = Cli::parse_from(["pingpong", "--transport", "tcp", "--rank", "2"]);
        assert!(cli.validate().is_err());

        let cli = Cli::parse_from(["pingpong", "-m", "0"]);
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_no_color_flag() {
        let cli = Cli::parse_from(["pingpong", "--no-color"]);
        assert!(!cli.use_colors());
        let cli = Cli::parse_from(["pingpong", "--color"]);
        assert!(cli.use_colors());
    }

    #[test]
    fn test_config_summary_lists_overrides() {
        let cli = Cli::parse_from(["pingpong", "-i", "9", "-u", "ms"]);
        let summary = cli.get_config_summary();
        assert!(summary.contains("Iterations: 9"));
        assert!(summary.contains("Units: ms"));
        assert!(!summary.contains("Duration"));
    }
}
