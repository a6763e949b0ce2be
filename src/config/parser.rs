//! Configuration parsing from CLI arguments and environment variables

use crate::{cli::Cli, config::env::EnvManager, error::Result, models::Config};

/// Configuration parser that combines CLI arguments with environment variables
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    /// Create a new configuration parser with CLI arguments
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Parse and build the complete configuration
    pub fn parse(&self) -> Result<Config> {
        let mut config = Config::default();

        self.load_env_file()?;
        config.merge_from_env()?;
        self.apply_cli_overrides(&mut config);
        config.validate()?;

        Ok(config)
    }

    /// Load .env file if it exists
    fn load_env_file(&self) -> Result<()> {
        EnvManager::load_env_file(self.cli.debug)
    }

    /// Apply CLI argument overrides to configuration
    fn apply_cli_overrides(&self, config: &mut Config) {
        let cli = &self.cli;

        if let Some(iterations) = cli.iterations {
            config.iterations = iterations;
        }
        if let Some(duration) = cli.duration {
            config.duration_secs = duration;
        }
        if let Some(skip) = cli.skip {
            config.skip = skip;
        }
        if let Some(frequency) = cli.frequency {
            config.frequency_us = frequency;
        }
        if let Some(units) = cli.units {
            config.units = units;
        }
        if cli.precision.is_some() {
            config.precision = cli.precision;
        }
        if let Some(size) = cli.message_size {
            config.message_size = size;
        }
        if let Some(size) = cli.page_size {
            config.page_size = size;
        }
        if let Some(transport) = cli.transport {
            config.transport = transport;
        }
        if let Some(rank) = cli.rank {
            config.rank = rank;
        }
        if let Some(ref address) = cli.address {
            config.address = address.clone();
        }
        if let Some(timeout) = cli.connect_timeout {
            config.connect_timeout_secs = timeout;
        }

        if cli.receive {
            config.echo = true;
        }
        if cli.timestamp {
            config.timestamps = true;
        }

        if cli.no_color {
            config.enable_color = false;
        } else if cli.color {
            config.enable_color = true;
        } else if !cli.use_colors() {
            config.enable_color = false;
        }

        // CLI-only flags
        config.verbose = cli.verbose;
        config.debug = cli.debug;

        if config.debug {
            eprintln!("Applied CLI overrides to configuration");
            eprintln!(
                "Final config: iterations={}, duration={}s, skip={}, frequency={}us, units={}",
                config.iterations, config.duration_secs, config.skip, config.frequency_us, config.units
            );
        }
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<Config> {
    ConfigParser::new(cli).parse()
}

/// Display configuration summary for debug purposes
pub fn display_config_summary(config: &Config) -> String {
    let mut summary = Vec::new();

    if config.is_duration_mode() {
        summary.push(format!("Duration: {}s", config.duration_secs));
    } else {
        summary.push(format!("Iterations: {}", config.iterations));
    }
    summary.push(format!("Skip: {}", config.skip));
    summary.push(format!("Send Interval: {}us", config.frequency_us));
    summary.push(format!("Exchange: {}", if config.echo { "echo" } else { "one-way" }));
    summary.push(format!("Message Size: {} bytes", config.message_size));
    summary.push(format!("Units: {} (precision {})", config.units, config.effective_precision()));
    summary.push(format!("Timestamps: {}", config.timestamps));
    summary.push(format!("Page Size: {} samples", config.page_size));
    summary.push(format!("Transport: {}", config.transport));
    if config.transport == crate::types::TransportMode::Tcp {
        summary.push(format!("Rank: {}", config.rank));
        summary.push(format!("Address: {}", config.address));
    }
    summary.push(format!("Color Output: {}", config.enable_color));
    summary.push(format!("Verbose: {}", config.verbose));
    summary.push(format!("Debug: {}", config.debug));

    summary.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ENV_LOCK;
    use crate::types::TimeUnit;
    use clap::Parser;
    use std::env;

    const ENV_VARS: &[&str] = &[
        "PINGPONG_ITERATIONS",
        "PINGPONG_SKIP",
        "PINGPONG_FREQUENCY_US",
        "PINGPONG_DURATION",
        "PINGPONG_UNITS",
        "PINGPONG_PRECISION",
        "PINGPONG_MESSAGE_SIZE",
        "PINGPONG_PAGE_SIZE",
        "PINGPONG_ADDRESS",
        "PINGPONG_ENABLE_COLOR",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_cli_overrides() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();

        let cli = Cli::parse_from(["pingpong", "-i", "10", "-s", "2", "-u", "ms", "-r", "--no-color", "--verbose"]);
        let config = ConfigParser::new(cli).parse().unwrap();

        assert_eq!(config.iterations, 10);
        assert_eq!(config.skip, 2);
        assert_eq!(config.units, TimeUnit::Ms);
        assert!(config.echo);
        assert!(!config.enable_color);
        assert!(config.verbose);
    }

    #[test]
    fn test_env_vars_apply() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();

        env::set_var("PINGPONG_ITERATIONS", "33");
        env::set_var("PINGPONG_UNITS", "ns");
        env::set_var("PINGPONG_FREQUENCY_US", "250");

        let config = load_config(Cli::parse_from(["pingpong"]));
        clear_env();

        let config = config.unwrap();
        assert_eq!(config.iterations, 33);
        assert_eq!(config.units, TimeUnit::Ns);
        assert_eq!(config.frequency_us, 250);
    }

    #[test]
    fn test_cli_overrides_env_vars() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();

        env::set_var("PINGPONG_ITERATIONS", "8");
        let config = load_config(Cli::parse_from(["pingpong", "--iterations", "12"]));
        clear_env();

        assert_eq!(config.unwrap().iterations, 12);
    }

    #[test]
    fn test_invalid_env_var_is_config_error() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();

        env::set_var("PINGPONG_SKIP", "many");
        let result = load_config(Cli::parse_from(["pingpong"]));
        clear_env();

        let err = result.unwrap_err();
        assert_eq!(err.category(), "CONFIG");
        assert!(err.to_string().contains("PINGPONG_SKIP"));
    }

    #[test]
    fn test_invalid_final_config_rejected() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();

        let cli = Cli::parse_from(["pingpong", "-i", "0"]);
        assert!(load_config(cli).is_err());
    }

    #[test]
    fn test_config_summary() {
        let config = Config::default();
        let summary = display_config_summary(&config);

        assert!(summary.contains("Iterations: 20"));
        assert!(summary.contains("Units: us (precision 3)"));
        assert!(summary.contains("Transport: local"));
        assert!(!summary.contains("Address"));
    }

    #[test]
    fn test_duration_summary() {
        let mut config = Config::default();
        config.duration_secs = 1.5;
        let summary = display_config_summary(&config);
        assert!(summary.contains("Duration: 1.5s"));
        assert!(!summary.contains("Iterations"));
    }
}
