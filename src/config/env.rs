//! Environment variable handling and .env file management

use crate::error::{AppError, Result};
use crate::types::TimeUnit;
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load .env file if it exists
    pub fn load_env_file(debug: bool) -> Result<()> {
        Self::load_env_file_from(Path::new(".env"), debug)
    }

    /// Load a specific env file if it exists; variables already set win
    pub fn load_env_file_from(path: &Path, debug: bool) -> Result<()> {
        if path.exists() {
            dotenv::from_path(path)
                .map_err(|e| AppError::config(format!("Failed to load {}: {}", path.display(), e)))?;

            if debug {
                eprintln!("Loaded configuration from {}", path.display());
            }
        } else if debug {
            eprintln!("No {} file found, using defaults and CLI arguments", path.display());
        }

        Ok(())
    }

    /// Create example .env file content
    pub fn create_example_env_content() -> String {
        r#"# Ping-pong Latency Benchmark Configuration
#
# Values here are used as defaults and can be overridden by command-line
# arguments.

# Reported iterations (ignored when PINGPONG_DURATION is positive)
# PINGPONG_ITERATIONS=20

# Leading iterations executed but not reported
# PINGPONG_SKIP=0

# Microseconds between sends (0 sends back-to-back)
# PINGPONG_FREQUENCY_US=0

# Run length in seconds, overrides the iteration count when positive
# PINGPONG_DURATION=0

# Output unit: s, ms, us or ns
# PINGPONG_UNITS=us

# Decimal places in the output (defaults to nanosecond resolution of the unit)
# PINGPONG_PRECISION=3

# Payload size in bytes, control byte included
# PINGPONG_MESSAGE_SIZE=4

# Samples per results page
# PINGPONG_PAGE_SIZE=1024

# Listen/connect address for --transport tcp
# PINGPONG_ADDRESS=127.0.0.1:7878

# Enable colored diagnostics (true/false)
# PINGPONG_ENABLE_COLOR=true

# Example: one sample every 100us for 10 seconds, reported in ns
# PINGPONG_FREQUENCY_US=100
# PINGPONG_DURATION=10
# PINGPONG_UNITS=ns
"#
        .to_string()
    }

    /// Save example .env file to disk
    pub fn save_example_env_file(path: &Path) -> Result<()> {
        let content = Self::create_example_env_content();
        std::fs::write(path, content)
            .map_err(|e| AppError::config(format!("Failed to write example .env file: {}", e)))?;

        Ok(())
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "PINGPONG_ITERATIONS" | "PINGPONG_SKIP" | "PINGPONG_FREQUENCY_US" => {
                value
                    .parse::<u64>()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
            }
            "PINGPONG_DURATION" => {
                let secs: f64 = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
                if !secs.is_finite() || secs < 0.0 {
                    return Err(AppError::config(format!("{} must be a non-negative number, got: {}", key, value)));
                }
            }
            "PINGPONG_UNITS" => {
                value.parse::<TimeUnit>()?;
            }
            "PINGPONG_PRECISION" => {
                let precision: usize = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
                if precision > crate::defaults::MAX_PRECISION {
                    return Err(AppError::config(format!(
                        "{} must be at most {}, got: {}",
                        key,
                        crate::defaults::MAX_PRECISION,
                        precision
                    )));
                }
            }
            "PINGPONG_MESSAGE_SIZE" | "PINGPONG_PAGE_SIZE" => {
                let size: usize = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
                if size == 0 {
                    return Err(AppError::config(format!("{} must be greater than 0", key)));
                }
            }
            "PINGPONG_ADDRESS" => {
                if value.is_empty() {
                    return Err(AppError::config("PINGPONG_ADDRESS cannot be empty"));
                }
            }
            "PINGPONG_ENABLE_COLOR" => {
                value
                    .parse::<bool>()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
            }
            _ => {
                // Unknown environment variable, ignore
            }
        }

        Ok(())
    }

    /// Get list of all supported environment variables with descriptions
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("PINGPONG_ITERATIONS", "Reported iterations", "20"),
            ("PINGPONG_SKIP", "Unreported warm-up iterations", "5"),
            ("PINGPONG_FREQUENCY_US", "Microseconds between sends (0 = unthrottled)", "100"),
            ("PINGPONG_DURATION", "Run length in seconds (overrides iterations)", "2.5"),
            ("PINGPONG_UNITS", "Output unit (s, ms, us, ns)", "us"),
            ("PINGPONG_PRECISION", "Decimal places in the output", "3"),
            ("PINGPONG_MESSAGE_SIZE", "Payload size in bytes", "64"),
            ("PINGPONG_PAGE_SIZE", "Samples per results page", "1024"),
            ("PINGPONG_ADDRESS", "TCP listen/connect address", "127.0.0.1:7878"),
            ("PINGPONG_ENABLE_COLOR", "Enable colored diagnostics", "true"),
        ]
    }

    /// Display environment variable help
    pub fn display_env_help() -> String {
        let mut help = String::new();
        help.push_str("Supported Environment Variables:\n\n");

        for (var, description, example) in Self::get_supported_env_vars() {
            help.push_str(&format!("  {:<22} {}\n", var, description));
            help.push_str(&format!("  {:<22} Example: {}\n\n", "", example));
        }

        help.push_str("Configuration Priority (highest to lowest):\n");
        help.push_str("  1. Command-line arguments\n");
        help.push_str("  2. Environment variables\n");
        help.push_str("  3. .env file values\n");
        help.push_str("  4. Default values\n");

        help
    }

    /// Validate all currently set environment variables
    pub fn validate_current_env() -> Vec<String> {
        let mut warnings = Vec::new();

        for (var_name, _, _) in Self::get_supported_env_vars() {
            if let Ok(value) = std::env::var(var_name) {
                if let Err(e) = Self::validate_env_var(var_name, &value) {
                    warnings.push(format!("Warning: {}", e));
                }
            }
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_example_content_lists_every_variable() {
        let content = EnvManager::create_example_env_content();
        for (name, _, _) in EnvManager::get_supported_env_vars() {
            assert!(content.contains(&format!("{}=", name)), "missing {}", name);
        }
    }

    #[test]
    fn test_save_example_file() {
        let temp_file = NamedTempFile::new().unwrap();
        EnvManager::save_example_env_file(temp_file.path()).unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.contains("Ping-pong Latency Benchmark Configuration"));
    }

    #[test]
    fn test_validate_env_var() {
        assert!(EnvManager::validate_env_var("PINGPONG_ITERATIONS", "20").is_ok());
        assert!(EnvManager::validate_env_var("PINGPONG_DURATION", "0.25").is_ok());
        assert!(EnvManager::validate_env_var("PINGPONG_UNITS", "ms").is_ok());
        assert!(EnvManager::validate_env_var("PINGPONG_PRECISION", "9").is_ok());
        assert!(EnvManager::validate_env_var("PINGPONG_MESSAGE_SIZE", "1").is_ok());
        assert!(EnvManager::validate_env_var("PINGPONG_ENABLE_COLOR", "false").is_ok());
        assert!(EnvManager::validate_env_var("SOMETHING_ELSE", "whatever").is_ok());

        assert!(EnvManager::validate_env_var("PINGPONG_ITERATIONS", "-1").is_err());
        assert!(EnvManager::validate_env_var("PINGPONG_DURATION", "-2").is_err());
        assert!(EnvManager::validate_env_var("PINGPONG_UNITS", "minutes").is_err());
        assert!(EnvManager::validate_env_var("PINGPONG_PRECISION", "99").is_err());
        assert!(EnvManager::validate_env_var("PINGPONG_PAGE_SIZE", "0").is_err());
        assert!(EnvManager::validate_env_var("PINGPONG_ADDRESS", " ").is_err());
        assert!(EnvManager::validate_env_var("PINGPONG_ENABLE_COLOR", "maybe").is_err());
    }

    #[test]
    fn test_display_env_help() {
        let help = EnvManager::display_env_help();
        assert!(help.contains("Supported Environment Variables:"));
        assert!(help.contains("PINGPONG_FREQUENCY_US"));
        assert!(help.contains("Configuration Priority"));
    }

    #[test]
    fn test_missing_env_file_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join(".env");
        assert!(EnvManager::load_env_file_from(&missing, false).is_ok());
    }

    #[test]
    fn test_env_file_is_loaded() {
        let _guard = crate::config::ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "PINGPONG_TEST_ONLY_MARKER=loaded\n").unwrap();

        std::env::remove_var("PINGPONG_TEST_ONLY_MARKER");
        EnvManager::load_env_file_from(&path, false).unwrap();
        assert_eq!(std::env::var("PINGPONG_TEST_ONLY_MARKER").unwrap(), "loaded");
        std::env::remove_var("PINGPONG_TEST_ONLY_MARKER");
    }
}
