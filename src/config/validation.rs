//! Configuration validation utilities and rules

use crate::{
    error::Result,
    models::Config,
    types::{TimeUnit, TransportMode},
};
use colored::Colorize;

/// Configuration validator with advisory checks on top of `Config::validate`
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration with comprehensive checks
    pub fn validate_comprehensive(config: &Config) -> Result<Vec<ValidationWarning>> {
        let mut warnings = Vec::new();

        // Hard errors first
        config.validate()?;

        warnings.extend(Self::validate_termination(config));
        warnings.extend(Self::validate_pacing(config));
        warnings.extend(Self::validate_output(config));
        warnings.extend(Self::validate_memory(config));
        warnings.extend(Self::validate_transport(config));

        Ok(warnings)
    }

    fn validate_termination(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.is_duration_mode() {
            if config.iterations != crate::defaults::DEFAULT_ITERATIONS {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Warning,
                    format!(
                        "Duration of {}s overrides the requested {} iterations",
                        config.duration_secs, config.iterations
                    ),
                ));
            }
        } else if config.skip > config.iterations {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "Skipping {} iterations to report {}; most of the run is warm-up",
                    config.skip, config.iterations
                ),
            ));
        }

        warnings
    }

    fn validate_pacing(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.frequency_us == 0 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                "Pacing disabled, iterations run back-to-back".to_string(),
            ));
        } else if config.is_duration_mode() {
            let interval = config.frequency_us as f64 / 1e6;
            if interval > config.duration_secs {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Warning,
                    format!(
                        "Send interval of {}us is longer than the {}s run",
                        config.frequency_us, config.duration_secs
                    ),
                ));
            }
        }

        warnings
    }

    fn validate_output(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if let Some(precision) = config.precision {
            let resolution = config.units.default_precision();
            if precision > resolution {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Info,
                    format!(
                        "Precision {} exceeds nanosecond resolution in {} ({} digits); extra digits are zero",
                        precision, config.units, resolution
                    ),
                ));
            } else if precision < resolution && config.units != TimeUnit::Ns {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Info,
                    format!("Precision {} rounds away sub-{} detail", precision, config.units),
                ));
            }
        }

        warnings
    }

    fn validate_memory(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.page_size < crate::defaults::MIN_RECOMMENDED_PAGE_SIZE {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "Page size of {} samples allocates often inside the timed loop (recommended: >= {})",
                    config.page_size,
                    crate::defaults::MIN_RECOMMENDED_PAGE_SIZE
                ),
            ));
        }

        if config.message_size > crate::defaults::LARGE_MESSAGE_SIZE {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "Message size of {} bytes measures bandwidth as much as latency",
                    config.message_size
                ),
            ));
        }

        warnings
    }

    fn validate_transport(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.transport == TransportMode::Local && config.rank != 0 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                "Rank is ignored with the local transport".to_string(),
            ));
        }

        warnings
    }
}

/// Validation warning levels
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationLevel {
    Info,
    Warning,
    Error,
}

impl ValidationLevel {
    /// Get display string for level
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

/// Configuration validation warning
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub level: ValidationLevel,
    pub message: String,
}

impl ValidationWarning {
    /// Create a new validation warning
    pub fn new(level: ValidationLevel, message: String) -> Self {
        Self { level, message }
    }

    /// Format warning for display
    pub fn format(&self, use_color: bool) -> String {
        let tag = format!("[{}]", self.level.as_str());
        if !use_color {
            return format!("{} {}", tag, self.message);
        }
        let tag = match self.level {
            ValidationLevel::Info => tag.blue(),
            ValidationLevel::Warning => tag.yellow(),
            ValidationLevel::Error => tag.red(),
        };
        format!("{} {}", tag, self.message)
    }
}

/// Convenience function for comprehensive configuration validation
pub fn validate_config(config: &Config) -> Result<Vec<ValidationWarning>> {
    ConfigValidator::validate_comprehensive(config)
}
