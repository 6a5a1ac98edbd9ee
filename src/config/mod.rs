//! Configuration module
//!
//! Handles CLI argument parsing and validation of the walk parameters.
//!
//! The two positional parameters are parsed once at startup into a
//! [`WalkConfig`], which is then handed by reference to every role. No
//! process-wide mutable state is involved.

pub mod cli;

use std::fmt;
use thiserror::Error;

/// Exit status for any configuration or usage error
pub const USAGE_EXIT_CODE: u8 = 1;

/// Walk parameters shared (read-only) by every member of the group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkConfig {
    /// Half-width of the legal position range `[-domain_size, domain_size]`
    pub domain_size: i32,
    /// Hard upper bound on steps per walk
    pub max_steps: i32,
}

impl WalkConfig {
    /// Create a validated configuration
    pub fn new(domain_size: i32, max_steps: i32) -> Result<Self, ConfigError> {
        check_positive("domain_size", domain_size)?;
        check_positive("max_steps", max_steps)?;

        Ok(Self {
            domain_size,
            max_steps,
        })
    }

    /// Build the configuration from the positional command-line parameters
    ///
    /// Expects exactly `<domain_size> <max_steps>`. Both must be positive
    /// integers.
    pub fn from_params(params: &[String]) -> Result<Self, ConfigError> {
        let [domain_size, max_steps] = params else {
            return Err(ConfigError::Usage { given: params.len() });
        };

        let domain_size = parse_param("domain_size", domain_size)?;
        let max_steps = parse_param("max_steps", max_steps)?;

        Self::new(domain_size, max_steps)
    }
}

impl fmt::Display for WalkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "domain [-{}, {}], max {} steps",
            self.domain_size, self.domain_size, self.max_steps
        )
    }
}

/// Configuration errors
///
/// All of these end the run with [`USAGE_EXIT_CODE`] before any walk starts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("expected 2 parameters, got {given}")]
    Usage { given: usize },

    #[error("{name} must be an integer, got '{value}'")]
    InvalidInteger { name: &'static str, value: String },

    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: i64 },
}

impl ConfigError {
    /// Render the diagnostic shown on stderr
    ///
    /// A bare count mismatch prints only the usage line; value errors print
    /// the reason first.
    pub fn report(&self, program: &str) -> String {
        let usage = usage_line(program);
        match self {
            ConfigError::Usage { .. } => usage,
            other => format!("Error: {}\n{}", other, usage),
        }
    }
}

/// The usage line for this program
pub fn usage_line(program: &str) -> String {
    format!("Usage: {} [--np <p>] <domain_size> <max_steps>", program)
}

fn parse_param(name: &'static str, value: &str) -> Result<i32, ConfigError> {
    let trimmed = value.trim();
    match trimmed.parse::<i64>() {
        Ok(parsed) if parsed <= 0 => Err(ConfigError::NonPositive {
            name,
            value: parsed,
        }),
        Ok(parsed) => i32::try_from(parsed).map_err(|_| ConfigError::InvalidInteger {
            name,
            value: value.to_string(),
        }),
        Err(_) => Err(ConfigError::InvalidInteger {
            name,
            value: value.to_string(),
        }),
    }
}

fn check_positive(name: &'static str, value: i32) -> Result<(), ConfigError> {
    if value <= 0 {
        return Err(ConfigError::NonPositive {
            name,
            value: value as i64,
        });
    }
    Ok(())
}
