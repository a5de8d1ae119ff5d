//! Configuration validation framework

use crate::{ConfigError, ConfigResult};
use regex::Regex;

fn get_url_regex() -> Option<&'static Regex> {
    static URL_REGEX: std::sync::OnceLock<Option<Regex>> = std::sync::OnceLock::new();
    URL_REGEX
        .get_or_init(|| Regex::new(r"^https?://[^\s/$.?#].[^\s]*$").ok())
        .as_ref()
}

/// Implemented by every config section that can be checked for internal
/// consistency before the application starts serving traffic.
pub trait Validate {
    /// Validate this configuration object.
    ///
    /// # Errors
    /// Returns validation errors if the configuration is invalid.
    fn validate(&self) -> ConfigResult<()>;
}

/// Severity of a configuration problem, used to decide whether strict mode
/// should abort startup or merely log a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Startup must abort in strict mode (missing required API key, invalid
    /// port, unknown provider/backend name, unsupported language).
    Critical,
    /// Startup continues; the condition is surfaced via `/health`.
    Warning,
}

/// Validate a URL string.
///
/// # Errors
/// Returns `ConfigError::InvalidUrl` if the URL format is invalid.
pub fn validate_url(url: &str) -> ConfigResult<()> {
    get_url_regex().map_or_else(
        || {
            if url.starts_with("http://") || url.starts_with("https://") {
                Ok(())
            } else {
                Err(ConfigError::InvalidUrl {
                    url: url.to_string(),
                })
            }
        },
        |regex| {
            if regex.is_match(url) {
                Ok(())
            } else {
                Err(ConfigError::InvalidUrl {
                    url: url.to_string(),
                })
            }
        },
    )
}

/// Validate a port number.
///
/// # Errors
/// Returns `ConfigError::InvalidPort` if the port is 0.
pub const fn validate_port(port: u16) -> ConfigResult<()> {
    if port == 0 {
        Err(ConfigError::InvalidPort { port })
    } else {
        Ok(())
    }
}

/// Validate that a value lies within `[min, max]`.
///
/// # Errors
/// Returns `ConfigError::OutOfRange` if the value is outside the range.
pub fn validate_range(value: u64, min: u64, max: u64, field_name: &str) -> ConfigResult<()> {
    if value < min || value > max {
        Err(ConfigError::OutOfRange {
            field: field_name.to_string(),
            value,
            min,
            max,
        })
    } else {
        Ok(())
    }
}

/// Validate that a string is not empty or whitespace-only.
///
/// # Errors
/// Returns `ConfigError::MissingField` if the string is empty.
pub fn validate_non_empty(value: &str, field_name: &str) -> ConfigResult<()> {
    if value.trim().is_empty() {
        Err(ConfigError::MissingField {
            field: field_name.to_string(),
        })
    } else {
        Ok(())
    }
}
