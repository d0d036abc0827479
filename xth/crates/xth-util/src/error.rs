//! Error categories shared by the xth crates
//!
//! Each component crate defines its own `thiserror` enum. This module gives
//! them a common vocabulary so a host can record failures as a structured
//! (category, message) pair without knowing every component's error type.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Broad failure category reported to the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed input value or failed validation
    InvalidValue,
    /// Value of the wrong type
    WrongType,
    /// Required entry does not exist
    NotFound,
    /// NULL where a valid pointer is required
    NullPointer,
    /// Memory allocation failed
    OutOfMemory,
    /// Malformed configuration or argument
    InvalidParam,
    /// Anything else
    Generic,
}

impl ErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidValue => "INVALID_VALUE",
            ErrorCode::WrongType => "WRONG_TYPE",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::NullPointer => "NULL_POINTER",
            ErrorCode::OutOfMemory => "OUT_OF_MEMORY",
            ErrorCode::InvalidParam => "INVALID_PARAM",
            ErrorCode::Generic => "GENERIC",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Implemented by every component error type.
pub trait ErrorCategory: fmt::Display {
    fn code(&self) -> ErrorCode;

    /// Structured record of this error for the host.
    fn record(&self) -> ErrorRecord {
        ErrorRecord {
            code: self.code(),
            message: self.to_string(),
        }
    }
}

/// A (category, message) pair as recorded to the host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Error)]
#[error("{code}: {message}")]
pub struct ErrorRecord {
    pub code: ErrorCode,
    pub message: String,
}

/// Error type for configuration loading and validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidEnvValue { key: &'static str, value: String },

    #[error("Invalid setting: {0}")]
    InvalidSetting(String),
}

impl ErrorCategory for ConfigError {
    fn code(&self) -> ErrorCode {
        ErrorCode::InvalidParam
    }
}

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Read an environment variable and parse it with `parse`.
///
/// Unset variables yield `Ok(None)`. Values that fail to parse are errors
/// rather than being silently ignored.
pub fn env_var<T>(
    key: &'static str,
    parse: impl FnOnce(&str) -> Option<T>,
) -> ConfigResult<Option<T>> {
    match std::env::var(key) {
        Ok(value) => match parse(value.trim()) {
            Some(parsed) => Ok(Some(parsed)),
            None => Err(ConfigError::InvalidEnvValue { key, value }),
        },
        Err(_) => Ok(None),
    }
}

/// Parse the boolean spellings accepted in environment variables.
pub fn parse_flag(value: &str) -> Option<bool> {
    if value == "1" || value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("yes") {
        Some(true)
    } else if value == "0"
        || value.eq_ignore_ascii_case("false")
        || value.eq_ignore_ascii_case("no")
    {
        Some(false)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("widget exploded")]
    struct WidgetError;

    impl ErrorCategory for WidgetError {
        fn code(&self) -> ErrorCode {
            ErrorCode::Generic
        }
    }

    #[test]
    fn test_record_carries_code_and_message() {
        let record = WidgetError.record();
        assert_eq!(record.code, ErrorCode::Generic);
        assert_eq!(record.message, "widget exploded");
        assert_eq!(record.to_string(), "GENERIC: widget exploded");
    }

    #[test]
    fn test_error_code_strings() {
        assert_eq!(ErrorCode::WrongType.as_str(), "WRONG_TYPE");
        assert_eq!(ErrorCode::OutOfMemory.to_string(), "OUT_OF_MEMORY");
    }

    #[test]
    fn test_parse_flag_spellings() {
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("no"), Some(false));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_env_var_unset_is_none() {
        let value = env_var("XTH_TEST_SURELY_UNSET_VARIABLE", |v| v.parse::<usize>().ok());
        assert_eq!(value, Ok(None));
    }

    #[test]
    fn test_config_error_is_invalid_param() {
        let err = ConfigError::InvalidSetting("chunk size".to_string());
        assert_eq!(err.code(), ErrorCode::InvalidParam);
    }
}
