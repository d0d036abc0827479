//! Error Module - Pointer Registry Error Types
//!
//! # Error Categories
//!
//! ## Value Errors
//! - `Format` - Text that is not a tagged pointer
//! - `NullPointer` - NULL where a live pointer is required
//!
//! ## Type Errors
//! - `TypeMismatch` - Tag not compatible with the expected tag
//!
//! ## Registration Errors
//! - `NotRegistered` - No record for the address
//! - `RegistrationConflict` - Incompatible re-registration under the reject policy

use crate::inspect::RegistrationStatus;
use thiserror::Error;
use xth_util::atom::Tag;
use xth_util::error::{ConfigError, ErrorCategory, ErrorCode};

/// Main error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PointerError {
    /// Malformed tagged-pointer text
    ///
    /// **When returned:** Parsing a value that is neither `NULL` nor
    /// `0x<hex>` optionally followed by `^tag`.
    #[error("Invalid value \"{value}\". Invalid pointer format.")]
    Format { value: String },

    /// Tag relation check failed
    ///
    /// **When returned:** Unwrapping, verifying or casting a pointer whose
    /// tag is neither equal to nor derived from the expected tag.
    ///
    /// **Recovery strategy:** None; the caller passed the wrong kind of
    /// pointer.
    #[error("Expected pointer^{expected}, got pointer^{actual}.")]
    TypeMismatch { expected: String, actual: String },

    /// Address has no record
    ///
    /// **When returned:** `unregister`, `verify` and friends on an address
    /// that was never registered or has already been released.
    #[error("Invalid value \"{value}\". Pointer validation failed: not registered.")]
    NotRegistered { value: String },

    /// NULL where a live pointer is required
    #[error("Pointer is NULL.")]
    NullPointer,

    /// Re-registration refused
    ///
    /// **When returned:** Only under [`ReregisterPolicy::Reject`], when an
    /// address is registered again with an incompatible tag or mode.
    ///
    /// [`ReregisterPolicy::Reject`]: crate::config::ReregisterPolicy::Reject
    #[error("Pointer {value} conflicts with existing registration {existing}.")]
    RegistrationConflict { value: String, existing: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl PointerError {
    pub(crate) fn mismatch(expected: Option<&Tag>, actual: Option<&Tag>) -> Self {
        PointerError::TypeMismatch {
            expected: tag_text(expected),
            actual: tag_text(actual),
        }
    }

    pub(crate) fn not_registered(address: usize, tag: Option<&Tag>) -> Self {
        PointerError::NotRegistered {
            value: format!("{}^{}", crate::tagged::format_address(address), tag_text(tag)),
        }
    }

    /// Registration status this error reports, if it is a registration failure
    pub fn registration_status(&self) -> Option<RegistrationStatus> {
        match self {
            PointerError::NotRegistered { .. } => Some(RegistrationStatus::Missing),
            PointerError::TypeMismatch { .. } => Some(RegistrationStatus::WrongTag),
            _ => None,
        }
    }

    /// Check if this error indicates a bug in the caller
    pub fn is_bug(&self) -> bool {
        matches!(
            self,
            PointerError::TypeMismatch { .. } | PointerError::NullPointer
        )
    }
}

fn tag_text(tag: Option<&Tag>) -> String {
    tag.map(|t| t.as_str().to_string()).unwrap_or_default()
}

impl ErrorCategory for PointerError {
    fn code(&self) -> ErrorCode {
        match self {
            PointerError::Format { .. } | PointerError::RegistrationConflict { .. } => {
                ErrorCode::InvalidValue
            }
            PointerError::TypeMismatch { .. } => ErrorCode::WrongType,
            PointerError::NotRegistered { .. } => ErrorCode::NotFound,
            PointerError::NullPointer => ErrorCode::NullPointer,
            PointerError::Config(_) => ErrorCode::InvalidParam,
        }
    }
}

/// Result type alias for registry operations
pub type Result<T> = std::result::Result<T, PointerError>;
