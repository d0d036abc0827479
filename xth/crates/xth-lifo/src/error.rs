//! Error Module - Lifo Error Types
//!
//! # Error Categories
//!
//! ## Allocation Errors
//! - `OutOfMemory` - The chunk allocator returned no memory
//! - `InvalidSize` - Zero-sized or oversized request
//!
//! ## Usage Errors
//! - `InvalidParam` - Bad arguments to arena construction
//! - `InvalidMark` - Popping a mark that is no longer on the stack
//! - `NoLastAllocation` - Resizing when nothing was allocated since the last mark
//! - `CannotExpandInPlace` - In-place growth requested but no room left

use thiserror::Error;
use xth_util::error::{ConfigError, ErrorCategory, ErrorCode};

/// Main error type for arena operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifoError {
    /// Out of memory
    ///
    /// **When returned:** The chunk allocator could not satisfy a chunk,
    /// big-block or mark allocation.
    ///
    /// **Recovery strategy:** Pop marks to release memory, or fail the caller.
    #[error("Attempt to allocate {requested} bytes for memlifo failed")]
    OutOfMemory { requested: usize },

    /// Degenerate allocation size
    ///
    /// **When returned:** Request of zero bytes, or larger than the maximum
    /// representable allocation.
    #[error("Invalid allocation size: {size} bytes")]
    InvalidSize { size: usize },

    /// Invalid construction parameter
    ///
    /// **Example scenario:** an allocate function supplied without a
    /// matching free function.
    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    /// In-place growth was required but the current chunk has no room
    #[error("Cannot expand last allocation in place by {increment} bytes")]
    CannotExpandInPlace { increment: usize },

    /// Resize requested but nothing was allocated since the last mark
    #[error("No allocation since the last mark")]
    NoLastAllocation,

    /// Mark handle is stale or belongs to another arena
    #[error("Mark {id} is not on this arena's mark stack")]
    InvalidMark { id: u64 },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl LifoError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            LifoError::OutOfMemory { .. } | LifoError::CannotExpandInPlace { .. }
        )
    }

    /// Check if this error indicates a bug in the caller
    pub fn is_bug(&self) -> bool {
        matches!(
            self,
            LifoError::InvalidMark { .. } | LifoError::NoLastAllocation
        )
    }

    /// Numeric status code as reported by arena initialization
    ///
    /// 1 for memory exhaustion, 2 for invalid parameters, 3 otherwise.
    pub fn status_code(&self) -> i32 {
        match self {
            LifoError::OutOfMemory { .. } => STATUS_NOMEMORY,
            LifoError::InvalidParam(_) | LifoError::Config(_) => STATUS_INVALID_PARAM,
            _ => STATUS_GENERIC,
        }
    }
}

/// Initialization succeeded
pub const STATUS_SUCCESS: i32 = 0;
/// Initialization failed for lack of memory
pub const STATUS_NOMEMORY: i32 = 1;
/// Initialization failed on bad parameters
pub const STATUS_INVALID_PARAM: i32 = 2;
const STATUS_GENERIC: i32 = 3;

impl ErrorCategory for LifoError {
    fn code(&self) -> ErrorCode {
        match self {
            LifoError::OutOfMemory { .. } => ErrorCode::OutOfMemory,
            LifoError::InvalidSize { .. } => ErrorCode::InvalidValue,
            LifoError::InvalidParam(_) | LifoError::Config(_) => ErrorCode::InvalidParam,
            LifoError::CannotExpandInPlace { .. } | LifoError::NoLastAllocation => {
                ErrorCode::Generic
            }
            LifoError::InvalidMark { .. } => ErrorCode::InvalidValue,
        }
    }
}

/// Result type alias for arena operations
pub type Result<T> = std::result::Result<T, LifoError>;
