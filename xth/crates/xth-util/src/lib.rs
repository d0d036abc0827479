//! xth-util - Shared foundation types for the xth extension helpers
//!
//! ============================================================================
//! MODULE OVERVIEW
//! ============================================================================
//!
//! This crate holds the small pieces that the allocator (`xth-lifo`) and the
//! pointer registry (`xth-ptr`) both lean on:
//!
//! - [`atom`]: string interning. Type tags are interned strings, so two tags
//!   from the same table compare by pointer before falling back to text.
//! - [`error`]: the error-category vocabulary used when a component error is
//!   reported to the host as a (category, message) pair, plus the helpers
//!   config loaders use to read environment variables.
//!
//! ============================================================================
//! STRING INTERNING (ATOMS)
//! ============================================================================
//!
//! An atom table stores one copy of each distinct string. Handing out shared
//! handles makes equality a pointer compare and keeps the text alive for as
//! long as any holder needs it. Unlike a process-wide interner, atom tables
//! are owned by a context and dropped with it.

pub mod atom;
pub mod error;

pub use atom::{AtomStats, AtomTable, Tag};
pub use error::{ConfigError, ErrorCategory, ErrorCode, ErrorRecord};

// Re-export commonly used hash types
pub use rustc_hash::{FxHashMap, FxHashSet, FxHasher};

/// Crate version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
