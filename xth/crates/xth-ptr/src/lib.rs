//! xth-ptr - Typed pointer registry
//!
//! ============================================================================
//! MODULE OVERVIEW
//! ============================================================================
//!
//! Script-facing code passes raw addresses around as text. This crate gives
//! those addresses a type tag and a registry that remembers which ones are
//! live, so a stale or mistyped pointer is rejected instead of dereferenced.
//!
//! - [`tagged`]: the `address^tag` value and its text form
//! - [`subtag`]: single-inheritance relation between tags
//! - [`registry`]: registration, unregistration, verification and casts
//! - [`inspect`]: status, dissection and info queries
//!
//! ============================================================================
//! TAG COMPATIBILITY
//! ============================================================================
//!
//! A pointer tagged `T` satisfies an expected tag `E` when `T == E`, when
//! `E` is absent (untyped), or when `E` is reached by walking up the subtag
//! definitions from `T`. The walk stops after a configured number of hops.
//!
//! ```text
//!   Dog ──▶ Mammal ──▶ Animal
//!
//!   Dog    satisfies Animal   (derived)
//!   Animal satisfies Dog      no
//! ```
//!
//! # Usage
//!
//! ```rust
//! use xth_ptr::PointerRegistry;
//!
//! let mut registry = PointerRegistry::default();
//! let handle = registry.tag("Handle");
//!
//! let value = registry.register(0xdead_beef, Some(&handle))?;
//! let text = value.to_string();
//!
//! let (address, _) = registry.obj_verify(text.as_str(), Some(&handle))?;
//! assert_eq!(address, 0xdead_beef);
//!
//! registry.unregister(address)?;
//! assert!(!registry.registered(address));
//! # Ok::<(), xth_ptr::PointerError>(())
//! ```

pub mod config;
pub mod error;
pub mod inspect;
pub mod record;
pub mod registry;
pub mod subtag;
pub mod tagged;

pub use config::{RegistryConfig, ReregisterPolicy};
pub use error::{PointerError, Result};
pub use inspect::{Dissection, PointerInfo, RegistrationStatus, RegistryStats, TagMatch};
pub use record::{PointerRecord, Registration};
pub use registry::PointerRegistry;
pub use subtag::{SubtagTable, TagRelation};
pub use tagged::{compare, tag_of, unwrap, wrap, Comparison, PointerSource, TaggedPtr};
pub use xth_util::atom::Tag;

/// Crate version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
