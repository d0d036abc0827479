//! xth-lifo - Region-based LIFO allocator
//!
//! An arena that hands out memory in stack order. Allocations are bumps of
//! a free offset inside large chunks; marks checkpoint the arena so that a
//! whole batch of allocations is released with one pop.
//!
//! # Architecture
//!
//! ```text
//! Lifo
//!  ├── chunks      [c0, c1, c2, ...]   mainstream chunk stack
//!  ├── big_blocks  [b0, b1, ...]       oversized allocations
//!  └── marks       [bottom, m1, m2]    each records how many chunks and
//!                                      big blocks it owns, its free offset
//!                                      and its last allocation
//! ```
//!
//! Popping a mark truncates both stacks back to the enclosing mark's counts
//! and restores its free offset, so a push/alloc/pop round trip leaves the
//! arena exactly as it was.
//!
//! # Usage
//!
//! ```rust
//! use xth_lifo::{Lifo, LifoConfig};
//!
//! let mut lifo = Lifo::new(LifoConfig::default())?;
//! let buf = lifo.push_frame(256)?;
//! // ... fill buf ...
//! let grown = lifo.expand_last(256, false)?;
//! # let _ = (buf, grown);
//! lifo.pop_frame();
//! # Ok::<(), xth_lifo::LifoError>(())
//! ```
//!
//! # Thread Safety
//!
//! An arena is single-threaded. It is neither `Send` nor `Sync`; callers
//! that need one per thread create one per thread.

pub mod align;
pub mod arena;
pub mod chunk;
pub mod config;
pub mod dump;
pub mod error;
pub mod mark;
pub mod resize;
pub mod validate;

pub use arena::Lifo;
pub use chunk::{AllocFn, ChunkAllocator, FnAllocator, FreeFn, SystemAllocator};
pub use config::{LifoConfig, LifoFlags, DEFAULT_CHUNK_SIZE, MIN_CHUNK_SIZE};
pub use dump::{LifoDump, LifoStats};
pub use error::{LifoError, Result};
pub use mark::Mark;
pub use validate::Corruption;

/// Crate version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
