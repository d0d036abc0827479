//! Configuration Module - Arena Tuning Parameters

use crate::align::{align_up, MAX_ALLOC};
use xth_util::error::{env_var, parse_flag, ConfigError};

/// Smallest chunk the arena will use; smaller hints are raised to this
pub const MIN_CHUNK_SIZE: usize = 8000;

/// Chunk size used when none is configured
pub const DEFAULT_CHUNK_SIZE: usize = 16000;

/// Behaviour flags for an arena.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct LifoFlags(u32);

impl LifoFlags {
    pub const NONE: LifoFlags = LifoFlags(0);
    /// Panic instead of returning an error when an allocation fails
    pub const PANIC_ON_FAIL: LifoFlags = LifoFlags(0x1);

    pub const fn from_bits(bits: u32) -> Self {
        LifoFlags(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: LifoFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for LifoFlags {
    type Output = LifoFlags;

    fn bitor(self, rhs: LifoFlags) -> LifoFlags {
        LifoFlags(self.0 | rhs.0)
    }
}

/// Arena configuration
///
/// # Examples
///
/// ```rust
/// use xth_lifo::LifoConfig;
///
/// let config = LifoConfig {
///     chunk_size: 64 * 1024,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifoConfig {
    /// Nominal chunk size hint in bytes
    ///
    /// Clamped to [`MIN_CHUNK_SIZE`] and rounded up to the allocation
    /// alignment when the arena is created.
    pub chunk_size: usize,

    /// Panic instead of returning an error on allocation failure
    ///
    /// Does not apply to `expand_last`, which always reports failure.
    pub panic_on_fail: bool,
}

impl Default for LifoConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            panic_on_fail: false,
        }
    }
}

impl LifoConfig {
    /// Build a configuration from a chunk hint and raw flags
    pub fn with_hint(chunk_size: usize, flags: LifoFlags) -> Self {
        Self {
            chunk_size,
            panic_on_fail: flags.contains(LifoFlags::PANIC_ON_FAIL),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Two chunk sizes must fit below MAX_ALLOC for the oversize heuristic
        if self.chunk_size > MAX_ALLOC / 4 {
            return Err(ConfigError::InvalidSetting(format!(
                "chunk_size {} exceeds maximum {}",
                self.chunk_size,
                MAX_ALLOC / 4
            )));
        }
        Ok(())
    }

    /// Chunk size actually used by the arena
    pub fn effective_chunk_size(&self) -> usize {
        align_up(self.chunk_size.max(MIN_CHUNK_SIZE))
    }

    pub fn flags(&self) -> LifoFlags {
        if self.panic_on_fail {
            LifoFlags::PANIC_ON_FAIL
        } else {
            LifoFlags::NONE
        }
    }

    /// Load overrides from `XTH_LIFO_CHUNK_SIZE` and `XTH_LIFO_PANIC_ON_FAIL`
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(size) = env_var("XTH_LIFO_CHUNK_SIZE", |v| v.parse::<usize>().ok())? {
            config.chunk_size = size;
        }

        if let Some(flag) = env_var("XTH_LIFO_PANIC_ON_FAIL", parse_flag)? {
            config.panic_on_fail = flag;
        }

        config.validate()?;
        Ok(config)
    }
}
