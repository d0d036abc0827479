//! Configuration Module - Registry Policies

use std::fmt;
use std::str::FromStr;
use xth_util::error::{env_var, parse_flag, ConfigError};

/// Subtype walk depth used when none is configured
pub const DEFAULT_SUBTAG_DEPTH: usize = 10;

/// Upper bound accepted for the subtype walk depth
pub const MAX_SUBTAG_DEPTH: usize = 1024;

/// What to do when an address is registered again with an incompatible
/// tag or a different registration mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ReregisterPolicy {
    /// Replace the existing tag and mode (last writer wins)
    #[default]
    Overwrite,
    /// Keep the existing record and fail the registration
    Reject,
}

impl FromStr for ReregisterPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("overwrite") {
            Ok(ReregisterPolicy::Overwrite)
        } else if s.eq_ignore_ascii_case("reject") {
            Ok(ReregisterPolicy::Reject)
        } else {
            Err(ConfigError::InvalidSetting(format!(
                "unknown re-registration policy {:?}",
                s
            )))
        }
    }
}

impl fmt::Display for ReregisterPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReregisterPolicy::Overwrite => write!(f, "overwrite"),
            ReregisterPolicy::Reject => write!(f, "reject"),
        }
    }
}

/// Registry configuration
///
/// # Examples
///
/// ```rust
/// use xth_ptr::{RegistryConfig, ReregisterPolicy};
///
/// let config = RegistryConfig {
///     reregister_policy: ReregisterPolicy::Reject,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Maximum supertype hops followed when relating two tags
    ///
    /// Bounds the walk on malformed (cyclic) subtag definitions.
    pub subtag_depth_limit: usize,

    /// Handling of incompatible re-registration
    pub reregister_policy: ReregisterPolicy,

    /// Refuse to cast pointers that have no registry record
    pub cast_requires_registration: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            subtag_depth_limit: DEFAULT_SUBTAG_DEPTH,
            reregister_policy: ReregisterPolicy::Overwrite,
            cast_requires_registration: false,
        }
    }
}

impl RegistryConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.subtag_depth_limit == 0 || self.subtag_depth_limit > MAX_SUBTAG_DEPTH {
            return Err(ConfigError::InvalidSetting(format!(
                "subtag_depth_limit must be between 1 and {}, got {}",
                MAX_SUBTAG_DEPTH, self.subtag_depth_limit
            )));
        }
        Ok(())
    }

    /// Load overrides from `XTH_PTR_SUBTAG_DEPTH`, `XTH_PTR_REREGISTER` and
    /// `XTH_PTR_CAST_REQUIRES_REGISTRATION`
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(depth) = env_var("XTH_PTR_SUBTAG_DEPTH", |v| v.parse::<usize>().ok())? {
            config.subtag_depth_limit = depth;
        }

        if let Some(policy) = env_var("XTH_PTR_REREGISTER", |v| v.parse().ok())? {
            config.reregister_policy = policy;
        }

        if let Some(flag) = env_var("XTH_PTR_CAST_REQUIRES_REGISTRATION", parse_flag)? {
            config.cast_requires_registration = flag;
        }

        config.validate()?;
        Ok(config)
    }
}
