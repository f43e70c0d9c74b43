//! Error types for the metacache library.
//!
//! Cache operations themselves never fail: a miss is `None`, not an error.
//! The types here cover construction and diagnostics only.
//!
//! ## Key Components
//!
//! - [`ConfigError`]: Returned when cache configuration parameters are invalid
//!   (zero capacity, prune percentage outside `(0, 1]`, zero sweep interval).
//! - [`BuildError`]: Returned by [`CacheBuilder::try_build`](crate::builder::CacheBuilder::try_build)
//!   when the configuration is rejected or a background thread cannot be spawned.
//! - [`InvariantError`]: Returned by `check_invariants` methods when the
//!   recency list and its index disagree.
//!
//! ## Example Usage
//!
//! ```
//! use metacache::config::CacheConfig;
//! use std::time::Duration;
//!
//! let bad = CacheConfig::new(10, 1.5, Duration::from_secs(60));
//! assert!(bad.is_err());
//! ```

use std::fmt;
use std::io;

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Error returned when internal cache invariants are violated.
///
/// Carries a human-readable description of which invariant failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantError(String);

impl InvariantError {
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InvariantError {}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// A configuration field failed validation.
///
/// Names the offending field so callers can report it without parsing the
/// message.
///
/// # Example
///
/// ```
/// use metacache::config::CacheConfig;
/// use std::time::Duration;
///
/// let err = CacheConfig::new(0, 0.25, Duration::from_secs(1)).unwrap_err();
/// assert_eq!(err.field(), "max_entries");
/// assert_eq!(err.to_string(), "max_entries: must be greater than zero");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    field: &'static str,
    reason: String,
}

impl ConfigError {
    pub(crate) fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }

    /// Name of the `CacheConfig` field that was rejected.
    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// BuildError
// ---------------------------------------------------------------------------

/// Error returned when a cache cannot be started.
#[derive(Debug)]
pub enum BuildError {
    /// The configuration failed validation.
    Config(ConfigError),
    /// The serializer or sweep thread could not be spawned.
    Spawn(io::Error),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::Config(err) => write!(f, "invalid cache configuration: {}", err),
            BuildError::Spawn(err) => write!(f, "failed to spawn cache thread: {}", err),
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BuildError::Config(err) => Some(err),
            BuildError::Spawn(err) => Some(err),
        }
    }
}

impl From<ConfigError> for BuildError {
    fn from(err: ConfigError) -> Self {
        BuildError::Config(err)
    }
}

impl From<io::Error> for BuildError {
    fn from(err: io::Error) -> Self {
        BuildError::Spawn(err)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
