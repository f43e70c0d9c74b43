//! Immutable cache configuration.
//!
//! A [`CacheConfig`] is fixed for the lifetime of a cache. The default value
//! is the shared-instance configuration: 10 entries, 25% pruned per pressure
//! event, and a capacity sweep once an hour.

use std::time::Duration;

use crate::error::ConfigError;

/// Default maximum number of cached entries.
pub const DEFAULT_MAX_ENTRIES: usize = 10;

/// Default fraction of entries evicted on a memory-pressure event.
pub const DEFAULT_PRUNE_PERCENTAGE: f64 = 0.25;

/// Default time between capacity sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

/// Capacity, pruning and sweep settings for a cache.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheConfig {
    max_entries: usize,
    prune_percentage: f64,
    sweep_interval: Duration,
}

impl CacheConfig {
    /// Creates a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `max_entries` is zero, `prune_percentage` is
    /// not in `(0.0, 1.0]`, or `sweep_interval` is zero.
    ///
    /// # Example
    ///
    /// ```
    /// use metacache::config::CacheConfig;
    /// use std::time::Duration;
    ///
    /// let config = CacheConfig::new(100, 0.5, Duration::from_secs(30)).unwrap();
    /// assert_eq!(config.max_entries(), 100);
    /// ```
    pub fn new(
        max_entries: usize,
        prune_percentage: f64,
        sweep_interval: Duration,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            max_entries,
            prune_percentage,
            sweep_interval,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks every field against its allowed range.
    ///
    /// # Errors
    ///
    /// See [`CacheConfig::new`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_entries == 0 {
            return Err(ConfigError::new("max_entries", "must be greater than zero"));
        }
        if !self.prune_percentage.is_finite()
            || self.prune_percentage <= 0.0
            || self.prune_percentage > 1.0
        {
            return Err(ConfigError::new(
                "prune_percentage",
                format!("must be in (0.0, 1.0], got {}", self.prune_percentage),
            ));
        }
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::new("sweep_interval", "must be non-zero"));
        }
        Ok(())
    }

    #[inline]
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    #[inline]
    pub fn prune_percentage(&self) -> f64 {
        self.prune_percentage
    }

    #[inline]
    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    pub(crate) fn set_max_entries(&mut self, max_entries: usize) {
        self.max_entries = max_entries;
    }

    pub(crate) fn set_prune_percentage(&mut self, prune_percentage: f64) {
        self.prune_percentage = prune_percentage;
    }

    pub(crate) fn set_sweep_interval(&mut self, sweep_interval: Duration) {
        self.sweep_interval = sweep_interval;
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            prune_percentage: DEFAULT_PRUNE_PERCENTAGE,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_shared_instance_settings() {
        let config = CacheConfig::default();
        assert_eq!(config.max_entries(), 10);
        assert_eq!(config.prune_percentage(), 0.25);
        assert_eq!(config.sweep_interval(), Duration::from_secs(3600));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_zero_capacity() {
        let err = CacheConfig::new(0, 0.25, Duration::from_secs(1)).unwrap_err();
        assert_eq!(err.field(), "max_entries");
    }

    #[test]
    fn rejects_out_of_range_prune_percentage() {
        for bad in [0.0, -0.1, 1.01, f64::NAN, f64::INFINITY] {
            let err = CacheConfig::new(10, bad, Duration::from_secs(1)).unwrap_err();
            assert_eq!(err.field(), "prune_percentage", "{}", bad);
        }
    }

    #[test]
    fn accepts_full_prune() {
        let config = CacheConfig::new(10, 1.0, Duration::from_millis(5)).unwrap();
        assert_eq!(config.prune_percentage(), 1.0);
    }

    #[test]
    fn rejects_zero_sweep_interval() {
        let err = CacheConfig::new(10, 0.25, Duration::ZERO).unwrap_err();
        assert_eq!(err.field(), "sweep_interval");
    }
}
