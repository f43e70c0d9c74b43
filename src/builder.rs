//! Builder for [`MetadataCache`].
//!
//! Collects the configuration and the signal source, validates, then spawns
//! the serializer lane and the eviction scheduler.
//!
//! ## Example
//!
//! ```rust
//! use metacache::builder::CacheBuilder;
//! use std::time::Duration;
//!
//! let cache = CacheBuilder::new(100)
//!     .prune_percentage(0.5)
//!     .sweep_interval(Duration::from_secs(60))
//!     .build::<String, u64>();
//! cache.set("https://example.com".to_string(), 42);
//! assert_eq!(cache.get(&"https://example.com".to_string()), Some(42));
//! ```

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::MetadataCache;
use crate::config::CacheConfig;
use crate::error::BuildError;
use crate::lane::Lane;
use crate::policy::lru::LruStore;
use crate::scheduler::EvictionScheduler;
use crate::signal::{SignalHub, SignalSource};

/// Builder for creating cache instances.
pub struct CacheBuilder {
    config: CacheConfig,
    signals: Option<Arc<dyn SignalSource>>,
}

impl CacheBuilder {
    /// Starts from the default configuration with `max_entries` replaced.
    pub fn new(max_entries: usize) -> Self {
        let mut config = CacheConfig::default();
        config.set_max_entries(max_entries);
        Self {
            config,
            signals: None,
        }
    }

    /// Starts from an existing configuration.
    pub fn from_config(config: CacheConfig) -> Self {
        Self {
            config,
            signals: None,
        }
    }

    /// Fraction of entries evicted per memory-pressure signal.
    pub fn prune_percentage(mut self, prune_percentage: f64) -> Self {
        self.config.set_prune_percentage(prune_percentage);
        self
    }

    /// Time between capacity sweeps.
    pub fn sweep_interval(mut self, sweep_interval: Duration) -> Self {
        self.config.set_sweep_interval(sweep_interval);
        self
    }

    /// Source of memory-pressure and termination signals.
    ///
    /// When unset, the cache subscribes to a private [`SignalHub`] that
    /// nothing emits on, so only the sweep and explicit calls evict.
    pub fn signals(mut self, signals: Arc<dyn SignalSource>) -> Self {
        self.signals = Some(signals);
        self
    }

    /// Validates the configuration and starts the cache.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Config`] for an invalid configuration and
    /// [`BuildError::Spawn`] if a background thread cannot be started.
    pub fn try_build<K, V>(self) -> Result<MetadataCache<K, V>, BuildError>
    where
        K: Eq + Hash + Clone + fmt::Debug + Send + 'static,
        V: Clone + Send + 'static,
    {
        self.config.validate()?;
        let signals = self
            .signals
            .unwrap_or_else(|| Arc::new(SignalHub::new()) as Arc<dyn SignalSource>);

        let lane = Lane::spawn(LruStore::new(self.config.max_entries()))?;
        // On failure `lane` drops here, which closes and joins its worker.
        let scheduler = EvictionScheduler::start(lane.handle(), &self.config, signals)?;

        tracing::debug!(
            max_entries = self.config.max_entries(),
            "metadata cache started"
        );
        Ok(MetadataCache::from_parts(self.config, lane, scheduler))
    }

    /// Like [`try_build`](Self::try_build) but panics on failure.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid or a thread cannot be spawned.
    pub fn build<K, V>(self) -> MetadataCache<K, V>
    where
        K: Eq + Hash + Clone + fmt::Debug + Send + 'static,
        V: Clone + Send + 'static,
    {
        match self.try_build() {
            Ok(cache) => cache,
            Err(err) => panic!("{}", err),
        }
    }
}

impl Default for CacheBuilder {
    fn default() -> Self {
        Self::from_config(CacheConfig::default())
    }
}

impl fmt::Debug for CacheBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheBuilder")
            .field("config", &self.config)
            .field("custom_signals", &self.signals.is_some())
            .finish()
    }
}
