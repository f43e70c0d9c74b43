//! # Metadata cache façade
//!
//! [`MetadataCache`] is the only type the rest of an application talks to.
//! Every method forwards a command onto the cache's serializer lane; nothing
//! here touches storage directly.
//!
//! ## Method Summary
//!
//! | Method               | Blocking | Description                                   |
//! |----------------------|----------|-----------------------------------------------|
//! | `get(&k)`            | yes      | Lookup, promotes to MRU                       |
//! | `set(k, v)`          | no       | Insert or update, then enforce capacity       |
//! | `clear()`            | yes      | Drop every entry                              |
//! | `peek(&k)`           | yes      | Lookup without promotion                      |
//! | `contains(&k)`       | yes      | Membership without promotion                  |
//! | `len()` / `keys()`   | yes      | Size, keys from MRU to LRU                    |
//! | `stats()`            | yes      | Counter snapshot                              |
//! | `enforce_capacity()` | no       | Same command the sweep timer enqueues         |
//! | `prune()`            | no       | Same command a pressure signal enqueues       |
//! | `shutdown()`         | yes      | Teardown; also run on drop                    |
//!
//! "Blocking" calls wait for their command to run, so they observe every
//! command submitted before them from any thread.
//!
//! ## Example
//!
//! ```
//! use metacache::builder::CacheBuilder;
//! use metacache::signal::{Signal, SignalHub};
//! use std::sync::Arc;
//!
//! let hub = Arc::new(SignalHub::new());
//! let cache = CacheBuilder::new(4).signals(hub.clone()).build::<&'static str, u32>();
//!
//! for (i, url) in ["a", "b", "c", "d"].into_iter().enumerate() {
//!     cache.set(url, i as u32);
//! }
//! assert_eq!(cache.get(&"a"), Some(0));
//!
//! // ceil(4 * 0.25) = 1 entry, the LRU one ("b")
//! hub.emit(Signal::MemoryPressure);
//! assert_eq!(cache.keys(), vec!["a", "d", "c"]);
//!
//! hub.emit(Signal::Terminate);
//! assert!(cache.is_empty());
//! ```

use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, OnceLock};

use crate::builder::CacheBuilder;
use crate::config::CacheConfig;
use crate::error::InvariantError;
use crate::lane::{Command, Lane};
use crate::metrics::CacheStats;
use crate::scheduler::EvictionScheduler;
use crate::signal::SignalHub;

/// Process-wide cache from resource locator to serialized metadata.
pub type LinkMetadataCache = MetadataCache<String, Arc<Vec<u8>>>;

/// Bounded LRU cache served by a single serializer lane.
///
/// Values are returned by clone; wrap large payloads in `Arc` so a hit costs
/// a reference-count bump.
pub struct MetadataCache<K, V> {
    config: CacheConfig,
    lane: Lane<K, V>,
    scheduler: EvictionScheduler,
}

impl<K, V> MetadataCache<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + 'static,
    V: Clone + Send + 'static,
{
    /// Starts a cache with `config` and no external signal source.
    ///
    /// # Panics
    ///
    /// Panics if `config` is invalid or a thread cannot be spawned. Use
    /// [`CacheBuilder::try_build`] to handle those cases.
    pub fn new(config: CacheConfig) -> Self {
        CacheBuilder::from_config(config).build()
    }

    /// Looks up `key`, promoting it to most-recently-used on a hit.
    ///
    /// Returns `None` on a miss or after shutdown.
    pub fn get(&self, key: &K) -> Option<V> {
        self.lane
            .request(|reply| Command::Get {
                key: key.clone(),
                reply,
            })
            .flatten()
    }

    /// Inserts or replaces `key` without waiting for the write to apply.
    ///
    /// The entry becomes most-recently-used and capacity is enforced in the
    /// same lane step. Ignored after shutdown.
    pub fn set(&self, key: K, value: V) {
        self.lane.submit(Command::Set { key, value });
    }

    /// Removes every entry and waits until it is done.
    pub fn clear(&self) {
        let _ = self.lane.request(|reply| Command::Clear { reply: Some(reply) });
    }

    /// Looks up `key` without changing recency order.
    pub fn peek(&self, key: &K) -> Option<V> {
        self.lane
            .request(|reply| Command::Peek {
                key: key.clone(),
                reply,
            })
            .flatten()
    }

    /// Returns `true` if `key` is cached. Does not change recency order.
    pub fn contains(&self, key: &K) -> bool {
        self.lane
            .request(|reply| Command::Contains {
                key: key.clone(),
                reply,
            })
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.lane
            .request(|reply| Command::Len { reply })
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys ordered from most- to least-recently-used.
    pub fn keys(&self) -> Vec<K> {
        self.lane
            .request(|reply| Command::Keys { reply })
            .unwrap_or_default()
    }

    /// Counter snapshot, or `None` after shutdown.
    pub fn stats(&self) -> Option<CacheStats> {
        self.lane.request(|reply| Command::Stats { reply })
    }

    /// Runs the storage invariant check on the lane.
    ///
    /// A shut-down cache holds no storage and always passes.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.lane
            .request(|reply| Command::CheckInvariants { reply })
            .unwrap_or(Ok(()))
    }

    /// Enqueues a hard-capacity sweep, as the periodic timer does.
    pub fn enforce_capacity(&self) {
        self.lane.submit(Command::EnforceCapacity);
    }

    /// Enqueues a prune by the configured percentage, as a pressure signal does.
    pub fn prune(&self) {
        self.prune_by(self.config.prune_percentage());
    }

    /// Enqueues a prune of `ceil(len * fraction)` LRU entries.
    ///
    /// `len` is read when the command runs, not when it is submitted.
    pub fn prune_by(&self, fraction: f64) {
        self.lane.submit(Command::Prune { fraction });
    }
}

impl<K, V> MetadataCache<K, V> {
    pub(crate) fn from_parts(
        config: CacheConfig,
        lane: Lane<K, V>,
        scheduler: EvictionScheduler,
    ) -> Self {
        Self {
            config,
            lane,
            scheduler,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Tears the cache down.
    ///
    /// Closes the lane to new commands, unsubscribes from both signals,
    /// cancels the sweep timer, then waits for already-queued commands to
    /// finish. Every later call on this cache is a no-op returning an empty
    /// result. Idempotent; also runs on drop.
    pub fn shutdown(&self) {
        let first = self.lane.close();
        self.scheduler.teardown();
        self.lane.close_and_join();
        if first {
            tracing::debug!("metadata cache shut down");
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.lane.is_closed()
    }
}

impl LinkMetadataCache {
    /// The process-wide cache, built with [`CacheConfig::default`] and wired to
    /// [`SignalHub::global`].
    ///
    /// # Panics
    ///
    /// Panics on first use if the background threads cannot be spawned.
    pub fn shared() -> &'static LinkMetadataCache {
        static SHARED: OnceLock<LinkMetadataCache> = OnceLock::new();
        SHARED.get_or_init(|| {
            CacheBuilder::default()
                .signals(SignalHub::global())
                .build()
        })
    }
}

impl<K, V> Drop for MetadataCache<K, V> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<K, V> fmt::Debug for MetadataCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataCache")
            .field("config", &self.config)
            .field("shut_down", &self.is_shut_down())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{Signal, SignalSource};
    use std::time::Duration;

    fn cache_with_hub(max_entries: usize) -> (MetadataCache<String, u32>, Arc<SignalHub>) {
        let hub = Arc::new(SignalHub::new());
        let cache = CacheBuilder::new(max_entries)
            .signals(hub.clone() as Arc<dyn SignalSource>)
            .build();
        (cache, hub)
    }

    fn key(s: &str) -> String {
        s.to_string()
    }

    #[test]
    fn set_then_get_observes_write() {
        let (cache, _hub) = cache_with_hub(4);
        cache.set(key("a"), 1);
        assert_eq!(cache.get(&key("a")), Some(1));
        assert_eq!(cache.get(&key("missing")), None);
    }

    #[test]
    fn update_in_place_keeps_count() {
        let (cache, _hub) = cache_with_hub(4);
        cache.set(key("k"), 1);
        cache.set(key("k"), 2);
        assert_eq!(cache.get(&key("k")), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn capacity_three_scenario() {
        let (cache, _hub) = cache_with_hub(3);
        for k in ["a", "b", "c", "d"] {
            cache.set(key(k), 0);
        }
        assert_eq!(cache.keys(), vec![key("d"), key("c"), key("b")]);

        cache.get(&key("b"));
        cache.set(key("e"), 0);
        assert_eq!(cache.keys(), vec![key("e"), key("b"), key("d")]);
        assert!(!cache.contains(&key("c")));
    }

    #[test]
    fn peek_and_contains_do_not_promote() {
        let (cache, _hub) = cache_with_hub(3);
        for k in ["a", "b", "c"] {
            cache.set(key(k), 0);
        }
        assert_eq!(cache.peek(&key("a")), Some(0));
        assert!(cache.contains(&key("a")));
        cache.set(key("d"), 0);
        assert!(!cache.contains(&key("a")));
    }

    #[test]
    fn clear_on_empty_is_noop() {
        let (cache, _hub) = cache_with_hub(3);
        cache.clear();
        assert!(cache.is_empty());
        cache.check_invariants().unwrap();
    }

    #[test]
    fn pressure_signal_prunes_quarter_rounded_up() {
        let (cache, hub) = cache_with_hub(10);
        for i in 0..10 {
            cache.set(format!("k{}", i), i);
        }
        hub.emit(Signal::MemoryPressure);
        assert_eq!(cache.len(), 7);
        for i in 0..3 {
            assert!(!cache.contains(&format!("k{}", i)));
        }
        let stats = cache.stats().unwrap();
        assert_eq!(stats.pressure_evictions, 3);
    }

    #[test]
    fn terminate_signal_clears() {
        let (cache, hub) = cache_with_hub(10);
        cache.set(key("a"), 1);
        hub.emit(Signal::Terminate);
        assert!(cache.is_empty());
    }

    #[test]
    fn explicit_triggers_match_scheduler_commands() {
        let (cache, _hub) = cache_with_hub(10);
        for i in 0..8 {
            cache.set(format!("k{}", i), i);
        }
        cache.prune();
        assert_eq!(cache.len(), 6);
        cache.prune_by(0.5);
        assert_eq!(cache.len(), 3);
        cache.enforce_capacity();
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn sweep_timer_enqueues_capacity_enforcement() {
        let hub = Arc::new(SignalHub::new());
        let cache: MetadataCache<u32, u32> = CacheBuilder::new(4)
            .sweep_interval(Duration::from_millis(10))
            .signals(hub)
            .build();
        cache.set(1, 1);
        std::thread::sleep(Duration::from_millis(60));
        let stats = cache.stats().unwrap();
        // One sweep per set plus at least one from the timer.
        assert!(stats.capacity_sweeps >= 2, "{:?}", stats);
    }

    #[test]
    fn shutdown_unsubscribes_and_silences_operations() {
        let (cache, hub) = cache_with_hub(4);
        cache.set(key("a"), 1);
        cache.shutdown();
        cache.shutdown();

        assert!(cache.is_shut_down());
        assert_eq!(hub.subscriber_count(Signal::MemoryPressure), 0);
        assert_eq!(hub.subscriber_count(Signal::Terminate), 0);

        cache.set(key("b"), 2);
        assert_eq!(cache.get(&key("a")), None);
        assert_eq!(cache.len(), 0);
        assert!(cache.keys().is_empty());
        assert!(cache.stats().is_none());
        cache.clear();
        cache.check_invariants().unwrap();
    }

    #[test]
    fn drop_tears_down() {
        let (cache, hub) = cache_with_hub(4);
        drop(cache);
        assert_eq!(hub.subscriber_count(Signal::MemoryPressure), 0);
        assert_eq!(hub.emit(Signal::Terminate), 0);
    }

    #[test]
    fn shared_cache_uses_default_config() {
        let cache = LinkMetadataCache::shared();
        assert_eq!(*cache.config(), CacheConfig::default());
        assert!(std::ptr::eq(cache, LinkMetadataCache::shared()));
        assert!(SignalHub::global().subscriber_count(Signal::MemoryPressure) >= 1);
    }
}
