//! # Recency-ordered storage
//!
//! `LruStore` is the cache's total state: a hash index from key to a node of
//! an intrusive, arena-backed recency list. It is single-threaded; the
//! serializer lane ([`crate::lane`]) is the only owner in a running cache.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────┐
//!   │                        LruStore<K, V>                            │
//!   │                                                                  │
//!   │   FxHashMap<K, SlotId>             IntrusiveList<Entry<K, V>>    │
//!   │   ┌─────────┬────────┐                                           │
//!   │   │ url_1   │ id_3 ──┼──────┐      head ──► [id_2] ◄──► [id_3]   │
//!   │   │ url_2   │ id_2 ──┼───┐  │       (MRU)     ▲           ▲      │
//!   │   └─────────┴────────┘   └──┼─────────────────┘           │      │
//!   │                             └─────────────────────────────┘      │
//!   │                                                    tail (LRU)    │
//!   └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Operations
//!
//! | Method               | Complexity | Description                               |
//! |----------------------|------------|-------------------------------------------|
//! | `get(&k)`            | O(1)       | Lookup, promotes to MRU                   |
//! | `peek(&k)`           | O(1)       | Lookup without promotion                  |
//! | `set(k, v)`          | O(1)*      | Insert or update, then enforce capacity   |
//! | `evict_tail()`       | O(1)       | Remove the LRU entry                      |
//! | `enforce_capacity()` | O(excess)  | Evict down to `capacity`                  |
//! | `prune(fraction)`    | O(k)       | Evict `ceil(len * fraction)` LRU entries  |
//! | `clear()`            | O(n)       | Remove everything                         |
//! | `keys_mru()`         | O(n)       | Keys from MRU to LRU                      |
//!
//! Both eviction policies go through `evict_tail`, so they always remove the
//! globally least-recently-used entry and never more entries than exist.

use std::fmt;
use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::ds::intrusive_list::IntrusiveList;
use crate::ds::slot_arena::SlotId;
use crate::error::InvariantError;
use crate::metrics::{CacheStats, StoreMetrics};

/// Upper bound on entries reserved by [`LruStore::new`].
pub const MAX_PREALLOC: usize = 1024;

/// One cached key/value pair, stored as a recency-list node.
#[derive(Debug)]
pub struct Entry<K, V> {
    pub key: K,
    pub value: V,
}

/// Which branch a [`LruStore::set`] took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    /// The key was new; the entry was linked at the head.
    Inserted,
    /// The key existed; its value was replaced and it was promoted.
    Updated,
}

/// Hash index plus recency list with a hard capacity.
pub struct LruStore<K, V> {
    index: FxHashMap<K, SlotId>,
    list: IntrusiveList<Entry<K, V>>,
    capacity: usize,
    metrics: StoreMetrics,
}

impl<K, V> LruStore<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates an empty store that holds at most `capacity` entries after
    /// each capacity enforcement.
    ///
    /// At most [`MAX_PREALLOC`] slots are reserved up front; the index and
    /// the list grow on demand beyond that.
    pub fn new(capacity: usize) -> Self {
        let reserve = capacity.min(MAX_PREALLOC);
        Self {
            index: FxHashMap::with_capacity_and_hasher(reserve, Default::default()),
            list: IntrusiveList::with_capacity(reserve),
            capacity,
            metrics: StoreMetrics::default(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Looks up `key` and promotes it to MRU on a hit.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let Some(&id) = self.index.get(key) else {
            self.metrics.record_get(false);
            return None;
        };
        self.metrics.record_get(true);
        self.move_to_front(id);
        self.list.get(id).map(|entry| &entry.value)
    }

    /// Looks up `key` without touching recency order.
    pub fn peek(&self, key: &K) -> Option<&V> {
        let &id = self.index.get(key)?;
        self.list.get(id).map(|entry| &entry.value)
    }

    /// Returns the LRU entry without removing it.
    #[cfg(test)]
    pub(crate) fn peek_lru(&self) -> Option<(&K, &V)> {
        self.list.back().map(|entry| (&entry.key, &entry.value))
    }

    /// Inserts or updates `key`, promotes it to MRU, then enforces capacity.
    ///
    /// An update replaces the value in place; the entry count is unchanged.
    pub fn set(&mut self, key: K, value: V) -> SetOutcome {
        let outcome = match self.index.get(&key) {
            Some(&id) => {
                if let Some(entry) = self.list.get_mut(id) {
                    entry.value = value;
                }
                self.move_to_front(id);
                self.metrics.record_update();
                SetOutcome::Updated
            },
            None => {
                self.insert_front(key, value);
                self.metrics.record_insert();
                SetOutcome::Inserted
            },
        };
        self.enforce_capacity();
        outcome
    }

    /// Removes the LRU entry from both the list and the index.
    ///
    /// Returns `None` without side effects when the store is empty.
    pub fn evict_tail(&mut self) -> Option<(K, V)> {
        let entry = self.list.pop_back()?;
        self.index.remove(&entry.key);
        Some((entry.key, entry.value))
    }

    /// Evicts from the tail until `len() <= capacity()`.
    ///
    /// Returns the number of entries evicted.
    pub fn enforce_capacity(&mut self) -> usize {
        let excess = self.len().saturating_sub(self.capacity);
        let evicted = self.evict_n(excess);
        self.metrics.record_capacity_sweep(evicted);
        evicted
    }

    /// Evicts `ceil(len() * fraction)` entries from the tail.
    ///
    /// The count is taken from the live length at call time. `fraction` is
    /// clamped to `[0.0, 1.0]`; a non-finite or non-positive fraction evicts
    /// nothing. A non-empty store always loses at least one entry for any
    /// positive fraction.
    pub fn prune(&mut self, fraction: f64) -> usize {
        let to_prune = if fraction.is_finite() && fraction > 0.0 {
            (self.len() as f64 * fraction.min(1.0)).ceil() as usize
        } else {
            0
        };
        let evicted = self.evict_n(to_prune);
        self.metrics.record_prune(evicted);
        evicted
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.index.clear();
        self.list.clear();
        self.metrics.record_clear();
    }

    /// Keys ordered from MRU to LRU.
    pub fn keys_mru(&self) -> Vec<K> {
        self.list.iter().map(|entry| entry.key.clone()).collect()
    }

    /// Position of `key` in recency order, `0` being MRU.
    pub fn recency_rank(&self, key: &K) -> Option<usize> {
        let &target = self.index.get(key)?;
        self.list.iter_entries().position(|(id, _)| id == target)
    }

    /// Snapshot of the counters plus current gauges.
    pub fn stats(&self) -> CacheStats {
        let m = &self.metrics;
        CacheStats {
            get_hits: m.get_hits,
            get_misses: m.get_misses,
            inserts: m.inserts,
            updates: m.updates,
            capacity_sweeps: m.capacity_sweeps,
            capacity_evictions: m.capacity_evictions,
            prune_calls: m.prune_calls,
            pressure_evictions: m.pressure_evictions,
            clears: m.clears,
            len: self.len(),
            max_entries: self.capacity,
        }
    }

    /// Verifies the index and recency list describe the same entries.
    ///
    /// # Errors
    ///
    /// Returns [`InvariantError`] naming the first broken invariant.
    pub fn check_invariants(&self) -> Result<(), InvariantError>
    where
        K: fmt::Debug,
    {
        self.list.check_invariants()?;

        if self.index.len() != self.list.len() {
            return Err(InvariantError::new(format!(
                "index holds {} keys but list holds {} entries",
                self.index.len(),
                self.list.len()
            )));
        }

        for (id, entry) in self.list.iter_entries() {
            match self.index.get(&entry.key) {
                Some(&indexed) if indexed == id => {},
                Some(&indexed) => {
                    return Err(InvariantError::new(format!(
                        "key {:?} indexed at {:?} but linked at {:?}",
                        entry.key, indexed, id
                    )));
                },
                None => {
                    return Err(InvariantError::new(format!(
                        "key {:?} is linked but missing from the index",
                        entry.key
                    )));
                },
            }
        }

        let forward = self.list.iter().count();
        let backward = self.list.iter_rev().count();
        if forward != backward {
            return Err(InvariantError::new(format!(
                "forward walk saw {} entries, backward walk saw {}",
                forward, backward
            )));
        }
        Ok(())
    }

    fn insert_front(&mut self, key: K, value: V) -> SlotId {
        debug_assert!(!self.index.contains_key(&key));
        let id = self.list.push_front(Entry {
            key: key.clone(),
            value,
        });
        self.index.insert(key, id);
        id
    }

    #[inline]
    fn move_to_front(&mut self, id: SlotId) {
        self.list.move_to_front(id);
    }

    fn evict_n(&mut self, count: usize) -> usize {
        let mut evicted = 0;
        while evicted < count && self.evict_tail().is_some() {
            evicted += 1;
        }
        evicted
    }
}

impl<K, V> fmt::Debug for LruStore<K, V>
where
    K: Eq + Hash + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruStore")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish_non_exhaustive()
    }
}
