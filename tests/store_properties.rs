// ==============================================
// RECENCY STORE PROPERTY TESTS (integration)
// ==============================================
//
// Random operation sequences run against both `LruStore` and a naive
// `Vec`-backed reference model. Recency order, contents and eviction counts
// must agree after every step.

use metacache::policy::lru::{LruStore, SetOutcome};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Set(u8, u32),
    Get(u8),
    Peek(u8),
    Prune(f64),
    EnforceCapacity,
    Clear,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (0u8..24, any::<u32>()).prop_map(|(k, v)| Op::Set(k, v)),
        4 => (0u8..24).prop_map(Op::Get),
        1 => (0u8..24).prop_map(Op::Peek),
        1 => (0.01f64..1.5).prop_map(Op::Prune),
        1 => Just(Op::EnforceCapacity),
        1 => Just(Op::Clear),
    ]
}

/// Front of the vector is most-recently-used.
struct Model {
    capacity: usize,
    entries: Vec<(u8, u32)>,
}

impl Model {
    fn position(&self, key: u8) -> Option<usize> {
        self.entries.iter().position(|(k, _)| *k == key)
    }

    fn set(&mut self, key: u8, value: u32) -> SetOutcome {
        let outcome = match self.position(key) {
            Some(pos) => {
                self.entries.remove(pos);
                SetOutcome::Updated
            },
            None => SetOutcome::Inserted,
        };
        self.entries.insert(0, (key, value));
        self.entries.truncate(self.capacity);
        outcome
    }

    fn get(&mut self, key: u8) -> Option<u32> {
        let pos = self.position(key)?;
        let entry = self.entries.remove(pos);
        self.entries.insert(0, entry);
        Some(entry.1)
    }

    fn peek(&self, key: u8) -> Option<u32> {
        self.position(key).map(|pos| self.entries[pos].1)
    }

    fn prune(&mut self, fraction: f64) -> usize {
        let n = (self.entries.len() as f64 * fraction.min(1.0)).ceil() as usize;
        let keep = self.entries.len() - n;
        self.entries.truncate(keep);
        n
    }

    fn keys(&self) -> Vec<u8> {
        self.entries.iter().map(|(k, _)| *k).collect()
    }
}

proptest! {
    /// Store and model agree on order, values and eviction counts.
    #[cfg_attr(miri, ignore)]
    #[test]
    fn prop_matches_reference_model(
        capacity in 1usize..16,
        ops in prop::collection::vec(op_strategy(), 0..200)
    ) {
        let mut store: LruStore<u8, u32> = LruStore::new(capacity);
        let mut model = Model { capacity, entries: Vec::new() };

        for op in ops {
            match op {
                Op::Set(k, v) => prop_assert_eq!(store.set(k, v), model.set(k, v)),
                Op::Get(k) => prop_assert_eq!(store.get(&k).copied(), model.get(k)),
                Op::Peek(k) => prop_assert_eq!(store.peek(&k).copied(), model.peek(k)),
                Op::Prune(f) => prop_assert_eq!(store.prune(f), model.prune(f)),
                Op::EnforceCapacity => prop_assert_eq!(store.enforce_capacity(), 0),
                Op::Clear => {
                    store.clear();
                    model.entries.clear();
                },
            }
            prop_assert!(store.len() <= capacity);
            prop_assert_eq!(store.keys_mru(), model.keys());
            prop_assert!(store.check_invariants().is_ok());
        }
    }

    /// Every successful set is immediately the MRU entry.
    #[cfg_attr(miri, ignore)]
    #[test]
    fn prop_set_makes_key_mru(
        capacity in 1usize..32,
        keys in prop::collection::vec(0u16..64, 1..100)
    ) {
        let mut store = LruStore::new(capacity);
        for key in keys {
            store.set(key, ());
            prop_assert_eq!(store.recency_rank(&key), Some(0));
            prop_assert_eq!(store.keys_mru().first().copied(), Some(key));
        }
    }

    /// A prune removes exactly ceil(len * fraction) entries, all from the LRU end.
    #[cfg_attr(miri, ignore)]
    #[test]
    fn prop_prune_takes_lru_suffix(
        len in 0usize..64,
        fraction in 0.01f64..=1.0
    ) {
        let mut store = LruStore::new(64);
        for i in 0..len {
            store.set(i, i);
        }
        let before = store.keys_mru();
        let expected = (len as f64 * fraction).ceil() as usize;

        prop_assert_eq!(store.prune(fraction), expected);
        prop_assert_eq!(store.keys_mru(), before[..len - expected].to_vec());

        let stats = store.stats();
        prop_assert_eq!(stats.pressure_evictions, expected as u64);
        prop_assert_eq!(stats.prune_calls, 1);
    }

    /// Counter totals line up with the operations that produced them.
    #[cfg_attr(miri, ignore)]
    #[test]
    fn prop_stats_account_for_every_set(
        capacity in 1usize..16,
        keys in prop::collection::vec(0u8..32, 0..150)
    ) {
        let mut store = LruStore::new(capacity);
        for &key in &keys {
            store.set(key, key);
        }
        let stats = store.stats();
        prop_assert_eq!(stats.inserts + stats.updates, keys.len() as u64);
        prop_assert_eq!(stats.capacity_sweeps, keys.len() as u64);
        prop_assert_eq!(stats.inserts - stats.capacity_evictions, store.len() as u64);
        prop_assert_eq!(stats.len, store.len());
        prop_assert_eq!(stats.max_entries, capacity);
    }
}
