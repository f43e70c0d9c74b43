/// Running counters owned by an [`LruStore`](crate::policy::lru::LruStore).
#[derive(Debug, Default, Clone)]
pub struct StoreMetrics {
    pub get_hits: u64,
    pub get_misses: u64,
    pub inserts: u64,
    pub updates: u64,
    pub capacity_sweeps: u64,
    pub capacity_evictions: u64,
    pub prune_calls: u64,
    pub pressure_evictions: u64,
    pub clears: u64,
}

impl StoreMetrics {
    #[inline]
    pub fn record_get(&mut self, hit: bool) {
        if hit {
            self.get_hits += 1;
        } else {
            self.get_misses += 1;
        }
    }

    #[inline]
    pub fn record_insert(&mut self) {
        self.inserts += 1;
    }

    #[inline]
    pub fn record_update(&mut self) {
        self.updates += 1;
    }

    #[inline]
    pub fn record_capacity_sweep(&mut self, evicted: usize) {
        self.capacity_sweeps += 1;
        self.capacity_evictions += evicted as u64;
    }

    #[inline]
    pub fn record_prune(&mut self, evicted: usize) {
        self.prune_calls += 1;
        self.pressure_evictions += evicted as u64;
    }

    #[inline]
    pub fn record_clear(&mut self) {
        self.clears += 1;
    }
}
