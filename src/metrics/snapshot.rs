/// Point-in-time view of a cache's counters and gauges.
///
/// Produced on the serializer lane, so every field reflects the same
/// instant in the cache's operation order.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub get_hits: u64,
    pub get_misses: u64,

    pub inserts: u64,
    pub updates: u64,

    pub capacity_sweeps: u64,
    pub capacity_evictions: u64,
    pub prune_calls: u64,
    pub pressure_evictions: u64,
    pub clears: u64,

    // gauges captured at snapshot time
    pub len: usize,
    pub max_entries: usize,
}

impl CacheStats {
    /// Fraction of `get` calls that hit, in `[0.0, 1.0]`.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.get_hits + self.get_misses;
        if total == 0 {
            0.0
        } else {
            self.get_hits as f64 / total as f64
        }
    }

    /// Total entries removed by either eviction policy.
    #[must_use]
    pub fn total_evictions(&self) -> u64 {
        self.capacity_evictions + self.pressure_evictions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_rate_of_empty_stats_is_zero() {
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }

    #[test]
    fn hit_rate_and_total_evictions() {
        let stats = CacheStats {
            get_hits: 3,
            get_misses: 1,
            capacity_evictions: 2,
            pressure_evictions: 5,
            ..CacheStats::default()
        };
        assert_eq!(stats.hit_rate(), 0.75);
        assert_eq!(stats.total_evictions(), 7);
    }
}
