//! Counters recorded by the recency store and the snapshot handed to callers.
//!
//! All counters are plain integers: they are only ever touched from the
//! serializer lane, so no atomics or cells are needed.

pub mod metrics_impl;
pub mod snapshot;

pub use metrics_impl::StoreMetrics;
pub use snapshot::CacheStats;
