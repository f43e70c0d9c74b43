//! metacache: a bounded, thread-safe LRU cache for resource metadata.
//!
//! Storage is an arena-backed recency list plus a hash index, owned by a
//! single serializer lane. Capacity is enforced after every write and on a
//! periodic sweep; memory-pressure and termination signals prune or clear the
//! cache through the same lane.
//!
//! Start with [`builder::CacheBuilder`] or [`cache::LinkMetadataCache::shared`].

pub mod builder;
pub mod cache;
pub mod config;
pub mod ds;
pub mod error;
pub(crate) mod lane;
pub mod metrics;
pub mod policy;
pub mod prelude;
pub(crate) mod scheduler;
pub mod signal;
