pub use crate::builder::CacheBuilder;
pub use crate::cache::{LinkMetadataCache, MetadataCache};
pub use crate::config::CacheConfig;
pub use crate::error::{BuildError, ConfigError, InvariantError};
pub use crate::metrics::CacheStats;
pub use crate::signal::{Signal, SignalHub, SignalSource};
