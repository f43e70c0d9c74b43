pub mod lru;

pub use lru::{Entry, LruStore, SetOutcome};
