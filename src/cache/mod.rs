//! Cache Module
//!
//! In-memory row cache with TTL expiration and LRU eviction, plus the key
//! resolution and encoding a table needs to read through it.

mod codec;
mod config;
mod entry;
mod lru;
mod resolver;
mod stats;
mod store;
mod table_cache;


// Re-export public types
pub use codec::{decode_row, encode_row};
pub use config::{CacheConfig, DEFAULT_MAX_ENTRIES, DEFAULT_QUEUE_CAPACITY};
pub use entry::CacheEntry;
pub use lru::LruList;
pub use resolver::{canonical_key, key_from_row, resolve_cache_key};
pub use stats::CacheStats;
pub use store::EvictionCache;
pub use table_cache::TableCache;
