//! Per-table cache settings.

use std::time::Duration;

/// Entry limit used when none is given.
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

/// Pending background cache jobs per table.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Settings for one table's cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl: Duration,
    pub max_entries: usize,
    /// Row field whose value becomes the cache key
    pub key_field: String,
    pub queue_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: DEFAULT_TTL,
            max_entries: DEFAULT_MAX_ENTRIES,
            key_field: String::new(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl CacheConfig {
    pub fn new(key_field: impl Into<String>, ttl: Duration) -> Self {
        Self {
            key_field: key_field.into(),
            ttl,
            ..Self::default()
        }
    }

    /// A configuration that never caches.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Zero falls back to [`DEFAULT_MAX_ENTRIES`].
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = if max_entries == 0 {
            DEFAULT_MAX_ENTRIES
        } else {
            max_entries
        };
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }
}
