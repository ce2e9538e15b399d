//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// A cached value together with its key and absolute expiry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Key the entry is indexed under
    pub key: String,
    /// Serialized row snapshot
    pub value: Vec<u8>,
    /// Instant after which the entry must not be served
    pub expires_at: Instant,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry expiring `ttl` from now.
    pub fn new(key: String, value: Vec<u8>, ttl: Duration) -> Self {
        Self {
            key,
            value,
            expires_at: expiry_from_now(ttl),
        }
    }

    // == Refresh ==
    /// Replaces the value and restarts the TTL.
    pub fn refresh(&mut self, value: Vec<u8>, ttl: Duration) {
        self.value = value;
        self.expires_at = expiry_from_now(ttl);
    }

    // == Is Expired ==
    /// Checks whether the entry has expired as of `now`.
    ///
    /// An entry is still valid at exactly its expiry instant; it expires once
    /// `now` is strictly past it.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now > self.expires_at
    }

    /// Checks whether the entry has expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    // == Time To Live ==
    /// Remaining lifetime, zero once expired.
    pub fn ttl_remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}

/// Saturates instead of panicking on absurd TTLs.
fn expiry_from_now(ttl: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(ttl)
        .unwrap_or_else(|| now + Duration::from_secs(60 * 60 * 24 * 365 * 100))
}
