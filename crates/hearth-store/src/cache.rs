//! Shadow store for opaque string values with optional TTL metadata.
//!
//! `MemoryCache` holds the local copy of plain key-value entries read
//! through from the remote store. The coherence listener removes entries
//! and clears TTL metadata; it never writes values. Expired entries are
//! removed lazily on access.

use std::time::Duration;

use bytes::Bytes;
use dashmap::DashMap;
use tracing::debug;

use crate::time;

/// TTL status of a cached entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TtlStatus {
    /// Entry exists and expires after the given duration.
    Remaining(Duration),
    /// Entry exists without local expiry metadata.
    NoExpiry,
    /// No entry for the key.
    Missing,
}

#[derive(Debug, Clone)]
struct Entry {
    value: Bytes,
    /// Monotonic expiry timestamp in ms. 0 = no expiry.
    expires_at_ms: u64,
}

impl Entry {
    fn is_expired(&self) -> bool {
        time::is_expired(self.expires_at_ms)
    }
}

/// Concurrent shadow cache for opaque values.
///
/// All operations are lock-free for non-conflicting keys. Mutations are
/// idempotent and tolerate missing keys, since invalidation may race with
/// expiry or with another invalidation.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, Entry>,
}

impl MemoryCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a value with an optional TTL, replacing any previous entry.
    pub fn set(&self, key: impl Into<String>, value: Bytes, ttl: Option<Duration>) {
        self.entries.insert(
            key.into(),
            Entry {
                value,
                expires_at_ms: time::expiry_from_ttl(ttl),
            },
        );
    }

    /// Returns the cached value, or `None` if the key is absent or its
    /// local TTL has passed. Expired entries are removed on access.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        let entry = self.entries.get(key)?;
        if entry.is_expired() {
            drop(entry);
            debug!(key, "local entry expired, removing");
            self.entries.remove_if(key, |_, e| e.is_expired());
            return None;
        }
        Some(entry.value.clone())
    }

    /// Removes the given keys. Returns how many entries existed.
    pub fn remove<'a, I>(&self, keys: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        keys.into_iter()
            .filter(|key| self.entries.remove(*key).is_some())
            .count()
    }

    /// Clears TTL metadata for a key, keeping its value. No-op when the
    /// key is absent or has no expiry.
    pub fn clear_ttl(&self, key: &str) {
        if let Some(mut entry) = self.entries.get_mut(key) {
            entry.expires_at_ms = time::NO_EXPIRY;
        }
    }

    /// Moves an entry to a new key, preserving value and expiry metadata.
    /// Absent source: no-op. An existing destination is overwritten.
    pub fn rename(&self, from: &str, to: &str) {
        if from == to {
            return;
        }
        if let Some((_, entry)) = self.entries.remove(from) {
            self.entries.insert(to.to_owned(), entry);
        }
    }

    /// Returns the TTL status of a key.
    pub fn ttl(&self, key: &str) -> TtlStatus {
        match self.entries.get(key) {
            None => TtlStatus::Missing,
            Some(entry) if entry.is_expired() => TtlStatus::Missing,
            Some(entry) => match time::remaining_ms(entry.expires_at_ms) {
                Some(ms) => TtlStatus::Remaining(Duration::from_millis(ms)),
                None => TtlStatus::NoExpiry,
            },
        }
    }

    /// Returns the number of entries, including any not yet lazily expired.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes all entries.
    pub fn clear(&self) {
        self.entries.clear();
    }
}
