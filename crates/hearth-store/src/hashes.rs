//! Shadow store for hash values.
//!
//! Each key maps to a set of field-value pairs mirrored from the remote
//! store. Field-level invalidation removes only the named fields, so the
//! rest of a large hash stays servable locally.

use ahash::AHashMap;
use bytes::Bytes;
use dashmap::DashMap;

/// Concurrent shadow store for hashes.
///
/// A hash whose last field is deleted is removed entirely, matching the
/// remote store's behavior of dropping empty collections.
#[derive(Debug, Default)]
pub struct MemoryHashes {
    entries: DashMap<String, AHashMap<String, Bytes>>,
}

impl MemoryHashes {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a field value, creating the hash if needed.
    pub fn set(&self, key: impl Into<String>, field: impl Into<String>, value: Bytes) {
        self.entries
            .entry(key.into())
            .or_default()
            .insert(field.into(), value);
    }

    /// Returns a field's cached value.
    pub fn get(&self, key: &str, field: &str) -> Option<Bytes> {
        self.entries.get(key)?.get(field).cloned()
    }

    /// Removes the named fields from a hash. Missing keys and fields are
    /// tolerated silently; the hash is dropped once it has no fields left.
    pub fn delete<'a, I>(&self, key: &str, fields: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let Some(mut entry) = self.entries.get_mut(key) else {
            return;
        };
        for field in fields {
            entry.remove(field);
        }
        let empty = entry.is_empty();
        drop(entry);
        if empty {
            self.entries.remove_if(key, |_, map| map.is_empty());
        }
    }

    /// Returns the number of cached fields for a key.
    pub fn len(&self, key: &str) -> usize {
        self.entries.get(key).map(|m| m.len()).unwrap_or(0)
    }

    /// Returns `true` if no hashes are cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes all hashes.
    pub fn clear(&self) {
        self.entries.clear();
    }
}
