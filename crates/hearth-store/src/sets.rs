//! Shadow store for set values.
//!
//! Set members are indexed by a compact identity token rather than by
//! the full member value: the remote notifier publishes the token of a
//! removed member, which lets the listener drop the local copy without
//! reconstructing or deserializing the member itself.

use ahash::AHashMap;
use bytes::Bytes;
use dashmap::DashMap;

/// Concurrent shadow store for sets, members keyed by identity token.
///
/// A set whose last member is removed is dropped entirely.
#[derive(Debug, Default)]
pub struct MemorySets {
    entries: DashMap<String, AHashMap<String, Bytes>>,
}

impl MemorySets {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a member under its identity token, creating the set if needed.
    pub fn insert(&self, key: impl Into<String>, token: impl Into<String>, member: Bytes) {
        self.entries
            .entry(key.into())
            .or_default()
            .insert(token.into(), member);
    }

    /// Returns the member stored under a token.
    pub fn get(&self, key: &str, token: &str) -> Option<Bytes> {
        self.entries.get(key)?.get(token).cloned()
    }

    /// Returns all cached members of a set.
    pub fn members(&self, key: &str) -> Vec<Bytes> {
        self.entries
            .get(key)
            .map(|set| set.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Removes members whose identity token matches. Missing keys and
    /// tokens are tolerated silently; an emptied set is dropped.
    pub fn remove_by_tokens<'a, I>(&self, key: &str, tokens: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let Some(mut entry) = self.entries.get_mut(key) else {
            return;
        };
        for token in tokens {
            entry.remove(token);
        }
        let empty = entry.is_empty();
        drop(entry);
        if empty {
            self.entries.remove_if(key, |_, set| set.is_empty());
        }
    }

    /// Returns the number of cached members for a key.
    pub fn len(&self, key: &str) -> usize {
        self.entries.get(key).map(|s| s.len()).unwrap_or(0)
    }

    /// Returns `true` if no sets are cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes all sets.
    pub fn clear(&self) {
        self.entries.clear();
    }
}
