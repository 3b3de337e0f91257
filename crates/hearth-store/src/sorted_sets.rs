//! Shadow store for sorted-set values.
//!
//! Members are indexed by a signed integer identity token and carry an
//! `f64` score. Two indexes per key: a `BTreeMap` ordered by
//! `(score, token)` for range walks, and a token map for O(1) removal.
//! Score ties are broken by token, so every tree key is unique.
//!
//! Range endpoints follow the remote store's four-state exclude
//! convention. [`Exclude::from_code`] is the single point where the wire
//! integer becomes endpoint semantics.

use std::collections::BTreeMap;
use std::ops::Bound;

use ahash::AHashMap;
use bytes::Bytes;
use dashmap::DashMap;
use ordered_float::OrderedFloat;

/// Which endpoints of a score range are exclusive.
///
/// The discriminants match the upstream store's wire encoding: 0 = both
/// inclusive, 1 = start exclusive, 2 = stop exclusive, 3 = both exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclude {
    /// Both endpoints inclusive.
    None = 0,
    /// Start exclusive, stop inclusive.
    Start = 1,
    /// Start inclusive, stop exclusive.
    Stop = 2,
    /// Both endpoints exclusive.
    Both = 3,
}

impl Exclude {
    /// Decodes the wire integer. Returns `None` for codes outside the
    /// four known states.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Exclude::None),
            1 => Some(Exclude::Start),
            2 => Some(Exclude::Stop),
            3 => Some(Exclude::Both),
            _ => None,
        }
    }

    fn excludes_start(self) -> bool {
        matches!(self, Exclude::Start | Exclude::Both)
    }

    fn excludes_stop(self) -> bool {
        matches!(self, Exclude::Stop | Exclude::Both)
    }
}

#[derive(Debug, Default)]
struct Shadow {
    /// (score, token) index for ordered walks.
    tree: BTreeMap<(OrderedFloat<f64>, i64), ()>,
    /// token → (score, member) index for O(1) lookups and removal.
    members: AHashMap<i64, (OrderedFloat<f64>, Bytes)>,
}

impl Shadow {
    fn insert(&mut self, token: i64, member: Bytes, score: f64) {
        let score = OrderedFloat(score);
        if let Some((old_score, _)) = self.members.insert(token, (score, member)) {
            self.tree.remove(&(old_score, token));
        }
        self.tree.insert((score, token), ());
    }

    fn remove(&mut self, token: i64) -> bool {
        if let Some((score, _)) = self.members.remove(&token) {
            self.tree.remove(&(score, token));
            true
        } else {
            false
        }
    }

    /// Tokens whose score lies in the given interval.
    fn tokens_in_range(&self, start: f64, stop: f64, exclude: Exclude) -> Vec<i64> {
        if start > stop || (start == stop && exclude != Exclude::None) {
            return Vec::new();
        }
        let lo = if exclude.excludes_start() {
            Bound::Excluded((OrderedFloat(start), i64::MAX))
        } else {
            Bound::Included((OrderedFloat(start), i64::MIN))
        };
        let hi = if exclude.excludes_stop() {
            Bound::Excluded((OrderedFloat(stop), i64::MIN))
        } else {
            Bound::Included((OrderedFloat(stop), i64::MAX))
        };
        self.tree.range((lo, hi)).map(|((_, token), _)| *token).collect()
    }
}

/// Concurrent shadow store for sorted sets.
///
/// An emptied sorted set is dropped entirely.
#[derive(Debug, Default)]
pub struct MemorySortedSets {
    entries: DashMap<String, Shadow>,
}

impl MemorySortedSets {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a member under its identity token with the given score,
    /// creating the sorted set if needed. Re-inserting a token moves it
    /// to the new score.
    pub fn insert(&self, key: impl Into<String>, token: i64, member: Bytes, score: f64) {
        self.entries
            .entry(key.into())
            .or_default()
            .insert(token, member, score);
    }

    /// Returns the cached `(score, member)` for a token.
    pub fn get(&self, key: &str, token: i64) -> Option<(f64, Bytes)> {
        self.entries
            .get(key)?
            .members
            .get(&token)
            .map(|(score, member)| (score.0, member.clone()))
    }

    /// Removes the member with the given identity token. Missing keys and
    /// tokens are tolerated silently; an emptied set is dropped.
    pub fn remove_by_token(&self, key: &str, token: i64) {
        let Some(mut entry) = self.entries.get_mut(key) else {
            return;
        };
        entry.remove(token);
        let empty = entry.members.is_empty();
        drop(entry);
        if empty {
            self.entries.remove_if(key, |_, shadow| shadow.members.is_empty());
        }
    }

    /// Removes members whose score lies in `[start, stop]`, with endpoint
    /// exclusions per `exclude`. Returns the number removed.
    pub fn delete_by_score(&self, key: &str, start: f64, stop: f64, exclude: Exclude) -> usize {
        let Some(mut entry) = self.entries.get_mut(key) else {
            return 0;
        };
        let victims = entry.tokens_in_range(start, stop, exclude);
        for token in &victims {
            entry.remove(*token);
        }
        let empty = entry.members.is_empty();
        drop(entry);
        if empty {
            self.entries.remove_if(key, |_, shadow| shadow.members.is_empty());
        }
        victims.len()
    }

    /// Returns `(score, member)` pairs in the given score interval, in
    /// score order.
    pub fn range_by_score(
        &self,
        key: &str,
        start: f64,
        stop: f64,
        exclude: Exclude,
    ) -> Vec<(f64, Bytes)> {
        let Some(entry) = self.entries.get(key) else {
            return Vec::new();
        };
        entry
            .tokens_in_range(start, stop, exclude)
            .into_iter()
            .filter_map(|token| {
                entry
                    .members
                    .get(&token)
                    .map(|(score, member)| (score.0, member.clone()))
            })
            .collect()
    }

    /// Returns the number of cached members for a key.
    pub fn len(&self, key: &str) -> usize {
        self.entries.get(key).map(|s| s.members.len()).unwrap_or(0)
    }

    /// Returns `true` if no sorted sets are cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes all sorted sets.
    pub fn clear(&self) {
        self.entries.clear();
    }
}
