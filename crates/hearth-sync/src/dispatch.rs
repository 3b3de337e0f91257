//! Event dispatch: applying invalidations to a registered database.
//!
//! A [`Database`] bundles the four typed shadow stores that one logical
//! cache instance owns. The listener applies each decoded event to every
//! registered database; the mapping from event to store mutation lives
//! here, in [`Database::apply`].
//!
//! Dispatch only ever removes entries or clears metadata. The single
//! structural move is rename, which re-homes an existing entry without
//! inserting new data. Applying any event twice, or against state the
//! event no longer matches, is harmless: every mutator is idempotent
//! and tolerates missing keys.

use hearth_store::{MemoryCache, MemoryHashes, MemorySets, MemorySortedSets};

use crate::event::Event;

/// The four typed shadow stores of one cache instance.
///
/// Constructed by the application, shared via `Arc`: application threads
/// read and populate the stores while the notification task invalidates
/// them. The stores must not share state with another database's stores.
#[derive(Debug, Default)]
pub struct Database {
    /// Opaque string values with TTL metadata.
    pub cache: MemoryCache,
    /// Hash shadows, invalidated per field.
    pub hashes: MemoryHashes,
    /// Set shadows, members indexed by string token.
    pub sets: MemorySets,
    /// Sorted-set shadows, members indexed by integer token.
    pub sorted_sets: MemorySortedSets,
}

impl Database {
    /// Creates a database with empty stores.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one event's tabulated mutation to this database's stores.
    ///
    /// [`Event::Ignored`] is a no-op.
    pub fn apply(&self, event: &Event<'_>) {
        match *event {
            Event::Expired { key }
            | Event::Deleted { key }
            | Event::StringSet { key }
            | Event::StringMutated { key } => {
                self.cache.remove([key]);
            }
            Event::Expire { key } => self.cache.clear_ttl(key),
            Event::Renamed { from, to } => self.cache.rename(from, to),
            Event::HashFieldChanged { key, field } => self.hashes.delete(key, [field]),
            Event::SetMemberRemoved { key, token } => self.sets.remove_by_tokens(key, [token]),
            Event::SortedSetMemberChanged { key, token } => {
                self.sorted_sets.remove_by_token(key, token);
            }
            Event::SortedSetRangeByScoreRemoved {
                key,
                start,
                stop,
                exclude,
            } => {
                self.sorted_sets.delete_by_score(key, start, stop, exclude);
            }
            // rank and lex ranges can't be replayed against the shadow
            // without re-reading the store, so the key is invalidated
            Event::SortedSetRangeInvalidated { key } => {
                self.cache.remove([key]);
            }
            Event::Ignored => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use hearth_store::{Exclude, TtlStatus};
    use std::time::Duration;

    use super::*;

    /// A database with one entry in every store, for checking that an
    /// event touches exactly the store the table says it does.
    fn populated() -> Database {
        let db = Database::new();
        db.cache
            .set("k", Bytes::from("v"), Some(Duration::from_secs(60)));
        db.hashes.set("k", "field", Bytes::from("fv"));
        db.sets.insert("k", "tok", Bytes::from("m"));
        db.sorted_sets.insert("k", 7, Bytes::from("zm"), 1.0);
        db
    }

    fn assert_untouched_except_cache(db: &Database) {
        assert_eq!(db.hashes.len("k"), 1);
        assert_eq!(db.sets.len("k"), 1);
        assert_eq!(db.sorted_sets.len("k"), 1);
    }

    #[test]
    fn expired_removes_cache_entry_only() {
        let db = populated();
        db.apply(&Event::Expired { key: "k" });
        assert_eq!(db.cache.get("k"), None);
        assert_untouched_except_cache(&db);
    }

    #[test]
    fn deleted_removes_cache_entry_only() {
        let db = populated();
        db.apply(&Event::Deleted { key: "k" });
        assert_eq!(db.cache.get("k"), None);
        assert_untouched_except_cache(&db);
    }

    #[test]
    fn expire_clears_ttl_but_keeps_value() {
        let db = populated();
        db.apply(&Event::Expire { key: "k" });
        assert_eq!(db.cache.ttl("k"), TtlStatus::NoExpiry);
        assert_eq!(db.cache.get("k"), Some(Bytes::from("v")));
        assert_untouched_except_cache(&db);
    }

    #[test]
    fn renamed_moves_cache_entry() {
        let db = populated();
        db.apply(&Event::Renamed {
            from: "k",
            to: "k2",
        });
        assert_eq!(db.cache.get("k"), None);
        assert_eq!(db.cache.get("k2"), Some(Bytes::from("v")));
        assert_untouched_except_cache(&db);
    }

    #[test]
    fn string_set_and_mutations_invalidate_key() {
        for event in [Event::StringSet { key: "k" }, Event::StringMutated { key: "k" }] {
            let db = populated();
            db.apply(&event);
            assert_eq!(db.cache.get("k"), None);
            assert_untouched_except_cache(&db);
        }
    }

    #[test]
    fn hash_field_change_deletes_single_field() {
        let db = populated();
        db.hashes.set("k", "other", Bytes::from("keep"));
        db.apply(&Event::HashFieldChanged {
            key: "k",
            field: "field",
        });
        assert_eq!(db.hashes.get("k", "field"), None);
        assert_eq!(db.hashes.get("k", "other"), Some(Bytes::from("keep")));
        assert!(db.cache.get("k").is_some());
        assert_eq!(db.sets.len("k"), 1);
    }

    #[test]
    fn set_member_removed_by_token() {
        let db = populated();
        db.apply(&Event::SetMemberRemoved {
            key: "k",
            token: "tok",
        });
        assert_eq!(db.sets.len("k"), 0);
        assert!(db.cache.get("k").is_some());
        assert_eq!(db.hashes.len("k"), 1);
    }

    #[test]
    fn sorted_set_member_removed_by_token() {
        let db = populated();
        db.apply(&Event::SortedSetMemberChanged { key: "k", token: 7 });
        assert_eq!(db.sorted_sets.len("k"), 0);
        assert!(db.cache.get("k").is_some());
    }

    #[test]
    fn score_range_removal_honors_exclusions() {
        let db = Database::new();
        db.sorted_sets.insert("z", 1, Bytes::from("a"), 1.0);
        db.sorted_sets.insert("z", 2, Bytes::from("b"), 5.0);
        db.sorted_sets.insert("z", 3, Bytes::from("c"), 9.0);
        db.apply(&Event::SortedSetRangeByScoreRemoved {
            key: "z",
            start: 1.0,
            stop: 9.0,
            exclude: Exclude::Both,
        });
        assert!(db.sorted_sets.get("z", 1).is_some());
        assert_eq!(db.sorted_sets.get("z", 2), None);
        assert!(db.sorted_sets.get("z", 3).is_some());
    }

    #[test]
    fn rank_range_invalidates_cache_key() {
        let db = populated();
        db.apply(&Event::SortedSetRangeInvalidated { key: "k" });
        assert_eq!(db.cache.get("k"), None);
        assert_untouched_except_cache(&db);
    }

    #[test]
    fn ignored_touches_nothing() {
        let db = populated();
        db.apply(&Event::Ignored);
        assert!(db.cache.get("k").is_some());
        assert_untouched_except_cache(&db);
    }

    #[test]
    fn mutations_tolerate_missing_keys() {
        let db = Database::new();
        db.apply(&Event::Deleted { key: "nope" });
        db.apply(&Event::Expire { key: "nope" });
        db.apply(&Event::Renamed {
            from: "nope",
            to: "other",
        });
        db.apply(&Event::HashFieldChanged {
            key: "nope",
            field: "f",
        });
        db.apply(&Event::SetMemberRemoved {
            key: "nope",
            token: "t",
        });
        db.apply(&Event::SortedSetMemberChanged { key: "nope", token: 1 });
        assert!(db.cache.is_empty());
    }
}
