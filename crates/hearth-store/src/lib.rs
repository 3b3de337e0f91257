//! hearth-store: typed local shadow stores.
//!
//! Holds the client-side copies of remote values (opaque strings,
//! hashes, sets, and sorted sets) that the coherence engine invalidates
//! when other clients mutate the shared store. All stores are safe to
//! mutate from the notification task while application threads read.

pub mod cache;
pub mod hashes;
pub mod sets;
pub mod sorted_sets;
pub mod time;

pub use cache::{MemoryCache, TtlStatus};
pub use hashes::MemoryHashes;
pub use sets::MemorySets;
pub use sorted_sets::{Exclude, MemorySortedSets};
