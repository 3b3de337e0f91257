//! Process identity for self-event suppression.
//!
//! Every invalidation this process publishes to the detailed channel is
//! prefixed with its own token; the listener drops incoming events whose
//! originator matches, so a client never invalidates state for writes it
//! made itself (its local copy is already current).

use std::sync::OnceLock;

use uuid::Uuid;

/// A token identifying this process's cache instance.
///
/// Stable for the process lifetime and distinguishable from other
/// processes talking to the same remote store: the OS process id is
/// combined with a per-process random UUID so id reuse across hosts or
/// restarts cannot collide. Never contains `:`, the wire delimiter of
/// the detailed payload format.
#[derive(Debug, PartialEq, Eq)]
pub struct ProcessId(String);

impl ProcessId {
    /// Returns this process's token. Generated once, on first use.
    pub fn current() -> &'static ProcessId {
        static CURRENT: OnceLock<ProcessId> = OnceLock::new();
        CURRENT.get_or_init(|| {
            ProcessId(format!(
                "{}-{}",
                std::process::id(),
                Uuid::new_v4().simple()
            ))
        })
    }

    /// The token as a string slice, for originator comparison.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProcessId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_across_calls() {
        assert!(std::ptr::eq(ProcessId::current(), ProcessId::current()));
        assert_eq!(ProcessId::current().as_str(), ProcessId::current().as_str());
    }

    #[test]
    fn never_contains_wire_delimiter() {
        assert!(!ProcessId::current().as_str().contains(':'));
    }

    #[test]
    fn display_matches_as_str() {
        let id = ProcessId::current();
        assert_eq!(id.to_string(), id.as_str());
    }
}
