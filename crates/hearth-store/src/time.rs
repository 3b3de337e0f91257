//! Compact monotonic time utilities for TTL shadow metadata.
//!
//! Uses a process-local monotonic clock so expiry timestamps fit in a
//! single u64 instead of an Option<Instant>.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Sentinel value meaning "no expiry".
pub const NO_EXPIRY: u64 = 0;

/// Returns current monotonic time in milliseconds since process start.
#[inline]
pub fn now_ms() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    let start = START.get_or_init(Instant::now);
    start.elapsed().as_millis() as u64
}

/// Returns true if the given expiry timestamp has passed.
#[inline]
pub fn is_expired(expires_at_ms: u64) -> bool {
    expires_at_ms != NO_EXPIRY && now_ms() >= expires_at_ms
}

/// Converts an optional TTL into an absolute expiry timestamp.
#[inline]
pub fn expiry_from_ttl(ttl: Option<Duration>) -> u64 {
    ttl.map(|d| now_ms().saturating_add(d.as_millis() as u64).max(1))
        .unwrap_or(NO_EXPIRY)
}

/// Returns remaining TTL in milliseconds, or None if no expiry is set.
#[inline]
pub fn remaining_ms(expires_at_ms: u64) -> Option<u64> {
    if expires_at_ms == NO_EXPIRY {
        None
    } else {
        Some(expires_at_ms.saturating_sub(now_ms()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_expiry_never_expires() {
        assert!(!is_expired(NO_EXPIRY));
    }

    #[test]
    fn ttl_converts_to_future_timestamp() {
        let at = expiry_from_ttl(Some(Duration::from_secs(60)));
        assert!(at > now_ms());
        assert!(!is_expired(at));
    }

    #[test]
    fn zero_ttl_is_not_the_sentinel() {
        // a zero-duration TTL must still produce a real (immediately
        // expired) timestamp, not the no-expiry sentinel
        let at = expiry_from_ttl(Some(Duration::ZERO));
        assert_ne!(at, NO_EXPIRY);
    }

    #[test]
    fn remaining_ms_none_without_expiry() {
        assert_eq!(remaining_ms(NO_EXPIRY), None);
    }

    #[test]
    fn remaining_ms_counts_down() {
        let at = expiry_from_ttl(Some(Duration::from_secs(10)));
        let left = remaining_ms(at).unwrap();
        assert!(left <= 10_000);
        assert!(left > 9_000);
    }
}
