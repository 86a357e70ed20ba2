//! Freshness checks for cache entries.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Default time-to-live for cache entries (5 minutes).
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Milliseconds since the Unix epoch, clamped at zero.
pub fn to_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Age of an entry captured at `captured_at_ms` as seen at `now`.
///
/// A capture time in the future (clock skew) counts as age zero.
pub fn age(captured_at_ms: u64, now: SystemTime) -> Duration {
    Duration::from_millis(to_millis(now).saturating_sub(captured_at_ms))
}

/// An entry is fresh while its age is strictly below `ttl`.
pub fn is_fresh(captured_at_ms: u64, now: SystemTime, ttl: Duration) -> bool {
    age(captured_at_ms, now) < ttl
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_just_captured() {
        let now = SystemTime::now();
        assert!(is_fresh(to_millis(now), now, DEFAULT_TTL));
    }

    #[test]
    fn test_stale_at_exact_ttl() {
        let captured = UNIX_EPOCH + Duration::from_secs(1_000);
        let now = captured + DEFAULT_TTL;
        assert!(!is_fresh(to_millis(captured), now, DEFAULT_TTL));
        assert!(is_fresh(
            to_millis(captured),
            now - Duration::from_millis(1),
            DEFAULT_TTL
        ));
    }

    #[test]
    fn test_future_capture_is_fresh() {
        let now = UNIX_EPOCH + Duration::from_secs(1_000);
        let captured = to_millis(now + Duration::from_secs(60));
        assert_eq!(age(captured, now), Duration::ZERO);
        assert!(is_fresh(captured, now, DEFAULT_TTL));
    }

    #[test]
    fn test_zero_ttl_is_never_fresh() {
        let now = SystemTime::now();
        assert!(!is_fresh(to_millis(now), now, Duration::ZERO));
    }
}
