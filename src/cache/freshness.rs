//! Freshness policy for cached balances.
//!
//! Tokens known to hold value are re-checked on a short interval,
//! tokens with no observed balance on a long one. Pure functions of
//! cached state and wall-clock time, no I/O.

use super::store::CacheStore;

#[derive(Clone, Copy, Debug)]
pub struct CheckIntervals {
    /// Re-check interval for tokens with a nonzero cached balance.
    pub short_ms: i64,
    /// Re-check interval for tokens never seen with a balance.
    pub long_ms: i64,
}

impl Default for CheckIntervals {
    fn default() -> Self {
        Self { short_ms: 5_000, long_ms: 60_000 }
    }
}

/// `true` when the cached value is stale enough to warrant a network
/// re-check. `last_checked_ms = None` (never checked) always refreshes.
pub fn should_refresh(
    last_checked_ms: Option<i64>,
    has_nonzero_balance: bool,
    now_ms: i64,
    intervals: CheckIntervals,
) -> bool {
    let last = match last_checked_ms {
        Some(last) => last,
        None => return true,
    };
    let interval = if has_nonzero_balance {
        intervals.short_ms
    } else {
        intervals.long_ms
    };
    now_ms - last > interval
}

/// Convenience wrapper reading the cached state for a key.
pub fn should_refresh_token(
    store: &CacheStore,
    wallet: &str,
    token: &str,
    now_ms: i64,
    intervals: CheckIntervals,
) -> bool {
    should_refresh(
        store.last_checked(wallet, token),
        store.has_nonzero_balance(wallet, token),
        now_ms,
        intervals,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVALS: CheckIntervals = CheckIntervals { short_ms: 5_000, long_ms: 60_000 };

    #[test]
    fn test_never_checked_always_refreshes() {
        assert!(should_refresh(None, false, 0, INTERVALS));
        assert!(should_refresh(None, true, 0, INTERVALS));
    }

    #[test]
    fn test_nonzero_balance_uses_short_interval() {
        let last = 100_000;
        assert!(!should_refresh(Some(last), true, last + 5_000, INTERVALS));
        assert!(should_refresh(Some(last), true, last + 5_001, INTERVALS));
    }

    #[test]
    fn test_zero_balance_uses_long_interval() {
        let last = 100_000;
        assert!(!should_refresh(Some(last), false, last + 5_001, INTERVALS));
        assert!(!should_refresh(Some(last), false, last + 60_000, INTERVALS));
        assert!(should_refresh(Some(last), false, last + 60_001, INTERVALS));
    }

    #[test]
    fn test_wrapper_reads_cached_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CacheStore::load(dir.path().join("cache.json"));

        // No entry at all: first-time check.
        assert!(should_refresh_token(&store, "1W", "1T", 0, INTERVALS));

        // Nonzero balance checked just now: short interval applies.
        store.save_balance("1W", "1T", "5", 100_000);
        assert!(!should_refresh_token(&store, "1W", "1T", 101_000, INTERVALS));
        assert!(should_refresh_token(&store, "1W", "1T", 106_000, INTERVALS));

        // Confirmed-zero balance: long interval applies.
        store.save_balance("1W", "1Z", "0", 100_000);
        assert!(!should_refresh_token(&store, "1W", "1Z", 106_000, INTERVALS));
        assert!(should_refresh_token(&store, "1W", "1Z", 161_000, INTERVALS));
    }
}
