//! Persistent balance cache.
//!
//! Everything the tracker remembers between sessions lives in one JSON
//! state file: per-(wallet, token) balances and check timestamps, the
//! native price snapshot, the pool ratio snapshot, and the token list
//! URL the cache was built against. Balances stay string-encoded so no
//! precision is lost on the round trip.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::valuation::{PoolRatioSnapshot, PriceSnapshot};

fn cache_key(wallet: &str, token: &str) -> String {
    format!("{wallet}_{token}")
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct CacheState {
    #[serde(default)]
    pub balances: HashMap<String, String>,
    #[serde(default)]
    pub timestamps: HashMap<String, i64>,
    #[serde(default)]
    pub price: Option<PriceSnapshot>,
    #[serde(default)]
    pub pools: Option<PoolRatioSnapshot>,
    #[serde(default)]
    pub token_list_url: Option<String>,
}

pub struct CacheStore {
    path: PathBuf,
    state: CacheState,
}

impl CacheStore {
    /// Load the cache from disk. A missing or corrupt state file yields
    /// an empty cache; the tracker prefers degraded-but-running over a
    /// startup failure.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let state = match Self::read_state(&path) {
            Ok(state) => state,
            Err(e) => {
                warn!("💾 [CACHE] Error loading cached data from {path:?}: {e:#}");
                CacheState::default()
            }
        };
        Self { path, state }
    }

    fn read_state(path: &Path) -> Result<CacheState> {
        if !path.exists() {
            return Ok(CacheState::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading cache file {path:?}"))?;
        serde_json::from_str(&raw).context("parsing cache file")
    }

    /// --------------------------------------------------------------
    /// Balance records
    /// --------------------------------------------------------------
    pub fn balance(&self, wallet: &str, token: &str) -> Option<&str> {
        self.state
            .balances
            .get(&cache_key(wallet, token))
            .map(String::as_str)
    }

    pub fn has_nonzero_balance(&self, wallet: &str, token: &str) -> bool {
        self.balance(wallet, token)
            .map(super::is_nonzero_balance)
            .unwrap_or(false)
    }

    /// Last check time in ms since epoch, `None` if never checked.
    pub fn last_checked(&self, wallet: &str, token: &str) -> Option<i64> {
        self.state.timestamps.get(&cache_key(wallet, token)).copied()
    }

    /// Record a fetched balance and reset the freshness clock, then
    /// persist. Balance and timestamp always move together; timestamps
    /// never move backwards for a key.
    pub fn save_balance(&mut self, wallet: &str, token: &str, balance: &str, now_ms: i64) {
        let key = cache_key(wallet, token);
        let stamp = self
            .state
            .timestamps
            .get(&key)
            .map(|prev| now_ms.max(*prev))
            .unwrap_or(now_ms);
        self.state.balances.insert(key.clone(), balance.to_string());
        self.state.timestamps.insert(key, stamp);
        self.persist();
    }

    /// --------------------------------------------------------------
    /// Market data snapshots
    /// --------------------------------------------------------------
    pub fn price(&self) -> Option<&PriceSnapshot> {
        self.state.price.as_ref()
    }

    pub fn save_price(&mut self, snapshot: PriceSnapshot) {
        self.state.price = Some(snapshot);
        self.persist();
    }

    pub fn pools(&self) -> Option<&PoolRatioSnapshot> {
        self.state.pools.as_ref()
    }

    pub fn save_pools(&mut self, snapshot: PoolRatioSnapshot) {
        self.state.pools = Some(snapshot);
        self.persist();
    }

    /// --------------------------------------------------------------
    /// Token list source tracking
    /// --------------------------------------------------------------
    /// Cached balances are only meaningful against the token list they
    /// were collected with; switching sources clears everything.
    pub fn set_token_list_url(&mut self, url: &str) {
        match self.state.token_list_url.as_deref() {
            Some(current) if current == url => return,
            Some(current) => {
                warn!("💾 [CACHE] Token list changed ({current} -> {url}), clearing cache");
                self.state = CacheState::default();
            }
            None => {}
        }
        self.state.token_list_url = Some(url.to_string());
        self.persist();
    }

    pub fn clear(&mut self) {
        self.state = CacheState::default();
        self.persist();
    }

    /// Write failures (quota, read-only filesystem) are logged and
    /// swallowed; the in-memory state keeps serving for the session.
    fn persist(&self) {
        let result = serde_json::to_string(&self.state)
            .context("serializing cache state")
            .and_then(|json| {
                fs::write(&self.path, json)
                    .with_context(|| format!("writing cache file {:?}", self.path))
            });
        match result {
            Ok(()) => debug!("💾 [CACHE] Persisted {} balances", self.state.balances.len()),
            Err(e) => warn!("💾 [CACHE] Error saving cache: {e:#}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, CacheStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::load(dir.path().join("cache.json"));
        (dir, store)
    }

    #[test]
    fn test_save_get_round_trip_is_string_exact() {
        let (_dir, mut store) = temp_store();
        let big = "340282366920938463463374607431768211455";
        store.save_balance("1W", "1T", big, 1_000);
        assert_eq!(store.balance("1W", "1T"), Some(big));
        assert_eq!(store.last_checked("1W", "1T"), Some(1_000));
    }

    #[test]
    fn test_reload_preserves_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let mut store = CacheStore::load(&path);
        store.save_balance("1W", "1T", "42", 5_000);

        let reloaded = CacheStore::load(&path);
        assert_eq!(reloaded.balance("1W", "1T"), Some("42"));
        assert_eq!(reloaded.last_checked("1W", "1T"), Some(5_000));
    }

    #[test]
    fn test_corrupt_file_yields_empty_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, "{not json at all").unwrap();

        let store = CacheStore::load(&path);
        assert!(store.balance("1W", "1T").is_none());
        assert!(store.price().is_none());
    }

    #[test]
    fn test_timestamps_never_move_backwards() {
        let (_dir, mut store) = temp_store();
        store.save_balance("1W", "1T", "10", 9_000);
        store.save_balance("1W", "1T", "11", 4_000);
        assert_eq!(store.balance("1W", "1T"), Some("11"));
        assert_eq!(store.last_checked("1W", "1T"), Some(9_000));
    }

    #[test]
    fn test_nonzero_balance_detection() {
        let (_dir, mut store) = temp_store();
        assert!(!store.has_nonzero_balance("1W", "1T"));
        store.save_balance("1W", "1T", "0", 1_000);
        assert!(!store.has_nonzero_balance("1W", "1T"));
        store.save_balance("1W", "1T", "7", 2_000);
        assert!(store.has_nonzero_balance("1W", "1T"));
    }

    #[test]
    fn test_token_list_change_clears_cache() {
        let (_dir, mut store) = temp_store();
        store.set_token_list_url("https://one.example/list.json");
        store.save_balance("1W", "1T", "99", 1_000);

        store.set_token_list_url("https://one.example/list.json");
        assert_eq!(store.balance("1W", "1T"), Some("99"));

        store.set_token_list_url("https://two.example/list.json");
        assert!(store.balance("1W", "1T").is_none());
    }
}
