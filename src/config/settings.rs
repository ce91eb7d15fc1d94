//! Runtime configuration loader and common helpers.

use std::{fs, path::Path, path::PathBuf};

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use url::Url;

/// Koinos REST API used for balance and pool queries.
pub const DEFAULT_API_BASE_URL: &str = "https://api.koinos.io";

/// KoinDX mainnet token list.
pub const DEFAULT_TOKEN_LIST_URL: &str =
    "https://raw.githubusercontent.com/koindx/token-list/refs/heads/main/src/tokens/mainnet.json";

/// CoinGecko simple-price endpoint for the native asset.
pub const DEFAULT_PRICE_API_URL: &str = "https://api.coingecko.com/api/v3/simple/price";

/// KOIN contract address on mainnet.
pub const DEFAULT_NATIVE_TOKEN_ADDRESS: &str = "15DJN4a8SgrbGhhGksSBASiSYjGnMU8dGL";

/// ------------------------------------------------------------------
/// Main Settings object – *single definition only!*
/// ------------------------------------------------------------------
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Settings {
    /* -------- remote endpoints ---------------------- */
    pub api_base_url: String,
    pub token_list_url: String,
    pub price_api_url: String,
    pub native_asset_id: String,
    pub native_token_address: String,

    /* -------- tracked wallet ------------------------ */
    pub wallet_address: String,

    /* -------- cache & freshness tuning -------------- */
    pub cache_file: PathBuf,
    pub short_check_interval_ms: i64,
    pub long_check_interval_ms: i64,
    pub scan_delay_ms: u64,

    /* -------- network tuning ------------------------ */
    pub request_timeout_ms: u64,
    pub price_ttl_secs: i64,
    pub pools_ttl_secs: i64,
    pub watch_interval_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            token_list_url: DEFAULT_TOKEN_LIST_URL.to_string(),
            price_api_url: DEFAULT_PRICE_API_URL.to_string(),
            native_asset_id: "koinos".to_string(),
            native_token_address: DEFAULT_NATIVE_TOKEN_ADDRESS.to_string(),
            wallet_address: String::new(),
            cache_file: PathBuf::from("tracker-cache.json"),
            short_check_interval_ms: 5_000,
            long_check_interval_ms: 60_000,
            scan_delay_ms: 100,
            request_timeout_ms: 10_000,
            price_ttl_secs: 600,
            pools_ttl_secs: 600,
            watch_interval_secs: 30,
        }
    }
}

impl Settings {
    /// --------------------------------------------------------------
    /// Read `settings.json` from disk.
    /// --------------------------------------------------------------
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("reading settings file {:?}", path.as_ref()))?;
        let json: serde_json::Value = serde_json::from_str(&raw)?;
        let defaults = Settings::default();

        /* -------- plain strings ---------------------------------- */
        let api_base_url = json["api_base_url"]
            .as_str()
            .unwrap_or(&defaults.api_base_url)
            .trim_end_matches('/')
            .to_string();
        let token_list_url = json["token_list_url"]
            .as_str()
            .unwrap_or(&defaults.token_list_url)
            .to_string();
        let price_api_url = json["price_api_url"]
            .as_str()
            .unwrap_or(&defaults.price_api_url)
            .to_string();
        let native_asset_id = json["native_asset_id"]
            .as_str()
            .unwrap_or(&defaults.native_asset_id)
            .to_string();
        let native_token_address = json["native_token_address"]
            .as_str()
            .unwrap_or(&defaults.native_token_address)
            .to_string();
        let wallet_address = json["wallet_address"].as_str().unwrap_or_default().to_string();

        /* -------- numeric parameters ----------------------------- */
        let short_check_interval_ms = json["short_check_interval_ms"].as_i64().unwrap_or(5_000);
        let long_check_interval_ms = json["long_check_interval_ms"].as_i64().unwrap_or(60_000);
        let scan_delay_ms = json["scan_delay_ms"].as_u64().unwrap_or(100);
        let request_timeout_ms = json["request_timeout_ms"].as_u64().unwrap_or(10_000);
        let price_ttl_secs = json["price_ttl_secs"].as_i64().unwrap_or(600);
        let pools_ttl_secs = json["pools_ttl_secs"].as_i64().unwrap_or(600);
        let watch_interval_secs = json["watch_interval_secs"].as_u64().unwrap_or(30);

        /* -------- misc ------------------------------------------- */
        let cache_file = json["cache_file"]
            .as_str()
            .map(PathBuf::from)
            .unwrap_or_else(|| defaults.cache_file.clone());

        let settings = Self {
            api_base_url,
            token_list_url,
            price_api_url,
            native_asset_id,
            native_token_address,
            wallet_address,
            cache_file,
            short_check_interval_ms,
            long_check_interval_ms,
            scan_delay_ms,
            request_timeout_ms,
            price_ttl_secs,
            pools_ttl_secs,
            watch_interval_secs,
        };
        settings.validate_urls();
        Ok(settings)
    }

    /// --------------------------------------------------------------
    /// Load settings, falling back to the built-in defaults when the
    /// file is missing or unreadable.
    /// --------------------------------------------------------------
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load_from_file(&path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(
                    "⚙️ [SETTINGS] {:?} not usable ({e:#}), using defaults",
                    path.as_ref()
                );
                Settings::default()
            }
        }
    }

    /// --------------------------------------------------------------
    /// Save settings to a specific file path.
    /// --------------------------------------------------------------
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json_string = serde_json::to_string_pretty(self)?;
        fs::write(&path, json_string)
            .with_context(|| format!("writing settings to {:?}", path.as_ref()))?;
        Ok(())
    }

    /// A bad endpoint URL is a configuration mistake, not a reason to
    /// refuse startup: the scan degrades to cached data anyway.
    fn validate_urls(&self) {
        for (label, value) in [
            ("api_base_url", &self.api_base_url),
            ("token_list_url", &self.token_list_url),
            ("price_api_url", &self.price_api_url),
        ] {
            if Url::parse(value).is_err() {
                warn!("⚙️ [SETTINGS] {label} is not a valid URL: {value}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied_for_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "wallet_address": "1abc" }"#).unwrap();

        let settings = Settings::load_from_file(&path).unwrap();
        assert_eq!(settings.wallet_address, "1abc");
        assert_eq!(settings.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(settings.short_check_interval_ms, 5_000);
        assert_eq!(settings.long_check_interval_ms, 60_000);
        assert_eq!(settings.scan_delay_ms, 100);
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let mut settings = Settings::default();
        settings.wallet_address = "1FakeWallet".to_string();
        settings.short_check_interval_ms = 2_500;
        settings.save_to_file(&path).unwrap();

        let loaded = Settings::load_from_file(&path).unwrap();
        assert_eq!(loaded.wallet_address, "1FakeWallet");
        assert_eq!(loaded.short_check_interval_ms, 2_500);
        assert_eq!(loaded.token_list_url, DEFAULT_TOKEN_LIST_URL);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let settings = Settings::load_or_default("/nonexistent/settings.json");
        assert_eq!(settings.api_base_url, DEFAULT_API_BASE_URL);
        assert!(settings.wallet_address.is_empty());
    }

    #[test]
    fn test_trailing_slash_stripped_from_base_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "api_base_url": "https://api.example.org/" }"#).unwrap();

        let settings = Settings::load_from_file(&path).unwrap();
        assert_eq!(settings.api_base_url, "https://api.example.org");
    }
}
