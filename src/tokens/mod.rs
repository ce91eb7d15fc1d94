//! Token reference list handling.
//!
//! The token list is read-only reference data fetched wholesale from a
//! remote JSON document; there is no incremental merge, a reload replaces
//! the previous list completely.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use log::{info, warn};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::ApiClient;
use crate::config::settings::DEFAULT_NATIVE_TOKEN_ADDRESS;

/// Fallback logo used when a descriptor carries none.
pub const DEFAULT_LOGO_URI: &str = "https://koindx.com/logo.svg";

/// Symbols for contracts worth knowing even when the token list is
/// unavailable.
static BUILTIN_SYMBOLS: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| HashMap::from([(DEFAULT_NATIVE_TOKEN_ADDRESS, "KOIN")]));

/// Display symbol for a contract: the token list wins, then the
/// built-in table, then a generic unit.
pub fn symbol_for(address: &str, list: &[TokenDescriptor]) -> String {
    if let Some(token) = list.iter().find(|t| t.address == address) {
        return token.symbol.clone();
    }
    BUILTIN_SYMBOLS
        .get(address)
        .map(|s| s.to_string())
        .unwrap_or_else(|| "tokens".to_string())
}

fn default_logo() -> String {
    DEFAULT_LOGO_URI.to_string()
}

/// One entry of the token reference list.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct TokenDescriptor {
    pub address: String,
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "logoURI", default = "default_logo")]
    pub logo_uri: String,
}

/// Where the orchestrator gets its token list from. The production
/// implementation wraps the remote document; tests stub it out.
#[async_trait]
pub trait TokenDirectory: Send + Sync {
    async fn load(&self) -> Vec<TokenDescriptor>;
}

/// Token list backed by a remote JSON document.
pub struct RemoteTokenDirectory {
    client: Arc<ApiClient>,
    url: String,
}

impl RemoteTokenDirectory {
    pub fn new(client: Arc<ApiClient>, url: impl Into<String>) -> Self {
        Self { client, url: url.into() }
    }
}

#[async_trait]
impl TokenDirectory for RemoteTokenDirectory {
    async fn load(&self) -> Vec<TokenDescriptor> {
        match self.client.fetch_json(&self.url).await {
            Ok(document) => {
                let tokens = normalize_token_list(&document);
                info!("📋 [TOKENS] Fetched {} tokens", tokens.len());
                tokens
            }
            Err(e) => {
                warn!("📋 [TOKENS] Error fetching token list: {e:#}");
                Vec::new()
            }
        }
    }
}

/// Normalize the three shapes a token list document is known to arrive
/// in: a bare array, `{"tokens": [...]}`, or an arbitrary object whose
/// values look like descriptors. Anything else yields an empty list.
pub fn normalize_token_list(document: &Value) -> Vec<TokenDescriptor> {
    if let Some(entries) = document.as_array() {
        return descriptors_from(entries);
    }

    if let Some(entries) = document.get("tokens").and_then(Value::as_array) {
        return descriptors_from(entries);
    }

    if let Some(object) = document.as_object() {
        warn!("📋 [TOKENS] Unexpected token list format, scanning object values");
        let values: Vec<Value> = object.values().cloned().collect();
        return descriptors_from(&values);
    }

    warn!("📋 [TOKENS] Invalid token list document: {document}");
    Vec::new()
}

fn descriptors_from(entries: &[Value]) -> Vec<TokenDescriptor> {
    entries
        .iter()
        .filter(|entry| {
            entry.get("address").and_then(Value::as_str).is_some()
                && entry.get("symbol").and_then(Value::as_str).is_some()
        })
        .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_entry() -> Value {
        json!({
            "address": "1Token",
            "symbol": "AAA",
            "name": "Token A",
            "logoURI": "https://example.org/a.png"
        })
    }

    #[test]
    fn test_bare_array_shape() {
        let document = json!([sample_entry()]);
        let tokens = normalize_token_list(&document);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].address, "1Token");
        assert_eq!(tokens[0].symbol, "AAA");
    }

    #[test]
    fn test_tokens_object_shape() {
        let document = json!({ "tokens": [sample_entry()] });
        let tokens = normalize_token_list(&document);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].name, "Token A");
    }

    #[test]
    fn test_object_of_descriptors_shape() {
        let document = json!({
            "a": sample_entry(),
            "b": { "unrelated": true },
            "c": 42
        });
        let tokens = normalize_token_list(&document);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].symbol, "AAA");
    }

    #[test]
    fn test_unrecognized_shape_yields_empty() {
        assert!(normalize_token_list(&json!("just a string")).is_empty());
        assert!(normalize_token_list(&json!(17)).is_empty());
        assert!(normalize_token_list(&json!(null)).is_empty());
    }

    #[test]
    fn test_missing_logo_defaults() {
        let document = json!([{ "address": "1T", "symbol": "T" }]);
        let tokens = normalize_token_list(&document);
        assert_eq!(tokens[0].logo_uri, DEFAULT_LOGO_URI);
        assert!(tokens[0].name.is_empty());
    }

    #[test]
    fn test_symbol_lookup_falls_back() {
        let list = normalize_token_list(&json!([sample_entry()]));
        assert_eq!(symbol_for("1Token", &list), "AAA");
        assert_eq!(symbol_for(DEFAULT_NATIVE_TOKEN_ADDRESS, &list), "KOIN");
        assert_eq!(symbol_for("1Unknown", &list), "tokens");
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let document = json!({ "tokens": [sample_entry(), { "address": "1B", "symbol": "BBB" }] });
        let first = normalize_token_list(&document);
        let second = normalize_token_list(&document);
        assert_eq!(first, second);
    }
}
