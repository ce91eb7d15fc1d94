//! Wallet capability interface.
//!
//! The tracker never signs anything; a connector only exposes the
//! account listing and the account-resource ("mana") query. Absence of
//! a usable connector is an `Option`, not a runtime property probe, and
//! readiness detection is a bounded retry instead of an open-ended
//! polling loop.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::warn;
use serde::Deserialize;

use crate::api::{ApiClient, BalanceSource};
use crate::utils::retry::{retry_with_backoff, RetryPolicy};

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct WalletAccount {
    pub address: String,
}

#[async_trait]
pub trait WalletConnector: Send + Sync {
    async fn get_accounts(&self) -> Result<Vec<WalletAccount>>;
    async fn get_mana(&self, address: &str) -> Result<String>;
}

/// Connector for the REST-polling variant: the account is whatever
/// address the user configured, mana comes from the public API.
pub struct RestWalletConnector {
    client: Arc<ApiClient>,
    address: String,
}

impl RestWalletConnector {
    pub fn new(client: Arc<ApiClient>, address: impl Into<String>) -> Self {
        Self { client, address: address.into() }
    }
}

#[async_trait]
impl WalletConnector for RestWalletConnector {
    async fn get_accounts(&self) -> Result<Vec<WalletAccount>> {
        if self.address.is_empty() {
            return Err(anyhow!("no wallet address configured"));
        }
        Ok(vec![WalletAccount { address: self.address.clone() }])
    }

    async fn get_mana(&self, address: &str) -> Result<String> {
        self.client.fetch_mana(address).await
    }
}

/// Probe for a usable connector with a bounded retry. `None` means the
/// wallet features stay disabled for the session; balance tracking
/// continues from cache regardless.
pub async fn detect_connector(
    client: Arc<ApiClient>,
    configured_address: &str,
    policy: RetryPolicy,
) -> Option<Arc<dyn WalletConnector>> {
    if configured_address.is_empty() {
        return None;
    }

    let probe = retry_with_backoff(
        policy,
        |_| {
            let client = Arc::clone(&client);
            async move {
                if client.is_online().await {
                    Ok(())
                } else {
                    Err(anyhow!("wallet API unreachable"))
                }
            }
        },
        |attempt, e: &anyhow::Error| {
            warn!("👛 [WALLET] Readiness attempt {attempt} failed: {e:#}");
        },
    )
    .await;

    match probe {
        Ok(()) => Some(Arc::new(RestWalletConnector::new(client, configured_address)) as _),
        Err(_) => {
            warn!("👛 [WALLET] Wallet features disabled, API never became reachable");
            None
        }
    }
}

/// Shorten an address for display: `123456...7890`. Valid addresses
/// are base58 and therefore ASCII; anything else passes through
/// unshortened rather than risking a slice inside a code point.
pub fn format_address(address: &str) -> String {
    if address.len() <= 10 || !address.is_ascii() {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    #[test]
    fn test_format_address() {
        assert_eq!(format_address("1DQzuCcTKacbs9GGScRTU1Hc8BsyARTPqe"), "1DQzuC...TPqe");
        assert_eq!(format_address("short"), "short");
        assert_eq!(format_address(""), "");
    }

    #[test]
    fn test_format_address_passes_non_ascii_through() {
        // Not a valid address; must not panic on a code point boundary.
        let junk = "日本語のアドレスではない";
        assert_eq!(format_address(junk), junk);
    }

    #[tokio::test]
    async fn test_rest_connector_lists_configured_account() {
        let client = Arc::new(ApiClient::new(&Settings::default()).unwrap());
        let connector = RestWalletConnector::new(client, "1Wallet");
        let accounts = connector.get_accounts().await.unwrap();
        assert_eq!(accounts, vec![WalletAccount { address: "1Wallet".to_string() }]);
    }

    #[tokio::test]
    async fn test_connector_without_address_errors() {
        let client = Arc::new(ApiClient::new(&Settings::default()).unwrap());
        let connector = RestWalletConnector::new(client, "");
        assert!(connector.get_accounts().await.is_err());
    }

    #[tokio::test]
    async fn test_detect_without_configured_address_is_none() {
        let client = Arc::new(ApiClient::new(&Settings::default()).unwrap());
        let connector = detect_connector(client, "", RetryPolicy::default()).await;
        assert!(connector.is_none());
    }
}
