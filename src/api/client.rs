//! REST client for the Koinos API and the price feed.
//!
//! All remote collaborators are plain HTTP JSON endpoints; callers get
//! `anyhow` errors and decide how far to degrade.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::debug;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;

use super::{BalanceSource, MarketDataSource};
use crate::config::Settings;
use crate::valuation::PoolInfo;

/// Probe timeout is deliberately shorter than the request timeout so an
/// offline check does not stall the whole scan.
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    price_api_url: String,
    native_asset_id: String,
}

impl ApiClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.request_timeout_ms))
            .build()
            .context("building HTTP client")?;

        Ok(Self {
            http,
            base_url: settings.api_base_url.clone(),
            price_api_url: settings.price_api_url.clone(),
            native_asset_id: settings.native_asset_id.clone(),
        })
    }

    /// Fetch an arbitrary JSON document (token lists live on URLs the
    /// user can override).
    pub async fn fetch_json(&self, url: &str) -> Result<Value> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("requesting {url}"))?
            .error_for_status()
            .with_context(|| format!("bad status from {url}"))?;
        response.json().await.with_context(|| format!("decoding {url}"))
    }

    /// Account resource ("mana") query.
    pub async fn fetch_mana(&self, address: &str) -> Result<String> {
        let url = format!("{}/v1/account/{address}/mana", self.base_url);
        let body = self.fetch_json(&url).await?;
        Ok(body["value"].as_str().unwrap_or("0").to_string())
    }
}

#[async_trait]
impl MarketDataSource for ApiClient {
    /// Native asset price in USD from the CoinGecko-shaped endpoint:
    /// `{ "<id>": { "usd": <number> } }`.
    async fn fetch_native_price(&self) -> Result<Decimal> {
        let url = format!(
            "{}?ids={}&vs_currencies=usd",
            self.price_api_url, self.native_asset_id
        );
        let body = self.fetch_json(&url).await?;
        let usd = body[&self.native_asset_id]["usd"]
            .as_f64()
            .ok_or_else(|| anyhow!("price response missing {}.usd", self.native_asset_id))?;
        Decimal::from_f64(usd).ok_or_else(|| anyhow!("unrepresentable price value {usd}"))
    }

    /// Liquidity pool listing used to derive native-per-token ratios.
    async fn fetch_pools(&self) -> Result<Vec<PoolInfo>> {
        let url = format!("{}/v1/pools", self.base_url);
        let body = self.fetch_json(&url).await?;
        serde_json::from_value(body).context("decoding pool listing")
    }
}

#[async_trait]
impl BalanceSource for ApiClient {
    async fn fetch_balance(&self, wallet: &str, token: &str) -> Result<String> {
        let url = format!("{}/v1/token/{token}/balance/{wallet}", self.base_url);
        let body = self.fetch_json(&url).await?;
        // A well-formed response without `value` means the account has
        // never touched the token.
        Ok(body["value"].as_str().unwrap_or("0").to_string())
    }

    async fn is_online(&self) -> bool {
        let reachable = self
            .http
            .get(&self.base_url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .is_ok();
        debug!("🌐 [API] Connectivity probe: {}", if reachable { "online" } else { "offline" });
        reachable
    }
}
