//! USD valuation of raw balances.
//!
//! The native asset is priced directly in USD; every other token is
//! valued transitively through its liquidity-pool ratio against the
//! native asset. A token with no pool and no price is *unvaluable*,
//! which is distinct from a known zero value.

use std::collections::HashMap;

use anyhow::Result;
use dashmap::DashMap;
use log::warn;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::api::MarketDataSource;
use crate::cache::CacheStore;
use crate::config::Settings;
use crate::tokens::TokenDescriptor;

/// Native asset USD price at a point in time.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct PriceSnapshot {
    pub value: Decimal,
    pub fetched_at: i64,
}

/// Native-per-token exchange ratio derived from a liquidity pool.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct PoolRatio {
    pub native_per_token: Decimal,
    pub fetched_at: i64,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct PoolRatioSnapshot {
    #[serde(default)]
    pub ratios: HashMap<String, PoolRatio>,
    #[serde(default)]
    pub fetched_at: i64,
}

/// One entry of the remote pool listing.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PoolInfo {
    pub token0: TokenDescriptor,
    pub token1: TokenDescriptor,
    pub reserves0: String,
    pub reserves1: String,
}

/// Derive native-per-token ratios from a pool listing. Pools that do
/// not pair against the native asset, or whose reserves are missing,
/// non-numeric, or zero on the token side, are skipped.
pub fn pool_ratios_from_listing(
    pools: &[PoolInfo],
    native_address: &str,
    now_ms: i64,
) -> PoolRatioSnapshot {
    let mut ratios = HashMap::new();

    for pool in pools {
        let oriented = if pool.token0.address == native_address {
            Some((&pool.token1.address, &pool.reserves0, &pool.reserves1))
        } else if pool.token1.address == native_address {
            Some((&pool.token0.address, &pool.reserves1, &pool.reserves0))
        } else {
            None
        };

        let (token, native_reserve, token_reserve) = match oriented {
            Some(parts) => parts,
            None => continue,
        };

        let native_reserve: Decimal = match native_reserve.trim().parse() {
            Ok(v) => v,
            Err(_) => continue,
        };
        let token_reserve: Decimal = match token_reserve.trim().parse() {
            Ok(v) => v,
            Err(_) => continue,
        };
        if token_reserve.is_zero() {
            continue;
        }

        ratios.insert(
            token.clone(),
            PoolRatio {
                native_per_token: native_reserve / token_reserve,
                fetched_at: now_ms,
            },
        );
    }

    PoolRatioSnapshot { ratios, fetched_at: now_ms }
}

/// Converts raw balances into USD estimates from cached market data.
/// Per-token unit prices are memoized for the session.
pub struct Valuer {
    native_token_address: String,
    native_usd: Option<Decimal>,
    ratios: HashMap<String, Decimal>,
    unit_prices: DashMap<String, Option<Decimal>>,
}

impl Valuer {
    pub fn new(
        native_token_address: impl Into<String>,
        price: Option<&PriceSnapshot>,
        pools: Option<&PoolRatioSnapshot>,
    ) -> Self {
        let ratios = pools
            .map(|snapshot| {
                snapshot
                    .ratios
                    .iter()
                    .map(|(token, ratio)| (token.clone(), ratio.native_per_token))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            native_token_address: native_token_address.into(),
            native_usd: price.map(|p| p.value),
            ratios,
            unit_prices: DashMap::new(),
        }
    }

    /// USD price of one token unit, `None` when unvaluable.
    pub fn unit_price(&self, token_address: &str) -> Option<Decimal> {
        if let Some(cached) = self.unit_prices.get(token_address) {
            return *cached;
        }
        let computed = self.compute_unit_price(token_address);
        self.unit_prices.insert(token_address.to_string(), computed);
        computed
    }

    fn compute_unit_price(&self, token_address: &str) -> Option<Decimal> {
        let native_usd = self.native_usd?;
        if token_address == self.native_token_address {
            return Some(native_usd);
        }
        let ratio = self.ratios.get(token_address)?;
        Some(ratio * native_usd)
    }

    /// USD estimate for a raw balance, rounded to cents. Non-numeric
    /// balances and missing market data yield `None` rather than an
    /// error: an unvaluable holding is rendered blank, not zero.
    pub fn usd_value(&self, balance: &str, token_address: &str) -> Option<Decimal> {
        let amount: Decimal = balance.trim().parse().ok()?;
        let unit = self.unit_price(token_address)?;
        Some((amount * unit).round_dp(2))
    }
}

/// Refresh the price and pool snapshots through the market source when
/// they have outlived their TTLs. Fetch failures keep the previous
/// snapshot; the valuation layer degrades to stale or missing data.
pub async fn ensure_market_data(
    market: &dyn MarketDataSource,
    cache: &mut CacheStore,
    settings: &Settings,
    now_ms: i64,
) -> Result<()> {
    let price_stale = cache
        .price()
        .map(|p| now_ms - p.fetched_at > settings.price_ttl_secs * 1_000)
        .unwrap_or(true);
    if price_stale {
        match market.fetch_native_price().await {
            Ok(value) => cache.save_price(PriceSnapshot { value, fetched_at: now_ms }),
            Err(e) => warn!("💱 [PRICE] Error fetching native price: {e:#}"),
        }
    }

    let pools_stale = cache
        .pools()
        .map(|p| now_ms - p.fetched_at > settings.pools_ttl_secs * 1_000)
        .unwrap_or(true);
    if pools_stale {
        match market.fetch_pools().await {
            Ok(pools) => {
                let snapshot =
                    pool_ratios_from_listing(&pools, &settings.native_token_address, now_ms);
                cache.save_pools(snapshot);
            }
            Err(e) => warn!("💱 [POOLS] Error fetching pool listing: {e:#}"),
        }
    }

    Ok(())
}
