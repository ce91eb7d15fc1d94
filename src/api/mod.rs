pub mod client;

pub use client::ApiClient;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::valuation::PoolInfo;

/// Capability seam for the per-token balance query. The orchestrator
/// only ever talks to this trait; tests drive it with canned sources.
#[async_trait]
pub trait BalanceSource: Send + Sync {
    /// Raw string-encoded balance of `token` held by `wallet`.
    async fn fetch_balance(&self, wallet: &str, token: &str) -> anyhow::Result<String>;

    /// Cheap reachability probe consulted once at scan start.
    async fn is_online(&self) -> bool {
        true
    }
}

/// Capability seam for market data: the native asset's USD price and
/// the liquidity pool listing the valuation ratios come from.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn fetch_native_price(&self) -> anyhow::Result<Decimal>;

    async fn fetch_pools(&self) -> anyhow::Result<Vec<PoolInfo>>;
}
