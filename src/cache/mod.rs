pub mod freshness;
pub mod store;

pub use freshness::{should_refresh, should_refresh_token, CheckIntervals};
pub use store::CacheStore;

/// A balance counts as held only when it is present and not the zero
/// value. Empty strings come from defensive defaults upstream.
pub fn is_nonzero_balance(balance: &str) -> bool {
    !balance.is_empty() && balance != "0"
}
