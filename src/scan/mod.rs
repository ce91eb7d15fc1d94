//! Balance refresh sweep.
//!
//! One scan walks the whole token reference list for a single wallet:
//! cached holdings are reported immediately, stale entries are
//! re-checked sequentially against the API, and the result is a working
//! set sorted by USD value.

pub mod orchestrator;

pub use orchestrator::RefreshOrchestrator;

use rust_decimal::Decimal;

use crate::tokens::TokenDescriptor;

/// Phases a scan moves through, in order. `LoadingTokenList` is skipped
/// when a list is already on hand, `Scanning` when offline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanPhase {
    Init,
    LoadingTokenList,
    DisplayingCached,
    Scanning,
    Done,
}

/// One row of the working set: a token the wallet holds.
#[derive(Clone, Debug)]
pub struct TokenRow {
    pub token: TokenDescriptor,
    pub balance: String,
    /// `None` means unvaluable, not zero.
    pub usd_value: Option<Decimal>,
    /// Still the optimistic pre-scan value, not yet re-checked.
    pub from_cache: bool,
}

#[derive(Clone, Debug)]
pub struct ScanReport {
    /// Working set sorted by descending USD value.
    pub rows: Vec<TokenRow>,
    /// Tokens actually re-checked over the network.
    pub checked: usize,
    pub total_tokens: usize,
    pub offline: bool,
    pub finished_at: i64,
}

/// Progress feed for whatever is rendering the scan.
#[derive(Clone, Debug)]
pub enum ScanEvent {
    PhaseChanged(ScanPhase),
    /// Optimistic display of a stale-but-present holding.
    CachedBalance(TokenRow),
    Checking { current: usize, total: usize, symbol: String, name: String },
    BalanceUpdated(TokenRow),
    /// Individual fetch failure; the sweep continues.
    CheckFailed { symbol: String, error: String },
    Completed(ScanReport),
}
