//! Refresh orchestrator: drives one sequential sweep over the token
//! list, consulting the freshness policy per token and updating the
//! cache as balances come back.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use chrono::Utc;
use log::{info, warn};
use tokio::sync::Mutex;
use tokio::time::sleep;

use super::{ScanEvent, ScanPhase, ScanReport, TokenRow};
use crate::api::BalanceSource;
use crate::cache::freshness::should_refresh_token;
use crate::cache::{is_nonzero_balance, CacheStore, CheckIntervals};
use crate::tokens::{TokenDescriptor, TokenDirectory};
use crate::valuation::Valuer;

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

pub struct RefreshOrchestrator {
    source: Arc<dyn BalanceSource>,
    directory: Arc<dyn TokenDirectory>,
    intervals: CheckIntervals,
    scan_delay: Duration,
    // At most one sweep per session; re-entrant triggers are rejected
    // instead of racing the cache.
    scan_lock: Mutex<()>,
}

impl RefreshOrchestrator {
    pub fn new(
        source: Arc<dyn BalanceSource>,
        directory: Arc<dyn TokenDirectory>,
        intervals: CheckIntervals,
        scan_delay: Duration,
    ) -> Self {
        Self { source, directory, intervals, scan_delay, scan_lock: Mutex::new(()) }
    }

    /// Run one sweep for `wallet`. `tokens` is the current reference
    /// list; when empty it is (re)loaded wholesale first. Individual
    /// fetch failures never abort the sweep.
    pub async fn run(
        &self,
        wallet: &str,
        mut tokens: Vec<TokenDescriptor>,
        cache: &mut CacheStore,
        valuer: &Valuer,
        emit: &mut (dyn FnMut(ScanEvent) + Send),
    ) -> Result<ScanReport> {
        let _guard = match self.scan_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => bail!("a scan is already running for this session"),
        };

        emit(ScanEvent::PhaseChanged(ScanPhase::Init));

        if tokens.is_empty() {
            emit(ScanEvent::PhaseChanged(ScanPhase::LoadingTokenList));
            tokens = self.directory.load().await;
        }

        /* -------- optimistic pass over cached holdings ------------ */
        emit(ScanEvent::PhaseChanged(ScanPhase::DisplayingCached));
        let mut rows: Vec<TokenRow> = Vec::new();
        for token in &tokens {
            if let Some(balance) = cache.balance(wallet, &token.address) {
                if is_nonzero_balance(balance) {
                    let row = TokenRow {
                        token: token.clone(),
                        balance: balance.to_string(),
                        usd_value: valuer.usd_value(balance, &token.address),
                        from_cache: true,
                    };
                    emit(ScanEvent::CachedBalance(row.clone()));
                    rows.push(row);
                }
            }
        }
        info!("🔎 [SCAN] Loaded {} holdings from cache", rows.len());

        /* -------- network sweep ----------------------------------- */
        let offline = !self.source.is_online().await;
        let mut checked = 0usize;

        if offline {
            info!("🔎 [SCAN] Offline, serving cached data only");
        } else {
            emit(ScanEvent::PhaseChanged(ScanPhase::Scanning));
            let now = now_ms();
            let due: Vec<TokenDescriptor> = tokens
                .iter()
                .filter(|t| should_refresh_token(cache, wallet, &t.address, now, self.intervals))
                .cloned()
                .collect();
            info!("🔎 [SCAN] {} of {} tokens due for re-check", due.len(), tokens.len());

            for (i, token) in due.iter().enumerate() {
                emit(ScanEvent::Checking {
                    current: i + 1,
                    total: due.len(),
                    symbol: token.symbol.clone(),
                    name: token.name.clone(),
                });

                match self.source.fetch_balance(wallet, &token.address).await {
                    Ok(balance) => {
                        // Zero balances are persisted too; a confirmed
                        // zero resets the freshness clock.
                        cache.save_balance(wallet, &token.address, &balance, now_ms());
                        checked += 1;

                        if is_nonzero_balance(&balance) {
                            let row = TokenRow {
                                token: token.clone(),
                                balance: balance.clone(),
                                usd_value: valuer.usd_value(&balance, &token.address),
                                from_cache: false,
                            };
                            match rows.iter_mut().find(|r| r.token.address == token.address) {
                                Some(existing) => *existing = row.clone(),
                                None => rows.push(row.clone()),
                            }
                            emit(ScanEvent::BalanceUpdated(row));
                        }
                    }
                    Err(e) => {
                        // Treated as zero for this iteration only; the
                        // failure is not written back, so a transient
                        // outage cannot masquerade as a confirmed zero.
                        warn!("🔎 [SCAN] Error checking balance for {}: {e:#}", token.symbol);
                        emit(ScanEvent::CheckFailed {
                            symbol: token.symbol.clone(),
                            error: format!("{e:#}"),
                        });
                    }
                }

                if i + 1 < due.len() {
                    sleep(self.scan_delay).await;
                }
            }
        }

        /* -------- final ordering ---------------------------------- */
        rows.sort_by(|a, b| {
            b.usd_value
                .unwrap_or_default()
                .cmp(&a.usd_value.unwrap_or_default())
        });

        emit(ScanEvent::PhaseChanged(ScanPhase::Done));
        let report = ScanReport {
            rows,
            checked,
            total_tokens: tokens.len(),
            offline,
            finished_at: now_ms(),
        };
        emit(ScanEvent::Completed(report.clone()));
        Ok(report)
    }
}
