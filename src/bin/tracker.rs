//! Koinos wallet balance tracker.
//!
//! Composes the cache, API client, valuation and scan services and runs
//! a one-shot sweep or a continuous watch loop, reporting progress on
//! the console.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use clap::Parser;
use log::warn;
use rust_decimal::Decimal;

use koinos_tracker::api::{ApiClient, BalanceSource};
use koinos_tracker::cache::{should_refresh_token, CacheStore, CheckIntervals};
use koinos_tracker::config::Settings;
use koinos_tracker::scan::{RefreshOrchestrator, ScanEvent, ScanPhase, ScanReport};
use koinos_tracker::tokens::{symbol_for, RemoteTokenDirectory, TokenDirectory};
use koinos_tracker::utils::format::format_grouped;
use koinos_tracker::utils::retry::RetryPolicy;
use koinos_tracker::valuation::{ensure_market_data, Valuer};
use koinos_tracker::wallet::{detect_connector, format_address};

#[derive(Debug, Parser)]
#[command(name = "tracker", about = "Koinos wallet balance tracker")]
struct Cli {
    /// Settings file
    #[arg(long, default_value = "config/settings.json")]
    config: String,

    /// Wallet address to track (overrides the settings file)
    #[arg(long)]
    wallet: Option<String>,

    /// Keep re-scanning on the configured watch interval
    #[arg(long)]
    watch: bool,

    /// Serve cached data only, never touch the network
    #[arg(long)]
    offline: bool,

    /// Also query and print the account's mana
    #[arg(long)]
    mana: bool,

    /// Check a single token contract instead of sweeping the whole list
    #[arg(long)]
    token: Option<String>,
}

/// Wrapper that pins the connectivity probe to offline; the scan then
/// serves cached data without attempting any fetch.
struct ForcedOffline(Arc<ApiClient>);

#[async_trait]
impl BalanceSource for ForcedOffline {
    async fn fetch_balance(&self, wallet: &str, token: &str) -> Result<String> {
        self.0.fetch_balance(wallet, token).await
    }

    async fn is_online(&self) -> bool {
        false
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut settings = Settings::load_or_default(&cli.config);
    if let Some(wallet) = cli.wallet.clone() {
        settings.wallet_address = wallet;
    }
    if settings.wallet_address.is_empty() {
        bail!("no wallet address configured; pass --wallet or set wallet_address in settings");
    }

    let mut cache = CacheStore::load(&settings.cache_file);
    // A different token list invalidates everything cached against the
    // old one.
    cache.set_token_list_url(&settings.token_list_url);

    let client = Arc::new(ApiClient::new(&settings)?);
    let source: Arc<dyn BalanceSource> = if cli.offline {
        Arc::new(ForcedOffline(Arc::clone(&client)))
    } else {
        Arc::clone(&client) as _
    };
    let directory = Arc::new(RemoteTokenDirectory::new(
        Arc::clone(&client),
        settings.token_list_url.clone(),
    ));
    let intervals = CheckIntervals {
        short_ms: settings.short_check_interval_ms,
        long_ms: settings.long_check_interval_ms,
    };

    if let Some(token) = &cli.token {
        return check_single(&*source, &*directory, &mut cache, &settings, token, intervals)
            .await;
    }

    let orchestrator = RefreshOrchestrator::new(
        source,
        directory,
        intervals,
        Duration::from_millis(settings.scan_delay_ms),
    );

    let connector = if cli.mana && !cli.offline {
        let policy = RetryPolicy { max_attempts: 3, ..Default::default() };
        detect_connector(Arc::clone(&client), &settings.wallet_address, policy).await
    } else {
        None
    };
    if cli.mana && connector.is_none() {
        warn!("👛 [WALLET] Mana display disabled for this session");
    }

    println!(
        "👛 Tracking wallet {} ({})",
        format_address(&settings.wallet_address),
        settings.wallet_address
    );

    loop {
        if !cli.offline {
            let now = Utc::now().timestamp_millis();
            if let Err(e) = ensure_market_data(&*client, &mut cache, &settings, now).await {
                warn!("💱 [MARKET] Error refreshing market data: {e:#}");
            }
        }

        let valuer = Valuer::new(&settings.native_token_address, cache.price(), cache.pools());
        let report = orchestrator
            .run(
                &settings.wallet_address,
                Vec::new(),
                &mut cache,
                &valuer,
                &mut print_event,
            )
            .await?;
        print_report(&report, &settings);

        if let Some(connector) = &connector {
            match connector.get_mana(&settings.wallet_address).await {
                Ok(mana) => println!("⚡ Mana: {}", format_grouped(&mana)),
                Err(e) => warn!("👛 [WALLET] Error fetching mana: {e:#}"),
            }
        }

        if !cli.watch {
            break;
        }
        tokio::time::sleep(Duration::from_secs(settings.watch_interval_secs)).await;
    }

    Ok(())
}

/// One-token variant of the sweep: serve the cached balance while it is
/// fresh, otherwise fetch and persist a new reading.
async fn check_single(
    source: &dyn BalanceSource,
    directory: &dyn TokenDirectory,
    cache: &mut CacheStore,
    settings: &Settings,
    token: &str,
    intervals: CheckIntervals,
) -> Result<()> {
    let wallet = &settings.wallet_address;
    let list = directory.load().await;
    let symbol = symbol_for(token, &list);
    let now = Utc::now().timestamp_millis();

    if !should_refresh_token(cache, wallet, token, now, intervals) {
        println!("💾 {} {} (cached)", cache.balance(wallet, token).unwrap_or("0"), symbol);
        return Ok(());
    }
    if !source.is_online().await {
        println!("📴 {} {} (cached, offline)", cache.balance(wallet, token).unwrap_or("0"), symbol);
        return Ok(());
    }

    let balance = source.fetch_balance(wallet, token).await?;
    cache.save_balance(wallet, token, &balance, now);
    println!("✅ {balance} {symbol}");
    Ok(())
}

fn print_event(event: ScanEvent) {
    match event {
        ScanEvent::PhaseChanged(ScanPhase::LoadingTokenList) => {
            println!("📋 Loading token list...");
        }
        ScanEvent::CachedBalance(row) => {
            println!("💾 {} {} (cached)", row.balance, row.token.symbol);
        }
        ScanEvent::Checking { current, total, symbol, name } => {
            println!("🔎 Token check {current}/{total}: {symbol} ({name})");
        }
        ScanEvent::BalanceUpdated(row) => match row.usd_value {
            Some(usd) => println!("✅ {} {} (${usd})", row.balance, row.token.symbol),
            None => println!("✅ {} {}", row.balance, row.token.symbol),
        },
        ScanEvent::CheckFailed { symbol, error } => {
            println!("⚠️ Skipping {symbol}: {error}");
        }
        _ => {}
    }
}

fn print_report(report: &ScanReport, settings: &Settings) {
    println!("{}", "=".repeat(60));
    if report.rows.is_empty() {
        println!("No tokens found for this wallet");
    } else {
        for (i, row) in report.rows.iter().enumerate() {
            let value = row
                .usd_value
                .map(|v| format!("${v}"))
                .unwrap_or_default();
            let cached = if row.from_cache { " (cached)" } else { "" };
            println!(
                "{}. {} {} {}{}",
                i + 1,
                row.balance,
                row.token.symbol,
                value,
                cached
            );
        }
        let total: Decimal = report.rows.iter().filter_map(|r| r.usd_value).sum();
        println!("{}", "-".repeat(60));
        println!("➤ Holdings: {} • Checked: {}/{}", report.rows.len(), report.checked, report.total_tokens);
        println!("➤ Estimated value: ${}", total.round_dp(2));
    }
    if report.offline {
        println!("📴 Offline: using cached data only");
    } else {
        println!(
            "Refresh intervals: {}s (known tokens), {}s (new tokens)",
            settings.short_check_interval_ms / 1_000,
            settings.long_check_interval_ms / 1_000
        );
    }
    println!("{}", "=".repeat(60));
}
