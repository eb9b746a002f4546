//! Monitor Command
//!
//! Startup sequence, every step fatal on failure:
//! credentials → login → scrip master → watchlist.
//! Then breakout prices are loaded once and the live monitor runs until
//! Ctrl+C. Cycle reports are rendered by a separate task.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use itertools::Itertools;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use breakout_tracker::angel::{AngelClient, ClientConfig};
use breakout_tracker::config::{Config, Credentials};
use breakout_tracker::display::{Notifier, TerminalNotifier};
use breakout_tracker::error::LoadFailure;
use breakout_tracker::loader::BreakoutPriceLoader;
use breakout_tracker::monitor::{Clock, Monitor, MonitorEvent, StopReason, SystemClock};
use breakout_tracker::resolver::SymbolResolver;
use breakout_tracker::watchlist::{self, JsonFileWatchlist, WatchlistSource};
use breakout_tracker::Engine;

pub fn run(
    watchlist_path: String,
    config_path: Option<String>,
    interval: Option<u64>,
    cooldown: Option<u64>,
) -> Result<()> {
    dotenv::dotenv().ok();

    let mut config = super::load_config(config_path.as_deref())?;
    if let Some(secs) = interval {
        config.monitor.cycle_interval_secs = secs;
    }
    if let Some(secs) = cooldown {
        config.monitor.cooldown_secs = secs;
    }
    config.validate()?;

    let credentials = Credentials::from_env().context("Cannot log in to broker")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    runtime.block_on(run_async(config, credentials, watchlist_path))
}

async fn run_async(config: Config, credentials: Credentials, watchlist_path: String) -> Result<()> {
    info!("═══════════════════════════════════════════════");
    info!("  BREAKOUT TRACKER");
    info!("  Exchange: {}", config.broker.exchange);
    info!("  Watchlist: {}", watchlist_path);
    info!("  Cycle: {}s  Cooldown: {}s  History: {} cycles",
        config.monitor.cycle_interval_secs,
        config.monitor.cooldown_secs,
        config.monitor.history_len
    );
    info!("═══════════════════════════════════════════════");

    let mut client = AngelClient::with_config(
        credentials.api_key.clone(),
        ClientConfig::from_broker(&config.broker),
    )?;
    client
        .login(&credentials, Utc::now().timestamp() as u64)
        .await
        .context("Login failed")?;

    let records = client
        .fetch_scrip_master()
        .await
        .context("Failed to fetch scrip master; symbols cannot be resolved")?;
    let resolver = SymbolResolver::from_records(&records, &config.broker.exchange);
    if resolver.is_empty() {
        bail!("Scrip master has no {} instruments", config.broker.exchange);
    }
    info!("✅ Loaded {} {} tokens", resolver.len(), config.broker.exchange);

    let entries = JsonFileWatchlist::new(&watchlist_path).entries()?;
    let built = watchlist::build(&entries, &resolver);
    if built.items.is_empty() {
        bail!(
            "No symbols loaded from {} ({} entries, {} skipped)",
            watchlist_path,
            entries.len(),
            built.warnings.len()
        );
    }
    info!(
        "✅ Loaded {} symbols from file ({} skipped)",
        built.items.len(),
        built.warnings.len()
    );

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, initiating shutdown...");
                signal_token.cancel();
            }
            Err(e) => {
                error!("Error setting up signal handler: {}", e);
            }
        }
    });

    let clock = SystemClock::new(config.session.offset()?);
    let loader = BreakoutPriceLoader::from_config(&config)?;
    let source = Arc::new(client);

    let mut engine = Engine::from_config(&config);
    engine.replace_watchlist(built.items);

    info!("💥 Loading breakout prices...");
    if let Some(report) = engine
        .load_reference_prices(&loader, source.as_ref(), clock.now(), &cancel)
        .await
    {
        if report.cancelled {
            info!("Shutdown during price loading");
            return Ok(());
        }
        info!(
            "Breakout prices: {} loaded, {} failed",
            report.loaded.len(),
            report.failures.len()
        );
        if report.loaded.is_empty() {
            warn!("No breakout prices available; every symbol stays pending");
        } else if !report.failures.is_empty() {
            warn!(
                "Pending without a breakout price: {}",
                report.failures.iter().map(LoadFailure::symbol).join(", ")
            );
        }
    }

    let (tx, mut rx) = mpsc::channel::<MonitorEvent>(16);
    let renderer = tokio::spawn(async move {
        let mut notifier = TerminalNotifier::stdout();
        while let Some(event) = rx.recv().await {
            match event {
                MonitorEvent::Cycle(report) => {
                    if let Err(e) = notifier.show(&report) {
                        warn!("Failed to render cycle {}: {}", report.cycle, e);
                    }
                }
                MonitorEvent::Stopped { reason, .. } => return Some(reason),
            }
        }
        None
    });

    let monitor = Monitor::new(engine, source, Arc::new(clock), config.monitor.cycle_interval());
    let engine = monitor.run(tx, cancel).await;
    let reason = renderer.await.context("Renderer task failed")?;

    info!(
        "Monitoring ended after {} cycles, {} symbols alerted at least once",
        engine.cycles_run(),
        engine.items().iter().filter(|i| i.last_match.is_some()).count()
    );
    if let Some(StopReason::SessionExpired { loaded_for, today }) = reason {
        bail!(
            "Breakout prices were loaded for {} and cannot be used on {}; restart with today's watchlist",
            loaded_for,
            today
        );
    }
    Ok(())
}
