//! Validate command - resolve a watchlist against the scrip master
//!
//! Needs no credentials: the scrip master is public.

use anyhow::{Context, Result};
use tracing::{info, warn};

use breakout_tracker::angel::{AngelClient, ClientConfig};
use breakout_tracker::resolver::SymbolResolver;
use breakout_tracker::watchlist::{self, JsonFileWatchlist, WatchlistSource};

pub fn run(watchlist_path: String, config_path: Option<String>) -> Result<()> {
    let config = super::load_config(config_path.as_deref())?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to build tokio runtime")?;
    runtime.block_on(async {
        let client = AngelClient::with_config("", ClientConfig::from_broker(&config.broker))?;
        let records = client
            .fetch_scrip_master()
            .await
            .context("Failed to fetch scrip master")?;
        let resolver = SymbolResolver::from_records(&records, &config.broker.exchange);
        info!("✅ Loaded {} {} tokens", resolver.len(), config.broker.exchange);

        let entries = JsonFileWatchlist::new(&watchlist_path).entries()?;
        let built = watchlist::build(&entries, &resolver);

        println!("\n{}", "=".repeat(60));
        println!("WATCHLIST {}", watchlist_path);
        println!("{}", "=".repeat(60));
        for item in &built.items {
            println!(
                "  {} {:<12} token={:<8} breakout={}",
                item.direction.glyph(),
                item.symbol,
                item.token,
                item.breakout_time.format("%I:%M %p")
            );
        }
        println!("{}", "-".repeat(60));
        println!(
            "  {} of {} entries usable, {} skipped",
            built.items.len(),
            entries.len(),
            built.warnings.len()
        );
        for warning in &built.warnings {
            println!("  ⚠️  {}", warning);
        }
        println!("{}\n", "=".repeat(60));

        if built.items.is_empty() {
            warn!("No usable entries in {}", watchlist_path);
        }
        Ok::<(), anyhow::Error>(())
    })
}
