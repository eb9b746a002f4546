//! Breakout match engine
//!
//! Owns the watchlist, the per-symbol cooldown map and the alert history.
//! One call to [`Engine::run_cycle`] is one monitor cycle: every item is
//! priced and evaluated in watchlist order, then the cycle's alerts are
//! pushed to the history.
//!
//! Match rule: the integer parts of the reference and current prices are
//! equal (`floor(reference) == floor(current)`).

use chrono::{DateTime, Duration, FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::display::DisplayRow;
use crate::error::MarketDataError;
use crate::history::{AlertHistory, AlertSet, HistoryTable};
use crate::loader::{BreakoutPriceLoader, LoadReport};
use crate::market_data::MarketData;
use crate::types::{Symbol, WatchItem};

/// Whether `current` touches `reference` under the truncation rule.
pub fn touches(reference: Decimal, current: Decimal) -> bool {
    reference.floor() == current.floor()
}

/// True when no alert has fired yet or at least `cooldown` has passed.
pub fn cooldown_elapsed(
    last_alert: Option<DateTime<FixedOffset>>,
    now: DateTime<FixedOffset>,
    cooldown: Duration,
) -> bool {
    match last_alert {
        None => true,
        Some(last) => now - last >= cooldown,
    }
}

/// Everything produced by one monitor cycle
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle: u64,
    pub at: DateTime<FixedOffset>,
    pub rows: Vec<DisplayRow>,
    /// Symbols that raised a new alert this cycle
    pub alerts: AlertSet,
    pub history: HistoryTable,
    /// Items whose price could not be fetched this cycle
    pub failures: Vec<(Symbol, MarketDataError)>,
    /// Set when the reference prices belong to an earlier day; nothing
    /// was evaluated this cycle.
    pub expired_session: Option<NaiveDate>,
}

impl CycleReport {
    /// A new alert fired; the notification surface should cue the user.
    pub fn notify(&self) -> bool {
        !self.alerts.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Engine {
    exchange: String,
    cooldown: Duration,
    items: Vec<WatchItem>,
    prices_loaded: bool,
    session_date: Option<NaiveDate>,
    last_alerts: HashMap<Symbol, DateTime<FixedOffset>>,
    history: AlertHistory,
    cycle: u64,
}

impl Engine {
    pub fn new(exchange: impl Into<String>, cooldown: Duration, history_len: usize) -> Self {
        Self {
            exchange: exchange.into(),
            cooldown,
            items: Vec::new(),
            prices_loaded: false,
            session_date: None,
            last_alerts: HashMap::new(),
            history: AlertHistory::new(history_len),
            cycle: 0,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.broker.exchange.clone(),
            config.monitor.cooldown(),
            config.monitor.history_len,
        )
    }

    /// Install a new watchlist. Reference prices must be loaded again;
    /// cooldowns and alert history carry over.
    pub fn replace_watchlist(&mut self, items: Vec<WatchItem>) {
        info!("Watchlist replaced: {} symbols", items.len());
        self.items = items;
        self.prices_loaded = false;
        self.session_date = None;
    }

    pub fn items(&self) -> &[WatchItem] {
        &self.items
    }

    pub fn item(&self, symbol: &Symbol) -> Option<&WatchItem> {
        self.items.iter().find(|i| &i.symbol == symbol)
    }

    pub fn history(&self) -> &AlertHistory {
        &self.history
    }

    pub fn last_alert(&self, symbol: &Symbol) -> Option<DateTime<FixedOffset>> {
        self.last_alerts.get(symbol).copied()
    }

    pub fn cycles_run(&self) -> u64 {
        self.cycle
    }

    pub fn prices_loaded(&self) -> bool {
        self.prices_loaded
    }

    /// Trading day the reference prices were taken from
    pub fn session_date(&self) -> Option<NaiveDate> {
        self.session_date
    }

    /// Runs the loader once per installed watchlist. Returns `None` when
    /// prices were already loaded. A cancelled pass does not count.
    pub async fn load_reference_prices(
        &mut self,
        loader: &BreakoutPriceLoader,
        source: &dyn MarketData,
        now: DateTime<FixedOffset>,
        cancel: &CancellationToken,
    ) -> Option<LoadReport> {
        if self.prices_loaded {
            return None;
        }
        let report = loader.load(&mut self.items, source, now, cancel).await;
        self.prices_loaded = !report.cancelled;
        if self.prices_loaded {
            self.session_date = Some(now.date_naive());
        }
        Some(report)
    }

    /// Fetch every item's price in order and evaluate the cycle.
    /// Returns `None` if cancelled before all items were fetched; a partial
    /// cycle leaves history and cooldowns untouched.
    pub async fn run_cycle(
        &mut self,
        source: &dyn MarketData,
        now: DateTime<FixedOffset>,
        cancel: &CancellationToken,
    ) -> Option<CycleReport> {
        let mut observations = Vec::with_capacity(self.items.len());

        for item in &self.items {
            if cancel.is_cancelled() {
                debug!("Cycle {} cancelled mid-fetch", self.cycle + 1);
                return None;
            }
            let price = source.last_price(&self.exchange, &item.symbol, &item.token).await;
            if let Err(e) = &price {
                warn!("No LTP for {}: {}", item.symbol, e);
            }
            observations.push(price);
        }

        Some(self.evaluate(observations, now))
    }

    /// Apply one cycle of price observations, one per item in watchlist
    /// order. Items with no observation count as "no data".
    ///
    /// The first cycle pins the session day if no prices were loaded
    /// through the engine. Once the day changes nothing is matched.
    pub fn evaluate(
        &mut self,
        observations: Vec<Result<Decimal, MarketDataError>>,
        now: DateTime<FixedOffset>,
    ) -> CycleReport {
        self.cycle += 1;
        let session_date = *self.session_date.get_or_insert(now.date_naive());
        let expired_session = (session_date != now.date_naive()).then_some(session_date);
        if let Some(day) = expired_session {
            warn!(
                "Breakout prices are from {}, not {}; matching suspended",
                day,
                now.date_naive()
            );
        }
        let mut observations = observations.into_iter();
        let mut rows = Vec::with_capacity(self.items.len());
        let mut alerts = AlertSet::new();
        let mut failures = Vec::new();

        for item in self.items.iter_mut() {
            let observation = observations.next().unwrap_or(Err(MarketDataError::Empty));
            item.last_price = match observation {
                Ok(price) => Some(price),
                Err(e) => {
                    failures.push((item.symbol.clone(), e));
                    None
                }
            };

            let (reference, current) = match (item.reference_price(), item.last_price) {
                (Some(r), Some(c)) if expired_session.is_none() => (r, c),
                _ => {
                    rows.push(DisplayRow::from_item(item, false, false));
                    continue;
                }
            };

            let matched = touches(reference, current);
            let last_alert = self.last_alerts.get(&item.symbol).copied();
            let fire = matched && cooldown_elapsed(last_alert, now, self.cooldown);

            if fire {
                item.last_match = Some(now);
                self.last_alerts.insert(item.symbol.clone(), now);
                alerts.push(item.symbol.clone());
                info!(
                    "🔔 {} touched breakout ₹{:.2} at ₹{:.2}",
                    item.symbol, reference, current
                );
            } else if matched {
                debug!("{} still at breakout level, alert suppressed", item.symbol);
            } else {
                debug!("{} ₹{:.2} vs breakout ₹{:.2}", item.symbol, current, reference);
            }

            rows.push(DisplayRow::from_item(item, matched, fire));
        }

        self.history.push(alerts.clone());

        CycleReport {
            cycle: self.cycle,
            at: now,
            rows,
            alerts,
            history: self.history.render(),
            failures,
            expired_session,
        }
    }
}
