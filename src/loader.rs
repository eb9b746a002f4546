//! Breakout price loader
//!
//! For every watch item, fetches today's minute candles and takes the high
//! (bullish) or low (bearish) of the candle at the breakout minute as the
//! item's reference price. Lookups are paced; failures stay per item.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Timelike};
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::common::{Pacer, PacerConfig};
use crate::config::Config;
use crate::error::{ConfigError, LoadFailure};
use crate::market_data::MarketData;
use crate::types::{Candle, Symbol, WatchItem};

/// Outcome of one load pass
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub loaded: Vec<(Symbol, Decimal)>,
    pub failures: Vec<LoadFailure>,
    /// Set when cancellation stopped the pass early
    pub cancelled: bool,
}

#[derive(Debug, Clone)]
pub struct BreakoutPriceLoader {
    pacer: Pacer,
    interval: String,
    session_open: NaiveTime,
    session_close: NaiveTime,
}

impl BreakoutPriceLoader {
    pub fn new(pacer: Pacer, interval: impl Into<String>, session_open: NaiveTime, session_close: NaiveTime) -> Self {
        Self {
            pacer,
            interval: interval.into(),
            session_open,
            session_close,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let pacer = Pacer::new(PacerConfig::default().with_spacing(config.monitor.candle_pacing()));
        Ok(Self::new(
            pacer,
            config.broker.candle_interval.clone(),
            config.session.open_time()?,
            config.session.close_time()?,
        ))
    }

    /// Loads reference prices for items that have none yet, in order.
    pub async fn load(
        &self,
        items: &mut [WatchItem],
        source: &dyn MarketData,
        now: DateTime<FixedOffset>,
        cancel: &CancellationToken,
    ) -> LoadReport {
        let mut report = LoadReport::default();
        let pending = items.iter().filter(|i| i.reference_price().is_none()).count();
        info!(
            "Loading {} breakout prices, {}ms apart",
            pending,
            self.pacer.min_spacing().as_millis()
        );

        for item in items.iter_mut().filter(|i| i.reference_price().is_none()) {
            if let Err(failure) = self.check_session(item) {
                warn!("❌ {}", failure);
                report.failures.push(failure);
                continue;
            }
            if !self.pacer.wait_or_cancel(cancel).await {
                warn!("Breakout price loading cancelled");
                report.cancelled = true;
                break;
            }

            match self.load_item(item, source, now).await {
                Ok(price) => {
                    item.set_reference_price(price);
                    info!(
                        "✅ {} {} breakout price = ₹{:.2}",
                        item.symbol, item.direction, price
                    );
                    report.loaded.push((item.symbol.clone(), price));
                }
                Err(failure) => {
                    warn!("❌ {}", failure);
                    report.failures.push(failure);
                }
            }
        }

        report
    }

    /// Reference price for a single item.
    pub async fn load_item(
        &self,
        item: &WatchItem,
        source: &dyn MarketData,
        now: DateTime<FixedOffset>,
    ) -> Result<Decimal, LoadFailure> {
        self.check_session(item)?;

        let today = now.date_naive();
        let candles = source
            .candles(
                &item.token,
                today.and_time(self.session_open),
                today.and_time(self.session_close),
                &self.interval,
            )
            .await
            .map_err(|source| LoadFailure::Source {
                symbol: item.symbol.clone(),
                source,
            })?;

        find_breakout_candle(&candles, item.breakout_time, today, now.offset())
            .map(|candle| item.direction.reference_from(candle))
            .ok_or_else(|| LoadFailure::NoMatchingCandle {
                symbol: item.symbol.clone(),
                time: item.breakout_time,
            })
    }

    fn check_session(&self, item: &WatchItem) -> Result<(), LoadFailure> {
        if item.breakout_time < self.session_open || item.breakout_time > self.session_close {
            return Err(LoadFailure::OutsideSession {
                symbol: item.symbol.clone(),
                time: item.breakout_time,
            });
        }
        Ok(())
    }
}

/// Candle whose session-local timestamp falls on `today` at the breakout
/// hour and minute. Candles from any other day never match.
pub fn find_breakout_candle<'a>(
    candles: &'a [Candle],
    breakout_time: NaiveTime,
    today: NaiveDate,
    tz: &FixedOffset,
) -> Option<&'a Candle> {
    candles.iter().find(|c| {
        let local = c.datetime.with_timezone(tz);
        local.date_naive() == today
            && local.hour() == breakout_time.hour()
            && local.minute() == breakout_time.minute()
    })
}
