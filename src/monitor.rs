//! Live monitor loop
//!
//! Runs engine cycles on a fixed period until cancelled and publishes each
//! cycle's report on a channel. Cycles never overlap: a slow cycle delays
//! the next one instead of running alongside it.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::engine::{CycleReport, Engine};
use crate::market_data::MarketData;

/// Events published by the monitor
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    Cycle(Box<CycleReport>),
    Stopped { cycles: u64, reason: StopReason },
}

/// Why the monitor loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Cancelled,
    ReceiverDropped,
    /// The date rolled over; reference prices belong to `loaded_for`
    SessionExpired { loaded_for: NaiveDate, today: NaiveDate },
}

/// Wall-clock source for cycle timestamps
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// System time in a fixed timezone
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }
}

pub struct Monitor {
    engine: Engine,
    source: Arc<dyn MarketData>,
    clock: Arc<dyn Clock>,
    period: Duration,
}

impl Monitor {
    pub fn new(engine: Engine, source: Arc<dyn MarketData>, clock: Arc<dyn Clock>, period: Duration) -> Self {
        Self {
            engine,
            source,
            clock,
            period,
        }
    }

    /// Loop until `cancel` fires, the event receiver goes away or the
    /// trading day ends. The first cycle starts immediately. Returns the engine so callers can
    /// inspect final state.
    pub async fn run(mut self, events: mpsc::Sender<MonitorEvent>, cancel: CancellationToken) -> Engine {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Starting live monitor: {} symbols, every {}s",
            self.engine.items().len(),
            self.period.as_secs()
        );

        let reason = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Shutdown signal received");
                    break StopReason::Cancelled;
                }
                _ = ticker.tick() => {}
            }

            let now = self.clock.now();
            let report = match self.engine.run_cycle(self.source.as_ref(), now, &cancel).await {
                Some(report) => report,
                None => break StopReason::Cancelled,
            };
            let expired = report.expired_session;

            info!(
                "Cycle {} complete: {} alerts, {} fetch failures",
                report.cycle,
                report.alerts.len(),
                report.failures.len()
            );

            if events.send(MonitorEvent::Cycle(Box::new(report))).await.is_err() {
                warn!("Event receiver dropped, stopping monitor");
                break StopReason::ReceiverDropped;
            }

            if let Some(loaded_for) = expired {
                let today = now.date_naive();
                error!(
                    "Breakout prices were loaded for {} but today is {}; stopping",
                    loaded_for, today
                );
                break StopReason::SessionExpired { loaded_for, today };
            }
        };

        let cycles = self.engine.cycles_run();
        let _ = events.send(MonitorEvent::Stopped { cycles, reason }).await;
        info!("Live monitor stopped after {} cycles", cycles);
        self.engine
    }
}
