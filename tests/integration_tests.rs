//! Integration tests for the breakout tracker
//!
//! These tests drive the full pipeline (watchlist → loader → engine →
//! history) and the live monitor loop against a scripted market data source.

use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use breakout_tracker::angel::ScripRecord;
use breakout_tracker::common::Pacer;
use breakout_tracker::error::MarketDataError;
use breakout_tracker::loader::BreakoutPriceLoader;
use breakout_tracker::monitor::{Clock, Monitor, MonitorEvent, StopReason};
use breakout_tracker::resolver::SymbolResolver;
use breakout_tracker::types::ItemState;
use breakout_tracker::watchlist::{self, parse_entries};
use breakout_tracker::{Candle, Engine, MarketData, Symbol, Token};

// =============================================================================
// Test Utilities
// =============================================================================

fn ist(s: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(s).unwrap()
}

fn session_start() -> DateTime<FixedOffset> {
    ist("2024-01-10T11:00:00+05:30")
}

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn candle(ts: &str, high: Decimal, low: Decimal) -> Candle {
    Candle {
        datetime: ist(ts),
        open: low,
        high,
        low,
        close: high,
    }
}

/// Candles per token, and a queue of LTP responses per symbol.
/// An exhausted queue answers with an error.
#[derive(Default)]
struct ScriptedMarket {
    candles: HashMap<Token, Vec<Candle>>,
    prices: Mutex<HashMap<Symbol, VecDeque<Result<Decimal, MarketDataError>>>>,
    ltp_calls: Mutex<Vec<Symbol>>,
}

impl ScriptedMarket {
    fn with_candles(mut self, token: &str, candles: Vec<Candle>) -> Self {
        self.candles.insert(Token::new(token), candles);
        self
    }

    fn with_prices(self, symbol: &str, prices: Vec<Result<Decimal, MarketDataError>>) -> Self {
        self.prices
            .lock()
            .unwrap()
            .insert(Symbol::new(symbol), prices.into_iter().collect());
        self
    }

    fn ltp_calls(&self) -> Vec<Symbol> {
        self.ltp_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MarketData for ScriptedMarket {
    async fn candles(
        &self,
        token: &Token,
        _from: NaiveDateTime,
        _to: NaiveDateTime,
        _interval: &str,
    ) -> Result<Vec<Candle>, MarketDataError> {
        self.candles.get(token).cloned().ok_or(MarketDataError::Empty)
    }

    async fn last_price(
        &self,
        _exchange: &str,
        symbol: &Symbol,
        _token: &Token,
    ) -> Result<Decimal, MarketDataError> {
        self.ltp_calls.lock().unwrap().push(symbol.clone());
        self.prices
            .lock()
            .unwrap()
            .get_mut(symbol)
            .and_then(|q| q.pop_front())
            .unwrap_or(Err(MarketDataError::Empty))
    }
}

/// Wall clock that follows tokio's (possibly paused) time
struct TokioClock {
    base: DateTime<FixedOffset>,
    start: tokio::time::Instant,
}

impl TokioClock {
    fn new(base: DateTime<FixedOffset>) -> Self {
        Self {
            base,
            start: tokio::time::Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.base + Duration::from_std(self.start.elapsed()).unwrap()
    }
}

fn resolver() -> SymbolResolver {
    let records = vec![
        ScripRecord {
            token: "101".into(),
            symbol: "AAA-EQ".into(),
            name: "AAA".into(),
            exch_seg: "NSE".into(),
        },
        ScripRecord {
            token: "102".into(),
            symbol: "BBB-EQ".into(),
            name: "BBB".into(),
            exch_seg: "NSE".into(),
        },
        ScripRecord {
            token: "103".into(),
            symbol: "CCC-EQ".into(),
            name: "CCC".into(),
            exch_seg: "NSE".into(),
        },
        ScripRecord {
            token: "900".into(),
            symbol: "AAA".into(),
            name: "AAA".into(),
            exch_seg: "BSE".into(),
        },
    ];
    SymbolResolver::from_records(&records, "NSE")
}

fn loader() -> BreakoutPriceLoader {
    BreakoutPriceLoader::new(
        Pacer::with_spacing(std::time::Duration::from_millis(1500)),
        "ONE_MINUTE",
        hm(9, 15),
        hm(15, 30),
    )
}

/// Engine with the watchlist built from JSON and prices loaded
async fn loaded_engine(json: &str, market: &ScriptedMarket) -> Engine {
    let entries = parse_entries(json).unwrap();
    let built = watchlist::build(&entries, &resolver());
    let mut engine = Engine::new("NSE", Duration::seconds(60), 10);
    engine.replace_watchlist(built.items);
    engine
        .load_reference_prices(&loader(), market, session_start(), &CancellationToken::new())
        .await
        .unwrap();
    engine
}

// =============================================================================
// Pipeline Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_end_to_end_cooldown_scenario() {
    let market = ScriptedMarket::default()
        .with_candles("101", vec![candle("2024-01-10T09:32:00+05:30", dec!(100.00), dec!(98.00))])
        .with_prices(
            "AAA",
            vec![Ok(dec!(99.50)), Ok(dec!(100.20)), Ok(dec!(100.10)), Ok(dec!(100.05))],
        );
    let mut engine = loaded_engine(
        r#"[{"Symbol": "AAA", "Breakout": "Bull", "Time (IST)": "09:32 AM"}]"#,
        &market,
    )
    .await;
    let aaa = Symbol::new("AAA");
    let cancel = CancellationToken::new();
    assert_eq!(engine.item(&aaa).unwrap().reference_price(), Some(dec!(100.00)));
    assert_eq!(engine.item(&aaa).unwrap().state(), ItemState::Armed);

    let t0 = session_start();

    // cycle 1: below the level
    let report = engine.run_cycle(&market, t0, &cancel).await.unwrap();
    assert!(report.alerts.is_empty());
    assert_eq!(engine.history().head(), Some(&vec![]));

    // cycle 2: touch
    let t_alert = t0 + Duration::seconds(60);
    let report = engine.run_cycle(&market, t_alert, &cancel).await.unwrap();
    assert_eq!(report.alerts, vec![aaa.clone()]);
    assert!(report.notify());
    assert_eq!(engine.history().head(), Some(&vec![aaa.clone()]));
    assert_eq!(engine.item(&aaa).unwrap().last_match, Some(t_alert));

    // cycle 3: 30s later, still touching, suppressed
    let report = engine
        .run_cycle(&market, t_alert + Duration::seconds(30), &cancel)
        .await
        .unwrap();
    assert!(report.alerts.is_empty());
    assert!(report.rows[0].matched);
    assert!(!report.notify());
    assert_eq!(engine.history().head(), Some(&vec![]));

    // cycle 4: 70s after the alert, fires again
    let t_second = t_alert + Duration::seconds(70);
    let report = engine.run_cycle(&market, t_second, &cancel).await.unwrap();
    assert_eq!(report.alerts, vec![aaa.clone()]);
    assert_eq!(engine.history().head(), Some(&vec![aaa.clone()]));
    assert_eq!(engine.item(&aaa).unwrap().last_match, Some(t_second));
    assert_eq!(engine.item(&aaa).unwrap().state(), ItemState::Matched);

    let table = engine.history().render();
    assert_eq!(table.columns.len(), 10);
    assert_eq!(table.columns[0].symbols, vec![aaa.clone()]);
    assert_eq!(table.columns[2].symbols, vec![aaa]);
}

#[tokio::test(start_paused = true)]
async fn test_fetch_failure_does_not_affect_other_items() {
    let market = ScriptedMarket::default()
        .with_candles(
            "101",
            vec![candle("2024-01-10T10:00:00+05:30", dec!(250.75), dec!(248.00))],
        )
        .with_candles(
            "102",
            vec![candle("2024-01-10T10:00:00+05:30", dec!(80.00), dec!(77.30))],
        )
        .with_candles(
            "103",
            vec![candle("2024-01-10T10:00:00+05:30", dec!(1500.40), dec!(1490.00))],
        )
        .with_prices("AAA", vec![Err(MarketDataError::Request("timeout".into()))])
        .with_prices("BBB", vec![Ok(dec!(77.99))])
        .with_prices("CCC", vec![Ok(dec!(1500.01))]);

    let mut engine = loaded_engine(
        r#"[
            {"Symbol": "AAA", "Breakout": "Bull", "Time (IST)": "10:00 AM"},
            {"Symbol": "BBB", "Breakout": "Bear", "Time (IST)": "10:00 AM"},
            {"Symbol": "CCC", "Breakout": "Bull", "Time (IST)": "10:00 AM"}
        ]"#,
        &market,
    )
    .await;

    let report = engine
        .run_cycle(&market, session_start(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.alerts, vec![Symbol::new("BBB"), Symbol::new("CCC")]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, Symbol::new("AAA"));
    assert_eq!(report.rows[0].current, None);
    assert_eq!(engine.history().len(), 1);
    assert_eq!(
        market.ltp_calls(),
        vec![Symbol::new("AAA"), Symbol::new("BBB"), Symbol::new("CCC")]
    );
}

#[tokio::test(start_paused = true)]
async fn test_pending_item_displayed_but_never_alerts() {
    // No candle for BBB: its reference price stays unset
    let market = ScriptedMarket::default()
        .with_candles("101", vec![candle("2024-01-10T09:45:00+05:30", dec!(10.50), dec!(9.00))])
        .with_prices("AAA", vec![Ok(dec!(3.00)), Ok(dec!(3.00))])
        .with_prices("BBB", vec![Ok(dec!(0.00)), Ok(dec!(42.42))]);

    let mut engine = loaded_engine(
        r#"[
            {"Symbol": "AAA", "Breakout": "Bull", "Time (IST)": "09:45 AM"},
            {"Symbol": "BBB", "Breakout": "Bull", "Time (IST)": "09:45 AM"}
        ]"#,
        &market,
    )
    .await;

    let cancel = CancellationToken::new();
    for i in 0..2 {
        let report = engine
            .run_cycle(&market, session_start() + Duration::seconds(120 * i), &cancel)
            .await
            .unwrap();
        assert!(report.alerts.is_empty());
        assert_eq!(report.rows[1].state, ItemState::Pending);
        assert!(report.rows[1].current.is_some());
    }
    assert!(engine.item(&Symbol::new("BBB")).unwrap().last_match.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_bad_entries_skipped_rest_loaded() {
    let json = r#"[
        {"Symbol": "aaa", "Breakout": "Bull", "Time (IST)": "09:32 AM"},
        {"Symbol": "BBB", "Breakout": "Bull", "Time (IST)": "9.32"},
        {"Symbol": "ZZZ", "Breakout": "Bear", "Time (IST)": "09:32 AM"},
        {"Symbol": "CCC", "Breakout": "Up", "Time (IST)": "09:32 AM"}
    ]"#;
    let built = watchlist::build(&parse_entries(json).unwrap(), &resolver());
    assert_eq!(built.items.len(), 1);
    assert_eq!(built.items[0].symbol, Symbol::new("AAA"));
    assert_eq!(built.items[0].token, Token::new("101"));
    assert_eq!(built.warnings.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_reference_prices_loaded_once_per_watchlist() {
    let market = ScriptedMarket::default()
        .with_candles("101", vec![candle("2024-01-10T09:32:00+05:30", dec!(100), dec!(90))]);
    let mut engine = loaded_engine(
        r#"[{"Symbol": "AAA", "Breakout": "Bear", "Time (IST)": "09:32 AM"}]"#,
        &market,
    )
    .await;
    assert!(engine.prices_loaded());
    assert_eq!(engine.items()[0].reference_price(), Some(dec!(90)));

    let again = engine
        .load_reference_prices(&loader(), &market, session_start(), &CancellationToken::new())
        .await;
    assert!(again.is_none());
}

// =============================================================================
// Monitor Loop Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_monitor_runs_cycles_until_cancelled() {
    let market = Arc::new(
        ScriptedMarket::default()
            .with_candles("101", vec![candle("2024-01-10T09:32:00+05:30", dec!(100.00), dec!(98.00))])
            .with_prices(
                "AAA",
                vec![Ok(dec!(99.50)), Ok(dec!(100.20)), Ok(dec!(100.10)), Ok(dec!(100.05))],
            ),
    );
    let engine = loaded_engine(
        r#"[{"Symbol": "AAA", "Breakout": "Bull", "Time (IST)": "09:32 AM"}]"#,
        &market,
    )
    .await;

    let clock = Arc::new(TokioClock::new(session_start()));
    let monitor = Monitor::new(engine, market.clone(), clock, std::time::Duration::from_secs(60));
    let (tx, mut rx) = mpsc::channel(16);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(monitor.run(tx, cancel.clone()));

    let mut alerts_per_cycle = Vec::new();
    for _ in 0..4 {
        match rx.recv().await {
            Some(MonitorEvent::Cycle(report)) => alerts_per_cycle.push(report.alerts.len()),
            other => panic!("unexpected event: {:?}", other),
        }
    }
    // Cycles are exactly one cooldown apart, so every touch fires
    assert_eq!(alerts_per_cycle, vec![0, 1, 1, 1]);

    cancel.cancel();
    let engine = handle.await.unwrap();
    assert!(matches!(rx.recv().await, Some(MonitorEvent::Stopped { cycles: 4, reason: StopReason::Cancelled })));
    assert_eq!(engine.cycles_run(), 4);
    assert_eq!(engine.history().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_monitor_cancelled_before_first_cycle() {
    let market = Arc::new(ScriptedMarket::default());
    let engine = Engine::new("NSE", Duration::seconds(60), 10);
    let clock = Arc::new(TokioClock::new(session_start()));
    let monitor = Monitor::new(engine, market, clock, std::time::Duration::from_secs(60));

    let (tx, mut rx) = mpsc::channel(4);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let engine = monitor.run(tx, cancel).await;
    assert_eq!(engine.cycles_run(), 0);
    assert!(matches!(rx.recv().await, Some(MonitorEvent::Stopped { cycles: 0, reason: StopReason::Cancelled })));
}

#[tokio::test(start_paused = true)]
async fn test_monitor_stops_when_receiver_dropped() {
    let market = Arc::new(ScriptedMarket::default());
    let engine = Engine::new("NSE", Duration::seconds(60), 10);
    let clock = Arc::new(TokioClock::new(session_start()));
    let monitor = Monitor::new(engine, market, clock, std::time::Duration::from_secs(60));

    let (tx, rx) = mpsc::channel(4);
    drop(rx);

    let engine = monitor.run(tx, CancellationToken::new()).await;
    assert_eq!(engine.cycles_run(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_monitor_stops_when_day_rolls_over() {
    let market = Arc::new(
        ScriptedMarket::default()
            .with_candles("101", vec![candle("2024-01-10T09:32:00+05:30", dec!(100.00), dec!(98.00))])
            .with_prices("AAA", vec![Ok(dec!(100.20)), Ok(dec!(100.30)), Ok(dec!(100.40))]),
    );
    let engine = loaded_engine(
        r#"[{"Symbol": "AAA", "Breakout": "Bull", "Time (IST)": "09:32 AM"}]"#,
        &market,
    )
    .await;

    // Cycles at 23:58:30, 23:59:30 and 00:00:30 the next day
    let clock = Arc::new(TokioClock::new(ist("2024-01-10T23:58:30+05:30")));
    let monitor = Monitor::new(engine, market, clock, std::time::Duration::from_secs(60));
    let (tx, mut rx) = mpsc::channel(16);
    let handle = tokio::spawn(monitor.run(tx, CancellationToken::new()));

    let mut reports = Vec::new();
    for _ in 0..3 {
        match rx.recv().await {
            Some(MonitorEvent::Cycle(report)) => reports.push(report),
            other => panic!("unexpected event: {:?}", other),
        }
    }
    assert_eq!(reports[0].alerts, vec![Symbol::new("AAA")]);
    assert_eq!(reports[1].alerts, vec![Symbol::new("AAA")]);
    assert!(reports[2].alerts.is_empty());
    assert!(!reports[2].rows[0].matched);

    let day_one = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
    assert_eq!(reports[2].expired_session, Some(day_one));

    let expected = StopReason::SessionExpired {
        loaded_for: day_one,
        today: NaiveDate::from_ymd_opt(2024, 1, 11).unwrap(),
    };
    match rx.recv().await {
        Some(MonitorEvent::Stopped { cycles, reason }) => {
            assert_eq!(cycles, 3);
            assert_eq!(reason, expected);
        }
        other => panic!("unexpected event: {:?}", other),
    }
    let engine = handle.await.unwrap();
    assert_eq!(engine.session_date(), Some(day_one));
}
