//! Notification surface
//!
//! Turns cycle reports into plain-text tables. The terminal notifier rings
//! the bell when a cycle raised a new alert.

use chrono::{DateTime, FixedOffset, NaiveTime};
use itertools::Itertools;
use rust_decimal::Decimal;
use std::io::{self, Write};

use crate::engine::CycleReport;
use crate::history::HistoryTable;
use crate::types::{Direction, ItemState, Symbol, Trend, WatchItem};

/// Per-item snapshot for one cycle
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayRow {
    pub direction: Direction,
    pub symbol: Symbol,
    pub reference: Option<Decimal>,
    /// `None` when the price fetch failed this cycle
    pub current: Option<Decimal>,
    pub trend: Trend,
    /// Currently at the breakout level, whether or not an alert fired
    pub matched: bool,
    /// A new alert fired for this item this cycle
    pub new_alert: bool,
    pub state: ItemState,
    pub breakout_time: NaiveTime,
    pub last_match: Option<DateTime<FixedOffset>>,
}

impl DisplayRow {
    pub fn from_item(item: &WatchItem, matched: bool, new_alert: bool) -> Self {
        Self {
            direction: item.direction,
            symbol: item.symbol.clone(),
            reference: item.reference_price(),
            current: item.last_price,
            trend: item.trend(),
            matched,
            new_alert,
            state: item.state(),
            breakout_time: item.breakout_time,
            last_match: item.last_match,
        }
    }

    pub fn cells(&self) -> [String; 8] {
        [
            self.direction.glyph().to_string(),
            self.symbol.to_string(),
            format_price(self.reference),
            format_price(self.current),
            self.trend.glyph().to_string(),
            if self.matched { "✅" } else { "❌" }.to_string(),
            self.breakout_time.format("%I:%M %p").to_string(),
            self.last_match
                .map(|t| t.format("%H:%M:%S").to_string())
                .unwrap_or_default(),
        ]
    }
}

pub const ROW_HEADERS: [&str; 8] = [
    "Signal",
    "Symbol",
    "Breakout Price",
    "Current LTP",
    "Up/Down",
    "Matched",
    "Breakout Time",
    "Time",
];

pub fn format_price(price: Option<Decimal>) -> String {
    match price {
        Some(p) => format!("₹{:.2}", p),
        None => "-".to_string(),
    }
}

/// Fixed-width text table. Widths count chars, so wide glyphs may drift.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let widths: Vec<usize> = (0..headers.len())
        .map(|i| {
            rows.iter()
                .filter_map(|r| r.get(i))
                .map(|c| c.chars().count())
                .chain(std::iter::once(headers[i].chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<width$}", c, width = *w))
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    out.push_str(&line(headers.to_vec()));
    out.push('\n');
    out.push_str(&widths.iter().map(|w| "-".repeat(*w)).join("-+-"));
    out.push('\n');
    for row in rows {
        out.push_str(&line(row.iter().map(String::as_str).collect()));
        out.push('\n');
    }
    out
}

pub fn render_rows(rows: &[DisplayRow]) -> String {
    let cells: Vec<Vec<String>> = rows.iter().map(|r| r.cells().to_vec()).collect();
    render_table(&ROW_HEADERS, &cells)
}

pub fn render_history(table: &HistoryTable) -> String {
    let headers: Vec<&str> = table.columns.iter().map(|c| c.label.as_str()).collect();
    render_table(&headers, &table.rows())
}

/// Consumes cycle reports
pub trait Notifier {
    fn show(&mut self, report: &CycleReport) -> io::Result<()>;
}

/// Writes both tables to a terminal-like sink
pub struct TerminalNotifier<W: Write> {
    out: W,
    bell: bool,
}

impl TerminalNotifier<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout(), true)
    }
}

impl<W: Write> TerminalNotifier<W> {
    pub fn new(out: W, bell: bool) -> Self {
        Self { out, bell }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Notifier for TerminalNotifier<W> {
    fn show(&mut self, report: &CycleReport) -> io::Result<()> {
        writeln!(
            self.out,
            "📡 Live LTP Monitor | cycle {} @ {}",
            report.cycle,
            report.at.format("%H:%M:%S")
        )?;
        write!(self.out, "{}", render_rows(&report.rows))?;
        writeln!(self.out)?;
        writeln!(self.out, "🔔 Recent Alerts (Last {} Minutes)", report.history.columns.len())?;
        write!(self.out, "{}", render_history(&report.history))?;
        if let Some(day) = report.expired_session {
            writeln!(self.out, "⛔ Breakout prices are from {}; restart to load today's levels", day)?;
        }
        if report.notify() {
            writeln!(self.out, "🚨 New alerts: {}", report.alerts.iter().join(", "))?;
            if self.bell {
                write!(self.out, "\x07")?;
            }
        }
        writeln!(self.out)?;
        self.out.flush()
    }
}
