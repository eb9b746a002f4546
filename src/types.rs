//! Core data types used across the breakout tracker

use chrono::{DateTime, FixedOffset, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Minute-resolution OHLC candle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub datetime: DateTime<FixedOffset>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
}

/// Equity symbol as listed on the exchange (e.g. "RELIANCE")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol(pub String);

impl Symbol {
    /// Normalizes user input: surrounding whitespace removed, upper-cased.
    pub fn new(s: impl AsRef<str>) -> Self {
        Symbol(s.as_ref().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&self.0)
    }
}

/// Opaque exchange instrument identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token(pub String);

impl Token {
    pub fn new(s: impl Into<String>) -> Self {
        Token(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&self.0)
    }
}

/// Direction of the original breakout move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Bullish,
    Bearish,
}

impl Direction {
    /// Accepts "Bull"/"Bullish" and "Bear"/"Bearish", case-insensitive.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "bull" | "bullish" => Some(Direction::Bullish),
            "bear" | "bearish" => Some(Direction::Bearish),
            _ => None,
        }
    }

    /// Picks the candle extreme used as the reference price.
    pub fn reference_from(&self, candle: &Candle) -> Decimal {
        match self {
            Direction::Bullish => candle.high,
            Direction::Bearish => candle.low,
        }
    }

    pub fn glyph(&self) -> &'static str {
        match self {
            Direction::Bullish => "🟢",
            Direction::Bearish => "🔴",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Bullish => write!(f, "Bull"),
            Direction::Bearish => write!(f, "Bear"),
        }
    }
}

/// Evaluation state of a watch item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    /// No reference price yet, never evaluated
    Pending,
    /// Reference price known, no alert so far
    Armed,
    /// Alerted at least once, may re-fire after cooldown
    Matched,
}

/// Current price relative to the reference price
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
    Level,
    Unknown,
}

impl Trend {
    pub fn between(reference: Option<Decimal>, current: Option<Decimal>) -> Self {
        match (reference, current) {
            (Some(r), Some(c)) if c > r => Trend::Up,
            (Some(r), Some(c)) if c < r => Trend::Down,
            (Some(_), Some(_)) => Trend::Level,
            _ => Trend::Unknown,
        }
    }

    pub fn glyph(&self) -> &'static str {
        match self {
            Trend::Up => "⏏️",
            Trend::Down => "🔻",
            Trend::Level | Trend::Unknown => "",
        }
    }
}

/// One tracked symbol
#[derive(Debug, Clone, PartialEq)]
pub struct WatchItem {
    pub symbol: Symbol,
    pub token: Token,
    pub direction: Direction,
    /// Breakout minute in the session timezone
    pub breakout_time: NaiveTime,
    reference_price: Option<Decimal>,
    pub last_price: Option<Decimal>,
    pub last_match: Option<DateTime<FixedOffset>>,
}

impl WatchItem {
    pub fn new(symbol: Symbol, token: Token, direction: Direction, breakout_time: NaiveTime) -> Self {
        Self {
            symbol,
            token,
            direction,
            breakout_time,
            reference_price: None,
            last_price: None,
            last_match: None,
        }
    }

    pub fn reference_price(&self) -> Option<Decimal> {
        self.reference_price
    }

    /// Sets the reference price. Only the first call has an effect;
    /// returns whether the value was stored.
    pub fn set_reference_price(&mut self, price: Decimal) -> bool {
        if self.reference_price.is_some() {
            return false;
        }
        self.reference_price = Some(price);
        true
    }

    pub fn state(&self) -> ItemState {
        match (self.reference_price, self.last_match) {
            (None, _) => ItemState::Pending,
            (Some(_), None) => ItemState::Armed,
            (Some(_), Some(_)) => ItemState::Matched,
        }
    }

    pub fn trend(&self) -> Trend {
        Trend::between(self.reference_price, self.last_price)
    }
}
