//! Error types for the breakout tracker
//!
//! Fatal errors (`ConfigError`) stop the process before monitoring starts.
//! `WatchlistWarning` and `LoadFailure` are per-item and never abort a batch.

use chrono::NaiveTime;
use thiserror::Error;

use crate::types::Symbol;

/// Startup configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variables: {}", .0.join(", "))]
    MissingCredentials(Vec<&'static str>),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Failures reported by a market data source
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MarketDataError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("unexpected response: {0}")]
    Parse(String),

    #[error("no data returned")]
    Empty,
}

/// Recoverable per-entry problems found while building the watchlist
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WatchlistWarning {
    #[error("skipped invalid time format for {symbol}: {value:?}")]
    InvalidTime { symbol: Symbol, value: String },

    #[error("token not found for {0}")]
    UnknownSymbol(Symbol),

    #[error("unrecognized breakout direction for {symbol}: {value:?}")]
    UnrecognizedDirection { symbol: Symbol, value: String },

    #[error("duplicate entry for {0} ignored")]
    DuplicateSymbol(Symbol),
}

/// Per-item failure while loading a breakout reference price
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LoadFailure {
    #[error("no candle at {time} for {symbol}")]
    NoMatchingCandle { symbol: Symbol, time: NaiveTime },

    #[error("breakout time {time} for {symbol} is outside the trading session")]
    OutsideSession { symbol: Symbol, time: NaiveTime },

    #[error("candle fetch failed for {symbol}: {source}")]
    Source {
        symbol: Symbol,
        #[source]
        source: MarketDataError,
    },
}

impl LoadFailure {
    pub fn symbol(&self) -> &Symbol {
        match self {
            LoadFailure::NoMatchingCandle { symbol, .. }
            | LoadFailure::OutsideSession { symbol, .. }
            | LoadFailure::Source { symbol, .. } => symbol,
        }
    }
}
