//! Watchlist source and builder
//!
//! Raw breakout entries are validated one by one. A bad entry is dropped
//! with a [`WatchlistWarning`]; it never fails the batch.

use anyhow::{Context, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::WatchlistWarning;
use crate::resolver::SymbolResolver;
use crate::types::{Direction, Symbol, WatchItem};

/// Breakout time format, e.g. "09:32 AM"
pub const TIME_FORMAT: &str = "%I:%M %p";

/// One entry as supplied by the watchlist file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEntry {
    #[serde(rename = "Symbol")]
    pub symbol: String,
    #[serde(rename = "Breakout")]
    pub direction: String,
    #[serde(rename = "Time (IST)")]
    pub time: String,
}

impl RawEntry {
    pub fn new(symbol: impl Into<String>, direction: impl Into<String>, time: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            direction: direction.into(),
            time: time.into(),
        }
    }
}

/// Supplies raw breakout entries
pub trait WatchlistSource {
    fn entries(&self) -> Result<Vec<RawEntry>>;
}

/// JSON array of entries stored in a file
#[derive(Debug, Clone)]
pub struct JsonFileWatchlist {
    path: PathBuf,
}

impl JsonFileWatchlist {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl WatchlistSource for JsonFileWatchlist {
    fn entries(&self) -> Result<Vec<RawEntry>> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read watchlist {}", self.path.display()))?;
        parse_entries(&contents)
    }
}

pub fn parse_entries(contents: &str) -> Result<Vec<RawEntry>> {
    serde_json::from_str(contents).context("Failed to parse watchlist JSON")
}

/// Result of building a watchlist
#[derive(Debug, Clone, Default)]
pub struct BuiltWatchlist {
    pub items: Vec<WatchItem>,
    pub warnings: Vec<WatchlistWarning>,
}

pub fn parse_breakout_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), TIME_FORMAT).ok()
}

/// Validates entries in order. First occurrence of a symbol wins.
pub fn build(entries: &[RawEntry], resolver: &SymbolResolver) -> BuiltWatchlist {
    let mut built = BuiltWatchlist::default();
    let mut seen: HashSet<Symbol> = HashSet::new();

    for entry in entries {
        match build_item(entry, resolver, &seen) {
            Ok(item) => {
                seen.insert(item.symbol.clone());
                built.items.push(item);
            }
            Err(warning) => {
                warn!("⚠️  {}", warning);
                built.warnings.push(warning);
            }
        }
    }

    built
}

fn build_item(
    entry: &RawEntry,
    resolver: &SymbolResolver,
    seen: &HashSet<Symbol>,
) -> Result<WatchItem, WatchlistWarning> {
    let symbol = Symbol::new(&entry.symbol);

    let breakout_time =
        parse_breakout_time(&entry.time).ok_or_else(|| WatchlistWarning::InvalidTime {
            symbol: symbol.clone(),
            value: entry.time.clone(),
        })?;

    let direction =
        Direction::parse(&entry.direction).ok_or_else(|| WatchlistWarning::UnrecognizedDirection {
            symbol: symbol.clone(),
            value: entry.direction.clone(),
        })?;

    let token = resolver
        .resolve(&symbol)
        .cloned()
        .ok_or_else(|| WatchlistWarning::UnknownSymbol(symbol.clone()))?;

    if seen.contains(&symbol) {
        return Err(WatchlistWarning::DuplicateSymbol(symbol));
    }

    Ok(WatchItem::new(symbol, token, direction, breakout_time))
}
