//! Symbol → instrument token lookup
//!
//! Built once from the broker's scrip master snapshot and read-only after.

use std::collections::HashMap;
use tracing::debug;

use crate::angel::ScripRecord;
use crate::types::{Symbol, Token};

#[derive(Debug, Clone, Default)]
pub struct SymbolResolver {
    tokens: HashMap<Symbol, Token>,
}

impl SymbolResolver {
    /// Keeps records of `exchange` only, keyed by instrument name. When a
    /// name has several series the equity (`-EQ`) listing wins.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a ScripRecord>, exchange: &str) -> Self {
        let mut tokens: HashMap<Symbol, (Token, bool)> = HashMap::new();
        for record in records {
            if !record.exch_seg.eq_ignore_ascii_case(exchange) || record.name.trim().is_empty() {
                continue;
            }
            let is_equity = record.symbol.ends_with("-EQ");
            let symbol = Symbol::new(&record.name);
            match tokens.get(&symbol) {
                Some((_, true)) if !is_equity => continue,
                _ => {
                    tokens.insert(symbol, (Token::new(record.token.clone()), is_equity));
                }
            }
        }
        debug!("Resolved {} {} symbols", tokens.len(), exchange);
        Self {
            tokens: tokens.into_iter().map(|(s, (t, _))| (s, t)).collect(),
        }
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (Symbol, Token)>) -> Self {
        Self {
            tokens: pairs.into_iter().collect(),
        }
    }

    pub fn resolve(&self, symbol: &Symbol) -> Option<&Token> {
        self.tokens.get(symbol)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
