//! Rolling alert history
//!
//! One bucket per monitor cycle holding the symbols that alerted in it,
//! newest first. Holds at most `capacity` buckets.

use std::collections::VecDeque;

use crate::types::Symbol;

/// Symbols that alerted during one cycle, in evaluation order
pub type AlertSet = Vec<Symbol>;

#[derive(Debug, Clone)]
pub struct AlertHistory {
    buckets: VecDeque<AlertSet>,
    capacity: usize,
}

impl AlertHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buckets: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Prepend a bucket, evicting the oldest beyond capacity.
    pub fn push(&mut self, alerts: AlertSet) {
        self.buckets.push_front(alerts);
        self.buckets.truncate(self.capacity);
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Newest bucket
    pub fn head(&self) -> Option<&AlertSet> {
        self.buckets.front()
    }

    /// Buckets from newest to oldest
    pub fn iter(&self) -> impl Iterator<Item = &AlertSet> {
        self.buckets.iter()
    }

    /// Column view with one column per slot; slots not yet filled are empty.
    pub fn render(&self) -> HistoryTable {
        let columns = (0..self.capacity)
            .map(|i| HistoryColumn {
                label: column_label(i),
                symbols: self.buckets.get(i).cloned().unwrap_or_default(),
            })
            .collect();
        HistoryTable { columns }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryColumn {
    pub label: String,
    pub symbols: Vec<Symbol>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryTable {
    pub columns: Vec<HistoryColumn>,
}

impl HistoryTable {
    /// Number of rows needed to show the longest column
    pub fn depth(&self) -> usize {
        self.columns.iter().map(|c| c.symbols.len()).max().unwrap_or(0)
    }

    /// Row-major cells, short columns padded with empty strings.
    pub fn rows(&self) -> Vec<Vec<String>> {
        (0..self.depth())
            .map(|r| {
                self.columns
                    .iter()
                    .map(|c| c.symbols.get(r).map(|s| s.to_string()).unwrap_or_default())
                    .collect()
            })
            .collect()
    }
}

/// "Last Min", "2nd Last Min", "3rd Last Min", "4th Last Min", ...
pub fn column_label(index: usize) -> String {
    if index == 0 {
        return "Last Min".to_string();
    }
    let n = index + 1;
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{} Last Min", n, suffix)
}
