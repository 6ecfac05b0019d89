// src/sentiment.rs
//! Sentiment domain types: signals, LLM classifications and the persisted record.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Buy,
    Sell,
    Neutral,
}

impl Signal {
    /// Lenient mapping of LLM output. Anything unrecognised is NEUTRAL.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" | "BULLISH" | "LONG" => Self::Buy,
            "SELL" | "BEARISH" | "SHORT" => Self::Sell,
            _ => Self::Neutral,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
            Self::Neutral => "NEUTRAL",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Self::Buy => "🟢",
            Self::Sell => "🔴",
            Self::Neutral => "⚪",
        }
    }

    /// BUY or SELL.
    pub fn is_directional(self) -> bool {
        !matches!(self, Self::Neutral)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalize a ticker: trim, drop leading `$`/`#`-style prefixes, uppercase.
/// Returns `None` when nothing is left.
pub fn normalize_ticker(raw: &str) -> Option<String> {
    let t = raw
        .trim()
        .trim_start_matches(|c: char| !c.is_alphanumeric())
        .trim()
        .to_uppercase();
    if t.is_empty() {
        None
    } else {
        Some(t)
    }
}

/// Normalize a list of tickers, dropping empties and later duplicates.
pub fn normalize_tickers<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for t in raw {
        if let Some(n) = normalize_ticker(t.as_ref()) {
            if !out.contains(&n) {
                out.push(n);
            }
        }
    }
    out
}

/// Structured answer of a classifier for one post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentimentClassification {
    /// Normalized, de-duplicated, in the order the model listed them.
    pub symbols: Vec<String>,
    pub signal: Signal,
    pub bull_case: String,
    pub bear_case: String,
    pub summary: String,
}

/// One ledger row; at most one per source item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SentimentRecord {
    pub item_id: String,
    pub symbols: Vec<String>,
    pub signal: Signal,
    pub bull_case: String,
    pub bear_case: String,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

impl SentimentRecord {
    pub fn from_classification(
        item_id: impl Into<String>,
        c: SentimentClassification,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            symbols: normalize_tickers(&c.symbols),
            signal: c.signal,
            bull_case: c.bull_case,
            bear_case: c.bear_case,
            summary: c.summary,
            created_at,
        }
    }
}

/// Symbol allow-list. Empty means every symbol passes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    symbols: BTreeSet<String>,
}

impl AllowList {
    pub fn new<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            symbols: raw
                .into_iter()
                .filter_map(|s| normalize_ticker(s.as_ref()))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// True if the list is empty or any of `symbols` is on it.
    pub fn admits<S: AsRef<str>>(&self, symbols: &[S]) -> bool {
        self.is_empty()
            || symbols
                .iter()
                .filter_map(|s| normalize_ticker(s.as_ref()))
                .any(|s| self.symbols.contains(&s))
    }
}
