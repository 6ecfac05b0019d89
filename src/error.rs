// src/error.rs
//! Error taxonomy shared by the ports, the stores and the reconciler.

use std::path::PathBuf;

use thiserror::Error;

/// Feed fetch failed. Never fatal: the reconciler treats it like an empty feed.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("feed request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("feed returned HTTP {status}")]
    Status { status: u16 },

    #[error("feed XML parse error: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("feed entry #{index} is missing required field `{field}`")]
    MissingField { index: usize, field: &'static str },
}

/// Chat post failed.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("chat request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("chat API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("chat API response was malformed: {0}")]
    Malformed(String),
}

impl DeliveryError {
    /// True when the destination itself is unusable (bad token, unknown or forbidden
    /// channel). Retrying the remaining items of the cycle cannot succeed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Status { status: 401 | 403 | 404, .. })
    }
}

/// LLM classification failed; the item's enrichment is skipped.
#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("{provider} request failed: {source}")]
    Http {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} returned HTTP {status}")]
    Status { provider: &'static str, status: u16 },

    #[error("{provider} response was malformed: {reason}")]
    Malformed {
        provider: &'static str,
        reason: String,
    },

    #[error("daily classification budget of {limit} calls exhausted")]
    BudgetExhausted { limit: u32 },
}

/// Cursor or ledger persistence failed.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt record in {} at line {line}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not encode record: {0}")]
    Encode(#[from] serde_json::Error),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Invalid or missing configuration. Terminates the process at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("could not load symbol allow-list from {}: {reason}", path.display())]
    AllowList { path: PathBuf, reason: String },
}

/// A failure that aborts the whole poll cycle. The cursor is left untouched so the
/// same items come back on the next tick.
#[derive(Debug, Error)]
pub enum TickError {
    #[error("could not load cursor: {0}")]
    CursorLoad(#[source] StorageError),

    #[error("could not advance cursor: {0}")]
    CursorSave(#[source] StorageError),

    #[error("chat destination rejected item {item_id}: {source}")]
    Delivery {
        item_id: String,
        #[source]
        source: DeliveryError,
    },
}
