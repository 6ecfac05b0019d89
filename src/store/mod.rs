// src/store/mod.rs
//! Durable state: the feed cursor and the sentiment ledger.

pub mod cursor;
pub mod ledger;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::sentiment::{SentimentRecord, Signal};

pub use cursor::{FileCursorStore, MemoryCursorStore};
pub use ledger::{FileLedger, MemoryLedger};

/// Single-value checkpoint of the last processed feed item.
#[async_trait]
pub trait CursorStore: Send + Sync {
    async fn load(&self) -> Result<Option<String>, StorageError>;
    /// Must be durable before returning.
    async fn save(&self, item_id: &str) -> Result<(), StorageError>;
}

/// Per-item sentiment records, queryable by symbol.
#[async_trait]
pub trait SentimentLedger: Send + Sync {
    /// Insert, or fully replace the record with the same `item_id`.
    async fn upsert(&self, record: SentimentRecord) -> Result<(), StorageError>;
    /// Signal of the newest record mentioning `symbol`.
    async fn most_recent_sentiment(&self, symbol: &str) -> Result<Option<Signal>, StorageError>;
}
