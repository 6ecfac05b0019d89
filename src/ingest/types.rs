// src/ingest/types.rs
use crate::error::TransportError;

/// One post as observed in the feed. Immutable once fetched.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct FeedItem {
    pub id: String,      // feed-assigned, opaque, stable across polls
    pub link: String,    // permalink as published by the feed
    pub author: String,  // e.g. "@aleabitoreddit"
    pub content: String, // normalized text
    pub published_at: Option<u64>, // unix seconds, informational only
}

/// Feed port. Returns entries newest-first.
#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<FeedItem>, TransportError>;
    fn name(&self) -> &'static str;
}
