// src/reconciler.rs
//! One poll tick: fetch, diff against the cursor, process oldest-first, advance.

use std::collections::HashSet;
use std::sync::Arc;

use metrics::{counter, gauge};
use tracing::{debug, info, warn};

use crate::error::TickError;
use crate::ingest::types::{FeedItem, FeedSource};
use crate::pipeline::{ItemReport, NotificationPipeline};
use crate::store::CursorStore;

/// Non-fatal ways a tick can end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Fetch failed; nothing changed.
    FeedUnavailable,
    /// Fetch returned no entries; nothing changed.
    FeedEmpty,
    /// The newest entry is the cursor.
    NoNewItems,
    /// New items were handed to the pipeline and the cursor moved to `cursor`.
    Processed {
        reports: Vec<ItemReport>,
        cursor: String,
    },
}

/// Items newer than `cursor`, oldest first.
///
/// Walks `snapshot` (newest-first) until an entry equals `cursor`. With no cursor,
/// or a cursor that fell out of the feed window, the whole snapshot is new.
/// A repeated identifier keeps only its newest occurrence.
pub fn diff_new_items<'a>(snapshot: &'a [FeedItem], cursor: Option<&str>) -> Vec<&'a FeedItem> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut fresh = Vec::new();
    for item in snapshot {
        if cursor == Some(item.id.as_str()) {
            break;
        }
        if seen.insert(item.id.as_str()) {
            fresh.push(item);
        }
    }
    fresh.reverse();
    fresh
}

pub struct FeedReconciler {
    feed: Arc<dyn FeedSource>,
    cursor: Arc<dyn CursorStore>,
    pipeline: NotificationPipeline,
}

impl FeedReconciler {
    pub fn new(
        feed: Arc<dyn FeedSource>,
        cursor: Arc<dyn CursorStore>,
        pipeline: NotificationPipeline,
    ) -> Self {
        Self {
            feed,
            cursor,
            pipeline,
        }
    }

    /// Run a single tick. Items are processed strictly one after another.
    ///
    /// The cursor moves to the snapshot head only after every new item went through
    /// the pipeline. When the chat destination rejects an item's base post, the tick
    /// stops there: the cursor is left on the last item already delivered in this
    /// tick (unchanged if there is none), so the rejected item and everything after
    /// it come back on the next tick and nothing is posted twice.
    pub async fn run_tick(&self) -> Result<TickOutcome, TickError> {
        counter!("feed_ticks_total").increment(1);
        let out = self.tick_inner().await;
        gauge!("feed_last_tick_ts").set(chrono::Utc::now().timestamp() as f64);
        out
    }

    async fn tick_inner(&self) -> Result<TickOutcome, TickError> {
        let snapshot = match self.feed.fetch_latest().await {
            Ok(s) => s,
            Err(e) => {
                warn!(feed = self.feed.name(), error = %e, "feed unreachable");
                counter!("feed_fetch_errors_total").increment(1);
                return Ok(TickOutcome::FeedUnavailable);
            }
        };
        let Some(head) = snapshot.first() else {
            info!(feed = self.feed.name(), "feed empty");
            return Ok(TickOutcome::FeedEmpty);
        };

        let cursor = self.cursor.load().await.map_err(TickError::CursorLoad)?;
        let fresh = diff_new_items(&snapshot, cursor.as_deref());
        if fresh.is_empty() {
            debug!(cursor = ?cursor, "no new posts");
            return Ok(TickOutcome::NoNewItems);
        }

        if cursor.is_some() && fresh.len() == snapshot.len() {
            warn!(cursor = ?cursor, items = fresh.len(), "cursor not in feed window; posts may have been missed");
        }
        info!(items = fresh.len(), cursor = ?cursor, "new posts");
        counter!("feed_items_new_total").increment(fresh.len() as u64);

        let mut reports = Vec::with_capacity(fresh.len());
        let mut last_done: Option<&FeedItem> = None;
        for item in fresh {
            match self.pipeline.process(item).await {
                Ok(report) => reports.push(report),
                Err(source) => {
                    if let Some(done) = last_done {
                        self.cursor
                            .save(&done.id)
                            .await
                            .map_err(TickError::CursorSave)?;
                        warn!(cursor = %done.id, rejected = %item.id, "chat destination rejected post; cursor checkpointed");
                    }
                    return Err(TickError::Delivery {
                        item_id: item.id.clone(),
                        source,
                    });
                }
            }
            last_done = Some(item);
        }

        self.cursor
            .save(&head.id)
            .await
            .map_err(TickError::CursorSave)?;
        info!(cursor = %head.id, "cursor advanced");

        Ok(TickOutcome::Processed {
            reports,
            cursor: head.id.clone(),
        })
    }
}
