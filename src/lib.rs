// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod analyze;
pub mod app;
pub mod config;
pub mod error;
pub mod flip;
pub mod ingest;
pub mod metrics;
pub mod notify;
pub mod pipeline;
pub mod reconciler;
pub mod sentiment;
pub mod store;

// ---- Re-exports for stable public API ----
pub use analyze::ai_adapter;
pub use crate::flip::{detect_flips, FlipEvent};
pub use crate::ingest::types::{FeedItem, FeedSource};
pub use crate::notify::{NotificationHandle, Notifier};
pub use crate::reconciler::{diff_new_items, FeedReconciler, TickOutcome};
pub use crate::sentiment::{SentimentRecord, Signal};
