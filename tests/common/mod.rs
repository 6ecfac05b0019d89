// tests/common/mod.rs
// Test doubles for the feed, chat and LLM ports.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use feed_sentiment_relay::ai_adapter::SentimentClassifier;
use feed_sentiment_relay::error::{
    ClassificationError, DeliveryError, StorageError, TransportError,
};
use feed_sentiment_relay::sentiment::{SentimentClassification, SentimentRecord, Signal};
use feed_sentiment_relay::store::{CursorStore, MemoryCursorStore, MemoryLedger, SentimentLedger};
use feed_sentiment_relay::{FeedItem, FeedSource, NotificationHandle, Notifier};

pub fn item(id: &str) -> FeedItem {
    FeedItem {
        id: id.to_string(),
        link: format!("https://nitter.net/alea/status/{id}#m"),
        author: "@alea".to_string(),
        content: format!("post {id}"),
        published_at: None,
    }
}

pub fn snapshot(ids: &[&str]) -> Vec<FeedItem> {
    ids.iter().map(|id| item(id)).collect()
}

pub fn permalink(id: &str) -> String {
    format!("https://twitter.com/alea/status/{id}#m")
}

// ---------------- feed ----------------

/// Feed that returns whatever was last set; `None` means the fetch fails.
#[derive(Default)]
pub struct StaticFeed {
    items: Mutex<Option<Vec<FeedItem>>>,
}

impl StaticFeed {
    pub fn new(items: Vec<FeedItem>) -> Arc<Self> {
        Arc::new(Self {
            items: Mutex::new(Some(items)),
        })
    }

    pub fn set(&self, items: Vec<FeedItem>) {
        *self.items.lock().unwrap() = Some(items);
    }

    pub fn fail(&self) {
        *self.items.lock().unwrap() = None;
    }
}

#[async_trait]
impl FeedSource for StaticFeed {
    async fn fetch_latest(&self) -> Result<Vec<FeedItem>, TransportError> {
        self.items
            .lock()
            .unwrap()
            .clone()
            .ok_or(TransportError::Status { status: 503 })
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

// ---------------- chat ----------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Post(String),
    Thread {
        parent: String,
        title: String,
        body: String,
    },
}

/// Records every message. Posts whose text contains a registered needle fail
/// with the registered HTTP status.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Sent>>,
    failures: Mutex<Vec<(String, u16)>>,
    next_id: Mutex<u64>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_posts_containing(&self, needle: &str, status: u16) {
        self.failures
            .lock()
            .unwrap()
            .push((needle.to_string(), status));
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    /// Plain channel posts, in order.
    pub fn posts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Post(t) => Some(t),
                Sent::Thread { .. } => None,
            })
            .collect()
    }

    pub fn threads(&self) -> Vec<(String, String)> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Thread { title, body, .. } => Some((title, body)),
                Sent::Post(_) => None,
            })
            .collect()
    }

    pub fn flip_alerts(&self) -> Vec<String> {
        self.posts()
            .into_iter()
            .filter(|p| p.contains("Sentiment flip"))
            .collect()
    }

    fn check(&self, text: &str) -> Result<(), DeliveryError> {
        let failures = self.failures.lock().unwrap();
        match failures.iter().find(|(needle, _)| text.contains(needle.as_str())) {
            Some((_, status)) => Err(DeliveryError::Status {
                status: *status,
                body: "{\"message\": \"scripted failure\"}".to_string(),
            }),
            None => Ok(()),
        }
    }

    fn handle(&self) -> NotificationHandle {
        let mut n = self.next_id.lock().unwrap();
        *n += 1;
        NotificationHandle {
            channel_id: "chan".to_string(),
            message_id: n.to_string(),
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn post(&self, text: &str) -> Result<NotificationHandle, DeliveryError> {
        self.check(text)?;
        self.sent.lock().unwrap().push(Sent::Post(text.to_string()));
        Ok(self.handle())
    }

    async fn post_thread(
        &self,
        parent: &NotificationHandle,
        title: &str,
        body: &str,
    ) -> Result<NotificationHandle, DeliveryError> {
        self.check(body)?;
        self.sent.lock().unwrap().push(Sent::Thread {
            parent: parent.message_id.clone(),
            title: title.to_string(),
            body: body.to_string(),
        });
        Ok(self.handle())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

// ---------------- LLM ----------------

pub fn classification(symbols: &[&str], signal: Signal) -> SentimentClassification {
    SentimentClassification {
        symbols: symbols.iter().map(|s| s.to_string()).collect(),
        signal,
        bull_case: "bull".to_string(),
        bear_case: "bear".to_string(),
        summary: "summary".to_string(),
    }
}

/// Answers keyed by post content; unknown content is a malformed response.
#[derive(Default)]
pub struct ScriptedClassifier {
    answers: Mutex<HashMap<String, SentimentClassification>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedClassifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answer for the post built by `item(id)`.
    pub fn answer(&self, id: &str, c: SentimentClassification) {
        self.answers
            .lock()
            .unwrap()
            .insert(format!("post {id}"), c);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SentimentClassifier for ScriptedClassifier {
    async fn classify(
        &self,
        _author: &str,
        content: &str,
    ) -> Result<SentimentClassification, ClassificationError> {
        self.calls.lock().unwrap().push(content.to_string());
        self.answers
            .lock()
            .unwrap()
            .get(content)
            .cloned()
            .ok_or(ClassificationError::Malformed {
                provider: "scripted",
                reason: "no scripted answer".to_string(),
            })
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

// ---------------- storage ----------------

fn disk_full(path: &str) -> StorageError {
    StorageError::Io {
        path: path.into(),
        source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
    }
}

/// Memory ledger whose upserts fail for selected items, and whose lookups can be
/// switched to fail.
#[derive(Default)]
pub struct FlakyLedger {
    pub inner: MemoryLedger,
    fail_items: Mutex<Vec<String>>,
    fail_lookups: AtomicBool,
}

impl FlakyLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_upsert_for(&self, item_id: &str) {
        self.fail_items.lock().unwrap().push(item_id.to_string());
    }

    pub fn fail_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SentimentLedger for FlakyLedger {
    async fn upsert(&self, record: SentimentRecord) -> Result<(), StorageError> {
        if self.fail_items.lock().unwrap().contains(&record.item_id) {
            return Err(disk_full("ledger.jsonl"));
        }
        self.inner.upsert(record).await
    }

    async fn most_recent_sentiment(&self, symbol: &str) -> Result<Option<Signal>, StorageError> {
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(disk_full("ledger.jsonl"));
        }
        self.inner.most_recent_sentiment(symbol).await
    }
}

/// Memory cursor whose loads or saves can be switched to fail.
#[derive(Default)]
pub struct FailingCursorStore {
    pub inner: MemoryCursorStore,
    fail_loads: AtomicBool,
    fail_saves: AtomicBool,
}

impl FailingCursorStore {
    pub fn with_cursor(id: &str) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryCursorStore::with_cursor(id),
            ..Self::default()
        })
    }

    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn get(&self) -> Option<String> {
        self.inner.get()
    }
}

#[async_trait]
impl CursorStore for FailingCursorStore {
    async fn load(&self) -> Result<Option<String>, StorageError> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(disk_full("last_item_id.txt"));
        }
        self.inner.load().await
    }

    async fn save(&self, item_id: &str) -> Result<(), StorageError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(disk_full("last_item_id.txt"));
        }
        self.inner.save(item_id).await
    }
}
