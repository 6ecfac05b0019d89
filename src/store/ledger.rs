// src/store/ledger.rs
//! Sentiment ledger: one record per feed item, looked up by symbol.
//!
//! The file backend is an append-only JSON-lines log. Every upsert appends one line
//! and fsyncs it; a failed append is truncated away again. On open the log is replayed
//! in order, so a later line for the same item replaces the earlier one.
//! `compact` rewrites the log without superseded lines.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::cursor::{write_atomic, write_tmp};
use super::SentimentLedger;
use crate::error::StorageError;
use crate::sentiment::{SentimentRecord, Signal};

/// Every encoded record starts with this; used to find a record glued onto a torn write.
const RECORD_PREFIX: &str = "{\"item_id\":";

/// Recency key: creation time, then insertion sequence.
type Recency = (DateTime<Utc>, u64);

#[derive(Debug, Default)]
struct LedgerIndex {
    next_seq: u64,
    by_item: HashMap<String, (u64, SentimentRecord)>,
    by_symbol: HashMap<String, BTreeMap<Recency, Signal>>,
}

impl LedgerIndex {
    fn apply(&mut self, record: SentimentRecord) {
        let seq = self.next_seq;
        self.next_seq += 1;

        if let Some((old_seq, old)) = self.by_item.remove(&record.item_id) {
            for sym in &old.symbols {
                if let Some(m) = self.by_symbol.get_mut(sym) {
                    m.remove(&(old.created_at, old_seq));
                    if m.is_empty() {
                        self.by_symbol.remove(sym);
                    }
                }
            }
        }

        for sym in &record.symbols {
            self.by_symbol
                .entry(sym.clone())
                .or_default()
                .insert((record.created_at, seq), record.signal);
        }
        self.by_item.insert(record.item_id.clone(), (seq, record));
    }

    fn most_recent(&self, symbol: &str) -> Option<Signal> {
        self.by_symbol
            .get(symbol)
            .and_then(|m| m.last_key_value())
            .map(|(_, s)| *s)
    }

    /// Live records in insertion order.
    fn records(&self) -> Vec<&SentimentRecord> {
        let mut v: Vec<_> = self.by_item.values().collect();
        v.sort_by_key(|(seq, _)| *seq);
        v.into_iter().map(|(_, r)| r).collect()
    }

    fn get(&self, item_id: &str) -> Option<&SentimentRecord> {
        self.by_item.get(item_id).map(|(_, r)| r)
    }
}

/// In-process ledger, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    index: Mutex<LedgerIndex>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.index.lock().expect("ledger mutex poisoned").by_item.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, item_id: &str) -> Option<SentimentRecord> {
        self.index
            .lock()
            .expect("ledger mutex poisoned")
            .get(item_id)
            .cloned()
    }
}

#[async_trait]
impl SentimentLedger for MemoryLedger {
    async fn upsert(&self, record: SentimentRecord) -> Result<(), StorageError> {
        self.index.lock().expect("ledger mutex poisoned").apply(record);
        Ok(())
    }

    async fn most_recent_sentiment(&self, symbol: &str) -> Result<Option<Signal>, StorageError> {
        Ok(self
            .index
            .lock()
            .expect("ledger mutex poisoned")
            .most_recent(symbol))
    }
}

struct FileLedgerInner {
    index: LedgerIndex,
    /// Lines in the log, including superseded ones.
    lines: usize,
    log: fs::File,
}

/// Durable ledger backed by a JSON-lines log.
pub struct FileLedger {
    path: PathBuf,
    inner: tokio::sync::Mutex<FileLedgerInner>,
}

impl FileLedger {
    /// Open (or create) the log at `path` and replay it.
    ///
    /// A line that fails to parse is reported as [`StorageError::Corrupt`], except for
    /// torn writes: an unterminated final line is dropped, and a torn fragment with a
    /// complete record appended behind it keeps only the record. Either way the log is
    /// rewritten clean.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| StorageError::io(dir, e))?;
        }

        let content = match fs::read_to_string(&path).await {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(StorageError::io(&path, e)),
        };

        let mut index = LedgerIndex::default();
        let mut lines = 0usize;
        let mut torn = false;
        let raw_lines: Vec<&str> = content.split('\n').collect();
        let last = raw_lines.len().saturating_sub(1);
        for (i, line) in raw_lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<SentimentRecord>(line) {
                Ok(rec) => {
                    index.apply(rec);
                    lines += 1;
                }
                // `split` yields the unterminated tail as the last element
                Err(_) if i == last => {
                    tracing::warn!(path = %path.display(), line = i + 1, "dropping torn ledger line");
                    torn = true;
                }
                Err(source) => match recover_spliced(line) {
                    Some(rec) => {
                        tracing::warn!(path = %path.display(), line = i + 1, "dropping torn fragment before ledger record");
                        index.apply(rec);
                        lines += 1;
                        torn = true;
                    }
                    None => {
                        return Err(StorageError::Corrupt {
                            path: path.clone(),
                            line: i + 1,
                            source,
                        })
                    }
                },
            }
        }

        if torn {
            write_atomic(&path, &encode_log(&index.records())?).await?;
            lines = index.by_item.len();
        }

        let log = open_append(&path).await?;
        tracing::info!(path = %path.display(), records = index.by_item.len(), "ledger opened");
        Ok(Self {
            path,
            inner: tokio::sync::Mutex::new(FileLedgerInner { index, lines, log }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of live records.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.index.by_item.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn get(&self, item_id: &str) -> Option<SentimentRecord> {
        self.inner.lock().await.index.get(item_id).cloned()
    }

    /// Rewrite the log keeping only live records. Returns the number of lines dropped.
    pub async fn compact(&self) -> Result<usize, StorageError> {
        let mut inner = self.inner.lock().await;
        let live = inner.index.by_item.len();
        let dropped = inner.lines.saturating_sub(live);
        if dropped == 0 {
            return Ok(0);
        }
        // The new handle is opened on the temp file, so the live handle is only
        // swapped once the rename succeeded.
        let tmp = write_tmp(&self.path, &encode_log(&inner.index.records())?).await?;
        let log = match open_append(&tmp).await {
            Ok(f) => f,
            Err(e) => {
                let _ = fs::remove_file(&tmp).await;
                return Err(e);
            }
        };
        if let Err(e) = fs::rename(&tmp, &self.path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(StorageError::io(&self.path, e));
        }
        inner.log = log;
        inner.lines = live;
        tracing::info!(path = %self.path.display(), dropped, "ledger compacted");
        Ok(dropped)
    }
}

#[async_trait]
impl SentimentLedger for FileLedger {
    async fn upsert(&self, record: SentimentRecord) -> Result<(), StorageError> {
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');

        let mut inner = self.inner.lock().await;
        let len_before = inner
            .log
            .metadata()
            .await
            .map_err(|e| StorageError::io(&self.path, e))?
            .len();
        let appended = match inner.log.write_all(&line).await {
            Ok(()) => inner.log.sync_data().await,
            Err(e) => Err(e),
        };
        if let Err(e) = appended {
            // Never leave a fragment for the next append to land behind
            if let Err(te) = inner.log.set_len(len_before).await {
                tracing::error!(path = %self.path.display(), error = %te, "could not truncate failed ledger append");
            }
            return Err(StorageError::io(&self.path, e));
        }

        // Index only after the line is durable
        inner.index.apply(record);
        inner.lines += 1;
        Ok(())
    }

    async fn most_recent_sentiment(&self, symbol: &str) -> Result<Option<Signal>, StorageError> {
        Ok(self.inner.lock().await.index.most_recent(symbol))
    }
}

fn encode_log(records: &[&SentimentRecord]) -> Result<Vec<u8>, StorageError> {
    let mut out = Vec::new();
    for r in records {
        serde_json::to_writer(&mut out, r)?;
        out.push(b'\n');
    }
    Ok(out)
}

/// A torn fragment followed by a whole record on the same line: keep the record.
fn recover_spliced(line: &str) -> Option<SentimentRecord> {
    let start = line.rfind(RECORD_PREFIX).filter(|&i| i > 0)?;
    serde_json::from_str(&line[start..]).ok()
}

async fn open_append(path: &Path) -> Result<fs::File, StorageError> {
    fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| StorageError::io(path, e))
}
