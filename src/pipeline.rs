// src/pipeline.rs
//! Per-item side effects, in order: base notification, classification, allow-list
//! filter, flip detection + ledger upsert, flip alerts, threaded analysis.
//!
//! Every step after the base notification is best-effort for the item. Only a
//! fatal delivery error on the base notification aborts the cycle; follow-up posts
//! for an item whose base post already went out never do.

use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use tracing::{debug, info, warn};

use crate::analyze::ai_adapter::DynClassifier;
use crate::error::DeliveryError;
use crate::flip::{detect_flips, FlipEvent};
use crate::ingest::types::FeedItem;
use crate::ingest::PermalinkRewriter;
use crate::notify::format::{format_analysis, format_flip_alert, thread_title};
use crate::notify::{NotificationHandle, Notifier};
use crate::sentiment::{AllowList, SentimentRecord};
use crate::store::SentimentLedger;

/// What happened to an item's enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisOutcome {
    Disabled,
    Failed,
    NoSymbols,
    Filtered,
    /// Ledger lookup or write failed; no flip alerts were sent.
    PersistFailed,
    Persisted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReport {
    pub item_id: String,
    pub delivered: bool,
    pub analysis: AnalysisOutcome,
    /// Flips detected for this item (alerted only when flip alerts are on).
    pub flips: Vec<FlipEvent>,
    pub thread_posted: bool,
}

pub struct NotificationPipeline {
    notifier: Arc<dyn Notifier>,
    classifier: Option<DynClassifier>,
    ledger: Arc<dyn SentimentLedger>,
    allow_list: AllowList,
    flip_alerts: bool,
    permalinks: PermalinkRewriter,
}

impl NotificationPipeline {
    /// `classifier: None` disables sentiment analysis.
    pub fn new(
        notifier: Arc<dyn Notifier>,
        classifier: Option<DynClassifier>,
        ledger: Arc<dyn SentimentLedger>,
    ) -> Self {
        Self {
            notifier,
            classifier,
            ledger,
            allow_list: AllowList::default(),
            flip_alerts: true,
            permalinks: PermalinkRewriter::default(),
        }
    }

    pub fn with_allow_list(mut self, allow_list: AllowList) -> Self {
        self.allow_list = allow_list;
        self
    }

    pub fn with_flip_alerts(mut self, enabled: bool) -> Self {
        self.flip_alerts = enabled;
        self
    }

    pub fn with_permalinks(mut self, permalinks: PermalinkRewriter) -> Self {
        self.permalinks = permalinks;
        self
    }

    /// Run every step for one item. `Err` only for a fatal delivery error on the
    /// base notification.
    pub async fn process(&self, item: &FeedItem) -> Result<ItemReport, DeliveryError> {
        let permalink = self.permalinks.rewrite(&item.link);
        let mut report = ItemReport {
            item_id: item.id.clone(),
            delivered: false,
            analysis: AnalysisOutcome::Disabled,
            flips: Vec::new(),
            thread_posted: false,
        };

        // 1) Base notification
        let parent = match self.notifier.post(&permalink).await {
            Ok(h) => {
                info!(item_id = %item.id, url = %permalink, "posted");
                report.delivered = true;
                Some(h)
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(item_id = %item.id, error = %e, "base notification failed");
                counter!("notify_errors_total").increment(1);
                None
            }
        };

        // 2) Classification
        let Some(classifier) = &self.classifier else {
            return Ok(report);
        };
        let classification = match classifier.classify(&item.author, &item.content).await {
            Ok(c) => c,
            Err(e) => {
                warn!(item_id = %item.id, provider = classifier.provider_name(), error = %e, "classification failed");
                counter!("sentiment_classify_errors_total").increment(1);
                report.analysis = AnalysisOutcome::Failed;
                return Ok(report);
            }
        };
        if classification.symbols.is_empty() {
            debug!(item_id = %item.id, "no symbols in post");
            report.analysis = AnalysisOutcome::NoSymbols;
            return Ok(report);
        }

        // 3) Allow-list
        if !self.allow_list.admits(&classification.symbols) {
            info!(item_id = %item.id, symbols = ?classification.symbols, "filtered by symbol allow-list");
            counter!("sentiment_filtered_total").increment(1);
            report.analysis = AnalysisOutcome::Filtered;
            return Ok(report);
        }

        // 4) Flips against the pre-upsert ledger, then persist. Without the prior
        // signals the upsert would overwrite them, so a failed lookup skips both.
        let record = SentimentRecord::from_classification(item.id.clone(), classification, Utc::now());
        let persisted = match detect_flips(self.ledger.as_ref(), &record).await {
            Ok(flips) => self.ledger.upsert(record.clone()).await.map(|()| flips),
            Err(e) => Err(e),
        };
        match persisted {
            Ok(flips) => {
                report.analysis = AnalysisOutcome::Persisted;
                for flip in &flips {
                    info!(symbol = %flip.symbol, prior = %flip.prior, new = %flip.new, item_id = %item.id, "sentiment flip");
                    counter!("sentiment_flips_total").increment(1);
                    if self.flip_alerts {
                        self.emit_flip_alert(flip, &permalink).await;
                    }
                }
                report.flips = flips;
            }
            Err(e) => {
                warn!(item_id = %item.id, error = %e, "ledger unavailable; flip tracking skipped for item");
                counter!("ledger_write_errors_total").increment(1);
                report.analysis = AnalysisOutcome::PersistFailed;
            }
        }

        // 5) Threaded analysis
        report.thread_posted = self.emit_analysis(parent.as_ref(), &record).await;
        Ok(report)
    }

    async fn emit_flip_alert(&self, flip: &FlipEvent, permalink: &str) {
        if let Err(e) = self.notifier.post(&format_flip_alert(flip, permalink)).await {
            warn!(symbol = %flip.symbol, error = %e, fatal = e.is_fatal(), "flip alert failed");
            counter!("notify_errors_total").increment(1);
        }
    }

    async fn emit_analysis(
        &self,
        parent: Option<&NotificationHandle>,
        record: &SentimentRecord,
    ) -> bool {
        let body = format_analysis(record);
        let sent = match parent {
            Some(p) => {
                self.notifier
                    .post_thread(p, &thread_title(&record.symbols), &body)
                    .await
            }
            // No message to hang a thread on; post inline instead
            None => self.notifier.post(&body).await,
        };
        match sent {
            Ok(_) => {
                info!(item_id = %record.item_id, symbols = ?record.symbols, "analysis posted");
                true
            }
            Err(e) => {
                warn!(item_id = %record.item_id, error = %e, fatal = e.is_fatal(), "analysis post failed");
                counter!("notify_errors_total").increment(1);
                false
            }
        }
    }
}
