// src/app.rs
//! Startup wiring: every component is built once here and passed down explicitly.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::analyze::ai_adapter::build_classifier;
use crate::config::{AppConfig, NotifierConfig};
use crate::ingest::providers::nitter_rss::NitterRssSource;
use crate::ingest::scheduler::PollScheduler;
use crate::ingest::types::FeedSource;
use crate::ingest::PermalinkRewriter;
use crate::notify::{DiscordNotifier, LogNotifier, Notifier};
use crate::pipeline::NotificationPipeline;
use crate::reconciler::FeedReconciler;
use crate::store::{FileCursorStore, FileLedger};

pub struct AppContext {
    pub config: AppConfig,
    pub ledger: Arc<FileLedger>,
    pub reconciler: Arc<FeedReconciler>,
}

impl AppContext {
    pub async fn build(config: AppConfig) -> anyhow::Result<Self> {
        let feed: Arc<dyn FeedSource> = Arc::new(NitterRssSource::from_url(&config.feed_url));

        let notifier: Arc<dyn Notifier> = match &config.notifier {
            NotifierConfig::Discord {
                bot_token,
                channel_id,
                api_base,
            } => Arc::new(DiscordNotifier::new(api_base, bot_token, *channel_id)),
            NotifierConfig::Log => Arc::new(LogNotifier::new()),
        };

        let classifier = config.ai.as_ref().map(build_classifier);

        let ledger = Arc::new(
            FileLedger::open(&config.ledger_path)
                .await
                .with_context(|| format!("opening ledger {}", config.ledger_path.display()))?,
        );
        let cursor = Arc::new(FileCursorStore::new(&config.cursor_path));

        let pipeline = NotificationPipeline::new(notifier.clone(), classifier.clone(), ledger.clone())
            .with_allow_list(config.allow_list.clone())
            .with_flip_alerts(config.flip_alerts_enabled)
            .with_permalinks(PermalinkRewriter::new(config.permalink_host.clone()));

        let reconciler = Arc::new(FeedReconciler::new(feed, cursor, pipeline));

        info!(
            feed = %config.feed_url,
            notifier = notifier.name(),
            classifier = classifier.as_ref().map_or("disabled", |c| c.provider_name()),
            allow_list = config.allow_list.len(),
            flip_alerts = config.flip_alerts_enabled,
            "relay configured"
        );

        Ok(Self {
            config,
            ledger,
            reconciler,
        })
    }

    pub fn scheduler(&self) -> PollScheduler {
        PollScheduler::new(self.reconciler.clone(), self.config.poll_interval)
    }
}
