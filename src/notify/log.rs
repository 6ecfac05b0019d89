use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use super::{NotificationHandle, Notifier};
use crate::error::DeliveryError;

/// Dry-run sink: writes every message to the log and hands out synthetic ids.
#[derive(Debug, Default)]
pub struct LogNotifier {
    next_id: AtomicU64,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&self) -> String {
        (self.next_id.fetch_add(1, Ordering::Relaxed) + 1).to_string()
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn post(&self, text: &str) -> Result<NotificationHandle, DeliveryError> {
        let message_id = self.next();
        tracing::info!(target: "notify", message_id = %message_id, "{text}");
        Ok(NotificationHandle {
            channel_id: "log".to_string(),
            message_id,
        })
    }

    async fn post_thread(
        &self,
        parent: &NotificationHandle,
        title: &str,
        body: &str,
    ) -> Result<NotificationHandle, DeliveryError> {
        let message_id = self.next();
        tracing::info!(
            target: "notify",
            parent = %parent.message_id,
            thread = title,
            "{body}"
        );
        Ok(NotificationHandle {
            channel_id: format!("thread-{}", parent.message_id),
            message_id,
        })
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
