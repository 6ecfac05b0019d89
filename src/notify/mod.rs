// src/notify/mod.rs
pub mod discord;
pub mod format;
pub mod log;

use async_trait::async_trait;

use crate::error::DeliveryError;

pub use discord::DiscordNotifier;
pub use log::LogNotifier;

/// Identifies a posted message so a thread can be opened on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationHandle {
    pub channel_id: String,
    pub message_id: String,
}

/// Chat sink port. One destination channel per deployment.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Post a plain message to the destination channel.
    async fn post(&self, text: &str) -> Result<NotificationHandle, DeliveryError>;

    /// Open a thread titled `title` on `parent` and post `body` inside it.
    async fn post_thread(
        &self,
        parent: &NotificationHandle,
        title: &str,
        body: &str,
    ) -> Result<NotificationHandle, DeliveryError>;

    fn name(&self) -> &'static str;
}
