use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{NotificationHandle, Notifier};
use crate::error::DeliveryError;

/// Discord's hard limits.
pub const MAX_MESSAGE_CHARS: usize = 2000;
pub const MAX_THREAD_NAME_CHARS: usize = 100;
const THREAD_AUTO_ARCHIVE_MINUTES: u32 = 1440;

/// Posts through the Discord bot REST API.
#[derive(Clone)]
pub struct DiscordNotifier {
    api_base: String,
    bot_token: String,
    channel_id: String,
    client: Client,
    timeout: Duration,
}

impl DiscordNotifier {
    pub fn new(api_base: &str, bot_token: &str, channel_id: u64) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token: bot_token.to_string(),
            channel_id: channel_id.to_string(),
            client: Client::new(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    async fn send_json<T: Serialize + ?Sized>(
        &self,
        url: String,
        body: &T,
    ) -> Result<DiscordObject, DeliveryError> {
        let rsp = self
            .client
            .post(url)
            .timeout(self.timeout)
            .header(reqwest::header::AUTHORIZATION, format!("Bot {}", self.bot_token))
            .json(body)
            .send()
            .await?;

        let status = rsp.status();
        if !status.is_success() {
            let body = rsp.text().await.unwrap_or_default();
            return Err(DeliveryError::Status {
                status: status.as_u16(),
                body: truncate_chars(&body, 200),
            });
        }
        rsp.json::<DiscordObject>()
            .await
            .map_err(|e| DeliveryError::Malformed(e.to_string()))
    }

    async fn create_message(
        &self,
        channel_id: &str,
        text: &str,
    ) -> Result<NotificationHandle, DeliveryError> {
        let url = format!("{}/channels/{}/messages", self.api_base, channel_id);
        let payload = CreateMessage {
            content: truncate_chars(text, MAX_MESSAGE_CHARS),
        };
        let msg = self.send_json(url, &payload).await?;
        Ok(NotificationHandle {
            channel_id: msg.channel_id.unwrap_or_else(|| channel_id.to_string()),
            message_id: msg.id,
        })
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn post(&self, text: &str) -> Result<NotificationHandle, DeliveryError> {
        self.create_message(&self.channel_id, text).await
    }

    async fn post_thread(
        &self,
        parent: &NotificationHandle,
        title: &str,
        body: &str,
    ) -> Result<NotificationHandle, DeliveryError> {
        let url = format!(
            "{}/channels/{}/messages/{}/threads",
            self.api_base, parent.channel_id, parent.message_id
        );
        let payload = StartThread {
            name: truncate_chars(title, MAX_THREAD_NAME_CHARS),
            auto_archive_duration: THREAD_AUTO_ARCHIVE_MINUTES,
        };
        let thread = self.send_json(url, &payload).await?;
        // A thread's id doubles as its channel id
        self.create_message(&thread.id, body).await
    }

    fn name(&self) -> &'static str {
        "discord"
    }
}

#[derive(Serialize)]
struct CreateMessage {
    content: String,
}

#[derive(Serialize)]
struct StartThread {
    name: String,
    auto_archive_duration: u32,
}

/// The fields we need from a Discord message or channel object.
#[derive(Deserialize)]
struct DiscordObject {
    id: String,
    #[serde(default)]
    channel_id: Option<String>,
}

/// Cut to at most `max` chars, ending with an ellipsis when shortened.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
