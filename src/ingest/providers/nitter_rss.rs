// src/ingest/providers/nitter_rss.rs
use std::time::Duration;

use async_trait::async_trait;
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::error::TransportError;
use crate::ingest::normalize_text;
use crate::ingest::types::{FeedItem, FeedSource};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    #[serde(rename = "dc:creator", alias = "creator")]
    creator: Option<String>,
    description: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    guid: Option<Guid>,
    link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Guid {
    #[serde(rename = "$text", default)]
    value: String,
}

fn parse_rfc2822_to_unix(ts: &str) -> Option<u64> {
    OffsetDateTime::parse(ts.trim(), &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
        .and_then(|x| u64::try_from(x).ok())
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Nitter (RSS 2.0) feed of one account.
pub struct NitterRssSource {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl NitterRssSource {
    pub fn from_fixture(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
        }
    }

    pub fn from_url(url: impl Into<String>) -> Self {
        Self::with_timeout(url, Duration::from_secs(15))
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("feed-sentiment-relay/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            mode: Mode::Http {
                url: url.into(),
                client,
            },
        }
    }

    /// Parse an RSS document into items, newest-first as published.
    ///
    /// The identifier is the `<guid>`, falling back to `<link>`. An entry with
    /// neither, or without a link, fails the whole snapshot.
    pub fn parse_items_from_str(s: &str) -> Result<Vec<FeedItem>, TransportError> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(s);
        let rss: Rss = from_str(&xml_clean)?;

        let mut out = Vec::with_capacity(rss.channel.item.len());
        for (index, it) in rss.channel.item.into_iter().enumerate() {
            let link = non_empty(it.link);
            let id = non_empty(it.guid.map(|g| g.value))
                .or_else(|| link.clone())
                .ok_or(TransportError::MissingField { index, field: "guid" })?;
            let link = link.ok_or(TransportError::MissingField { index, field: "link" })?;

            let raw = it
                .description
                .filter(|d| !d.trim().is_empty())
                .or(it.title)
                .unwrap_or_default();

            out.push(FeedItem {
                id,
                link,
                author: non_empty(it.creator).unwrap_or_else(|| "Unknown".to_string()),
                content: normalize_text(&raw),
                published_at: it.pub_date.as_deref().and_then(parse_rfc2822_to_unix),
            });
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("feed_parse_ms").record(ms);
        counter!("feed_entries_total").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl FeedSource for NitterRssSource {
    async fn fetch_latest(&self) -> Result<Vec<FeedItem>, TransportError> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_items_from_str(s),
            Mode::Http { url, client } => {
                let resp = client.get(url.as_str()).send().await?;
                let status = resp.status();
                if !status.is_success() {
                    return Err(TransportError::Status {
                        status: status.as_u16(),
                    });
                }
                let body = resp.text().await?;
                Self::parse_items_from_str(&body)
            }
        }
    }

    fn name(&self) -> &'static str {
        "nitter"
    }
}

/// HTML entities are not valid XML; Nitter leaks a few into descriptions.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&hellip;", "...")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
