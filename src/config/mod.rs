// src/config/mod.rs
//! Process configuration, read once at startup from the environment.

pub mod ai;
pub mod allowlist;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::sentiment::AllowList;

pub use ai::{AiConfig, AiProvider};

pub const DEFAULT_FEED_URL: &str = "https://nitter.net/aleabitoreddit/rss";
pub const DEFAULT_DISCORD_API_BASE: &str = "https://discord.com/api/v10";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 120;

/// Where notifications go.
#[derive(Debug, Clone)]
pub enum NotifierConfig {
    Discord {
        bot_token: String,
        channel_id: u64,
        api_base: String,
    },
    /// Dry run: log messages instead of posting them.
    Log,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub feed_url: String,
    pub notifier: NotifierConfig,
    pub poll_interval: Duration,
    pub sentiment_enabled: bool,
    pub flip_alerts_enabled: bool,
    pub allow_list: AllowList,
    pub cursor_path: PathBuf,
    pub ledger_path: PathBuf,
    pub permalink_host: String,
    /// Present only when sentiment analysis is enabled.
    pub ai: Option<AiConfig>,
    pub metrics_addr: Option<SocketAddr>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production).
    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| get(k).filter(|v| !v.trim().is_empty());

        let feed_url = get("FEED_URL")
            .or_else(|| get("NITTER_RSS_URL"))
            .unwrap_or_else(|| DEFAULT_FEED_URL.to_string());

        let notifier = match get("NOTIFIER").as_deref().map(str::to_ascii_lowercase) {
            None => discord_from(&get)?,
            Some(n) if n == "discord" => discord_from(&get)?,
            Some(n) if n == "log" => NotifierConfig::Log,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "NOTIFIER",
                    reason: format!("unsupported notifier {other:?} (expected discord or log)"),
                })
            }
        };

        let poll_secs = match get("POLL_INTERVAL_SECS") {
            Some(v) => v
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or_else(|| ConfigError::Invalid {
                    key: "POLL_INTERVAL_SECS",
                    reason: format!("{v:?} is not a positive number of seconds"),
                })?,
            None => DEFAULT_POLL_INTERVAL_SECS,
        };

        let sentiment_enabled = parse_bool("SENTIMENT_ENABLED", get("SENTIMENT_ENABLED"), true)?;
        let flip_alerts_enabled =
            parse_bool("FLIP_ALERTS_ENABLED", get("FLIP_ALERTS_ENABLED"), true)?;

        let mut symbols = get(allowlist::ENV_INLINE)
            .map(|s| allowlist::parse_inline(&s))
            .unwrap_or_default();
        let path_override = get(allowlist::ENV_PATH);
        let from_file = allowlist::load_allowlist_default(path_override.as_deref()).map_err(|e| {
            ConfigError::AllowList {
                path: path_override.clone().map(PathBuf::from).unwrap_or_default(),
                reason: format!("{e:#}"),
            }
        })?;
        symbols.extend(from_file);
        let allow_list = AllowList::new(symbols);

        let cursor_path = get("CURSOR_PATH")
            .or_else(|| get("LAST_TWEET_FILE"))
            .map_or_else(|| PathBuf::from("data/last_item_id.txt"), PathBuf::from);
        let ledger_path = get("LEDGER_PATH")
            .map_or_else(|| PathBuf::from("data/sentiment_ledger.jsonl"), PathBuf::from);

        let permalink_host = get("PERMALINK_HOST").unwrap_or_else(|| "twitter.com".to_string());

        let ai = if sentiment_enabled {
            Some(AiConfig::from_lookup(&get)?)
        } else {
            None
        };

        let metrics_addr = match get("METRICS_ADDR") {
            Some(a) => Some(a.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "METRICS_ADDR",
                reason: format!("{a:?} is not a socket address"),
            })?),
            None => None,
        };

        Ok(Self {
            feed_url,
            notifier,
            poll_interval: Duration::from_secs(poll_secs),
            sentiment_enabled,
            flip_alerts_enabled,
            allow_list,
            cursor_path,
            ledger_path,
            permalink_host,
            ai,
            metrics_addr,
        })
    }
}

fn discord_from<F>(get: &F) -> Result<NotifierConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let bot_token = get("DISCORD_BOT_TOKEN").ok_or(ConfigError::Missing("DISCORD_BOT_TOKEN"))?;
    let raw_channel = get("DISCORD_CHANNEL_ID").ok_or(ConfigError::Missing("DISCORD_CHANNEL_ID"))?;
    let channel_id = raw_channel
        .trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid {
            key: "DISCORD_CHANNEL_ID",
            reason: format!("{raw_channel:?} is not a numeric channel id"),
        })?;
    let api_base = get("DISCORD_API_BASE").unwrap_or_else(|| DEFAULT_DISCORD_API_BASE.to_string());
    Ok(NotifierConfig::Discord {
        bot_token: bot_token.trim().to_string(),
        channel_id,
        api_base,
    })
}

fn parse_bool(key: &'static str, v: Option<String>, default: bool) -> Result<bool, ConfigError> {
    let Some(v) = v else {
        return Ok(default);
    };
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            reason: format!("{v:?} is not a boolean"),
        }),
    }
}
