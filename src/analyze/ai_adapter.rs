//! AI adapter: the sentiment classifier port plus concrete LLM providers.
//!
//! Every provider sends the same prompt and parses the same JSON shape; only the
//! transport differs. Providers never panic on bad output, they return
//! [`ClassificationError::Malformed`].

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{AiConfig, AiProvider};
use crate::error::ClassificationError;
use crate::sentiment::{normalize_tickers, SentimentClassification, Signal};

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

/// Classifies one post. Implementations are interchangeable.
#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    async fn classify(
        &self,
        author: &str,
        content: &str,
    ) -> Result<SentimentClassification, ClassificationError>;
    /// Provider name for logs.
    fn provider_name(&self) -> &'static str;
}

pub type DynClassifier = Arc<dyn SentimentClassifier>;

/// Factory: build the configured provider, wrapped in a daily budget when one is set.
pub fn build_classifier(cfg: &AiConfig) -> DynClassifier {
    let http = default_http_client();
    match cfg.provider {
        AiProvider::Gemini => wrap_budget(
            GeminiClassifier::new(http, &cfg.api_base, &cfg.api_key, &cfg.model),
            cfg.daily_limit,
        ),
        AiProvider::OpenAi => wrap_budget(
            ChatCompletionsClassifier::openai(http, &cfg.api_base, &cfg.api_key, &cfg.model),
            cfg.daily_limit,
        ),
        AiProvider::Glm => wrap_budget(
            ChatCompletionsClassifier::glm(http, &cfg.api_base, &cfg.api_key, &cfg.model),
            cfg.daily_limit,
        ),
    }
}

fn wrap_budget<C: SentimentClassifier + 'static>(inner: C, daily_limit: u32) -> DynClassifier {
    if daily_limit == 0 {
        Arc::new(inner)
    } else {
        Arc::new(BudgetedClassifier::new(inner, daily_limit))
    }
}

fn default_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(concat!("feed-sentiment-relay/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(45))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

// ------------------------------------------------------------
// Prompt + response parsing
// ------------------------------------------------------------

/// Fill the sentiment prompt. Author and content are inserted in one pass, so
/// placeholder-like text inside either is kept verbatim.
pub fn render_prompt(author: &str, content: &str) -> String {
    format!(
        r#"You are a financial sentiment analyst. Analyze this post and extract:
1. Tickers/symbols mentioned (crypto: $BTC, $ETH; stocks: NVDA, AAPL)
2. Sentiment: BUY, SELL, or NEUTRAL
3. Bull case (reasons to be long)
4. Bear case (reasons to be short/avoid)
5. Brief one-line summary

Author: {author}
Content: {content}

Return valid JSON only:
{{"tickers": ["BTC", "ETH"], "sentiment": "BUY", "bull_case": "...", "bear_case": "...", "summary": "..."}}"#
    )
}

#[derive(Debug, Deserialize)]
struct RawClassification {
    #[serde(default, alias = "symbols", alias = "ticker")]
    tickers: Vec<String>,
    #[serde(default, alias = "signal")]
    sentiment: Option<String>,
    #[serde(default, alias = "bull")]
    bull_case: Option<String>,
    #[serde(default, alias = "bear")]
    bear_case: Option<String>,
    #[serde(default)]
    summary: Option<String>,
}

/// Parse the model's text output. Tolerates Markdown code fences and prose around
/// the JSON object.
pub fn parse_classification(
    provider: &'static str,
    text: &str,
) -> Result<SentimentClassification, ClassificationError> {
    let body = extract_json_object(text).ok_or_else(|| ClassificationError::Malformed {
        provider,
        reason: "no JSON object in model output".to_string(),
    })?;
    let raw: RawClassification =
        serde_json::from_str(body).map_err(|e| ClassificationError::Malformed {
            provider,
            reason: e.to_string(),
        })?;

    Ok(SentimentClassification {
        symbols: normalize_tickers(&raw.tickers),
        signal: raw
            .sentiment
            .as_deref()
            .map_or(Signal::Neutral, Signal::parse_lenient),
        bull_case: sanitize_field(raw.bull_case.as_deref().unwrap_or_default()),
        bear_case: sanitize_field(raw.bear_case.as_deref().unwrap_or_default()),
        summary: sanitize_field(raw.summary.as_deref().unwrap_or_default()),
    })
}

fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

const MAX_FIELD_CHARS: usize = 600;

/// Single line, collapsed whitespace, at most 600 chars.
pub fn sanitize_field(input: &str) -> String {
    let mut out = String::with_capacity(input.len().min(MAX_FIELD_CHARS));
    let mut count = 0usize;
    for word in input.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
            count += 1;
        }
        for ch in word.chars() {
            if count >= MAX_FIELD_CHARS {
                return out.trim_end().to_string();
            }
            out.push(ch);
            count += 1;
        }
    }
    out
}

// ------------------------------------------------------------
// Concrete providers
// ------------------------------------------------------------

/// Google Gemini `generateContent` with a JSON response MIME type.
pub struct GeminiClassifier {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl GeminiClassifier {
    pub fn new(http: reqwest::Client, api_base: &str, api_key: &str, model: &str) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl SentimentClassifier for GeminiClassifier {
    async fn classify(
        &self,
        author: &str,
        content: &str,
    ) -> Result<SentimentClassification, ClassificationError> {
        #[derive(Serialize)]
        struct Part<'a> {
            text: &'a str,
        }
        #[derive(Serialize)]
        struct Content<'a> {
            parts: Vec<Part<'a>>,
        }
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct GenerationConfig {
            response_mime_type: &'static str,
            temperature: f32,
        }
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Req<'a> {
            contents: Vec<Content<'a>>,
            generation_config: GenerationConfig,
        }
        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            candidates: Vec<Candidate>,
        }
        #[derive(Deserialize)]
        struct Candidate {
            content: Option<RespContent>,
        }
        #[derive(Deserialize)]
        struct RespContent {
            #[serde(default)]
            parts: Vec<RespPart>,
        }
        #[derive(Deserialize)]
        struct RespPart {
            text: Option<String>,
        }

        const NAME: &str = "gemini";
        let prompt = render_prompt(author, content);
        let req = Req {
            contents: vec![Content {
                parts: vec![Part { text: &prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                temperature: 0.1,
            },
        };

        let url = format!("{}/models/{}:generateContent", self.api_base, self.model);
        let resp = self
            .http
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&req)
            .send()
            .await
            .map_err(|source| ClassificationError::Http {
                provider: NAME,
                source,
            })?;
        if !resp.status().is_success() {
            return Err(ClassificationError::Status {
                provider: NAME,
                status: resp.status().as_u16(),
            });
        }
        let body: Resp = resp.json().await.map_err(|e| ClassificationError::Malformed {
            provider: NAME,
            reason: e.to_string(),
        })?;

        let text: String = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        parse_classification(NAME, &text)
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}

/// OpenAI-style `/chat/completions` in JSON mode. Serves OpenAI and Z.ai GLM.
pub struct ChatCompletionsClassifier {
    name: &'static str,
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl ChatCompletionsClassifier {
    pub fn openai(http: reqwest::Client, api_base: &str, api_key: &str, model: &str) -> Self {
        Self::named("openai", http, api_base, api_key, model)
    }

    pub fn glm(http: reqwest::Client, api_base: &str, api_key: &str, model: &str) -> Self {
        Self::named("glm", http, api_base, api_key, model)
    }

    fn named(
        name: &'static str,
        http: reqwest::Client,
        api_base: &str,
        api_key: &str,
        model: &str,
    ) -> Self {
        Self {
            name,
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl SentimentClassifier for ChatCompletionsClassifier {
    async fn classify(
        &self,
        author: &str,
        content: &str,
    ) -> Result<SentimentClassification, ClassificationError> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct ResponseFormat {
            #[serde(rename = "type")]
            kind: &'static str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            response_format: ResponseFormat,
        }
        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            #[serde(default)]
            content: Option<String>,
        }

        let prompt = render_prompt(author, content);
        let req = Req {
            model: &self.model,
            messages: vec![Msg {
                role: "user",
                content: &prompt,
            }],
            temperature: 0.1,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|source| ClassificationError::Http {
                provider: self.name,
                source,
            })?;
        if !resp.status().is_success() {
            return Err(ClassificationError::Status {
                provider: self.name,
                status: resp.status().as_u16(),
            });
        }
        let body: Resp = resp.json().await.map_err(|e| ClassificationError::Malformed {
            provider: self.name,
            reason: e.to_string(),
        })?;
        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        parse_classification(self.name, &text)
    }

    fn provider_name(&self) -> &'static str {
        self.name
    }
}

// ------------------------------------------------------------
// Daily budget wrapper
// ------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct DailyCounter {
    date: NaiveDate,
    count: u32,
}

/// Caps successful provider calls per UTC day. Failed calls do not count.
pub struct BudgetedClassifier<C> {
    inner: C,
    daily_limit: u32,
    counter: Mutex<DailyCounter>,
}

impl<C: SentimentClassifier> BudgetedClassifier<C> {
    pub fn new(inner: C, daily_limit: u32) -> Self {
        Self {
            inner,
            daily_limit,
            counter: Mutex::new(DailyCounter {
                date: Utc::now().date_naive(),
                count: 0,
            }),
        }
    }

    pub fn used_today(&self) -> u32 {
        let g = self.counter.lock().expect("poisoned counter");
        if g.date == Utc::now().date_naive() {
            g.count
        } else {
            0
        }
    }
}

#[async_trait]
impl<C: SentimentClassifier> SentimentClassifier for BudgetedClassifier<C> {
    async fn classify(
        &self,
        author: &str,
        content: &str,
    ) -> Result<SentimentClassification, ClassificationError> {
        {
            let mut g = self.counter.lock().expect("poisoned counter");
            let today = Utc::now().date_naive();
            if g.date != today {
                *g = DailyCounter {
                    date: today,
                    count: 0,
                };
            }
            if g.count >= self.daily_limit {
                return Err(ClassificationError::BudgetExhausted {
                    limit: self.daily_limit,
                });
            }
        }

        let out = self.inner.classify(author, content).await?;
        let mut g = self.counter.lock().expect("poisoned counter");
        g.count = g.count.saturating_add(1);
        Ok(out)
    }

    fn provider_name(&self) -> &'static str {
        self.inner.provider_name()
    }
}
