// src/config/ai.rs
use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiProvider {
    Gemini,
    OpenAi,
    /// Z.ai GLM, OpenAI-compatible chat completions.
    Glm,
}

impl AiProvider {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Some(Self::Gemini),
            "openai" => Some(Self::OpenAi),
            "glm" | "zai" | "z.ai" => Some(Self::Glm),
            _ => None,
        }
    }

    pub fn key_var(self) -> &'static str {
        match self {
            Self::Gemini => "GEMINI_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Glm => "GLM_API_KEY",
        }
    }

    fn model_var(self) -> &'static str {
        match self {
            Self::Gemini => "GEMINI_MODEL",
            Self::OpenAi => "OPENAI_MODEL",
            Self::Glm => "GLM_MODEL",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Self::Gemini => "gemini-2.5-flash",
            Self::OpenAi => "gpt-4o-mini",
            Self::Glm => "glm-5",
        }
    }

    pub fn default_api_base(self) -> &'static str {
        match self {
            Self::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Glm => "https://api.z.ai/api/paas/v4",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AiConfig {
    pub provider: AiProvider,
    pub api_key: String,
    pub model: String,
    pub api_base: String,
    /// 0 disables the daily budget.
    pub daily_limit: u32,
}

impl AiConfig {
    /// Read `AI_PROVIDER` and the provider's key/model variables through `get`.
    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = match get("AI_PROVIDER") {
            Some(p) => AiProvider::parse(&p).ok_or_else(|| ConfigError::Invalid {
                key: "AI_PROVIDER",
                reason: format!("unsupported provider {p:?} (expected gemini, openai or glm)"),
            })?,
            None => AiProvider::Gemini,
        };

        let api_key = get(provider.key_var())
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::Missing(provider.key_var()))?;

        let model = get(provider.model_var())
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| provider.default_model().to_string());

        let api_base = get("AI_API_BASE")
            .filter(|b| !b.trim().is_empty())
            .unwrap_or_else(|| provider.default_api_base().to_string());

        let daily_limit = match get("AI_DAILY_LIMIT") {
            Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "AI_DAILY_LIMIT",
                reason: format!("{v:?} is not a non-negative integer"),
            })?,
            None => 0,
        };

        Ok(Self {
            provider,
            api_key,
            model,
            api_base,
            daily_limit,
        })
    }
}
