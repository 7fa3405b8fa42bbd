use std::time::Duration;

use anyhow::{Context, Result};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_HF_BASE_URL: &str = "https://api-inference.huggingface.co";
pub const DEFAULT_HF_MODEL: &str = "microsoft/DialoGPT-medium";
pub const DEFAULT_REPLICATE_BASE_URL: &str = "https://api.replicate.com";
pub const DEFAULT_REPLICATE_VERSION: &str =
    "stability-ai/stable-diffusion:ac732df83cea7fff18b8472768c88ad041fa750ff7682a21affe81863cbe77e4";
const DEFAULT_SETTLE_MS: u64 = 5_000;

/// Runtime configuration, resolved once at startup and shared read-only by
/// every handler.
///
/// Provider credentials act as feature flags: whichever is present decides the
/// code path a proxy takes. Empty values count as unset.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub llm: LlmProvider,
    pub image: ImageProvider,
}

#[derive(Debug, Clone)]
pub enum LlmProvider {
    OpenAi(OpenAiConfig),
    HuggingFace(HuggingFaceConfig),
    Local,
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct HuggingFaceConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub enum ImageProvider {
    Replicate(ReplicateConfig),
    Placeholder,
}

#[derive(Debug, Clone)]
pub struct ReplicateConfig {
    pub api_token: String,
    pub base_url: String,
    pub version: String,
    /// Fixed wait after a prediction is submitted. The prediction is not polled.
    pub settle_delay: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| dotenvy::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match var("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("invalid PORT value `{raw}`"))?,
            None => 3000,
        };

        let environment = var("APP_ENV")
            .or_else(|| var("NODE_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let llm = if let Some(api_key) = var("OPENAI_API_KEY") {
            LlmProvider::OpenAi(OpenAiConfig {
                api_key,
                base_url: base_url(var("OPENAI_BASE_URL"), DEFAULT_OPENAI_BASE_URL),
                model: var("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            })
        } else if let Some(api_key) = var("HF_API_KEY") {
            LlmProvider::HuggingFace(HuggingFaceConfig {
                api_key,
                base_url: base_url(var("HF_BASE_URL"), DEFAULT_HF_BASE_URL),
                model: var("HF_MODEL").unwrap_or_else(|| DEFAULT_HF_MODEL.to_string()),
            })
        } else {
            LlmProvider::Local
        };

        let image = match var("REPLICATE_API_TOKEN") {
            Some(api_token) => {
                let settle_ms = match var("REPLICATE_SETTLE_MS") {
                    Some(raw) => raw
                        .parse::<u64>()
                        .with_context(|| format!("invalid REPLICATE_SETTLE_MS value `{raw}`"))?,
                    None => DEFAULT_SETTLE_MS,
                };
                ImageProvider::Replicate(ReplicateConfig {
                    api_token,
                    base_url: base_url(var("REPLICATE_BASE_URL"), DEFAULT_REPLICATE_BASE_URL),
                    version: var("REPLICATE_MODEL_VERSION")
                        .unwrap_or_else(|| DEFAULT_REPLICATE_VERSION.to_string()),
                    settle_delay: Duration::from_millis(settle_ms),
                })
            }
            None => ImageProvider::Placeholder,
        };

        Ok(Self {
            host,
            port,
            environment,
            llm,
            image,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl LlmProvider {
    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenAi(_) => "openai",
            Self::HuggingFace(_) => "huggingface",
            Self::Local => "local",
        }
    }

    pub fn is_configured(&self) -> bool {
        !matches!(self, Self::Local)
    }
}

impl ImageProvider {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Replicate(_) => "replicate",
            Self::Placeholder => "placeholder",
        }
    }

    pub fn is_configured(&self) -> bool {
        !matches!(self, Self::Placeholder)
    }
}

fn base_url(value: Option<String>, default: &str) -> String {
    value
        .unwrap_or_else(|| default.to_string())
        .trim_end_matches('/')
        .to_string()
}
