use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One conversation entry, kept exactly as the client sent it so it can be
/// relayed to a chat-completion provider untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatMessage(pub Value);

impl ChatMessage {
    pub fn role(&self) -> &str {
        self.text_field("role")
    }

    /// Text content; empty when missing, null or not a string.
    pub fn content(&self) -> &str {
        self.text_field("content")
    }

    fn text_field(&self, key: &str) -> &str {
        self.0.get(key).and_then(Value::as_str).unwrap_or("")
    }
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> u32 {
    300
}

#[derive(Debug, Deserialize)]
pub struct GenerationRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl GenerationRequest {
    pub fn last_content(&self) -> &str {
        self.messages
            .last()
            .map(ChatMessage::content)
            .unwrap_or("")
    }
}

/// Chat-completion shaped reply.
///
/// `extra` holds whatever else an upstream provider sent, so a relayed
/// completion keeps its `id`, `usage` and friends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatChoice>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChoice {
    pub message: ChoiceMessage,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceMessage {
    pub content: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChatResponse {
    pub fn from_content(content: impl Into<String>) -> Self {
        Self {
            choices: vec![ChatChoice {
                message: ChoiceMessage {
                    content: content.into(),
                    extra: Map::new(),
                },
                extra: Map::new(),
            }],
            extra: Map::new(),
        }
    }

    pub fn content(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content.as_str())
    }
}

fn default_negative_prompt() -> Value {
    Value::from("")
}

fn default_width() -> Value {
    Value::from(512)
}

fn default_height() -> Value {
    Value::from(384)
}

fn default_steps() -> Value {
    Value::from(20)
}

/// Image generation parameters. Everything except the prompt is relayed to the
/// provider as sent, so no type is imposed on it here.
#[derive(Debug, Deserialize)]
pub struct ImageRequest {
    #[serde(default)]
    pub prompt: Value,
    #[serde(default = "default_negative_prompt")]
    pub negative_prompt: Value,
    #[serde(default = "default_width")]
    pub width: Value,
    #[serde(default = "default_height")]
    pub height: Value,
    #[serde(default = "default_steps")]
    pub steps: Value,
}

impl ImageRequest {
    /// Prompt text, or `None` when the prompt is missing or falsy
    /// (null, `""`, `false`, `0`).
    pub fn prompt_text(&self) -> Option<String> {
        match &self.prompt {
            Value::Null | Value::Bool(false) => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            Value::Number(n) if n.as_f64() == Some(0.0) => None,
            other => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageResponse {
    pub images: Vec<String>,
    pub info: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub version: &'static str,
    pub environment: String,
    pub endpoints: EndpointStatus,
    #[serde(rename = "node_version")]
    pub runtime_version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct EndpointStatus {
    pub sd_proxy: &'static str,
    pub llm_proxy: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
