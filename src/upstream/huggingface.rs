use reqwest::header::AUTHORIZATION;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::{ensure_success, UpstreamError};
use crate::api::types::{ChatMessage, ChatResponse, GenerationRequest};
use crate::config::HuggingFaceConfig;
use crate::fallback::NO_MODEL_RESPONSE;

const PROVIDER: &str = "Hugging Face";

#[derive(Serialize)]
struct InferenceBody {
    inputs: String,
    parameters: InferenceParameters,
}

#[derive(Serialize)]
struct InferenceParameters {
    max_length: u32,
    temperature: f64,
    return_full_text: bool,
}

/// Flattens a conversation into `role: content` lines followed by an
/// `assistant:` cue. Missing or non-text fields render as empty.
pub fn transcript(messages: &[ChatMessage]) -> String {
    let mut out = messages
        .iter()
        .map(|m| format!("{}: {}", m.role(), m.content()))
        .collect::<Vec<_>>()
        .join("\n");
    out.push_str("\nassistant:");
    out
}

pub async fn text_generation(
    client: &reqwest::Client,
    cfg: &HuggingFaceConfig,
    request: &GenerationRequest,
) -> Result<ChatResponse, UpstreamError> {
    let url = format!("{}/models/{}", cfg.base_url, cfg.model);
    let body = InferenceBody {
        inputs: transcript(&request.messages),
        parameters: InferenceParameters {
            max_length: request.max_tokens,
            temperature: request.temperature,
            return_full_text: false,
        },
    };

    debug!(model = %cfg.model, "forwarding text generation");

    let response = client
        .post(url)
        .header(AUTHORIZATION, format!("Bearer {}", cfg.api_key))
        .json(&body)
        .send()
        .await?;
    let response = ensure_success(PROVIDER, response).await?;

    let raw: Value = response.json().await?;
    Ok(ChatResponse::from_content(generated_text(&raw)))
}

fn generated_text(raw: &Value) -> &str {
    raw.get(0)
        .and_then(|first| first.get("generated_text"))
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .unwrap_or(NO_MODEL_RESPONSE)
}
