use reqwest::header::AUTHORIZATION;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::{ensure_success, UpstreamError};
use crate::api::types::{ChatMessage, ChatResponse, GenerationRequest};
use crate::config::OpenAiConfig;

const PROVIDER: &str = "OpenAI";

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
    max_tokens: u32,
}

/// Forwards the conversation to the chat-completions endpoint and relays the
/// completion as-is.
pub async fn chat_completion(
    client: &reqwest::Client,
    cfg: &OpenAiConfig,
    request: &GenerationRequest,
) -> Result<ChatResponse, UpstreamError> {
    let url = format!("{}/v1/chat/completions", cfg.base_url);
    let body = CompletionBody {
        model: &cfg.model,
        messages: &request.messages,
        temperature: request.temperature,
        max_tokens: request.max_tokens,
    };

    debug!(model = %cfg.model, messages = request.messages.len(), "forwarding chat completion");

    let response = client
        .post(url)
        .header(AUTHORIZATION, format!("Bearer {}", cfg.api_key))
        .json(&body)
        .send()
        .await?;
    let response = ensure_success(PROVIDER, response).await?;

    let raw: Value = response.json().await?;
    serde_json::from_value(raw).map_err(|e| UpstreamError::MalformedResponse {
        provider: PROVIDER,
        reason: e.to_string(),
    })
}
