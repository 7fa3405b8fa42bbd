//! Clients for the third-party generation providers.
//!
//! Every failure surfaces as [`UpstreamError`]; the HTTP handlers decide how to
//! degrade it into a reply.

use thiserror::Error;
use tracing::error;

pub mod huggingface;
pub mod openai;
pub mod replicate;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("invalid request body: {0}")]
    InvalidBody(#[from] serde_json::Error),
    #[error("{provider} API error: {status}")]
    Status { provider: &'static str, status: u16 },
    #[error("{provider} returned a malformed response: {reason}")]
    MalformedResponse {
        provider: &'static str,
        reason: String,
    },
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// Passes a successful response through; otherwise logs the upstream body and
/// turns the status into an error.
pub(crate) async fn ensure_success(
    provider: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, UpstreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    error!(provider, status = status.as_u16(), %body, "upstream request rejected");

    Err(UpstreamError::Status {
        provider,
        status: status.as_u16(),
    })
}
