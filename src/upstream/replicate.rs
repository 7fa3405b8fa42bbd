use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::{ensure_success, UpstreamError};
use crate::config::ReplicateConfig;

const PROVIDER: &str = "Replicate";
pub const STYLE_SUFFIX: &str = ", fantasy art, digital painting, detailed";

/// Parameters of one image generation job. Everything but the prompt goes to
/// the provider exactly as the client sent it.
#[derive(Debug, Clone)]
pub struct ImageJob<'a> {
    pub prompt: &'a str,
    pub negative_prompt: &'a Value,
    pub width: &'a Value,
    pub height: &'a Value,
    pub steps: &'a Value,
}

#[derive(Serialize)]
struct PredictionBody<'a> {
    version: &'a str,
    input: PredictionInput<'a>,
}

#[derive(Serialize)]
struct PredictionInput<'a> {
    prompt: String,
    negative_prompt: &'a Value,
    width: &'a Value,
    height: &'a Value,
    num_outputs: u32,
    num_inference_steps: &'a Value,
}

#[derive(Debug, Deserialize)]
pub struct Prediction {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

pub async fn submit_prediction(
    client: &reqwest::Client,
    cfg: &ReplicateConfig,
    job: &ImageJob<'_>,
) -> Result<Prediction, UpstreamError> {
    let url = format!("{}/v1/predictions", cfg.base_url);
    let body = PredictionBody {
        version: &cfg.version,
        input: PredictionInput {
            prompt: format!("{}{STYLE_SUFFIX}", job.prompt),
            negative_prompt: job.negative_prompt,
            width: job.width,
            height: job.height,
            num_outputs: 1,
            num_inference_steps: job.steps,
        },
    };

    let response = client
        .post(url)
        .header(AUTHORIZATION, format!("Token {}", cfg.api_token))
        .json(&body)
        .send()
        .await?;
    let response = ensure_success(PROVIDER, response).await?;

    let prediction: Prediction = response.json().await?;
    info!(
        id = prediction.id.as_deref().unwrap_or("-"),
        status = prediction.status.as_deref().unwrap_or("-"),
        "prediction submitted"
    );
    Ok(prediction)
}
