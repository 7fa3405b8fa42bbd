use axum::{
    body::Bytes,
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use tracing::{error, info, warn};

use crate::{
    api::types::{
        ChatResponse, EndpointStatus, ErrorResponse, GenerationRequest, HealthResponse,
        ImageRequest, ImageResponse,
    },
    config::{ImageProvider, LlmProvider},
    fallback,
    state::AppState,
    upstream::{
        huggingface, openai,
        replicate::{self, ImageJob},
        UpstreamError,
    },
};

const RUNTIME_VERSION: &str = env!("RUSTC_VERSION");

// ------------------------------------------------------------
// HEALTH
// ------------------------------------------------------------
pub async fn health(State(state): State<AppState>, method: Method) -> Response {
    // Routed preflights are answered by the CORS layer; this covers direct calls.
    if method == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }

    Json(health_report(&state)).into_response()
}

pub fn health_report(state: &AppState) -> HealthResponse {
    HealthResponse {
        status: "online",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.environment.clone(),
        endpoints: EndpointStatus {
            sd_proxy: endpoint_status(state.config.image.is_configured()),
            llm_proxy: endpoint_status(state.config.llm.is_configured()),
        },
        runtime_version: RUNTIME_VERSION,
    }
}

fn endpoint_status(configured: bool) -> &'static str {
    if configured {
        "configured"
    } else {
        "fallback"
    }
}

// ------------------------------------------------------------
// LLM PROXY
// ------------------------------------------------------------
pub async fn llm_proxy(State(state): State<AppState>, method: Method, body: Bytes) -> Response {
    if let Some(early) = preflight_or_reject(&method) {
        return early;
    }

    let result = generate_reply(&state, &body).await;
    (StatusCode::OK, Json(into_chat_reply(result))).into_response()
}

async fn generate_reply(state: &AppState, body: &[u8]) -> Result<ChatResponse, UpstreamError> {
    let request: GenerationRequest = serde_json::from_slice(body)?;

    match &state.config.llm {
        LlmProvider::OpenAi(cfg) => openai::chat_completion(&state.http, cfg, &request).await,
        LlmProvider::HuggingFace(cfg) => {
            huggingface::text_generation(&state.http, cfg, &request).await
        }
        LlmProvider::Local => Ok(ChatResponse::from_content(fallback::local_reply(
            request.last_content(),
        ))),
    }
}

/// Callers of the LLM proxy always get a well-formed reply: a failed
/// generation becomes an apology carrying the error summary.
pub fn into_chat_reply(result: Result<ChatResponse, UpstreamError>) -> ChatResponse {
    result.unwrap_or_else(|err| {
        error!(error = %err, "llm proxy degraded to apology");
        ChatResponse::from_content(fallback::apology(&err.to_string()))
    })
}

// ------------------------------------------------------------
// IMAGE PROXY
// ------------------------------------------------------------
pub async fn sd_proxy(State(state): State<AppState>, method: Method, body: Bytes) -> Response {
    if let Some(early) = preflight_or_reject(&method) {
        return early;
    }

    let request: ImageRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            let reply = into_image_reply(Err(err.into()));
            return (StatusCode::OK, Json(reply)).into_response();
        }
    };

    let Some(prompt) = request.prompt_text() else {
        return error_response(StatusCode::BAD_REQUEST, "Prompt is required");
    };

    let job = ImageJob {
        prompt: &prompt,
        negative_prompt: &request.negative_prompt,
        width: &request.width,
        height: &request.height,
        steps: &request.steps,
    };

    let result = generate_image(&state, &job).await;
    (StatusCode::OK, Json(into_image_reply(result))).into_response()
}

async fn generate_image(
    state: &AppState,
    job: &ImageJob<'_>,
) -> Result<ImageResponse, UpstreamError> {
    match &state.config.image {
        ImageProvider::Replicate(cfg) => {
            replicate::submit_prediction(&state.http, cfg, job).await?;

            // TODO: poll GET /v1/predictions/{id} until it settles and return the
            // real output instead of sleeping and answering with the placeholder.
            warn!(
                delay_ms = (cfg.settle_delay.as_millis() as u64),
                "prediction output is not retrieved; answering with placeholder"
            );
            tokio::time::sleep(cfg.settle_delay).await;

            Ok(placeholder(fallback::INFO_GENERATED.to_string()))
        }
        ImageProvider::Placeholder => {
            info!("no image provider configured; answering with placeholder");
            Ok(placeholder(fallback::INFO_UNCONFIGURED.to_string()))
        }
    }
}

/// Callers of the image proxy always get exactly one image: on failure the
/// placeholder, with the error summary in `info`.
pub fn into_image_reply(result: Result<ImageResponse, UpstreamError>) -> ImageResponse {
    result.unwrap_or_else(|err| {
        error!(error = %err, "sd proxy degraded to placeholder");
        placeholder(fallback::image_failed_info(&err.to_string()))
    })
}

fn placeholder(info: String) -> ImageResponse {
    ImageResponse {
        images: vec![fallback::PLACEHOLDER_IMAGE.clone()],
        info,
    }
}

// ------------------------------------------------------------
// SHARED
// ------------------------------------------------------------
fn preflight_or_reject(method: &Method) -> Option<Response> {
    match *method {
        Method::POST => None,
        // Only reached when the handler is called outside the CORS layer.
        Method::OPTIONS => Some(StatusCode::OK.into_response()),
        _ => Some(error_response(
            StatusCode::METHOD_NOT_ALLOWED,
            "Method not allowed",
        )),
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

pub async fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}
