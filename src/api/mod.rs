use axum::{
    extract::Request,
    http::{header, Method},
    routing::any,
    Router,
};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info_span;
use uuid::Uuid;

use crate::state::AppState;

pub mod handlers;
pub mod types;

/// Builds the application router.
///
/// Endpoints are served both at the root and under `/api`.
pub fn router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http().make_span_with(|request: &Request| {
        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        info_span!(
            "http_request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id
        )
    });

    let endpoints = Router::new()
        .route(
            "/health",
            any(handlers::health).layer(cors(&[Method::GET, Method::OPTIONS])),
        )
        .route(
            "/llm-proxy",
            any(handlers::llm_proxy).layer(cors(&[Method::POST, Method::OPTIONS])),
        )
        .route(
            "/sd-proxy",
            any(handlers::sd_proxy).layer(cors(&[Method::POST, Method::OPTIONS])),
        );

    Router::new()
        .merge(endpoints.clone())
        .nest("/api", endpoints)
        .fallback(handlers::not_found)
        .layer(trace_layer)
        .with_state(state)
}

/// Per-route CORS: any origin, the route's own methods, JSON bodies.
fn cors(methods: &[Method]) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(AllowMethods::list(methods.iter().cloned()))
        .allow_headers(AllowHeaders::list([header::CONTENT_TYPE]))
}
