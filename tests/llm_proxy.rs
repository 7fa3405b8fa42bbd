mod common;

use std::sync::{Arc, Mutex};

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use http::Method;
use serde_json::{json, Value};

use common::{app_with, body_json, json_request, send, spawn_mock};

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Option<(String, Value)>>>);

impl Captured {
    fn take(&self) -> (String, Value) {
        self.0.lock().unwrap().take().expect("upstream was not called")
    }
}

fn capture(captured: &Captured, headers: &HeaderMap, body: Value) {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    *captured.0.lock().unwrap() = Some((auth, body));
}

async fn mock_openai(
    State(captured): State<Captured>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    capture(&captured, &headers, body);
    Json(json!({
        "id": "chatcmpl-42",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": "The gate creaks open."},
            "finish_reason": "stop"
        }],
        "usage": {"total_tokens": 17}
    }))
}

async fn mock_huggingface(
    State(captured): State<Captured>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    capture(&captured, &headers, body);
    Json(json!([{"generated_text": "A raven answers."}]))
}

async fn mock_unavailable() -> (StatusCode, &'static str) {
    (StatusCode::SERVICE_UNAVAILABLE, "overloaded")
}

const HELLO: &str = r#"{"messages":[{"role":"user","content":"Hello"}]}"#;

fn local_templates(last: &str) -> Vec<String> {
    vec![
        format!(
            "В мире снов вы видите: \"{last}...\". Вы чувствуете магию вокруг. Что вы хотите сделать?"
        ),
        format!(
            "\"{last}...\" - интересный выбор. Вы можете: 1. Исследовать дальше 2. Осмотреться 3. Искать подсказки"
        ),
        format!(
            "В ответ на ваше действие \"{last}...\" мир снов отвечает загадкой. Продолжайте ваше путешествие!"
        ),
    ]
}

#[tokio::test]
async fn local_fallback_answers_with_a_template() {
    let app = app_with(&[]);

    let response = send(app, json_request(Method::POST, "/llm-proxy", HELLO)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let choices = body["choices"].as_array().unwrap();
    assert_eq!(choices.len(), 1);
    let content = choices[0]["message"]["content"].as_str().unwrap();
    assert!(local_templates("Hello").iter().any(|t| t == content), "{content}");
    assert_eq!(
        body,
        json!({"choices": [{"message": {"content": content}}]})
    );
}

#[tokio::test]
async fn local_fallback_handles_empty_conversation() {
    let app = app_with(&[]);

    let response = send(app, json_request(Method::POST, "/llm-proxy", r#"{"messages":[]}"#)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let content = body["choices"][0]["message"]["content"].as_str().unwrap();
    assert!(local_templates("").iter().any(|t| t == content), "{content}");
}

#[tokio::test]
async fn local_fallback_tolerates_loose_messages() {
    for (body, last) in [
        (r#"{"messages":[{"content":"Hello"}]}"#, "Hello"),
        (r#"{"messages":[{"role":"user","content":null}]}"#, ""),
        (r#"{"messages":[{"role":"user","content":[{"type":"text"}]}]}"#, ""),
    ] {
        let app = app_with(&[]);

        let response = send(app, json_request(Method::POST, "/llm-proxy", body)).await;

        assert_eq!(response.status(), StatusCode::OK, "{body}");
        let reply = body_json(response).await;
        let content = reply["choices"][0]["message"]["content"].as_str().unwrap();
        assert!(local_templates(last).iter().any(|t| t == content), "{body}: {content}");
    }
}

#[tokio::test]
async fn wrong_method_is_rejected() {
    let app = app_with(&[]);

    let response = send(app, json_request(Method::GET, "/llm-proxy", "")).await;

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body_json(response).await, json!({"error": "Method not allowed"}));
}

#[tokio::test]
async fn malformed_body_degrades_to_apology() {
    let app = app_with(&[]);

    let response = send(app, json_request(Method::POST, "/llm-proxy", "{not json")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let content = body["choices"][0]["message"]["content"].as_str().unwrap();
    assert!(content.starts_with("Я временно недоступен (ошибка: invalid request body"));
}

#[tokio::test]
async fn chat_completion_is_forwarded_and_relayed() {
    let captured = Captured::default();
    let upstream = Router::new()
        .route("/v1/chat/completions", post(mock_openai))
        .with_state(captured.clone());
    let base = spawn_mock(upstream).await;
    let app = app_with(&[
        ("OPENAI_API_KEY", "sk-test"),
        ("OPENAI_BASE_URL", base.as_str()),
        ("HF_API_KEY", "ignored"),
    ]);

    let response = send(
        app,
        json_request(
            Method::POST,
            "/llm-proxy",
            r#"{"messages":[{"role":"user","content":"Open the gate"}],"temperature":0.2}"#,
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["id"], "chatcmpl-42");
    assert_eq!(body["usage"]["total_tokens"], 17);
    assert_eq!(body["choices"][0]["message"]["content"], "The gate creaks open.");

    let (auth, sent) = captured.take();
    assert_eq!(auth, "Bearer sk-test");
    assert_eq!(sent["model"], "gpt-3.5-turbo");
    assert_eq!(sent["temperature"], 0.2);
    assert_eq!(sent["max_tokens"], 300);
    assert_eq!(sent["messages"][0]["content"], "Open the gate");
}

#[tokio::test]
async fn chat_completion_forwards_messages_unchanged() {
    let captured = Captured::default();
    let upstream = Router::new()
        .route("/v1/chat/completions", post(mock_openai))
        .with_state(captured.clone());
    let base = spawn_mock(upstream).await;
    let app = app_with(&[("OPENAI_API_KEY", "sk-test"), ("OPENAI_BASE_URL", base.as_str())]);
    let messages = json!([
        {"role": "system", "content": "Narrate"},
        {"role": "user", "name": "ann", "content": [{"type": "text", "text": "Look"}]}
    ]);
    let body = json!({ "messages": messages.clone() }).to_string();

    let response = send(app, json_request(Method::POST, "/llm-proxy", &body)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let (_, sent) = captured.take();
    assert_eq!(sent["messages"], messages);
}

#[tokio::test]
async fn inference_provider_receives_transcript() {
    let captured = Captured::default();
    let upstream = Router::new()
        .route("/models/microsoft/DialoGPT-medium", post(mock_huggingface))
        .with_state(captured.clone());
    let base = spawn_mock(upstream).await;
    let app = app_with(&[("HF_API_KEY", "hf-test"), ("HF_BASE_URL", base.as_str())]);

    let response = send(
        app,
        json_request(
            Method::POST,
            "/api/llm-proxy",
            r#"{"messages":[{"role":"system","content":"Narrate"},{"role":"user","content":"Knock"}],"max_tokens":64}"#,
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"choices": [{"message": {"content": "A raven answers."}}]})
    );

    let (auth, sent) = captured.take();
    assert_eq!(auth, "Bearer hf-test");
    assert_eq!(sent["inputs"], "system: Narrate\nuser: Knock\nassistant:");
    assert_eq!(sent["parameters"]["max_length"], 64);
    assert_eq!(sent["parameters"]["temperature"], 0.7);
    assert_eq!(sent["parameters"]["return_full_text"], false);
}

#[tokio::test]
async fn upstream_error_status_degrades_to_apology() {
    let upstream = Router::new().route("/v1/chat/completions", post(mock_unavailable));
    let base = spawn_mock(upstream).await;
    let app = app_with(&[("OPENAI_API_KEY", "sk-test"), ("OPENAI_BASE_URL", base.as_str())]);

    let response = send(app, json_request(Method::POST, "/llm-proxy", HELLO)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(
        body["choices"][0]["message"]["content"],
        "Я временно недоступен (ошибка: OpenAI API error: 503). Но игра продолжается! \
         Вы можете: 1. Исследовать мир 2. Проверить инвентарь 3. Отдохнуть"
    );
}

#[tokio::test]
async fn unreachable_upstream_degrades_to_apology() {
    let app = app_with(&[("HF_API_KEY", "hf-test"), ("HF_BASE_URL", "http://127.0.0.1:1")]);

    let response = send(app, json_request(Method::POST, "/llm-proxy", HELLO)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let content = body["choices"][0]["message"]["content"].as_str().unwrap();
    assert!(content.starts_with("Я временно недоступен (ошибка: "));
}
