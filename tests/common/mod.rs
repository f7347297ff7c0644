#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::Query;
use axum::http::{Request, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tempfile::TempDir;

use vocab_trainer::services::llm_provider::{LLMConfig, LLMProvider};
use vocab_trainer::services::narrator::Narrator;
use vocab_trainer::services::translator::{GoogleTranslator, TranslatorConfig};
use vocab_trainer::services::word_store::WordStore;
use vocab_trainer::state::AppState;

pub struct Silent;

impl Narrator for Silent {
    fn speak(&self, _text: &str, _language: Option<&str>) {}
}

/// App over a temporary word-list directory, without a language model and
/// with a translator pointed at a closed local port.
pub fn create_test_app(files: &[(&str, &str)]) -> (Router, TempDir) {
    build_app(files, None, "http://127.0.0.1:9/translate_a/single".to_string())
}

/// App whose language model and translator are served by [`spawn_backend`].
pub async fn create_test_app_with_model(files: &[(&str, &str)]) -> (Router, TempDir) {
    let addr = spawn_backend().await;
    build_app(
        files,
        Some(provider_for(addr)),
        format!("http://{addr}/translate_a/single"),
    )
}

pub fn provider_for(addr: SocketAddr) -> LLMProvider {
    LLMProvider::new(LLMConfig {
        api_key: None,
        model: "test-model".to_string(),
        api_endpoint: format!("http://{addr}/v1"),
        timeout: Duration::from_secs(5),
        autostart_command: None,
    })
}

fn build_app(files: &[(&str, &str)], llm: Option<LLMProvider>, translate_endpoint: String) -> (Router, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    for (name, content) in files {
        std::fs::write(dir.path().join(name), content).unwrap();
    }

    let translator = GoogleTranslator::new(TranslatorConfig {
        endpoint: translate_endpoint,
        timeout: Duration::from_millis(500),
    });
    let state = AppState::new(
        WordStore::new(dir.path()),
        llm,
        translator,
        Arc::new(Silent),
        50,
    );

    (vocab_trainer::create_app(state), dir)
}

/// Local OpenAI-compatible model server plus a translation endpoint that
/// upper-cases its input. Replies are chosen by the kind of prompt:
/// filters keep capitalised words (plus one invented word), judgements
/// are SAME only for "automobile", alternatives and sentences are fixed.
pub async fn spawn_backend() -> SocketAddr {
    let router = Router::new()
        .route("/v1/models", get(|| async { Json(json!({ "object": "list", "data": [] })) }))
        .route("/v1/chat/completions", post(chat_completions))
        .route("/translate_a/single", get(translate));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

async fn chat_completions(Json(body): Json<Value>) -> Json<Value> {
    let prompt = body["messages"][0]["content"].as_str().unwrap_or_default();
    Json(json!({
        "model": "test-model",
        "choices": [
            { "message": { "role": "assistant", "content": reply_for(prompt) } }
        ]
    }))
}

fn reply_for(prompt: &str) -> String {
    if prompt.starts_with("Here is a list of") {
        let words = prompt.lines().nth(1).unwrap_or_default();
        let mut hits: Vec<&str> = words
            .split("; ")
            .filter(|w| w.chars().next().is_some_and(char::is_uppercase))
            .collect();
        hits.push("Zebra");
        hits.join("; ")
    } else if prompt.starts_with("Compare the expression") {
        if prompt.contains("'automobile'") { "SAME" } else { "DIFFERENT" }.to_string()
    } else if prompt.starts_with("List up to") {
        "Home; Building; house; home".to_string()
    } else if prompt.starts_with("Create a simple sentence") {
        "\"Das Haus ist alt\"\nThis sentence uses the word Haus.".to_string()
    } else {
        String::new()
    }
}

async fn translate(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let text = params.get("q").cloned().unwrap_or_default();
    Json(json!([[[text.to_uppercase(), text, null, null]], null, "de"]))
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
