use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{info, warn};

const DEFAULT_MODEL: &str = "llama3.2";
const DEFAULT_API_ENDPOINT: &str = "http://localhost:11434/v1";
const DEFAULT_TIMEOUT_MS: u64 = 60_000;
const MAX_RETRIES: usize = 1;
const BASE_BACKOFF_MS: u64 = 200;
const READY_ATTEMPTS: u32 = 10;
const READY_INTERVAL_MS: u64 = 500;

#[derive(Debug, Clone)]
pub struct LLMConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_endpoint: String,
    pub timeout: Duration,
    pub autostart_command: Option<String>,
}

/// Sampling parameters for a single completion.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub stop: Vec<String>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_tokens: None,
            stop: Vec::new(),
        }
    }
}

impl GenerationParams {
    pub fn with_temperature(temperature: f32) -> Self {
        Self {
            temperature,
            ..Self::default()
        }
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn stop_at(mut self, stop: impl Into<String>) -> Self {
        self.stop.push(stop.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub model: Option<String>,
    pub choices: Vec<ChatChoice>,
}

impl ChatResponse {
    pub fn first_content(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

#[derive(Debug, Error)]
pub enum LLMError {
    #[error("LLM not configured: {0}")]
    NotConfigured(&'static str),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: reqwest::StatusCode, body: String },
    #[error("JSON decode failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("empty response")]
    EmptyChoices,
    #[error("model server unavailable at {0}")]
    Unavailable(String),
}

/// A text-generation backend. Calls are awaited one at a time by callers.
pub trait LanguageModel {
    fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> impl Future<Output = Result<String, LLMError>> + Send;

    /// Makes sure the backend can answer requests. Backends without a
    /// server process have nothing to check.
    fn ensure_running(&self) -> impl Future<Output = Result<(), LLMError>> + Send {
        async { Ok(()) }
    }
}

#[derive(Clone)]
pub struct LLMProvider {
    config: LLMConfig,
    client: reqwest::Client,
}

impl LLMProvider {
    pub fn new(config: LLMConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { config, client }
    }

    pub fn from_env() -> Self {
        let api_key = env_string("LLM_API_KEY");
        let model = env_string("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_endpoint = normalize_endpoint(
            env_string("LLM_API_ENDPOINT")
                .or_else(|| env_string("LLM_BASE_URL"))
                .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string()),
        );
        let timeout = Duration::from_millis(env_u64("LLM_TIMEOUT").unwrap_or(DEFAULT_TIMEOUT_MS));
        let autostart_command = env_string("LLM_AUTOSTART_COMMAND");

        Self::new(LLMConfig {
            api_key,
            model,
            api_endpoint,
            timeout,
            autostart_command,
        })
    }

    /// Returns a provider only when `LLM_ENABLED` is set and the
    /// configuration is usable.
    pub fn from_env_if_enabled() -> Option<Self> {
        let enabled = std::env::var("LLM_ENABLED")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        if !enabled {
            return None;
        }
        let provider = Self::from_env();
        if provider.is_available() {
            Some(provider)
        } else {
            warn!("LLM_ENABLED is set but the model configuration is incomplete");
            None
        }
    }

    pub fn is_available(&self) -> bool {
        !self.config.model.trim().is_empty() && !self.config.api_endpoint.trim().is_empty()
    }

    pub async fn chat(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<ChatResponse, LLMError> {
        if !self.is_available() {
            return Err(LLMError::NotConfigured("LLM_MODEL"));
        }

        let url = format!("{}/chat/completions", self.config.api_endpoint.trim_end_matches('/'));
        let mut payload = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": params.temperature,
            "stream": false
        });
        if let Some(max_tokens) = params.max_tokens {
            payload["max_tokens"] = serde_json::json!(max_tokens);
        }
        if !params.stop.is_empty() {
            payload["stop"] = serde_json::json!(params.stop);
        }

        self.post_with_retry(&url, &payload).await
    }

    async fn post_with_retry(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> Result<ChatResponse, LLMError> {
        let mut last_error: Option<LLMError> = None;

        for retry in 0..=MAX_RETRIES {
            let mut request = self.client.post(url).json(payload);
            if let Some(key) = self.config.api_key.as_deref().filter(|v| !v.trim().is_empty()) {
                request = request.bearer_auth(key);
            }

            match request.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let bytes = resp.bytes().await?;
                        match serde_json::from_slice(&bytes) {
                            Ok(v) => return Ok(v),
                            Err(e) => {
                                let body_str = String::from_utf8_lossy(&bytes);
                                tracing::error!("Failed to parse LLM response JSON: {}. Body: {}", e, body_str);
                                return Err(LLMError::Json(e));
                            }
                        }
                    }
                    let body = resp.text().await.unwrap_or_default();
                    let err = LLMError::HttpStatus { status, body };
                    if retry < MAX_RETRIES && is_retryable(status) {
                        let backoff = Duration::from_millis(BASE_BACKOFF_MS * (1 << retry));
                        warn!(retry, ?status, "LLM request failed, retrying");
                        sleep(backoff).await;
                        last_error = Some(err);
                        continue;
                    }
                    return Err(err);
                }
                Err(e) => {
                    let err = LLMError::Request(e);
                    if retry < MAX_RETRIES {
                        let backoff = Duration::from_millis(BASE_BACKOFF_MS * (1 << retry));
                        warn!(retry, "LLM request error, retrying");
                        sleep(backoff).await;
                        last_error = Some(err);
                        continue;
                    }
                    return Err(err);
                }
            }
        }
        Err(last_error.unwrap_or(LLMError::NotConfigured("unknown")))
    }

    async fn is_reachable(&self) -> bool {
        let url = format!("{}/models", self.config.api_endpoint.trim_end_matches('/'));
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    fn spawn_server(&self, command: &str) -> std::io::Result<()> {
        let mut parts = command.split_whitespace();
        let Some(program) = parts.next() else {
            return Ok(());
        };
        tokio::process::Command::new(program)
            .args(parts)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(false)
            .spawn()
            .map(|_| ())
    }
}

impl LanguageModel for LLMProvider {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String, LLMError> {
        let messages = [ChatMessage {
            role: "user".into(),
            content: prompt.into(),
        }];
        let response = self.chat(&messages, params).await?;
        response
            .first_content()
            .map(|s| s.to_string())
            .ok_or(LLMError::EmptyChoices)
    }

    async fn ensure_running(&self) -> Result<(), LLMError> {
        if self.is_reachable().await {
            return Ok(());
        }

        let endpoint = self.config.api_endpoint.clone();
        let Some(command) = self.config.autostart_command.as_deref() else {
            return Err(LLMError::Unavailable(endpoint));
        };

        info!(%endpoint, command, "model server not reachable, starting it");
        if let Err(e) = self.spawn_server(command) {
            warn!(error = %e, command, "failed to start model server");
            return Err(LLMError::Unavailable(endpoint));
        }

        for _ in 0..READY_ATTEMPTS {
            sleep(Duration::from_millis(READY_INTERVAL_MS)).await;
            if self.is_reachable().await {
                info!(%endpoint, "model server is up");
                return Ok(());
            }
        }
        Err(LLMError::Unavailable(endpoint))
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_u64(key: &str) -> Option<u64> {
    env_string(key)?.parse().ok()
}

fn normalize_endpoint(endpoint: String) -> String {
    let trimmed = endpoint.trim().trim_end_matches('/');
    if trimmed.ends_with("/v1") || trimmed.contains("/v1/") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/v1")
    }
}

fn is_retryable(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}
