use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::sleep;
use tracing::warn;

const DEFAULT_ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";
const DEFAULT_TIMEOUT_MS: u64 = 15_000;
const MAX_RETRIES: usize = 1;
const BASE_BACKOFF_MS: u64 = 200;

/// Placed where a translated string is required but the backend returned none.
pub const TRANSLATION_FAILED: &str = "[translation failed]";

const LANGUAGE_CODES: &[(&str, &str)] = &[
    ("de", "german"),
    ("en", "english"),
    ("fr", "french"),
    ("es", "spanish"),
    ("it", "italian"),
    ("pt", "portuguese"),
    ("ru", "russian"),
    ("zh-cn", "chinese_simplified"),
    ("ja", "japanese"),
    ("ko", "korean"),
];

/// Maps a language code (`de`) to the name used for word-list files (`german`).
pub fn language_name(code: &str) -> Option<&'static str> {
    let code = code.trim().to_lowercase();
    LANGUAGE_CODES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}

/// Maps a word-list language name (`german`) to its translation code (`de`).
pub fn language_code(name: &str) -> Option<&'static str> {
    let name = name.trim().to_lowercase();
    LANGUAGE_CODES
        .iter()
        .find(|(_, n)| *n == name)
        .map(|(code, _)| *code)
}

/// Accepts either a code or a name and returns the code.
pub fn to_code(language: &str) -> String {
    if let Some(code) = language_code(language) {
        return code.to_string();
    }
    language.trim().to_lowercase()
}

/// Accepts either a code or a name and returns the name.
pub fn to_name(language: &str) -> String {
    if let Some(name) = language_name(language) {
        return name.to_string();
    }
    language.trim().to_lowercase()
}

#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: reqwest::StatusCode, body: String },
    #[error("JSON decode failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("translation backend returned no text")]
    Empty,
}

pub trait TranslationClient {
    fn translate(
        &self,
        text: &str,
        src: &str,
        dst: &str,
    ) -> impl Future<Output = Result<String, TranslationError>> + Send;
}

/// Translates and substitutes [`TRANSLATION_FAILED`] when the backend fails.
pub async fn translate_or_marker<T: TranslationClient>(
    client: &T,
    text: &str,
    src: &str,
    dst: &str,
) -> String {
    match client.translate(text, src, dst).await {
        Ok(translated) => translated,
        Err(err) => {
            warn!(error = %err, src, dst, "translation failed");
            TRANSLATION_FAILED.to_string()
        }
    }
}

#[derive(Debug, Clone)]
pub struct TranslatorConfig {
    pub endpoint: String,
    pub timeout: Duration,
}

impl TranslatorConfig {
    pub fn from_env() -> Self {
        let endpoint = std::env::var("TRANSLATE_ENDPOINT")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let timeout = std::env::var("TRANSLATE_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_MS);
        Self {
            endpoint,
            timeout: Duration::from_millis(timeout),
        }
    }
}

/// Client for the public Google Translate `translate_a/single` endpoint.
#[derive(Clone)]
pub struct GoogleTranslator {
    config: TranslatorConfig,
    client: reqwest::Client,
}

impl GoogleTranslator {
    pub fn new(config: TranslatorConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { config, client }
    }

    pub fn from_env() -> Self {
        Self::new(TranslatorConfig::from_env())
    }

    fn request_url(&self, text: &str, src: &str, dst: &str) -> String {
        format!(
            "{}?client=gtx&sl={}&tl={}&dt=t&q={}",
            self.config.endpoint,
            urlencoding::encode(&to_code(src)),
            urlencoding::encode(&to_code(dst)),
            urlencoding::encode(text)
        )
    }

    async fn fetch(&self, url: &str) -> Result<serde_json::Value, TranslationError> {
        let mut last_error: Option<TranslationError> = None;

        for retry in 0..=MAX_RETRIES {
            match self.client.get(url).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let bytes = resp.bytes().await?;
                        return Ok(serde_json::from_slice(&bytes)?);
                    }
                    let body = resp.text().await.unwrap_or_default();
                    let err = TranslationError::HttpStatus { status, body };
                    if retry < MAX_RETRIES && status.is_server_error() {
                        warn!(retry, ?status, "translation request failed, retrying");
                        sleep(Duration::from_millis(BASE_BACKOFF_MS)).await;
                        last_error = Some(err);
                        continue;
                    }
                    return Err(err);
                }
                Err(e) => {
                    let err = TranslationError::Request(e);
                    if retry < MAX_RETRIES {
                        warn!(retry, "translation request error, retrying");
                        sleep(Duration::from_millis(BASE_BACKOFF_MS)).await;
                        last_error = Some(err);
                        continue;
                    }
                    return Err(err);
                }
            }
        }
        Err(last_error.unwrap_or(TranslationError::Empty))
    }
}

impl TranslationClient for GoogleTranslator {
    async fn translate(&self, text: &str, src: &str, dst: &str) -> Result<String, TranslationError> {
        let url = self.request_url(text, src, dst);
        let body = self.fetch(&url).await?;
        parse_segments(&body).ok_or(TranslationError::Empty)
    }
}

/// The response is `[[["translated", "source", ...], ...], ...]`; the
/// translation is the concatenation of the first element of each segment.
fn parse_segments(body: &serde_json::Value) -> Option<String> {
    let segments = body.get(0)?.as_array()?;
    let text: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(|v| v.as_str()))
        .collect();
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
