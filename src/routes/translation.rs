use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::response::{ok, AppError};
use crate::routes::on_word_store;
use crate::services::translator::{to_name, TranslationClient};
use crate::state::AppState;
use crate::trainer::alternatives::{show_multiple_translations, DEFAULT_MAX_ALTERNATIVES};
use crate::trainer::equality::check_equality;

#[derive(Debug, Deserialize)]
pub struct TranslateRequest {
    text: String,
    src_language: String,
    dest_language: String,
    #[serde(default)]
    speak_translated: bool,
    #[serde(default)]
    add_to_word_list: bool,
}

#[derive(Debug, Serialize)]
struct TranslateResponse {
    translated_text: String,
    added_to_word_list: bool,
}

#[derive(Debug, Deserialize)]
pub struct AlternativesRequest {
    word: String,
    src_language: String,
    dest_language: String,
    google_translation: Option<String>,
    max_alternatives: Option<usize>,
}

#[derive(Debug, Serialize)]
struct AlternativesResponse {
    alternatives: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CheckTranslationRequest {
    user_translation: String,
    correct_translation: String,
    #[serde(default)]
    be_stringent: bool,
}

#[derive(Debug, Serialize)]
struct CheckTranslationResponse {
    is_correct: bool,
}

pub async fn translate(
    State(state): State<AppState>,
    Json(body): Json<TranslateRequest>,
) -> Result<Response, AppError> {
    let text = body.text.trim();
    if text.is_empty() {
        return Err(AppError::validation("text is required"));
    }

    let translated = state
        .translator()
        .translate(text, &body.src_language, &body.dest_language)
        .await?;

    if body.speak_translated {
        state.narrator().speak(&translated, Some(&body.dest_language));
    }

    let mut added = false;
    if body.add_to_word_list {
        let (language_1, language_2) = (to_name(&body.src_language), to_name(&body.dest_language));
        let store = state.store().clone();
        let (pair_1, pair_2) = (text.to_string(), translated.clone());
        let (list_1, list_2) = (language_1.clone(), language_2.clone());
        match on_word_store(move || store.append_if_absent(&list_1, &list_2, &pair_1, &pair_2)).await {
            Ok(written) => added = written,
            Err(err) => warn!(status = %err.status(), %language_1, %language_2, "could not add translation to word list"),
        }
    }

    Ok(ok(TranslateResponse {
        translated_text: translated,
        added_to_word_list: added,
    }))
}

pub async fn show_alternatives(
    State(state): State<AppState>,
    Json(body): Json<AlternativesRequest>,
) -> Result<Response, AppError> {
    let Some(model) = state.llm() else {
        return Err(AppError::service_unavailable("no language model configured"));
    };

    let alternatives = show_multiple_translations(
        body.word.trim(),
        &to_name(&body.src_language),
        &to_name(&body.dest_language),
        model,
        body.max_alternatives.unwrap_or(DEFAULT_MAX_ALTERNATIVES),
        body.google_translation.as_deref(),
    )
    .await;

    Ok(ok(AlternativesResponse { alternatives }))
}

pub async fn check_translation(
    State(state): State<AppState>,
    Json(body): Json<CheckTranslationRequest>,
) -> Result<Response, AppError> {
    let is_correct = check_equality(
        &body.user_translation,
        &body.correct_translation,
        state.llm(),
        body.be_stringent,
    )
    .await;

    Ok(ok(CheckTranslationResponse { is_correct }))
}
