use axum::extract::{Query, State};
use axum::response::Response;
use axum::Json;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::response::{ok, AppError};
use crate::routes::on_word_store;
use crate::services::word_store::{filter_by_date, WordStore, WordStoreError};
use crate::state::AppState;
use crate::trainer::augmenter::{AugmentConfig, DEFAULT_LEVEL, DEFAULT_MAX_WORDS};
use crate::trainer::filter::filter_word_list_by_description;
use crate::trainer::sampler::{sample_word, Augmentation};
use crate::trainer::types::{WordEntry, WordList};

#[derive(Debug, Deserialize)]
pub struct CreateWordRequest {
    words_language_1: Vec<String>,
    words_language_2: Vec<String>,
    language_1: String,
    language_2: String,
    probability_for_sentence_creation: f64,
    #[serde(default = "default_max_words")]
    max_num_words_in_created_sentence: u32,
    #[serde(default = "default_level")]
    language_level_for_created_sentence: String,
    #[serde(default)]
    original_indices: Option<Vec<u32>>,
}

fn default_max_words() -> u32 {
    DEFAULT_MAX_WORDS
}

fn default_level() -> String {
    DEFAULT_LEVEL.to_string()
}

#[derive(Debug, Serialize)]
struct CreatedWord {
    word_language_1: Option<String>,
    word_language_2: Option<String>,
    word_index: Option<u32>,
    augmented: bool,
}

#[derive(Debug, Serialize)]
struct CreateWordResponse {
    word: CreatedWord,
}

#[derive(Debug, Deserialize)]
pub struct WordPair {
    word_language_1: String,
    word_language_2: String,
}

#[derive(Debug, Deserialize)]
pub struct AddWordPairRequest {
    word_language_1: String,
    word_language_2: String,
    language_1: String,
    language_2: String,
}

#[derive(Debug, Deserialize)]
pub struct SaveWordListRequest {
    language_1: String,
    language_2: String,
    words: Vec<WordPair>,
}

#[derive(Debug, Deserialize)]
pub struct WordListQuery {
    language_1: String,
    language_2: String,
    start_date_added: Option<String>,
    end_date_added: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FilterWordsRequest {
    language: String,
    description: String,
    language_pair: Option<String>,
    batch_size: Option<usize>,
}

#[derive(Debug, Serialize)]
struct FilterWordsResponse {
    language_1: String,
    language_2: String,
    filtered_words: Vec<WordEntry>,
}

/// Samples one word (or generated sentence) from the posted list.
pub async fn create_word(
    State(state): State<AppState>,
    Json(body): Json<CreateWordRequest>,
) -> Result<Response, AppError> {
    if body.words_language_1.len() != body.words_language_2.len() {
        return Err(AppError::validation(
            "words_language_1 and words_language_2 must have the same length",
        ));
    }
    if !(0.0..=1.0).contains(&body.probability_for_sentence_creation) {
        return Err(AppError::validation(
            "probability_for_sentence_creation must be between 0 and 1",
        ));
    }

    let ids: Vec<u32> = match body.original_indices {
        Some(ref indices) if indices.len() == body.words_language_1.len() => indices.clone(),
        _ => (0..body.words_language_1.len() as u32).collect(),
    };
    let mut words = WordList::new(&body.language_1, &body.language_2);
    words.entries = ids
        .into_iter()
        .zip(body.words_language_1)
        .zip(body.words_language_2)
        .map(|((id, text_1), text_2)| WordEntry::new(id, text_1, text_2))
        .collect();

    let config = AugmentConfig {
        max_words: body.max_num_words_in_created_sentence,
        level: body.language_level_for_created_sentence,
        ..AugmentConfig::default()
    };
    let augmentation = Augmentation {
        probability: body.probability_for_sentence_creation,
        config: &config,
        model: state.llm(),
        translator: state.translator(),
        language_1: &words.language_1,
        language_2: &words.language_2,
    };

    let candidates: Vec<&WordEntry> = words.entries.iter().collect();
    let mut rng = StdRng::from_os_rng();
    let word = sample_word(&candidates, &augmentation, &mut rng).await;

    let created = match word {
        Some(word) => CreatedWord {
            word_language_1: Some(word.text_1),
            word_language_2: Some(word.text_2),
            word_index: Some(word.id),
            augmented: word.augmented,
        },
        None => CreatedWord {
            word_language_1: None,
            word_language_2: None,
            word_index: None,
            augmented: false,
        },
    };

    Ok(ok(CreateWordResponse { word: created }))
}

pub async fn add_word_pair(
    State(state): State<AppState>,
    Json(body): Json<AddWordPairRequest>,
) -> Result<Response, AppError> {
    if body.word_language_1.trim().is_empty() || body.word_language_2.trim().is_empty() {
        return Err(AppError::validation("both words are required"));
    }
    let store = state.store().clone();
    let added = on_word_store(move || {
        store.append_if_absent(
            &body.language_1,
            &body.language_2,
            &body.word_language_1,
            &body.word_language_2,
        )
    })
    .await?;
    Ok(ok(serde_json::json!({ "added": added })))
}

pub async fn get_word_list(
    State(state): State<AppState>,
    Query(query): Query<WordListQuery>,
) -> Result<Response, AppError> {
    let store = state.store().clone();
    let words = on_word_store(move || {
        let words = store.load(&query.language_1, &query.language_2)?;
        filter_by_date(
            words,
            query.start_date_added.as_deref(),
            query.end_date_added.as_deref(),
        )
    })
    .await?;
    Ok(ok(words))
}

pub async fn save_word_list(
    State(state): State<AppState>,
    Json(body): Json<SaveWordListRequest>,
) -> Result<Response, AppError> {
    let list = WordList::from_pairs(
        &body.language_1,
        &body.language_2,
        body.words
            .into_iter()
            .map(|pair| (pair.word_language_1, pair.word_language_2)),
    );
    let saved = list.len();
    let store = state.store().clone();
    on_word_store(move || store.save(&body.language_1, &body.language_2, &list)).await?;
    Ok(ok(serde_json::json!({ "saved": saved })))
}

pub async fn filter_words(
    State(state): State<AppState>,
    Json(body): Json<FilterWordsRequest>,
) -> Result<Response, AppError> {
    let Some(model) = state.llm() else {
        return Err(AppError::service_unavailable("no language model configured"));
    };
    if body.description.trim().is_empty() {
        return Err(AppError::validation("description is required"));
    }

    let store = state.store().clone();
    let (language, pair) = (body.language.clone(), body.language_pair.clone());
    let words = on_word_store(move || match pair.as_deref() {
        Some(pair) => load_pair(&store, pair),
        None => store.load_all_containing(&language).map(Some),
    })
    .await?
    .ok_or_else(|| {
        AppError::not_found(format!(
            "no word list found for pair: {}",
            body.language_pair.as_deref().unwrap_or_default()
        ))
    })?;
    let batch_size = body.batch_size.unwrap_or_else(|| state.filter_batch_size());

    let filtered =
        filter_word_list_by_description(&words, &body.language, &body.description, model, batch_size).await;

    Ok(ok(FilterWordsResponse {
        language_1: filtered.language_1,
        language_2: filtered.language_2,
        filtered_words: filtered.entries,
    }))
}

/// Resolves `german_english` style pairs; language names may contain `_`.
fn load_pair(store: &WordStore, pair: &str) -> Result<Option<WordList>, WordStoreError> {
    for (index, _) in pair.match_indices('_') {
        let (language_1, language_2) = (&pair[..index], &pair[index + 1..]);
        if language_1.is_empty() || language_2.is_empty() {
            continue;
        }
        match store.load(language_1, language_2) {
            Ok(list) => return Ok(Some(list)),
            Err(WordStoreError::NotFound { .. }) => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(None)
}
