use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::services::llm_provider::{GenerationParams, LLMError, LanguageModel};
use crate::services::translator::{translate_or_marker, TranslationClient};
use crate::trainer::types::GeneratedSentence;

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_WORDS: u32 = 10;
pub const DEFAULT_LEVEL: &str = "C1";

/// How example sentences are generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AugmentConfig {
    pub max_words: u32,
    pub level: String,
    pub note: Option<String>,
    pub temperature: f32,
}

impl Default for AugmentConfig {
    fn default() -> Self {
        Self {
            max_words: DEFAULT_MAX_WORDS,
            level: DEFAULT_LEVEL.to_string(),
            note: None,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

/// Generates a sentence in `language_1` that uses `word`, then translates
/// it into `language_2`. The sentence is never written to a word list.
///
/// An empty model reply yields an empty sentence pair; a failed translation
/// yields [`crate::services::translator::TRANSLATION_FAILED`] as the second
/// sentence.
pub async fn create_sentence_from_word<M, T>(
    word: &str,
    language_1: &str,
    language_2: &str,
    model: &M,
    translator: &T,
    config: &AugmentConfig,
) -> Result<GeneratedSentence, LLMError>
where
    M: LanguageModel,
    T: TranslationClient,
{
    let prompt = sentence_prompt(word, language_1, config);
    let params = GenerationParams::with_temperature(config.temperature).stop_at(".");
    let response = model.generate(&prompt, &params).await?;

    let sentence_1 = first_line(&response);
    if sentence_1.is_empty() {
        warn!(word, "model returned no sentence");
        return Ok(GeneratedSentence::empty());
    }
    debug!(word, sentence = %sentence_1, "sentence generated");

    let sentence_2 = translate_or_marker(translator, &sentence_1, language_1, language_2).await;
    Ok(GeneratedSentence {
        sentence_1,
        sentence_2,
    })
}

/// Drops a leading infinitive marker and any comma-separated glosses.
pub fn core_word(word: &str) -> &str {
    let word = word.trim();
    let word = word.strip_prefix("to ").unwrap_or(word);
    word.split(',').next().unwrap_or(word).trim()
}

pub fn sentence_prompt(word: &str, language: &str, config: &AugmentConfig) -> String {
    let note = config
        .note
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(|n| format!("{n} "))
        .unwrap_or_default();
    format!(
        "Create a simple sentence (up to {max} words) in {language} using the word '{word}'. \
         The sentence should have maximal difficulty for a language learner at the {level} level. \
         {note}Only (!) return the created sentence and nothing more!",
        max = config.max_words,
        word = core_word(word),
        level = config.level,
    )
}

fn first_line(response: &str) -> String {
    response
        .trim()
        .lines()
        .next()
        .unwrap_or_default()
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_string()
}
