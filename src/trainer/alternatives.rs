use tracing::warn;

use crate::services::llm_provider::{GenerationParams, LanguageModel};

pub const DEFAULT_MAX_ALTERNATIVES: usize = 5;
const ALTERNATIVES_TEMPERATURE: f32 = 0.3;

/// Asks the model for up to `max_alternatives` further translations of
/// `word`. `known_translation` (e.g. the translation service's answer) is
/// excluded from the result. Returns an empty list when the model fails.
pub async fn show_multiple_translations<M: LanguageModel>(
    word: &str,
    src_language: &str,
    dest_language: &str,
    model: &M,
    max_alternatives: usize,
    known_translation: Option<&str>,
) -> Vec<String> {
    let prompt = alternatives_prompt(word, src_language, dest_language, max_alternatives, known_translation);
    let params = GenerationParams::with_temperature(ALTERNATIVES_TEMPERATURE);

    match model.generate(&prompt, &params).await {
        Ok(response) => parse_alternatives(&response, max_alternatives, known_translation),
        Err(err) => {
            warn!(error = %err, word, "alternative translations unavailable");
            Vec::new()
        }
    }
}

fn alternatives_prompt(
    word: &str,
    src_language: &str,
    dest_language: &str,
    max_alternatives: usize,
    known_translation: Option<&str>,
) -> String {
    let known = known_translation
        .map(|t| format!("Do not repeat the translation '{t}'. "))
        .unwrap_or_default();
    format!(
        "List up to {max_alternatives} different common translations of the {src_language} word '{word}' \
         into {dest_language}. {known}Answer only with the translations, separated by semicolons, \
         and nothing else."
    )
}

fn parse_alternatives(response: &str, max_alternatives: usize, known_translation: Option<&str>) -> Vec<String> {
    let known = known_translation.map(|t| t.trim().to_lowercase());
    let mut alternatives: Vec<String> = Vec::new();
    if max_alternatives == 0 {
        return alternatives;
    }

    for token in response.lines().flat_map(|line| line.split(';')) {
        let token = token.trim().trim_matches(|c| c == '"' || c == '\'' || c == '.').trim();
        if token.is_empty() {
            continue;
        }
        let lowered = token.to_lowercase();
        if known.as_deref() == Some(lowered.as_str()) {
            continue;
        }
        if alternatives.iter().any(|a| a.to_lowercase() == lowered) {
            continue;
        }
        alternatives.push(token.to_string());
        if alternatives.len() == max_alternatives {
            break;
        }
    }
    alternatives
}
