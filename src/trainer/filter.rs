use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::services::llm_provider::{GenerationParams, LanguageModel};
use crate::trainer::types::WordList;

pub const DEFAULT_BATCH_SIZE: usize = 50;
const FILTER_TEMPERATURE: f32 = 0.0;

/// Keeps the entries whose `language` text matches `description`, asking
/// the model one batch at a time. Only words that were actually part of a
/// batch can be selected. An empty result means nothing matched (or the
/// model could not be reached); callers fall back to the full list.
pub async fn filter_word_list_by_description<M: LanguageModel>(
    words: &WordList,
    language: &str,
    description: &str,
    model: &M,
    batch_size: usize,
) -> WordList {
    let mut filtered = WordList {
        language_1: words.language_1.clone(),
        language_2: words.language_2.clone(),
        entries: Vec::new(),
    };

    let Some(side) = words.side_of(language) else {
        warn!(language, "word list has no such language, nothing to filter");
        return filtered;
    };
    if words.is_empty() {
        return filtered;
    }

    let texts: Vec<&str> = words.entries.iter().map(|e| e.text_in(side)).collect();
    let params = GenerationParams::with_temperature(FILTER_TEMPERATURE);

    let mut matched: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for (index, batch) in texts.chunks(batch_size.max(1)).enumerate() {
        let prompt = filter_prompt(batch, language, description);
        let response = match model.generate(&prompt, &params).await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, batch = index, "filter batch failed");
                continue;
            }
        };

        let hits = parse_matches(&response, batch);
        debug!(batch = index, hits = hits.len(), "filter batch parsed");
        for hit in hits {
            if seen.insert(hit.to_string()) {
                matched.push(hit.to_string());
            }
        }
    }

    filtered.entries = words
        .entries
        .iter()
        .filter(|entry| seen.contains(entry.text_in(side)))
        .cloned()
        .collect();

    info!(
        description,
        input = words.len(),
        matched = matched.len(),
        kept = filtered.len(),
        "word list filtered"
    );
    filtered
}

pub fn filter_prompt(batch: &[&str], language: &str, description: &str) -> String {
    format!(
        "Here is a list of {language} words separated by semicolons:\n{words}\n\n\
         Return only the words from this list that match the following description: {description}\n\
         Answer with the matching words exactly as written above, separated by semicolons, \
         and nothing else. If no word matches, answer with nothing.",
        words = batch.join("; "),
    )
}

/// Splits a `;`-separated reply and keeps tokens that are verbatim batch members.
pub fn parse_matches<'a>(response: &str, batch: &[&'a str]) -> Vec<&'a str> {
    let members: HashSet<&str> = batch.iter().copied().collect();
    response
        .split(';')
        .map(str::trim)
        .filter_map(|token| members.get(token).copied())
        .collect()
}
