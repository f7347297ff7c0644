use rand::seq::IndexedRandom;
use rand::Rng;
use tracing::{debug, warn};

use crate::services::llm_provider::LanguageModel;
use crate::services::translator::TranslationClient;
use crate::trainer::augmenter::{create_sentence_from_word, AugmentConfig};
use crate::trainer::types::{SampledWord, WordEntry};

/// Words with this many tokens or more are never turned into sentences.
const MAX_TOKENS_FOR_AUGMENTATION: usize = 3;

/// Everything the sampler needs to turn a word into a sentence.
pub struct Augmentation<'a, M, T> {
    pub probability: f64,
    pub config: &'a AugmentConfig,
    pub model: Option<&'a M>,
    pub translator: &'a T,
    pub language_1: &'a str,
    pub language_2: &'a str,
}

/// Draws one entry uniformly from `candidates`. Short entries are replaced
/// by a generated sentence with probability `augmentation.probability` when
/// a model is available. Returns `None` when there is nothing to draw.
pub async fn sample_word<M, T, R>(
    candidates: &[&WordEntry],
    augmentation: &Augmentation<'_, M, T>,
    rng: &mut R,
) -> Option<SampledWord>
where
    M: LanguageModel,
    T: TranslationClient,
    R: Rng + ?Sized,
{
    let entry = *candidates.choose(rng)?;
    let word_count = entry.text_1.split_whitespace().count();
    let a: f64 = rng.random();

    let plain = SampledWord {
        text_1: entry.text_1.clone(),
        text_2: entry.text_2.clone(),
        id: entry.id,
        augmented: false,
    };

    let Some(model) = augmentation.model else {
        return Some(plain);
    };
    if word_count >= MAX_TOKENS_FOR_AUGMENTATION || a >= augmentation.probability {
        return Some(plain);
    }

    match create_sentence_from_word(
        &entry.text_1,
        augmentation.language_1,
        augmentation.language_2,
        model,
        augmentation.translator,
        augmentation.config,
    )
    .await
    {
        Ok(sentence) if !sentence.is_degraded() => {
            debug!(id = entry.id, "presenting generated sentence");
            Some(SampledWord {
                text_1: sentence.sentence_1,
                text_2: sentence.sentence_2,
                id: entry.id,
                augmented: true,
            })
        }
        Ok(_) => {
            warn!(id = entry.id, "generated sentence unusable, presenting the word instead");
            Some(plain)
        }
        Err(err) => {
            warn!(error = %err, id = entry.id, "sentence generation failed, presenting the word instead");
            Some(plain)
        }
    }
}
