use tracing::{debug, warn};

use crate::services::llm_provider::{GenerationParams, LanguageModel};

const JUDGE_TEMPERATURE: f32 = 0.0;
const JUDGE_MAX_TOKENS: u32 = 8;

/// Outcome of asking the model to compare two expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Same,
    Different,
    Unparseable,
}

/// Exact (case-insensitive) comparison first; only on mismatch, and only
/// when a model is supplied, a semantic comparison. Model failures and
/// unparseable answers count as "not equal".
pub async fn check_equality<M: LanguageModel>(
    answer: &str,
    reference: &str,
    model: Option<&M>,
    strict: bool,
) -> bool {
    if answer.trim().to_lowercase() == reference.trim().to_lowercase() {
        return true;
    }

    let Some(model) = model else {
        return false;
    };

    let prompt = judge_prompt(answer, reference, strict);
    let params = GenerationParams::with_temperature(JUDGE_TEMPERATURE).max_tokens(JUDGE_MAX_TOKENS);
    let response = match model.generate(&prompt, &params).await {
        Ok(response) => response,
        Err(err) => {
            warn!(error = %err, "semantic comparison unavailable, treating answer as incorrect");
            return false;
        }
    };

    match parse_verdict(&response) {
        Verdict::Same => true,
        Verdict::Different => false,
        Verdict::Unparseable => {
            warn!(response = %response.trim(), "unexpected response from model, treating answer as incorrect");
            false
        }
    }
}

pub fn judge_prompt(answer: &str, reference: &str, strict: bool) -> String {
    let stringency = if strict {
        "Be stringent: the expressions must be interchangeable in most contexts, \
         near-synonyms with a different nuance count as DIFFERENT. "
    } else {
        ""
    };
    format!(
        "Compare the expression '{answer}' with the expression '{reference}'. \
         Ignore differences in inflection, capitalization, articles and small spelling mistakes, \
         but the core meaning must be the same. {stringency}\
         Answer only (!) with SAME or DIFFERENT."
    )
}

pub fn parse_verdict(response: &str) -> Verdict {
    let lowered = response.trim().to_lowercase();
    debug!(response = %lowered, "model verdict");
    if lowered.contains("different") {
        Verdict::Different
    } else if lowered.contains("same") {
        Verdict::Same
    } else {
        Verdict::Unparseable
    }
}
