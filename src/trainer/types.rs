use serde::{Deserialize, Serialize};

/// One learning unit. `id` is assigned at load time and never renumbered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordEntry {
    pub id: u32,
    pub text_1: String,
    pub text_2: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_added: Option<String>,
}

impl WordEntry {
    pub fn new(id: u32, text_1: impl Into<String>, text_2: impl Into<String>) -> Self {
        Self {
            id,
            text_1: text_1.into(),
            text_2: text_2.into(),
            date_added: None,
        }
    }

    pub fn text_in(&self, side: Side) -> &str {
        match side {
            Side::First => &self.text_1,
            Side::Second => &self.text_2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    First,
    Second,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordList {
    pub language_1: String,
    pub language_2: String,
    pub entries: Vec<WordEntry>,
}

impl WordList {
    pub fn new(language_1: impl Into<String>, language_2: impl Into<String>) -> Self {
        Self {
            language_1: normalize_language(&language_1.into()),
            language_2: normalize_language(&language_2.into()),
            entries: Vec::new(),
        }
    }

    /// Builds a list from plain pairs, assigning ids by position.
    pub fn from_pairs<I, A, B>(language_1: &str, language_2: &str, pairs: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        let mut list = Self::new(language_1, language_2);
        list.entries = pairs
            .into_iter()
            .enumerate()
            .map(|(id, (a, b))| WordEntry::new(id as u32, a, b))
            .collect();
        list
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Which column holds `language`, if either.
    pub fn side_of(&self, language: &str) -> Option<Side> {
        let language = normalize_language(language);
        if language == self.language_1 {
            Some(Side::First)
        } else if language == self.language_2 {
            Some(Side::Second)
        } else {
            None
        }
    }

    pub fn contains_pair(&self, text_1: &str, text_2: &str) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.text_1 == text_1 && entry.text_2 == text_2)
    }
}

/// A generated example sentence standing in for a word for one round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSentence {
    pub sentence_1: String,
    pub sentence_2: String,
}

impl GeneratedSentence {
    pub fn empty() -> Self {
        Self {
            sentence_1: String::new(),
            sentence_2: String::new(),
        }
    }

    /// Empty or untranslated sentences cannot be used as a question.
    pub fn is_degraded(&self) -> bool {
        self.sentence_1.trim().is_empty()
            || self.sentence_2.trim().is_empty()
            || self.sentence_2 == crate::services::translator::TRANSLATION_FAILED
    }
}

/// What the sampler hands out for one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampledWord {
    pub text_1: String,
    pub text_2: String,
    pub id: u32,
    pub augmented: bool,
}

pub fn normalize_language(language: &str) -> String {
    language.trim().to_lowercase()
}

/// `german` -> `German`, the column header used in word-list files.
pub fn column_name(language: &str) -> String {
    let language = normalize_language(language);
    let mut chars = language.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
