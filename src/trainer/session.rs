use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::services::llm_provider::LanguageModel;
use crate::services::narrator::Narrator;
use crate::services::translator::TranslationClient;
use crate::services::word_store::{WordStore, WordStoreError};
use crate::trainer::augmenter::AugmentConfig;
use crate::trainer::equality::check_equality;
use crate::trainer::filter::{filter_word_list_by_description, DEFAULT_BATCH_SIZE};
use crate::trainer::learner::{LearnerChannel, SessionEvent};
use crate::trainer::sampler::{sample_word, Augmentation};
use crate::trainer::state::SessionState;
use crate::trainer::types::{normalize_language, SampledWord, WordEntry, WordList};

pub const DEFAULT_HIDE_USED_WORDS: usize = 10;
pub const DEFAULT_SENTENCE_PROBABILITY: f64 = 0.1;
pub const DEFAULT_PRIMARY_LANGUAGE: &str = "german";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    WordStore(#[from] WordStoreError),
    #[error("reading answer failed: {0}")]
    Input(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct FilterConfig {
    pub description: String,
    /// Column the description applies to; defaults to the question language.
    pub language: Option<String>,
    pub batch_size: usize,
}

impl FilterConfig {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            language: None,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub language_1: String,
    pub language_2: String,
    pub no_words: Option<usize>,
    pub hide_used_word_for_n_words: usize,
    pub probability_for_sentence_creation: f64,
    pub use_voice: bool,
    pub hide_correctly_translated_words: bool,
    pub strict: bool,
    pub primary_language: String,
    pub augment: AugmentConfig,
    pub filter: Option<FilterConfig>,
}

impl SessionConfig {
    pub fn new(language_1: impl Into<String>, language_2: impl Into<String>) -> Self {
        Self {
            language_1: normalize_language(&language_1.into()),
            language_2: normalize_language(&language_2.into()),
            no_words: None,
            hide_used_word_for_n_words: DEFAULT_HIDE_USED_WORDS,
            probability_for_sentence_creation: DEFAULT_SENTENCE_PROBABILITY,
            use_voice: false,
            hide_correctly_translated_words: false,
            strict: false,
            primary_language: DEFAULT_PRIMARY_LANGUAGE.to_string(),
            augment: AugmentConfig::default(),
            filter: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Word list loaded, nothing drawn yet.
    Init,
    Sampling,
    Presenting,
    AwaitingAnswer,
    Scoring,
    Done,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub asked: usize,
    pub correct: usize,
}

/// One interactive vocabulary test. Single owner, single use.
pub struct TestSession<M, T, R> {
    config: SessionConfig,
    words: WordList,
    state: SessionState,
    model: Option<M>,
    translator: T,
    narrator: Option<Box<dyn Narrator>>,
    rng: R,
    phase: Phase,
    summary: SessionSummary,
}

impl<M, T, R> TestSession<M, T, R>
where
    M: LanguageModel,
    T: TranslationClient,
    R: Rng,
{
    /// Loads the configured language pair from `store` and prepares a session.
    pub async fn start(
        config: SessionConfig,
        store: &WordStore,
        model: Option<M>,
        translator: T,
        rng: R,
    ) -> Result<Self, SessionError> {
        let words = store.load(&config.language_1, &config.language_2)?;
        Ok(Self::from_word_list(config, words, model, translator, rng).await)
    }

    /// Checks the model server, applies the optional filter, shuffles and
    /// truncates the list, and fills the working set with every id.
    pub async fn from_word_list(
        config: SessionConfig,
        words: WordList,
        model: Option<M>,
        translator: T,
        mut rng: R,
    ) -> Self {
        let model = match model {
            Some(model) => match model.ensure_running().await {
                Ok(()) => Some(model),
                Err(err) => {
                    warn!(error = %err, "model unavailable, continuing without sentences or semantic checks");
                    None
                }
            },
            None => None,
        };

        let mut words = match (&config.filter, &model) {
            (Some(filter), Some(model)) => apply_filter(words, filter, &config.language_1, model).await,
            (Some(_), None) => {
                warn!("word filter requested but no model is available, using the full list");
                words
            }
            (None, _) => words,
        };

        words.entries.shuffle(&mut rng);
        if let Some(limit) = config.no_words {
            words.entries.truncate(limit);
        }

        let state = SessionState::new(
            words.entries.iter().map(|e| e.id),
            config.hide_used_word_for_n_words,
        );

        info!(
            language_1 = %config.language_1,
            language_2 = %config.language_2,
            words = words.len(),
            llm = model.is_some(),
            "test session ready"
        );

        Self {
            config,
            words,
            state,
            model,
            translator,
            narrator: None,
            rng,
            phase: Phase::Init,
            summary: SessionSummary::default(),
        }
    }

    pub fn with_narrator(mut self, narrator: Box<dyn Narrator>) -> Self {
        self.narrator = Some(narrator);
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn words(&self) -> &WordList {
        &self.words
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Draws the next word, or moves to `Done` when none is left.
    pub async fn next_word(&mut self) -> Option<SampledWord> {
        if self.phase == Phase::Done {
            return None;
        }
        self.phase = Phase::Sampling;

        let eligible: HashSet<u32> = self.state.eligible().into_iter().collect();
        let candidates: Vec<&WordEntry> = self
            .words
            .entries
            .iter()
            .filter(|entry| eligible.contains(&entry.id))
            .collect();

        let augmentation = Augmentation {
            probability: self.config.probability_for_sentence_creation,
            config: &self.config.augment,
            model: self.model.as_ref(),
            translator: &self.translator,
            language_1: &self.config.language_1,
            language_2: &self.config.language_2,
        };

        let Some(word) = sample_word(&candidates, &augmentation, &mut self.rng).await else {
            debug!("no eligible words left");
            self.phase = Phase::Done;
            return None;
        };

        self.state.record_sampled(word.id);
        self.phase = Phase::Presenting;
        Some(word)
    }

    /// Checks an answer against the sampled word and updates mastery.
    pub async fn score(&mut self, word: &SampledWord, answer: &str) -> bool {
        self.phase = Phase::Scoring;
        let correct = check_equality(answer, &word.text_2, self.model.as_ref(), self.config.strict).await;

        self.summary.asked += 1;
        if correct {
            self.summary.correct += 1;
            if self.config.hide_correctly_translated_words {
                self.state.master(word.id);
            }
        }
        debug!(id = word.id, correct, "answer scored");
        self.phase = Phase::Sampling;
        correct
    }

    /// Runs until the words or the learner's input run out.
    pub async fn run<L: LearnerChannel>(&mut self, learner: &mut L) -> Result<SessionSummary, SessionError> {
        learner.show(SessionEvent::Started {
            language_1: &self.config.language_1,
            language_2: &self.config.language_2,
            words: self.words.len(),
        });

        let mut input_closed = false;
        while let Some(word) = self.next_word().await {
            learner.show(SessionEvent::Question {
                language: &self.config.language_1,
                text: &word.text_1,
            });
            self.narrate(&word.text_1, &self.config.language_1);

            self.phase = Phase::AwaitingAnswer;
            let Some(answer) = learner.read_answer(&self.config.language_2).await? else {
                input_closed = true;
                break;
            };

            if self.score(&word, &answer).await {
                learner.show(SessionEvent::Correct);
            } else {
                learner.show(SessionEvent::Incorrect {
                    reference: &word.text_2,
                });
            }
            self.narrate(&word.text_2, &self.config.language_2);
        }

        if !input_closed {
            learner.show(SessionEvent::Exhausted);
        }
        self.phase = Phase::Done;

        info!(asked = self.summary.asked, correct = self.summary.correct, "test session finished");
        Ok(self.summary)
    }

    fn narrate(&self, text: &str, language: &str) {
        if !self.config.use_voice || language == normalize_language(&self.config.primary_language) {
            return;
        }
        if let Some(narrator) = &self.narrator {
            narrator.speak(text, Some(language));
        }
    }
}

async fn apply_filter<M: LanguageModel>(
    words: WordList,
    filter: &FilterConfig,
    default_language: &str,
    model: &M,
) -> WordList {
    let language = filter.language.as_deref().unwrap_or(default_language);
    let filtered =
        filter_word_list_by_description(&words, language, &filter.description, model, filter.batch_size).await;
    if filtered.is_empty() {
        warn!(description = %filter.description, "filter matched no words, using the full list");
        words
    } else {
        filtered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::llm_provider::{GenerationParams, LLMError};
    use crate::services::translator::TranslationError;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    struct NoTranslation;

    impl TranslationClient for NoTranslation {
        async fn translate(&self, _text: &str, _src: &str, _dst: &str) -> Result<String, TranslationError> {
            Err(TranslationError::Empty)
        }
    }

    struct Judge(&'static str);

    impl LanguageModel for Judge {
        async fn generate(&self, _prompt: &str, _params: &GenerationParams) -> Result<String, LLMError> {
            Ok(self.0.to_string())
        }
    }

    struct Down;

    impl LanguageModel for Down {
        async fn generate(&self, _prompt: &str, _params: &GenerationParams) -> Result<String, LLMError> {
            panic!("an unreachable model must not be used");
        }

        async fn ensure_running(&self) -> Result<(), LLMError> {
            Err(LLMError::Unavailable("http://localhost:11434/v1".into()))
        }
    }

    #[derive(Default)]
    struct Scripted {
        answers: VecDeque<String>,
        events: Vec<String>,
    }

    impl Scripted {
        fn answering(answers: &[&str]) -> Self {
            Self {
                answers: answers.iter().map(|a| a.to_string()).collect(),
                events: Vec::new(),
            }
        }
    }

    impl LearnerChannel for Scripted {
        fn show(&mut self, event: SessionEvent<'_>) {
            self.events.push(format!("{event:?}"));
        }

        async fn read_answer(&mut self, _language: &str) -> std::io::Result<Option<String>> {
            Ok(self.answers.pop_front())
        }
    }

    /// Answers every question with the right translation.
    struct Perfect {
        pairs: Vec<(String, String)>,
        pending: Option<String>,
        asked: usize,
    }

    impl LearnerChannel for Perfect {
        fn show(&mut self, event: SessionEvent<'_>) {
            if let SessionEvent::Question { text, .. } = event {
                self.pending = self
                    .pairs
                    .iter()
                    .find(|(q, _)| q == text)
                    .map(|(_, a)| a.clone());
            }
        }

        async fn read_answer(&mut self, _language: &str) -> std::io::Result<Option<String>> {
            self.asked += 1;
            if self.asked > 50 {
                return Ok(None);
            }
            Ok(self.pending.take())
        }
    }

    struct Recorder(Arc<Mutex<Vec<(String, Option<String>)>>>);

    impl Narrator for Recorder {
        fn speak(&self, text: &str, language: Option<&str>) {
            self.0.lock().unwrap().push((text.to_string(), language.map(str::to_string)));
        }
    }

    fn haus_brot() -> WordList {
        WordList::from_pairs("german", "english", [("Haus", "House"), ("Brot", "Bread")])
    }

    fn config(window: usize) -> SessionConfig {
        let mut config = SessionConfig::new("german", "english");
        config.hide_used_word_for_n_words = window;
        config.probability_for_sentence_creation = 0.0;
        config
    }

    #[tokio::test]
    async fn test_alternates_with_window_of_one() {
        let mut session = TestSession::from_word_list(
            config(1),
            haus_brot(),
            None::<Judge>,
            NoTranslation,
            StdRng::seed_from_u64(11),
        )
        .await;

        let mut seen = HashSet::new();
        let mut previous: Option<u32> = None;
        for _ in 0..20 {
            let word = session.next_word().await.unwrap();
            assert_ne!(Some(word.id), previous);
            previous = Some(word.id);
            seen.insert(word.id);
            assert!(session.state().recency_len() <= 1);
        }
        assert_eq!(seen, HashSet::from([0, 1]));
    }

    #[tokio::test]
    async fn test_mastery_ends_the_session() {
        let mut config = config(1);
        config.hide_correctly_translated_words = true;
        let mut session = TestSession::from_word_list(
            config,
            haus_brot(),
            None::<Judge>,
            NoTranslation,
            StdRng::seed_from_u64(3),
        )
        .await;

        let mut learner = Perfect {
            pairs: vec![("Haus".into(), "house".into()), ("Brot".into(), "bread".into())],
            pending: None,
            asked: 0,
        };
        let summary = session.run(&mut learner).await.unwrap();

        assert_eq!(summary, SessionSummary { asked: 2, correct: 2 });
        assert!(session.state().is_exhausted());
        assert!(session.state().is_mastered(0) && session.state().is_mastered(1));
        assert_eq!(session.phase(), Phase::Done);
    }

    #[tokio::test]
    async fn test_wrong_answers_keep_words_and_show_reference() {
        let mut config = config(1);
        config.hide_correctly_translated_words = true;
        let mut session = TestSession::from_word_list(
            config,
            haus_brot(),
            None::<Judge>,
            NoTranslation,
            StdRng::seed_from_u64(5),
        )
        .await;

        let mut learner = Scripted::answering(&["nope", "nope", "nope"]);
        let summary = session.run(&mut learner).await.unwrap();

        assert_eq!(summary, SessionSummary { asked: 3, correct: 0 });
        assert_eq!(session.state().working_set().len(), 2);
        assert!(learner.events.iter().any(|e| e.starts_with("Incorrect")));
        assert!(!learner.events.iter().any(|e| e == "Exhausted"));
    }

    #[tokio::test]
    async fn test_semantic_match_counts_as_correct() {
        let words = WordList::from_pairs("german", "english", [("Auto", "automobile")]);
        let mut session = TestSession::from_word_list(
            config(0),
            words,
            Some(Judge("SAME")),
            NoTranslation,
            StdRng::seed_from_u64(1),
        )
        .await;

        let mut learner = Scripted::answering(&["car"]);
        let summary = session.run(&mut learner).await.unwrap();
        assert_eq!(summary.correct, 1);
        assert!(learner.events.contains(&"Correct".to_string()));
    }

    #[tokio::test]
    async fn test_unreachable_model_is_dropped() {
        let mut config = config(1);
        config.probability_for_sentence_creation = 1.0;
        let mut session = TestSession::from_word_list(
            config,
            haus_brot(),
            Some(Down),
            NoTranslation,
            StdRng::seed_from_u64(9),
        )
        .await;
        assert!(!session.has_model());

        let mut learner = Scripted::answering(&["House", "wrong"]);
        let summary = session.run(&mut learner).await.unwrap();
        assert_eq!(summary.asked, 2);
    }

    #[tokio::test]
    async fn test_truncates_to_requested_size() {
        let mut config = config(1);
        config.no_words = Some(1);
        let session = TestSession::from_word_list(
            config,
            haus_brot(),
            None::<Judge>,
            NoTranslation,
            StdRng::seed_from_u64(2),
        )
        .await;
        assert_eq!(session.words().len(), 1);
        assert_eq!(session.state().working_set().len(), 1);
        assert_eq!(session.phase(), Phase::Init);
    }

    #[tokio::test]
    async fn test_empty_list_finishes_immediately() {
        let mut session = TestSession::from_word_list(
            config(3),
            WordList::new("german", "english"),
            None::<Judge>,
            NoTranslation,
            StdRng::seed_from_u64(2),
        )
        .await;

        let mut learner = Scripted::answering(&["anything"]);
        let summary = session.run(&mut learner).await.unwrap();
        assert_eq!(summary, SessionSummary::default());
        assert_eq!(learner.events.last().map(String::as_str), Some("Exhausted"));
    }

    #[tokio::test]
    async fn test_voice_skips_primary_language() {
        let spoken = Arc::new(Mutex::new(Vec::new()));
        let mut config = config(1);
        config.use_voice = true;
        config.primary_language = "german".into();
        let mut session = TestSession::from_word_list(
            config,
            haus_brot(),
            None::<Judge>,
            NoTranslation,
            StdRng::seed_from_u64(4),
        )
        .await
        .with_narrator(Box::new(Recorder(Arc::clone(&spoken))));

        let mut learner = Scripted::answering(&["x"]);
        session.run(&mut learner).await.unwrap();

        let spoken = spoken.lock().unwrap();
        assert_eq!(spoken.len(), 1);
        assert_eq!(spoken[0].1.as_deref(), Some("english"));
    }

    #[tokio::test]
    async fn test_missing_word_list_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = WordStore::new(dir.path());
        let result = TestSession::start(
            config(1),
            &store,
            None::<Judge>,
            NoTranslation,
            StdRng::seed_from_u64(1),
        )
        .await;
        assert!(matches!(result, Err(SessionError::WordStore(WordStoreError::NotFound { .. }))));
    }
}
