use std::sync::Arc;
use std::time::{Instant, SystemTime};

use crate::config::Config;
use crate::services::llm_provider::LLMProvider;
use crate::services::narrator::{Narrator, SystemNarrator};
use crate::services::translator::GoogleTranslator;
use crate::services::word_store::WordStore;

/// Shared, read-only handles for request handlers. Each request builds
/// its own sampling or checking computation from these.
#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    store: Arc<WordStore>,
    llm: Option<Arc<LLMProvider>>,
    translator: Arc<GoogleTranslator>,
    narrator: Arc<dyn Narrator>,
    filter_batch_size: usize,
}

impl AppState {
    pub fn new(
        store: WordStore,
        llm: Option<LLMProvider>,
        translator: GoogleTranslator,
        narrator: Arc<dyn Narrator>,
        filter_batch_size: usize,
    ) -> Self {
        Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            store: Arc::new(store),
            llm: llm.map(Arc::new),
            translator: Arc::new(translator),
            narrator,
            filter_batch_size,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            WordStore::new(&config.word_lists_dir),
            LLMProvider::from_env_if_enabled(),
            GoogleTranslator::from_env(),
            Arc::new(SystemNarrator::from_env()),
            config.filter_batch_size,
        )
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }

    pub fn store(&self) -> &WordStore {
        &self.store
    }

    pub fn llm(&self) -> Option<&LLMProvider> {
        self.llm.as_deref()
    }

    pub fn translator(&self) -> &GoogleTranslator {
        &self.translator
    }

    pub fn narrator(&self) -> &dyn Narrator {
        self.narrator.as_ref()
    }

    pub fn filter_batch_size(&self) -> usize {
        self.filter_batch_size
    }
}
