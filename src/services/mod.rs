pub mod llm_provider;
pub mod narrator;
pub mod translator;
pub mod word_store;
