use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;

use vocab_trainer::config::Config;
use vocab_trainer::logging::{init_tracing, ConsoleTarget};
use vocab_trainer::services::llm_provider::LLMProvider;
use vocab_trainer::services::narrator::{Narrator, SystemNarrator};
use vocab_trainer::services::translator::{to_name, GoogleTranslator, TranslationClient};
use vocab_trainer::services::word_store::WordStore;
use vocab_trainer::trainer::learner::ConsoleLearner;
use vocab_trainer::trainer::session::{
    FilterConfig, SessionConfig, TestSession, DEFAULT_HIDE_USED_WORDS, DEFAULT_SENTENCE_PROBABILITY,
};

#[derive(Debug, Parser)]
#[command(name = "word-test", version, about = "Interactive vocabulary tests and quick translations")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run an interactive test over a stored word list.
    Test(TestArgs),
    /// Translate a text, optionally adding it to the matching word list.
    Translate(TranslateArgs),
}

#[derive(Debug, Args)]
struct TestArgs {
    /// Language shown to the learner.
    #[arg(long = "language-1")]
    language_1: String,
    /// Language the learner answers in.
    #[arg(long = "language-2")]
    language_2: String,
    /// Limit the test to this many words.
    #[arg(long)]
    no_words: Option<usize>,
    #[arg(long, default_value_t = DEFAULT_HIDE_USED_WORDS)]
    hide_used_word_for_n_words: usize,
    #[arg(long, default_value_t = DEFAULT_SENTENCE_PROBABILITY)]
    probability_for_sentence_creation: f64,
    #[arg(long)]
    use_voice: bool,
    #[arg(long)]
    hide_correctly_translated_words: bool,
    /// Ask the model for a stringent comparison.
    #[arg(long)]
    strict: bool,
    /// Keep only words matching this description.
    #[arg(long)]
    filter_description: Option<String>,
    /// Run without a language model.
    #[arg(long)]
    no_llm: bool,
}

#[derive(Debug, Args)]
struct TranslateArgs {
    text: String,
    src_language: String,
    dest_language: String,
    #[arg(long)]
    add_to_word_list: bool,
    #[arg(long)]
    speak_translated: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    let config = Config::from_env();
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string());
    let _log_guard = init_tracing(&log_level, ConsoleTarget::Stderr);

    let result = match cli.command {
        Command::Test(args) => run_test(&config, args).await,
        Command::Translate(args) => run_translate(&config, args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

async fn run_test(config: &Config, args: TestArgs) -> Result<(), String> {
    if !(0.0..=1.0).contains(&args.probability_for_sentence_creation) {
        return Err("--probability-for-sentence-creation must be between 0 and 1".to_string());
    }

    let mut session_config = SessionConfig::new(&args.language_1, &args.language_2);
    session_config.no_words = args.no_words;
    session_config.hide_used_word_for_n_words = args.hide_used_word_for_n_words;
    session_config.probability_for_sentence_creation = args.probability_for_sentence_creation;
    session_config.use_voice = args.use_voice;
    session_config.hide_correctly_translated_words = args.hide_correctly_translated_words;
    session_config.strict = args.strict;
    session_config.primary_language = config.primary_language.clone();
    session_config.filter = args.filter_description.map(|description| FilterConfig {
        batch_size: config.filter_batch_size,
        ..FilterConfig::new(description)
    });

    let model = (!args.no_llm).then(LLMProvider::from_env);
    let store = WordStore::new(&config.word_lists_dir);
    let rng = StdRng::from_os_rng();

    let session = TestSession::start(session_config, &store, model, GoogleTranslator::from_env(), rng)
        .await
        .map_err(|err| err.to_string())?;
    let mut session = if args.use_voice {
        session.with_narrator(Box::new(SystemNarrator::from_env()))
    } else {
        session
    };

    if !args.no_llm && !session.has_model() {
        eprintln!("Language model unavailable, using exact matching only.");
    }

    let mut learner = ConsoleLearner::new();
    let summary = session.run(&mut learner).await.map_err(|err| err.to_string())?;
    println!("\nCorrect answers: {}/{}", summary.correct, summary.asked);
    Ok(())
}

async fn run_translate(config: &Config, args: TranslateArgs) -> Result<(), String> {
    let translator = GoogleTranslator::from_env();
    let translated = translator
        .translate(args.text.trim(), &args.src_language, &args.dest_language)
        .await
        .map_err(|err| err.to_string())?;
    println!("{translated}");

    if args.speak_translated {
        SystemNarrator::from_env().speak(&translated, Some(&args.dest_language));
    }

    if args.add_to_word_list {
        let store = WordStore::new(&config.word_lists_dir);
        let (language_1, language_2) = (to_name(&args.src_language), to_name(&args.dest_language));
        let added = store
            .append_if_absent(&language_1, &language_2, &args.text, &translated)
            .map_err(|err| err.to_string())?;
        if added {
            println!("Added to the {language_1}/{language_2} word list.");
        } else {
            println!("Already in the {language_1}/{language_2} word list.");
        }
    }
    Ok(())
}
