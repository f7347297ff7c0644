use std::future::Future;
use std::io::{self, Write};

use tokio::io::{AsyncBufReadExt, BufReader, Stdin};

/// Something a running test shows to the learner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent<'a> {
    Started {
        language_1: &'a str,
        language_2: &'a str,
        words: usize,
    },
    Question {
        language: &'a str,
        text: &'a str,
    },
    Correct,
    Incorrect {
        reference: &'a str,
    },
    Exhausted,
}

/// Where questions go and answers come from. `read_answer` is the only
/// point at which a test session waits on the learner; `Ok(None)` ends it.
pub trait LearnerChannel {
    fn show(&mut self, event: SessionEvent<'_>);

    fn read_answer(&mut self, language: &str) -> impl Future<Output = io::Result<Option<String>>> + Send;
}

/// Interactive terminal learner.
pub struct ConsoleLearner {
    reader: BufReader<Stdin>,
}

impl ConsoleLearner {
    pub fn new() -> Self {
        Self {
            reader: BufReader::new(tokio::io::stdin()),
        }
    }
}

impl Default for ConsoleLearner {
    fn default() -> Self {
        Self::new()
    }
}

impl LearnerChannel for ConsoleLearner {
    fn show(&mut self, event: SessionEvent<'_>) {
        match event {
            SessionEvent::Started {
                language_1,
                language_2,
                words,
            } => println!("Running test between {language_1} and {language_2} with {words} words."),
            SessionEvent::Question { language, text } => println!("\n{language}: {text}"),
            SessionEvent::Correct => println!("✓ Correct!"),
            SessionEvent::Incorrect { reference } => {
                println!("✗ Incorrect. The correct answer is: {reference}")
            }
            SessionEvent::Exhausted => println!("No more words available for testing."),
        }
    }

    async fn read_answer(&mut self, language: &str) -> io::Result<Option<String>> {
        print!("Enter the {language} translation: ");
        io::stdout().flush()?;

        let mut line = String::new();
        let read = self.reader.read_line(&mut line).await?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}
