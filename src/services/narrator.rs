use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, warn};

/// Speaks text aloud without blocking the caller. Implementations are
/// called from within the tokio runtime.
pub trait Narrator: Send + Sync {
    fn speak(&self, text: &str, language: Option<&str>);
}

/// Runs a system text-to-speech command (`say` on macOS, `espeak` elsewhere).
#[derive(Debug, Clone)]
pub struct SystemNarrator {
    command: String,
}

impl SystemNarrator {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn from_env() -> Self {
        let command = std::env::var("TTS_COMMAND")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| default_command().to_string());
        Self::new(command)
    }

    fn voice_args(&self, language: Option<&str>) -> Vec<String> {
        let Some(language) = language else {
            return Vec::new();
        };
        let program = self.command.rsplit('/').next().unwrap_or(&self.command);
        match program {
            "say" => voice_for(language)
                .map(|voice| vec!["-v".to_string(), voice.to_string()])
                .unwrap_or_default(),
            "espeak" | "espeak-ng" => vec!["-v".to_string(), crate::services::translator::to_code(language)],
            _ => Vec::new(),
        }
    }
}

impl Narrator for SystemNarrator {
    fn speak(&self, text: &str, language: Option<&str>) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        let args = self.voice_args(language);
        debug!(command = %self.command, ?args, "speaking text");

        let spawned = Command::new(&self.command)
            .args(&args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(false)
            .spawn();

        // Dropped children keep running and are reaped by the runtime.
        if let Err(err) = spawned {
            warn!(error = %err, command = %self.command, "text-to-speech failed");
        }
    }
}

/// Voice identifiers for the macOS speech synthesizer.
pub fn voice_for(language: &str) -> Option<&'static str> {
    match language.trim().to_lowercase().as_str() {
        "french" | "fr" => Some("com.apple.eloquence.fr-FR.Flo"),
        "german" | "de" => Some("com.apple.eloquence.de-DE.Annika"),
        "spanish" | "es" => Some("com.apple.eloquence.es-ES.Flo"),
        "english" | "en" => Some("com.apple.speech.synthesis.voice.Fred"),
        _ => None,
    }
}

fn default_command() -> &'static str {
    if cfg!(target_os = "macos") {
        "say"
    } else {
        "espeak"
    }
}
