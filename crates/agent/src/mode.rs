//! Conversational mode inference.

use parley_config::KeywordConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::keywords::words;

/// What the user is asking about. Decides which context sources run and
/// which assistant profile is used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Questions about the application, its team and its data.
    App,
    /// Questions about the technology behind it.
    Technical,
    /// Small talk with the assistant persona.
    #[default]
    Persona,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::App => "app",
            Self::Technical => "technical",
            Self::Persona => "persona",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ModeClassifier {
    app_keywords: HashSet<String>,
    app_phrases: Vec<String>,
    technical_keywords: HashSet<String>,
}

impl ModeClassifier {
    pub fn new(
        app_keywords: impl IntoIterator<Item = String>,
        app_phrases: impl IntoIterator<Item = String>,
        technical_keywords: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            app_keywords: app_keywords.into_iter().map(|k| k.to_lowercase()).collect(),
            app_phrases: app_phrases.into_iter().map(|p| p.to_lowercase()).collect(),
            technical_keywords: technical_keywords.into_iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    pub fn from_config(config: &KeywordConfig) -> Self {
        Self::new(
            config.app_specific.iter().cloned(),
            config.app_phrases.iter().cloned(),
            config.technical.iter().cloned(),
        )
    }

    /// App wins over Technical; no signal means Persona.
    pub fn infer_mode(&self, text: &str) -> Mode {
        let lower = text.to_lowercase();
        let words: HashSet<String> = words(&lower).into_iter().collect();

        let mode = if words.iter().any(|w| self.app_keywords.contains(w))
            || self.app_phrases.iter().any(|p| lower.contains(p.as_str()))
        {
            Mode::App
        } else if words.iter().any(|w| self.technical_keywords.contains(w)) {
            Mode::Technical
        } else {
            Mode::Persona
        };

        tracing::debug!(mode = %mode, "Inferred mode");
        mode
    }
}
