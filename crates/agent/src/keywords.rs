//! Domain keyword extraction.
//!
//! The single source of truth for "which domain terms appear in this text",
//! shared by mode inference, query enrichment, and the image reranker.

use parley_config::KeywordConfig;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").expect("valid word regex"));

/// Lowercased `\w+` words of `text`, in order.
pub fn words(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    WORD.find_iter(&lower).map(|m| m.as_str().to_string()).collect()
}

/// Words of `text` that are members of `set`.
pub fn extract_keywords(text: &str, set: &HashSet<String>) -> BTreeSet<String> {
    words(text).into_iter().filter(|w| set.contains(w)).collect()
}

/// Ontology and focus matches found in one piece of text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordMatches {
    pub ontology: BTreeSet<String>,
    pub focus: BTreeSet<String>,
}

impl KeywordMatches {
    pub fn is_empty(&self) -> bool {
        self.ontology.is_empty() && self.focus.is_empty()
    }
}

/// The two disjoint domain vocabularies.
#[derive(Debug, Clone, Default)]
pub struct KeywordSet {
    pub ontology: HashSet<String>,
    pub focus: HashSet<String>,
}

impl KeywordSet {
    pub fn new<I, J, S, T>(ontology: I, focus: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        Self {
            ontology: ontology.into_iter().map(|k| k.as_ref().to_lowercase()).collect(),
            focus: focus.into_iter().map(|k| k.as_ref().to_lowercase()).collect(),
        }
    }

    pub fn from_config(config: &KeywordConfig) -> Self {
        Self::new(&config.ontology, &config.focus)
    }

    pub fn matches(&self, text: &str) -> KeywordMatches {
        KeywordMatches {
            ontology: extract_keywords(text, &self.ontology),
            focus: extract_keywords(text, &self.focus),
        }
    }

    /// Ontology ∪ focus, sorted.
    pub fn canonical(&self) -> Vec<String> {
        let all: BTreeSet<&String> = self.ontology.iter().chain(self.focus.iter()).collect();
        all.into_iter().cloned().collect()
    }
}
