//! Image candidate reranking.
//!
//! Image queries are corrected, snapped to the domain vocabulary, and topped up
//! with the location/focus terms the session mentioned last before they are
//! scored against the catalog descriptions.

use parley_config::{ConfigError, ImageSearchConfig};
use parley_core::error::ProviderError;
use parley_core::provider::Embedder;
use parley_core::search::ImageMatch;
use parley_memory::rank_by_similarity;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info};

use crate::keywords::{KeywordSet, words};

static QUERY_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+|[^\w\s]").expect("valid token regex"));

/// One catalog image and its description embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageEntry {
    pub file_name: String,
    pub description: String,
    #[serde(skip)]
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, Default)]
pub struct ImageCatalog {
    entries: Vec<ImageEntry>,
}

impl ImageCatalog {
    /// Read a JSON array of `{file_name, description}` and embed every description.
    pub async fn load(path: &Path, embedder: &dyn Embedder) -> Result<Self, parley_core::Error> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| ConfigError::MissingResource {
            path: path.to_path_buf(),
            reason: format!("image catalog: {e}"),
        })?;
        let entries: Vec<ImageEntry> = serde_json::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let catalog = Self::embed(entries, embedder).await?;
        info!(path = %path.display(), images = catalog.len(), model = embedder.model(), "Loaded image catalog");
        Ok(catalog)
    }

    pub async fn embed(mut entries: Vec<ImageEntry>, embedder: &dyn Embedder) -> Result<Self, ProviderError> {
        let descriptions: Vec<String> = entries.iter().map(|e| e.description.clone()).collect();
        let embeddings = embedder.embed_batch(&descriptions).await?;
        if embeddings.len() != entries.len() {
            return Err(ProviderError::ApiError {
                status_code: 0,
                message: format!(
                    "expected {} description embeddings, got {}",
                    entries.len(),
                    embeddings.len()
                ),
            });
        }
        for (entry, embedding) in entries.iter_mut().zip(embeddings) {
            entry.embedding = embedding;
        }
        Ok(Self { entries })
    }

    /// Entries whose embeddings are already known.
    pub fn from_entries(entries: Vec<ImageEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The last ontology and focus keywords an image query mentioned in a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordMemory {
    pub last_ontology: Option<String>,
    pub last_focus: Option<String>,
}

impl KeywordMemory {
    /// Remember the last-mentioned keyword of each kind. Kinds with no match keep their old value.
    pub fn update(&mut self, extracted: &[String], keywords: &KeywordSet) {
        if let Some(k) = extracted.iter().rev().find(|k| keywords.ontology.contains(*k)) {
            self.last_ontology = Some(k.clone());
        }
        if let Some(k) = extracted.iter().rev().find(|k| keywords.focus.contains(*k)) {
            self.last_focus = Some(k.clone());
        }
    }

    /// Prepend the remembered ontology term and append the remembered focus
    /// term when the query carries none of its own.
    pub fn enrich(&self, corrected: &str, extracted: &[String], keywords: &KeywordSet) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(3);

        if !extracted.iter().any(|k| keywords.ontology.contains(k)) {
            if let Some(last) = &self.last_ontology {
                parts.push(last);
            }
        }
        parts.push(corrected);
        if !extracted.iter().any(|k| keywords.focus.contains(k)) {
            if let Some(last) = &self.last_focus {
                parts.push(last);
            }
        }

        parts.join(" ")
    }
}

/// Every catalog entry scored best-first, plus the entries that cleared the
/// primary threshold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageSearchResult {
    pub top: Vec<ImageMatch>,
    pub all: Vec<ImageMatch>,
}

pub struct ImageReranker {
    catalog: Arc<ImageCatalog>,
    embedder: Arc<dyn Embedder>,
}

impl ImageReranker {
    pub fn new(catalog: Arc<ImageCatalog>, embedder: Arc<dyn Embedder>) -> Self {
        Self { catalog, embedder }
    }

    pub fn catalog(&self) -> &ImageCatalog {
        &self.catalog
    }

    /// Correct the query, update `memory`, and return the enriched query.
    pub fn prepare_query(
        &self,
        query: &str,
        config: &ImageSearchConfig,
        keywords: &KeywordSet,
        memory: &mut KeywordMemory,
    ) -> String {
        memory.update(&extract_image_keywords(query, config, keywords), keywords);

        let corrected = correct_query(query, config);
        let extracted = extract_image_keywords(&corrected, config, keywords);
        memory.enrich(&corrected, &extracted, keywords)
    }

    /// Score an already-enriched query against the whole catalog.
    pub async fn score(&self, enriched: &str, config: &ImageSearchConfig) -> Result<ImageSearchResult, ProviderError> {
        let query_embedding = self.embedder.embed_text(enriched).await?;

        let ranked = rank_by_similarity(
            self.catalog
                .entries
                .iter()
                .map(|entry| (entry, entry.embedding.as_slice())),
            &query_embedding,
            usize::MAX,
            f32::MIN,
        );

        let all: Vec<ImageMatch> = ranked
            .into_iter()
            .map(|(score, entry)| ImageMatch {
                file_name: entry.file_name.clone(),
                score,
                description: entry.description.clone(),
            })
            .collect();

        let top: Vec<ImageMatch> = all
            .iter()
            .filter(|m| m.score >= config.top_k_score_threshold)
            .take(config.top_k_hits)
            .cloned()
            .collect();

        for m in &all {
            debug!(file_name = %m.file_name, score = m.score, "Image score");
        }
        Ok(ImageSearchResult { top, all })
    }

    /// Prepare and score a raw user query. `memory` belongs to the caller's session.
    pub async fn search(
        &self,
        query: &str,
        config: &ImageSearchConfig,
        keywords: &KeywordSet,
        memory: &mut KeywordMemory,
    ) -> Result<ImageSearchResult, ProviderError> {
        let enriched = self.prepare_query(query, config, keywords, memory);
        debug!(enriched = %enriched, "Image query");
        self.score(&enriched, config).await
    }
}

/// Primary matches when there are any, otherwise the relaxed prefix scan.
pub fn select(result: ImageSearchResult, config: &ImageSearchConfig) -> Vec<ImageMatch> {
    if !result.top.is_empty() {
        return result.top;
    }
    fallback_scan(
        &result.all,
        config.acceptable_score_threshold,
        config.acceptable_k_hits,
    )
}

/// Leading entries at or above `threshold`, at most `limit`. Stops at the
/// first entry below the threshold.
pub fn fallback_scan(all: &[ImageMatch], threshold: f32, limit: usize) -> Vec<ImageMatch> {
    all.iter()
        .take_while(|m| m.score >= threshold)
        .take(limit)
        .cloned()
        .collect()
}

/// Apply the manual-correction table to alphanumeric tokens and rejoin with spaces.
pub fn correct_query(query: &str, config: &ImageSearchConfig) -> String {
    QUERY_TOKEN
        .find_iter(query)
        .map(|m| {
            let token = m.as_str();
            if token.chars().all(char::is_alphanumeric) {
                config
                    .manual_corrections
                    .get(&token.to_lowercase())
                    .map(String::as_str)
                    .unwrap_or(token)
            } else {
                token
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Words of `text`, corrected or snapped to the canonical vocabulary where possible.
pub fn extract_image_keywords(text: &str, config: &ImageSearchConfig, keywords: &KeywordSet) -> Vec<String> {
    let canonical = keywords.canonical();
    let mut out = Vec::new();

    for word in words(text) {
        if let Some(correction) = config.manual_corrections.get(&word) {
            out.push(correction.clone());
            continue;
        }
        if word.chars().count() <= 2 || config.stopwords.iter().any(|s| s.eq_ignore_ascii_case(&word)) {
            continue;
        }
        match best_match(&word, &canonical, config.fuzzy_cutoff) {
            Some(keyword) => out.push(keyword.to_string()),
            None => out.push(word),
        }
    }
    out
}

/// The highest-scoring candidate at or above `cutoff`. Earlier candidates win ties.
fn best_match<'a>(word: &str, candidates: &'a [String], cutoff: f32) -> Option<&'a str> {
    let mut best: Option<(&str, f32)> = None;
    for candidate in candidates {
        let score = similarity_ratio(word, candidate);
        if score >= cutoff && best.is_none_or(|(_, s)| score > s) {
            best = Some((candidate, score));
        }
    }
    best.map(|(candidate, _)| candidate)
}

/// Normalized indel similarity on a 0–100 scale: `2 * LCS / (len_a + len_b) * 100`.
fn similarity_ratio(a: &str, b: &str) -> f32 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }

    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in &a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    let lcs = prev[b.len()];
    (2 * lcs) as f32 / total as f32 * 100.0
}
