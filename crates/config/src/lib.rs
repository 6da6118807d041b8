//! Configuration loading, validation, and management for Parley.
//!
//! Loads configuration from `~/.parley/config.toml` (or `$PARLEY_CONFIG`) with
//! environment variable overrides for secrets. Validates all settings at
//! startup; a process with an invalid configuration must not serve traffic.

pub mod handle;
pub mod profile;

pub use handle::{ConfigHandle, ConfigSnapshot};
pub use profile::{BotProfile, ProfileSet};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.parley/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Assistant and application naming, history window
    #[serde(default)]
    pub bot: BotConfig,

    /// Generation backend
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Embedding backend
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Vector search backend and per-source retrieval policy
    #[serde(default)]
    pub vector_db: VectorDbConfig,

    /// Versioned document store
    #[serde(default)]
    pub documents: DocumentStoreConfig,

    /// Domain vocabularies for enrichment and mode classification
    #[serde(default)]
    pub keywords: KeywordConfig,

    /// Low-signal input detection
    #[serde(default)]
    pub gibberish: GibberishConfig,

    /// Image catalog and reranking policy
    #[serde(default)]
    pub images: ImageSearchConfig,

    /// Canned user-visible responses
    #[serde(default)]
    pub responses: ResponsesConfig,

    /// Per-mode assistant profile files
    #[serde(default)]
    pub profiles: ProfilesConfig,

    /// Session persistence
    #[serde(default)]
    pub sessions: SessionStoreConfig,

    /// HTTP gateway
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_bot_name")]
    pub name: String,

    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// How many recent non-feedback turns go into the history context.
    #[serde(default = "default_max_history_pairs")]
    pub max_history_pairs: usize,
}

fn default_bot_name() -> String {
    "Harper".into()
}
fn default_app_name() -> String {
    "OntologyOne".into()
}
fn default_max_history_pairs() -> usize {
    2
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
            app_name: default_app_name(),
            max_history_pairs: default_max_history_pairs(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_url")]
    pub api_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_generation_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_generation_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_generation_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_timeout_secs() -> u64 {
    120
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_url: default_generation_url(),
            api_key: None,
            model: default_generation_model(),
            temperature: default_temperature(),
            max_tokens: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_generation_url")]
    pub api_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model used for document and story queries.
    #[serde(default = "default_text_model")]
    pub text_model: String,

    /// Model used for image descriptions and image queries.
    #[serde(default = "default_text_model")]
    pub image_model: String,
}

fn default_text_model() -> String {
    "text-embedding-3-small".into()
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_url: default_generation_url(),
            api_key: None,
            text_model: default_text_model(),
            image_model: default_text_model(),
        }
    }
}

impl std::fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("text_model", &self.text_model)
            .field("image_model", &self.image_model)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct VectorDbConfig {
    /// "pinecone" or "memory"
    #[serde(default = "default_vector_backend")]
    pub backend: String,

    /// Index host URL for the pinecone backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// JSON file of pre-embedded records for the memory backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_path: Option<PathBuf>,

    #[serde(default = "default_doc_namespace")]
    pub doc_namespace: String,

    #[serde(default = "default_stories_namespace")]
    pub stories_namespace: String,

    #[serde(default = "default_doc_top_k")]
    pub doc_top_k: usize,

    #[serde(default = "default_stories_top_k")]
    pub stories_top_k: usize,

    #[serde(default = "default_doc_threshold")]
    pub doc_threshold: f32,

    #[serde(default = "default_stories_threshold")]
    pub stories_threshold: f32,

    /// Surviving document hits actually rendered into the prompt.
    #[serde(default = "default_doc_hits")]
    pub doc_hits: usize,
}

fn default_vector_backend() -> String {
    "pinecone".into()
}
fn default_doc_namespace() -> String {
    "OntologyOne".into()
}
fn default_stories_namespace() -> String {
    "stories".into()
}
fn default_doc_top_k() -> usize {
    5
}
fn default_stories_top_k() -> usize {
    3
}
fn default_doc_threshold() -> f32 {
    0.5
}
fn default_stories_threshold() -> f32 {
    0.55
}
fn default_doc_hits() -> usize {
    2
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            backend: default_vector_backend(),
            index_url: None,
            api_key: None,
            seed_path: None,
            doc_namespace: default_doc_namespace(),
            stories_namespace: default_stories_namespace(),
            doc_top_k: default_doc_top_k(),
            stories_top_k: default_stories_top_k(),
            doc_threshold: default_doc_threshold(),
            stories_threshold: default_stories_threshold(),
            doc_hits: default_doc_hits(),
        }
    }
}

impl std::fmt::Debug for VectorDbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorDbConfig")
            .field("backend", &self.backend)
            .field("index_url", &self.index_url)
            .field("api_key", &redact(&self.api_key))
            .field("seed_path", &self.seed_path)
            .field("doc_namespace", &self.doc_namespace)
            .field("stories_namespace", &self.stories_namespace)
            .field("doc_top_k", &self.doc_top_k)
            .field("stories_top_k", &self.stories_top_k)
            .field("doc_threshold", &self.doc_threshold)
            .field("stories_threshold", &self.stories_threshold)
            .field("doc_hits", &self.doc_hits)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DocumentStoreConfig {
    #[serde(default)]
    pub owner: String,

    #[serde(default)]
    pub repo: String,

    #[serde(default = "default_app_name")]
    pub project: String,

    /// URL template for files at the project root.
    /// Placeholders: `{owner}`, `{repo}`, `{project}`, `{filename}`.
    #[serde(default = "default_file_url_base")]
    pub file_url_base: String,

    /// URL template for files in a sub-folder. Adds `{folder}`.
    #[serde(default = "default_file_url_child")]
    pub file_url_child: String,

    #[serde(default = "default_stories_folder")]
    pub stories_folder: String,

    #[serde(default = "default_images_folder")]
    pub images_folder: String,

    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

fn default_file_url_base() -> String {
    "https://raw.githubusercontent.com/{owner}/{repo}/main/{project}/{filename}".into()
}
fn default_file_url_child() -> String {
    "https://raw.githubusercontent.com/{owner}/{repo}/main/{project}/{folder}/{filename}".into()
}
fn default_stories_folder() -> String {
    "stories".into()
}
fn default_images_folder() -> String {
    "images".into()
}
fn default_cache_dir() -> PathBuf {
    std::env::temp_dir().join("parley_docs_cache")
}

impl Default for DocumentStoreConfig {
    fn default() -> Self {
        Self {
            owner: String::new(),
            repo: String::new(),
            project: default_app_name(),
            file_url_base: default_file_url_base(),
            file_url_child: default_file_url_child(),
            stories_folder: default_stories_folder(),
            images_folder: default_images_folder(),
            cache_dir: default_cache_dir(),
            token: None,
        }
    }
}

impl std::fmt::Debug for DocumentStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStoreConfig")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("project", &self.project)
            .field("file_url_base", &self.file_url_base)
            .field("file_url_child", &self.file_url_child)
            .field("stories_folder", &self.stories_folder)
            .field("images_folder", &self.images_folder)
            .field("cache_dir", &self.cache_dir)
            .field("token", &redact(&self.token))
            .finish()
    }
}

/// Domain vocabularies. All entries are matched lowercase and whole-word.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordConfig {
    /// Domain/location-like terms.
    #[serde(default = "default_ontology_keywords")]
    pub ontology: Vec<String>,

    /// Entity/role-like terms.
    #[serde(default = "default_focus_keywords")]
    pub focus: Vec<String>,

    /// Words that mark a question about the application itself.
    #[serde(default = "default_app_keywords")]
    pub app_specific: Vec<String>,

    /// Multi-word phrases matched as substrings of the lowercased text.
    #[serde(default = "default_app_phrases")]
    pub app_phrases: Vec<String>,

    #[serde(default = "default_technical_keywords")]
    pub technical: Vec<String>,
}

fn strings(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| (*w).to_string()).collect()
}

fn default_ontology_keywords() -> Vec<String> {
    strings(&["china", "germany", "ontologyone", "singapore", "usa", "unified"])
}

fn default_focus_keywords() -> Vec<String> {
    strings(&[
        "class", "cpf", "department", "employee", "entities", "entity", "individual",
        "instance", "object", "role", "position",
    ])
}

fn default_app_keywords() -> Vec<String> {
    strings(&[
        "advisor", "alarie", "aligning", "alignment", "america", "american", "app", "china",
        "chinese", "demo", "developer", "developers", "document", "documents",
        "documentation", "endpoint", "engineer", "engineers", "german", "germany",
        "globaltech", "member", "members", "motivation", "ontologyone", "project", "role",
        "roles", "singapore", "team", "timeline", "unified", "unifying", "us", "usa",
        "version",
    ])
}

fn default_app_phrases() -> Vec<String> {
    strings(&["full stack", "the states", "use case"])
}

fn default_technical_keywords() -> Vec<String> {
    strings(&[
        "advantage", "advantages", "ai", "api", "architecture", "backend", "chatbot", "cloud",
        "code", "database", "databases", "diagram", "diagrams", "disadvantage",
        "disadvantages", "embedding", "embeddings", "fastapi", "framework", "frontend",
        "graph", "image", "images", "inference", "knowledge", "language", "languages",
        "layer", "layers", "llm", "markdown", "model", "models", "ontology", "ontologies",
        "openai", "owl", "pic", "picture", "pictures", "prompt", "python", "quadstore",
        "query", "rag", "rdf", "rdfs", "react", "reasoning", "semantic", "shacl", "sparql",
        "store", "system", "swrl", "tech", "technical", "technology", "technologies",
        "token", "tools", "triplestore", "turtle", "ui", "ux", "vector",
    ])
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            ontology: default_ontology_keywords(),
            focus: default_focus_keywords(),
            app_specific: default_app_keywords(),
            app_phrases: default_app_phrases(),
            technical: default_technical_keywords(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GibberishConfig {
    /// Gibberish tokens / total tokens above which the input is rejected.
    #[serde(default = "default_gibberish_ratio")]
    pub ratio: f32,

    /// Newline-separated word list used as the lexical-frequency source.
    #[serde(default = "default_lexicon_path")]
    pub lexicon_path: PathBuf,

    /// Acronyms, names and short replies that are never gibberish.
    #[serde(default = "default_whitelist")]
    pub whitelist: Vec<String>,

    /// Conversational interjections.
    #[serde(default = "default_fillers")]
    pub fillers: Vec<String>,
}

fn default_gibberish_ratio() -> f32 {
    0.3
}
fn default_lexicon_path() -> PathBuf {
    PathBuf::from("/usr/share/dict/words")
}

fn default_whitelist() -> Vec<String> {
    strings(&[
        "a", "alarie", "an", "are", "as", "ask", "any", "bot", "call", "can", "demo", "did",
        "do", "essey", "ev", "e.v.", "for", "go", "harper", "her", "him", "how", "hr", "http",
        "https", "i", "in", "irl", "is", "it", "json", "me", "no", "not", "ok", "okay", "on",
        "one", "ontologyone", "pics", "pls", "rdf", "sc", "siewchoo", "so", "tay", "taylor",
        "tia", "thanks", "this", "that", "the", "thx", "to", "ty", "tyvm", "way", "what",
        "when", "who", "why", "xml", "yes", "you",
    ])
}

fn default_fillers() -> Vec<String> {
    strings(&[
        "ah", "eh", "hmm", "huh", "mmm", "la", "lah", "leh", "lor", "meh", "oh", "ooh", "uh",
        "um",
    ])
}

impl Default for GibberishConfig {
    fn default() -> Self {
        Self {
            ratio: default_gibberish_ratio(),
            lexicon_path: default_lexicon_path(),
            whitelist: default_whitelist(),
            fillers: default_fillers(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSearchConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// JSON array of `{file_name, description}` entries.
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,

    #[serde(default = "default_top_k_hits")]
    pub top_k_hits: usize,

    #[serde(default = "default_top_k_score_threshold")]
    pub top_k_score_threshold: f32,

    #[serde(default = "default_acceptable_k_hits")]
    pub acceptable_k_hits: usize,

    #[serde(default = "default_acceptable_score_threshold")]
    pub acceptable_score_threshold: f32,

    /// Minimum fuzzy similarity (0–100) for snapping a word to a canonical keyword.
    #[serde(default = "default_fuzzy_cutoff")]
    pub fuzzy_cutoff: f32,

    #[serde(default)]
    pub stopwords: Vec<String>,

    /// Lowercase word → replacement, applied before keyword matching.
    #[serde(default)]
    pub manual_corrections: BTreeMap<String, String>,
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("image_catalog.json")
}
fn default_top_k_hits() -> usize {
    3
}
fn default_top_k_score_threshold() -> f32 {
    0.8
}
fn default_acceptable_k_hits() -> usize {
    2
}
fn default_acceptable_score_threshold() -> f32 {
    0.7
}
fn default_fuzzy_cutoff() -> f32 {
    90.0
}

impl Default for ImageSearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            catalog_path: default_catalog_path(),
            top_k_hits: default_top_k_hits(),
            top_k_score_threshold: default_top_k_score_threshold(),
            acceptable_k_hits: default_acceptable_k_hits(),
            acceptable_score_threshold: default_acceptable_score_threshold(),
            fuzzy_cutoff: default_fuzzy_cutoff(),
            stopwords: vec![],
            manual_corrections: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponsesConfig {
    #[serde(default = "default_gibberish_response")]
    pub gibberish: String,

    #[serde(default = "default_retry_later_response")]
    pub retry_later: String,

    #[serde(default = "default_generation_failed_response")]
    pub generation_failed: String,
}

fn default_gibberish_response() -> String {
    "Hmm, I couldn't quite make that out. Could you rephrase your question?".into()
}
fn default_retry_later_response() -> String {
    "I'm getting a lot of questions right now. Please try again in a little while.".into()
}
fn default_generation_failed_response() -> String {
    "Sorry, something went wrong on my side while answering. Please try again.".into()
}

impl Default for ResponsesConfig {
    fn default() -> Self {
        Self {
            gibberish: default_gibberish_response(),
            retry_later: default_retry_later_response(),
            generation_failed: default_generation_failed_response(),
        }
    }
}

/// Profile JSON files per mode, merged left to right.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfilesConfig {
    /// Directory the file names are relative to. Defaults to the config file's directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    #[serde(default)]
    pub app: Vec<String>,

    #[serde(default)]
    pub technical: Vec<String>,

    #[serde(default)]
    pub persona: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStoreConfig {
    /// "sqlite" or "memory"
    #[serde(default = "default_session_backend")]
    pub backend: String,

    #[serde(default = "default_session_path")]
    pub path: String,

    /// Most sessions whose image keyword memory is kept at once.
    #[serde(default = "default_memory_capacity")]
    pub memory_capacity: u64,

    /// Seconds without a turn before a session's keyword memory is dropped.
    #[serde(default = "default_memory_idle_secs")]
    pub memory_idle_secs: u64,
}

fn default_session_backend() -> String {
    "sqlite".into()
}
fn default_session_path() -> String {
    "sqlite://parley_sessions.db".into()
}
fn default_memory_capacity() -> u64 {
    10_000
}
fn default_memory_idle_secs() -> u64 {
    3600
}

impl Default for SessionStoreConfig {
    fn default() -> Self {
        Self {
            backend: default_session_backend(),
            path: default_session_path(),
            memory_capacity: default_memory_capacity(),
            memory_idle_secs: default_memory_idle_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    /// Directory of a built frontend to serve under `/static`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_dir: Option<PathBuf>,
}

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:3000".into()]
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            allowed_origins: default_allowed_origins(),
            static_dir: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from `$PARLEY_CONFIG` or the default path.
    ///
    /// Secrets are taken from the environment when the file does not set them:
    /// - `PARLEY_API_KEY`, then `OPENAI_API_KEY` (generation and embeddings)
    /// - `PINECONE_API_KEY`
    /// - `GITHUB_TOKEN`
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// The path `load()` reads.
    pub fn config_path() -> PathBuf {
        std::env::var("PARLEY_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::config_dir().join("config.toml"))
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
            Self::from_toml_str(&content).map_err(|e| match e {
                ConfigError::ParseError { reason, .. } => ConfigError::ParseError {
                    path: path.to_path_buf(),
                    reason,
                },
                other => other,
            })?
        } else {
            tracing::info!("No config file found at {}, using defaults", path.display());
            Self::default()
        };

        if config.profiles.dir.is_none() {
            config.profiles.dir = path.parent().map(Path::to_path_buf);
        }

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse without touching the environment (used by tests and `load_from`).
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from("<inline>"),
            reason: e.to_string(),
        })
    }

    fn apply_env_overrides(&mut self) {
        let shared_key = std::env::var("PARLEY_API_KEY")
            .ok()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok());

        if self.generation.api_key.is_none() {
            self.generation.api_key = shared_key.clone();
        }
        if self.embedding.api_key.is_none() {
            self.embedding.api_key = shared_key;
        }
        if self.vector_db.api_key.is_none() {
            self.vector_db.api_key = std::env::var("PINECONE_API_KEY").ok();
        }
        if self.documents.token.is_none() {
            self.documents.token = std::env::var("GITHUB_TOKEN").ok();
        }
        if let Ok(model) = std::env::var("PARLEY_MODEL") {
            self.generation.model = model;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".parley")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(ConfigError::ValidationError(
                "generation.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.gibberish.ratio) {
            return Err(ConfigError::ValidationError(
                "gibberish.ratio must be between 0.0 and 1.0".into(),
            ));
        }

        if self.vector_db.doc_namespace.trim().is_empty()
            || self.vector_db.stories_namespace.trim().is_empty()
        {
            return Err(ConfigError::ValidationError(
                "vector_db namespaces must not be empty".into(),
            ));
        }

        if self.vector_db.doc_top_k == 0 || self.vector_db.stories_top_k == 0 {
            return Err(ConfigError::ValidationError(
                "vector_db top_k values must be > 0".into(),
            ));
        }

        if !matches!(self.vector_db.backend.as_str(), "pinecone" | "memory") {
            return Err(ConfigError::ValidationError(format!(
                "vector_db.backend must be \"pinecone\" or \"memory\", got \"{}\"",
                self.vector_db.backend
            )));
        }

        if !matches!(self.sessions.backend.as_str(), "sqlite" | "memory") {
            return Err(ConfigError::ValidationError(format!(
                "sessions.backend must be \"sqlite\" or \"memory\", got \"{}\"",
                self.sessions.backend
            )));
        }

        if self.sessions.memory_capacity == 0 || self.sessions.memory_idle_secs == 0 {
            return Err(ConfigError::ValidationError(
                "sessions.memory_capacity and sessions.memory_idle_secs must be > 0".into(),
            ));
        }

        let images = &self.images;
        if images.acceptable_score_threshold > images.top_k_score_threshold {
            return Err(ConfigError::ValidationError(
                "images.acceptable_score_threshold must not exceed images.top_k_score_threshold"
                    .into(),
            ));
        }
        if !(0.0..=100.0).contains(&images.fuzzy_cutoff) {
            return Err(ConfigError::ValidationError(
                "images.fuzzy_cutoff must be between 0 and 100".into(),
            ));
        }

        let ontology: HashSet<String> =
            self.keywords.ontology.iter().map(|k| k.to_lowercase()).collect();
        if let Some(shared) = self
            .keywords
            .focus
            .iter()
            .find(|k| ontology.contains(&k.to_lowercase()))
        {
            return Err(ConfigError::ValidationError(format!(
                "keyword \"{shared}\" is listed as both ontology and focus"
            )));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Invalid profile {path}: {reason}")]
    ProfileError { path: PathBuf, reason: String },

    #[error("Required resource unavailable at {path}: {reason}")]
    MissingResource { path: PathBuf, reason: String },
}

impl From<ConfigError> for parley_core::Error {
    fn from(err: ConfigError) -> Self {
        parley_core::Error::Config {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bot.max_history_pairs, 2);
        assert_eq!(config.vector_db.doc_hits, 2);
        assert!((config.gibberish.ratio - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = AppConfig::from_toml_str(&toml_str).unwrap();
        assert_eq!(parsed.bot.name, config.bot.name);
        assert_eq!(parsed.vector_db.doc_namespace, config.vector_db.doc_namespace);
        assert_eq!(parsed.keywords.ontology, config.keywords.ontology);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
[bot]
name = "Ada"

[images]
top_k_score_threshold = 0.85
acceptable_score_threshold = 0.72
acceptable_k_hits = 3

[images.manual_corrections]
germny = "germany"
"#,
        )
        .unwrap();
        assert_eq!(config.bot.name, "Ada");
        assert_eq!(config.bot.app_name, "OntologyOne");
        assert_eq!(config.images.acceptable_k_hits, 3);
        assert_eq!(
            config.images.manual_corrections.get("germny").map(String::as_str),
            Some("germany")
        );
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.generation.temperature = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn inverted_image_thresholds_rejected() {
        let mut config = AppConfig::default();
        config.images.acceptable_score_threshold = 0.9;
        config.images.top_k_score_threshold = 0.8;
        assert!(config.validate().is_err());
    }

    #[test]
    fn overlapping_vocabularies_rejected() {
        let mut config = AppConfig::default();
        config.keywords.focus.push("Germany".into());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("germany") || err.to_string().contains("Germany"));
    }

    #[test]
    fn unknown_backend_rejected() {
        let mut config = AppConfig::default();
        config.vector_db.backend = "faiss".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_keyword_memory_capacity_rejected() {
        let mut config = AppConfig::default();
        config.sessions.memory_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let err = AppConfig::from_toml_str("[bot\nname = 1").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/parley.toml")).unwrap();
        assert_eq!(config.bot.name, "Harper");
        assert_eq!(config.profiles.dir, Some(PathBuf::from("/nonexistent")));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let mut config = AppConfig::default();
        config.generation.api_key = Some("sk-secret".into());
        config.documents.token = Some("ghp_secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(!debug.contains("ghp_secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("OntologyOne"));
        assert!(toml_str.contains("max_history_pairs"));
    }
}
