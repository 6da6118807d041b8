//! Multi-source context retrieval.
//!
//! Documents, stories and images are retrieved concurrently. Each source
//! fails on its own: an error is logged and that source contributes nothing.

use parley_config::AppConfig;
use parley_core::document::DocumentStore;
use parley_core::provider::Embedder;
use parley_core::search::{MetadataFilter, SearchHit, TextMatch, VectorSearch};
use parley_core::session::Session;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::enrichment::EnrichedQuery;
use crate::image::{self, ImageReranker, KeywordMemory};
use crate::keywords::KeywordSet;
use crate::mode::Mode;

/// Rendered context blocks. `None` means the section is left out of the prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextBundle {
    pub doc_context: Option<String>,
    pub story_context: Option<String>,
    pub image_context: Option<String>,
    pub history_context: Option<String>,
}

/// Everything one turn knows before retrieval starts.
pub struct RetrievalRequest<'a> {
    /// The raw user message, used for image search.
    pub user_message: &'a str,
    pub query: &'a EnrichedQuery,
    pub mode: Mode,
    pub session: &'a Session,
}

pub struct ContextRetriever {
    vector: Arc<dyn VectorSearch>,
    embedder: Arc<dyn Embedder>,
    docs: Arc<dyn DocumentStore>,
    images: Option<Arc<ImageReranker>>,
}

impl ContextRetriever {
    pub fn new(vector: Arc<dyn VectorSearch>, embedder: Arc<dyn Embedder>, docs: Arc<dyn DocumentStore>) -> Self {
        Self {
            vector,
            embedder,
            docs,
            images: None,
        }
    }

    pub fn with_images(mut self, reranker: Arc<ImageReranker>) -> Self {
        self.images = Some(reranker);
        self
    }

    pub fn has_images(&self) -> bool {
        self.images.is_some()
    }

    /// Gather every context block the mode calls for.
    ///
    /// Documents and images are App-only. Stories run in every mode.
    /// `memory` is the session's image keyword memory and is updated in place.
    pub async fn retrieve(
        &self,
        request: &RetrievalRequest<'_>,
        config: &AppConfig,
        keywords: &KeywordSet,
        memory: &mut KeywordMemory,
    ) -> ContextBundle {
        let history_context = render_history(request.session, config.bot.max_history_pairs);

        let embedding = match self.embedder.embed_text(&request.query.text).await {
            Ok(embedding) => Some(embedding),
            Err(e) => {
                warn!(error = %e, "Query embedding failed, skipping text sources");
                None
            }
        };
        let is_app = request.mode == Mode::App;

        let docs = async {
            match (&embedding, is_app) {
                (Some(embedding), true) => {
                    logged("documents", self.doc_context(embedding, &request.query.tags, config)).await
                }
                _ => None,
            }
        };
        let stories = async {
            match &embedding {
                Some(embedding) => logged("stories", self.story_context(embedding, request.mode, config)).await,
                None => None,
            }
        };
        let images = async {
            match &self.images {
                Some(reranker) if is_app && config.images.enabled => {
                    logged(
                        "images",
                        self.image_context(reranker, request.user_message, config, keywords, memory),
                    )
                    .await
                }
                _ => None,
            }
        };

        let (doc_context, story_context, image_context) = tokio::join!(docs, stories, images);

        debug!(
            mode = %request.mode,
            docs = doc_context.is_some(),
            stories = story_context.is_some(),
            images = image_context.is_some(),
            history = history_context.is_some(),
            "Context retrieved"
        );

        ContextBundle {
            doc_context,
            story_context,
            image_context,
            history_context,
        }
    }

    async fn doc_context(
        &self,
        embedding: &[f32],
        tags: &[String],
        config: &AppConfig,
    ) -> Result<Option<String>, parley_core::Error> {
        let vdb = &config.vector_db;
        let filter = (!tags.is_empty()).then(|| MetadataFilter::TagsIn(tags.to_vec()));

        let hits = self
            .vector
            .search(&vdb.doc_namespace, embedding, vdb.doc_top_k, filter.as_ref())
            .await?;
        let hits = above_threshold(hits, vdb.doc_threshold);

        let mut blocks = Vec::new();
        for hit in hits.iter().take(vdb.doc_hits) {
            let Some(doc) = TextMatch::from_hit(hit) else {
                warn!(id = %hit.id, "Skipping document hit without file_name");
                continue;
            };
            match self.render_document(&doc, config).await {
                Ok(block) => blocks.push(block),
                Err(e) => warn!(file_name = %doc.file_name, error = %e, "Document unavailable"),
            }
        }
        Ok(join_blocks(blocks))
    }

    async fn render_document(&self, doc: &TextMatch, config: &AppConfig) -> Result<String, parley_core::Error> {
        let handle = self
            .docs
            .fetch_cached(&config.documents.project, &doc.file_name, None)
            .await?;

        match &doc.pages {
            Some(pages) => {
                let pages = dedupe_pages(pages);
                debug!(file_name = %doc.file_name, pages = ?pages, "Extracting pages");
                Ok(self.docs.extract_text(&handle, Some(&pages)).await?)
            }
            None => {
                let text = self.docs.extract_text(&handle, None).await?;
                Ok(format!("## {}\n{}", title_from_file_name(&doc.file_name), text))
            }
        }
    }

    async fn story_context(
        &self,
        embedding: &[f32],
        mode: Mode,
        config: &AppConfig,
    ) -> Result<Option<String>, parley_core::Error> {
        let vdb = &config.vector_db;
        let hits = self
            .vector
            .search(&vdb.stories_namespace, embedding, vdb.stories_top_k, None)
            .await?;
        let hits = above_threshold(hits, vdb.stories_threshold);

        let take = match mode {
            Mode::Technical => 1,
            Mode::App | Mode::Persona => hits.len(),
        };

        let folder = config.documents.stories_folder.as_str();
        let mut blocks = Vec::new();
        for hit in hits.iter().take(take) {
            let Some(story) = TextMatch::from_hit(hit) else {
                warn!(id = %hit.id, "Skipping story hit without file_name");
                continue;
            };
            let text = async {
                let handle = self
                    .docs
                    .fetch_cached(&config.documents.project, &story.file_name, Some(folder))
                    .await?;
                self.docs.extract_text(&handle, None).await
            };
            match text.await {
                Ok(text) => blocks.push(format!("## {}\n{}", title_from_file_name(&story.file_name), text)),
                Err(e) => warn!(file_name = %story.file_name, error = %e, "Story unavailable"),
            }
        }
        Ok(join_blocks(blocks))
    }

    async fn image_context(
        &self,
        reranker: &ImageReranker,
        user_message: &str,
        config: &AppConfig,
        keywords: &KeywordSet,
        memory: &mut KeywordMemory,
    ) -> Result<Option<String>, parley_core::Error> {
        let result = reranker.search(user_message, &config.images, keywords, memory).await?;
        let matches = image::select(result, &config.images);

        let lines: Vec<String> = matches
            .iter()
            .map(|m| {
                format!(
                    "- image_url: {}, description: {}",
                    self.docs.file_url(&m.file_name, Some(&config.documents.images_folder)),
                    shorten_description(&m.description)
                )
            })
            .collect();

        Ok((!lines.is_empty()).then(|| lines.join("\n")))
    }
}

async fn logged<F>(source: &'static str, fut: F) -> Option<String>
where
    F: Future<Output = Result<Option<String>, parley_core::Error>>,
{
    match fut.await {
        Ok(context) => context,
        Err(e) => {
            warn!(source, error = %e, "Context source failed");
            None
        }
    }
}

fn above_threshold(hits: Vec<SearchHit>, threshold: f32) -> Vec<SearchHit> {
    hits.into_iter().filter(|hit| hit.score >= threshold).collect()
}

fn join_blocks(blocks: Vec<String>) -> Option<String> {
    (!blocks.is_empty()).then(|| blocks.join("\n\n"))
}

/// One-based page numbers to unique zero-based indices, first occurrence wins.
pub fn dedupe_pages(pages: &[u32]) -> Vec<usize> {
    let mut out: Vec<usize> = Vec::with_capacity(pages.len());
    for page in pages.iter().filter_map(|p| p.checked_sub(1)) {
        let page = page as usize;
        if !out.contains(&page) {
            out.push(page);
        }
    }
    out
}

/// `employee_handbook.pdf` → `Employee handbook`.
pub fn title_from_file_name(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);

    let mut chars = stem.chars();
    let capitalized = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.as_str().to_lowercase().chars()).collect(),
        None => String::new(),
    };
    capitalized.replace('_', " ")
}

/// Drop everything from the first `" in "` onwards.
pub fn shorten_description(description: &str) -> &str {
    description
        .split_once(" in ")
        .map_or(description, |(head, _)| head)
}

/// The newest `max_pairs` non-feedback turns as `User:`/`Bot:` line pairs.
pub fn render_history(session: &Session, max_pairs: usize) -> Option<String> {
    let turns: Vec<_> = session.history.iter().filter(|t| !t.is_feedback).collect();
    let start = turns.len().saturating_sub(max_pairs);

    let rendered: Vec<String> = turns[start..]
        .iter()
        .map(|t| format!("User: {}\nBot: {}", t.user_message, t.bot_response))
        .collect();

    (!rendered.is_empty()).then(|| rendered.join("\n"))
}
