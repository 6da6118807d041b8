//! Wire configured backends into a [`ChatPipeline`].

use parley_agent::{ChatPipeline, ContextRetriever, ImageCatalog, ImageReranker, WordListLexicon};
use parley_config::{AppConfig, ConfigHandle};
use parley_core::search::VectorSearch;
use parley_core::session::SessionStore;
use parley_docstore::GithubStore;
use parley_memory::{InMemorySessionStore, InMemoryVectorIndex, SqliteSessionStore};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

type BoxError = Box<dyn std::error::Error>;

/// Load configuration from `path`. Any error here is fatal.
pub fn load_config(path: &Path) -> Result<Arc<ConfigHandle>, BoxError> {
    let handle = ConfigHandle::load(path).map_err(|e| format!("Failed to load config: {e}"))?;
    Ok(Arc::new(handle))
}

pub async fn session_store(config: &AppConfig) -> Result<Arc<dyn SessionStore>, BoxError> {
    let sessions = &config.sessions;
    let store: Arc<dyn SessionStore> = match sessions.backend.as_str() {
        "memory" => Arc::new(InMemorySessionStore::new()),
        _ => Arc::new(SqliteSessionStore::new(&sessions.path).await?),
    };
    Ok(store)
}

pub fn vector_search(config: &AppConfig) -> Result<Arc<dyn VectorSearch>, BoxError> {
    let vector_db = &config.vector_db;
    let search: Arc<dyn VectorSearch> = match (vector_db.backend.as_str(), &vector_db.seed_path) {
        ("memory", Some(path)) => Arc::new(InMemoryVectorIndex::from_seed_file(path)?),
        ("memory", None) => Arc::new(InMemoryVectorIndex::new()),
        _ => parley_providers::build_pinecone(config)?,
    };
    Ok(search)
}

/// Build the full pipeline for `serve` and `chat`.
pub async fn build_pipeline(handle: Arc<ConfigHandle>) -> Result<Arc<ChatPipeline>, BoxError> {
    let snapshot = handle.snapshot();
    let config = &snapshot.config;

    let store = session_store(config).await?;
    let generator = parley_providers::build_generator(config)?;
    let (text_embedder, image_embedder) = parley_providers::build_embedders(config)?;
    let docs = Arc::new(GithubStore::new(config.documents.clone())?);

    let mut retriever = ContextRetriever::new(vector_search(config)?, text_embedder, docs);
    if config.images.enabled {
        let catalog = ImageCatalog::load(&config.images.catalog_path, image_embedder.as_ref()).await?;
        info!(images = catalog.len(), "Image catalog embedded");
        retriever = retriever.with_images(Arc::new(ImageReranker::new(Arc::new(catalog), image_embedder)));
    }

    let lexicon = WordListLexicon::load(&config.gibberish.lexicon_path)?;
    info!(
        words = lexicon.len(),
        sessions = store.name(),
        generator = config.generation.model.as_str(),
        "Pipeline ready"
    );

    Ok(Arc::new(ChatPipeline::new(
        handle,
        store,
        generator,
        retriever,
        Arc::new(lexicon),
    )))
}
