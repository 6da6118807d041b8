//! Remote backends for Parley.
//!
//! - [`OpenAiCompatProvider`] implements both `Generator` and `Embedder`
//! - [`PineconeIndex`] implements `VectorSearch`
//!
//! The `build_*` functions construct backends from configuration.

pub mod openai_compat;
pub mod pinecone;

pub use openai_compat::OpenAiCompatProvider;
pub use pinecone::PineconeIndex;

use parley_config::AppConfig;
use parley_core::error::{ProviderError, SearchError};
use std::sync::Arc;
use std::time::Duration;

/// Build the generation backend.
pub fn build_generator(config: &AppConfig) -> Result<Arc<OpenAiCompatProvider>, ProviderError> {
    let generation = &config.generation;
    let api_key = generation
        .api_key
        .clone()
        .ok_or_else(|| ProviderError::NotConfigured("generation.api_key is not set".into()))?;

    Ok(Arc::new(OpenAiCompatProvider::with_timeout(
        "generation",
        &generation.api_url,
        api_key,
        Duration::from_secs(generation.timeout_secs),
    )?))
}

/// Build the text and image embedders, in that order.
pub fn build_embedders(
    config: &AppConfig,
) -> Result<(Arc<OpenAiCompatProvider>, Arc<OpenAiCompatProvider>), ProviderError> {
    let embedding = &config.embedding;
    let api_key = embedding
        .api_key
        .clone()
        .ok_or_else(|| ProviderError::NotConfigured("embedding.api_key is not set".into()))?;

    let text = OpenAiCompatProvider::new("text-embedding", &embedding.api_url, api_key.clone())?
        .with_embedding_model(&embedding.text_model);
    let image = OpenAiCompatProvider::new("image-embedding", &embedding.api_url, api_key)?
        .with_embedding_model(&embedding.image_model);

    Ok((Arc::new(text), Arc::new(image)))
}

/// Build the Pinecone index client.
pub fn build_pinecone(config: &AppConfig) -> Result<Arc<PineconeIndex>, SearchError> {
    let vector_db = &config.vector_db;
    let index_url = vector_db
        .index_url
        .clone()
        .ok_or_else(|| SearchError::RequestFailed("vector_db.index_url is not set".into()))?;
    let api_key = vector_db
        .api_key
        .clone()
        .ok_or_else(|| SearchError::RequestFailed("vector_db.api_key is not set".into()))?;

    Ok(Arc::new(PineconeIndex::new(index_url, api_key)?))
}
