//! Pinecone vector search over the data-plane REST API.

use async_trait::async_trait;
use parley_core::error::SearchError;
use parley_core::search::{MetadataFilter, SearchHit, VectorSearch};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const API_VERSION: &str = "2024-07";

/// Queries one Pinecone index by its host URL.
pub struct PineconeIndex {
    index_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl PineconeIndex {
    pub fn new(index_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SearchError::RequestFailed(format!("HTTP client: {e}")))?;

        let mut index_url = index_url.into().trim_end_matches('/').to_string();
        if !index_url.starts_with("http://") && !index_url.starts_with("https://") {
            index_url = format!("https://{index_url}");
        }

        Ok(Self {
            index_url,
            api_key: api_key.into(),
            client,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    namespace: &'a str,
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl From<QueryMatch> for SearchHit {
    fn from(m: QueryMatch) -> Self {
        SearchHit {
            id: m.id,
            score: m.score,
            metadata: m.metadata.unwrap_or_default(),
        }
    }
}

#[async_trait]
impl VectorSearch for PineconeIndex {
    fn name(&self) -> &str {
        "pinecone"
    }

    async fn search(
        &self,
        namespace: &str,
        query_embedding: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let body = QueryRequest {
            namespace,
            vector: query_embedding,
            top_k,
            include_metadata: true,
            filter: filter.map(MetadataFilter::to_json),
        };

        debug!(namespace, top_k, filtered = filter.is_some(), "Querying Pinecone");

        let response = self
            .client
            .post(format!("{}/query", self.index_url))
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| SearchError::RequestFailed(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Pinecone query failed");
            return Err(SearchError::RequestFailed(format!(
                "status {status}: {error_body}"
            )));
        }

        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| SearchError::RequestFailed(format!("Failed to parse response: {e}")))?;

        let mut hits: Vec<SearchHit> = parsed.matches.into_iter().map(SearchHit::from).collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        Ok(hits)
    }
}
