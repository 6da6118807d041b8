//! Vector similarity search contract and retrieval hit types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SearchError;

/// Metadata filter applied server-side by the vector search backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetadataFilter {
    /// Keep hits whose `tags` metadata array shares at least one value.
    TagsIn(Vec<String>),
}

impl MetadataFilter {
    /// Render in the `{"tags": {"$in": [...]}}` form most vector stores accept.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::TagsIn(tags) => serde_json::json!({ "tags": { "$in": tags } }),
        }
    }

    /// Evaluate against a hit's metadata (used by in-process indexes).
    pub fn matches(&self, metadata: &serde_json::Map<String, serde_json::Value>) -> bool {
        match self {
            Self::TagsIn(wanted) => metadata
                .get("tags")
                .and_then(|v| v.as_array())
                .is_some_and(|tags| {
                    tags.iter()
                        .filter_map(|t| t.as_str())
                        .any(|t| wanted.iter().any(|w| w == t))
                }),
        }
    }
}

/// One ranked result from the vector search backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// The vector similarity search contract.
///
/// Results must come back sorted by descending relevance.
#[async_trait]
pub trait VectorSearch: Send + Sync {
    fn name(&self) -> &str;

    async fn search(
        &self,
        namespace: &str,
        query_embedding: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> std::result::Result<Vec<SearchHit>, SearchError>;
}

/// A retrieval hit from a text corpus (documents or stories).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextMatch {
    pub file_name: String,
    pub score: f32,
    /// One-based page numbers as indexed; may repeat.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<Vec<u32>>,
}

impl TextMatch {
    /// Build from a raw hit. Hits without a `file_name` yield `None`.
    ///
    /// Pages may be stored as numbers or numeric strings; anything else is ignored.
    pub fn from_hit(hit: &SearchHit) -> Option<Self> {
        let file_name = hit
            .metadata
            .get("file_name")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())?
            .to_string();

        let pages = hit
            .metadata
            .get("pages")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|p| match p {
                        serde_json::Value::Number(n) => n.as_u64().map(|n| n as u32),
                        serde_json::Value::String(s) => s.trim().parse().ok(),
                        _ => None,
                    })
                    .collect::<Vec<u32>>()
            })
            .filter(|pages| !pages.is_empty());

        Some(Self {
            file_name,
            score: hit.score,
            pages,
        })
    }
}

/// A scored image candidate from the image catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMatch {
    pub file_name: String,
    pub score: f32,
    pub description: String,
}
