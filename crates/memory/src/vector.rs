//! Vector similarity utilities and an in-process namespaced index.
//!
//! - Cosine similarity
//! - Top-k ranking with a score floor
//! - [`InMemoryVectorIndex`], a [`VectorSearch`] backend for local runs and tests

use async_trait::async_trait;
use parley_core::error::SearchError;
use parley_core::search::{MetadataFilter, SearchHit, VectorSearch};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if either vector is zero-length or empty.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Rank `(item, embedding)` pairs against a query, best first.
///
/// Ties keep input order. Items scoring below `min_score` are dropped.
pub fn rank_by_similarity<'a, T>(
    items: impl IntoIterator<Item = (&'a T, &'a [f32])>,
    query_embedding: &[f32],
    limit: usize,
    min_score: f32,
) -> Vec<(f32, &'a T)>
where
    T: 'a,
{
    let mut scored: Vec<(f32, &'a T)> = items
        .into_iter()
        .map(|(item, emb)| (cosine_similarity(emb, query_embedding), item))
        .filter(|(sim, _)| *sim >= min_score)
        .collect();

    // Stable sort keeps insertion order on ties
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);
    scored
}

/// A pre-embedded record stored in a namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Seed file layout: namespace → records.
pub type SeedFile = HashMap<String, Vec<VectorRecord>>;

/// A namespaced vector index held in memory.
pub struct InMemoryVectorIndex {
    namespaces: Arc<RwLock<HashMap<String, Vec<VectorRecord>>>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self {
            namespaces: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Load records from a JSON seed file.
    pub fn from_seed_file(path: &Path) -> Result<Self, SearchError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SearchError::RequestFailed(format!("Failed to read seed {}: {e}", path.display()))
        })?;
        let seed: SeedFile = serde_json::from_str(&content).map_err(|e| {
            SearchError::RequestFailed(format!("Invalid seed {}: {e}", path.display()))
        })?;

        let records: usize = seed.values().map(Vec::len).sum();
        tracing::info!(
            path = %path.display(),
            namespaces = seed.len(),
            records,
            "Loaded in-memory vector index"
        );
        Ok(Self {
            namespaces: Arc::new(RwLock::new(seed)),
        })
    }

    pub async fn upsert(&self, namespace: &str, record: VectorRecord) {
        let mut namespaces = self.namespaces.write().await;
        let records = namespaces.entry(namespace.to_string()).or_default();
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
    }

    pub async fn count(&self, namespace: &str) -> usize {
        self.namespaces
            .read()
            .await
            .get(namespace)
            .map_or(0, Vec::len)
    }
}

impl Default for InMemoryVectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorSearch for InMemoryVectorIndex {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn search(
        &self,
        namespace: &str,
        query_embedding: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let namespaces = self.namespaces.read().await;
        let records = namespaces
            .get(namespace)
            .ok_or_else(|| SearchError::UnknownNamespace(namespace.to_string()))?;

        if let Some(first) = records.first() {
            if first.values.len() != query_embedding.len() {
                return Err(SearchError::DimensionMismatch {
                    expected: first.values.len(),
                    actual: query_embedding.len(),
                });
            }
        }

        let candidates = records
            .iter()
            .filter(|r| filter.is_none_or(|f| f.matches(&r.metadata)))
            .map(|r| (r, r.values.as_slice()));

        Ok(rank_by_similarity(candidates, query_embedding, top_k, f32::MIN)
            .into_iter()
            .map(|(score, r)| SearchHit {
                id: r.id.clone(),
                score,
                metadata: r.metadata.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, values: Vec<f32>, tags: &[&str]) -> VectorRecord {
        VectorRecord {
            id: id.into(),
            values,
            metadata: json!({ "file_name": format!("{id}.pdf"), "tags": tags })
                .as_object()
                .cloned()
                .unwrap_or_default(),
        }
    }

    #[test]
    fn cosine_identical_vectors() {
        let v = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal_vectors() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn cosine_empty_and_mismatched() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn cosine_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn rank_keeps_insertion_order_on_ties() {
        let items = vec![("a", vec![1.0, 0.0]), ("b", vec![1.0, 0.0]), ("c", vec![0.0, 1.0])];
        let ranked = rank_by_similarity(
            items.iter().map(|(n, v)| (n, v.as_slice())),
            &[1.0, 0.0],
            3,
            0.5,
        );
        let names: Vec<&str> = ranked.iter().map(|(_, n)| **n).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn search_ranks_and_truncates() {
        let index = InMemoryVectorIndex::new();
        index.upsert("docs", record("far", vec![0.0, 1.0], &[])).await;
        index.upsert("docs", record("near", vec![1.0, 0.1], &[])).await;
        index.upsert("docs", record("mid", vec![1.0, 1.0], &[])).await;

        let hits = index.search("docs", &[1.0, 0.0], 2, None).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "near");
        assert_eq!(hits[1].id, "mid");
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn search_applies_tag_filter() {
        let index = InMemoryVectorIndex::new();
        index.upsert("stories", record("de", vec![1.0, 0.0], &["germany"])).await;
        index.upsert("stories", record("sg", vec![1.0, 0.0], &["singapore"])).await;

        let filter = MetadataFilter::TagsIn(vec!["singapore".into()]);
        let hits = index
            .search("stories", &[1.0, 0.0], 5, Some(&filter))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "sg");
    }

    #[tokio::test]
    async fn unknown_namespace_is_error() {
        let index = InMemoryVectorIndex::new();
        let err = index.search("nope", &[1.0], 1, None).await.unwrap_err();
        assert!(matches!(err, SearchError::UnknownNamespace(_)));
    }

    #[tokio::test]
    async fn dimension_mismatch_is_error() {
        let index = InMemoryVectorIndex::new();
        index.upsert("docs", record("a", vec![1.0, 0.0, 0.0], &[])).await;
        let err = index.search("docs", &[1.0, 0.0], 1, None).await.unwrap_err();
        assert!(matches!(
            err,
            SearchError::DimensionMismatch { expected: 3, actual: 2 }
        ));
    }

    #[tokio::test]
    async fn upsert_replaces_by_id() {
        let index = InMemoryVectorIndex::new();
        index.upsert("docs", record("a", vec![1.0, 0.0], &[])).await;
        index.upsert("docs", record("a", vec![0.0, 1.0], &[])).await;
        assert_eq!(index.count("docs").await, 1);
    }

    #[test]
    fn seed_file_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.json");
        std::fs::write(
            &path,
            r#"{ "docs": [ { "id": "d1", "values": [0.1, 0.2], "metadata": { "file_name": "a.pdf" } } ] }"#,
        )
        .unwrap();
        assert!(InMemoryVectorIndex::from_seed_file(&path).is_ok());
        assert!(InMemoryVectorIndex::from_seed_file(&dir.path().join("missing.json")).is_err());
    }
}
