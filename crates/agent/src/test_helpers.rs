//! Shared test doubles for the agent's collaborators.

use async_trait::async_trait;
use parley_core::document::{DocumentHandle, DocumentStore};
use parley_core::error::{DocumentError, ProviderError, SearchError};
use parley_core::provider::{Embedder, GenerationRequest, GenerationResponse, Generator};
use parley_core::search::{MetadataFilter, SearchHit, VectorSearch};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Mutex;

use crate::keywords::words;

/// Build a search hit from a JSON metadata object.
pub fn hit(id: &str, score: f32, metadata: serde_json::Value) -> SearchHit {
    SearchHit {
        id: id.into(),
        score,
        metadata: metadata.as_object().cloned().unwrap_or_default(),
    }
}

/// Embeds text as per-keyword occurrence counts, one dimension per keyword.
#[derive(Default)]
pub struct KeywordEmbedder {
    vocabulary: Vec<String>,
    fail: bool,
}

impl KeywordEmbedder {
    pub fn new<I, S>(vocabulary: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            vocabulary: vocabulary.into_iter().map(Into::into).collect(),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            vocabulary: vec![],
            fail: true,
        }
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    fn model(&self) -> &str {
        "keyword-mock"
    }

    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        if self.fail {
            return Err(ProviderError::Network("embedding service unreachable".into()));
        }
        let words = words(text);
        Ok(self
            .vocabulary
            .iter()
            .map(|k| words.iter().filter(|w| *w == k).count() as f32)
            .collect())
    }
}

/// Returns scripted outcomes in order, then echoes a fixed reply. Records every prompt.
pub struct MockGenerator {
    outcomes: Mutex<VecDeque<Result<String, ProviderError>>>,
    prompts: Mutex<Vec<GenerationRequest>>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn then_reply(self, text: &str) -> Self {
        self.outcomes.lock().unwrap().push_back(Ok(text.into()));
        self
    }

    pub fn then_fail(self, error: ProviderError) -> Self {
        self.outcomes.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl Generator for MockGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, ProviderError> {
        let model = request.model.clone();
        self.prompts.lock().unwrap().push(request);
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("mock reply".into()));

        outcome.map(|text| GenerationResponse {
            text,
            model,
            usage: None,
        })
    }
}

/// Fixed hits per namespace. Filters are recorded, not applied.
#[derive(Default)]
pub struct MockVectorSearch {
    hits: HashMap<String, Vec<SearchHit>>,
    failing: HashSet<String>,
    calls: Mutex<Vec<(String, Option<MetadataFilter>)>>,
}

impl MockVectorSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hits(mut self, namespace: &str, hits: Vec<SearchHit>) -> Self {
        self.hits.insert(namespace.into(), hits);
        self
    }

    pub fn failing_namespace(mut self, namespace: &str) -> Self {
        self.failing.insert(namespace.into());
        self
    }

    pub fn calls(&self) -> Vec<(String, Option<MetadataFilter>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl VectorSearch for MockVectorSearch {
    fn name(&self) -> &str {
        "mock"
    }

    async fn search(
        &self,
        namespace: &str,
        _query_embedding: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchHit>, SearchError> {
        self.calls
            .lock()
            .unwrap()
            .push((namespace.to_string(), filter.cloned()));

        if self.failing.contains(namespace) {
            return Err(SearchError::RequestFailed(format!("{namespace} is down")));
        }
        Ok(self
            .hits
            .get(namespace)
            .map(|hits| hits.iter().take(top_k).cloned().collect())
            .unwrap_or_default())
    }
}

/// In-memory files keyed by folder and name, each a list of pages.
#[derive(Default)]
pub struct MockDocumentStore {
    files: HashMap<(Option<String>, String), Vec<String>>,
}

impl MockDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, folder: Option<&str>, file_name: &str, pages: &[&str]) -> Self {
        self.files.insert(
            (folder.map(str::to_string), file_name.to_string()),
            pages.iter().map(|p| p.to_string()).collect(),
        );
        self
    }
}

#[async_trait]
impl DocumentStore for MockDocumentStore {
    async fn fetch_cached(
        &self,
        _project: &str,
        file_name: &str,
        folder: Option<&str>,
    ) -> Result<DocumentHandle, DocumentError> {
        let key = (folder.map(str::to_string), file_name.to_string());
        if !self.files.contains_key(&key) {
            return Err(DocumentError::Fetch {
                file_name: file_name.into(),
                status: 404,
            });
        }
        Ok(DocumentHandle {
            file_name: file_name.into(),
            path: PathBuf::from(format!("/mock/{}/{file_name}", folder.unwrap_or("root"))),
        })
    }

    async fn extract_text(&self, handle: &DocumentHandle, pages: Option<&[usize]>) -> Result<String, DocumentError> {
        let folder = handle
            .path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|f| f.to_str())
            .filter(|f| *f != "root")
            .map(str::to_string);
        let all = self
            .files
            .get(&(folder, handle.file_name.clone()))
            .ok_or_else(|| DocumentError::Extraction {
                path: handle.path.display().to_string(),
                reason: "not in mock store".into(),
            })?;

        match pages {
            None => Ok(all.join("\n")),
            Some(pages) => pages
                .iter()
                .map(|&p| {
                    all.get(p).map(|text| format!("{text}\n")).ok_or(DocumentError::PageOutOfRange {
                        path: handle.path.display().to_string(),
                        page: p,
                        total: all.len(),
                    })
                })
                .collect(),
        }
    }

    fn file_url(&self, file_name: &str, folder: Option<&str>) -> String {
        match folder {
            Some(folder) => format!("https://files.test/{folder}/{file_name}"),
            None => format!("https://files.test/{file_name}"),
        }
    }
}
