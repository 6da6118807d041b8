//! Document store contract: versioned files fetched once and cached locally.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::DocumentError;

/// A handle to a locally cached copy of a stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentHandle {
    pub file_name: String,
    pub path: PathBuf,
}

impl DocumentHandle {
    /// Whether the cached file should be read as a paginated PDF.
    pub fn is_pdf(&self) -> bool {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
    }
}

/// The document/file store contract.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a file, downloading and caching it on first access.
    async fn fetch_cached(
        &self,
        project: &str,
        file_name: &str,
        folder: Option<&str>,
    ) -> std::result::Result<DocumentHandle, DocumentError>;

    /// Extract text. `pages = None` means the whole document; page numbers are zero-based.
    async fn extract_text(
        &self,
        handle: &DocumentHandle,
        pages: Option<&[usize]>,
    ) -> std::result::Result<String, DocumentError>;

    /// Public URL of a stored file (used to link images in prompts).
    fn file_url(&self, file_name: &str, folder: Option<&str>) -> String;
}
