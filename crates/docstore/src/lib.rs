//! Versioned document store backed by a GitHub repository.
//!
//! Files are fetched over HTTP on first access and cached on disk as
//! `{project}__{folder}__{file}` (or `{project}__{file}` at the project root).
//! A cached file is never re-fetched until it is deleted.

pub mod extract;

use async_trait::async_trait;
use parley_config::DocumentStoreConfig;
use parley_core::document::{DocumentHandle, DocumentStore};
use parley_core::error::DocumentError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct GithubStore {
    config: DocumentStoreConfig,
    client: reqwest::Client,
}

impl GithubStore {
    pub fn new(config: DocumentStoreConfig) -> Result<Self, DocumentError> {
        std::fs::create_dir_all(&config.cache_dir).map_err(|e| DocumentError::Cache {
            path: config.cache_dir.display().to_string(),
            reason: e.to_string(),
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| DocumentError::Network {
                file_name: String::new(),
                reason: format!("HTTP client: {e}"),
            })?;

        Ok(Self { config, client })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.config.cache_dir
    }

    /// Local cache path for a stored file.
    pub fn cache_path(&self, project: &str, file_name: &str, folder: Option<&str>) -> PathBuf {
        let name = match folder {
            Some(folder) => format!("{project}__{folder}__{file_name}"),
            None => format!("{project}__{file_name}"),
        };
        self.config.cache_dir.join(name)
    }

    /// Cached files for a project (and optional folder), sorted by path.
    pub fn list_cached(&self, project: &str, folder: Option<&str>) -> Result<Vec<PathBuf>, DocumentError> {
        let prefix = match folder {
            Some(folder) => format!("{project}__{folder}__"),
            None => format!("{project}__"),
        };

        let entries = std::fs::read_dir(&self.config.cache_dir).map_err(|e| DocumentError::Cache {
            path: self.config.cache_dir.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(&prefix))
            })
            .collect();
        files.sort();
        Ok(files)
    }

    /// Remove a cached file so the next access re-fetches it. Returns whether a file was removed.
    pub fn delete_cached(&self, project: &str, file_name: &str, folder: Option<&str>) -> Result<bool, DocumentError> {
        let path = self.cache_path(project, file_name, folder);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!(path = %path.display(), "Deleted cached file");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No cached file to delete");
                Ok(false)
            }
            Err(e) => Err(DocumentError::Cache {
                path: path.display().to_string(),
                reason: e.to_string(),
            }),
        }
    }

    fn validate_file_name(file_name: &str) -> Result<(), DocumentError> {
        if file_name.is_empty() || file_name.contains(['/', '\\']) || file_name.contains("..") {
            return Err(DocumentError::Cache {
                path: file_name.to_string(),
                reason: "file name must be a bare name".into(),
            });
        }
        Ok(())
    }

    async fn download(&self, url: &str, file_name: &str) -> Result<Vec<u8>, DocumentError> {
        let mut request = self.client.get(url);
        if let Some(token) = &self.config.token {
            request = request.header("Authorization", format!("token {token}"));
        }

        let response = request.send().await.map_err(|e| DocumentError::Network {
            file_name: file_name.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status().as_u16();
        if status != 200 {
            warn!(file_name, status, "Document fetch failed");
            return Err(DocumentError::Fetch {
                file_name: file_name.to_string(),
                status,
            });
        }

        let bytes = response.bytes().await.map_err(|e| DocumentError::Network {
            file_name: file_name.to_string(),
            reason: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }
}

fn fill_template(template: &str, config: &DocumentStoreConfig, file_name: &str, folder: Option<&str>) -> String {
    let url = template
        .replace("{owner}", &config.owner)
        .replace("{repo}", &config.repo)
        .replace("{project}", &config.project)
        .replace("{filename}", file_name);
    match folder {
        Some(folder) => url.replace("{folder}", folder),
        None => url,
    }
}

#[async_trait]
impl DocumentStore for GithubStore {
    async fn fetch_cached(
        &self,
        project: &str,
        file_name: &str,
        folder: Option<&str>,
    ) -> Result<DocumentHandle, DocumentError> {
        Self::validate_file_name(file_name)?;
        let path = self.cache_path(project, file_name, folder);

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            debug!(path = %path.display(), "Cache hit");
            return Ok(DocumentHandle {
                file_name: file_name.to_string(),
                path,
            });
        }

        let url = self.file_url(file_name, folder);
        debug!(file_name, url = %url, "Cache miss, fetching");
        let bytes = self.download(&url, file_name).await?;

        // Write beside the target then rename, so readers never see a partial file.
        let partial = path.with_extension("partial");
        let cache_err = |e: std::io::Error| DocumentError::Cache {
            path: path.display().to_string(),
            reason: e.to_string(),
        };
        tokio::fs::write(&partial, &bytes).await.map_err(cache_err)?;
        tokio::fs::rename(&partial, &path).await.map_err(cache_err)?;

        info!(file_name, bytes = bytes.len(), path = %path.display(), "Cached document");
        Ok(DocumentHandle {
            file_name: file_name.to_string(),
            path,
        })
    }

    async fn extract_text(
        &self,
        handle: &DocumentHandle,
        pages: Option<&[usize]>,
    ) -> Result<String, DocumentError> {
        let path = handle.path.clone();
        let is_pdf = handle.is_pdf();
        let pages = pages.map(<[usize]>::to_vec);

        tokio::task::spawn_blocking(move || extract::extract_text(&path, is_pdf, pages.as_deref()))
            .await
            .map_err(|e| DocumentError::Extraction {
                path: handle.path.display().to_string(),
                reason: format!("extraction task failed: {e}"),
            })?
    }

    fn file_url(&self, file_name: &str, folder: Option<&str>) -> String {
        match folder {
            Some(_) => fill_template(&self.config.file_url_child, &self.config, file_name, folder),
            None => fill_template(&self.config.file_url_base, &self.config, file_name, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(cache_dir: &Path) -> GithubStore {
        GithubStore::new(DocumentStoreConfig {
            owner: "acme".into(),
            repo: "knowledge".into(),
            project: "OntologyOne".into(),
            // Nothing listens here; any network access fails fast.
            file_url_base: "http://127.0.0.1:9/{owner}/{repo}/{project}/{filename}".into(),
            file_url_child: "http://127.0.0.1:9/{owner}/{repo}/{project}/{folder}/{filename}".into(),
            cache_dir: cache_dir.to_path_buf(),
            ..DocumentStoreConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn cache_path_naming() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(dir.path());
        assert_eq!(
            s.cache_path("OntologyOne", "story.md", Some("stories")),
            dir.path().join("OntologyOne__stories__story.md")
        );
        assert_eq!(
            s.cache_path("OntologyOne", "guide.pdf", None),
            dir.path().join("OntologyOne__guide.pdf")
        );
    }

    #[test]
    fn file_url_fills_templates() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(dir.path());
        assert_eq!(
            s.file_url("org.png", Some("images")),
            "http://127.0.0.1:9/acme/knowledge/OntologyOne/images/org.png"
        );
        assert_eq!(
            s.file_url("guide.pdf", None),
            "http://127.0.0.1:9/acme/knowledge/OntologyOne/guide.pdf"
        );
    }

    #[tokio::test]
    async fn cached_file_is_served_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(dir.path());
        std::fs::write(dir.path().join("OntologyOne__stories__tay.md"), "Tay met Alarie.").unwrap();

        let handle = s
            .fetch_cached("OntologyOne", "tay.md", Some("stories"))
            .await
            .unwrap();
        let text = s.extract_text(&handle, None).await.unwrap();
        assert_eq!(text, "Tay met Alarie.");
    }

    #[tokio::test]
    async fn cache_miss_with_unreachable_store_is_network_error() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(dir.path());
        let err = s.fetch_cached("OntologyOne", "absent.md", None).await.unwrap_err();
        assert!(matches!(err, DocumentError::Network { .. }));
    }

    #[tokio::test]
    async fn path_like_names_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(dir.path());
        assert!(s.fetch_cached("OntologyOne", "../etc/passwd", None).await.is_err());
    }

    #[test]
    fn list_and_delete_cached() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(dir.path());
        for name in [
            "OntologyOne__guide.pdf",
            "OntologyOne__stories__a.md",
            "OntologyOne__stories__b.md",
            "Other__x.md",
        ] {
            std::fs::write(dir.path().join(name), "x").unwrap();
        }

        assert_eq!(s.list_cached("OntologyOne", None).unwrap().len(), 3);
        let stories = s.list_cached("OntologyOne", Some("stories")).unwrap();
        assert_eq!(stories.len(), 2);
        assert!(stories[0].ends_with("OntologyOne__stories__a.md"));

        assert!(s.delete_cached("OntologyOne", "a.md", Some("stories")).unwrap());
        assert!(!s.delete_cached("OntologyOne", "a.md", Some("stories")).unwrap());
        assert_eq!(s.list_cached("OntologyOne", Some("stories")).unwrap().len(), 1);
    }
}
