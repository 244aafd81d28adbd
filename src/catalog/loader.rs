use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::model::Catalog;
use crate::error::{CatalogError, CatalogResult};
use crate::models::RuleSource;

const BUILTIN_CATALOG: &str = include_str!("../../data/builtin_rules.json");

/// Somewhere a rule catalog can be read from.
#[async_trait]
pub trait CatalogLoader: Send + Sync {
    /// Human-readable origin, used in logs.
    fn describe(&self) -> String;

    async fn load(&self) -> CatalogResult<Catalog>;
}

/// The catalog compiled into the binary.
#[derive(Debug, Default, Clone)]
pub struct BuiltinCatalogLoader;

impl BuiltinCatalogLoader {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous variant; the embedded catalog needs no I/O.
    pub fn load_sync(&self) -> CatalogResult<Catalog> {
        Ok(Catalog::from_json("builtin", BUILTIN_CATALOG)?.with_source(RuleSource::Builtin, None))
    }
}

#[async_trait]
impl CatalogLoader for BuiltinCatalogLoader {
    fn describe(&self) -> String {
        "builtin".to_string()
    }

    async fn load(&self) -> CatalogResult<Catalog> {
        self.load_sync()
    }
}

/// A catalog JSON file on disk. Relative rule paths resolve against the
/// file's directory.
#[derive(Debug, Clone)]
pub struct FileCatalogLoader {
    path: PathBuf,
}

impl FileCatalogLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CatalogLoader for FileCatalogLoader {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn load(&self) -> CatalogResult<Catalog> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(CatalogError::NotFound {
                    path: self.path.clone(),
                })
            }
            Err(source) => {
                return Err(CatalogError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let catalog = Catalog::from_json(&self.describe(), &content)?;
        debug!(path = %self.path.display(), rules = catalog.rules.len(), "Loaded catalog file");
        Ok(catalog.with_source(RuleSource::Local, self.path.parent()))
    }
}

/// A catalog served over HTTP. Remote rules must carry inline content.
#[derive(Debug, Clone)]
pub struct RemoteCatalogLoader {
    client: Client,
    url: String,
}

impl RemoteCatalogLoader {
    pub fn new(url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();
        Self::with_client(client, url)
    }

    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl CatalogLoader for RemoteCatalogLoader {
    fn describe(&self) -> String {
        self.url.clone()
    }

    async fn load(&self) -> CatalogResult<Catalog> {
        let remote_err = |source| CatalogError::Remote {
            url: self.url.clone(),
            source,
        };

        let response = self
            .client
            .get(&self.url)
            .header("User-Agent", concat!("stackfit/", env!("CARGO_PKG_VERSION")))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(remote_err)?;

        if !response.status().is_success() {
            return Err(CatalogError::RemoteStatus {
                url: self.url.clone(),
                status: response.status().as_u16(),
            });
        }

        let body = response.text().await.map_err(remote_err)?;
        let catalog = Catalog::from_json(&self.url, &body)?;
        debug!(url = %self.url, rules = catalog.rules.len(), "Fetched remote catalog");
        Ok(catalog.with_source(RuleSource::Remote, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_catalog_is_valid() {
        let catalog = BuiltinCatalogLoader::new().load_sync().unwrap();
        assert!(catalog.contains("basic"));
        assert!(catalog.contains("react-ts"));
        assert!(catalog.rules.iter().all(|r| r.source == RuleSource::Builtin));
        assert!(catalog.rules.iter().all(|r| r.content().is_ok()));
    }

    #[tokio::test]
    async fn test_file_loader_not_found() {
        let dir = TempDir::new().unwrap();
        let loader = FileCatalogLoader::new(dir.path().join("rules.json"));
        let err = loader.load().await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound { .. }));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_file_loader_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, "not json").unwrap();
        let err = FileCatalogLoader::new(&path).load().await.unwrap_err();
        assert!(matches!(err, CatalogError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn test_file_loader_sets_provenance() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(
            &path,
            r#"{"rules":[{"id":"mine","name":"Mine","filePath":"mine.mdc"}],"version":"1.0.0","lastUpdated":"2026-02-01"}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("mine.mdc"), "# Mine").unwrap();

        let catalog = FileCatalogLoader::new(&path).load().await.unwrap();
        let rule = catalog.get("mine").unwrap();
        assert_eq!(rule.source, RuleSource::Local);
        assert_eq!(rule.content().unwrap(), "# Mine");
    }
}
