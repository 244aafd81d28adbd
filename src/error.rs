use std::path::PathBuf;

use thiserror::Error;

/// Failures while loading or validating a rule catalog.
///
/// Unlike extraction failures these reach the caller: without a catalog
/// there is nothing to match against.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("rule catalog has not been loaded")]
    NotInitialized,

    #[error("rule catalog not found at {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("rule catalog {origin} is corrupt: {source}")]
    Corrupt {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rule catalog {origin} declares rule id '{id}' more than once")]
    DuplicateId { origin: String, id: String },

    #[error("rule '{id}' has no content")]
    MissingContent { id: String },

    #[error("failed to fetch rule catalog from {url}: {source}")]
    Remote {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("rule catalog request to {url} returned HTTP {status}")]
    RemoteStatus { url: String, status: u16 },
}

impl CatalogError {
    /// `true` for failures a caller may reasonably retry later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CatalogError::Remote { .. } | CatalogError::RemoteStatus { .. } | CatalogError::Io { .. }
        )
    }
}

/// Failures while loading the detection tables.
#[derive(Error, Debug)]
pub enum TableError {
    #[error("detection table {name} is malformed: {source}")]
    Malformed {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read detection table {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("alias '{alias}' maps to {canonical} but is already the canonical label {other}")]
    AliasConflict {
        alias: String,
        canonical: String,
        other: String,
    },

    #[error("invalid validator pattern for {technology}: {source}")]
    InvalidPattern {
        technology: String,
        #[source]
        source: regex::Error,
    },
}

pub type CatalogResult<T> = Result<T, CatalogError>;
