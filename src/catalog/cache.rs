use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::loader::CatalogLoader;
use super::model::Catalog;
use crate::error::CatalogResult;

/// Memoizes another loader's result for `ttl`.
///
/// Failures are not cached; the next call tries the inner loader again.
pub struct CachedCatalogLoader<L> {
    inner: L,
    ttl: Duration,
    cached: Mutex<Option<(Instant, Catalog)>>,
}

impl<L: CatalogLoader> CachedCatalogLoader<L> {
    pub fn new(inner: L, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            cached: Mutex::new(None),
        }
    }

    /// Drop the cached catalog so the next `load` goes to the source.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }
}

#[async_trait]
impl<L: CatalogLoader> CatalogLoader for CachedCatalogLoader<L> {
    fn describe(&self) -> String {
        self.inner.describe()
    }

    async fn load(&self) -> CatalogResult<Catalog> {
        let mut cached = self.cached.lock().await;
        if let Some((loaded_at, catalog)) = cached.as_ref() {
            if loaded_at.elapsed() < self.ttl {
                debug!(origin = %self.inner.describe(), "Catalog served from cache");
                return Ok(catalog.clone());
            }
        }

        let catalog = self.inner.load().await?;
        *cached = Some((Instant::now(), catalog.clone()));
        Ok(catalog)
    }
}
