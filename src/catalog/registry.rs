use std::collections::BTreeMap;

use tracing::{info, warn};

use super::loader::CatalogLoader;
use super::model::{Catalog, RuleEntry};
use crate::error::{CatalogError, CatalogResult};
use crate::matcher::MatchOptions;
use crate::models::RuleSource;

/// The loaded rule catalogs, one per source.
///
/// Built by the host and passed to whoever needs rules; nothing here is
/// global.
#[derive(Debug, Default, Clone)]
pub struct RuleRegistry {
    catalogs: BTreeMap<RuleSource, Catalog>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `catalog` as the partition for `source`, replacing any
    /// previous one.
    pub fn insert(&mut self, source: RuleSource, mut catalog: Catalog) {
        for rule in &mut catalog.rules {
            rule.source = source;
        }
        self.catalogs.insert(source, catalog);
    }

    /// Load one partition. On failure the previous partition, if any, is
    /// left in place.
    pub async fn load(
        &mut self,
        source: RuleSource,
        loader: &dyn CatalogLoader,
    ) -> CatalogResult<usize> {
        match loader.load().await {
            Ok(catalog) => {
                let count = catalog.rules.len();
                info!(%source, origin = %loader.describe(), rules = count, "Rule catalog loaded");
                self.insert(source, catalog);
                Ok(count)
            }
            Err(err) => {
                warn!(%source, origin = %loader.describe(), error = %err, "Rule catalog failed to load");
                Err(err)
            }
        }
    }

    pub fn catalog(&self, source: RuleSource) -> Option<&Catalog> {
        self.catalogs.get(&source)
    }

    pub fn is_empty(&self) -> bool {
        self.catalogs.is_empty()
    }

    /// Rules of every partition the options include: builtin first, then
    /// local, then remote, each in catalog order.
    pub fn candidates(&self, options: &MatchOptions) -> CatalogResult<Vec<&RuleEntry>> {
        if self.catalogs.is_empty() {
            return Err(CatalogError::NotInitialized);
        }
        Ok(RuleSource::ALL
            .into_iter()
            .filter(|source| options.includes(*source))
            .filter_map(|source| self.catalogs.get(&source))
            .flat_map(|catalog| catalog.rules.iter())
            .collect())
    }

    /// Look a rule up by id. Local rules shadow remote ones, which shadow
    /// builtin ones.
    pub fn get(&self, id: &str) -> Option<&RuleEntry> {
        [RuleSource::Local, RuleSource::Remote, RuleSource::Builtin]
            .iter()
            .filter_map(|s| self.catalogs.get(s))
            .find_map(|c| c.get(id))
    }

    /// The rule a host falls back to when nothing matched.
    pub fn basic_rule(&self) -> Option<&RuleEntry> {
        self.get("basic")
    }
}
