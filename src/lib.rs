//! `stackfit`: detect what a project is built with and rank the rule
//! templates that fit it.
//!
//! # Flow
//! 1. Load the detection tables ([`tables::DetectionTables`]).
//! 2. Run the extractors over a [`workspace::Workspace`] ([`detector::Detector`]).
//! 3. Normalize, apply combination rules and score the profile
//!    ([`normalize`], [`confidence`]).
//! 4. Load rule catalogs into a [`catalog::RuleRegistry`].
//! 5. Rank the candidate rules against the profile ([`matcher::RuleMatcher`]).
//!
//! [`StackFit`] bundles all of it for hosts that want the whole pipeline.

pub mod catalog;
pub mod confidence;
pub mod config;
pub mod detector;
pub mod error;
pub mod logging;
pub mod matcher;
pub mod models;
pub mod normalize;
pub mod tables;
pub mod workspace;

use std::sync::Arc;

pub use catalog::{Catalog, CatalogLoader, RuleEntry, RuleRegistry};
pub use confidence::ConfidenceScorer;
pub use detector::{DetectionOptions, Detector, Extractor};
pub use error::{CatalogError, CatalogResult, TableError};
pub use matcher::{MatchOptions, MatchResult, RuleMatcher};
pub use models::{Category, RuleSource, TechProfile, TechStack};
pub use normalize::Normalizer;
pub use tables::DetectionTables;
pub use workspace::{FsWorkspace, MemoryWorkspace, Workspace};

/// Everything a host needs to go from a workspace to ranked rules.
///
/// Built once and passed around by reference.
pub struct StackFit {
    tables: Arc<DetectionTables>,
    detector: Detector,
    matcher: RuleMatcher,
    registry: RuleRegistry,
}

impl StackFit {
    /// A context with an empty rule registry.
    pub fn new(tables: Arc<DetectionTables>, options: DetectionOptions) -> Self {
        let detector = Detector::new(Arc::clone(&tables), options);
        let matcher = RuleMatcher::new(detector.normalizer().clone());
        Self {
            tables,
            detector,
            matcher,
            registry: RuleRegistry::new(),
        }
    }

    /// Built-in tables, default options, built-in rules loaded.
    pub fn builtin() -> anyhow::Result<Self> {
        let tables = Arc::new(DetectionTables::builtin()?);
        Ok(Self::new(tables, DetectionOptions::default()).with_builtin_rules()?)
    }

    pub fn with_builtin_rules(mut self) -> CatalogResult<Self> {
        let catalog = catalog::BuiltinCatalogLoader::new().load_sync()?;
        self.registry.insert(RuleSource::Builtin, catalog);
        Ok(self)
    }

    pub fn tables(&self) -> &Arc<DetectionTables> {
        &self.tables
    }

    pub fn detector(&self) -> &Detector {
        &self.detector
    }

    pub fn matcher(&self) -> &RuleMatcher {
        &self.matcher
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut RuleRegistry {
        &mut self.registry
    }

    pub fn detect(&self, workspace: &dyn Workspace) -> TechProfile {
        self.detector.detect(workspace)
    }

    /// Ranked rules of the partitions `options` includes.
    pub fn find_matches(
        &self,
        profile: &TechProfile,
        options: &MatchOptions,
    ) -> CatalogResult<Vec<MatchResult>> {
        let candidates = self.registry.candidates(options)?;
        Ok(self.matcher.find_matches(profile, candidates, options))
    }

    pub fn best_match(
        &self,
        profile: &TechProfile,
        options: &MatchOptions,
    ) -> CatalogResult<Option<MatchResult>> {
        let candidates = self.registry.candidates(options)?;
        Ok(self.matcher.best_match(profile, candidates, options))
    }
}
