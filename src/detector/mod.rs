//! Tech-stack detection.
//!
//! Each [`Extractor`] looks for one kind of evidence and appends what it
//! finds to a [`TechProfile`]. The [`Detector`] runs them all, isolates
//! their failures, then normalizes the result, applies the combination
//! rules and scores it.

mod cloud;
mod combination;
mod config_files;
mod database;
mod dotnet;
mod extension;
mod go;
mod java;
mod node;
mod python;
mod rust;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use futures::future::join_all;
use tracing::{debug, info, warn};

pub use cloud::CloudExtractor;
pub use combination::CombinationExtractor;
pub use config_files::ConfigFileExtractor;
pub use database::DatabaseExtractor;
pub use dotnet::DotNetExtractor;
pub use extension::LanguageExtractor;
pub use go::GoExtractor;
pub use java::JvmExtractor;
pub use node::NodeExtractor;
pub use python::PythonExtractor;
pub use rust::RustExtractor;

use crate::confidence::ConfidenceScorer;
use crate::models::{Category, TechProfile};
use crate::normalize::Normalizer;
use crate::tables::{DetectionTables, Mapping};
use crate::workspace::Workspace;

/// One source of tech-stack evidence.
///
/// Implementations only ever add to the profile. Returning `Err` is fine:
/// the detector logs it and moves on to the next extractor.
pub trait Extractor: Send + Sync {
    fn name(&self) -> &'static str;

    fn extract(&self, workspace: &dyn Workspace, profile: &mut TechProfile) -> Result<()>;
}

/// Knobs bounding how much of the workspace detection looks at.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionOptions {
    /// Files sampled for extension counting.
    pub max_files: usize,
    /// A language needs at least this many files...
    pub min_count: usize,
    /// ...and at least this share of the sampled files.
    pub min_fraction: f64,
    /// Matches looked at per config-file pattern.
    pub glob_limit: usize,
    /// Manifests of one kind parsed per run.
    pub max_manifests: usize,
}

impl Default for DetectionOptions {
    fn default() -> Self {
        Self {
            max_files: 200,
            min_count: 3,
            min_fraction: 0.05,
            glob_limit: 10,
            max_manifests: 25,
        }
    }
}

pub struct Detector {
    extractors: Vec<Arc<dyn Extractor>>,
    combinations: CombinationExtractor,
    normalizer: Normalizer,
    scorer: ConfidenceScorer,
}

impl Detector {
    /// A detector running every built-in extractor.
    pub fn new(tables: Arc<DetectionTables>, options: DetectionOptions) -> Self {
        let normalizer = Normalizer::new(&tables.aliases);
        let extractors: Vec<Arc<dyn Extractor>> = vec![
            Arc::new(LanguageExtractor::new(
                Arc::clone(&tables),
                normalizer.clone(),
                options.clone(),
            )),
            Arc::new(ConfigFileExtractor::new(Arc::clone(&tables), options.glob_limit)),
            Arc::new(NodeExtractor::new(Arc::clone(&tables), options.max_manifests)),
            Arc::new(PythonExtractor::new(Arc::clone(&tables), options.max_manifests)),
            Arc::new(RustExtractor::new(Arc::clone(&tables), options.max_manifests)),
            Arc::new(JvmExtractor::new(Arc::clone(&tables), options.max_manifests)),
            Arc::new(DotNetExtractor::new(Arc::clone(&tables), options.max_manifests)),
            Arc::new(GoExtractor::new(Arc::clone(&tables), options.max_manifests)),
            Arc::new(CloudExtractor::new(Arc::clone(&tables), options.glob_limit)),
            Arc::new(DatabaseExtractor::new(Arc::clone(&tables), options.glob_limit)),
        ];

        Self {
            extractors,
            combinations: CombinationExtractor::new(&tables.combinations, normalizer.clone()),
            normalizer,
            scorer: ConfidenceScorer::new(&tables.compatibility),
        }
    }

    /// Append an extra extractor; it runs before the combination pass.
    pub fn with_extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractors.push(extractor);
        self
    }

    pub fn extractor_names(&self) -> Vec<&'static str> {
        self.extractors
            .iter()
            .map(|e| e.name())
            .chain(std::iter::once(self.combinations.name()))
            .collect()
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn scorer(&self) -> &ConfidenceScorer {
        &self.scorer
    }

    /// Run every extractor in order on one accumulator.
    pub fn detect(&self, workspace: &dyn Workspace) -> TechProfile {
        let mut profile = TechProfile::new();
        for extractor in &self.extractors {
            run_isolated(extractor.as_ref(), workspace, &mut profile);
        }
        self.finalize(profile, workspace)
    }

    /// Run the extractors in parallel, each on its own accumulator, then
    /// merge once all of them are done.
    pub async fn detect_concurrent(&self, workspace: Arc<dyn Workspace>) -> TechProfile {
        let tasks = self.extractors.iter().map(|extractor| {
            let extractor = Arc::clone(extractor);
            let workspace = Arc::clone(&workspace);
            tokio::task::spawn_blocking(move || {
                let mut local = TechProfile::new();
                run_isolated(extractor.as_ref(), workspace.as_ref(), &mut local);
                local
            })
        });

        let mut merged = TechProfile::new();
        for result in join_all(tasks).await {
            match result {
                Ok(local) => merged.merge(local),
                Err(err) => warn!(error = %err, "Extractor task did not complete"),
            }
        }
        self.finalize(merged, workspace.as_ref())
    }

    fn finalize(&self, raw: TechProfile, workspace: &dyn Workspace) -> TechProfile {
        let mut profile = self.normalizer.normalize_profile(&raw);
        run_isolated(&self.combinations, workspace, &mut profile);
        profile.confidence = self.scorer.score(&profile);

        info!(
            root = %workspace.root().display(),
            languages = profile.languages.len(),
            frameworks = profile.frameworks.len(),
            libraries = profile.libraries.len(),
            tools = profile.tools.len(),
            confidence = profile.confidence,
            "Detection finished"
        );
        profile
    }
}

fn run_isolated(extractor: &dyn Extractor, workspace: &dyn Workspace, profile: &mut TechProfile) {
    let before = profile.len();
    match extractor.extract(workspace, profile) {
        Ok(()) => debug!(
            extractor = extractor.name(),
            added = profile.len().saturating_sub(before),
            "Extractor finished"
        ),
        Err(err) => warn!(
            extractor = extractor.name(),
            error = %err,
            "Extractor failed, continuing with the rest"
        ),
    }
}

/// Run `f` over every file matching `pattern`, at most `limit` of them.
///
/// A file that cannot be read or parsed is logged and skipped so one bad
/// manifest does not hide its siblings. Returns how many files matched.
pub(crate) fn each_file<F>(
    workspace: &dyn Workspace,
    extractor: &str,
    pattern: &str,
    limit: usize,
    mut f: F,
) -> Result<usize>
where
    F: FnMut(&Path, &str) -> Result<()>,
{
    let files = workspace.find_files(pattern, limit)?;
    for path in &files {
        let result = workspace
            .read_to_string(path)
            .and_then(|content| f(path, &content));
        if let Err(err) = result {
            warn!(
                extractor,
                file = %path.display(),
                error = %err,
                "Skipping unreadable source"
            );
        }
    }
    Ok(files.len())
}

pub(crate) fn add_mapping(profile: &mut TechProfile, mapping: &Mapping) -> bool {
    profile.add(mapping.category, mapping.technology.as_str())
}

/// Map every name through one dependency table.
pub(crate) fn add_dependencies<'a, I>(
    tables: &DetectionTables,
    ecosystem: crate::models::Ecosystem,
    names: I,
    profile: &mut TechProfile,
) -> usize
where
    I: IntoIterator<Item = &'a str>,
{
    let mut added = 0;
    for name in names {
        if let Some(mapping) = tables.dependencies.lookup(ecosystem, name) {
            if add_mapping(profile, mapping) {
                added += 1;
            }
        }
    }
    added
}

pub(crate) fn add_database(profile: &mut TechProfile, technology: &str) -> bool {
    profile.add(Category::Tools, technology)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::MemoryWorkspace;
    use anyhow::bail;

    fn detector() -> Detector {
        let tables = Arc::new(DetectionTables::builtin().unwrap());
        Detector::new(tables, DetectionOptions::default())
    }

    fn react_workspace() -> MemoryWorkspace {
        let mut ws = MemoryWorkspace::new();
        for i in 0..5 {
            ws.add_file(format!("src/app{i}.ts"), "export {}");
        }
        for i in 0..3 {
            ws.add_file(format!("src/component{i}.tsx"), "export {}");
        }
        ws.add_file("package.json", r#"{"dependencies":{"react":"^18.2.0"}}"#);
        ws
    }

    struct Failing;

    impl Extractor for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn extract(&self, _: &dyn Workspace, profile: &mut TechProfile) -> Result<()> {
            profile.add(Category::Tools, "half-written");
            bail!("boom")
        }
    }

    struct Panicking;

    impl Extractor for Panicking {
        fn name(&self) -> &'static str {
            "panicking"
        }

        fn extract(&self, _: &dyn Workspace, _: &mut TechProfile) -> Result<()> {
            panic!("extractor bug")
        }
    }

    #[test]
    fn test_extractor_order() {
        assert_eq!(
            detector().extractor_names(),
            vec![
                "languages",
                "config-files",
                "node",
                "python",
                "rust",
                "jvm",
                "dotnet",
                "go",
                "cloud",
                "databases",
                "combinations"
            ]
        );
    }

    #[test]
    fn test_detect_react_typescript() {
        let profile = detector().detect(&react_workspace());
        assert_eq!(profile.languages.iter().collect::<Vec<_>>(), vec!["TypeScript"]);
        assert_eq!(profile.frameworks.iter().collect::<Vec<_>>(), vec!["React"]);
        assert!(profile.libraries.is_empty());
        assert!(profile.tools.is_empty());
        assert!(profile.confidence > 0.0);
    }

    #[test]
    fn test_empty_workspace_gives_empty_profile() {
        let profile = detector().detect(&MemoryWorkspace::new());
        assert!(profile.is_empty());
        assert_eq!(profile.confidence, 0.0);
    }

    #[test]
    fn test_failing_extractor_does_not_abort_run() {
        let d = detector().with_extractor(Arc::new(Failing));
        let profile = d.detect(&react_workspace());
        assert!(profile.contains(Category::Frameworks, "React"));
        // whatever it appended before failing stays
        assert!(profile.contains(Category::Tools, "Half-written"));
    }

    #[test]
    fn test_malformed_manifest_is_isolated() {
        let ws = react_workspace()
            .with_file("broken/package.json", "{ not json")
            .with_file("api/package.json", r#"{"dependencies":{"express":"^4"}}"#);
        let profile = detector().detect(&ws);
        assert!(profile.contains(Category::Frameworks, "React"));
        assert!(profile.contains(Category::Frameworks, "Express"));
    }

    #[test]
    fn test_combination_runs_after_everything_else() {
        let ws = react_workspace()
            .with_file(
                "server/package.json",
                r#"{"dependencies":{"express":"^4","mongoose":"^8"}}"#,
            )
            .with_file(".env", "MONGO_URL=mongodb://localhost:27017/app\n");
        let profile = detector().detect(&ws);
        assert!(profile.contains(Category::Tools, "MongoDB"));
        assert!(profile.contains(Category::Frameworks, "MERN Stack"));
    }

    #[tokio::test]
    async fn test_concurrent_matches_sequential() {
        let d = detector();
        let ws = react_workspace()
            .with_file("Dockerfile", "FROM node:20\n")
            .with_file("docker-compose.yml", "services:\n  db:\n    image: postgres:16\n");
        let sequential = d.detect(&ws);
        let concurrent = d.detect_concurrent(Arc::new(ws)).await;
        assert_eq!(sequential, concurrent);
    }

    #[tokio::test]
    async fn test_concurrent_survives_panicking_extractor() {
        let d = detector().with_extractor(Arc::new(Panicking));
        let profile = d.detect_concurrent(Arc::new(react_workspace())).await;
        assert!(profile.contains(Category::Frameworks, "React"));
    }
}
