use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::detector::DetectionOptions;
use crate::matcher::MatchOptions;
use crate::workspace::default_excluded_dirs;

/// Root configuration, deserialized from `.stackfit/config.toml`.
/// Every section and every key is optional.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub detection: DetectionConfig,
    pub matching: MatchingConfig,
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub max_files: usize,
    pub min_count: usize,
    pub min_fraction: f64,
    pub glob_limit: usize,
    pub max_manifests: usize,
    /// Upper bound on files the workspace walk collects.
    pub max_walk_entries: usize,
    pub max_depth: usize,
    pub excluded_dirs: Vec<String>,
    pub respect_gitignore: bool,
    /// Run extractors on the blocking thread pool.
    pub concurrent: bool,
    /// Directory with table files extending the built-in ones.
    pub tables_dir: Option<PathBuf>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        let options = DetectionOptions::default();
        Self {
            max_files: options.max_files,
            min_count: options.min_count,
            min_fraction: options.min_fraction,
            glob_limit: options.glob_limit,
            max_manifests: options.max_manifests,
            max_walk_entries: 20_000,
            max_depth: 12,
            excluded_dirs: default_excluded_dirs(),
            respect_gitignore: false,
            concurrent: false,
            tables_dir: None,
        }
    }
}

impl DetectionConfig {
    pub fn options(&self) -> DetectionOptions {
        DetectionOptions {
            max_files: self.max_files,
            min_count: self.min_count,
            min_fraction: self.min_fraction,
            glob_limit: self.glob_limit,
            max_manifests: self.max_manifests,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub limit: usize,
    pub min_score: f64,
    pub include_builtin: bool,
    pub include_local: bool,
    pub include_remote: bool,
    /// Preferred language for localized rule names.
    pub lang: String,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        let options = MatchOptions::default();
        Self {
            limit: options.limit,
            min_score: options.min_score,
            include_builtin: options.include_builtin,
            include_local: options.include_local,
            include_remote: options.include_remote,
            lang: "en".to_string(),
        }
    }
}

impl MatchingConfig {
    pub fn options(&self) -> MatchOptions {
        MatchOptions {
            limit: self.limit,
            min_score: self.min_score,
            include_builtin: self.include_builtin,
            include_local: self.include_local,
            include_remote: self.include_remote,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Local catalog file; relative paths resolve against the project.
    pub local: Option<PathBuf>,
    /// URL of a remote catalog.
    pub remote: Option<String>,
    /// How long a fetched remote catalog is reused.
    pub cache_ttl_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            local: None,
            remote: None,
            cache_ttl_secs: 3600,
        }
    }
}

impl CatalogConfig {
    pub fn local_path(&self, project_path: &Path) -> Option<PathBuf> {
        self.local.as_ref().map(|p| {
            if p.is_absolute() {
                p.clone()
            } else {
                project_path.join(p)
            }
        })
    }
}

fn read_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config {}", path.display()))?;
    debug!(path = %path.display(), "Loaded configuration");
    Ok(config)
}

/// Load the configuration, searching in order:
///
/// 1. `config_override`, the path passed via `--config`
/// 2. `<project_path>/.stackfit/config.toml`
/// 3. `~/.config/stackfit/config.toml`
/// 4. Built-in [`Config::default`]
pub fn load_config(project_path: &Path, config_override: Option<&Path>) -> Result<Config> {
    if let Some(path) = config_override {
        return read_config(path);
    }

    let project_config = project_path.join(".stackfit").join("config.toml");
    if project_config.exists() {
        return read_config(&project_config);
    }

    if let Some(home) = dirs::home_dir() {
        let home_config = home.join(".config").join("stackfit").join("config.toml");
        if home_config.exists() {
            return read_config(&home_config);
        }
    }

    Ok(Config::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_library_defaults() {
        let config = Config::default();
        assert_eq!(config.detection.options(), DetectionOptions::default());
        assert_eq!(config.matching.options(), MatchOptions::default());
        assert_eq!(config.catalog.cache_ttl_secs, 3600);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config: Config = toml::from_str(
            r#"
[detection]
min_count = 5
excluded_dirs = ["node_modules"]

[matching]
limit = 3
include_remote = true

[catalog]
remote = "https://rules.example.com/catalog.json"
"#,
        )
        .unwrap();
        assert_eq!(config.detection.min_count, 5);
        assert_eq!(config.detection.max_files, 200);
        assert_eq!(config.detection.excluded_dirs, vec!["node_modules"]);
        assert_eq!(config.matching.limit, 3);
        assert!(config.matching.include_remote);
        assert_eq!(config.matching.min_score, 0.3);
        assert_eq!(
            config.catalog.remote.as_deref(),
            Some("https://rules.example.com/catalog.json")
        );
    }

    #[test]
    fn test_project_config_is_found() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(".stackfit")).unwrap();
        fs::write(
            dir.path().join(".stackfit/config.toml"),
            "[catalog]\nlocal = \"rules/meta.json\"\n",
        )
        .unwrap();

        let config = load_config(dir.path(), None).unwrap();
        assert_eq!(
            config.catalog.local_path(dir.path()),
            Some(dir.path().join("rules/meta.json"))
        );
    }

    #[test]
    fn test_override_must_parse() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[detection\n").unwrap();
        assert!(load_config(dir.path(), Some(&path)).is_err());
    }
}
