use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;

use super::{add_dependencies, each_file, Extractor};
use crate::models::{Ecosystem, TechProfile};
use crate::tables::DetectionTables;
use crate::workspace::Workspace;

type DependencyMap = BTreeMap<String, toml::Value>;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct CargoManifest {
    #[serde(default)]
    dependencies: DependencyMap,
    #[serde(default)]
    dev_dependencies: DependencyMap,
    #[serde(default)]
    build_dependencies: DependencyMap,
    #[serde(default)]
    target: BTreeMap<String, CargoTarget>,
    workspace: Option<CargoWorkspace>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct CargoTarget {
    #[serde(default)]
    dependencies: DependencyMap,
    #[serde(default)]
    dev_dependencies: DependencyMap,
}

#[derive(Debug, Default, Deserialize)]
struct CargoWorkspace {
    #[serde(default)]
    dependencies: DependencyMap,
}

/// Maps `Cargo.toml` dependencies through the crates table.
pub struct RustExtractor {
    tables: Arc<DetectionTables>,
    max_manifests: usize,
}

impl RustExtractor {
    pub fn new(tables: Arc<DetectionTables>, max_manifests: usize) -> Self {
        Self {
            tables,
            max_manifests,
        }
    }
}

impl Extractor for RustExtractor {
    fn name(&self) -> &'static str {
        "rust"
    }

    fn extract(&self, workspace: &dyn Workspace, profile: &mut TechProfile) -> Result<()> {
        each_file(workspace, self.name(), "Cargo.toml", self.max_manifests, |path, content| {
            let crates = parse_cargo_toml(content)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            add_dependencies(&self.tables, Ecosystem::Crates, crates.iter().map(String::as_str), profile);
            Ok(())
        })?;
        Ok(())
    }
}

/// Crate names from every dependency table, with `package = "..."`
/// renames resolved to the real crate.
fn parse_cargo_toml(content: &str) -> Result<Vec<String>> {
    let manifest: CargoManifest = toml::from_str(content)?;

    let mut tables: Vec<&DependencyMap> = vec![
        &manifest.dependencies,
        &manifest.dev_dependencies,
        &manifest.build_dependencies,
    ];
    for target in manifest.target.values() {
        tables.push(&target.dependencies);
        tables.push(&target.dev_dependencies);
    }
    if let Some(ws) = &manifest.workspace {
        tables.push(&ws.dependencies);
    }

    let mut names: Vec<String> = Vec::new();
    for table in tables {
        for (key, value) in table {
            let name = value
                .get("package")
                .and_then(|p| p.as_str())
                .unwrap_or(key)
                .to_string();
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use crate::workspace::MemoryWorkspace;

    #[test]
    fn test_parse_cargo_toml() {
        let content = r#"
[package]
name = "svc"
version = "0.1.0"

[dependencies]
axum = "0.7"
tokio = { version = "1", features = ["full"] }
json = { package = "serde_json", version = "1" }

[dev-dependencies]
tokio = { version = "1", features = ["test-util"] }

[target.'cfg(unix)'.dependencies]
nix = "0.28"

[workspace.dependencies]
serde = "1"
"#;
        let names = parse_cargo_toml(content).unwrap();
        assert_eq!(names, vec!["axum", "serde_json", "tokio", "nix", "serde"]);
    }

    #[test]
    fn test_extract_maps_crates() {
        let ws = MemoryWorkspace::new()
            .with_file(
                "Cargo.toml",
                "[workspace]\nmembers = [\"api\"]\n[workspace.dependencies]\nserde = \"1\"\n",
            )
            .with_file("api/Cargo.toml", "[dependencies]\naxum = \"0.7\"\ntokio = \"1\"\n");
        let tables = Arc::new(DetectionTables::builtin().unwrap());
        let mut p = TechProfile::new();
        RustExtractor::new(tables, 25).extract(&ws, &mut p).unwrap();
        assert!(p.contains(Category::Frameworks, "Axum"));
        assert!(p.contains(Category::Libraries, "Tokio"));
        assert!(p.contains(Category::Libraries, "Serde"));
    }
}
