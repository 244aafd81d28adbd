use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::debug;

use super::{add_dependencies, add_mapping, each_file, Extractor};
use crate::models::{Ecosystem, TechProfile};
use crate::tables::DetectionTables;
use crate::workspace::Workspace;

const DEPENDENCY_SECTIONS: &[&str] = &[
    "dependencies",
    "devDependencies",
    "peerDependencies",
    "optionalDependencies",
];

/// Maps `package.json` dependencies and scripts to technologies.
pub struct NodeExtractor {
    tables: Arc<DetectionTables>,
    max_manifests: usize,
}

impl NodeExtractor {
    pub fn new(tables: Arc<DetectionTables>, max_manifests: usize) -> Self {
        Self {
            tables,
            max_manifests,
        }
    }
}

impl Extractor for NodeExtractor {
    fn name(&self) -> &'static str {
        "node"
    }

    fn extract(&self, workspace: &dyn Workspace, profile: &mut TechProfile) -> Result<()> {
        let mut seen: HashSet<String> = HashSet::new();

        let manifests = each_file(workspace, self.name(), "package.json", self.max_manifests, |path, content| {
            let manifest = parse_package_json(content)
                .with_context(|| format!("Failed to parse {}", path.display()))?;

            let fresh: Vec<&str> = manifest
                .dependencies
                .iter()
                .filter(|name| seen.insert(name.to_string()))
                .map(String::as_str)
                .collect();
            add_dependencies(&self.tables, Ecosystem::Npm, fresh, profile);

            for script in &manifest.scripts {
                for mapping in self.tables.dependencies.scan_script(script) {
                    add_mapping(profile, mapping);
                }
            }
            Ok(())
        })?;

        debug!(manifests, dependencies = seen.len(), "Scanned package.json files");
        Ok(())
    }
}

#[derive(Debug, Default, PartialEq)]
struct PackageManifest {
    dependencies: Vec<String>,
    scripts: Vec<String>,
}

/// Pull dependency names from every dependency section, and the script
/// command lines.
fn parse_package_json(content: &str) -> Result<PackageManifest> {
    let json: Value = serde_json::from_str(content)?;
    let mut manifest = PackageManifest::default();

    for section in DEPENDENCY_SECTIONS {
        if let Some(pkgs) = json.get(section).and_then(|v| v.as_object()) {
            manifest.dependencies.extend(pkgs.keys().cloned());
        }
    }

    if let Some(scripts) = json.get("scripts").and_then(|v| v.as_object()) {
        manifest.scripts.extend(
            scripts
                .values()
                .filter_map(|v| v.as_str())
                .map(str::to_string),
        );
    }

    Ok(manifest)
}
