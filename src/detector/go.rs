use std::sync::Arc;

use anyhow::Result;

use super::{add_dependencies, each_file, Extractor};
use crate::models::{Ecosystem, TechProfile};
use crate::tables::DetectionTables;
use crate::workspace::Workspace;

/// Maps direct `go.mod` requirements to technologies.
pub struct GoExtractor {
    tables: Arc<DetectionTables>,
    max_manifests: usize,
}

impl GoExtractor {
    pub fn new(tables: Arc<DetectionTables>, max_manifests: usize) -> Self {
        Self {
            tables,
            max_manifests,
        }
    }
}

impl Extractor for GoExtractor {
    fn name(&self) -> &'static str {
        "go"
    }

    fn extract(&self, workspace: &dyn Workspace, profile: &mut TechProfile) -> Result<()> {
        each_file(workspace, self.name(), "go.mod", self.max_manifests, |_, content| {
            let modules = parse_go_mod(content);
            add_dependencies(&self.tables, Ecosystem::Go, modules.iter().map(String::as_str), profile);
            Ok(())
        })?;
        Ok(())
    }
}

/// Module paths from `require` directives, single-line and block form.
/// Requirements marked `// indirect` are transitive and skipped.
fn parse_go_mod(content: &str) -> Vec<String> {
    let mut modules = Vec::new();
    let mut in_block = false;

    for line in content.lines() {
        let line = line.trim();
        if in_block {
            if line.starts_with(')') {
                in_block = false;
                continue;
            }
            push_requirement(line, &mut modules);
            continue;
        }

        let Some(rest) = line.strip_prefix("require") else {
            continue;
        };
        let rest = rest.trim_start();
        if rest.starts_with('(') {
            in_block = true;
        } else if !rest.is_empty() {
            push_requirement(rest, &mut modules);
        }
    }

    modules
}

fn push_requirement(line: &str, modules: &mut Vec<String>) {
    if line.is_empty() || line.starts_with("//") || line.contains("// indirect") {
        return;
    }
    if let Some(path) = line.split_whitespace().next() {
        modules.push(path.trim_matches('"').to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use crate::workspace::MemoryWorkspace;

    const GO_MOD: &str = r#"module example.com/api

go 1.22

require github.com/spf13/cobra v1.8.0

require (
	github.com/gin-gonic/gin v1.9.1
	gorm.io/gorm v1.25.5
	// a comment
	golang.org/x/net v0.19.0 // indirect
)
"#;

    #[test]
    fn test_parse_go_mod() {
        assert_eq!(
            parse_go_mod(GO_MOD),
            vec!["github.com/spf13/cobra", "github.com/gin-gonic/gin", "gorm.io/gorm"]
        );
    }

    #[test]
    fn test_extract_uses_module_prefixes() {
        let ws = MemoryWorkspace::new().with_file("go.mod", GO_MOD);
        let tables = Arc::new(DetectionTables::builtin().unwrap());
        let mut p = TechProfile::new();
        GoExtractor::new(tables, 25).extract(&ws, &mut p).unwrap();
        assert!(p.contains(Category::Frameworks, "Gin"));
        assert!(p.contains(Category::Libraries, "GORM"));
        assert!(p.contains(Category::Libraries, "Cobra"));
    }
}
