use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use super::{add_dependencies, each_file, Extractor};
use crate::models::{Ecosystem, TechProfile};
use crate::tables::DetectionTables;
use crate::workspace::Workspace;

/// Analyzer for Python projects.
///
/// Reads `requirements*.txt`, `pyproject.toml` (PEP 621 and Poetry) and
/// `Pipfile`. Names are deduplicated the way PyPI compares them.
pub struct PythonExtractor {
    tables: Arc<DetectionTables>,
    max_manifests: usize,
}

impl PythonExtractor {
    pub fn new(tables: Arc<DetectionTables>, max_manifests: usize) -> Self {
        Self {
            tables,
            max_manifests,
        }
    }
}

impl Extractor for PythonExtractor {
    fn name(&self) -> &'static str {
        "python"
    }

    fn extract(&self, workspace: &dyn Workspace, profile: &mut TechProfile) -> Result<()> {
        let mut names: Vec<String> = Vec::new();

        each_file(workspace, self.name(), "requirements*.txt", self.max_manifests, |_, content| {
            names.extend(parse_requirements_txt(content)?);
            Ok(())
        })?;

        each_file(workspace, self.name(), "pyproject.toml", self.max_manifests, |path, content| {
            let parsed = parse_pyproject_toml(content)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            names.extend(parsed);
            Ok(())
        })?;

        each_file(workspace, self.name(), "Pipfile", self.max_manifests, |path, content| {
            let parsed =
                parse_pipfile(content).with_context(|| format!("Failed to parse {}", path.display()))?;
            names.extend(parsed);
            Ok(())
        })?;

        let mut seen: HashSet<String> = HashSet::new();
        names.retain(|n| seen.insert(Ecosystem::Pypi.lookup_key(n)));
        debug!(dependencies = names.len(), "Collected Python dependencies");

        add_dependencies(&self.tables, Ecosystem::Pypi, names.iter().map(String::as_str), profile);
        Ok(())
    }
}

/// Name part of a PEP 508 requirement: `name[extras] op version ; marker`.
fn requirement_name(re: &Regex, spec: &str) -> Option<String> {
    re.captures(spec.trim()).map(|caps| caps[1].to_string())
}

fn requirement_regex() -> Result<Regex> {
    Ok(Regex::new(r"^([A-Za-z0-9][A-Za-z0-9._\-]*)")?)
}

/// Parse `requirements.txt`. Options (`-r`, `-e`, `--index-url`), comments
/// and URLs are skipped.
fn parse_requirements_txt(content: &str) -> Result<Vec<String>> {
    let re = requirement_regex()?;
    let mut names = Vec::new();

    for line in content.lines() {
        let line = line.split(" #").next().unwrap_or(line).trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('-') || line.contains("://") {
            continue;
        }
        if let Some(name) = requirement_name(&re, line) {
            names.push(name);
        }
    }

    Ok(names)
}

#[derive(Debug, Default, Deserialize)]
struct Pyproject {
    project: Option<PyprojectProject>,
    tool: Option<PyprojectTool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct PyprojectProject {
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default)]
    optional_dependencies: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct PyprojectTool {
    poetry: Option<Poetry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct Poetry {
    #[serde(default)]
    dependencies: BTreeMap<String, toml::Value>,
    #[serde(default)]
    dev_dependencies: BTreeMap<String, toml::Value>,
    #[serde(default)]
    group: BTreeMap<String, PoetryGroup>,
}

#[derive(Debug, Default, Deserialize)]
struct PoetryGroup {
    #[serde(default)]
    dependencies: BTreeMap<String, toml::Value>,
}

fn parse_pyproject_toml(content: &str) -> Result<Vec<String>> {
    let pyproject: Pyproject = toml::from_str(content)?;
    let re = requirement_regex()?;
    let mut names = Vec::new();

    if let Some(project) = pyproject.project {
        let specs = project
            .dependencies
            .iter()
            .chain(project.optional_dependencies.values().flatten());
        names.extend(specs.filter_map(|s| requirement_name(&re, s)));
    }

    if let Some(poetry) = pyproject.tool.and_then(|t| t.poetry) {
        let tables = std::iter::once(&poetry.dependencies)
            .chain(std::iter::once(&poetry.dev_dependencies))
            .chain(poetry.group.values().map(|g| &g.dependencies));
        for table in tables {
            // `python = "^3.11"` is the interpreter constraint, not a package
            names.extend(table.keys().filter(|k| !k.eq_ignore_ascii_case("python")).cloned());
        }
    }

    Ok(names)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct Pipfile {
    #[serde(default)]
    packages: BTreeMap<String, toml::Value>,
    #[serde(default)]
    dev_packages: BTreeMap<String, toml::Value>,
}

fn parse_pipfile(content: &str) -> Result<Vec<String>> {
    let pipfile: Pipfile = toml::from_str(content)?;
    Ok(pipfile
        .packages
        .into_keys()
        .chain(pipfile.dev_packages.into_keys())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use crate::workspace::MemoryWorkspace;

    #[test]
    fn test_parse_requirements_txt() {
        let content = "# comment\n\
            requests==2.28.1\n\
            flask>=2.0.0\n\
            numpy==1.24.0 ; python_version >= '3.8'\n\
            uvicorn[standard]~=0.23\n\
            -r base.txt\n\
            -e git+https://github.com/x/y.git#egg=y\n\
            https://example.com/pkg.whl\n\
            celery  # workers\n";
        let names = parse_requirements_txt(content).unwrap();
        assert_eq!(names, vec!["requests", "flask", "numpy", "uvicorn", "celery"]);
    }

    #[test]
    fn test_parse_pyproject_pep621() {
        let content = r#"
[project]
name = "svc"
dependencies = ["fastapi>=0.110", "pydantic[email]"]

[project.optional-dependencies]
test = ["pytest"]
"#;
        let names = parse_pyproject_toml(content).unwrap();
        assert_eq!(names, vec!["fastapi", "pydantic", "pytest"]);
    }

    #[test]
    fn test_parse_pyproject_poetry() {
        let content = r#"
[tool.poetry.dependencies]
python = "^3.11"
Django = "^5.0"

[tool.poetry.group.dev.dependencies]
black = "*"
"#;
        let names = parse_pyproject_toml(content).unwrap();
        assert_eq!(names, vec!["Django", "black"]);
    }

    #[test]
    fn test_parse_pipfile() {
        let content = "[packages]\nflask = \"*\"\n\n[dev-packages]\npytest = \"*\"\n";
        assert_eq!(parse_pipfile(content).unwrap(), vec!["flask", "pytest"]);
    }

    #[test]
    fn test_extract_maps_through_pypi_table() {
        let ws = MemoryWorkspace::new()
            .with_file("requirements.txt", "Django==5.0\ndjangorestframework\n")
            .with_file("requirements-dev.txt", "pytest\n")
            .with_file("pyproject.toml", "[project\nbroken");
        let tables = Arc::new(DetectionTables::builtin().unwrap());
        let mut p = TechProfile::new();
        PythonExtractor::new(tables, 25).extract(&ws, &mut p).unwrap();
        assert!(p.contains(Category::Frameworks, "Django"));
        assert!(p.contains(Category::Frameworks, "Django REST Framework"));
        assert!(p.contains(Category::Tools, "pytest"));
    }
}
