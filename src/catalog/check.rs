use std::path::{Path, PathBuf};

use serde::Serialize;

use super::model::{resolve_file, Catalog};

/// A catalog path that does not exist on disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingPath {
    pub rule_id: String,
    /// `None` when the rule's own `filePath` is missing.
    pub file: Option<String>,
    pub expected: PathBuf,
}

impl Catalog {
    /// Every rule path and sub-file path that cannot be found under
    /// `base_dir`.
    ///
    /// A sub-file counts as present if it exists relative to the rule
    /// directory or relative to `base_dir`.
    pub fn missing_paths(&self, base_dir: &Path) -> Vec<MissingPath> {
        let mut missing = Vec::new();
        for rule in &self.rules {
            let rule_path = rule.rule_path();
            if let Some(path) = rule_path {
                let expected = base_dir.join(path);
                if !expected.exists() {
                    missing.push(MissingPath {
                        rule_id: rule.id.clone(),
                        file: None,
                        expected,
                    });
                }
            }
            for file in rule.files() {
                if resolve_file(base_dir, rule_path, &file.path).is_none() {
                    let expected = match rule_path {
                        Some(r) if base_dir.join(r).is_dir() => base_dir.join(r).join(&file.path),
                        _ => base_dir.join(&file.path),
                    };
                    missing.push(MissingPath {
                        rule_id: rule.id.clone(),
                        file: Some(file.path.clone()),
                        expected,
                    });
                }
            }
        }
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const CATALOG: &str = r#"{
  "rules": [
    {"id": "ok", "name": "Ok", "filePath": "ok",
     "files": [{"path": "ok.mdc"}, {"path": "shared/common.mdc"}]},
    {"id": "gone", "name": "Gone", "filePath": "gone"},
    {"id": "partial", "name": "Partial", "path": "partial",
     "files": [{"path": "missing.mdc"}]},
    {"id": "inline", "name": "Inline", "content": "text"}
  ],
  "version": "1.0.0",
  "lastUpdated": "2026-01-01"
}"#;

    #[test]
    fn test_missing_paths() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("ok")).unwrap();
        fs::write(dir.path().join("ok/ok.mdc"), "x").unwrap();
        fs::create_dir_all(dir.path().join("shared")).unwrap();
        fs::write(dir.path().join("shared/common.mdc"), "x").unwrap();
        fs::create_dir_all(dir.path().join("partial")).unwrap();

        let catalog = Catalog::from_json("test", CATALOG).unwrap();
        let missing = catalog.missing_paths(dir.path());

        let summary: Vec<(&str, Option<&str>)> = missing
            .iter()
            .map(|m| (m.rule_id.as_str(), m.file.as_deref()))
            .collect();
        assert_eq!(summary, vec![("gone", None), ("partial", Some("missing.mdc"))]);
        assert_eq!(missing[1].expected, dir.path().join("partial/missing.mdc"));
    }

    #[test]
    fn test_inline_only_catalog_is_clean() {
        let dir = TempDir::new().unwrap();
        let catalog =
            Catalog::from_json("test", r#"{"rules":[{"id":"a","name":"A","content":"x"}]}"#)
                .unwrap();
        assert!(catalog.missing_paths(dir.path()).is_empty());
    }
}
