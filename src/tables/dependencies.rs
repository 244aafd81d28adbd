use std::collections::{BTreeMap, HashMap};

use regex::Regex;
use serde::Deserialize;

use super::rules::compile_pattern;
use crate::error::TableError;
use crate::models::{Category, Ecosystem};

/// What a dependency name or script fragment stands for.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Mapping {
    pub technology: String,
    pub category: Category,
}

#[derive(Debug, Clone, Deserialize)]
struct PrefixMapping {
    prefix: String,
    technology: String,
    category: Category,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct EcosystemSpec {
    #[serde(default)]
    exact: HashMap<String, Mapping>,
    #[serde(default)]
    prefixes: Vec<PrefixMapping>,
}

#[derive(Debug, Clone, Deserialize)]
struct ScriptSpec {
    pattern: String,
    technology: String,
    category: Category,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct DependencySpec {
    #[serde(default)]
    ecosystems: BTreeMap<Ecosystem, EcosystemSpec>,
    #[serde(default)]
    scripts: Vec<ScriptSpec>,
}

/// Name → technology table for one package ecosystem.
#[derive(Debug, Clone)]
pub struct DependencyTable {
    ecosystem: Ecosystem,
    exact: HashMap<String, Mapping>,
    /// Sorted longest first so the first hit is the most specific one.
    prefixes: Vec<(String, Mapping)>,
}

impl DependencyTable {
    fn new(ecosystem: Ecosystem) -> Self {
        Self {
            ecosystem,
            exact: HashMap::new(),
            prefixes: Vec::new(),
        }
    }

    fn extend(&mut self, spec: EcosystemSpec) {
        for (name, mapping) in spec.exact {
            self.exact.insert(self.ecosystem.lookup_key(&name), mapping);
        }
        for p in spec.prefixes {
            let key = self.ecosystem.lookup_key(&p.prefix);
            self.prefixes.retain(|(existing, _)| existing != &key);
            self.prefixes.push((
                key,
                Mapping {
                    technology: p.technology,
                    category: p.category,
                },
            ));
        }
        self.prefixes.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    }

    /// Exact name first, then the longest matching prefix.
    pub fn lookup(&self, name: &str) -> Option<&Mapping> {
        let key = self.ecosystem.lookup_key(name);
        if key.is_empty() {
            return None;
        }
        self.exact.get(&key).or_else(|| {
            self.prefixes
                .iter()
                .find(|(prefix, _)| key.starts_with(prefix.as_str()))
                .map(|(_, m)| m)
        })
    }

    pub fn len(&self) -> usize {
        self.exact.len() + self.prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
pub struct ScriptRule {
    pub pattern: Regex,
    pub mapping: Mapping,
}

/// Dependency tables for every ecosystem plus the manifest-script scanners.
#[derive(Debug, Clone)]
pub struct DependencyTables {
    tables: BTreeMap<Ecosystem, DependencyTable>,
    scripts: Vec<ScriptRule>,
}

impl DependencyTables {
    pub(crate) fn empty() -> Self {
        Self {
            tables: BTreeMap::new(),
            scripts: Vec::new(),
        }
    }

    pub(crate) fn extend(&mut self, spec: DependencySpec) -> Result<(), TableError> {
        for (ecosystem, eco_spec) in spec.ecosystems {
            self.tables
                .entry(ecosystem)
                .or_insert_with(|| DependencyTable::new(ecosystem))
                .extend(eco_spec);
        }
        for s in spec.scripts {
            let pattern = compile_pattern(&s.pattern, &s.technology)?;
            self.scripts.push(ScriptRule {
                pattern,
                mapping: Mapping {
                    technology: s.technology,
                    category: s.category,
                },
            });
        }
        Ok(())
    }

    pub fn lookup(&self, ecosystem: Ecosystem, name: &str) -> Option<&Mapping> {
        self.tables.get(&ecosystem)?.lookup(name)
    }

    pub fn table(&self, ecosystem: Ecosystem) -> Option<&DependencyTable> {
        self.tables.get(&ecosystem)
    }

    /// Every script rule whose pattern occurs in `command`.
    pub fn scan_script<'a>(&'a self, command: &'a str) -> impl Iterator<Item = &'a Mapping> + 'a {
        self.scripts
            .iter()
            .filter(move |r| r.pattern.is_match(command))
            .map(|r| &r.mapping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables(json: &str) -> DependencyTables {
        let spec: DependencySpec = serde_json::from_str(json).unwrap();
        let mut t = DependencyTables::empty();
        t.extend(spec).unwrap();
        t
    }

    const SAMPLE: &str = r#"{
        "ecosystems": {
            "npm": {
                "exact": {"react": {"technology": "React", "category": "frameworks"}},
                "prefixes": [
                    {"prefix": "@angular/", "technology": "Angular", "category": "frameworks"},
                    {"prefix": "@angular/material", "technology": "Angular Material", "category": "libraries"}
                ]
            },
            "pypi": {
                "exact": {"Django_REST_framework": {"technology": "Django REST Framework", "category": "frameworks"}}
            }
        },
        "scripts": [{"pattern": "\\bjest\\b", "technology": "Jest", "category": "tools"}]
    }"#;

    #[test]
    fn test_exact_lookup() {
        let t = tables(SAMPLE);
        let m = t.lookup(Ecosystem::Npm, "react").unwrap();
        assert_eq!(m.technology, "React");
        assert!(t.lookup(Ecosystem::Npm, "react-router").is_none());
    }

    #[test]
    fn test_longest_prefix_wins() {
        let t = tables(SAMPLE);
        assert_eq!(t.lookup(Ecosystem::Npm, "@angular/core").unwrap().technology, "Angular");
        assert_eq!(
            t.lookup(Ecosystem::Npm, "@angular/material").unwrap().technology,
            "Angular Material"
        );
    }

    #[test]
    fn test_pypi_names_are_canonicalized() {
        let t = tables(SAMPLE);
        assert!(t.lookup(Ecosystem::Pypi, "djangorestframework").is_none());
        assert!(t.lookup(Ecosystem::Pypi, "django-rest-framework").is_some());
        assert!(t.lookup(Ecosystem::Pypi, "Django.REST.Framework").is_some());
    }

    #[test]
    fn test_unknown_ecosystem_is_none() {
        let t = tables(SAMPLE);
        assert!(t.lookup(Ecosystem::Go, "github.com/gin-gonic/gin").is_none());
    }

    #[test]
    fn test_scan_script_word_boundary() {
        let t = tables(SAMPLE);
        assert_eq!(t.scan_script("jest --coverage").count(), 1);
        assert_eq!(t.scan_script("jester run").count(), 0);
    }
}
