//! Static detection data.
//!
//! Every table lives as a JSON file under `data/` and is embedded at build
//! time. A directory named in configuration may hold files with the same
//! names; their entries are added on top of the built-in ones.

mod dependencies;
mod rules;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

pub use dependencies::{DependencyTable, DependencyTables, Mapping, ScriptRule};
pub use rules::{CombinationRule, FileRule, Requirement, Validator};

use crate::error::TableError;
use crate::models::Category;
use dependencies::DependencySpec;
use rules::{compile_pattern, FileRuleSpec};

const LANGUAGES: (&str, &str) = ("languages.json", include_str!("../../data/languages.json"));
const CONFIG_FILES: (&str, &str) = ("config_files.json", include_str!("../../data/config_files.json"));
const DEPENDENCIES: (&str, &str) = ("dependencies.json", include_str!("../../data/dependencies.json"));
const CLOUD: (&str, &str) = ("cloud.json", include_str!("../../data/cloud.json"));
const DATABASES: (&str, &str) = ("databases.json", include_str!("../../data/databases.json"));
const COMBINATIONS: (&str, &str) = ("combinations.json", include_str!("../../data/combinations.json"));
const ALIASES: (&str, &str) = ("aliases.json", include_str!("../../data/aliases.json"));
const COMPATIBILITY: (&str, &str) = ("compatibility.json", include_str!("../../data/compatibility.json"));

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LanguageSpec {
    #[serde(default)]
    extensions: HashMap<String, String>,
    #[serde(default)]
    ignored_file_names: Vec<String>,
}

/// Extension → language id, plus names that look extension-less but are
/// build files rather than source.
#[derive(Debug, Clone, Default)]
pub struct LanguageTable {
    extensions: HashMap<String, String>,
    ignored: HashSet<String>,
}

impl LanguageTable {
    fn extend(&mut self, spec: LanguageSpec) {
        for (ext, lang) in spec.extensions {
            self.extensions.insert(ext.to_lowercase(), lang);
        }
        self.ignored.extend(spec.ignored_file_names);
    }

    pub fn language_for_extension(&self, ext: &str) -> Option<&str> {
        self.extensions.get(&ext.to_lowercase()).map(String::as_str)
    }

    pub fn is_ignored_file_name(&self, name: &str) -> bool {
        self.ignored.contains(name)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CloudSpec {
    #[serde(default)]
    files: Vec<FileRuleSpec>,
    #[serde(default)]
    compose_files: Vec<String>,
    #[serde(default)]
    images: Vec<ImageRule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageRule {
    pub prefix: String,
    pub technology: String,
    pub category: Category,
}

/// Container, orchestration, IaC and hosting files.
#[derive(Debug, Clone, Default)]
pub struct CloudTable {
    pub files: Vec<FileRule>,
    pub compose_files: Vec<String>,
    pub images: Vec<ImageRule>,
}

impl CloudTable {
    /// Map a compose `image:` reference such as `docker.io/library/postgres:16`.
    pub fn image(&self, reference: &str) -> Option<&ImageRule> {
        let name = image_name(reference);
        self.images
            .iter()
            .filter(|r| name.starts_with(r.prefix.as_str()))
            .max_by_key(|r| r.prefix.len())
    }
}

/// Strip tag, digest, the default registry and the `library/` namespace.
fn image_name(reference: &str) -> String {
    let reference = reference.trim().trim_matches(|c| c == '"' || c == '\'');
    let without_digest = reference.split('@').next().unwrap_or(reference);
    // a ':' after the last '/' is a tag, before it a registry port
    let without_tag = match without_digest.rfind(':') {
        Some(i) if !without_digest[i..].contains('/') => &without_digest[..i],
        _ => without_digest,
    };
    let name = without_tag
        .trim_start_matches("docker.io/")
        .trim_start_matches("index.docker.io/")
        .trim_start_matches("library/");
    name.to_lowercase()
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSpec {
    #[serde(default)]
    files: Vec<String>,
    #[serde(default)]
    schemes: BTreeMap<String, String>,
    #[serde(default)]
    jdbc: BTreeMap<String, String>,
    #[serde(default)]
    keywords: Vec<KeywordSpec>,
}

#[derive(Debug, Clone, Deserialize)]
struct KeywordSpec {
    pattern: String,
    technology: String,
}

/// Candidate config files and the patterns that reveal a database in them.
#[derive(Debug, Clone, Default)]
pub struct DatabaseTable {
    pub files: Vec<String>,
    schemes: BTreeMap<String, String>,
    jdbc: BTreeMap<String, String>,
    pub keywords: Vec<(Regex, String)>,
}

impl DatabaseTable {
    fn extend(&mut self, spec: DatabaseSpec) -> Result<(), TableError> {
        self.files.extend(spec.files);
        for (k, v) in spec.schemes {
            self.schemes.insert(k.to_lowercase(), v);
        }
        for (k, v) in spec.jdbc {
            self.jdbc.insert(k.to_lowercase(), v);
        }
        for kw in spec.keywords {
            let re = compile_pattern(&kw.pattern, &kw.technology)?;
            self.keywords.push((re, kw.technology));
        }
        Ok(())
    }

    pub fn scheme(&self, scheme: &str) -> Option<&str> {
        self.schemes.get(&scheme.to_lowercase()).map(String::as_str)
    }

    pub fn jdbc(&self, driver: &str) -> Option<&str> {
        self.jdbc.get(&driver.to_lowercase()).map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompatibilitySpec {
    #[serde(default)]
    language_framework: Vec<(String, String)>,
    #[serde(default)]
    framework_library: Vec<(String, String)>,
    #[serde(default)]
    tool_pairs: Vec<(String, String)>,
}

/// Pairs of technologies known to belong together.
#[derive(Debug, Clone, Default)]
pub struct CompatibilityTable {
    pub language_framework: Vec<(String, String)>,
    pub framework_library: Vec<(String, String)>,
    pub tool_pairs: Vec<(String, String)>,
}

/// All detection data, parsed and compiled.
#[derive(Debug, Clone)]
pub struct DetectionTables {
    pub languages: LanguageTable,
    pub config_files: Vec<FileRule>,
    pub dependencies: DependencyTables,
    pub cloud: CloudTable,
    pub databases: DatabaseTable,
    pub combinations: Vec<CombinationRule>,
    pub aliases: BTreeMap<String, String>,
    pub compatibility: CompatibilityTable,
}

impl DetectionTables {
    /// The embedded tables.
    pub fn builtin() -> Result<Self, TableError> {
        let mut tables = Self {
            languages: LanguageTable::default(),
            config_files: Vec::new(),
            dependencies: DependencyTables::empty(),
            cloud: CloudTable::default(),
            databases: DatabaseTable::default(),
            combinations: Vec::new(),
            aliases: BTreeMap::new(),
            compatibility: CompatibilityTable::default(),
        };
        tables.extend_from(|name| {
            let embedded = [
                LANGUAGES,
                CONFIG_FILES,
                DEPENDENCIES,
                CLOUD,
                DATABASES,
                COMBINATIONS,
                ALIASES,
                COMPATIBILITY,
            ];
            Ok(embedded
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, content)| content.to_string()))
        })?;
        Ok(tables)
    }

    /// The embedded tables, extended with any table files found in `dir`.
    pub fn load(dir: Option<&Path>) -> Result<Self, TableError> {
        let mut tables = Self::builtin()?;
        if let Some(dir) = dir {
            tables.extend_from(|name| {
                let path = dir.join(name);
                if !path.exists() {
                    return Ok(None);
                }
                debug!(path = %path.display(), "Loading extra detection table");
                std::fs::read_to_string(&path)
                    .map(Some)
                    .map_err(|source| TableError::Io { path, source })
            })?;
        }
        Ok(tables)
    }

    fn extend_from<F>(&mut self, mut read: F) -> Result<(), TableError>
    where
        F: FnMut(&str) -> Result<Option<String>, TableError>,
    {
        if let Some(spec) = parse::<LanguageSpec>(LANGUAGES.0, read(LANGUAGES.0)?)? {
            self.languages.extend(spec);
        }
        if let Some(specs) = parse::<Vec<FileRuleSpec>>(CONFIG_FILES.0, read(CONFIG_FILES.0)?)? {
            for spec in specs {
                self.config_files.push(FileRule::try_from(spec)?);
            }
        }
        if let Some(spec) = parse::<DependencySpec>(DEPENDENCIES.0, read(DEPENDENCIES.0)?)? {
            self.dependencies.extend(spec)?;
        }
        if let Some(spec) = parse::<CloudSpec>(CLOUD.0, read(CLOUD.0)?)? {
            for file in spec.files {
                self.cloud.files.push(FileRule::try_from(file)?);
            }
            self.cloud.compose_files.extend(spec.compose_files);
            self.cloud.images.extend(spec.images);
        }
        if let Some(spec) = parse::<DatabaseSpec>(DATABASES.0, read(DATABASES.0)?)? {
            self.databases.extend(spec)?;
        }
        if let Some(rules) = parse::<Vec<CombinationRule>>(COMBINATIONS.0, read(COMBINATIONS.0)?)? {
            self.combinations.extend(rules);
        }
        if let Some(aliases) = parse::<BTreeMap<String, String>>(ALIASES.0, read(ALIASES.0)?)? {
            for (alias, canonical) in aliases {
                self.aliases.insert(alias.trim().to_lowercase(), canonical);
            }
            check_aliases(&self.aliases)?;
        }
        if let Some(spec) = parse::<CompatibilitySpec>(COMPATIBILITY.0, read(COMPATIBILITY.0)?)? {
            self.compatibility.language_framework.extend(spec.language_framework);
            self.compatibility.framework_library.extend(spec.framework_library);
            self.compatibility.tool_pairs.extend(spec.tool_pairs);
        }
        Ok(())
    }
}

/// Every canonical label must normalize to itself. That breaks when an
/// alias key, or another canonical label, lowercases to the same string
/// but points elsewhere.
fn check_aliases(aliases: &BTreeMap<String, String>) -> Result<(), TableError> {
    let mut canonicals: HashMap<String, &str> = HashMap::new();
    for canonical in aliases.values() {
        let key = canonical.trim().to_lowercase();
        match canonicals.get(&key) {
            Some(other) if *other != canonical.as_str() => {
                return Err(TableError::AliasConflict {
                    alias: key,
                    canonical: canonical.clone(),
                    other: other.to_string(),
                });
            }
            _ => {
                canonicals.insert(key, canonical.as_str());
            }
        }
    }
    for (alias, canonical) in aliases {
        if let Some(other) = canonicals.get(alias) {
            if *other != canonical.as_str() {
                return Err(TableError::AliasConflict {
                    alias: alias.clone(),
                    canonical: canonical.clone(),
                    other: other.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn parse<T: DeserializeOwned>(name: &str, content: Option<String>) -> Result<Option<T>, TableError> {
    let Some(content) = content else {
        return Ok(None);
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| TableError::Malformed {
            name: name.to_string(),
            source,
        })
}
