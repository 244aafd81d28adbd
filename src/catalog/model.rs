use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CatalogError, CatalogResult};
use crate::models::{RuleSource, TechStack};

/// Text that is either a single string or a `{lang: text}` map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocalizedText {
    Plain(String),
    Localized(BTreeMap<String, String>),
}

impl Default for LocalizedText {
    fn default() -> Self {
        LocalizedText::Plain(String::new())
    }
}

impl From<&str> for LocalizedText {
    fn from(s: &str) -> Self {
        LocalizedText::Plain(s.to_string())
    }
}

impl From<String> for LocalizedText {
    fn from(s: String) -> Self {
        LocalizedText::Plain(s)
    }
}

impl LocalizedText {
    /// The text for `lang`, falling back to `en`, then `zh`, then whatever
    /// entry comes first.
    pub fn resolve(&self, lang: &str) -> &str {
        match self {
            LocalizedText::Plain(s) => s,
            LocalizedText::Localized(map) => [lang, "en", "zh"]
                .iter()
                .find_map(|l| map.get(*l))
                .or_else(|| map.values().next())
                .map(String::as_str)
                .unwrap_or(""),
        }
    }

    /// Turn a plain string into a map with one entry per language.
    /// Maps are left as they are.
    fn localize(&mut self, langs: &[String]) {
        if let LocalizedText::Plain(s) = self {
            let map = langs.iter().map(|l| (l.clone(), s.clone())).collect();
            *self = LocalizedText::Localized(map);
        }
    }
}

/// One file belonging to a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleFile {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<LocalizedText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub globs: Option<String>,
}

/// A rule template in a catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleEntry {
    pub id: String,
    #[serde(default)]
    pub name: LocalizedText,
    #[serde(default)]
    pub description: LocalizedText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tech_stack: Option<TechStack>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    /// Older catalogs name the rule directory `path` instead of `filePath`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<RuleFile>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,

    #[serde(skip)]
    pub source: RuleSource,
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl RuleEntry {
    pub fn new(id: impl Into<String>, name: impl Into<LocalizedText>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: LocalizedText::default(),
            tech_stack: None,
            file_path: None,
            path: None,
            files: None,
            tags: Vec::new(),
            content: None,
            extra: BTreeMap::new(),
            source: RuleSource::default(),
            base_dir: None,
        }
    }

    pub fn with_tech_stack(mut self, stack: TechStack) -> Self {
        self.tech_stack = Some(stack);
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// `filePath`, or the legacy `path`.
    pub fn rule_path(&self) -> Option<&str> {
        self.file_path.as_deref().or(self.path.as_deref())
    }

    pub fn files(&self) -> &[RuleFile] {
        self.files.as_deref().unwrap_or(&[])
    }

    /// The rule payload: inline content, else the `filePath` file, else
    /// every listed file concatenated.
    ///
    /// Paths resolve against the directory the catalog was loaded from.
    pub fn content(&self) -> CatalogResult<String> {
        if let Some(content) = &self.content {
            return Ok(content.clone());
        }
        let Some(base) = self.base_dir.as_deref() else {
            return Err(CatalogError::MissingContent { id: self.id.clone() });
        };

        if self.files().is_empty() {
            if let Some(rule_path) = self.rule_path() {
                let path = base.join(rule_path);
                if path.is_file() {
                    return read(&path);
                }
            }
            return Err(CatalogError::MissingContent { id: self.id.clone() });
        }

        let mut parts = Vec::new();
        for file in self.files() {
            let path = resolve_file(base, self.rule_path(), &file.path)
                .ok_or_else(|| CatalogError::NotFound {
                    path: base.join(&file.path),
                })?;
            parts.push(read(&path)?);
        }
        Ok(parts.join("\n\n"))
    }
}

fn read(path: &Path) -> CatalogResult<String> {
    std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// A sub-file path resolves against the rule directory first, then
/// against the catalog base directory.
pub(crate) fn resolve_file(base: &Path, rule_path: Option<&str>, file: &str) -> Option<PathBuf> {
    let in_rule_dir = rule_path
        .map(|r| base.join(r))
        .filter(|dir| dir.is_dir())
        .map(|dir| dir.join(file));
    in_rule_dir
        .into_iter()
        .chain(std::iter::once(base.join(file)))
        .find(|p| p.exists())
}

fn default_version() -> String {
    "1.0.0".to_string()
}

/// The rule catalog as stored on disk or served remotely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    #[serde(default)]
    pub rules: Vec<RuleEntry>,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub last_updated: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supported_languages: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            version: default_version(),
            last_updated: String::new(),
            supported_languages: None,
            extra: BTreeMap::new(),
        }
    }
}

impl Catalog {
    /// Parse and validate a catalog. `origin` only names it in errors.
    pub fn from_json(origin: &str, content: &str) -> CatalogResult<Self> {
        let catalog: Catalog =
            serde_json::from_str(content).map_err(|source| CatalogError::Corrupt {
                origin: origin.to_string(),
                source,
            })?;
        catalog.validate(origin)?;
        Ok(catalog)
    }

    pub fn to_json_pretty(&self) -> CatalogResult<String> {
        serde_json::to_string_pretty(self).map_err(|source| CatalogError::Corrupt {
            origin: "in-memory catalog".to_string(),
            source,
        })
    }

    /// Rule ids must be unique.
    pub fn validate(&self, origin: &str) -> CatalogResult<()> {
        let mut seen = HashSet::new();
        for rule in &self.rules {
            if !seen.insert(rule.id.as_str()) {
                return Err(CatalogError::DuplicateId {
                    origin: origin.to_string(),
                    id: rule.id.clone(),
                });
            }
        }
        Ok(())
    }

    /// Tag every rule with where it came from.
    pub fn with_source(mut self, source: RuleSource, base_dir: Option<&Path>) -> Self {
        for rule in &mut self.rules {
            rule.source = source;
            rule.base_dir = base_dir.map(Path::to_path_buf);
        }
        self
    }

    pub fn get(&self, id: &str) -> Option<&RuleEntry> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Convert every plain-string name and description (file descriptions
    /// included) into a map keyed by each of `langs`.
    pub fn to_multilingual(&mut self, langs: &[String]) {
        for rule in &mut self.rules {
            rule.name.localize(langs);
            rule.description.localize(langs);
            for file in rule.files.iter_mut().flatten() {
                if let Some(description) = &mut file.description {
                    description.localize(langs);
                }
            }
        }
        self.supported_languages = Some(langs.to_vec());
    }
}
