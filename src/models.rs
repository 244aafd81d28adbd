use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// One of the four buckets a detected or required technology falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[serde(alias = "language")]
    Languages,
    #[serde(alias = "framework")]
    Frameworks,
    #[serde(alias = "library")]
    Libraries,
    #[serde(alias = "tool")]
    Tools,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Languages,
        Category::Frameworks,
        Category::Libraries,
        Category::Tools,
    ];
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Languages => write!(f, "languages"),
            Category::Frameworks => write!(f, "frameworks"),
            Category::Libraries => write!(f, "libraries"),
            Category::Tools => write!(f, "tools"),
        }
    }
}

/// Package ecosystem a dependency manifest belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    Npm,
    Pypi,
    Crates,
    Maven,
    Nuget,
    Go,
}

impl Ecosystem {
    /// Key used to look a package name up in a dependency table.
    ///
    /// Names compare case-insensitively everywhere; PyPI additionally
    /// treats `_`, `.` and `-` as the same character (PEP 503).
    pub fn lookup_key(&self, name: &str) -> String {
        let name = name.trim().to_lowercase();
        match self {
            Ecosystem::Pypi => name.replace(['_', '.'], "-"),
            _ => name,
        }
    }
}

impl std::fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ecosystem::Npm => write!(f, "npm"),
            Ecosystem::Pypi => write!(f, "PyPI"),
            Ecosystem::Crates => write!(f, "crates.io"),
            Ecosystem::Maven => write!(f, "Maven"),
            Ecosystem::Nuget => write!(f, "NuGet"),
            Ecosystem::Go => write!(f, "Go modules"),
        }
    }
}

/// Accumulated tech-stack evidence for one workspace.
///
/// Each category is a set, so inserting the same label twice is a no-op.
/// Extractors write raw labels; [`crate::detector::Detector`] normalizes
/// them and fills in `confidence` before handing the profile out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechProfile {
    #[serde(default)]
    pub languages: BTreeSet<String>,
    #[serde(default)]
    pub frameworks: BTreeSet<String>,
    #[serde(default)]
    pub libraries: BTreeSet<String>,
    #[serde(default)]
    pub tools: BTreeSet<String>,
    #[serde(default)]
    pub confidence: f64,
}

impl TechProfile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, category: Category) -> &BTreeSet<String> {
        match category {
            Category::Languages => &self.languages,
            Category::Frameworks => &self.frameworks,
            Category::Libraries => &self.libraries,
            Category::Tools => &self.tools,
        }
    }

    fn get_mut(&mut self, category: Category) -> &mut BTreeSet<String> {
        match category {
            Category::Languages => &mut self.languages,
            Category::Frameworks => &mut self.frameworks,
            Category::Libraries => &mut self.libraries,
            Category::Tools => &mut self.tools,
        }
    }

    /// Add a label to a category. Returns `true` if it was not present yet.
    pub fn add(&mut self, category: Category, label: impl Into<String>) -> bool {
        let label = label.into();
        let label = label.trim();
        if label.is_empty() {
            return false;
        }
        self.get_mut(category).insert(label.to_string())
    }

    pub fn contains(&self, category: Category, label: &str) -> bool {
        self.get(category).contains(label)
    }

    /// Total number of labels across all four categories.
    pub fn len(&self) -> usize {
        Category::ALL.iter().map(|c| self.get(*c).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append every label of `other` into `self`. Confidence is left alone.
    pub fn merge(&mut self, other: TechProfile) {
        self.languages.extend(other.languages);
        self.frameworks.extend(other.frameworks);
        self.libraries.extend(other.libraries);
        self.tools.extend(other.tools);
    }

    /// Iterate `(category, label)` pairs in category order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, &str)> + '_ {
        Category::ALL
            .into_iter()
            .flat_map(move |c| self.get(c).iter().map(move |l| (c, l.as_str())))
    }
}

/// Declared tech-stack requirement of a rule. Every list is optional in JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechStack {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub languages: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frameworks: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub libraries: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<String>>,
}

impl TechStack {
    pub fn get(&self, category: Category) -> &[String] {
        let list = match category {
            Category::Languages => &self.languages,
            Category::Frameworks => &self.frameworks,
            Category::Libraries => &self.libraries,
            Category::Tools => &self.tools,
        };
        list.as_deref().unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        Category::ALL.iter().all(|c| self.get(*c).is_empty())
    }
}

/// Where a catalog rule came from.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RuleSource {
    #[default]
    Builtin,
    Local,
    Remote,
}

impl RuleSource {
    pub const ALL: [RuleSource; 3] = [RuleSource::Builtin, RuleSource::Local, RuleSource::Remote];
}

impl std::fmt::Display for RuleSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleSource::Builtin => write!(f, "builtin"),
            RuleSource::Local => write!(f, "local"),
            RuleSource::Remote => write!(f, "remote"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_is_idempotent() {
        let mut profile = TechProfile::new();
        assert!(profile.add(Category::Languages, "Rust"));
        assert!(!profile.add(Category::Languages, "Rust"));
        assert!(!profile.add(Category::Languages, "  "));
        assert_eq!(profile.languages.len(), 1);
        assert_eq!(profile.len(), 1);
    }

    #[test]
    fn test_merge_keeps_sets_unique() {
        let mut a = TechProfile::new();
        a.add(Category::Tools, "Docker");
        let mut b = TechProfile::new();
        b.add(Category::Tools, "Docker");
        b.add(Category::Frameworks, "React");
        a.merge(b);
        assert_eq!(a.tools.len(), 1);
        assert!(a.contains(Category::Frameworks, "React"));
    }

    #[test]
    fn test_category_serde_names() {
        let c: Category = serde_json::from_str("\"framework\"").unwrap();
        assert_eq!(c, Category::Frameworks);
        assert_eq!(serde_json::to_string(&Category::Tools).unwrap(), "\"tools\"");
    }

    #[test]
    fn test_pypi_lookup_key() {
        assert_eq!(Ecosystem::Pypi.lookup_key("Django_REST.framework"), "django-rest-framework");
        assert_eq!(Ecosystem::Nuget.lookup_key("Newtonsoft.Json"), "newtonsoft.json");
    }

    #[test]
    fn test_tech_stack_optional_lists() {
        let stack: TechStack = serde_json::from_str(r#"{"languages":["Go"]}"#).unwrap();
        assert_eq!(stack.get(Category::Languages), ["Go".to_string()]);
        assert!(stack.get(Category::Tools).is_empty());
        assert!(!stack.is_empty());
        assert!(TechStack::default().is_empty());
    }
}
