use regex::Regex;
use serde::Deserialize;

use crate::error::TableError;
use crate::models::Category;

/// "These files mean this technology", as written in the JSON tables.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct FileRuleSpec {
    patterns: Vec<String>,
    technology: String,
    category: Category,
    #[serde(default)]
    validate: Option<ValidatorSpec>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidatorSpec {
    #[serde(default)]
    contains_any: Vec<String>,
    #[serde(default)]
    contains_all: Vec<String>,
    #[serde(default)]
    regex: Option<String>,
}

/// A file-presence rule with its content validator compiled.
#[derive(Debug, Clone)]
pub struct FileRule {
    pub patterns: Vec<String>,
    pub technology: String,
    pub category: Category,
    pub validator: Option<Validator>,
}

impl TryFrom<FileRuleSpec> for FileRule {
    type Error = TableError;

    fn try_from(spec: FileRuleSpec) -> Result<Self, Self::Error> {
        let validator = match spec.validate {
            Some(v) => Some(Validator::compile(v, &spec.technology)?),
            None => None,
        };
        Ok(FileRule {
            patterns: spec.patterns,
            technology: spec.technology,
            category: spec.category,
            validator,
        })
    }
}

/// Content check a matched file must pass before its rule is accepted.
///
/// Every configured condition must hold: at least one `contains_any`
/// substring, all `contains_all` substrings, and the regex.
#[derive(Debug, Clone)]
pub struct Validator {
    contains_any: Vec<String>,
    contains_all: Vec<String>,
    regex: Option<Regex>,
}

impl Validator {
    fn compile(spec: ValidatorSpec, technology: &str) -> Result<Self, TableError> {
        let regex = spec
            .regex
            .map(|p| compile_pattern(&p, technology))
            .transpose()?;
        Ok(Validator {
            contains_any: spec.contains_any,
            contains_all: spec.contains_all,
            regex,
        })
    }

    pub fn accepts(&self, content: &str) -> bool {
        if !self.contains_any.is_empty() && !self.contains_any.iter().any(|s| content.contains(s.as_str())) {
            return false;
        }
        if !self.contains_all.iter().all(|s| content.contains(s.as_str())) {
            return false;
        }
        match &self.regex {
            Some(re) => re.is_match(content),
            None => true,
        }
    }
}

/// Composite label added when every requirement is already in the profile.
#[derive(Debug, Clone, Deserialize)]
pub struct CombinationRule {
    pub requires: Vec<Requirement>,
    pub technology: String,
    pub category: Category,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Requirement {
    pub category: Category,
    pub name: String,
}

pub(crate) fn compile_pattern(pattern: &str, technology: &str) -> Result<Regex, TableError> {
    Regex::new(pattern).map_err(|source| TableError::InvalidPattern {
        technology: technology.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(json: &str) -> FileRule {
        let spec: FileRuleSpec = serde_json::from_str(json).unwrap();
        FileRule::try_from(spec).unwrap()
    }

    #[test]
    fn test_rule_without_validator() {
        let r = rule(r#"{"patterns":["angular.json"],"technology":"Angular","category":"frameworks"}"#);
        assert!(r.validator.is_none());
        assert_eq!(r.category, Category::Frameworks);
    }

    #[test]
    fn test_contains_any_validator() {
        let r = rule(
            r#"{"patterns":["components.json"],"technology":"shadcn/ui","category":"frameworks",
                "validate":{"containsAny":["ui.shadcn.com"]}}"#,
        );
        let v = r.validator.unwrap();
        assert!(v.accepts(r#"{"$schema":"https://ui.shadcn.com/schema.json"}"#));
        assert!(!v.accepts("{}"));
    }

    #[test]
    fn test_regex_and_contains_all_validator() {
        let r = rule(
            r#"{"patterns":["*.yaml"],"technology":"Kubernetes","category":"tools",
                "validate":{"containsAll":["metadata"],"regex":"(?m)^kind:\\s*\\S+"}}"#,
        );
        let v = r.validator.unwrap();
        assert!(v.accepts("apiVersion: v1\nkind: Service\nmetadata:\n  name: web\n"));
        assert!(!v.accepts("kind: Service\n"));
        assert!(!v.accepts("metadata: {}\n"));
    }

    #[test]
    fn test_invalid_regex_is_reported() {
        let spec: FileRuleSpec = serde_json::from_str(
            r#"{"patterns":["x"],"technology":"Broken","category":"tools","validate":{"regex":"("}}"#,
        )
        .unwrap();
        let err = FileRule::try_from(spec).unwrap_err();
        assert!(err.to_string().contains("Broken"));
    }
}
