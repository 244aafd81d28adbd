//! Report renderers for detection and match results.
//!
//! - [`terminal`]: colored tables; respects `--verbose` / `--quiet`.
//! - JSON: the serializable views below, printed pretty to stdout.

pub mod terminal;

use std::path::Path;

use serde::Serialize;

use stackfit::confidence::ConfidenceBreakdown;
use stackfit::{MatchResult, RuleSource, TechProfile};

#[derive(Debug, Serialize)]
pub struct DetectReport<'a> {
    pub path: &'a Path,
    pub profile: &'a TechProfile,
    pub breakdown: &'a ConfidenceBreakdown,
}

/// One ranked rule with its texts resolved to a single language.
#[derive(Debug, Serialize)]
pub struct MatchView<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub description: &'a str,
    pub score: f64,
    pub source: RuleSource,
    pub tags: &'a [String],
}

impl<'a> MatchView<'a> {
    pub fn new(result: &'a MatchResult, lang: &str) -> Self {
        Self {
            id: &result.rule.id,
            name: result.rule.name.resolve(lang),
            description: result.rule.description.resolve(lang),
            score: result.score,
            source: result.source,
            tags: &result.rule.tags,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MatchReport<'a> {
    pub path: &'a Path,
    pub profile: &'a TechProfile,
    pub matches: Vec<MatchView<'a>>,
    /// Set when nothing matched and the host falls back to the basic rule.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<&'a str>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackfit::RuleEntry;

    #[test]
    fn test_match_view_resolves_language() {
        let mut rule = RuleEntry::new("react-ts", "React");
        rule.description = stackfit::catalog::LocalizedText::Localized(
            [("zh".to_string(), "规则".to_string()), ("en".to_string(), "Rules".to_string())]
                .into_iter()
                .collect(),
        );
        let result = MatchResult {
            rule,
            score: 1.0,
            source: RuleSource::Local,
        };
        let view = MatchView::new(&result, "zh");
        assert_eq!(view.description, "规则");
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["source"], "local");
        assert_eq!(json["name"], "React");
    }
}
