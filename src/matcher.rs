//! Ranking catalog rules against a detected [`TechProfile`].

use std::cmp::Ordering;

use serde::Serialize;

use crate::catalog::RuleEntry;
use crate::models::{Category, RuleSource, TechProfile};
use crate::normalize::Normalizer;

const LANGUAGE_WEIGHT: f64 = 0.5;
const FRAMEWORK_WEIGHT: f64 = 0.3;
/// Libraries and tools share one bucket.
const ECOSYSTEM_WEIGHT: f64 = 0.2;

#[derive(Debug, Clone, PartialEq)]
pub struct MatchOptions {
    pub limit: usize,
    pub min_score: f64,
    pub include_builtin: bool,
    pub include_local: bool,
    pub include_remote: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            limit: 5,
            min_score: 0.3,
            include_builtin: true,
            include_local: true,
            include_remote: false,
        }
    }
}

impl MatchOptions {
    pub fn includes(&self, source: RuleSource) -> bool {
        match source {
            RuleSource::Builtin => self.include_builtin,
            RuleSource::Local => self.include_local,
            RuleSource::Remote => self.include_remote,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    pub rule: RuleEntry,
    pub score: f64,
    pub source: RuleSource,
}

pub struct RuleMatcher {
    normalizer: Normalizer,
}

impl RuleMatcher {
    pub fn new(normalizer: Normalizer) -> Self {
        Self { normalizer }
    }

    /// How well `rule` fits `profile`, in [0, 1].
    ///
    /// Every bucket the rule declares something in contributes its weight
    /// to the maximum; each required label found in the profile earns an
    /// equal share of that weight. A rule that declares nothing scores 0.
    pub fn match_score(&self, rule: &RuleEntry, profile: &TechProfile) -> f64 {
        let profile = self.normalizer.normalize_profile(profile);
        self.score_normalized(rule, &profile)
    }

    /// Rules scoring at least `options.min_score`, best first, at most
    /// `options.limit` of them. Ties keep catalog order.
    pub fn find_matches<'a, I>(
        &self,
        profile: &TechProfile,
        rules: I,
        options: &MatchOptions,
    ) -> Vec<MatchResult>
    where
        I: IntoIterator<Item = &'a RuleEntry>,
    {
        let profile = self.normalizer.normalize_profile(profile);
        let mut matches: Vec<MatchResult> = rules
            .into_iter()
            .filter_map(|rule| {
                let score = self.score_normalized(rule, &profile);
                (score > 0.0 && score >= options.min_score).then(|| MatchResult {
                    rule: rule.clone(),
                    score,
                    source: rule.source,
                })
            })
            .collect();

        // sort_by is stable
        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        matches.truncate(options.limit);
        matches
    }

    pub fn best_match<'a, I>(
        &self,
        profile: &TechProfile,
        rules: I,
        options: &MatchOptions,
    ) -> Option<MatchResult>
    where
        I: IntoIterator<Item = &'a RuleEntry>,
    {
        let options = MatchOptions {
            limit: 1,
            ..options.clone()
        };
        self.find_matches(profile, rules, &options).into_iter().next()
    }

    fn score_normalized(&self, rule: &RuleEntry, profile: &TechProfile) -> f64 {
        let Some(stack) = &rule.tech_stack else {
            return 0.0;
        };

        let languages = self.normalizer.normalize_requirements(stack, Category::Languages);
        let frameworks = self.normalizer.normalize_requirements(stack, Category::Frameworks);
        let mut ecosystem = self.normalizer.normalize_requirements(stack, Category::Libraries);
        for tool in self.normalizer.normalize_requirements(stack, Category::Tools) {
            if !ecosystem.contains(&tool) {
                ecosystem.push(tool);
            }
        }

        let buckets = [
            bucket(LANGUAGE_WEIGHT, &languages, |l| profile.contains(Category::Languages, l)),
            bucket(FRAMEWORK_WEIGHT, &frameworks, |l| profile.contains(Category::Frameworks, l)),
            bucket(ECOSYSTEM_WEIGHT, &ecosystem, |l| {
                profile.contains(Category::Libraries, l) || profile.contains(Category::Tools, l)
            }),
        ];
        let score: f64 = buckets.iter().map(|(earned, _)| earned).sum();
        let max_score: f64 = buckets.iter().map(|(_, max)| max).sum();

        if max_score == 0.0 {
            0.0
        } else {
            score / max_score
        }
    }
}

/// `(earned, max)` for one weight bucket. An empty bucket is `(0, 0)`.
fn bucket(weight: f64, required: &[String], present: impl Fn(&str) -> bool) -> (f64, f64) {
    if required.is_empty() {
        return (0.0, 0.0);
    }
    let share = weight / required.len() as f64;
    let earned = required.iter().filter(|l| present(l.as_str())).count() as f64 * share;
    (earned, weight)
}
