use std::collections::HashSet;

use serde::Serialize;

use crate::models::{Category, TechProfile};
use crate::tables::CompatibilityTable;

const LANGUAGE_FRAMEWORK_BONUS: f64 = 0.10;
const FRAMEWORK_LIBRARY_BONUS: f64 = 0.05;
const TOOL_PAIR_BONUS: f64 = 0.03;
const MAX_BONUS: f64 = 0.2;

/// Expected `(min, max)` label count and weight of each category.
fn expectation(category: Category) -> (f64, f64, f64) {
    match category {
        Category::Languages => (1.0, 3.0, 0.4),
        Category::Frameworks => (1.0, 4.0, 0.3),
        Category::Libraries => (2.0, 8.0, 0.2),
        Category::Tools => (1.0, 5.0, 0.1),
    }
}

/// How the final confidence was put together.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfidenceBreakdown {
    pub languages: f64,
    pub frameworks: f64,
    pub libraries: f64,
    pub tools: f64,
    pub weighted: f64,
    pub bonus: f64,
    pub total: f64,
}

/// Weighted-category confidence with a consistency bonus for
/// technologies known to go together.
#[derive(Debug, Clone, Default)]
pub struct ConfidenceScorer {
    language_framework: HashSet<(String, String)>,
    framework_library: HashSet<(String, String)>,
    tool_pairs: HashSet<(String, String)>,
}

impl ConfidenceScorer {
    pub fn new(compatibility: &CompatibilityTable) -> Self {
        Self {
            language_framework: compatibility.language_framework.iter().cloned().collect(),
            framework_library: compatibility.framework_library.iter().cloned().collect(),
            tool_pairs: compatibility.tool_pairs.iter().cloned().collect(),
        }
    }

    pub fn score(&self, profile: &TechProfile) -> f64 {
        self.breakdown(profile).total
    }

    pub fn breakdown(&self, profile: &TechProfile) -> ConfidenceBreakdown {
        let sub = |c: Category| category_score(c, profile.get(c).len());
        let languages = sub(Category::Languages);
        let frameworks = sub(Category::Frameworks);
        let libraries = sub(Category::Libraries);
        let tools = sub(Category::Tools);

        let weighted = Category::ALL
            .iter()
            .map(|c| sub(*c) * expectation(*c).2)
            .sum::<f64>();
        let bonus = self.bonus(profile);
        let total = round2((weighted + bonus).clamp(0.0, 1.0));

        ConfidenceBreakdown {
            languages,
            frameworks,
            libraries,
            tools,
            weighted,
            bonus,
            total,
        }
    }

    fn bonus(&self, profile: &TechProfile) -> f64 {
        let lf = self
            .language_framework
            .iter()
            .filter(|(l, f)| {
                profile.contains(Category::Languages, l) && profile.contains(Category::Frameworks, f)
            })
            .count();
        let fl = self
            .framework_library
            .iter()
            .filter(|(f, l)| {
                profile.contains(Category::Frameworks, f) && profile.contains(Category::Libraries, l)
            })
            .count();
        let tp = self
            .tool_pairs
            .iter()
            .filter(|(a, b)| {
                let tool_involved =
                    profile.contains(Category::Tools, a) || profile.contains(Category::Tools, b);
                tool_involved && contains_anywhere(profile, a) && contains_anywhere(profile, b)
            })
            .count();

        let bonus = lf as f64 * LANGUAGE_FRAMEWORK_BONUS
            + fl as f64 * FRAMEWORK_LIBRARY_BONUS
            + tp as f64 * TOOL_PAIR_BONUS;
        bonus.min(MAX_BONUS)
    }
}

fn category_score(category: Category, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    let (min, max, _) = expectation(category);
    (0.4 + 0.6 * (count as f64 - min) / (max - min)).clamp(0.0, 1.0)
}

fn contains_anywhere(profile: &TechProfile, label: &str) -> bool {
    Category::ALL.iter().any(|c| profile.contains(*c, label))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::DetectionTables;

    fn scorer() -> ConfidenceScorer {
        ConfidenceScorer::new(&DetectionTables::builtin().unwrap().compatibility)
    }

    fn profile(entries: &[(Category, &str)]) -> TechProfile {
        let mut p = TechProfile::new();
        for (c, l) in entries {
            p.add(*c, *l);
        }
        p
    }

    #[test]
    fn test_empty_profile_scores_zero() {
        assert_eq!(scorer().score(&TechProfile::new()), 0.0);
        assert_eq!(ConfidenceScorer::default().score(&TechProfile::new()), 0.0);
    }

    #[test]
    fn test_category_score_curve() {
        assert_eq!(category_score(Category::Languages, 0), 0.0);
        assert!((category_score(Category::Languages, 1) - 0.4).abs() < 1e-9);
        assert!((category_score(Category::Languages, 2) - 0.7).abs() < 1e-9);
        assert_eq!(category_score(Category::Languages, 3), 1.0);
        assert_eq!(category_score(Category::Languages, 10), 1.0);
        assert!((category_score(Category::Libraries, 1) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_single_language() {
        // 0.4 * 0.4
        let p = profile(&[(Category::Languages, "Rust")]);
        assert_eq!(scorer().score(&p), 0.16);
    }

    #[test]
    fn test_language_framework_bonus() {
        let p = profile(&[(Category::Languages, "TypeScript"), (Category::Frameworks, "React")]);
        let b = scorer().breakdown(&p);
        assert!((b.bonus - 0.10).abs() < 1e-9);
        // 0.16 + 0.12 + 0.10
        assert_eq!(b.total, 0.38);
    }

    #[test]
    fn test_bonus_is_capped() {
        let p = profile(&[
            (Category::Languages, "TypeScript"),
            (Category::Languages, "JavaScript"),
            (Category::Frameworks, "React"),
            (Category::Frameworks, "Next.js"),
            (Category::Frameworks, "Express"),
        ]);
        let b = scorer().breakdown(&p);
        assert!((b.bonus - MAX_BONUS).abs() < 1e-9);
    }

    #[test]
    fn test_total_is_clamped() {
        let mut p = TechProfile::new();
        for i in 0..10 {
            p.add(Category::Languages, format!("L{i}"));
            p.add(Category::Frameworks, format!("F{i}"));
            p.add(Category::Libraries, format!("B{i}"));
            p.add(Category::Tools, format!("T{i}"));
        }
        p.add(Category::Languages, "TypeScript");
        p.add(Category::Frameworks, "React");
        assert_eq!(scorer().score(&p), 1.0);
    }

    #[test]
    fn test_adding_a_label_never_lowers_confidence() {
        let s = scorer();
        let additions = [
            (Category::Languages, "TypeScript"),
            (Category::Frameworks, "React"),
            (Category::Libraries, "Redux"),
            (Category::Tools, "Jest"),
            (Category::Tools, "Docker"),
            (Category::Libraries, "Zod"),
            (Category::Languages, "CSS"),
            (Category::Frameworks, "Tailwind CSS"),
            (Category::Tools, "Vite"),
            (Category::Libraries, "Axios"),
        ];
        let mut p = TechProfile::new();
        let mut last = s.score(&p);
        for (c, l) in additions {
            p.add(c, l);
            let next = s.score(&p);
            assert!(next >= last, "adding {l} lowered confidence {last} -> {next}");
            last = next;
        }
    }
}
