use anyhow::Result;
use tracing::debug;

use super::Extractor;
use crate::models::{Category, TechProfile};
use crate::normalize::Normalizer;
use crate::tables::CombinationRule;
use crate::workspace::Workspace;

/// Adds composite labels ("MERN Stack") when all of their parts are
/// already in the profile.
///
/// Reads what the other extractors produced, so the detector runs it last,
/// on the merged and normalized profile. Rules are applied in table order;
/// a composite added by one rule can satisfy a later one.
pub struct CombinationExtractor {
    rules: Vec<NormalizedRule>,
}

struct NormalizedRule {
    requires: Vec<(Category, String)>,
    technology: String,
    category: Category,
}

impl CombinationExtractor {
    pub fn new(rules: &[CombinationRule], normalizer: Normalizer) -> Self {
        let rules = rules
            .iter()
            .map(|r| NormalizedRule {
                requires: r
                    .requires
                    .iter()
                    .map(|req| (req.category, normalizer.normalize(&req.name)))
                    .collect(),
                technology: normalizer.normalize(&r.technology),
                category: r.category,
            })
            .collect();
        Self { rules }
    }
}

impl Extractor for CombinationExtractor {
    fn name(&self) -> &'static str {
        "combinations"
    }

    fn extract(&self, _workspace: &dyn Workspace, profile: &mut TechProfile) -> Result<()> {
        for rule in &self.rules {
            if rule.requires.is_empty() {
                continue;
            }
            let satisfied = rule
                .requires
                .iter()
                .all(|(category, name)| profile.contains(*category, name));
            if satisfied && profile.add(rule.category, rule.technology.as_str()) {
                debug!(technology = %rule.technology, "Combination matched");
            }
        }
        Ok(())
    }
}
