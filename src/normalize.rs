use std::collections::{BTreeMap, HashMap};

use crate::models::{Category, TechProfile, TechStack};

/// Maps free-form technology names to one canonical label.
///
/// Lookup is case-insensitive. Every canonical label is also an alias of
/// itself, so normalizing an already-normalized label returns it unchanged.
/// Unknown names are kept with their first letter upper-cased.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    aliases: HashMap<String, String>,
}

impl Normalizer {
    pub fn new(aliases: &BTreeMap<String, String>) -> Self {
        let mut map: HashMap<String, String> = HashMap::with_capacity(aliases.len() * 2);
        for canonical in aliases.values() {
            map.insert(canonical.trim().to_lowercase(), canonical.clone());
        }
        // explicit aliases win over a canonical label's lowercase form
        for (alias, canonical) in aliases {
            map.insert(alias.trim().to_lowercase(), canonical.clone());
        }
        Self { aliases: map }
    }

    pub fn normalize(&self, raw: &str) -> String {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return String::new();
        }
        if let Some(canonical) = self.aliases.get(&trimmed.to_lowercase()) {
            return canonical.clone();
        }
        capitalize(trimmed)
    }

    /// Rebuild every category of `profile` from normalized labels.
    pub fn normalize_profile(&self, profile: &TechProfile) -> TechProfile {
        let mut out = TechProfile::new();
        for (category, label) in profile.iter() {
            out.add(category, self.normalize(label));
        }
        out.confidence = profile.confidence;
        out
    }

    /// Normalized, de-duplicated requirement list of one category,
    /// in declaration order.
    pub fn normalize_requirements(&self, stack: &TechStack, category: Category) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for raw in stack.get(category) {
            let label = self.normalize(raw);
            if !label.is_empty() && !out.contains(&label) {
                out.push(label);
            }
        }
        out
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
