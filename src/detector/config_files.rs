use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

use super::Extractor;
use crate::models::TechProfile;
use crate::tables::{DetectionTables, FileRule};
use crate::workspace::Workspace;

/// Adds a technology when one of its well-known config files exists.
pub struct ConfigFileExtractor {
    tables: Arc<DetectionTables>,
    glob_limit: usize,
}

impl ConfigFileExtractor {
    pub fn new(tables: Arc<DetectionTables>, glob_limit: usize) -> Self {
        Self { tables, glob_limit }
    }
}

impl Extractor for ConfigFileExtractor {
    fn name(&self) -> &'static str {
        "config-files"
    }

    fn extract(&self, workspace: &dyn Workspace, profile: &mut TechProfile) -> Result<()> {
        apply_file_rules(self.name(), &self.tables.config_files, workspace, self.glob_limit, profile);
        Ok(())
    }
}

/// Evaluate every rule independently; a broken pattern or unreadable file
/// only costs that one rule.
pub(super) fn apply_file_rules(
    extractor: &str,
    rules: &[FileRule],
    workspace: &dyn Workspace,
    glob_limit: usize,
    profile: &mut TechProfile,
) {
    for rule in rules {
        if profile.contains(rule.category, &rule.technology) {
            continue;
        }
        match rule_matches(rule, workspace, glob_limit) {
            Ok(true) => {
                debug!(extractor, technology = %rule.technology, "Config file matched");
                profile.add(rule.category, rule.technology.as_str());
            }
            Ok(false) => {}
            Err(err) => warn!(
                extractor,
                technology = %rule.technology,
                error = %err,
                "Config file rule failed"
            ),
        }
    }
}

fn rule_matches(rule: &FileRule, workspace: &dyn Workspace, glob_limit: usize) -> Result<bool> {
    for pattern in &rule.patterns {
        let files = workspace.find_files(pattern, glob_limit)?;
        let Some(validator) = &rule.validator else {
            if !files.is_empty() {
                return Ok(true);
            }
            continue;
        };
        for path in &files {
            match workspace.read_to_string(path) {
                Ok(content) if validator.accepts(&content) => return Ok(true),
                Ok(_) => {}
                Err(err) => {
                    debug!(file = %path.display(), error = %err, "Could not validate candidate")
                }
            }
        }
    }
    Ok(false)
}
