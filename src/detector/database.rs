use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use regex::Regex;
use tracing::{debug, warn};

use super::{add_database, Extractor};
use crate::models::TechProfile;
use crate::tables::{DatabaseTable, DetectionTables};
use crate::workspace::Workspace;

/// Finds databases in environment files and framework configuration:
/// connection URLs (`postgres://`), JDBC URLs and known config keys.
pub struct DatabaseExtractor {
    tables: Arc<DetectionTables>,
    glob_limit: usize,
}

impl DatabaseExtractor {
    pub fn new(tables: Arc<DetectionTables>, glob_limit: usize) -> Self {
        Self { tables, glob_limit }
    }
}

impl Extractor for DatabaseExtractor {
    fn name(&self) -> &'static str {
        "databases"
    }

    fn extract(&self, workspace: &dyn Workspace, profile: &mut TechProfile) -> Result<()> {
        let mut candidates: BTreeSet<PathBuf> = BTreeSet::new();
        for pattern in &self.tables.databases.files {
            candidates.extend(workspace.find_files(pattern, self.glob_limit)?);
        }

        let scanner = Scanner::new()?;
        for path in &candidates {
            let content = match workspace.read_to_string(path) {
                Ok(c) => c,
                Err(err) => {
                    warn!(file = %path.display(), error = %err, "Skipping unreadable config file");
                    continue;
                }
            };
            for technology in scanner.scan(&self.tables.databases, &content) {
                if add_database(profile, &technology) {
                    debug!(file = %path.display(), %technology, "Database found");
                }
            }
        }
        Ok(())
    }
}

struct Scanner {
    url: Regex,
    jdbc: Regex,
}

impl Scanner {
    fn new() -> Result<Self> {
        Ok(Self {
            url: Regex::new(r"\b([A-Za-z][A-Za-z0-9+.\-]*)://")?,
            jdbc: Regex::new(r"\bjdbc:([A-Za-z0-9]+):")?,
        })
    }

    fn scan(&self, table: &DatabaseTable, content: &str) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        for caps in self.url.captures_iter(content) {
            if let Some(tech) = table.scheme(&caps[1]) {
                found.insert(tech.to_string());
            }
        }
        for caps in self.jdbc.captures_iter(content) {
            if let Some(tech) = table.jdbc(&caps[1]) {
                found.insert(tech.to_string());
            }
        }
        for (re, tech) in &table.keywords {
            if re.is_match(content) {
                found.insert(tech.clone());
            }
        }
        found
    }
}
