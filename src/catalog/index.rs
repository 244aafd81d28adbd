//! Build catalog entries from a directory of `.mdc` rule files.
//!
//! Layout: one sub-directory per rule set, each holding one or more
//! `.mdc` files. The rule set's tech stack is guessed from the directory
//! name (`nextjs-typescript-tailwind-cursorrules-prompt-file`).

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use super::model::{Catalog, LocalizedText, RuleEntry, RuleFile};
use crate::error::{CatalogError, CatalogResult};
use crate::models::{Category, TechStack};

const DIR_SUFFIX: &str = "-cursorrules-prompt-file";
const DEFAULT_GLOBS: &str = "**/*.*";

/// Directory-name keyword → canonical label.
const KEYWORDS: &[(&str, Category, &str)] = &[
    ("typescript", Category::Languages, "TypeScript"),
    ("javascript", Category::Languages, "JavaScript"),
    ("python", Category::Languages, "Python"),
    ("php", Category::Languages, "PHP"),
    ("solidity", Category::Languages, "Solidity"),
    ("c#", Category::Languages, "C#"),
    ("csharp", Category::Languages, "C#"),
    ("rust", Category::Languages, "Rust"),
    ("go", Category::Languages, "Go"),
    ("react", Category::Frameworks, "React"),
    ("angular", Category::Frameworks, "Angular"),
    ("vue", Category::Frameworks, "Vue"),
    ("nextjs", Category::Frameworks, "Next.js"),
    ("fastapi", Category::Frameworks, "FastAPI"),
    ("flask", Category::Frameworks, "Flask"),
    ("django", Category::Frameworks, "Django"),
    ("laravel", Category::Frameworks, "Laravel"),
    ("express", Category::Frameworks, "Express"),
    ("nestjs", Category::Frameworks, "NestJS"),
    ("tailwind", Category::Frameworks, "Tailwind CSS"),
    ("shadcn", Category::Frameworks, "shadcn/ui"),
    ("sveltekit", Category::Frameworks, "SvelteKit"),
    ("svelte", Category::Frameworks, "Svelte"),
    ("qwik", Category::Frameworks, "Qwik"),
    ("solid", Category::Frameworks, "Solid"),
    ("vite", Category::Tools, "Vite"),
    ("webpack", Category::Tools, "Webpack"),
    ("jest", Category::Tools, "Jest"),
    ("cypress", Category::Tools, "Cypress"),
    ("storybook", Category::Tools, "Storybook"),
    ("pwa", Category::Tools, "PWA"),
    ("vercel", Category::Tools, "Vercel"),
    ("netlify", Category::Tools, "Netlify"),
    ("supabase", Category::Tools, "Supabase"),
    ("mongodb", Category::Tools, "MongoDB"),
    ("firebase", Category::Tools, "Firebase"),
];

static FRONT_MATTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\A---\r?\n(.*?)\r?\n---\r?\n").expect("front matter regex"));

#[derive(Debug, Default, Deserialize)]
struct FrontMatter {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    globs: Option<serde_yaml::Value>,
}

/// What [`index_rules_dir`] did.
#[derive(Debug)]
pub struct IndexReport {
    pub catalog: Catalog,
    /// Ids of the entries that were added.
    pub added: Vec<String>,
}

/// Scan `rules_dir` and append an entry for every rule set whose id is not
/// in `existing` yet. `lastUpdated` becomes today's date.
pub fn index_rules_dir(rules_dir: &Path, existing: Option<Catalog>) -> CatalogResult<IndexReport> {
    let mut catalog = existing.unwrap_or_default();
    let mut added = Vec::new();

    for dir in sorted_entries(rules_dir)?.into_iter().filter(|p| p.is_dir()) {
        let Some(dir_name) = dir.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        let files = scan_rule_dir(rules_dir, &dir)?;
        let entry = rule_entry(&dir_name, files);
        if catalog.contains(&entry.id) {
            debug!(id = %entry.id, "Rule already indexed");
            continue;
        }
        added.push(entry.id.clone());
        catalog.rules.push(entry);
    }

    catalog.last_updated = chrono::Local::now().format("%Y-%m-%d").to_string();
    Ok(IndexReport { catalog, added })
}

fn sorted_entries(dir: &Path) -> CatalogResult<Vec<PathBuf>> {
    let io_err = |source| CatalogError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = std::fs::read_dir(dir)
        .map_err(io_err)?
        .map(|e| e.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_err)?;
    entries.sort();
    Ok(entries)
}

fn scan_rule_dir(rules_dir: &Path, dir: &Path) -> CatalogResult<Vec<RuleFile>> {
    let mut files = Vec::new();
    for path in sorted_entries(dir)? {
        if !path.is_file() || path.extension().map_or(true, |e| e != "mdc") {
            continue;
        }
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) => {
                warn!(file = %path.display(), error = %err, "Skipping unreadable rule file");
                continue;
            }
        };
        let (description, globs) = describe_mdc(&content);
        let relative = path.strip_prefix(rules_dir).unwrap_or(&path);
        files.push(RuleFile {
            path: relative.to_string_lossy().replace('\\', "/"),
            description: Some(LocalizedText::Plain(description)),
            globs: Some(globs),
        });
    }
    Ok(files)
}

/// Description and globs of one `.mdc` file.
///
/// The front matter `description` wins; otherwise the first non-empty line
/// of the body, stripped of leading `#`s.
fn describe_mdc(content: &str) -> (String, String) {
    let (front, body) = match FRONT_MATTER.captures(content) {
        Some(caps) => {
            let front = serde_yaml::from_str::<FrontMatter>(&caps[1]).unwrap_or_default();
            (front, &content[caps.get(0).map_or(0, |m| m.end())..])
        }
        None => (FrontMatter::default(), content),
    };

    let globs = match front.globs {
        Some(serde_yaml::Value::String(s)) if !s.trim().is_empty() => s,
        Some(serde_yaml::Value::Sequence(items)) if !items.is_empty() => items
            .iter()
            .filter_map(|v| v.as_str())
            .collect::<Vec<_>>()
            .join(","),
        _ => DEFAULT_GLOBS.to_string(),
    };

    let description = front
        .description
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| {
            body.lines()
                .map(str::trim)
                .find(|l| !l.is_empty())
                .map(|l| l.trim_start_matches('#').trim().to_string())
                .unwrap_or_default()
        });

    (description, globs)
}

/// Technologies named by the dash-separated parts of a directory name.
pub fn infer_tech_stack(dir_name: &str) -> TechStack {
    let id = dir_name.trim_end_matches('/').trim_end_matches(DIR_SUFFIX);
    let mut stack = TechStack::default();
    for part in id.split('-') {
        let part = part.to_lowercase();
        let Some((_, category, label)) = KEYWORDS.iter().find(|(k, _, _)| *k == part) else {
            continue;
        };
        let list = match category {
            Category::Languages => &mut stack.languages,
            Category::Frameworks => &mut stack.frameworks,
            Category::Libraries => &mut stack.libraries,
            Category::Tools => &mut stack.tools,
        }
        .get_or_insert_with(Vec::new);
        if !list.iter().any(|l| l == label) {
            list.push(label.to_string());
        }
    }
    stack
}

fn rule_entry(dir_name: &str, files: Vec<RuleFile>) -> RuleEntry {
    let id = dir_name.trim_end_matches(DIR_SUFFIX).to_string();
    let stack = infer_tech_stack(dir_name);
    let tags = [Category::Languages, Category::Frameworks, Category::Tools]
        .iter()
        .flat_map(|c| stack.get(*c))
        .map(|l| l.to_lowercase())
        .collect();

    let description = if files.is_empty() {
        format!("{id} rule set")
    } else {
        format!("{id} rule set with {} rule file(s)", files.len())
    };

    let mut entry = RuleEntry::new(id.clone(), title_case(&id.replace('-', " ")));
    entry.description = LocalizedText::Plain(description);
    entry.path = Some(dir_name.to_string());
    entry.tech_stack = Some(stack);
    entry.tags = tags;
    entry.files = Some(files);
    entry
}

fn title_case(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
