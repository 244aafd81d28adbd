//! Read-only view of the project being analyzed.
//!
//! Extractors never touch `std::fs` directly; they go through [`Workspace`],
//! which keeps every walk bounded and every glob exclusion-aware. Paths
//! returned by a workspace are relative to its root.

mod fs;
mod memory;
mod sniff;

use std::path::{Path, PathBuf};

use anyhow::Result;
use ignore::overrides::{Override, OverrideBuilder};

pub use fs::FsWorkspace;
pub use memory::MemoryWorkspace;
pub use sniff::sniff_language;

/// Directories skipped by every walk unless configuration says otherwise.
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &[
    "node_modules",
    "target",
    "dist",
    "build",
    "out",
    ".git",
    ".hg",
    ".svn",
    "vendor",
    "__pycache__",
    ".venv",
    "venv",
    ".tox",
    ".mypy_cache",
    ".pytest_cache",
    ".next",
    ".nuxt",
    ".svelte-kit",
    "coverage",
    ".idea",
    ".vscode",
    "bin",
    "obj",
    ".gradle",
    ".terraform",
];

pub fn default_excluded_dirs() -> Vec<String> {
    DEFAULT_EXCLUDED_DIRS.iter().map(|d| d.to_string()).collect()
}

pub trait Workspace: Send + Sync {
    /// Absolute root of the workspace (informational only).
    fn root(&self) -> &Path;

    fn exists(&self, path: &Path) -> bool;

    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// All files, relative to the root, in a stable order, excluded
    /// directories already removed. At most `limit` entries.
    fn list_files(&self, limit: usize) -> Result<Vec<PathBuf>>;

    /// Read at most `max_bytes` from the start of a file, lossily decoded.
    fn read_head(&self, path: &Path, max_bytes: usize) -> Result<String> {
        let content = self.read_to_string(path)?;
        Ok(truncate_at_char_boundary(&content, max_bytes).to_string())
    }

    /// Files matching a gitignore-style glob, at most `limit` of them.
    ///
    /// A pattern without a slash matches the file name at any depth
    /// (`package.json`, `*.csproj`); a pattern with a slash is anchored at
    /// the root (`config/database.yml`).
    fn find_files(&self, pattern: &str, limit: usize) -> Result<Vec<PathBuf>> {
        let matcher = glob_matcher(pattern)?;
        Ok(self
            .list_files(usize::MAX)?
            .into_iter()
            .filter(|p| glob_matches(&matcher, p))
            .take(limit)
            .collect())
    }

    /// Language id guessed from file content, for files whose extension
    /// says nothing.
    fn content_language(&self, path: &Path) -> Option<String> {
        let head = self.read_head(path, sniff::SNIFF_BYTES).ok()?;
        sniff_language(&head)
    }
}

pub(crate) fn glob_matcher(pattern: &str) -> Result<Override> {
    let mut builder = OverrideBuilder::new("/");
    builder.add(pattern)?;
    Ok(builder.build()?)
}

pub(crate) fn glob_matches(matcher: &Override, path: &Path) -> bool {
    matcher.matched(path, false).is_whitelist()
}

/// `true` if any directory component of `path` is in `excluded`.
pub(crate) fn is_excluded(path: &Path, excluded: &[String]) -> bool {
    let mut components: Vec<_> = path.components().collect();
    // the last component is the file itself
    components.pop();
    components.iter().any(|c| {
        let name = c.as_os_str().to_string_lossy();
        excluded.iter().any(|e| e == name.as_ref())
    })
}

fn truncate_at_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_unanchored_matches_any_depth() {
        let m = glob_matcher("package.json").unwrap();
        assert!(glob_matches(&m, Path::new("package.json")));
        assert!(glob_matches(&m, Path::new("apps/web/package.json")));
        assert!(!glob_matches(&m, Path::new("package.json.bak")));
    }

    #[test]
    fn test_glob_anchored_pattern() {
        let m = glob_matcher("config/database.yml").unwrap();
        assert!(glob_matches(&m, Path::new("config/database.yml")));
        assert!(!glob_matches(&m, Path::new("app/config/database.yml")));
    }

    #[test]
    fn test_glob_extension_wildcard() {
        let m = glob_matcher("*.tf").unwrap();
        assert!(glob_matches(&m, Path::new("infra/main.tf")));
        assert!(!glob_matches(&m, Path::new("infra/main.tfvars")));
    }

    #[test]
    fn test_is_excluded_checks_directories_only() {
        let excluded = default_excluded_dirs();
        assert!(is_excluded(Path::new("node_modules/react/index.js"), &excluded));
        assert!(is_excluded(Path::new("web/dist/app.js"), &excluded));
        assert!(!is_excluded(Path::new("src/build"), &excluded));
        assert!(!is_excluded(Path::new("src/main.rs"), &excluded));
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        assert_eq!(truncate_at_char_boundary("héllo", 2), "h");
        assert_eq!(truncate_at_char_boundary("abc", 10), "abc");
    }
}
