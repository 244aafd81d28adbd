use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};

use super::{default_excluded_dirs, is_excluded, Workspace};

/// An in-memory workspace, mostly for tests and for hosts that already
/// hold file contents (an editor with unsaved buffers).
pub struct MemoryWorkspace {
    root: PathBuf,
    files: BTreeMap<PathBuf, String>,
    excluded: Vec<String>,
}

impl MemoryWorkspace {
    pub fn new() -> Self {
        Self {
            root: PathBuf::from("/workspace"),
            files: BTreeMap::new(),
            excluded: default_excluded_dirs(),
        }
    }

    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<String>) -> &mut Self {
        let path = self.relative(path.as_ref());
        self.files.insert(path, content.into());
        self
    }

    pub fn with_file(mut self, path: impl AsRef<Path>, content: impl Into<String>) -> Self {
        self.add_file(path, content);
        self
    }

    pub fn with_excluded_dirs(mut self, excluded: Vec<String>) -> Self {
        self.excluded = excluded;
        self
    }

    fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root).unwrap_or(path).to_path_buf()
    }
}

impl Default for MemoryWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

impl Workspace for MemoryWorkspace {
    fn root(&self) -> &Path {
        &self.root
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(&self.relative(path))
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        self.files
            .get(&self.relative(path))
            .cloned()
            .ok_or_else(|| anyhow!("File not found: {}", path.display()))
    }

    fn list_files(&self, limit: usize) -> Result<Vec<PathBuf>> {
        Ok(self
            .files
            .keys()
            .filter(|p| !is_excluded(p, &self.excluded))
            .take(limit)
            .cloned()
            .collect())
    }
}
