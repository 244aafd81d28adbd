use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use ignore::WalkBuilder;
use once_cell::sync::OnceCell;
use tracing::{debug, warn};

use super::{default_excluded_dirs, Workspace};

/// Files larger than this are never read whole.
const MAX_READ_BYTES: u64 = 2 * 1024 * 1024;

/// A workspace backed by a directory on disk.
///
/// The tree is walked once, lazily, and the relative file list is cached
/// for every later `list_files` / `find_files` call. The walk stops after
/// `max_entries` files so a huge monorepo cannot make detection unbounded.
pub struct FsWorkspace {
    root: PathBuf,
    excluded: Vec<String>,
    max_entries: usize,
    max_depth: usize,
    respect_gitignore: bool,
    files: OnceCell<Vec<PathBuf>>,
}

impl FsWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.exists() {
            bail!("Workspace path does not exist: {}", root.display());
        }
        if !root.is_dir() {
            bail!("Workspace path is not a directory: {}", root.display());
        }
        let root = root
            .canonicalize()
            .with_context(|| format!("Failed to canonicalize {}", root.display()))?;

        Ok(Self {
            root,
            excluded: default_excluded_dirs(),
            max_entries: 20_000,
            max_depth: 12,
            respect_gitignore: false,
            files: OnceCell::new(),
        })
    }

    pub fn with_excluded_dirs(mut self, excluded: Vec<String>) -> Self {
        self.excluded = excluded;
        self
    }

    pub fn with_limits(mut self, max_entries: usize, max_depth: usize) -> Self {
        self.max_entries = max_entries;
        self.max_depth = max_depth;
        self
    }

    pub fn respect_gitignore(mut self, yes: bool) -> Self {
        self.respect_gitignore = yes;
        self
    }

    fn files(&self) -> &[PathBuf] {
        self.files.get_or_init(|| self.walk())
    }

    fn walk(&self) -> Vec<PathBuf> {
        let excluded = self.excluded.clone();
        let mut files = Vec::new();

        let walker = WalkBuilder::new(&self.root)
            .max_depth(Some(self.max_depth))
            .hidden(false)
            .git_ignore(self.respect_gitignore)
            .git_exclude(self.respect_gitignore)
            .git_global(false)
            .parents(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| {
                if entry.depth() == 0 {
                    return true;
                }
                let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
                if !is_dir {
                    return true;
                }
                let name = entry.file_name().to_string_lossy();
                !excluded.iter().any(|e| e == name.as_ref())
            })
            .build();

        for result in walker {
            let entry = match result {
                Ok(e) => e,
                Err(err) => {
                    warn!(error = %err, "Failed to read directory entry");
                    continue;
                }
            };
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            if files.len() >= self.max_entries {
                warn!(
                    max_entries = self.max_entries,
                    "Reached workspace file limit, stopping walk"
                );
                break;
            }
            if let Ok(rel) = entry.path().strip_prefix(&self.root) {
                files.push(rel.to_path_buf());
            }
        }

        debug!(root = %self.root.display(), files = files.len(), "Workspace walked");
        files
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl Workspace for FsWorkspace {
    fn root(&self) -> &Path {
        &self.root
    }

    fn exists(&self, path: &Path) -> bool {
        self.absolute(path).exists()
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        let abs = self.absolute(path);
        let size = fs::metadata(&abs)
            .with_context(|| format!("Failed to stat {}", abs.display()))?
            .len();
        if size > MAX_READ_BYTES {
            bail!("{} is too large to read ({} bytes)", abs.display(), size);
        }
        fs::read_to_string(&abs).with_context(|| format!("Failed to read {}", abs.display()))
    }

    fn read_head(&self, path: &Path, max_bytes: usize) -> Result<String> {
        let abs = self.absolute(path);
        let file = fs::File::open(&abs).with_context(|| format!("Failed to open {}", abs.display()))?;
        let mut buffer = Vec::with_capacity(max_bytes);
        file.take(max_bytes as u64)
            .read_to_end(&mut buffer)
            .with_context(|| format!("Failed to read bytes from {}", abs.display()))?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    fn list_files(&self, limit: usize) -> Result<Vec<PathBuf>> {
        Ok(self.files().iter().take(limit).cloned().collect())
    }
}
