//! Enumerates candidate files under a project root.
//!
//! Two disjoint modes: explicit mode trusts a caller-supplied file list
//! outright; discovery mode walks the tree with `WalkDir` and a
//! `filter_entry` closure skipping hidden/excluded directories, matches
//! the indexable-extension set, subtracts `globset` ignore patterns, and
//! applies a size filter.

use std::collections::HashSet;
use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::IndexOptions;
use crate::error::CoreError;
use crate::model::INDEXABLE_EXTENSIONS;

/// Directories skipped in discovery mode regardless of caller-supplied
/// ignore patterns.
const DEFAULT_EXCLUDED_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "target",
    "build",
    "dist",
    "__pycache__",
    ".venv",
    "venv",
    "vendor",
    ".tox",
    ".mypy_cache",
    ".pytest_cache",
    "coverage",
    ".next",
    ".nuxt",
    ".codegraph",
];

#[derive(Debug, Default, Clone, Copy)]
pub struct FileDiscovery;

impl FileDiscovery {
    pub fn new() -> Self {
        Self
    }

    /// Resolve the set of repo-relative, forward-slash-normalized file
    /// paths to index for this run.
    pub fn discover(&self, root: &Path, opts: &IndexOptions) -> Result<Vec<String>, CoreError> {
        match &opts.files {
            Some(files) => {
                debug!(count = files.len(), "explicit file list, skipping filters");
                Ok(files.iter().map(|f| normalize(f)).collect())
            }
            None => self.discover_mode(root, &opts.ignore_patterns, opts.min_file_size, opts.max_file_size),
        }
    }

    fn discover_mode(
        &self,
        root: &Path,
        ignore_patterns: &[String],
        min_size: u64,
        max_size: u64,
    ) -> Result<Vec<String>, CoreError> {
        let ignore_set = build_globset(ignore_patterns);
        let excluded_dirs: HashSet<&str> = DEFAULT_EXCLUDED_DIRS.iter().copied().collect();

        let mut out = Vec::new();
        for entry in WalkDir::new(root).into_iter().filter_entry(|e| {
            if !e.file_type().is_dir() || e.depth() == 0 {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            !name.starts_with('.') && !excluded_dirs.contains(name.as_ref())
        }) {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("error walking directory: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let is_indexable = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| INDEXABLE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
                .unwrap_or(false);
            if !is_indexable {
                continue;
            }

            let rel = path.strip_prefix(root).unwrap_or(path);
            let rel_str = normalize(&rel.to_string_lossy());

            if ignore_set.is_match(&rel_str) {
                continue;
            }

            let size = match entry.metadata() {
                Ok(m) => m.len(),
                Err(_) => continue,
            };
            if size < min_size || size > max_size {
                continue;
            }

            out.push(rel_str);
        }

        out.sort();
        out.dedup();
        debug!(count = out.len(), root = %root.display(), "discovered files");
        Ok(out)
    }
}

fn build_globset(patterns: &[String]) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        if let Ok(glob) = Glob::new(pattern) {
            builder.add(glob);
        } else {
            warn!(pattern = %pattern, "invalid ignore pattern, skipping");
        }
    }
    builder.build().unwrap_or_else(|_| GlobSetBuilder::new().build().unwrap())
}

fn normalize(path: &str) -> String {
    path.replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_mode_trusts_caller() {
        let temp = TempDir::new().unwrap();
        let mut opts = IndexOptions::default();
        opts.files = Some(vec!["tiny.py".to_string(), "a/b.rs".to_string()]);

        let files = FileDiscovery::new().discover(temp.path(), &opts).unwrap();
        assert_eq!(files, vec!["tiny.py".to_string(), "a/b.rs".to_string()]);
    }

    #[test]
    fn discovery_mode_filters_by_extension_and_size() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("main.py"), "x".repeat(50)).unwrap();
        std::fs::write(temp.path().join("tiny.py"), "x").unwrap();
        std::fs::write(temp.path().join("notes.txt"), "x".repeat(50)).unwrap();

        let opts = IndexOptions::default();
        let files = FileDiscovery::new().discover(temp.path(), &opts).unwrap();

        assert_eq!(files, vec!["main.py".to_string()]);
    }

    #[test]
    fn discovery_mode_skips_excluded_dirs() {
        let temp = TempDir::new().unwrap();
        let nm = temp.path().join("node_modules");
        std::fs::create_dir_all(&nm).unwrap();
        std::fs::write(nm.join("index.js"), "x".repeat(50)).unwrap();
        std::fs::write(temp.path().join("app.js"), "x".repeat(50)).unwrap();

        let opts = IndexOptions::default();
        let files = FileDiscovery::new().discover(temp.path(), &opts).unwrap();

        assert_eq!(files, vec!["app.js".to_string()]);
    }

    #[test]
    fn discovery_mode_honors_ignore_patterns() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("keep.py"), "x".repeat(50)).unwrap();
        std::fs::write(temp.path().join("skip_test.py"), "x".repeat(50)).unwrap();

        let mut opts = IndexOptions::default();
        opts.ignore_patterns = vec!["skip_*".to_string()];
        let files = FileDiscovery::new().discover(temp.path(), &opts).unwrap();

        assert_eq!(files, vec!["keep.py".to_string()]);
    }
}
