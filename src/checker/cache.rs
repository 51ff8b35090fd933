// src/checker/cache.rs
// =============================================================================
// Per-run memo of filesystem lookups for the internal validator.
//
// Many documents link to the same files, so each absolute path is looked up
// at most once per run, and each (path, fragment set) pair is searched at
// most once. Answers are never invalidated: if a file changes halfway
// through a run, the first answer still stands.
//
// The cache is owned by the runner and lent to the internal validator with
// `&mut`, so there is exactly one writer.
// =============================================================================

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// What a resolved internal target turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Missing,
    File,
    Directory,
}

impl TargetKind {
    fn detect(path: &Path) -> Self {
        if path.is_file() {
            TargetKind::File
        } else if path.is_dir() {
            TargetKind::Directory
        } else {
            TargetKind::Missing
        }
    }

    pub fn exists(self) -> bool {
        self != TargetKind::Missing
    }
}

#[derive(Debug, Default)]
pub struct PathCache {
    checked_paths: HashMap<PathBuf, TargetKind>,
    checked_hashes: HashMap<PathBuf, HashMap<String, bool>>,
}

impl PathCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks at `path` on disk the first time, then answers from memory.
    pub fn target_kind(&mut self, path: &Path) -> TargetKind {
        if let Some(kind) = self.checked_paths.get(path) {
            return *kind;
        }
        let kind = TargetKind::detect(path);
        self.checked_paths.insert(path.to_path_buf(), kind);
        kind
    }

    /// Whether any of `fragment_ids` exists in the document at `path`.
    /// `search` runs only on the first lookup of this path and fragment set.
    pub fn fragment_exists<F>(&mut self, path: &Path, fragment_ids: &[String], search: F) -> bool
    where
        F: FnOnce() -> bool,
    {
        let key = fragment_ids.join(",");
        if let Some(found) = self.checked_hashes.get(path).and_then(|hashes| hashes.get(&key)) {
            return *found;
        }
        let found = search();
        self.checked_hashes
            .entry(path.to_path_buf())
            .or_default()
            .insert(key, found);
        found
    }

    pub fn checked_path_count(&self) -> usize {
        self.checked_paths.len()
    }
}
