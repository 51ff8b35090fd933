// src/checker/path.rs
// =============================================================================
// Maps an internal reference onto a file on disk.
//
// The same link text can point at different files depending on which
// document it appears in, so resolution always happens in the context of
// one document: the input it was discovered under (`source`) and its own
// path (`filename`).
//
// How the base directory is picked (first match wins):
// 1. "/root/relative" links use `root_dir`, or the source directory
// 2. if the file exists next to the source, use the document's directory
// 3. if the file exists next to the document, use the document's directory
// 4. otherwise fall back to the document path itself (will not exist)
//
// After joining, an existing `<path><assume_extension>` file is preferred,
// and a directory gets the directory index file appended, unless it was
// linked without a trailing slash while redirects are not followed.
// =============================================================================

use crate::checker::url::UrlValue;
use crate::config::Config;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

/// Resolves internal references relative to one document.
#[derive(Debug, Clone, Copy)]
pub struct PathResolver<'a> {
    config: &'a Config,
    source: &'a Path,
    filename: &'a Path,
}

impl<'a> PathResolver<'a> {
    pub fn new(config: &'a Config, source: &'a Path, filename: &'a Path) -> Self {
        Self {
            config,
            source,
            filename,
        }
    }

    /// The file (or directory) the reference points at, before it is made
    /// absolute. `None` for references without a path (`#top`, `?page=2`).
    pub fn file_path(&self, url: &UrlValue) -> Option<PathBuf> {
        let path = url.path();
        if path.is_empty() {
            return None;
        }
        let relative = path.trim_start_matches('/');

        let base = if path.starts_with('/') {
            self.config
                .root_dir
                .clone()
                .unwrap_or_else(|| self.source_dir())
        } else if self.exists_with_assumed_extension(&self.source_dir().join(relative))
            || self.exists_with_assumed_extension(&parent_dir(self.filename).join(relative))
        {
            parent_dir(self.filename)
        } else {
            self.filename.to_path_buf()
        };

        let joined = base.join(relative);
        if let Some(with_ext) = self.with_assumed_extension(&joined) {
            if with_ext.is_file() {
                return Some(with_ext);
            }
        }
        if joined.is_dir() && !self.is_unslashed_directory(&joined, path) {
            return Some(joined.join(&self.config.directory_index_file));
        }
        Some(joined)
    }

    /// Absolute, lexically normalized target path. References without a
    /// path resolve to the document itself.
    pub fn absolute_path(&self, url: &UrlValue) -> PathBuf {
        let path = self
            .file_path(url)
            .unwrap_or_else(|| self.filename.to_path_buf());
        let absolute = if path.is_absolute() {
            path
        } else {
            match std::env::current_dir() {
                Ok(cwd) => cwd.join(path),
                Err(_) => path,
            }
        };
        normalize_lexically(&absolute)
    }

    /// An existing directory linked as `dir` instead of `dir/`. Servers
    /// redirect those, so they only pass when redirects are followed.
    pub fn is_unslashed_directory(&self, target: &Path, url_path: &str) -> bool {
        target.is_dir() && !url_path.ends_with('/') && !self.config.http.follow_redirects
    }

    fn source_dir(&self) -> PathBuf {
        if self.source.is_dir() {
            self.source.to_path_buf()
        } else {
            parent_dir(self.source)
        }
    }

    fn exists_with_assumed_extension(&self, path: &Path) -> bool {
        path.exists()
            || self
                .with_assumed_extension(path)
                .is_some_and(|with_ext| with_ext.exists())
    }

    fn with_assumed_extension(&self, path: &Path) -> Option<PathBuf> {
        let ext = self.config.assume_extension.as_deref()?;
        let mut text: OsString = path.as_os_str().to_os_string();
        text.push(ext);
        Some(PathBuf::from(text))
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Removes `.` and resolves `..` without touching the filesystem.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
