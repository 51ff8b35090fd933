// src/discover/walk.rs
// =============================================================================
// Walks the inputs and collects the documents in a stable order.
//
// How it works:
// 1. Check every input exists (a missing one aborts the run)
// 2. Take files as they are, walk directories with walkdir
// 3. Drop files with other extensions or matching ignore_files
// 4. Sort by path and drop duplicates (overlapping inputs)
// =============================================================================

use crate::config::Config;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// One document to check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDocument {
    /// The input (file or directory) it was found under.
    pub source: PathBuf,
    pub path: PathBuf,
}

pub fn discover_documents(config: &Config, inputs: &[PathBuf]) -> Result<Vec<DiscoveredDocument>> {
    let mut documents = Vec::new();

    for input in inputs {
        if !input.exists() {
            return Err(Error::MissingSource(input.clone()));
        }

        if input.is_file() {
            if !config.is_file_ignored(input) {
                documents.push(DiscoveredDocument {
                    source: input.clone(),
                    path: input.clone(),
                });
            }
            continue;
        }

        for entry in WalkDir::new(input).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if !has_checked_extension(config, path) {
                continue;
            }
            if config.is_file_ignored(path) {
                debug!("ignoring {}", path.display());
                continue;
            }
            documents.push(DiscoveredDocument {
                source: input.clone(),
                path: path.to_path_buf(),
            });
        }
    }

    // Stable order; the same file given twice is checked once.
    documents.sort_by(|a, b| a.path.cmp(&b.path));
    documents.dedup_by(|a, b| a.path == b.path);

    info!("found {} document(s) to check", documents.len());
    Ok(documents)
}

fn has_checked_extension(config: &Config, path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| config.is_checked_extension(&format!(".{}", ext.to_string_lossy())))
}
