// src/discover/mod.rs
// =============================================================================
// This module finds the documents to check.
//
// Inputs are files or directories:
// - a file is checked as given (unless it matches ignore_files)
// - a directory is walked recursively, keeping files whose extension is
//   one of `extensions` and whose path doesn't match ignore_files
//
// Every document remembers the input it was found under (`source`), since
// internal links are resolved relative to it.
// =============================================================================

mod walk;

pub use walk::{discover_documents, DiscoveredDocument};
