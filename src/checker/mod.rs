// src/checker/mod.rs
// =============================================================================
// This module contains the link validation engine.
//
// Submodules:
// - url: turns attribute text into a normalized, classified URL
// - path: maps an internal URL onto a file on disk
// - cache: per-run memo of filesystem and fragment lookups
// - internal: checks internal URLs against the filesystem
// - batch: sends HTTP requests with a concurrency limit
// - external: checks external URLs over HTTP
// - occurrence: where each URL was found
// - failure: what the checks report
//
// This file (mod.rs) is the module root. It re-exports the pieces the rest
// of the application uses, so callers write `checker::Failure` instead of
// `checker::failure::Failure`.
// =============================================================================

mod batch;
mod cache;
mod external;
mod failure;
mod internal;
mod occurrence;
mod path;
mod url;

pub use batch::PendingRequest;
pub use cache::PathCache;
pub use external::{is_github_host, BeforeRequestHook, ExternalValidator};
pub use failure::{Failure, FailureKind, EXTERNAL_CHECK, INTERNAL_CHECK};
pub use internal::InternalValidator;
pub use occurrence::{merge_into, ExternalOccurrence, ExternalUrls, InternalOccurrence, InternalUrls};
// `self::` because the url crate has the same name.
pub use self::url::UrlValue;

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why are the submodules private (`mod`, not `pub mod`)?
//    - Callers only see what is re-exported above
//    - We can move code between files without breaking anyone
//
// 2. Which validator runs first?
//    - The runner (src/runner.rs) runs external checks, then internal ones
//    - They share nothing, so the order does not change the results
// -----------------------------------------------------------------------------
