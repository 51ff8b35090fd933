// src/checker/internal.rs
// =============================================================================
// Checks internal references against the local filesystem.
//
// For every occurrence of every internal URL:
// 1. rebuild the URL in the context of the document it appeared in
//    (its <base href> and location decide what file it means)
// 2. does the target file exist?
// 3. if the URL has a #fragment, does the target contain an element whose
//    id or name is that fragment?
//
// Filesystem answers are memoized in a `PathCache` that lives for one run,
// so a file linked from a thousand pages is looked at once.
//
// A broken URL used three times produces three failures, one per place.
// =============================================================================

use crate::checker::cache::{PathCache, TargetKind};
use crate::checker::failure::{Failure, FailureKind, INTERNAL_CHECK};
use crate::checker::occurrence::{InternalOccurrence, InternalUrls};
use crate::checker::path::PathResolver;
use crate::checker::url::{decode, UrlValue};
use crate::config::Config;
use crate::document::Document;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

// Browsers scroll to the top for "#top" even without a matching element.
const TOP_FRAGMENT: &str = "top";

pub struct InternalValidator<'a> {
    config: &'a Config,
}

impl<'a> InternalValidator<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Checks every occurrence and returns the failures in map order.
    pub fn validate(&self, urls: &InternalUrls, cache: &mut PathCache) -> Vec<Failure> {
        info!("checking {} internal link(s)", urls.len());

        let mut failures = Vec::new();
        for (text, occurrences) in urls {
            for occurrence in occurrences {
                if let Some(failure) = self.check_occurrence(text, occurrence, cache) {
                    failures.push(failure);
                }
            }
        }

        debug!(
            "internal check looked at {} distinct path(s)",
            cache.checked_path_count()
        );
        failures
    }

    fn check_occurrence(
        &self,
        text: &str,
        occurrence: &InternalOccurrence,
        cache: &mut PathCache,
    ) -> Option<Failure> {
        let url = UrlValue::new(
            Some(text),
            occurrence.base_url.as_deref(),
            &self.config.swap_urls,
        );
        let resolver = PathResolver::new(self.config, &occurrence.source, &occurrence.filename);
        let target = resolver.absolute_path(&url);

        let fail = |kind, description: String| {
            Some(Failure::new(
                &occurrence.filename,
                INTERNAL_CHECK,
                kind,
                description,
                occurrence.line,
            ))
        };

        let kind = cache.target_kind(&target);
        if !kind.exists() {
            return fail(
                FailureKind::MissingInternalTarget,
                format!("internally linking to {url}, which does not exist"),
            );
        }
        if kind == TargetKind::Directory && resolver.is_unslashed_directory(&target, url.path()) {
            return fail(
                FailureKind::UnslashedDirectory,
                format!("internally linking to {url}, which is a directory; add a trailing slash"),
            );
        }

        if !self.config.check_internal_hash {
            return None;
        }
        let hash = url.hash()?;
        if hash == TOP_FRAGMENT {
            return None;
        }

        let found = url.is_known_extension(self.config) && {
            let ids = fragment_ids(hash);
            cache.fragment_exists(&target, &ids, || file_has_anchor(&target, &ids))
        };
        if found {
            None
        } else {
            fail(
                FailureKind::MissingFragment,
                format!("internally linking to {url}; the file exists, but the hash '{hash}' does not"),
            )
        }
    }
}

/// The fragment as written and its decoded form.
fn fragment_ids(hash: &str) -> Vec<String> {
    let decoded = decode(hash);
    if decoded == hash {
        vec![hash.to_string()]
    } else {
        vec![hash.to_string(), decoded]
    }
}

fn file_has_anchor(path: &Path, ids: &[String]) -> bool {
    match fs::read(path) {
        Ok(bytes) => Document::parse(&String::from_utf8_lossy(&bytes)).has_anchor(ids),
        Err(e) => {
            warn!("could not read {} to look for #{}: {}", path.display(), ids.join(", #"), e);
            false
        }
    }
}
