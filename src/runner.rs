// src/runner.rs
// =============================================================================
// Ties discovery, extraction and the two validators together.
//
// One `check_paths` call is one run:
// 1. find the documents under the inputs
// 2. parse each one and extract its internal and external URLs
// 3. merge the per-document maps, so each URL lists every place it's used
// 4. check external URLs (unless disabled), then internal ones
// 5. hand back every failure plus a few counts for the summary
//
// Caches (filesystem lookups, query signatures) start empty on every run.
// =============================================================================

use crate::checker::{
    merge_into, BeforeRequestHook, ExternalUrls, ExternalValidator, Failure, FailureKind,
    InternalUrls, InternalValidator, PathCache, UrlValue, EXTERNAL_CHECK,
};
use crate::config::Config;
use crate::discover::discover_documents;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::extract::extract_urls;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// The result of one run.
#[derive(Debug, Default, Serialize)]
pub struct RunOutcome {
    pub documents: usize,
    pub internal_urls: usize,
    pub external_urls: usize,
    pub failures: Vec<Failure>,
}

impl RunOutcome {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

pub struct Runner {
    config: Config,
    external: ExternalValidator,
}

impl Runner {
    /// Validates the configuration and builds the HTTP client.
    pub fn new(config: Config) -> Result<Self> {
        let config = config.validate()?;
        let external = ExternalValidator::new(config.clone())?;
        Ok(Self { config, external })
    }

    /// Registers a hook that sees every external request before it's sent.
    pub fn add_before_request_hook(&mut self, hook: BeforeRequestHook) {
        self.external.add_before_request_hook(hook);
    }

    /// Checks every document found under `inputs`.
    pub async fn check_paths(&mut self, inputs: &[PathBuf]) -> Result<RunOutcome> {
        let documents = discover_documents(&self.config, inputs)?;

        let mut internal = InternalUrls::new();
        let mut external = ExternalUrls::new();
        let mut failures = Vec::new();

        for document in &documents {
            let bytes = fs::read(&document.path).map_err(|source| Error::Read {
                path: document.path.clone(),
                source,
            })?;
            let parsed = Document::parse(&String::from_utf8_lossy(&bytes));
            let extracted = extract_urls(&self.config, &document.source, &document.path, &parsed);
            debug!(
                "{}: {} internal, {} external",
                document.path.display(),
                extracted.internal.len(),
                extracted.external.len()
            );

            merge_into(&mut internal, extracted.internal);
            merge_into(&mut external, extracted.external);
            failures.extend(extracted.failures);
        }

        if self.config.disable_external {
            info!("external checks are disabled, skipping {} URL(s)", external.len());
        } else {
            failures.extend(self.external.validate(&external).await);
        }

        let mut cache = PathCache::new();
        failures.extend(InternalValidator::new(&self.config).validate(&internal, &mut cache));

        Ok(RunOutcome {
            documents: documents.len(),
            internal_urls: internal.len(),
            external_urls: external.len(),
            failures,
        })
    }

    /// Checks a bare list of external links. Failures carry no file or line.
    pub async fn check_links(&mut self, links: &[String]) -> RunOutcome {
        let mut external = ExternalUrls::new();
        let mut failures = Vec::new();

        for link in links {
            let url = UrlValue::new(Some(link), None, &self.config.swap_urls);
            if url.is_ignored(&self.config.ignore_urls) {
                continue;
            }
            if !url.is_remote() {
                warn!("{link} is not an http(s) link");
                failures.push(
                    Failure::pathless(
                        EXTERNAL_CHECK,
                        FailureKind::InvalidUrl,
                        format!("{url} is an invalid URL"),
                    )
                    .with_status(0),
                );
                continue;
            }
            external.entry(url.as_str().to_string()).or_default();
        }

        failures.extend(self.external.validate(&external).await);

        RunOutcome {
            documents: 0,
            internal_urls: 0,
            external_urls: external.len(),
            failures,
        }
    }
}
