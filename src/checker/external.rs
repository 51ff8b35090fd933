// src/checker/external.rs
// =============================================================================
// Checks external (http/https) references by asking the servers.
//
// Key functionality:
// - Drops URLs that can't be parsed (reported with status 0)
// - Skips URLs that only differ from an earlier one by query values
// - Sends HEAD requests, or GET when the #fragment has to be found in the page
// - Retries a failed HEAD as GET, since some servers reject HEAD
// - Looks for the fragment in 2xx pages (with GitHub's anchor aliases)
// - Turns statuses, timeouts and connection errors into failures
//
// Requests go out in waves through the `RequestBatcher`. The first wave is
// every queued URL; HEAD retries form the next wave, and so on until
// nothing is left to send.
// =============================================================================

use crate::checker::batch::{PendingRequest, Reply, RequestBatcher, TransportError};
use crate::checker::failure::{Failure, FailureKind, EXTERNAL_CHECK};
use crate::checker::occurrence::{ExternalOccurrence, ExternalUrls};
use crate::checker::url::{decode, UrlValue};
use crate::config::Config;
use crate::document::Document;
use crate::error::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Method;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Runs on every request right before it is queued.
pub type BeforeRequestHook = Box<dyn Fn(&mut PendingRequest) + Send + Sync>;

// GitHub renders "#L10-L20" line ranges with an element id of "L10".
static GITHUB_LINE_ANCHOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(L\d+)").expect("line anchor regex is valid"));

pub struct ExternalValidator {
    config: Config,
    batcher: RequestBatcher,
    hooks: Vec<BeforeRequestHook>,
    // domain + path -> query key signatures already queued
    seen_queries: HashMap<String, HashSet<String>>,
}

impl ExternalValidator {
    pub fn new(config: Config) -> Result<Self> {
        let batcher = RequestBatcher::from_config(&config.http)?;
        Ok(Self {
            config,
            batcher,
            hooks: Vec::new(),
            seen_queries: HashMap::new(),
        })
    }

    pub fn add_before_request_hook(&mut self, hook: BeforeRequestHook) {
        self.hooks.push(hook);
    }

    /// Checks every distinct URL and returns the failures, one per
    /// occurrence of each broken URL.
    pub async fn validate(&mut self, urls: &ExternalUrls) -> Vec<Failure> {
        info!("checking {} external link(s)", urls.len());
        self.seen_queries.clear();

        let mut failures = Vec::new();
        let mut queue = Vec::new();

        for (text, occurrences) in urls {
            let url = UrlValue::parse(text);
            if !url.is_valid() {
                record(
                    &mut failures,
                    occurrences,
                    FailureKind::InvalidUrl,
                    format!("{url} is an invalid URL"),
                    0,
                );
                continue;
            }
            if self.is_duplicate_query(&url) {
                debug!("skipping {url}: the same query parameters were already queued");
                continue;
            }
            queue.push(self.build_request(url, occurrences.clone()));
        }

        while !queue.is_empty() {
            let mut retries = Vec::new();
            for (request, outcome) in self.batcher.dispatch(std::mem::take(&mut queue)).await {
                match outcome {
                    Ok(reply) => {
                        if let Some(retry) = self.handle_reply(request, reply, &mut failures) {
                            retries.push(retry);
                        }
                    }
                    Err(error) => self.handle_transport_error(&request, error, &mut failures),
                }
            }
            queue = retries;
        }

        failures
    }

    fn build_request(&self, url: UrlValue, occurrences: Vec<ExternalOccurrence>) -> PendingRequest {
        let wants_hash = self.config.check_external_hash && url.has_hash();
        let method = if wants_hash { Method::GET } else { Method::HEAD };

        let mut request = PendingRequest::new(method, url, occurrences, &self.config.http);
        request.read_body = wants_hash && !self.config.only_4xx;
        for hook in &self.hooks {
            hook(&mut request);
        }
        request
    }

    /// True when an earlier URL with the same domain, path and query
    /// parameter names was already queued. URLs without a query never are.
    fn is_duplicate_query(&mut self, url: &UrlValue) -> bool {
        let Some(signature) = url.query_signature() else {
            return false;
        };
        !self
            .seen_queries
            .entry(url.domain_path())
            .or_default()
            .insert(signature)
    }

    /// Returns the request again when it should be retried as GET.
    fn handle_reply(
        &self,
        mut request: PendingRequest,
        reply: Reply,
        failures: &mut Vec<Failure>,
    ) -> Option<PendingRequest> {
        let code = reply.status.as_u16();
        if self.config.ignore_status_codes.contains(&code) {
            return None;
        }

        if reply.status.is_success() {
            if request.read_body {
                self.check_hash_in_body(&request, reply.body.as_deref().unwrap_or(""), code, failures);
            }
            return None;
        }

        if request.method == Method::HEAD {
            debug!("{} answered HEAD with {}, retrying as GET", request.url, code);
            request.method = Method::GET;
            return Some(request);
        }

        if self.config.only_4xx && !reply.status.is_client_error() {
            return None;
        }

        let description = match reply.status.canonical_reason() {
            Some(reason) => format!("External link {} failed: {} {}", request.url, code, reason),
            None => format!("External link {} failed: {}", request.url, code),
        };
        record(
            failures,
            &request.occurrences,
            FailureKind::HttpStatus(code),
            description,
            code,
        );
        None
    }

    fn check_hash_in_body(
        &self,
        request: &PendingRequest,
        body: &str,
        code: u16,
        failures: &mut Vec<Failure>,
    ) {
        let Some(hash) = request.url.hash() else {
            return;
        };
        if Document::parse(body).has_anchor(&anchor_candidates(&request.url)) {
            return;
        }
        record(
            failures,
            &request.occurrences,
            FailureKind::HashNotFoundInRemoteBody,
            format!(
                "External link {} failed: {} exists, but the hash '{}' does not",
                request.url,
                request.url.without_hash(),
                hash
            ),
            code,
        );
    }

    fn handle_transport_error(
        &self,
        request: &PendingRequest,
        error: TransportError,
        failures: &mut Vec<Failure>,
    ) {
        debug!("{} {} failed: {}", request.method, request.url, error);
        if self.config.only_4xx || self.config.ignore_status_codes.contains(&0) {
            return;
        }

        let (kind, description) = match error {
            TransportError::Timeout(_) => (
                FailureKind::HttpTimeout,
                format!("External link {} failed: got a time out (response code 0)", request.url),
            ),
            TransportError::Connection(message) => (
                FailureKind::HttpConnection,
                format!(
                    "External link {} failed with something very wrong.\n\
                     It's possible the server could not be reached, or the connection was refused.\n\
                     Sometimes, making too many requests at once also breaks things.\n\
                     Either way, the underlying error was: {}",
                    request.url, message
                ),
            ),
        };
        record(failures, &request.occurrences, kind, description, 0);
    }
}

/// Ids that count as a match for the URL's fragment.
fn anchor_candidates(url: &UrlValue) -> Vec<String> {
    let Some(hash) = url.hash() else {
        return Vec::new();
    };
    let mut ids = vec![hash.to_string()];
    let decoded = decode(hash);
    if decoded != hash {
        ids.push(decoded);
    }

    let on_github = url.host().is_some_and(is_github_host);
    if on_github {
        ids.push(format!("user-content-{hash}"));
        if let Some(line) = GITHUB_LINE_ANCHOR.find(hash) {
            ids.push(line.as_str().to_string());
        }
    }
    ids
}

/// github.com itself or one of its subdomains.
pub fn is_github_host(host: &str) -> bool {
    host.eq_ignore_ascii_case("github.com")
        || host.to_ascii_lowercase().ends_with(".github.com")
}

/// One failure per occurrence, or a single path-less one for bare links.
fn record(
    failures: &mut Vec<Failure>,
    occurrences: &[ExternalOccurrence],
    kind: FailureKind,
    description: String,
    status: u16,
) {
    if occurrences.is_empty() {
        failures.push(Failure::pathless(EXTERNAL_CHECK, kind, description).with_status(status));
        return;
    }
    for occurrence in occurrences {
        failures.push(
            Failure::new(
                &occurrence.filename,
                EXTERNAL_CHECK,
                kind,
                description.clone(),
                occurrence.line,
            )
            .with_status(status),
        );
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why a `while !queue.is_empty()` loop instead of retrying inline?
//    - The batcher sends a whole wave at once and hands back every result
//    - A HEAD that needs a retry simply goes into the next wave
//    - So retries get the same concurrency limit as everything else
//
// 2. What is `std::mem::take`?
//    - It moves the Vec out and leaves an empty one behind
//    - We need ownership to give the requests to the batcher
//
// 3. Why is `hooks` a Vec of `Box<dyn Fn ...>`?
//    - Each hook is a different closure type
//    - `Box<dyn Fn>` lets them live in the same Vec
//    - `Send + Sync` keeps the validator usable across async tasks
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use std::path::PathBuf;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn occurrence(line: usize) -> ExternalOccurrence {
        ExternalOccurrence {
            filename: PathBuf::from("site/index.html"),
            line: Some(line),
        }
    }

    fn urls(entries: &[(String, Vec<ExternalOccurrence>)]) -> ExternalUrls {
        entries.iter().cloned().collect()
    }

    async fn validate(config: Config, map: &ExternalUrls) -> Vec<Failure> {
        ExternalValidator::new(config).unwrap().validate(map).await
    }

    #[tokio::test]
    async fn test_head_rejected_then_get_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(405))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let map = urls(&[(format!("{}/page", server.uri()), vec![occurrence(1)])]);
        assert!(validate(Config::default(), &map).await.is_empty());
    }

    #[tokio::test]
    async fn test_not_found_fails_once_per_occurrence() {
        let server = MockServer::start().await;
        Mock::given(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .expect(2)
            .mount(&server)
            .await;

        let url = format!("{}/gone", server.uri());
        let map = urls(&[(url.clone(), vec![occurrence(3), occurrence(8)])]);
        let failures = validate(Config::default(), &map).await;

        assert_eq!(failures.len(), 2);
        assert_eq!(
            failures[0].description,
            format!("External link {url} failed: 404 Not Found")
        );
        assert_eq!(failures[0].status, Some(404));
        assert_eq!(failures[0].kind, FailureKind::HttpStatus(404));
        assert_eq!(failures[0].check_name, EXTERNAL_CHECK);
        assert_eq!(failures[1].line, Some(8));
    }

    #[tokio::test]
    async fn test_only_4xx_suppresses_server_errors() {
        let server = MockServer::start().await;
        Mock::given(path("/boom"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let config = Config {
            only_4xx: true,
            ..Config::default()
        };
        let map = urls(&[
            (format!("{}/boom", server.uri()), vec![occurrence(1)]),
            (format!("{}/missing", server.uri()), vec![occurrence(2)]),
            ("http://127.0.0.1:1/".to_string(), vec![occurrence(3)]),
        ]);
        let failures = validate(config, &map).await;

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].status, Some(404));
    }

    #[tokio::test]
    async fn test_missing_hash_in_remote_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<h1 id=\"other\">x</h1>"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let url = format!("{}/page#section", server.uri());
        let map = urls(&[(url.clone(), vec![occurrence(5)])]);
        let failures = validate(Config::default(), &map).await;

        assert_eq!(failures.len(), 1);
        assert!(failures[0]
            .description
            .contains("exists, but the hash 'section' does not"));
        assert_eq!(failures[0].kind, FailureKind::HashNotFoundInRemoteBody);
        assert_eq!(failures[0].status, Some(200));
    }

    #[tokio::test]
    async fn test_hash_found_by_name_attribute() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<a name=\"section\"></a>"))
            .mount(&server)
            .await;

        let map = urls(&[(format!("{}/page#section", server.uri()), vec![occurrence(1)])]);
        assert!(validate(Config::default(), &map).await.is_empty());
    }

    #[tokio::test]
    async fn test_hash_not_checked_when_disabled() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let config = Config {
            check_external_hash: false,
            ..Config::default()
        };
        let map = urls(&[(format!("{}/page#section", server.uri()), vec![occurrence(1)])]);
        assert!(validate(config, &map).await.is_empty());
    }

    #[test]
    fn test_github_anchor_aliases() {
        let url = UrlValue::parse("https://github.com/o/r/blob/main/lib.rs#L10-L20");
        let ids = anchor_candidates(&url);
        assert!(ids.contains(&"L10-L20".to_string()));
        assert!(ids.contains(&"user-content-L10-L20".to_string()));
        assert!(ids.contains(&"L10".to_string()));

        let elsewhere = UrlValue::parse("https://example.test/page#L10");
        assert_eq!(anchor_candidates(&elsewhere), vec!["L10".to_string()]);

        let lookalike = UrlValue::parse("https://notgithub.com/o/r#L10");
        assert_eq!(anchor_candidates(&lookalike), vec!["L10".to_string()]);
    }

    #[test]
    fn test_github_host_match() {
        assert!(is_github_host("github.com"));
        assert!(is_github_host("GitHub.com"));
        assert!(is_github_host("gist.github.com"));
        assert!(!is_github_host("notgithub.com"));
        assert!(!is_github_host("github.com.example.test"));
    }

    #[tokio::test]
    async fn test_query_duplicates_are_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;

        let base = server.uri();
        let map = urls(&[
            (format!("{base}/search?q=a"), vec![occurrence(1)]),
            (format!("{base}/search?q=b"), vec![occurrence(2)]),
            (format!("{base}/search?q=c&page=2"), vec![occurrence(3)]),
        ]);
        assert!(validate(Config::default(), &map).await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_url_is_not_requested() {
        let map = urls(&[("https://exa mple.test/".to_string(), vec![occurrence(4)])]);
        let failures = validate(Config::default(), &map).await;

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].kind, FailureKind::InvalidUrl);
        assert_eq!(failures[0].status, Some(0));
        assert!(failures[0].description.ends_with("is an invalid URL"));
    }

    #[tokio::test]
    async fn test_ignored_status_codes() {
        let server = MockServer::start().await;
        Mock::given(path("/private"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;

        let config = Config {
            ignore_status_codes: vec![403, 0],
            ..Config::default()
        };
        let map = urls(&[
            (format!("{}/private", server.uri()), vec![occurrence(1)]),
            ("http://127.0.0.1:1/".to_string(), vec![occurrence(2)]),
        ]);
        assert!(validate(config, &map).await.is_empty());
    }

    #[tokio::test]
    async fn test_connection_failure_message() {
        let map = urls(&[("http://127.0.0.1:1/".to_string(), vec![occurrence(6)])]);
        let failures = validate(Config::default(), &map).await;

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].kind, FailureKind::HttpConnection);
        assert!(failures[0]
            .description
            .starts_with("External link http://127.0.0.1:1/ failed with something very wrong."));
        assert!(failures[0]
            .description
            .contains("Either way, the underlying error was: "));
    }

    #[tokio::test]
    async fn test_timeout_message() {
        let server = MockServer::start().await;
        Mock::given(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let mut config = Config::default();
        config.http.timeout_ms = 200;
        let url = format!("{}/slow", server.uri());
        let map = urls(&[(url.clone(), vec![occurrence(1)])]);
        let failures = validate(config, &map).await;

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].kind, FailureKind::HttpTimeout);
        assert_eq!(
            failures[0].description,
            format!("External link {url} failed: got a time out (response code 0)")
        );
    }

    #[tokio::test]
    async fn test_before_request_hook_adds_header() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(header("x-token", "secret"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut validator = ExternalValidator::new(Config::default()).unwrap();
        validator.add_before_request_hook(Box::new(|request: &mut PendingRequest| {
            request
                .headers
                .insert("x-token", HeaderValue::from_static("secret"));
        }));

        let map = urls(&[(format!("{}/private", server.uri()), vec![occurrence(1)])]);
        assert!(validator.validate(&map).await.is_empty());
    }

    #[tokio::test]
    async fn test_bare_links_fail_without_a_path() {
        let server = MockServer::start().await;
        Mock::given(path("/gone"))
            .respond_with(ResponseTemplate::new(410))
            .mount(&server)
            .await;

        let map = urls(&[(format!("{}/gone", server.uri()), Vec::new())]);
        let failures = validate(Config::default(), &map).await;

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].path, "");
        assert_eq!(failures[0].line, None);
        assert_eq!(failures[0].status, Some(410));
    }
}
