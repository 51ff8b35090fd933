// src/checker/batch.rs
// =============================================================================
// Sends queued external requests with a bounded number in flight.
//
// The external validator hands over a batch of `PendingRequest`s and gets
// back every request paired with its outcome, in the order they were
// submitted. At most `max_concurrency` requests run at the same time, and
// each one has its own timeout, so a slow host only fails its own URL.
//
// Retries (HEAD answered with an error, retried as GET) are not handled
// here: the validator simply submits them in the next batch.
// =============================================================================

use crate::checker::occurrence::ExternalOccurrence;
use crate::checker::url::UrlValue;
use crate::config::HttpConfig;
use crate::error::Result;
use futures::stream::{self, StreamExt};
use reqwest::header::HeaderMap;
use reqwest::{redirect, Client, Method, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// One external request waiting to be sent.
///
/// Before-request hooks receive this with `&mut` and may change the
/// method, headers or timeout.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub method: Method,
    pub url: UrlValue,
    pub headers: HeaderMap,
    pub timeout: Duration,
    pub(crate) occurrences: Vec<ExternalOccurrence>,
    pub(crate) read_body: bool,
}

impl PendingRequest {
    pub fn new(
        method: Method,
        url: UrlValue,
        occurrences: Vec<ExternalOccurrence>,
        http: &HttpConfig,
    ) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            timeout: Duration::from_millis(http.timeout_ms),
            occurrences,
            read_body: false,
        }
    }
}

/// What came back from the server.
#[derive(Debug)]
pub struct Reply {
    pub status: StatusCode,
    /// Present only for successful requests that asked for the body.
    pub body: Option<String>,
}

/// The request never produced a usable response.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{0}")]
    Timeout(String),
    #[error("{0}")]
    Connection(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        let message = error_chain(&error);
        if error.is_timeout() {
            TransportError::Timeout(message)
        } else {
            TransportError::Connection(message)
        }
    }
}

pub type Outcome = std::result::Result<Reply, TransportError>;

pub struct RequestBatcher {
    client: Client,
    max_concurrency: usize,
}

impl RequestBatcher {
    pub fn new(client: Client, max_concurrency: usize) -> Self {
        Self {
            client,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Builds the shared HTTP client from the run's HTTP options.
    pub fn from_config(http: &HttpConfig) -> Result<Self> {
        let redirect_policy = if http.follow_redirects {
            redirect::Policy::limited(http.max_redirects)
        } else {
            redirect::Policy::none()
        };

        let client = Client::builder()
            .user_agent(http.user_agent.clone())
            .default_headers(http.header_map()?)
            .connect_timeout(Duration::from_millis(http.connect_timeout_ms))
            .timeout(Duration::from_millis(http.timeout_ms))
            .danger_accept_invalid_certs(!http.verify_tls)
            .redirect(redirect_policy)
            .build()?;

        Ok(Self::new(client, http.max_concurrency))
    }

    /// Sends every request and returns them paired with their outcomes,
    /// in submission order.
    pub async fn dispatch(&self, requests: Vec<PendingRequest>) -> Vec<(PendingRequest, Outcome)> {
        debug!(
            "dispatching {} request(s), up to {} at a time",
            requests.len(),
            self.max_concurrency
        );
        let client = &self.client;

        stream::iter(requests)
            .map(move |request| async move {
                let outcome = send(client, &request).await;
                (request, outcome)
            })
            .buffered(self.max_concurrency)
            .collect()
            .await
    }
}

async fn send(client: &Client, request: &PendingRequest) -> Outcome {
    debug!("{} {}", request.method, request.url);

    let response = client
        .request(request.method.clone(), request.url.as_str())
        .headers(request.headers.clone())
        .timeout(request.timeout)
        .send()
        .await?;

    let status = response.status();
    let body = if request.read_body && status.is_success() {
        // Some servers pad pages with NUL bytes, which the parser chokes on.
        Some(response.text().await?.replace('\0', ""))
    } else {
        None
    };

    Ok(Reply { status, body })
}

fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
