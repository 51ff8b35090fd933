// src/checker/failure.rs
// =============================================================================
// The result type every check produces when something is wrong.
//
// A `Failure` is created once by a validator (or by the extraction rules)
// and never changed afterwards. The report module only reads them.
//
// Check names:
// - "Links > Internal": produced by the internal validator
// - "Links > External": produced by the external validator
// - "Links", "Images", "Scripts", "OpenGraph": produced while extracting
// =============================================================================

use serde::Serialize;
use std::fmt;
use std::path::Path;

pub const INTERNAL_CHECK: &str = "Links > Internal";
pub const EXTERNAL_CHECK: &str = "Links > External";

/// What went wrong, independent of the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "code", rename_all = "snake_case")]
pub enum FailureKind {
    /// The URL could not be parsed at all (status 0).
    InvalidUrl,
    /// An internal link points at a file that does not exist.
    MissingInternalTarget,
    /// The file exists but has no element with the linked id/name.
    MissingFragment,
    /// An existing directory linked without a trailing slash.
    UnslashedDirectory,
    /// A GET returned a non-2xx status.
    HttpStatus(u16),
    HttpTimeout,
    /// DNS, connect, TLS or body read errors.
    HttpConnection,
    /// A 2xx page without the linked id/name.
    HashNotFoundInRemoteBody,
    /// An `http:` link while HTTPS is enforced.
    InsecureLink,
    /// A bare `href="#"` while those are not allowed.
    EmptyHash,
}

/// One broken reference, located by file and line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    /// File that holds the reference. Empty for bare link lists.
    pub path: String,
    pub check_name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub kind: FailureKind,
}

impl Failure {
    pub fn new(
        path: &Path,
        check_name: &str,
        kind: FailureKind,
        description: impl Into<String>,
        line: Option<usize>,
    ) -> Self {
        Self {
            path: path.display().to_string(),
            check_name: check_name.to_string(),
            description: description.into(),
            line,
            status: None,
            content: None,
            kind,
        }
    }

    /// A failure that is not attached to any file.
    pub fn pathless(check_name: &str, kind: FailureKind, description: impl Into<String>) -> Self {
        Self::new(Path::new(""), check_name, kind, description, None)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.path.is_empty(), self.line) {
            (true, _) => write!(f, "{}", self.description)?,
            (false, Some(line)) => write!(f, "{}:{}: {}", self.path, line, self.description)?,
            (false, None) => write!(f, "{}: {}", self.path, self.description)?,
        }
        if let Some(status) = self.status {
            write!(f, " (status code {status})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_location_and_status() {
        let failure = Failure::new(
            Path::new("site/a.html"),
            EXTERNAL_CHECK,
            FailureKind::HttpStatus(404),
            "External link https://example.test failed: 404 Not Found",
            Some(12),
        )
        .with_status(404);
        assert_eq!(
            failure.to_string(),
            "site/a.html:12: External link https://example.test failed: 404 Not Found (status code 404)"
        );
    }

    #[test]
    fn pathless_display_is_just_the_description() {
        let failure = Failure::pathless(EXTERNAL_CHECK, FailureKind::InvalidUrl, "bad is an invalid URL");
        assert_eq!(failure.path, "");
        assert_eq!(failure.to_string(), "bad is an invalid URL");
    }

    #[test]
    fn serializes_kind_with_code() {
        let failure = Failure::pathless(EXTERNAL_CHECK, FailureKind::HttpStatus(500), "boom");
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["kind"]["type"], "http_status");
        assert_eq!(json["kind"]["code"], 500);
        assert!(json.get("line").is_none());
    }
}
