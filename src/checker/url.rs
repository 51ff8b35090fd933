// src/checker/url.rs
// =============================================================================
// One reference found in a document, normalized and classified.
//
// A `UrlValue` is built once from the attribute text as it was written and
// never changes afterwards. Construction runs these steps in order:
//
// 1. strip zero-width spaces and surrounding whitespace
// 2. resolve against the document's <base href>, if there is one
// 3. apply the `swap_urls` rules
// 4. turn protocol-relative `//host/...` into `https://host/...`
// 5. percent-escape the text, unless it only uses safe characters
//
// After that the scheme, host, decoded path, query and fragment are split
// out, and all the `is_*` predicates are answered from those fields.
//
// Examples:
//   "./guide.html#install"    -> internal, hash "install"
//   "/assets/logo.png"        -> internal (root-absolute)
//   "//cdn.example.com/x.js"  -> external, "https://cdn.example.com/x.js"
//   "javascript:void(0)"      -> ignored
// =============================================================================

use crate::config::{Config, Pattern, SwapRule};
use once_cell::sync::Lazy;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use regex::Regex;
use std::fmt;
use std::path::Path;
use url::{form_urlencoded, Position, Url};

// Text made only of these characters (or valid %XX escapes) is left as-is.
static SAFE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([!#$&-;=?-\[\]_a-z~]|%[0-9a-fA-F]{2})+$").expect("safe url regex is valid")
});

static SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([a-zA-Z][a-zA-Z0-9+.\-]*):").expect("scheme regex is valid"));

// Characters escaped when cleaning a relative reference. Non-ASCII is always escaped.
const RELATIVE_UNSAFE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'|')
    .add(b'\\')
    .add(b'^');

// Stand-in origin used to resolve references against a relative <base href>.
const PLACEHOLDER_ORIGIN: &str = "https://placeholder.invalid/";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct UrlParts {
    scheme: Option<String>,
    host: Option<String>,
    /// Percent-decoded path.
    path: String,
    /// Path exactly as it appears in the normalized text.
    raw_path: String,
    query: Option<String>,
    hash: Option<String>,
}

/// A normalized, classified reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlValue {
    raw: Option<String>,
    normalized: String,
    // None when the text could not be parsed.
    parts: Option<UrlParts>,
}

impl UrlValue {
    /// Builds a value from attribute text as authored.
    pub fn new(raw: Option<&str>, base_url: Option<&str>, swaps: &[SwapRule]) -> Self {
        let normalized = raw
            .map(|raw| normalize(raw, base_url, swaps))
            .unwrap_or_default();
        let parts = parse_parts(&normalized);

        Self {
            raw: raw.map(str::to_string),
            normalized,
            parts,
        }
    }

    /// Parses already-normalized text, with no base and no swaps.
    pub fn parse(text: &str) -> Self {
        Self::new(Some(text), None, &[])
    }

    /// The attribute text before normalization.
    pub fn raw(&self) -> Option<&str> {
        self.raw.as_deref()
    }

    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    pub fn is_empty(&self) -> bool {
        self.normalized.is_empty()
    }

    pub fn is_valid(&self) -> bool {
        self.parts.is_some()
    }

    pub fn scheme(&self) -> Option<&str> {
        match &self.parts {
            Some(parts) => parts.scheme.as_deref(),
            None => scheme_of(&self.normalized),
        }
    }

    pub fn host(&self) -> Option<&str> {
        self.parts.as_ref().and_then(|parts| parts.host.as_deref())
    }

    /// Percent-decoded path, empty for hash-only or query-only references.
    pub fn path(&self) -> &str {
        self.parts.as_ref().map(|parts| parts.path.as_str()).unwrap_or("")
    }

    /// The fragment without its `#`. `None` when absent or empty.
    pub fn hash(&self) -> Option<&str> {
        self.parts
            .as_ref()
            .and_then(|parts| parts.hash.as_deref())
            .filter(|hash| !hash.is_empty())
    }

    pub fn has_hash(&self) -> bool {
        self.hash().is_some()
    }

    /// Decoded query pairs in the order they were written.
    pub fn query_values(&self) -> Vec<(String, String)> {
        match self.parts.as_ref().and_then(|parts| parts.query.as_deref()) {
            Some(query) => form_urlencoded::parse(query.as_bytes())
                .map(|(key, value)| (key.into_owned(), value.into_owned()))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Query parameter names joined in order, e.g. `"page-sort"`.
    /// `None` when the URL carries no query string.
    pub fn query_signature(&self) -> Option<String> {
        self.parts.as_ref().and_then(|parts| parts.query.as_ref())?;
        let keys: Vec<String> = self.query_values().into_iter().map(|(key, _)| key).collect();
        Some(keys.join("-"))
    }

    /// Host and path without query or fragment.
    pub fn domain_path(&self) -> String {
        match &self.parts {
            Some(parts) => format!("{}{}", parts.host.as_deref().unwrap_or(""), parts.raw_path),
            None => self.without_hash().to_string(),
        }
    }

    pub fn without_hash(&self) -> &str {
        self.normalized
            .split_once('#')
            .map(|(before, _)| before)
            .unwrap_or(&self.normalized)
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.scheme(), Some(scheme) if is_http_scheme(scheme))
    }

    pub fn is_hash(&self) -> bool {
        self.normalized.starts_with('#')
    }

    pub fn is_param(&self) -> bool {
        self.normalized.starts_with('?')
    }

    pub fn is_root_relative(&self) -> bool {
        self.normalized.starts_with('/')
    }

    /// Root-absolute and fragment-only references are always internal.
    /// Otherwise anything without a scheme that starts with a visible
    /// character is internal.
    pub fn is_internal(&self) -> bool {
        if self.is_root_relative() || self.is_hash() {
            return true;
        }
        if self.is_remote() {
            return false;
        }
        self.is_param()
            || self.normalized.starts_with('.')
            || (self.scheme().is_none()
                && self
                    .normalized
                    .chars()
                    .next()
                    .is_some_and(|c| !c.is_whitespace()))
    }

    pub fn is_javascript(&self) -> bool {
        matches!(self.scheme(), Some(scheme) if scheme.eq_ignore_ascii_case("javascript"))
    }

    /// Inline `data:image/...` sources always exist.
    pub fn is_data_image(&self) -> bool {
        self.normalized
            .get(..10)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("data:image"))
    }

    /// Whether the target is a document type we know how to search for
    /// fragments. Extensionless paths are judged by the assumed extension.
    pub fn is_known_extension(&self, config: &Config) -> bool {
        if self.is_hash() {
            return true;
        }
        let path = self.path();
        if path.ends_with('/') {
            return true;
        }
        match Path::new(path).extension() {
            Some(ext) => config.is_checked_extension(&format!(".{}", ext.to_string_lossy())),
            None => config
                .assume_extension
                .as_deref()
                .is_some_and(|ext| config.is_checked_extension(ext)),
        }
    }

    /// `javascript:` links are always ignored. Otherwise the authored text
    /// is compared against each pattern.
    pub fn is_ignored(&self, patterns: &[Pattern]) -> bool {
        if self.is_javascript() {
            return true;
        }
        let raw = self.raw.as_deref().unwrap_or("");
        patterns.iter().any(|pattern| pattern.matches(raw))
    }
}

impl fmt::Display for UrlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.normalized)
    }
}

fn normalize(raw: &str, base_url: Option<&str>, swaps: &[SwapRule]) -> String {
    let mut url = raw.replace('\u{200b}', "").trim().to_string();

    if let Some(base) = base_url.map(str::trim).filter(|base| !base.is_empty()) {
        url = join_base(base, &url);
    }

    for rule in swaps {
        url = rule.pattern.replace_all(&url, &rule.replacement);
    }

    if url.starts_with("//") {
        url = format!("https:{url}");
    }

    if url.is_empty() || SAFE_URL.is_match(&url) {
        url
    } else {
        clean(&url)
    }
}

fn join_base(base: &str, reference: &str) -> String {
    if let Ok(base) = Url::parse(base) {
        return base
            .join(reference)
            .map(String::from)
            .unwrap_or_else(|_| reference.to_string());
    }

    // A relative base like "/docs/" has no origin of its own.
    let Ok(placeholder) = Url::parse(PLACEHOLDER_ORIGIN) else {
        return reference.to_string();
    };
    match placeholder.join(base).and_then(|base| base.join(reference)) {
        Ok(joined) if joined.host_str() == placeholder.host_str() => {
            let local = &joined[Position::BeforePath..];
            if base.starts_with('/') {
                local.to_string()
            } else {
                local.trim_start_matches('/').to_string()
            }
        }
        Ok(joined) => joined.to_string(),
        Err(_) => reference.to_string(),
    }
}

fn clean(url: &str) -> String {
    match scheme_of(url) {
        Some(scheme) if is_http_scheme(scheme) => Url::parse(url)
            .map(String::from)
            .unwrap_or_else(|_| url.to_string()),
        Some(_) => url.to_string(),
        None => utf8_percent_encode(url, RELATIVE_UNSAFE).to_string(),
    }
}

fn parse_parts(normalized: &str) -> Option<UrlParts> {
    match scheme_of(normalized) {
        Some(scheme) if is_http_scheme(scheme) => {
            let url = Url::parse(normalized).ok()?;
            url.host_str()?;
            Some(UrlParts {
                scheme: Some(url.scheme().to_string()),
                host: url.host_str().map(str::to_string),
                path: decode(url.path()),
                raw_path: url.path().to_string(),
                query: url.query().map(str::to_string),
                hash: url.fragment().map(str::to_string),
            })
        }
        // mailto:, tel:, data: and friends are kept but not taken apart.
        Some(scheme) => Some(UrlParts {
            scheme: Some(scheme.to_ascii_lowercase()),
            ..UrlParts::default()
        }),
        None => {
            let (rest, hash) = match normalized.split_once('#') {
                Some((rest, hash)) => (rest, Some(hash.to_string())),
                None => (normalized, None),
            };
            let (path, query) = match rest.split_once('?') {
                Some((path, query)) => (path, Some(query.to_string())),
                None => (rest, None),
            };
            Some(UrlParts {
                scheme: None,
                host: None,
                path: decode(path),
                raw_path: path.to_string(),
                query,
                hash,
            })
        }
    }
}

fn scheme_of(text: &str) -> Option<&str> {
    SCHEME
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn is_http_scheme(scheme: &str) -> bool {
    scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https")
}

/// Percent-decodes `text`, replacing invalid UTF-8.
pub fn decode(text: &str) -> String {
    percent_decode_str(text).decode_utf8_lossy().into_owned()
}
