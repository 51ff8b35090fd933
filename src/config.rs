// src/config.rs
// =============================================================================
// Run configuration.
//
// Everything the validators need to know lives in one `Config` struct with
// sensible defaults. It can be loaded from a TOML file, then the CLI applies
// its own flags on top, and finally `validate()` is called exactly once
// before a run starts. After that the config is treated as read-only.
//
// Example config file:
//
//   assume_extension = ".html"
//   ignore_urls = ["/^https://localhost/", "https://example.com/skip"]
//   only_4xx = true
//
//   [[swap_urls]]
//   pattern = "/^https://staging\\.example\\.com/"
//   replacement = ""
//
//   [http]
//   max_concurrency = 8
//   headers = { "Accept" = "text/html" }
// =============================================================================

use crate::error::ConfigError;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// User agent sent with every external request unless overridden.
pub const DEFAULT_USER_AGENT: &str = concat!("linkproof/", env!("CARGO_PKG_VERSION"));

/// A string that is either matched literally or, when written as `/.../`,
/// compiled into a regular expression.
#[derive(Clone, Deserialize)]
#[serde(try_from = "String")]
pub enum Pattern {
    Literal(String),
    Regex(Regex),
}

impl Pattern {
    /// Literal patterns must equal the whole text; regexes match anywhere.
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Pattern::Literal(literal) => literal == text,
            Pattern::Regex(regex) => regex.is_match(text),
        }
    }

    /// Replaces every occurrence of the pattern in `text`.
    pub fn replace_all(&self, text: &str, replacement: &str) -> String {
        match self {
            Pattern::Literal(literal) if literal.is_empty() => text.to_string(),
            Pattern::Literal(literal) => text.replace(literal.as_str(), replacement),
            Pattern::Regex(regex) => regex.replace_all(text, replacement).into_owned(),
        }
    }
}

impl FromStr for Pattern {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() >= 2 && s.starts_with('/') && s.ends_with('/') {
            let inner = &s[1..s.len() - 1];
            Regex::new(inner)
                .map(Pattern::Regex)
                .map_err(|source| ConfigError::InvalidPattern {
                    pattern: s.to_string(),
                    source,
                })
        } else {
            Ok(Pattern::Literal(s.to_string()))
        }
    }
}

impl TryFrom<String> for Pattern {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Literal(literal) => write!(f, "Literal({literal:?})"),
            Pattern::Regex(regex) => write!(f, "Regex(/{}/)", regex.as_str()),
        }
    }
}

/// One entry of `swap_urls`: every match of `pattern` is replaced before
/// the URL is classified.
#[derive(Debug, Clone, Deserialize)]
pub struct SwapRule {
    pub pattern: Pattern,
    #[serde(default)]
    pub replacement: String,
}

/// Which element rules feed URLs to the validators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CheckKind {
    Links,
    Images,
    Scripts,
    #[value(name = "opengraph")]
    OpenGraph,
}

impl CheckKind {
    /// Name used in failure reports.
    pub fn name(self) -> &'static str {
        match self {
            CheckKind::Links => "Links",
            CheckKind::Images => "Images",
            CheckKind::Scripts => "Scripts",
            CheckKind::OpenGraph => "OpenGraph",
        }
    }
}

/// Options handed to the HTTP client and to every external request.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    pub user_agent: String,
    pub headers: BTreeMap<String, String>,
    pub follow_redirects: bool,
    pub max_redirects: usize,
    pub verify_tls: bool,
    pub timeout_ms: u64,
    pub connect_timeout_ms: u64,
    pub max_concurrency: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            headers: BTreeMap::new(),
            follow_redirects: true,
            max_redirects: 10,
            verify_tls: true,
            timeout_ms: 30_000,
            connect_timeout_ms: 10_000,
            max_concurrency: 50,
        }
    }
}

impl HttpConfig {
    /// Builds the configured headers, rejecting names or values HTTP can't carry.
    pub fn header_map(&self) -> Result<HeaderMap, ConfigError> {
        let mut map = HeaderMap::new();
        for (name, value) in &self.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ConfigError::InvalidHeader(name.clone()))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| ConfigError::InvalidHeader(format!("{name}: {value}")))?;
            map.insert(header_name, header_value);
        }
        Ok(map)
    }
}

/// Global configuration for one validation run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Extension tried on extensionless internal paths. `None` disables it.
    pub assume_extension: Option<String>,
    /// File substituted when an internal link resolves to a directory.
    pub directory_index_file: String,
    /// Base for root-absolute links (`/docs/page.html`).
    pub root_dir: Option<PathBuf>,
    /// Extensions of documents that are discovered and searched for fragments.
    pub extensions: Vec<String>,
    pub check_external_hash: bool,
    pub check_internal_hash: bool,
    pub ignore_status_codes: Vec<u16>,
    pub ignore_urls: Vec<Pattern>,
    pub ignore_files: Vec<Pattern>,
    /// Only report external failures with a 4xx status.
    pub only_4xx: bool,
    pub swap_urls: Vec<SwapRule>,
    pub disable_external: bool,
    pub enforce_https: bool,
    /// Accept `href="#"` without complaint.
    pub allow_hash_href: bool,
    pub checks: Vec<CheckKind>,
    pub http: HttpConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            assume_extension: Some(".html".to_string()),
            directory_index_file: "index.html".to_string(),
            root_dir: None,
            extensions: vec![".html".to_string()],
            check_external_hash: true,
            check_internal_hash: true,
            ignore_status_codes: Vec::new(),
            ignore_urls: Vec::new(),
            ignore_files: Vec::new(),
            only_4xx: false,
            swap_urls: Vec::new(),
            disable_external: false,
            enforce_https: false,
            allow_hash_href: true,
            checks: vec![CheckKind::Links, CheckKind::Images, CheckKind::Scripts],
            http: HttpConfig::default(),
        }
    }
}

impl Config {
    /// Loads a config file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Checks the values that can't be expressed in the type system.
    /// An empty `assume_extension` is normalized to `None`.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        if self.assume_extension.as_deref() == Some("") {
            self.assume_extension = None;
        }
        if let Some(ext) = &self.assume_extension {
            if !ext.starts_with('.') {
                return Err(ConfigError::InvalidExtension(ext.clone()));
            }
        }
        if let Some(ext) = self.extensions.iter().find(|ext| !ext.starts_with('.')) {
            return Err(ConfigError::InvalidExtension(ext.clone()));
        }
        if self.directory_index_file.is_empty() {
            return Err(ConfigError::EmptyIndexFile);
        }
        if let Some(root) = &self.root_dir {
            if !root.is_dir() {
                return Err(ConfigError::RootDirNotDirectory(root.clone()));
            }
        }
        if self.http.max_concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        self.http.header_map()?;
        Ok(self)
    }

    pub fn is_check_enabled(&self, kind: CheckKind) -> bool {
        self.checks.contains(&kind)
    }

    pub fn is_file_ignored(&self, path: &Path) -> bool {
        let text = path.to_string_lossy();
        self.ignore_files.iter().any(|pattern| pattern.matches(&text))
    }

    /// Whether `ext` (with its leading dot) is one of the checked extensions.
    pub fn is_checked_extension(&self, ext: &str) -> bool {
        self.extensions.iter().any(|known| known.eq_ignore_ascii_case(ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = Config::default();
        assert_eq!(cfg.assume_extension.as_deref(), Some(".html"));
        assert_eq!(cfg.directory_index_file, "index.html");
        assert!(cfg.check_external_hash);
        assert!(cfg.allow_hash_href);
        assert_eq!(cfg.http.max_concurrency, 50);
        assert!(cfg.http.follow_redirects);
    }

    #[test]
    fn pattern_literal_and_regex() {
        let literal: Pattern = "https://example.com/a".parse().unwrap();
        assert!(literal.matches("https://example.com/a"));
        assert!(!literal.matches("https://example.com/ab"));

        let regex: Pattern = "/^https://example/".parse().unwrap();
        assert!(matches!(regex, Pattern::Regex(_)));
        assert!(regex.matches("https://example.com/anything"));
        assert!(!regex.matches("http://example.com"));
    }

    #[test]
    fn single_slash_is_literal() {
        let pattern: Pattern = "/".parse().unwrap();
        assert!(matches!(pattern, Pattern::Literal(_)));
    }

    #[test]
    fn invalid_regex_is_rejected() {
        let err = "/([a-z/".parse::<Pattern>().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn pattern_replace_all() {
        let literal: Pattern = "staging.".parse().unwrap();
        assert_eq!(
            literal.replace_all("https://staging.example.com/staging./x", ""),
            "https://example.com//x"
        );

        let regex: Pattern = r"/^https?://example\.com/".parse().unwrap();
        assert_eq!(regex.replace_all("https://example.com/docs", ""), "/docs");
    }

    #[test]
    fn config_toml_custom_values() {
        let toml = r#"
            assume_extension = ".htm"
            extensions = [".htm", ".html"]
            ignore_urls = ["/^mailto:/", "https://skip.me"]
            ignore_status_codes = [429, 999]
            only_4xx = true
            checks = ["links", "opengraph"]

            [[swap_urls]]
            pattern = "/^https://example\\.com/"
            replacement = ""

            [http]
            max_concurrency = 4
            follow_redirects = false
            headers = { "Accept" = "text/html" }
        "#;
        let cfg: Config = toml::from_str(toml).unwrap();
        assert_eq!(cfg.assume_extension.as_deref(), Some(".htm"));
        assert_eq!(cfg.ignore_urls.len(), 2);
        assert!(cfg.ignore_urls[1].matches("https://skip.me"));
        assert_eq!(cfg.ignore_status_codes, vec![429, 999]);
        assert!(cfg.only_4xx);
        assert!(cfg.is_check_enabled(CheckKind::OpenGraph));
        assert!(!cfg.is_check_enabled(CheckKind::Images));
        assert_eq!(cfg.swap_urls.len(), 1);
        assert_eq!(cfg.http.max_concurrency, 4);
        assert!(!cfg.http.follow_redirects);
        // Unset keys keep their defaults.
        assert_eq!(cfg.http.max_redirects, 10);
        assert_eq!(cfg.directory_index_file, "index.html");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result: Result<Config, _> = toml::from_str("not_an_option = true");
        assert!(result.is_err());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let cfg = Config {
            assume_extension: Some("html".to_string()),
            ..Config::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidExtension(_))));

        let mut cfg = Config::default();
        cfg.http.max_concurrency = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroConcurrency)));

        let mut cfg = Config::default();
        cfg.http
            .headers
            .insert("Bad Header".to_string(), "x".to_string());
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidHeader(_))));

        let cfg = Config {
            root_dir: Some(PathBuf::from("/definitely/not/here")),
            ..Config::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::RootDirNotDirectory(_))
        ));
    }

    #[test]
    fn validate_normalizes_empty_assume_extension() {
        let cfg = Config {
            assume_extension: Some(String::new()),
            ..Config::default()
        };
        let cfg = cfg.validate().unwrap();
        assert!(cfg.assume_extension.is_none());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("linkproof.toml");
        fs::write(&path, "only_4xx = true\n").unwrap();
        let cfg = Config::load(&path).unwrap();
        assert!(cfg.only_4xx);

        let missing = Config::load(&dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }
}
