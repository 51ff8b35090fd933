// src/error.rs
// =============================================================================
// Error types for things that stop a run before (or while) it starts.
//
// Broken links are NOT errors here. A link that points nowhere is a normal
// result and is reported as a `Failure` (see checker/failure.rs). The errors
// below are for bad input from the caller: a config value that makes no
// sense, a path that does not exist, a document that cannot be read.
// =============================================================================

use std::path::PathBuf;
use thiserror::Error;

/// Problems found while loading or validating a `Config`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("extension '{0}' must start with a '.'")]
    InvalidExtension(String),

    #[error("invalid regular expression in pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("root_dir '{0}' is not a directory")]
    RootDirNotDirectory(PathBuf),

    #[error("directory_index_file must not be empty")]
    EmptyIndexFile,

    #[error("invalid HTTP header '{0}'")]
    InvalidHeader(String),

    #[error("max_concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{0} does not exist")]
    MissingSource(PathBuf),

    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not walk directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("could not build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
