// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// Two subcommands share one set of options:
//   linkproof check _site/ extra.html --only-4xx
//   linkproof links https://example.com https://example.org --json
//
// The options are applied on top of the config file (--config), so a flag
// always wins over the file. Validation happens later, once, when the run
// is built.
//
// Rust concepts:
// - Derive macros: clap generates the parser from these structs
// - #[command(flatten)]: reuse one Args struct in several subcommands
// =============================================================================

use crate::config::{CheckKind, Config, Pattern, SwapRule};
use crate::error::ConfigError;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "linkproof",
    version,
    about = "Validate internal and external links in rendered HTML",
    long_about = "linkproof checks that every internal reference in your rendered HTML points at an \
                  existing file (and #fragment), and that every external reference answers with an \
                  acceptable HTTP status. It's meant for CI pipelines that build static sites."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check HTML files and directories of HTML files
    ///
    /// Example: linkproof check _site/
    Check {
        /// Files or directories to check
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[command(flatten)]
        options: RunOptions,
    },

    /// Check a list of external links, with no files involved
    ///
    /// Example: linkproof links https://example.com/a https://example.com/b
    Links {
        /// The links to check
        #[arg(required = true)]
        urls: Vec<String>,

        #[command(flatten)]
        options: RunOptions,
    },
}

impl Commands {
    pub fn options(&self) -> &RunOptions {
        match self {
            Commands::Check { options, .. } | Commands::Links { options, .. } => options,
        }
    }
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Default)]
pub struct RunOptions {
    /// TOML config file; flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output results in JSON format instead of text
    #[arg(long)]
    pub json: bool,

    /// More logging on stderr (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Directory that "/root/relative" links are resolved against
    #[arg(long)]
    pub root_dir: Option<PathBuf>,

    /// Extension tried on extensionless links; "" turns it off
    #[arg(long)]
    pub assume_extension: Option<String>,

    /// File used when a link points at a directory
    #[arg(long)]
    pub directory_index_file: Option<String>,

    /// Extensions of documents to check, e.g. ".html,.htm"
    #[arg(long, value_delimiter = ',')]
    pub extensions: Vec<String>,

    /// URL to skip; /regex/ or exact text (repeatable)
    #[arg(long = "ignore-url")]
    pub ignore_urls: Vec<String>,

    /// File to skip; /regex/ or exact path (repeatable)
    #[arg(long = "ignore-file")]
    pub ignore_files: Vec<String>,

    /// HTTP status codes to accept, e.g. "403,429" (0 = network errors)
    #[arg(long = "ignore-status-code", value_delimiter = ',')]
    pub ignore_status_codes: Vec<u16>,

    /// Only report external links answering 4xx
    #[arg(long = "only-4xx")]
    pub only_4xx: bool,

    /// Rewrite URLs before checking: PATTERN REPLACEMENT (repeatable)
    #[arg(long = "swap-url", num_args = 2, value_names = ["PATTERN", "REPLACEMENT"])]
    pub swap_urls: Vec<String>,

    /// Don't look for #fragments in external pages
    #[arg(long)]
    pub no_external_hash: bool,

    /// Don't look for #fragments in local files
    #[arg(long)]
    pub no_internal_hash: bool,

    /// Skip all external links
    #[arg(long)]
    pub disable_external: bool,

    /// Report http:// links
    #[arg(long)]
    pub enforce_https: bool,

    /// Report links to bare "#"
    #[arg(long)]
    pub no_hash_href: bool,

    /// Treat redirects as failures (also flags unslashed directory links)
    #[arg(long)]
    pub no_follow_redirects: bool,

    /// Accept invalid TLS certificates
    #[arg(long)]
    pub insecure: bool,

    /// Per-request timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Maximum number of requests in flight
    #[arg(long)]
    pub max_concurrency: Option<usize>,

    /// Extra request header, "Name: value" (repeatable)
    #[arg(long = "header")]
    pub headers: Vec<String>,

    #[arg(long)]
    pub user_agent: Option<String>,

    /// Element checks to run, e.g. "links,images,opengraph"
    #[arg(long = "check", value_enum, value_delimiter = ',')]
    pub checks: Vec<CheckKind>,
}

impl RunOptions {
    /// The config file (or defaults) with these flags applied on top.
    pub fn load_config(&self) -> Result<Config, ConfigError> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        self.apply(&mut config)?;
        Ok(config)
    }

    fn apply(&self, config: &mut Config) -> Result<(), ConfigError> {
        if let Some(root) = &self.root_dir {
            config.root_dir = Some(root.clone());
        }
        if let Some(ext) = &self.assume_extension {
            config.assume_extension = Some(ext.clone());
        }
        if let Some(index) = &self.directory_index_file {
            config.directory_index_file = index.clone();
        }
        if !self.extensions.is_empty() {
            config.extensions = self.extensions.clone();
        }
        for text in &self.ignore_urls {
            config.ignore_urls.push(text.parse()?);
        }
        for text in &self.ignore_files {
            config.ignore_files.push(text.parse()?);
        }
        config
            .ignore_status_codes
            .extend(self.ignore_status_codes.iter().copied());
        for pair in self.swap_urls.chunks(2) {
            if let [pattern, replacement] = pair {
                config.swap_urls.push(SwapRule {
                    pattern: pattern.parse::<Pattern>()?,
                    replacement: replacement.clone(),
                });
            }
        }

        config.only_4xx |= self.only_4xx;
        config.disable_external |= self.disable_external;
        config.enforce_https |= self.enforce_https;
        if self.no_external_hash {
            config.check_external_hash = false;
        }
        if self.no_internal_hash {
            config.check_internal_hash = false;
        }
        if self.no_hash_href {
            config.allow_hash_href = false;
        }
        if !self.checks.is_empty() {
            config.checks = self.checks.clone();
        }

        let http = &mut config.http;
        if self.no_follow_redirects {
            http.follow_redirects = false;
        }
        if self.insecure {
            http.verify_tls = false;
        }
        if let Some(timeout) = self.timeout_ms {
            http.timeout_ms = timeout;
        }
        if let Some(max) = self.max_concurrency {
            http.max_concurrency = max;
        }
        if let Some(agent) = &self.user_agent {
            http.user_agent = agent.clone();
        }
        for header in &self.headers {
            let (name, value) = header
                .split_once(':')
                .ok_or_else(|| ConfigError::InvalidHeader(header.clone()))?;
            http.headers
                .insert(name.trim().to_string(), value.trim().to_string());
        }

        Ok(())
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. What does #[command(flatten)] do?
//    - It copies every field of RunOptions into the subcommand
//    - `check` and `links` accept the same flags without repeating them
//
// 2. Why are the flags Strings and not Patterns?
//    - Converting them in `apply` lets one error type (ConfigError) cover
//      both the config file and the command line
//
// 3. What is `|=` on a bool?
//    - `a |= b` means `a = a || b`
//    - A flag can turn a setting on, but never turns off what the file set
// -----------------------------------------------------------------------------
