// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Build the config (file, then flags) and start logging
// 3. Run the checks for the chosen subcommand
// 4. Print the report on stdout
// 5. Exit with proper code (0 = clean, 1 = broken links, 2 = error)
//
// Logs go to stderr, so `--json` output on stdout stays machine-readable.
// =============================================================================

mod checker;
mod cli;
mod config;
mod discover;
mod document;
mod error;
mod extract;
mod logging;
mod report;
mod runner;

use anyhow::{Context, Result};
use checker::PendingRequest;
use clap::Parser;
use cli::{Cli, Commands};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use runner::Runner;
use tracing::debug;

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Returns:
//   Ok(0) = no broken links
//   Ok(1) = broken links found
//   Err   = the run could not be completed (exit code 2)
async fn run() -> Result<i32> {
    let cli = Cli::parse();
    let options = cli.command.options();
    logging::init_logging(options.verbose);

    let config = options.load_config().context("invalid configuration")?;
    let json = options.json;

    let mut runner = Runner::new(config).context("could not start the run")?;
    if let Some(hook) = github_token_hook() {
        runner.add_before_request_hook(hook);
    }

    let mut outcome = match &cli.command {
        Commands::Check { paths, .. } => runner.check_paths(paths).await?,
        Commands::Links { urls, .. } => runner.check_links(urls).await,
    };
    report::sort_failures(&mut outcome.failures);

    if json {
        println!("{}", report::render_json(&outcome)?);
    } else {
        print!("{}", report::render_text(&outcome));
    }

    Ok(if outcome.has_failures() { 1 } else { 0 })
}

/// With GITHUB_TOKEN set, requests to github.com carry it, which lifts
/// the anonymous rate limit.
fn github_token_hook() -> Option<checker::BeforeRequestHook> {
    let token = std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty())?;
    let value = match HeaderValue::from_str(&format!("Bearer {token}")) {
        Ok(value) => value,
        Err(_) => {
            debug!("GITHUB_TOKEN is not a valid header value, ignoring it");
            return None;
        }
    };

    Some(Box::new(move |request: &mut PendingRequest| {
        if request.url.host().is_some_and(checker::is_github_host) {
            request.headers.insert(AUTHORIZATION, value.clone());
        }
    }))
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why does run() return a number instead of calling exit() itself?
//    - std::process::exit() skips destructors
//    - Returning lets everything (like the HTTP client) clean up first
//
// 2. What does {:#} do with an anyhow error?
//    - It prints the whole chain: "invalid configuration: ... : ..."
//
// 3. What is a before-request hook?
//    - A closure that sees every outgoing request and can change it
//    - Here it adds an Authorization header for GitHub only
// -----------------------------------------------------------------------------
