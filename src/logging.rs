// src/logging.rs
// =============================================================================
// Logging setup.
//
// All progress messages go through `tracing` and are written to stderr, so
// stdout only ever carries the report (text or JSON).
//
// The level comes from RUST_LOG when it is set, otherwise from the number
// of -v flags.
// =============================================================================

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set, by `-v` count.
fn default_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn,linkproof=info",
        1 => "warn,linkproof=debug",
        _ => "info,linkproof=trace",
    }
}

/// Installs the global subscriber. `RUST_LOG` wins over `-v`.
///
/// Calling it twice is harmless: the second call is ignored.
pub fn init_logging(verbosity: u8) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_raises_crate_level() {
        assert_eq!(default_filter(0), "warn,linkproof=info");
        assert_eq!(default_filter(1), "warn,linkproof=debug");
        assert_eq!(default_filter(5), "info,linkproof=trace");
    }

    #[test]
    fn init_twice_does_not_panic() {
        init_logging(0);
        init_logging(2);
    }
}
