//! Logging setup for the provider binary.
//!
//! All logs go to **stderr**; stdout is reserved for the handshake line the
//! host reads when it spawns the provider.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Controls log levels and overrides the default level
//!   (e.g. `info`, `hemmer_provider_ucmdb=debug`).
//!
//! ```bash
//! # Show REST calls and query responses
//! RUST_LOG=hemmer_provider_ucmdb=debug ./hemmer-provider-ucmdb
//! ```

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn subscriber(default_level: &str) -> impl Into<tracing::Dispatch> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false),
    )
}

/// Initialize logging, using `default_level` when `RUST_LOG` is not set.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging(default_level: &str) {
    subscriber(default_level).init();
}

/// Try to initialize logging, returning false if a subscriber was already set.
pub fn try_init_logging(default_level: &str) -> bool {
    subscriber(default_level).try_init().is_ok()
}

#[cfg(test)]
mod tests {
    // The global subscriber can only be installed once per process, so only
    // the idempotent entry point is exercised here.

    use super::*;

    #[test]
    fn test_env_filter_parsing() {
        assert!(EnvFilter::try_new("info").is_ok());
        assert!(EnvFilter::try_new("hemmer_provider_ucmdb=debug").is_ok());
        assert!(EnvFilter::try_new("warn,hemmer_provider_ucmdb=debug").is_ok());
    }

    #[test]
    fn test_try_init_is_idempotent() {
        let _ = try_init_logging("debug");
        assert!(!try_init_logging("debug"));
    }
}
