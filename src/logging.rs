// 📝 Logging - tracing subscriber for the binaries
//
// RUST_LOG wins over the configured filter. Logs go to stderr so command
// output on stdout stays clean.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Filter from RUST_LOG, else `fallback`, else "info"
pub fn env_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber; fails if one is already installed
pub fn init(fallback: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(fallback))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow!("Failed to install tracing subscriber: {}", error))
}
