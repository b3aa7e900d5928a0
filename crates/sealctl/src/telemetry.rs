//! Telemetry initialisation for `sealctl`.
//!
//! Logs go to stderr; stdout carries record lines and tokens only.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Initialise the tracing subscriber.
///
/// `RUST_LOG` takes precedence over `log_level`. `format` is `"json"` or
/// `"pretty"`.
///
/// # Errors
///
/// Returns an error if the subscriber has already been set.
pub fn init(log_level: &str, format: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = match format {
        "pretty" => builder.pretty().try_init(),
        _ => builder.json().try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("failed to initialise sealctl tracing subscriber: {e}"))
}
