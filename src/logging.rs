//! Diagnostic output for the `sift` binary.
//!
//! The library only emits `tracing` events; installing a subscriber is left to
//! the embedding application.

use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

/// Environment variable consulted when no explicit filter is given.
pub const LOG_ENV: &str = "SIFT_LOG";

const DEFAULT_FILTER: &str = "warn";

/// Install a stderr subscriber. `filter` takes precedence over [`LOG_ENV`].
pub fn initialize(filter: Option<&str>) -> Result<()> {
	let filter = match filter {
		Some(directives) => EnvFilter::try_new(directives)?,
		None => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
	};

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_target(false)
		.try_init()
		.map_err(|err| anyhow!("failed to install log subscriber: {err}"))
}
