//! Process-wide `tracing` subscriber setup
//!
//! ```rust,no_run
//! use strand::conf::LoggingSettings;
//!
//! strand::logging::init(&LoggingSettings::default()).expect("bad log filter");
//! ```

use strand_conf::{LogFormat, LoggingSettings};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Errors raised while installing the subscriber
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
	#[error("Invalid log filter {0:?}: {1}")]
	InvalidFilter(String, String),
}

/// Filter from `RUST_LOG`, falling back to the configured level
pub fn filter(settings: &LoggingSettings) -> Result<EnvFilter, LoggingError> {
	if let Ok(filter) = EnvFilter::try_from_default_env() {
		return Ok(filter);
	}
	EnvFilter::try_new(&settings.level)
		.map_err(|e| LoggingError::InvalidFilter(settings.level.clone(), e.to_string()))
}

/// Install a fmt subscriber for the whole process
///
/// Returns `false` when a global subscriber was already installed, in which
/// case the existing one is kept.
pub fn init(settings: &LoggingSettings) -> Result<bool, LoggingError> {
	let filter = filter(settings)?;
	let registry = tracing_subscriber::registry().with(filter);
	let installed = match settings.format {
		LogFormat::Compact => registry
			.with(fmt::layer().compact().with_ansi(settings.ansi))
			.try_init(),
		LogFormat::Full => registry.with(fmt::layer().with_ansi(settings.ansi)).try_init(),
	};
	let installed = installed.is_ok();
	if installed {
		tracing::debug!(level = %settings.level, format = ?settings.format, "log subscriber installed");
	}
	Ok(installed)
}
