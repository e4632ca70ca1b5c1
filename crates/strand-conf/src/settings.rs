//! Typed settings sections.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::SettingsError;

/// Log levels accepted by `[logging] level`
pub const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// Complete settings tree
///
/// Every section falls back to its defaults when absent.
///
/// # Examples
///
/// ```
/// use strand_conf::Settings;
///
/// let settings = Settings::default();
/// assert_eq!(settings.pipeline.name, "strand");
/// assert!(!settings.pipeline.debug);
/// assert_eq!(settings.logging.level, "info");
/// assert!(settings.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
	pub pipeline: PipelineSettings,
	pub logging: LoggingSettings,
	pub limits: LimitSettings,
	pub static_files: StaticFilesSettings,
}

impl Settings {
	/// Check cross-field constraints serde cannot express
	///
	/// # Errors
	///
	/// Returns [`SettingsError::Invalid`] naming the first offending key.
	pub fn validate(&self) -> Result<(), SettingsError> {
		if self.pipeline.name.trim().is_empty() {
			return Err(SettingsError::Invalid(
				"pipeline.name must not be empty".to_string(),
			));
		}
		if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
			return Err(SettingsError::Invalid(format!(
				"logging.level `{}` is not one of {}",
				self.logging.level,
				LOG_LEVELS.join(", ")
			)));
		}
		if self.limits.request_timeout_ms == 0 {
			return Err(SettingsError::Invalid(
				"limits.request_timeout_ms must be positive".to_string(),
			));
		}
		if self.limits.max_body_bytes == 0 {
			return Err(SettingsError::Invalid(
				"limits.max_body_bytes must be positive".to_string(),
			));
		}
		if self.static_files.index.is_empty() || self.static_files.index.contains('/') {
			return Err(SettingsError::Invalid(
				"static_files.index must be a plain file name".to_string(),
			));
		}
		Ok(())
	}
}

/// `[pipeline]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
	/// Name used in log records
	pub name: String,
	/// Expose server-side error details in responses
	pub debug: bool,
	/// Publish lifecycle events to the event bus
	pub emit_events: bool,
}

impl Default for PipelineSettings {
	fn default() -> Self {
		Self {
			name: "strand".to_string(),
			debug: false,
			emit_events: false,
		}
	}
}

/// Output layout of log records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
	#[default]
	Full,
	Compact,
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
	/// Default level; `RUST_LOG` directives take precedence
	pub level: String,
	pub format: LogFormat,
	/// Colored output
	pub ansi: bool,
}

impl Default for LoggingSettings {
	fn default() -> Self {
		Self {
			level: "info".to_string(),
			format: LogFormat::Full,
			ansi: true,
		}
	}
}

/// `[limits]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitSettings {
	/// Deadline applied by the timeout unit
	pub request_timeout_ms: u64,
	/// Largest body accepted by the limit unit
	pub max_body_bytes: u64,
}

impl Default for LimitSettings {
	fn default() -> Self {
		Self {
			request_timeout_ms: 5_000,
			max_body_bytes: 1024 * 1024,
		}
	}
}

/// `[static_files]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticFilesSettings {
	/// Directory files are served from
	pub root: PathBuf,
	/// File served for directory requests
	pub index: String,
	/// `Cache-Control: max-age` in seconds; zero omits the header
	pub max_age: u64,
}

impl Default for StaticFilesSettings {
	fn default() -> Self {
		Self {
			root: PathBuf::from("public"),
			index: "index.html".to_string(),
			max_age: 0,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_partial_section_keeps_defaults() {
		let settings: Settings = serde_json::from_value(serde_json::json!({
			"pipeline": { "debug": true },
			"logging": { "format": "compact" }
		}))
		.unwrap();

		assert_eq!(settings.pipeline.name, "strand");
		assert!(settings.pipeline.debug);
		assert_eq!(settings.logging.format, LogFormat::Compact);
		assert_eq!(settings.limits, LimitSettings::default());
	}

	#[rstest]
	#[case::empty_name(|s: &mut Settings| s.pipeline.name = " ".to_string(), "pipeline.name")]
	#[case::bad_level(|s: &mut Settings| s.logging.level = "loud".to_string(), "logging.level")]
	#[case::zero_timeout(|s: &mut Settings| s.limits.request_timeout_ms = 0, "limits.request_timeout_ms")]
	#[case::zero_body(|s: &mut Settings| s.limits.max_body_bytes = 0, "limits.max_body_bytes")]
	#[case::nested_index(|s: &mut Settings| s.static_files.index = "a/b.html".to_string(), "static_files.index")]
	fn test_validate_rejects(#[case] mutate: fn(&mut Settings), #[case] key: &str) {
		let mut settings = Settings::default();
		mutate(&mut settings);

		let error = settings.validate().unwrap_err();

		assert!(error.to_string().contains(key));
	}

	#[rstest]
	fn test_level_is_case_insensitive() {
		let mut settings = Settings::default();
		settings.logging.level = "WARN".to_string();

		assert!(settings.validate().is_ok());
	}
}
