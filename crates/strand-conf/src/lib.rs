//! # Strand Conf
//!
//! Layered settings for Strand pipelines.
//!
//! Settings are assembled from [`sources`] merged by priority: defaults, then
//! TOML or JSON files, then environment variables. The merged tree is
//! deserialized into [`Settings`] and validated.
//!
//! ```rust,no_run
//! use strand_conf::SettingsBuilder;
//! use strand_conf::sources::{EnvSource, TomlFileSource};
//!
//! let settings = SettingsBuilder::new()
//!     .add_source(TomlFileSource::new("strand.toml"))
//!     .add_source(EnvSource::new().with_prefix("STRAND_"))
//!     .build()
//!     .expect("invalid settings");
//! println!("serving {}", settings.pipeline.name);
//! ```

pub mod builder;
pub mod settings;
pub mod sources;

pub use builder::SettingsBuilder;
pub use settings::{
	LimitSettings, LogFormat, LoggingSettings, PipelineSettings, Settings, StaticFilesSettings,
};
pub use sources::{ConfigSource, SourceError};

/// Errors raised while assembling settings
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
	#[error("Source error: {0}")]
	Source(#[from] SourceError),

	#[error("Deserialization error: {0}")]
	Deserialize(#[from] serde_json::Error),

	#[error("Invalid settings: {0}")]
	Invalid(String),
}
