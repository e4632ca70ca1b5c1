//! Merging sources into typed settings.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::settings::Settings;
use crate::sources::ConfigSource;
use crate::SettingsError;

/// Layered settings builder
///
/// Sources are applied from lowest to highest priority; sources with equal
/// priority apply in the order they were added. Objects merge key by key,
/// any other value replaces what lower layers set.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use strand_conf::SettingsBuilder;
/// use strand_conf::sources::DefaultSource;
///
/// let settings = SettingsBuilder::new()
///     .add_source(DefaultSource::new().with_value("pipeline", json!({ "name": "api" })))
///     .build()
///     .unwrap();
///
/// assert_eq!(settings.pipeline.name, "api");
/// assert_eq!(settings.logging.level, "info");
/// ```
#[derive(Default)]
pub struct SettingsBuilder {
	sources: Vec<Box<dyn ConfigSource>>,
}

impl SettingsBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Add a source
	pub fn add_source(mut self, source: impl ConfigSource + 'static) -> Self {
		self.sources.push(Box::new(source));
		self
	}

	/// Add an already boxed source, such as one from
	/// [`auto_source`](crate::sources::auto_source)
	pub fn add_boxed_source(mut self, source: Box<dyn ConfigSource>) -> Self {
		self.sources.push(source);
		self
	}

	/// Merge every source into one JSON tree
	///
	/// # Errors
	///
	/// Returns [`SettingsError::Source`] when a source fails to load.
	pub fn merged(&self) -> Result<Value, SettingsError> {
		let mut ordered: Vec<&dyn ConfigSource> = self.sources.iter().map(|s| s.as_ref()).collect();
		ordered.sort_by_key(|source| source.priority());

		let mut merged = Value::Object(Map::new());
		for source in ordered {
			let layer: IndexMap<String, Value> = source.load()?;
			tracing::debug!(
				source = %source.description(),
				priority = source.priority(),
				keys = layer.len(),
				"settings source loaded"
			);
			merge(&mut merged, Value::Object(layer.into_iter().collect()));
		}
		Ok(merged)
	}

	/// Merge, deserialize and validate
	///
	/// # Errors
	///
	/// Returns [`SettingsError`] when a source fails, the merged tree does
	/// not fit [`Settings`], or validation rejects it.
	pub fn build(self) -> Result<Settings, SettingsError> {
		let merged = self.merged()?;
		let settings: Settings = serde_json::from_value(merged)?;
		settings.validate()?;
		Ok(settings)
	}
}

fn merge(base: &mut Value, overlay: Value) {
	match (base, overlay) {
		(Value::Object(base), Value::Object(overlay)) => {
			for (key, value) in overlay {
				match base.get_mut(&key) {
					Some(existing) => merge(existing, value),
					None => {
						base.insert(key, value);
					}
				}
			}
		}
		(base, overlay) => *base = overlay,
	}
}
