//! Per-pipeline access point for shared services.

use std::fmt;
use std::sync::Arc;
use strand_conf::PipelineSettings;

use crate::services::{BroadcastEventBus, EventBus, FileSystem, LocalFileSystem, Security};

/// Read-only description of the owning pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineInfo {
	/// Name used in log records
	pub name: String,
	/// Whether server-side error details may reach clients
	pub debug: bool,
}

impl Default for PipelineInfo {
	fn default() -> Self {
		Self {
			name: "strand".to_string(),
			debug: false,
		}
	}
}

/// Services shared by every unit bound into one pipeline
///
/// The context is created once when a pipeline is assembled and handed to
/// each unit behind an `Arc`. Units read from it; nothing reachable through
/// it alters the pipeline's own configuration.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use strand_pipeline::PipelineContext;
/// use strand_pipeline::services::BroadcastEventBus;
///
/// let bus = Arc::new(BroadcastEventBus::new(16));
/// let context = PipelineContext::builder()
///     .name("api")
///     .event_bus(bus)
///     .build();
///
/// assert_eq!(context.info().name, "api");
/// assert!(context.security().is_none());
/// ```
pub struct PipelineContext {
	info: PipelineInfo,
	event_bus: Arc<dyn EventBus>,
	file_system: Arc<dyn FileSystem>,
	security: Option<Arc<dyn Security>>,
}

impl PipelineContext {
	/// Start building a context
	pub fn builder() -> PipelineContextBuilder {
		PipelineContextBuilder::default()
	}

	/// Messaging facility
	pub fn event_bus(&self) -> &dyn EventBus {
		self.event_bus.as_ref()
	}

	/// File access facility
	pub fn file_system(&self) -> &dyn FileSystem {
		self.file_system.as_ref()
	}

	/// Signing facility, when one was configured
	pub fn security(&self) -> Option<&dyn Security> {
		self.security.as_deref()
	}

	/// Shared handle to the file system, for work moved off the walk
	pub fn file_system_handle(&self) -> Arc<dyn FileSystem> {
		Arc::clone(&self.file_system)
	}

	/// Description of the owning pipeline
	pub fn info(&self) -> &PipelineInfo {
		&self.info
	}
}

impl Default for PipelineContext {
	fn default() -> Self {
		Self::builder().build()
	}
}

impl fmt::Debug for PipelineContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PipelineContext")
			.field("info", &self.info)
			.field("has_security", &self.security.is_some())
			.finish_non_exhaustive()
	}
}

/// Builder for [`PipelineContext`]
#[derive(Default)]
pub struct PipelineContextBuilder {
	info: PipelineInfo,
	event_bus: Option<Arc<dyn EventBus>>,
	file_system: Option<Arc<dyn FileSystem>>,
	security: Option<Arc<dyn Security>>,
}

impl PipelineContextBuilder {
	/// Pipeline name
	pub fn name(mut self, name: impl Into<String>) -> Self {
		self.info.name = name.into();
		self
	}

	/// Expose server-side error details
	pub fn debug(mut self, debug: bool) -> Self {
		self.info.debug = debug;
		self
	}

	/// Apply the `[pipeline]` settings section
	pub fn settings(mut self, settings: &PipelineSettings) -> Self {
		self.info.name = settings.name.clone();
		self.info.debug = settings.debug;
		self
	}

	/// Messaging facility (defaults to a [`BroadcastEventBus`])
	pub fn event_bus(mut self, bus: Arc<dyn EventBus>) -> Self {
		self.event_bus = Some(bus);
		self
	}

	/// File access facility (defaults to [`LocalFileSystem`])
	pub fn file_system(mut self, file_system: Arc<dyn FileSystem>) -> Self {
		self.file_system = Some(file_system);
		self
	}

	/// Signing facility
	pub fn security(mut self, security: Arc<dyn Security>) -> Self {
		self.security = Some(security);
		self
	}

	/// Finish the context
	pub fn build(self) -> PipelineContext {
		PipelineContext {
			info: self.info,
			event_bus: self
				.event_bus
				.unwrap_or_else(|| Arc::new(BroadcastEventBus::default())),
			file_system: self
				.file_system
				.unwrap_or_else(|| Arc::new(LocalFileSystem::new())),
			security: self.security,
		}
	}
}
