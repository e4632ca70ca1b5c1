//! The contract every pipeline stage implements.
//!
//! ## HandlerUnit
//!
//! A unit receives the request and a [`Next`] token and finishes the stage
//! through that token:
//!
//! ```rust
//! use async_trait::async_trait;
//! use strand_http::{Request, Response};
//! use strand_pipeline::{Flow, HandlerUnit, Next};
//!
//! struct Hello;
//!
//! #[async_trait]
//! impl HandlerUnit for Hello {
//!     async fn handle(&self, request: &mut Request, next: Next) -> Flow {
//!         if request.path() == "/hello" {
//!             next.respond(Response::ok().with_body("Hello!"))
//!         } else {
//!             next.proceed()
//!         }
//!     }
//! }
//! ```
//!
//! ## Handler
//!
//! Terminal request handlers that never continue implement [`Handler`] and
//! are adapted into units with [`endpoint`]. Returning `Err(cause)` diverts
//! the walk into the error phase.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use strand_http::{Request, Response};

use crate::cause::Cause;
use crate::context::PipelineContext;
use crate::exception::{Error, Result};
use crate::mount::MountPath;
use crate::next::{Flow, Next};

/// Pipeline stage contract
///
/// Implementations are shared across concurrent walks and must not keep
/// per-request state in `self`; use request extensions instead.
#[async_trait]
pub trait HandlerUnit: Send + Sync {
	/// Name used in log records
	fn name(&self) -> &'static str {
		std::any::type_name::<Self>()
	}

	/// Whether the unit runs only after a cause diverted the walk
	fn is_error_handler(&self) -> bool {
		false
	}

	/// Called once when the unit is bound into a pipeline
	///
	/// # Errors
	///
	/// Returning an error aborts pipeline assembly.
	fn on_bind(&self, _binding: &Binding) -> Result<()> {
		Ok(())
	}

	/// Process the request and finish the stage through `next`
	async fn handle(&self, request: &mut Request, next: Next) -> Flow;
}

/// Blanket implementation for `Arc<T>` where T: HandlerUnit.
///
/// Allows one unit value to be shared between a route table, a virtual host
/// and direct registration.
#[async_trait]
impl<T: HandlerUnit + ?Sized> HandlerUnit for Arc<T> {
	fn name(&self) -> &'static str {
		(**self).name()
	}

	fn is_error_handler(&self) -> bool {
		(**self).is_error_handler()
	}

	fn on_bind(&self, binding: &Binding) -> Result<()> {
		(**self).on_bind(binding)
	}

	async fn handle(&self, request: &mut Request, next: Next) -> Flow {
		(**self).handle(request, next).await
	}
}

/// Shared context and mount scope a unit was bound with
#[derive(Clone)]
pub struct Binding {
	context: Arc<PipelineContext>,
	mount: MountPath,
}

impl Binding {
	pub(crate) fn new(context: Arc<PipelineContext>, mount: MountPath) -> Self {
		Self { context, mount }
	}

	/// Shared pipeline services
	pub fn context(&self) -> &Arc<PipelineContext> {
		&self.context
	}

	/// Mount scope
	pub fn mount(&self) -> &MountPath {
		&self.mount
	}
}

impl fmt::Debug for Binding {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Binding")
			.field("pipeline", &self.context.info().name)
			.field("mount", &self.mount)
			.finish()
	}
}

/// A unit together with its binding, immutable once bound
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use strand_pipeline::{BoundUnit, PipelineContext, endpoint};
/// use strand_http::{Request, Response};
///
/// let unit = Arc::new(endpoint(|_: &Request| Ok(Response::ok())));
/// let context = Arc::new(PipelineContext::default());
///
/// let mut bound = BoundUnit::new(unit);
/// bound.init(context.clone(), "/api").unwrap();
/// assert_eq!(bound.binding().unwrap().mount().as_string(), "/api");
///
/// // Binding twice is rejected
/// assert!(bound.init(context, "/other").is_err());
/// ```
pub struct BoundUnit {
	unit: Arc<dyn HandlerUnit>,
	binding: Option<Binding>,
}

impl BoundUnit {
	/// Wrap an unbound unit
	pub fn new(unit: Arc<dyn HandlerUnit>) -> Self {
		Self {
			unit,
			binding: None,
		}
	}

	/// Bind the shared context and the mount scope
	///
	/// The empty mount matches every path.
	///
	/// # Errors
	///
	/// Returns [`Error::Configuration`] when the mount is invalid, when the
	/// unit is already bound, or when the unit rejects the binding.
	pub fn init(&mut self, context: Arc<PipelineContext>, mount: &str) -> Result<&mut Self> {
		if self.binding.is_some() {
			return Err(Error::configuration(format!(
				"unit `{}` is already bound",
				self.unit.name()
			)));
		}
		let mount = MountPath::parse(mount)?;
		let binding = Binding::new(context, mount);
		self.unit.on_bind(&binding)?;
		tracing::debug!(unit = self.unit.name(), mount = %binding.mount(), "unit bound");
		self.binding = Some(binding);
		Ok(self)
	}

	/// Whether `init` succeeded
	pub fn is_bound(&self) -> bool {
		self.binding.is_some()
	}

	/// Binding established by `init`
	pub fn binding(&self) -> Option<&Binding> {
		self.binding.as_ref()
	}

	/// The wrapped unit
	pub fn unit(&self) -> &Arc<dyn HandlerUnit> {
		&self.unit
	}

	pub(crate) fn into_stage(self) -> Result<Stage> {
		let binding = self.binding.ok_or_else(|| {
			Error::configuration(format!("unit `{}` was never bound", self.unit.name()))
		})?;
		Ok(Stage {
			unit: self.unit,
			binding,
		})
	}
}

impl fmt::Debug for BoundUnit {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("BoundUnit")
			.field("unit", &self.unit.name())
			.field("binding", &self.binding)
			.finish()
	}
}

/// Bound unit as stored by the executor
pub(crate) struct Stage {
	pub(crate) unit: Arc<dyn HandlerUnit>,
	pub(crate) binding: Binding,
}

impl Stage {
	pub(crate) fn is_eligible(&self, error_phase: bool, path: &str) -> bool {
		self.unit.is_error_handler() == error_phase && self.binding.mount().matches(path)
	}
}

/// Outcome of a terminal [`Handler`]
pub type HandlerResult = std::result::Result<Response, Cause>;

/// Terminal request handler
#[async_trait]
pub trait Handler: Send + Sync {
	/// Produce a response, or a cause that diverts the walk
	async fn handle(&self, request: &Request) -> HandlerResult;
}

#[async_trait]
impl<F> Handler for F
where
	F: Fn(&Request) -> HandlerResult + Send + Sync,
{
	async fn handle(&self, request: &Request) -> HandlerResult {
		(self)(request)
	}
}

/// Unit adapter for a [`Handler`]
pub struct Endpoint<H> {
	handler: H,
}

impl<H: Handler> Endpoint<H> {
	/// Wrap a handler
	pub fn new(handler: H) -> Self {
		Self { handler }
	}
}

/// Adapt a closure into a unit that always finishes the walk or fails it
///
/// Types implementing [`Handler`] directly go through [`Endpoint::new`].
///
/// # Examples
///
/// ```
/// use strand_pipeline::{Cause, endpoint};
/// use strand_http::{Request, Response};
/// use hyper::StatusCode;
///
/// let unit = endpoint(|request: &Request| {
///     if request.header("x-token").is_some() {
///         Ok(Response::ok())
///     } else {
///         Err(Cause::from(StatusCode::FORBIDDEN))
///     }
/// });
/// # let _ = unit;
/// ```
pub fn endpoint<F>(handler: F) -> Endpoint<F>
where
	F: Fn(&Request) -> HandlerResult + Send + Sync,
{
	Endpoint::new(handler)
}

#[async_trait]
impl<H: Handler> HandlerUnit for Endpoint<H> {
	fn name(&self) -> &'static str {
		"endpoint"
	}

	async fn handle(&self, request: &mut Request, next: Next) -> Flow {
		match self.handler.handle(request).await {
			Ok(response) => next.respond(response),
			Err(cause) => next.fail(cause),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	struct Rejecting;

	#[async_trait]
	impl HandlerUnit for Rejecting {
		fn on_bind(&self, binding: &Binding) -> Result<()> {
			if binding.mount().is_root() {
				return Err(Error::configuration("must not be mounted at the root"));
			}
			Ok(())
		}

		async fn handle(&self, _request: &mut Request, next: Next) -> Flow {
			next.proceed()
		}
	}

	fn context() -> Arc<PipelineContext> {
		Arc::new(PipelineContext::default())
	}

	#[rstest]
	fn test_empty_mount_binds_root() {
		let mut bound = BoundUnit::new(Arc::new(endpoint(|_: &Request| Ok(Response::ok()))));

		bound.init(context(), "").unwrap();

		assert!(bound.binding().unwrap().mount().is_root());
	}

	#[rstest]
	#[case("relative")]
	#[case("/a/../b")]
	fn test_invalid_mount_is_configuration_error(#[case] mount: &str) {
		let mut bound = BoundUnit::new(Arc::new(endpoint(|_: &Request| Ok(Response::ok()))));

		let result = bound.init(context(), mount);

		assert!(matches!(result, Err(Error::Configuration(_))));
		assert!(!bound.is_bound());
	}

	#[rstest]
	fn test_double_init_fails_fast() {
		let mut bound = BoundUnit::new(Arc::new(Rejecting));
		bound.init(context(), "/a").unwrap();

		let result = bound.init(context(), "/b");

		assert!(matches!(result, Err(Error::Configuration(message)) if message.contains("already bound")));
		assert_eq!(bound.binding().unwrap().mount().as_string(), "/a");
	}

	#[rstest]
	fn test_unit_can_reject_binding() {
		let mut bound = BoundUnit::new(Arc::new(Rejecting));

		assert!(bound.init(context(), "/").is_err());
		assert!(!bound.is_bound());
	}

	#[rstest]
	fn test_unbound_unit_cannot_become_stage() {
		let bound = BoundUnit::new(Arc::new(Rejecting));

		assert!(matches!(bound.into_stage(), Err(Error::Configuration(_))));
	}

	#[rstest]
	fn test_stage_eligibility_checks_kind_and_mount() {
		let mut bound = BoundUnit::new(Arc::new(Rejecting));
		bound.init(context(), "/api").unwrap();
		let stage = bound.into_stage().unwrap();

		assert!(stage.is_eligible(false, "/api/users"));
		assert!(!stage.is_eligible(true, "/api/users"));
		assert!(!stage.is_eligible(false, "/apiusers"));
	}
}
