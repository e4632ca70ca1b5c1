//! Chain executor.
//!
//! A [`Pipeline`] owns the bound stages in registration order and walks them
//! once per request. The walk starts in the normal phase. A unit that fails
//! its continuation moves the walk into the error phase, which restarts the
//! scan from the first stage and only considers error-handler units. In both
//! phases a stage is skipped when its mount does not match the request path.
//!
//! The walk always ends with a response: the first one a unit responds with,
//! a synthesized `404 Not Found` when the normal phase runs out, or the last
//! cause rendered as a response when the error phase runs out.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use strand_conf::PipelineSettings;
use strand_http::{Request, Response};
use tokio::time::Instant;
use tracing::Instrument;

use crate::cause::Cause;
use crate::context::{PipelineContext, PipelineContextBuilder};
use crate::exception::{Error, Result};
use crate::next::{Next, Signal, Ticket};
use crate::services::PipelineEvent;
use crate::unit::{BoundUnit, HandlerUnit, Stage};

/// Point in time after which the remaining stages of a walk are abandoned
///
/// Stored as a request extension. When a stage is still running once the
/// deadline passes, the executor drops it, clears the deadline and fails
/// the walk with [`Cause::timed_out`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(pub Instant);

/// Ordered chain of bound units
///
/// # Examples
///
/// ```
/// use strand_pipeline::{Pipeline, PipelineContext, endpoint};
/// use strand_http::{Request, Response};
/// use hyper::StatusCode;
///
/// # tokio_test::block_on(async {
/// let pipeline = Pipeline::builder(PipelineContext::default())
///     .mount("/hello", endpoint(|_: &Request| Ok(Response::ok().with_body("hi"))))
///     .build()
///     .unwrap();
///
/// let request = Request::builder().uri("/hello").build().unwrap();
/// let response = pipeline.dispatch(request).await;
/// assert_eq!(response.body_text(), "hi");
///
/// let request = Request::builder().uri("/elsewhere").build().unwrap();
/// assert_eq!(pipeline.dispatch(request).await.status, StatusCode::NOT_FOUND);
/// # });
/// ```
pub struct Pipeline {
	context: Arc<PipelineContext>,
	stages: Vec<Stage>,
	emit_events: bool,
	walks: AtomicU64,
}

impl Pipeline {
	/// Start assembling a pipeline around `context`
	pub fn builder(context: PipelineContext) -> PipelineBuilder {
		PipelineBuilder::new(context)
	}

	/// Shared services of this pipeline
	pub fn context(&self) -> &Arc<PipelineContext> {
		&self.context
	}

	/// Number of bound units
	pub fn len(&self) -> usize {
		self.stages.len()
	}

	/// Whether no unit is bound
	pub fn is_empty(&self) -> bool {
		self.stages.is_empty()
	}

	/// Unit names in dispatch order
	pub fn unit_names(&self) -> Vec<&'static str> {
		self.stages.iter().map(|stage| stage.unit.name()).collect()
	}

	/// Walk the chain for one request and return its final response
	///
	/// Never fails: exhaustion and protocol violations are answered with
	/// synthesized responses. Response hooks registered on the request run
	/// against whichever response ends the walk.
	pub async fn dispatch(&self, mut request: Request) -> Response {
		let walk = self.walks.fetch_add(1, Ordering::Relaxed);
		let span = tracing::debug_span!(
			"walk",
			pipeline = %self.context.info().name,
			walk,
			method = %request.method,
			path = %request.path(),
		);
		async {
			let started = Instant::now();
			self.publish(|| PipelineEvent::RequestStarted {
				walk,
				method: request.method.to_string(),
				path: request.path().to_string(),
			});

			let mut response = self.walk(walk, &mut request).await;
			request.finalize(&mut response);

			let elapsed = started.elapsed();
			tracing::debug!(status = response.status.as_u16(), ?elapsed, "walk finished");
			self.publish(|| PipelineEvent::RequestFinished {
				walk,
				status: response.status.as_u16(),
				elapsed,
			});
			response
		}
		.instrument(span)
		.await
	}

	async fn walk(&self, walk: u64, request: &mut Request) -> Response {
		let mut cause: Option<Cause> = None;
		let mut cursor = 0;

		loop {
			let error_phase = cause.is_some();
			let Some(index) = self.next_eligible(cursor, error_phase, request.path()) else {
				return self.exhausted(cause);
			};
			cursor = index + 1;

			let stage = &self.stages[index];
			let ticket = Ticket { walk, stage: index };
			tracing::debug!(
				stage = index,
				unit = stage.unit.name(),
				mount = %stage.binding.mount(),
				error_phase,
				"dispatching"
			);

			let next = Next::new(ticket, stage.binding.clone(), cause.clone());
			let signal = match self.invoke(stage, request, next, ticket).await {
				Ok(signal) => signal,
				Err(violation) => {
					tracing::error!(
						stage = index,
						unit = stage.unit.name(),
						error = %violation,
						"unit broke the continuation contract"
					);
					return Cause::internal(violation.to_string())
						.to_response(self.context.info().debug);
				}
			};

			match signal {
				Signal::Respond(response) => return response,
				// In the error phase the current cause carries forward
				Signal::Proceed => {}
				Signal::Fail(failure) => {
					tracing::debug!(stage = index, cause = %failure, "walk diverted");
					self.publish(|| PipelineEvent::RequestFailed {
						walk,
						status: failure.status().as_u16(),
						message: failure.message().to_string(),
					});
					if !error_phase {
						cursor = 0;
					}
					cause = Some(failure);
				}
			}
		}
	}

	async fn invoke(
		&self,
		stage: &Stage,
		request: &mut Request,
		next: Next,
		ticket: Ticket,
	) -> Result<Signal> {
		let deadline = request.extensions().get::<Deadline>().map(|d| d.0);
		let Some(deadline) = deadline else {
			return stage.unit.handle(request, next).await.resolve(ticket).await;
		};

		if Instant::now() < deadline {
			let req = &mut *request;
			let unit = &stage.unit;
			let work = async move { unit.handle(req, next).await.resolve(ticket).await };
			if let Ok(result) = tokio::time::timeout_at(deadline, work).await {
				return result;
			}
		}

		tracing::warn!(stage = ticket.stage, unit = stage.unit.name(), "request deadline passed");
		request.extensions_mut().remove::<Deadline>();
		Ok(Signal::Fail(Cause::timed_out()))
	}

	fn next_eligible(&self, from: usize, error_phase: bool, path: &str) -> Option<usize> {
		self.stages
			.iter()
			.enumerate()
			.skip(from)
			.find(|(_, stage)| stage.is_eligible(error_phase, path))
			.map(|(index, _)| index)
	}

	fn exhausted(&self, cause: Option<Cause>) -> Response {
		match cause {
			None => {
				tracing::debug!("no unit answered the request");
				Response::not_found()
					.with_content_type("text/plain; charset=utf-8")
					.with_body("Not Found")
			}
			Some(cause) => {
				tracing::warn!(cause = %cause, "no error handler answered the request");
				cause.to_response(self.context.info().debug)
			}
		}
	}

	fn publish(&self, event: impl FnOnce() -> PipelineEvent) {
		if self.emit_events {
			self.context.event_bus().publish(event());
		}
	}
}

impl std::fmt::Debug for Pipeline {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Pipeline")
			.field("name", &self.context.info().name)
			.field("units", &self.unit_names())
			.field("emit_events", &self.emit_events)
			.finish()
	}
}

/// Builder for [`Pipeline`]
///
/// Registration order is dispatch order. Binding problems surface from
/// [`PipelineBuilder::build`], which aborts the whole assembly.
pub struct PipelineBuilder {
	context: Arc<PipelineContext>,
	units: Vec<(String, Arc<dyn HandlerUnit>)>,
	emit_events: bool,
}

impl PipelineBuilder {
	/// Builder around an explicit context
	pub fn new(context: PipelineContext) -> Self {
		Self {
			context: Arc::new(context),
			units: Vec::new(),
			emit_events: false,
		}
	}

	/// Builder configured from the `[pipeline]` settings section
	///
	/// # Examples
	///
	/// ```
	/// use strand_conf::PipelineSettings;
	/// use strand_pipeline::{PipelineBuilder, PipelineContext};
	///
	/// let settings = PipelineSettings {
	///     name: "api".to_string(),
	///     ..Default::default()
	/// };
	/// let pipeline = PipelineBuilder::from_settings(PipelineContext::builder(), &settings)
	///     .build()
	///     .unwrap();
	/// assert_eq!(pipeline.context().info().name, "api");
	/// ```
	pub fn from_settings(context: PipelineContextBuilder, settings: &PipelineSettings) -> Self {
		Self::new(context.settings(settings).build()).emit_events(settings.emit_events)
	}

	/// Register a unit matching every path
	pub fn unit(self, unit: impl HandlerUnit + 'static) -> Self {
		self.mount("", unit)
	}

	/// Register a unit under a mount path
	pub fn mount(self, mount: &str, unit: impl HandlerUnit + 'static) -> Self {
		self.mount_shared(mount, Arc::new(unit))
	}

	/// Register a unit the caller keeps a handle to
	pub fn mount_shared(mut self, mount: &str, unit: Arc<dyn HandlerUnit>) -> Self {
		self.units.push((mount.to_string(), unit));
		self
	}

	/// Publish lifecycle events to the context's event bus
	pub fn emit_events(mut self, enabled: bool) -> Self {
		self.emit_events = enabled;
		self
	}

	/// Bind every unit and finish the pipeline
	///
	/// # Errors
	///
	/// Returns [`Error::Configuration`] when a mount is invalid, a unit
	/// rejects its binding, or the same unit instance is registered twice.
	pub fn build(self) -> Result<Pipeline> {
		let mut stages: Vec<Stage> = Vec::with_capacity(self.units.len());
		for (mount, unit) in self.units {
			let unit_ptr = Arc::as_ptr(&unit) as *const ();
			if stages
				.iter()
				.any(|stage| Arc::as_ptr(&stage.unit) as *const () == unit_ptr)
			{
				return Err(Error::configuration(format!(
					"unit `{}` is registered twice; a unit binds into exactly one position",
					unit.name()
				)));
			}

			let mut bound = BoundUnit::new(unit);
			bound.init(Arc::clone(&self.context), &mount)?;
			stages.push(bound.into_stage()?);
		}

		tracing::debug!(
			pipeline = %self.context.info().name,
			units = stages.len(),
			"pipeline assembled"
		);
		Ok(Pipeline {
			context: self.context,
			stages,
			emit_events: self.emit_events,
			walks: AtomicU64::new(0),
		})
	}
}
