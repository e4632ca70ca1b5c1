//! Request timeout unit
//!
//! Installs a [`Deadline`] on the request. Stages that are still running when
//! it passes are abandoned and the walk fails with `503 Service Unavailable`.

use async_trait::async_trait;
use std::time::Duration;
use strand_conf::LimitSettings;
use strand_http::Request;
use strand_pipeline::{Deadline, Flow, HandlerUnit, Next};
use tokio::time::Instant;

/// Timeout configuration
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
	/// Time allowed for the rest of the walk
	pub duration: Duration,
}

impl TimeoutConfig {
	pub fn new(duration: Duration) -> Self {
		Self { duration }
	}

	/// Take the duration from the `[limits]` settings section
	pub fn from_settings(settings: &LimitSettings) -> Self {
		Self::new(Duration::from_millis(settings.request_timeout_ms))
	}
}

impl Default for TimeoutConfig {
	fn default() -> Self {
		Self::from_settings(&LimitSettings::default())
	}
}

/// Deadline-installing unit
///
/// An earlier deadline installed by another timeout unit is kept.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use async_trait::async_trait;
/// use hyper::StatusCode;
/// use strand_http::{Request, Response};
/// use strand_middleware::Timeout;
/// use strand_pipeline::{Flow, HandlerUnit, Next, Pipeline, PipelineContext};
///
/// struct Slow;
///
/// #[async_trait]
/// impl HandlerUnit for Slow {
///     async fn handle(&self, _request: &mut Request, next: Next) -> Flow {
///         tokio::time::sleep(Duration::from_secs(10)).await;
///         next.respond(Response::ok())
///     }
/// }
///
/// # tokio_test::block_on(async {
/// let pipeline = Pipeline::builder(PipelineContext::default())
///     .unit(Timeout::new(Duration::from_millis(20)))
///     .unit(Slow)
///     .build()
///     .unwrap();
///
/// let response = pipeline.dispatch(Request::builder().uri("/").build().unwrap()).await;
/// assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct Timeout {
	config: TimeoutConfig,
}

impl Timeout {
	pub fn new(duration: Duration) -> Self {
		Self::with_config(TimeoutConfig::new(duration))
	}

	pub fn with_config(config: TimeoutConfig) -> Self {
		Self { config }
	}
}

#[async_trait]
impl HandlerUnit for Timeout {
	fn name(&self) -> &'static str {
		"timeout"
	}

	async fn handle(&self, request: &mut Request, next: Next) -> Flow {
		let deadline = Instant::now() + self.config.duration;
		let earlier = request
			.extensions()
			.get::<Deadline>()
			.is_some_and(|existing| existing.0 <= deadline);
		if !earlier {
			request.extensions_mut().insert(Deadline(deadline));
		}
		next.proceed()
	}
}
