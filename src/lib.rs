//! # Strand
//!
//! A composable middleware pipeline for HTTP request processing.
//!
//! A pipeline is an ordered chain of handler units, each bound to a mount
//! path. A request walks the chain once: every matching unit either passes
//! it on, answers it, or fails it into the error phase, where only error
//! handlers run. Unanswered requests end as `404 Not Found`; unhandled
//! failures end with the failure's own status.
//!
//! ## Feature Flags
//!
//! - `middleware` (default) - built-in units: access logging, basic auth,
//!   error rendering, timeouts, body limits, method override, virtual hosts
//!   and static files
//! - `conf` (default) - layered settings and `tracing` subscriber setup
//!
//! ## Quick Example
//!
//! ```rust
//! use strand::prelude::*;
//! use strand::middleware::{BasicAuth, ErrorHandler, Logger, StaticCredentials};
//!
//! # tokio_test::block_on(async {
//! let pipeline = Pipeline::builder(PipelineContext::default())
//!     .mount("/", Logger::new())
//!     .mount("/secure", BasicAuth::new(StaticCredentials::new().with_user("admin", "s3cret")))
//!     .mount("/", ErrorHandler::new())
//!     .build()
//!     .unwrap();
//!
//! let request = Request::builder().uri("/secure/data").build().unwrap();
//! let response = pipeline.dispatch(request).await;
//! assert_eq!(response.status.as_u16(), 401);
//! assert!(response.header("www-authenticate").is_some());
//! # });
//! ```

pub use strand_http as http;
pub use strand_pipeline as pipeline;

#[cfg(feature = "conf")]
pub use strand_conf as conf;

#[cfg(feature = "middleware")]
pub use strand_middleware as middleware;

#[cfg(feature = "conf")]
pub mod logging;

pub use strand_http::{Extensions, Request, RequestBuilder, Response};
pub use strand_pipeline::{
	Cause, Continuation, Flow, HandlerUnit, MountPath, Next, Pipeline, PipelineBuilder,
	PipelineContext, RouteTable, Router, Verb, endpoint,
};

/// Commonly used types
pub mod prelude {
	pub use strand_http::{Request, Response};
	pub use strand_pipeline::{
		Cause, Flow, HandlerResult, HandlerUnit, Next, Pipeline, PipelineContext, RouteTable,
		Router, endpoint,
	};

	#[cfg(feature = "conf")]
	pub use strand_conf::{Settings, SettingsBuilder};
}
