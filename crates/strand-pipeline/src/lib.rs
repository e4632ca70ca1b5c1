//! # Strand Pipeline
//!
//! Middleware chain dispatch: units bound to mount paths, a consuming
//! continuation that either proceeds, fails into the error phase or
//! responds, and an executor that walks the chain once per request.
//!
//! ## Overview
//!
//! - [`HandlerUnit`]: the stage contract, normal or error handler
//! - [`Next`] / [`Flow`]: single-use continuation and the value a unit returns
//! - [`Pipeline`]: ordered chain plus the walk state machine
//! - [`PipelineContext`]: shared event bus, file system and security services
//! - [`RouteTable`] / [`Router`]: explicit verb binding
//!
//! ## Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use hyper::StatusCode;
//! use strand_http::{Request, Response};
//! use strand_pipeline::{Cause, Flow, HandlerUnit, Next, Pipeline, PipelineContext};
//!
//! struct RequireToken;
//!
//! #[async_trait]
//! impl HandlerUnit for RequireToken {
//!     async fn handle(&self, request: &mut Request, next: Next) -> Flow {
//!         match request.header("x-token") {
//!             Some(_) => next.proceed(),
//!             None => next.fail(Cause::new(StatusCode::UNAUTHORIZED, "unauthorized")),
//!         }
//!     }
//! }
//!
//! struct RenderError;
//!
//! #[async_trait]
//! impl HandlerUnit for RenderError {
//!     fn is_error_handler(&self) -> bool {
//!         true
//!     }
//!
//!     async fn handle(&self, _request: &mut Request, next: Next) -> Flow {
//!         let status = next.cause().map(|c| c.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
//!         next.respond(Response::new(status).with_body("denied"))
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let pipeline = Pipeline::builder(PipelineContext::default())
//!     .mount("/secure", RequireToken)
//!     .unit(RenderError)
//!     .build()
//!     .unwrap();
//!
//! let request = Request::builder().uri("/secure/data").build().unwrap();
//! let response = pipeline.dispatch(request).await;
//! assert_eq!(response.status, StatusCode::UNAUTHORIZED);
//! # });
//! ```

pub mod cause;
pub mod context;
pub mod exception;
pub mod executor;
pub mod mount;
pub mod next;
pub mod routing;
pub mod services;
pub mod unit;

pub use cause::Cause;
pub use context::{PipelineContext, PipelineContextBuilder, PipelineInfo};
pub use exception::{Error, Result};
pub use executor::{Deadline, Pipeline, PipelineBuilder};
pub use mount::MountPath;
pub use next::{Continuation, Flow, Next, Signal};
pub use routing::{RouteTable, Router, Verb};
pub use unit::{Binding, BoundUnit, Endpoint, Handler, HandlerResult, HandlerUnit, endpoint};
