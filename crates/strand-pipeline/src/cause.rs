//! Failure values carried from a diverting continuation into the error phase.

use hyper::StatusCode;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use strand_http::Response;

/// Why a walk left the normal phase
///
/// A cause travels only within the walk that raised it. Error-phase units
/// read it from [`Next::cause`](crate::Next::cause); when no error unit
/// answers, the pipeline renders it with [`Cause::to_response`].
#[derive(Clone)]
pub struct Cause {
	status: StatusCode,
	message: String,
	source: Option<Arc<dyn StdError + Send + Sync>>,
	headers: Vec<(String, String)>,
}

impl Cause {
	/// Create a cause with an explicit status and message
	///
	/// # Examples
	///
	/// ```
	/// use strand_pipeline::Cause;
	/// use hyper::StatusCode;
	///
	/// let cause = Cause::new(StatusCode::UNAUTHORIZED, "unauthorized");
	/// assert_eq!(cause.status(), StatusCode::UNAUTHORIZED);
	/// assert_eq!(cause.message(), "unauthorized");
	/// ```
	pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
		Self {
			status,
			message: message.into(),
			source: None,
			headers: Vec::new(),
		}
	}

	/// Cause carrying only a status; the message is the canonical reason
	///
	/// # Examples
	///
	/// ```
	/// use strand_pipeline::Cause;
	/// use hyper::StatusCode;
	///
	/// let cause = Cause::from_status(StatusCode::NOT_FOUND);
	/// assert_eq!(cause.message(), "Not Found");
	/// ```
	pub fn from_status(status: StatusCode) -> Self {
		Self::new(status, status.canonical_reason().unwrap_or("Unknown Status"))
	}

	/// 500 cause with a message
	pub fn internal(message: impl Into<String>) -> Self {
		Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
	}

	/// 500 cause wrapping an error value
	pub fn from_error<E>(error: E) -> Self
	where
		E: StdError + Send + Sync + 'static,
	{
		Self {
			status: StatusCode::INTERNAL_SERVER_ERROR,
			message: error.to_string(),
			source: Some(Arc::new(error)),
			headers: Vec::new(),
		}
	}

	/// Cause raised when a request outlives its deadline
	pub fn timed_out() -> Self {
		Self::new(StatusCode::SERVICE_UNAVAILABLE, "Response timeout")
	}

	/// Replace the status code
	pub fn with_status(mut self, status: StatusCode) -> Self {
		self.status = status;
		self
	}

	/// Attach a header that must reach the final response
	///
	/// # Examples
	///
	/// ```
	/// use strand_pipeline::Cause;
	/// use hyper::StatusCode;
	///
	/// let cause = Cause::new(StatusCode::UNAUTHORIZED, "unauthorized")
	///     .with_header("www-authenticate", "Basic realm=\"api\"");
	/// let response = cause.to_response(false);
	/// assert_eq!(response.header("www-authenticate"), Some("Basic realm=\"api\""));
	/// ```
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));
		self
	}

	/// Status code to answer with
	pub fn status(&self) -> StatusCode {
		self.status
	}

	/// Human readable description
	pub fn message(&self) -> &str {
		&self.message
	}

	/// Underlying error, when the cause wraps one
	pub fn source_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
		self.source.as_deref()
	}

	/// Headers to copy onto the final response
	pub fn headers(&self) -> &[(String, String)] {
		&self.headers
	}

	/// Whether the status is a 5xx
	pub fn is_server_error(&self) -> bool {
		self.status.is_server_error()
	}

	/// Message safe to show to clients
	///
	/// Server-side failures hide their detail unless `expose` is set.
	pub fn public_message(&self, expose: bool) -> &str {
		if self.is_server_error() && !expose {
			self.status.canonical_reason().unwrap_or("Internal Server Error")
		} else {
			&self.message
		}
	}

	/// Plain-text response describing this cause
	pub fn to_response(&self, expose: bool) -> Response {
		let mut response = Response::new(self.status)
			.with_content_type("text/plain; charset=utf-8")
			.with_body(self.public_message(expose).to_string());
		self.apply_headers(&mut response);
		response
	}

	/// Copy the cause headers onto a response
	pub fn apply_headers(&self, response: &mut Response) {
		for (name, value) in &self.headers {
			response.set_header(name, value);
		}
	}
}

impl fmt::Debug for Cause {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Cause")
			.field("status", &self.status)
			.field("message", &self.message)
			.field("has_source", &self.source.is_some())
			.field("headers", &self.headers)
			.finish()
	}
}

impl fmt::Display for Cause {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} {}", self.status.as_u16(), self.message)
	}
}

impl From<StatusCode> for Cause {
	fn from(status: StatusCode) -> Self {
		Cause::from_status(status)
	}
}

impl From<&str> for Cause {
	fn from(message: &str) -> Self {
		Cause::internal(message)
	}
}

impl From<String> for Cause {
	fn from(message: String) -> Self {
		Cause::internal(message)
	}
}

impl From<strand_http::Error> for Cause {
	fn from(error: strand_http::Error) -> Self {
		let status =
			StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		Cause::from_error(error).with_status(status)
	}
}
