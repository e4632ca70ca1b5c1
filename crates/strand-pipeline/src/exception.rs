//! Pipeline assembly and dispatch errors.
//!
//! Application failures never show up here: a unit reports those by failing
//! its continuation with a [`Cause`](crate::Cause), and the pipeline turns
//! them into responses.

use thiserror::Error;

/// Errors raised by the pipeline itself
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
	/// Invalid binding arguments, double binding or a malformed route
	/// table. Raised while assembling a pipeline and aborts the assembly.
	#[error("Configuration error: {0}")]
	Configuration(String),

	/// A unit broke the continuation contract, for example by dropping a
	/// deferred continuation without signalling it
	#[error("Protocol violation: {0}")]
	ProtocolViolation(String),

	/// Request or response construction failed
	#[error(transparent)]
	Http(#[from] strand_http::Error),
}

impl Error {
	/// Shorthand for [`Error::Configuration`]
	pub fn configuration(message: impl Into<String>) -> Self {
		Error::Configuration(message.into())
	}

	/// Shorthand for [`Error::ProtocolViolation`]
	pub fn protocol_violation(message: impl Into<String>) -> Self {
		Error::ProtocolViolation(message.into())
	}
}

/// Result alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;
