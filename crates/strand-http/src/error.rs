//! Errors raised while constructing requests and responses.

use thiserror::Error;

/// HTTP-level error
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
	/// The request URI could not be parsed
	#[error("Invalid URI: {0}")]
	InvalidUri(String),

	/// A header name or value was rejected
	#[error("Invalid header: {0}")]
	InvalidHeader(String),

	/// A required builder field was not supplied
	#[error("Missing field: {0}")]
	MissingField(&'static str),

	/// Body (de)serialization failed
	#[error("Serialization error: {0}")]
	Serialization(String),
}

impl Error {
	/// HTTP status code best describing this error
	///
	/// # Examples
	///
	/// ```
	/// use strand_http::Error;
	///
	/// assert_eq!(Error::InvalidUri("::".to_string()).status_code(), 400);
	/// assert_eq!(Error::Serialization("eof".to_string()).status_code(), 500);
	/// ```
	pub fn status_code(&self) -> u16 {
		match self {
			Error::InvalidUri(_) | Error::InvalidHeader(_) => 400,
			Error::MissingField(_) | Error::Serialization(_) => 500,
		}
	}
}

/// Result alias for HTTP operations
pub type Result<T> = std::result::Result<T, Error>;
