//! Inbound request representation.

use bytes::Bytes;
use hyper::{HeaderMap, Method, Uri, Version};
use std::collections::HashMap;
use std::fmt;

use crate::{Error, Extensions, Response, Result};

/// Callback run against the final response of a walk
pub type ResponseHook = Box<dyn FnOnce(&mut Response) + Send + Sync>;

/// HTTP request as seen by pipeline units
///
/// The transport owns construction; units receive `&mut Request` and may
/// rewrite the method, attach extensions, record path parameters, or
/// register response hooks.
pub struct Request {
	pub method: Method,
	pub uri: Uri,
	pub version: Version,
	pub headers: HeaderMap,
	pub body: Bytes,
	/// Parameters captured from the matched route pattern
	pub params: HashMap<String, String>,
	extensions: Extensions,
	response_hooks: Vec<ResponseHook>,
}

impl Request {
	/// Create a request from its raw parts
	///
	/// # Examples
	///
	/// ```
	/// use strand_http::Request;
	/// use hyper::{HeaderMap, Method, Uri, Version};
	/// use bytes::Bytes;
	///
	/// let request = Request::new(
	///     Method::GET,
	///     Uri::from_static("/api/users"),
	///     Version::HTTP_11,
	///     HeaderMap::new(),
	///     Bytes::new(),
	/// );
	/// assert_eq!(request.path(), "/api/users");
	/// ```
	pub fn new(method: Method, uri: Uri, version: Version, headers: HeaderMap, body: Bytes) -> Self {
		Self {
			method,
			uri,
			version,
			headers,
			body,
			params: HashMap::new(),
			extensions: Extensions::new(),
			response_hooks: Vec::new(),
		}
	}

	/// Start building a request
	///
	/// # Examples
	///
	/// ```
	/// use strand_http::Request;
	/// use hyper::Method;
	///
	/// let request = Request::builder()
	///     .method(Method::POST)
	///     .uri("/submit?draft=1")
	///     .header("content-type", "text/plain")
	///     .body("hello")
	///     .build()
	///     .unwrap();
	///
	/// assert_eq!(request.method, Method::POST);
	/// assert_eq!(request.path(), "/submit");
	/// assert_eq!(request.query(), Some("draft=1"));
	/// ```
	pub fn builder() -> RequestBuilder {
		RequestBuilder::default()
	}

	/// Path component of the request URI
	pub fn path(&self) -> &str {
		self.uri.path()
	}

	/// Raw query string, if any
	pub fn query(&self) -> Option<&str> {
		self.uri.query()
	}

	/// Decoded query parameters
	///
	/// Malformed query strings yield an empty map.
	///
	/// # Examples
	///
	/// ```
	/// use strand_http::Request;
	///
	/// let request = Request::builder().uri("/?a=1&b=two%20words").build().unwrap();
	/// let params = request.query_params();
	/// assert_eq!(params.get("b").map(String::as_str), Some("two words"));
	/// ```
	pub fn query_params(&self) -> HashMap<String, String> {
		self.query()
			.and_then(|query| serde_urlencoded::from_str::<Vec<(String, String)>>(query).ok())
			.map(|pairs| pairs.into_iter().collect())
			.unwrap_or_default()
	}

	/// Header value as a string, ignoring non-visible-ASCII values
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(name).and_then(|value| value.to_str().ok())
	}

	/// Host header without the port
	///
	/// Bracketed IPv6 literals keep their brackets.
	pub fn host(&self) -> Option<&str> {
		self.header("host").map(|host| {
			if host.starts_with('[') {
				return host.find(']').map_or(host, |end| &host[..=end]);
			}
			match host.split_once(':') {
				Some((name, port)) if !port.contains(':') => name,
				_ => host,
			}
		})
	}

	/// Captured route parameter
	pub fn param(&self, name: &str) -> Option<&str> {
		self.params.get(name).map(String::as_str)
	}

	/// Request-scoped typed storage
	pub fn extensions(&self) -> &Extensions {
		&self.extensions
	}

	/// Mutable request-scoped typed storage
	pub fn extensions_mut(&mut self) -> &mut Extensions {
		&mut self.extensions
	}

	/// Register a hook that runs against the final response of this walk
	///
	/// Hooks run whichever stage produces the response, including the
	/// pipeline's own fallback responses. The most recently registered hook
	/// runs first, so units registered earlier in the chain observe the
	/// response last.
	///
	/// # Examples
	///
	/// ```
	/// use strand_http::{Request, Response};
	///
	/// let mut request = Request::builder().uri("/").build().unwrap();
	/// request.on_response(|response| {
	///     response.set_header("x-served-by", "strand");
	/// });
	///
	/// let mut response = Response::ok();
	/// request.finalize(&mut response);
	/// assert_eq!(response.header("x-served-by"), Some("strand"));
	/// ```
	pub fn on_response<F>(&mut self, hook: F)
	where
		F: FnOnce(&mut Response) + Send + Sync + 'static,
	{
		self.response_hooks.push(Box::new(hook));
	}

	/// Run and drain every registered response hook
	pub fn finalize(&mut self, response: &mut Response) {
		while let Some(hook) = self.response_hooks.pop() {
			hook(response);
		}
	}

	/// Number of hooks waiting for the final response
	pub fn pending_hooks(&self) -> usize {
		self.response_hooks.len()
	}
}

impl fmt::Debug for Request {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Request")
			.field("method", &self.method)
			.field("uri", &self.uri)
			.field("version", &self.version)
			.field("headers", &self.headers)
			.field("body_len", &self.body.len())
			.field("params", &self.params)
			.finish_non_exhaustive()
	}
}

/// Builder for [`Request`]
#[derive(Default)]
pub struct RequestBuilder {
	method: Option<Method>,
	uri: Option<String>,
	version: Option<Version>,
	headers: HeaderMap,
	body: Bytes,
	invalid_header: Option<String>,
}

impl RequestBuilder {
	/// Set the HTTP method (defaults to GET)
	pub fn method(mut self, method: Method) -> Self {
		self.method = Some(method);
		self
	}

	/// Set the request URI (required)
	pub fn uri(mut self, uri: impl Into<String>) -> Self {
		self.uri = Some(uri.into());
		self
	}

	/// Set the HTTP version (defaults to HTTP/1.1)
	pub fn version(mut self, version: Version) -> Self {
		self.version = Some(version);
		self
	}

	/// Replace all headers
	pub fn headers(mut self, headers: HeaderMap) -> Self {
		self.headers = headers;
		self
	}

	/// Append a single header
	///
	/// Invalid names or values are reported by [`RequestBuilder::build`].
	pub fn header(mut self, name: &str, value: &str) -> Self {
		match (
			hyper::header::HeaderName::from_bytes(name.as_bytes()),
			hyper::header::HeaderValue::from_str(value),
		) {
			(Ok(name), Ok(value)) => {
				self.headers.append(name, value);
			}
			_ => {
				self.invalid_header.get_or_insert_with(|| name.to_string());
			}
		}
		self
	}

	/// Set the request body
	pub fn body(mut self, body: impl Into<Bytes>) -> Self {
		self.body = body.into();
		self
	}

	/// Build the request
	///
	/// # Errors
	///
	/// Returns [`Error::MissingField`] when no URI was given,
	/// [`Error::InvalidUri`] when it does not parse and
	/// [`Error::InvalidHeader`] for a rejected header.
	pub fn build(self) -> Result<Request> {
		if let Some(name) = self.invalid_header {
			return Err(Error::InvalidHeader(name));
		}
		let raw = self.uri.ok_or(Error::MissingField("uri"))?;
		let uri = raw
			.parse::<Uri>()
			.map_err(|e| Error::InvalidUri(format!("{}: {}", raw, e)))?;

		Ok(Request::new(
			self.method.unwrap_or(Method::GET),
			uri,
			self.version.unwrap_or(Version::HTTP_11),
			self.headers,
			self.body,
		))
	}
}
