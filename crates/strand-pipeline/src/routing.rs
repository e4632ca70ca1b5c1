//! Verb binding through an explicit route table.
//!
//! A [`RouteTable`] is an ordered list of `(verb, pattern, unit)` entries
//! assembled up front. [`Router`] compiles the table into a single unit that
//! can be mounted like any other: it matches the request path below its
//! mount, records the captured parameters on the request and hands the
//! request to the route's unit. The captures are withdrawn once that unit
//! returns, so stages after a proceeding route see the parameters they had
//! before. Requests that match no entry proceed.
//!
//! Pattern segments of the form `:name` or `{name}` capture one path
//! segment; a trailing `*` captures the remainder as `wildcard`.

use async_trait::async_trait;
use hyper::Method;
use regex::Regex;
use std::fmt;
use std::sync::Arc;
use strand_http::Request;

use crate::exception::{Error, Result};
use crate::next::{Flow, Next};
use crate::unit::{Binding, HandlerUnit};

/// HTTP verbs a route can be bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
	Get,
	Head,
	Post,
	Put,
	Patch,
	Delete,
	Options,
	Connect,
	Trace,
}

impl Verb {
	/// Verb for a request method; extension methods have none
	pub fn from_method(method: &Method) -> Option<Self> {
		let verb = match method.as_str() {
			"GET" => Verb::Get,
			"HEAD" => Verb::Head,
			"POST" => Verb::Post,
			"PUT" => Verb::Put,
			"PATCH" => Verb::Patch,
			"DELETE" => Verb::Delete,
			"OPTIONS" => Verb::Options,
			"CONNECT" => Verb::Connect,
			"TRACE" => Verb::Trace,
			_ => return None,
		};
		Some(verb)
	}

	/// Matching request method
	pub fn as_method(&self) -> Method {
		match self {
			Verb::Get => Method::GET,
			Verb::Head => Method::HEAD,
			Verb::Post => Method::POST,
			Verb::Put => Method::PUT,
			Verb::Patch => Method::PATCH,
			Verb::Delete => Method::DELETE,
			Verb::Options => Method::OPTIONS,
			Verb::Connect => Method::CONNECT,
			Verb::Trace => Method::TRACE,
		}
	}
}

impl fmt::Display for Verb {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_method().as_str())
	}
}

struct RouteEntry {
	verb: Verb,
	pattern: String,
	unit: Arc<dyn HandlerUnit>,
}

/// Ordered registration table of `(verb, pattern, unit)` entries
///
/// # Examples
///
/// ```
/// use strand_pipeline::{RouteTable, Router, Verb, endpoint};
/// use strand_http::{Request, Response};
///
/// let table = RouteTable::new()
///     .get("/users/:id", endpoint(|r: &Request| {
///         Ok(Response::ok().with_body(r.param("id").unwrap_or_default().to_string()))
///     }))
///     .trace("/debug", endpoint(|_: &Request| Ok(Response::ok())));
///
/// assert_eq!(table.len(), 2);
/// assert_eq!(table.verbs(), vec![Verb::Get, Verb::Trace]);
///
/// let router = Router::new(table).unwrap();
/// # let _ = router;
/// ```
#[derive(Default)]
pub struct RouteTable {
	entries: Vec<RouteEntry>,
}

macro_rules! verb_methods {
	($($(#[$doc:meta])* $name:ident => $verb:ident;)*) => {
		$(
			$(#[$doc])*
			pub fn $name(self, pattern: &str, unit: impl HandlerUnit + 'static) -> Self {
				self.route(Verb::$verb, pattern, unit)
			}
		)*
	};
}

impl RouteTable {
	/// Empty table
	pub fn new() -> Self {
		Self::default()
	}

	/// Append an entry
	pub fn route(self, verb: Verb, pattern: &str, unit: impl HandlerUnit + 'static) -> Self {
		self.route_shared(verb, pattern, Arc::new(unit))
	}

	/// Append an entry whose unit the caller keeps a handle to
	pub fn route_shared(mut self, verb: Verb, pattern: &str, unit: Arc<dyn HandlerUnit>) -> Self {
		self.entries.push(RouteEntry {
			verb,
			pattern: pattern.to_string(),
			unit,
		});
		self
	}

	verb_methods! {
		/// Bind a GET route
		get => Get;
		/// Bind a HEAD route
		head => Head;
		/// Bind a POST route
		post => Post;
		/// Bind a PUT route
		put => Put;
		/// Bind a PATCH route
		patch => Patch;
		/// Bind a DELETE route
		delete => Delete;
		/// Bind an OPTIONS route
		options => Options;
		/// Bind a CONNECT route
		connect => Connect;
		/// Bind a TRACE route
		trace => Trace;
	}

	/// Number of entries
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Whether the table has no entries
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Verbs in registration order
	pub fn verbs(&self) -> Vec<Verb> {
		self.entries.iter().map(|entry| entry.verb).collect()
	}
}

struct CompiledRoute {
	verb: Verb,
	pattern: String,
	regex: Regex,
	params: Vec<String>,
	unit: Arc<dyn HandlerUnit>,
}

/// Unit dispatching to the first route whose verb and pattern match
pub struct Router {
	routes: Vec<CompiledRoute>,
}

impl Router {
	/// Compile a route table
	///
	/// # Errors
	///
	/// Returns [`Error::Configuration`] when a pattern is empty, does not
	/// start with `/`, names a parameter invalidly or twice, or places `*`
	/// anywhere but the last segment.
	pub fn new(table: RouteTable) -> Result<Self> {
		let routes = table
			.entries
			.into_iter()
			.map(|entry| {
				let (regex, params) = compile_pattern(&entry.pattern)?;
				Ok(CompiledRoute {
					verb: entry.verb,
					pattern: entry.pattern,
					regex,
					params,
					unit: entry.unit,
				})
			})
			.collect::<Result<Vec<_>>>()?;
		Ok(Self { routes })
	}

	/// Number of compiled routes
	pub fn len(&self) -> usize {
		self.routes.len()
	}

	/// Whether no route is compiled
	pub fn is_empty(&self) -> bool {
		self.routes.is_empty()
	}
}

impl fmt::Debug for Router {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list()
			.entries(
				self.routes
					.iter()
					.map(|route| format!("{} {}", route.verb, route.pattern)),
			)
			.finish()
	}
}

#[async_trait]
impl HandlerUnit for Router {
	fn name(&self) -> &'static str {
		"router"
	}

	fn on_bind(&self, binding: &Binding) -> Result<()> {
		for route in &self.routes {
			route.unit.on_bind(binding)?;
		}
		Ok(())
	}

	async fn handle(&self, request: &mut Request, next: Next) -> Flow {
		let Some(verb) = Verb::from_method(&request.method) else {
			return next.proceed();
		};
		let path = next
			.mount()
			.strip(request.path())
			.unwrap_or_else(|| request.path().to_string());

		for route in self.routes.iter().filter(|route| route.verb == verb) {
			let Some(captures) = route.regex.captures(&path) else {
				continue;
			};
			// Captures are visible to the route unit only
			let mut shadowed = Vec::with_capacity(route.params.len());
			for name in &route.params {
				if let Some(value) = captures.name(name) {
					let previous = request
						.params
						.insert(name.clone(), value.as_str().to_string());
					shadowed.push((name, previous));
				}
			}
			tracing::debug!(verb = %verb, pattern = %route.pattern, "route matched");
			let flow = route.unit.handle(request, next).await;
			for (name, previous) in shadowed {
				match previous {
					Some(value) => request.params.insert(name.clone(), value),
					None => request.params.remove(name),
				};
			}
			return flow;
		}
		next.proceed()
	}
}

fn compile_pattern(pattern: &str) -> Result<(Regex, Vec<String>)> {
	if pattern.is_empty() {
		return Err(Error::configuration("route pattern must not be empty"));
	}
	if !pattern.starts_with('/') {
		return Err(Error::configuration(format!(
			"route pattern `{}` must start with `/`",
			pattern
		)));
	}

	let segments: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
	let mut expression = String::from("^");
	let mut params = Vec::new();

	for (position, segment) in segments.iter().enumerate() {
		if *segment == "*" {
			if position + 1 != segments.len() {
				return Err(Error::configuration(format!(
					"route pattern `{}` may only end with `*`",
					pattern
				)));
			}
			expression.push_str("(?:/(?P<wildcard>.*))?");
			params.push("wildcard".to_string());
			break;
		}

		expression.push('/');
		let name = segment
			.strip_prefix(':')
			.or_else(|| segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')));
		match name {
			Some(name) => {
				let valid = !name.is_empty()
					&& name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
					&& !name.starts_with(|c: char| c.is_ascii_digit());
				if !valid || params.iter().any(|p| p == name) {
					return Err(Error::configuration(format!(
						"route pattern `{}` has an invalid parameter `{}`",
						pattern, segment
					)));
				}
				expression.push_str(&format!("(?P<{}>[^/]+)", name));
				params.push(name.to_string());
			}
			None => expression.push_str(&regex::escape(segment)),
		}
	}

	if segments.last() != Some(&"*") {
		expression.push_str("/?");
	}
	expression.push('$');

	let regex = Regex::new(&expression).map_err(|e| {
		Error::configuration(format!("route pattern `{}` does not compile: {}", pattern, e))
	})?;
	Ok((regex, params))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{Pipeline, PipelineContext, endpoint};
	use hyper::StatusCode;
	use rstest::rstest;
	use strand_http::Response;

	fn echo_param(name: &'static str) -> impl HandlerUnit {
		endpoint(move |r: &Request| {
			Ok(Response::ok().with_body(r.param(name).unwrap_or("-").to_string()))
		})
	}

	#[rstest]
	#[case("/users/:id", "/users/42", true)]
	#[case("/users/{id}", "/users/42/", true)]
	#[case("/users/:id", "/users/42/posts", false)]
	#[case("/users", "/users", true)]
	#[case("/users", "/users/", true)]
	#[case("/users", "/usersx", false)]
	#[case("/files/*", "/files/a/b/c.txt", true)]
	#[case("/files/*", "/files", true)]
	#[case("/", "/", true)]
	fn test_pattern_matching(#[case] pattern: &str, #[case] path: &str, #[case] expected: bool) {
		let (regex, _) = compile_pattern(pattern).unwrap();

		assert_eq!(regex.is_match(path), expected);
	}

	#[rstest]
	#[case("")]
	#[case("users")]
	#[case("/users/:")]
	#[case("/users/:1id")]
	#[case("/a/:id/b/:id")]
	#[case("/files/*/more")]
	fn test_invalid_patterns(#[case] pattern: &str) {
		let table = RouteTable::new().get(pattern, echo_param("id"));

		assert!(matches!(Router::new(table), Err(Error::Configuration(_))));
	}

	#[rstest]
	fn test_literal_segments_are_escaped() {
		let (regex, _) = compile_pattern("/v1.0/items").unwrap();

		assert!(regex.is_match("/v1.0/items"));
		assert!(!regex.is_match("/v1x0/items"));
	}

	#[rstest]
	#[case(Method::TRACE, Some(Verb::Trace))]
	#[case(Method::PATCH, Some(Verb::Patch))]
	fn test_verb_from_method(#[case] method: Method, #[case] expected: Option<Verb>) {
		assert_eq!(Verb::from_method(&method), expected);
	}

	#[rstest]
	fn test_extension_method_has_no_verb() {
		let method = Method::from_bytes(b"PURGE").unwrap();

		assert_eq!(Verb::from_method(&method), None);
	}

	#[rstest]
	#[tokio::test]
	async fn test_router_strips_mount_and_captures_params() {
		let router = Router::new(RouteTable::new().get("/users/:id", echo_param("id"))).unwrap();
		let pipeline = Pipeline::builder(PipelineContext::default())
			.mount("/api", router)
			.build()
			.unwrap();

		let request = Request::builder().uri("/api/users/7").build().unwrap();
		let response = pipeline.dispatch(request).await;

		assert_eq!(response.status, StatusCode::OK);
		assert_eq!(response.body_text(), "7");
	}

	#[rstest]
	#[tokio::test]
	async fn test_router_respects_verb() {
		let router = Router::new(
			RouteTable::new()
				.trace("/echo", endpoint(|_: &Request| Ok(Response::ok().with_body("trace"))))
				.get("/echo", endpoint(|_: &Request| Ok(Response::ok().with_body("get")))),
		)
		.unwrap();
		let pipeline = Pipeline::builder(PipelineContext::default())
			.unit(router)
			.build()
			.unwrap();

		let trace = Request::builder()
			.method(Method::TRACE)
			.uri("/echo")
			.build()
			.unwrap();
		let post = Request::builder()
			.method(Method::POST)
			.uri("/echo")
			.build()
			.unwrap();

		assert_eq!(pipeline.dispatch(trace).await.body_text(), "trace");
		assert_eq!(pipeline.dispatch(post).await.status, StatusCode::NOT_FOUND);
	}

	#[rstest]
	#[tokio::test]
	async fn test_wildcard_capture() {
		let router = Router::new(RouteTable::new().get("/assets/*", echo_param("wildcard"))).unwrap();
		let pipeline = Pipeline::builder(PipelineContext::default())
			.unit(router)
			.build()
			.unwrap();

		let request = Request::builder().uri("/assets/css/site.css").build().unwrap();

		assert_eq!(pipeline.dispatch(request).await.body_text(), "css/site.css");
	}

	struct PeekThenProceed {
		seen: std::sync::Mutex<Option<String>>,
	}

	#[async_trait]
	impl HandlerUnit for PeekThenProceed {
		async fn handle(&self, request: &mut Request, next: Next) -> Flow {
			*self.seen.lock().unwrap() = request.param("id").map(str::to_string);
			next.proceed()
		}
	}

	#[rstest]
	#[tokio::test]
	async fn test_captures_withdrawn_after_proceeding_route() {
		let peek = Arc::new(PeekThenProceed {
			seen: std::sync::Mutex::new(None),
		});
		let router = Router::new(RouteTable::new().route_shared(
			Verb::Get,
			"/users/:id",
			Arc::clone(&peek) as Arc<dyn HandlerUnit>,
		))
		.unwrap();
		let pipeline = Pipeline::builder(PipelineContext::default())
			.unit(router)
			.unit(echo_param("id"))
			.build()
			.unwrap();

		let request = Request::builder().uri("/users/7").build().unwrap();
		let response = pipeline.dispatch(request).await;

		assert_eq!(peek.seen.lock().unwrap().as_deref(), Some("7"));
		assert_eq!(response.body_text(), "-");
	}
}
