//! HTTP method override unit
//!
//! Lets clients limited to GET and POST (HTML forms, some proxies) reach
//! handlers bound to other verbs. Only POST requests are rewritten.

use async_trait::async_trait;
use hyper::Method;
use strand_http::Request;
use strand_pipeline::{Flow, HandlerUnit, Next};

/// Method the client actually sent, kept when an override applies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalMethod(pub Method);

/// Method override configuration
#[derive(Debug, Clone)]
pub struct MethodOverrideConfig {
	/// Header consulted first
	pub header: String,
	/// Query parameter consulted when the header is absent
	pub query_key: String,
	/// Methods a POST may become
	pub allowed: Vec<Method>,
}

impl Default for MethodOverrideConfig {
	fn default() -> Self {
		Self {
			header: "x-http-method-override".to_string(),
			query_key: "_method".to_string(),
			allowed: vec![Method::PUT, Method::PATCH, Method::DELETE],
		}
	}
}

/// Method override unit
#[derive(Debug, Clone, Default)]
pub struct MethodOverride {
	config: MethodOverrideConfig,
}

impl MethodOverride {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_config(config: MethodOverrideConfig) -> Self {
		Self { config }
	}

	fn requested(&self, request: &Request) -> Option<Method> {
		let raw = request
			.header(&self.config.header)
			.map(str::to_string)
			.or_else(|| request.query_params().remove(&self.config.query_key))?;
		let method = Method::from_bytes(raw.trim().to_ascii_uppercase().as_bytes()).ok()?;
		self.config.allowed.contains(&method).then_some(method)
	}
}

#[async_trait]
impl HandlerUnit for MethodOverride {
	fn name(&self) -> &'static str {
		"method_override"
	}

	async fn handle(&self, request: &mut Request, next: Next) -> Flow {
		if request.method == Method::POST
			&& let Some(method) = self.requested(request)
		{
			tracing::debug!(from = %request.method, to = %method, "method overridden");
			let original = std::mem::replace(&mut request.method, method);
			request.extensions_mut().insert(OriginalMethod(original));
		}
		next.proceed()
	}
}
