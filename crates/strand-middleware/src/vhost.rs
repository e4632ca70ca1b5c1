//! Virtual host dispatch

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use std::sync::Arc;
use strand_http::Request;
use strand_pipeline::{Binding, Error, Flow, HandlerUnit, Next, Result};

/// Runs an inner unit only for requests addressed to a matching host
///
/// The pattern is a hostname where `*` matches any run of characters, so
/// `*.example.com` covers every subdomain. Matching ignores case and the port.
/// Requests for other hosts proceed untouched. The vhost runs in the same
/// phase as the unit it wraps.
///
/// # Examples
///
/// ```
/// use strand_middleware::{ResponseTime, Vhost};
///
/// let vhost = Vhost::new("*.example.com", ResponseTime::new()).unwrap();
/// assert!(vhost.matches("api.example.com"));
/// assert!(vhost.matches("API.Example.com"));
/// assert!(!vhost.matches("example.org"));
/// ```
pub struct Vhost {
	pattern: String,
	regex: Regex,
	inner: Arc<dyn HandlerUnit>,
}

impl Vhost {
	pub fn new(hostname: &str, inner: impl HandlerUnit + 'static) -> Result<Self> {
		Self::shared(hostname, Arc::new(inner))
	}

	/// Wrap an already shared unit
	pub fn shared(hostname: &str, inner: Arc<dyn HandlerUnit>) -> Result<Self> {
		let hostname = hostname.trim();
		if hostname.is_empty() {
			return Err(Error::configuration("empty hostname pattern"));
		}
		let body = hostname
			.split('*')
			.map(regex::escape)
			.collect::<Vec<_>>()
			.join(".*");
		let regex = RegexBuilder::new(&format!("^{body}$"))
			.case_insensitive(true)
			.build()
			.map_err(|e| Error::configuration(format!("invalid hostname pattern {hostname:?}: {e}")))?;
		Ok(Self {
			pattern: hostname.to_string(),
			regex,
			inner,
		})
	}

	/// Pattern as given
	pub fn pattern(&self) -> &str {
		&self.pattern
	}

	/// Whether `host` (without port) is served by this vhost
	pub fn matches(&self, host: &str) -> bool {
		self.regex.is_match(host)
	}
}

#[async_trait]
impl HandlerUnit for Vhost {
	fn name(&self) -> &'static str {
		"vhost"
	}

	fn is_error_handler(&self) -> bool {
		self.inner.is_error_handler()
	}

	fn on_bind(&self, binding: &Binding) -> Result<()> {
		self.inner.on_bind(binding)
	}

	async fn handle(&self, request: &mut Request, next: Next) -> Flow {
		let served = request.host().is_some_and(|host| self.matches(host));
		if !served {
			return next.proceed();
		}
		tracing::trace!(pattern = %self.pattern, unit = self.inner.name(), "vhost matched");
		self.inner.handle(request, next).await
	}
}
