//! Access log unit
//!
//! Records one line per request once the final response is known, so the
//! status and elapsed time cover the whole walk including error handling.

use async_trait::async_trait;
use hyper::Version;
use std::time::{Duration, Instant};
use strand_http::{Request, Response};
use strand_pipeline::{Flow, HandlerUnit, Next};

/// Access log line layout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
	/// `"GET /path HTTP/1.1" 200 512 "referrer" "user-agent" - 3 ms`
	#[default]
	Default,
	/// `GET /path HTTP/1.1 200 512 - 3 ms`
	Short,
	/// `GET /path 200 512 - 3 ms`
	Tiny,
}

/// Logger configuration
#[derive(Debug, Clone, Default)]
pub struct LoggerConfig {
	pub format: LogFormat,
}

/// Request facts captured before the walk continues
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRecord {
	pub method: String,
	pub url: String,
	pub version: Version,
	pub referrer: Option<String>,
	pub user_agent: Option<String>,
}

impl AccessRecord {
	fn capture(request: &Request) -> Self {
		Self {
			method: request.method.to_string(),
			url: request.uri.to_string(),
			version: request.version,
			referrer: request
				.header("referer")
				.or_else(|| request.header("referrer"))
				.map(str::to_string),
			user_agent: request.header("user-agent").map(str::to_string),
		}
	}

	/// Render the line for a finished request
	///
	/// # Examples
	///
	/// ```
	/// use hyper::Version;
	/// use std::time::Duration;
	/// use strand_middleware::logger::{AccessRecord, LogFormat};
	///
	/// let record = AccessRecord {
	///     method: "GET".to_string(),
	///     url: "/api/users".to_string(),
	///     version: Version::HTTP_11,
	///     referrer: None,
	///     user_agent: None,
	/// };
	/// let line = record.render(LogFormat::Tiny, 200, 12, Duration::from_millis(5));
	/// assert_eq!(line, "GET /api/users 200 12 - 5 ms");
	/// ```
	pub fn render(&self, format: LogFormat, status: u16, length: usize, elapsed: Duration) -> String {
		let ms = elapsed.as_millis();
		match format {
			LogFormat::Default => format!(
				"\"{} {} {:?}\" {} {} \"{}\" \"{}\" - {} ms",
				self.method,
				self.url,
				self.version,
				status,
				length,
				self.referrer.as_deref().unwrap_or(""),
				self.user_agent.as_deref().unwrap_or(""),
				ms
			),
			LogFormat::Short => format!(
				"{} {} {:?} {} {} - {} ms",
				self.method, self.url, self.version, status, length, ms
			),
			LogFormat::Tiny => format!("{} {} {} {} - {} ms", self.method, self.url, status, length, ms),
		}
	}
}

/// Access logging unit
///
/// Always proceeds; the log line is written through `tracing` at `info`
/// level when the final response is produced.
#[derive(Debug, Clone, Default)]
pub struct Logger {
	config: LoggerConfig,
}

impl Logger {
	/// Create a logger with the default format
	pub fn new() -> Self {
		Self::default()
	}

	/// Create a logger from a configuration
	pub fn with_config(config: LoggerConfig) -> Self {
		Self { config }
	}
}

#[async_trait]
impl HandlerUnit for Logger {
	fn name(&self) -> &'static str {
		"logger"
	}

	async fn handle(&self, request: &mut Request, next: Next) -> Flow {
		let started = Instant::now();
		let record = AccessRecord::capture(request);
		let format = self.config.format;
		let pipeline = next.context().info().name.clone();

		request.on_response(move |response: &mut Response| {
			let status = response.status.as_u16();
			let line = record.render(format, status, response.body.len(), started.elapsed());
			tracing::info!(target: "strand::access", pipeline = %pipeline, status, "{}", line);
		});
		next.proceed()
	}
}
