//! Error-phase unit rendering the current cause
//!
//! The representation follows the request's `Accept` header: JSON, HTML or
//! plain text. Server-side failures (5xx) only show their message when the
//! pipeline runs in debug mode.

use async_trait::async_trait;
use serde_json::json;
use strand_http::{Request, Response};
use strand_pipeline::{Cause, Flow, HandlerUnit, Next};

/// Error handler configuration
#[derive(Debug, Clone)]
pub struct ErrorHandlerConfig {
	/// Title used for HTML pages
	pub title: String,
}

impl Default for ErrorHandlerConfig {
	fn default() -> Self {
		Self {
			title: "Strand".to_string(),
		}
	}
}

/// Representation chosen from the `Accept` header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
	Json,
	Html,
	Text,
}

impl Representation {
	/// Pick the first supported type listed in `accept`
	///
	/// # Examples
	///
	/// ```
	/// use strand_middleware::error_handler::Representation;
	///
	/// assert_eq!(Representation::negotiate(Some("application/json")), Representation::Json);
	/// assert_eq!(Representation::negotiate(Some("text/html,*/*")), Representation::Html);
	/// assert_eq!(Representation::negotiate(None), Representation::Text);
	/// ```
	pub fn negotiate(accept: Option<&str>) -> Self {
		let Some(accept) = accept else {
			return Representation::Text;
		};
		for media in accept.split(',') {
			let media = media.split(';').next().unwrap_or_default().trim();
			match media {
				"application/json" => return Representation::Json,
				"text/html" => return Representation::Html,
				"text/plain" => return Representation::Text,
				_ => {}
			}
		}
		Representation::Text
	}
}

/// Error-handler unit
#[derive(Debug, Clone, Default)]
pub struct ErrorHandler {
	config: ErrorHandlerConfig,
}

impl ErrorHandler {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_config(config: ErrorHandlerConfig) -> Self {
		Self { config }
	}

	/// Build the response for `cause`
	pub fn render(&self, cause: &Cause, representation: Representation, debug: bool) -> Response {
		let status = cause.status();
		let message = cause.public_message(debug);

		let mut response = match representation {
			Representation::Json => {
				let body = json!({
					"error": {
						"status": status.as_u16(),
						"message": message,
					}
				});
				Response::new(status)
					.with_json(&body)
					.unwrap_or_else(|_| Response::new(status).with_body(message.to_string()))
			}
			Representation::Html => Response::new(status)
				.with_content_type("text/html; charset=utf-8")
				.with_body(format!(
					"<!DOCTYPE html><html><head><title>{title}</title></head>\
					 <body><h1>{code}</h1><p>{message}</p></body></html>",
					title = escape_html(&self.config.title),
					code = status.as_u16(),
					message = escape_html(message),
				)),
			Representation::Text => Response::new(status)
				.with_content_type("text/plain; charset=utf-8")
				.with_body(message.to_string()),
		};
		cause.apply_headers(&mut response);
		response
	}
}

fn escape_html(raw: &str) -> String {
	let mut escaped = String::with_capacity(raw.len());
	for c in raw.chars() {
		match c {
			'&' => escaped.push_str("&amp;"),
			'<' => escaped.push_str("&lt;"),
			'>' => escaped.push_str("&gt;"),
			'"' => escaped.push_str("&quot;"),
			'\'' => escaped.push_str("&#39;"),
			_ => escaped.push(c),
		}
	}
	escaped
}

#[async_trait]
impl HandlerUnit for ErrorHandler {
	fn name(&self) -> &'static str {
		"error_handler"
	}

	fn is_error_handler(&self) -> bool {
		true
	}

	async fn handle(&self, request: &mut Request, next: Next) -> Flow {
		let Some(cause) = next.cause().cloned() else {
			return next.proceed();
		};
		let debug = next.context().info().debug;
		if cause.is_server_error() {
			tracing::error!(cause = %cause, path = %request.path(), "request failed");
		}

		let representation = Representation::negotiate(request.header("accept"));
		next.respond(self.render(&cause, representation, debug))
	}
}
