//! Request body size limit unit

use async_trait::async_trait;
use hyper::StatusCode;
use strand_conf::LimitSettings;
use strand_http::Request;
use strand_pipeline::{Cause, Flow, HandlerUnit, Next};

/// Limit configuration
#[derive(Debug, Clone)]
pub struct LimitConfig {
	pub max_body_bytes: u64,
}

impl LimitConfig {
	pub fn new(max_body_bytes: u64) -> Self {
		Self { max_body_bytes }
	}

	pub fn from_settings(settings: &LimitSettings) -> Self {
		Self::new(settings.max_body_bytes)
	}
}

impl Default for LimitConfig {
	fn default() -> Self {
		Self::from_settings(&LimitSettings::default())
	}
}

/// Fails requests whose body exceeds the limit with `413 Payload Too Large`
///
/// A declared `Content-Length` above the limit is rejected without looking
/// at the body; an unparsable one is a `400`.
#[derive(Debug, Clone, Default)]
pub struct Limit {
	config: LimitConfig,
}

impl Limit {
	pub fn new(max_body_bytes: u64) -> Self {
		Self::with_config(LimitConfig::new(max_body_bytes))
	}

	pub fn with_config(config: LimitConfig) -> Self {
		Self { config }
	}

	fn too_large(&self) -> Cause {
		Cause::new(StatusCode::PAYLOAD_TOO_LARGE, "Request Entity Too Large")
	}
}

#[async_trait]
impl HandlerUnit for Limit {
	fn name(&self) -> &'static str {
		"limit"
	}

	async fn handle(&self, request: &mut Request, next: Next) -> Flow {
		if let Some(declared) = request.header("content-length") {
			match declared.trim().parse::<u64>() {
				Ok(length) if length > self.config.max_body_bytes => {
					return next.fail(self.too_large());
				}
				Ok(_) => {}
				Err(_) => {
					return next.fail(Cause::new(StatusCode::BAD_REQUEST, "Invalid Content-Length"));
				}
			}
		}
		if request.body.len() as u64 > self.config.max_body_bytes {
			return next.fail(self.too_large());
		}
		next.proceed()
	}
}
