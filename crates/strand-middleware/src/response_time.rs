//! Response time header unit

use async_trait::async_trait;
use std::time::Instant;
use strand_http::{Request, Response};
use strand_pipeline::{Flow, HandlerUnit, Next};

/// Header carrying the elapsed time
pub const RESPONSE_TIME_HEADER: &str = "x-response-time";

/// Adds `X-Response-Time: <n>ms` to the final response, whichever unit
/// produced it
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseTime;

impl ResponseTime {
	pub fn new() -> Self {
		Self
	}
}

#[async_trait]
impl HandlerUnit for ResponseTime {
	fn name(&self) -> &'static str {
		"response_time"
	}

	async fn handle(&self, request: &mut Request, next: Next) -> Flow {
		let started = Instant::now();
		request.on_response(move |response: &mut Response| {
			let value = format!("{}ms", started.elapsed().as_millis());
			response.set_header(RESPONSE_TIME_HEADER, &value);
		});
		next.proceed()
	}
}
