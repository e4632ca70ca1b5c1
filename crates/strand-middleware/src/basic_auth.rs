//! HTTP Basic authentication unit
//!
//! Requests without valid credentials fail with `401 Unauthorized` carrying a
//! `WWW-Authenticate` challenge, so whichever error handler answers keeps the
//! challenge. Authenticated requests proceed with an [`AuthenticatedUser`]
//! extension.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hyper::StatusCode;
use std::collections::HashMap;
use std::sync::Arc;
use strand_http::Request;
use strand_pipeline::{Cause, Flow, HandlerUnit, Next};
use subtle::ConstantTimeEq;

/// Identity established by [`BasicAuth`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub String);

/// Checks a username/password pair
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
	async fn verify(&self, username: &str, password: &str) -> bool;
}

/// Fixed set of users, compared in constant time
///
/// # Examples
///
/// ```
/// use strand_middleware::basic_auth::{CredentialVerifier, StaticCredentials};
///
/// # tokio_test::block_on(async {
/// let users = StaticCredentials::new().with_user("admin", "s3cret");
/// assert!(users.verify("admin", "s3cret").await);
/// assert!(!users.verify("admin", "guess").await);
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
	users: HashMap<String, String>,
}

impl StaticCredentials {
	pub fn new() -> Self {
		Self::default()
	}

	/// Add a user
	pub fn with_user(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
		self.users.insert(username.into(), password.into());
		self
	}
}

#[async_trait]
impl CredentialVerifier for StaticCredentials {
	async fn verify(&self, username: &str, password: &str) -> bool {
		match self.users.get(username) {
			Some(expected) => bool::from(expected.as_bytes().ct_eq(password.as_bytes())),
			None => false,
		}
	}
}

/// Basic authentication configuration
#[derive(Debug, Clone)]
pub struct BasicAuthConfig {
	/// Realm announced in the challenge
	pub realm: String,
}

impl Default for BasicAuthConfig {
	fn default() -> Self {
		Self {
			realm: "Authorization Required".to_string(),
		}
	}
}

/// HTTP Basic authentication unit
pub struct BasicAuth {
	config: BasicAuthConfig,
	verifier: Arc<dyn CredentialVerifier>,
}

impl BasicAuth {
	/// Authenticate against `verifier` with the default realm
	pub fn new(verifier: impl CredentialVerifier + 'static) -> Self {
		Self::with_config(BasicAuthConfig::default(), verifier)
	}

	pub fn with_config(config: BasicAuthConfig, verifier: impl CredentialVerifier + 'static) -> Self {
		Self {
			config,
			verifier: Arc::new(verifier),
		}
	}

	fn challenge(&self) -> Cause {
		Cause::new(StatusCode::UNAUTHORIZED, "Unauthorized").with_header(
			"www-authenticate",
			format!("Basic realm=\"{}\"", self.config.realm),
		)
	}
}

/// Split an `Authorization` header into username and password
///
/// # Examples
///
/// ```
/// use strand_middleware::basic_auth::parse_basic_credentials;
///
/// // "aladdin:open sesame"
/// let parsed = parse_basic_credentials("Basic YWxhZGRpbjpvcGVuIHNlc2FtZQ==");
/// assert_eq!(parsed, Some(("aladdin".to_string(), "open sesame".to_string())));
/// assert_eq!(parse_basic_credentials("Bearer token"), None);
/// ```
pub fn parse_basic_credentials(header: &str) -> Option<(String, String)> {
	let (scheme, encoded) = header.trim().split_once(' ')?;
	if !scheme.eq_ignore_ascii_case("basic") {
		return None;
	}
	let decoded = STANDARD.decode(encoded.trim()).ok()?;
	let decoded = String::from_utf8(decoded).ok()?;
	let (username, password) = decoded.split_once(':')?;
	Some((username.to_string(), password.to_string()))
}

#[async_trait]
impl HandlerUnit for BasicAuth {
	fn name(&self) -> &'static str {
		"basic_auth"
	}

	async fn handle(&self, request: &mut Request, next: Next) -> Flow {
		let Some((username, password)) = request
			.header("authorization")
			.and_then(parse_basic_credentials)
		else {
			tracing::debug!(path = %request.path(), "missing or malformed credentials");
			return next.fail(self.challenge());
		};

		if !self.verifier.verify(&username, &password).await {
			tracing::warn!(username = %username, "rejected credentials");
			return next.fail(self.challenge());
		}

		request.extensions_mut().insert(AuthenticatedUser(username));
		next.proceed()
	}
}
