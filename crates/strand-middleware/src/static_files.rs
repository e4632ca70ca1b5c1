//! Static file serving
//!
//! Files are read through the pipeline context's
//! [`FileSystem`](strand_pipeline::services::FileSystem), so tests and
//! embedded deployments can swap the backing store.

use async_trait::async_trait;
use hyper::{Method, StatusCode};
use std::path::{Path, PathBuf};
use strand_conf::StaticFilesSettings;
use strand_http::{Request, Response};
use strand_pipeline::services::FsError;
use strand_pipeline::{Cause, Flow, HandlerUnit, Next};

/// Static file configuration
#[derive(Debug, Clone)]
pub struct StaticFilesConfig {
	/// Directory files are served from
	pub root: PathBuf,
	/// File served for directory requests
	pub index: String,
	/// `Cache-Control: max-age` in seconds; zero omits the header
	pub max_age: u64,
}

impl StaticFilesConfig {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self {
			root: root.into(),
			..Self::default()
		}
	}

	pub fn from_settings(settings: &StaticFilesSettings) -> Self {
		Self {
			root: settings.root.clone(),
			index: settings.index.clone(),
			max_age: settings.max_age,
		}
	}
}

impl Default for StaticFilesConfig {
	fn default() -> Self {
		Self::from_settings(&StaticFilesSettings::default())
	}
}

/// Why a request path cannot be mapped onto the root
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
	/// Escapes the root or contains forbidden characters
	Forbidden,
	/// Hidden file or directory, left to later units
	Hidden,
}

/// Map a mount-relative request path to a file-system path below `root`
///
/// Segments are percent-decoded one at a time; a decoded segment may not
/// smuggle in a separator.
fn resolve(root: &Path, relative: &str) -> Result<PathBuf, Rejection> {
	let mut path = root.to_path_buf();
	for raw in relative.split('/').filter(|s| !s.is_empty()) {
		let segment = urlencoding::decode(raw).map_err(|_| Rejection::Forbidden)?;
		if segment.contains(['/', '\\', '\0']) {
			return Err(Rejection::Forbidden);
		}
		match segment.as_ref() {
			"." => continue,
			".." => return Err(Rejection::Forbidden),
			s if s.starts_with('.') => return Err(Rejection::Hidden),
			s => path.push(s),
		}
	}
	Ok(path)
}

/// Serves files below a root directory for GET and HEAD requests
///
/// Missing files and other methods proceed to the next unit. Paths that try
/// to leave the root fail with `403 Forbidden`.
#[derive(Debug, Clone, Default)]
pub struct StaticFiles {
	config: StaticFilesConfig,
}

impl StaticFiles {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self::with_config(StaticFilesConfig::new(root))
	}

	pub fn with_config(config: StaticFilesConfig) -> Self {
		Self { config }
	}

	fn build_response(&self, path: &Path, body: bytes::Bytes, head: bool) -> Response {
		let mime = mime_guess::from_path(path).first_or_octet_stream();
		let mut response = Response::ok()
			.with_content_type(mime.essence_str())
			.with_header("content-length", &body.len().to_string());
		if self.config.max_age > 0 {
			response.set_header(
				"cache-control",
				&format!("public, max-age={}", self.config.max_age),
			);
		}
		if !head {
			response = response.with_body(body);
		}
		response
	}
}

#[async_trait]
impl HandlerUnit for StaticFiles {
	fn name(&self) -> &'static str {
		"static_files"
	}

	async fn handle(&self, request: &mut Request, next: Next) -> Flow {
		let head = request.method == Method::HEAD;
		if request.method != Method::GET && !head {
			return next.proceed();
		}
		let Some(relative) = next.mount().strip(request.path()) else {
			return next.proceed();
		};

		let mut path = match resolve(&self.config.root, &relative) {
			Ok(path) => path,
			Err(Rejection::Hidden) => return next.proceed(),
			Err(Rejection::Forbidden) => {
				tracing::warn!(path = %request.path(), "rejected static file path");
				return next.fail(Cause::new(StatusCode::FORBIDDEN, "Forbidden"));
			}
		};

		let fs = next.context().file_system_handle();
		let metadata = match fs.metadata(&path).await {
			Ok(metadata) => metadata,
			Err(FsError::NotFound(_)) => return next.proceed(),
			Err(e) => return next.fail(Cause::from_error(e)),
		};
		if !metadata.is_file {
			path.push(&self.config.index);
		}

		match fs.read(&path).await {
			Ok(body) => {
				tracing::debug!(file = %path.display(), len = body.len(), "serving static file");
				next.respond(self.build_response(&path, body, head))
			}
			Err(FsError::NotFound(_)) => next.proceed(),
			Err(e) => next.fail(Cause::from_error(e)),
		}
	}
}
