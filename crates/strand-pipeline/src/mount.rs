//! Mount scopes for pipeline units.
//!
//! A mount is a path prefix compared segment by segment: `/api` accepts
//! `/api`, `/api/` and `/api/users`, never `/apix`. Repeated and trailing
//! slashes are ignored on both sides and the comparison is case-sensitive.
//!
//! Request paths are normalized before comparison: `.` segments are dropped
//! and `..` removes the previous segment, never climbing above the root.
//! Percent-encoded dots (`%2e`) count as dots.

use std::fmt;
use std::sync::Arc;

use crate::exception::{Error, Result};

/// Normalized mount prefix
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct MountPath {
	segments: Arc<[String]>,
}

impl MountPath {
	/// Mount that matches every path
	///
	/// # Examples
	///
	/// ```
	/// use strand_pipeline::MountPath;
	///
	/// let root = MountPath::root();
	/// assert!(root.is_root());
	/// assert!(root.matches("/anything/at/all"));
	/// ```
	pub fn root() -> Self {
		Self {
			segments: Arc::from(Vec::new()),
		}
	}

	/// Parse and normalize a mount path
	///
	/// The empty string and `/` both yield the root mount.
	///
	/// # Errors
	///
	/// Returns [`Error::Configuration`] when the mount does not start with
	/// `/`, carries a query or fragment, contains whitespace, or includes
	/// `.`/`..` segments.
	///
	/// # Examples
	///
	/// ```
	/// use strand_pipeline::MountPath;
	///
	/// let mount = MountPath::parse("//api//v1/").unwrap();
	/// assert_eq!(mount.as_string(), "/api/v1");
	///
	/// assert!(MountPath::parse("api").is_err());
	/// assert!(MountPath::parse("/api/../admin").is_err());
	/// ```
	pub fn parse(raw: &str) -> Result<Self> {
		if raw.is_empty() {
			return Ok(Self::root());
		}
		if !raw.starts_with('/') {
			return Err(Error::configuration(format!(
				"mount path `{}` must start with `/`",
				raw
			)));
		}
		if raw.contains(['?', '#']) || raw.chars().any(char::is_whitespace) {
			return Err(Error::configuration(format!(
				"mount path `{}` may only contain path segments",
				raw
			)));
		}

		let segments: Vec<String> = segments(raw).map(str::to_string).collect();
		if segments.iter().any(|s| s == "." || s == "..") {
			return Err(Error::configuration(format!(
				"mount path `{}` must not contain relative segments",
				raw
			)));
		}

		Ok(Self {
			segments: Arc::from(segments),
		})
	}

	/// Whether this mount accepts every path
	pub fn is_root(&self) -> bool {
		self.segments.is_empty()
	}

	/// Whether `path` lies inside this mount
	///
	/// # Examples
	///
	/// ```
	/// use strand_pipeline::MountPath;
	///
	/// let mount = MountPath::parse("/api").unwrap();
	/// assert!(mount.matches("/api"));
	/// assert!(mount.matches("/api/users"));
	/// assert!(!mount.matches("/apiusers"));
	/// assert!(!mount.matches("/API/users"));
	/// assert!(mount.matches("/./api/users"));
	/// assert!(mount.matches("/other/../api"));
	/// assert!(!mount.matches("/api/../other"));
	/// ```
	pub fn matches(&self, path: &str) -> bool {
		self.matches_segments(&normalized_segments(path))
	}

	fn matches_segments(&self, candidate: &[&str]) -> bool {
		candidate.len() >= self.segments.len()
			&& self
				.segments
				.iter()
				.zip(candidate)
				.all(|(expected, actual)| expected == actual)
	}

	/// Remainder of `path` below this mount, normalized and rooted at `/`
	///
	/// Returns `None` when the path lies outside the mount.
	///
	/// # Examples
	///
	/// ```
	/// use strand_pipeline::MountPath;
	///
	/// let mount = MountPath::parse("/static").unwrap();
	/// assert_eq!(mount.strip("/static/css//site.css").as_deref(), Some("/css/site.css"));
	/// assert_eq!(mount.strip("/static").as_deref(), Some("/"));
	/// assert_eq!(mount.strip("/other"), None);
	/// assert_eq!(mount.strip("/static/img/../css/./a.css").as_deref(), Some("/css/a.css"));
	/// ```
	pub fn strip(&self, path: &str) -> Option<String> {
		let candidate = normalized_segments(path);
		if !self.matches_segments(&candidate) {
			return None;
		}
		Some(format!("/{}", candidate[self.segments.len()..].join("/")))
	}

	/// Normalized textual form (`/` for the root mount)
	pub fn as_string(&self) -> String {
		format!("/{}", self.segments.join("/"))
	}
}

impl Default for MountPath {
	fn default() -> Self {
		Self::root()
	}
}

impl fmt::Display for MountPath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.as_string())
	}
}

impl fmt::Debug for MountPath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "MountPath({})", self.as_string())
	}
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
	path.split('/').filter(|segment| !segment.is_empty())
}

fn is_current_dir(segment: &str) -> bool {
	segment == "." || segment.eq_ignore_ascii_case("%2e")
}

fn is_parent_dir(segment: &str) -> bool {
	segment == ".."
		|| segment.eq_ignore_ascii_case("%2e%2e")
		|| segment.eq_ignore_ascii_case(".%2e")
		|| segment.eq_ignore_ascii_case("%2e.")
}

/// Request path segments with dot segments resolved, clamped at the root
fn normalized_segments(path: &str) -> Vec<&str> {
	let mut resolved = Vec::new();
	for segment in segments(path) {
		if is_current_dir(segment) {
			continue;
		}
		if is_parent_dir(segment) {
			resolved.pop();
			continue;
		}
		resolved.push(segment);
	}
	resolved
}
