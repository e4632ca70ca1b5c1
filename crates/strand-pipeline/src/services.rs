//! Shared services reachable from every unit through the pipeline context.
//!
//! The pipeline consumes these through narrow traits. Each trait ships with
//! one in-process implementation so a pipeline can be assembled without
//! external infrastructure.

use async_trait::async_trait;
use bytes::Bytes;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::sync::broadcast;

// ============================================================================
// Event bus
// ============================================================================

/// Lifecycle events published while walking requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
	/// A walk began
	RequestStarted {
		walk: u64,
		method: String,
		path: String,
	},
	/// A unit diverted the walk into the error phase
	RequestFailed {
		walk: u64,
		status: u16,
		message: String,
	},
	/// The walk produced its final response
	RequestFinished {
		walk: u64,
		status: u16,
		elapsed: Duration,
	},
}

/// Messaging facility shared by a pipeline
pub trait EventBus: Send + Sync {
	/// Publish an event; publishing never blocks the caller
	fn publish(&self, event: PipelineEvent);
}

/// Event bus backed by a tokio broadcast channel
///
/// Slow subscribers lose the oldest events once `capacity` is exceeded.
///
/// # Examples
///
/// ```
/// use strand_pipeline::services::{BroadcastEventBus, EventBus, PipelineEvent};
///
/// let bus = BroadcastEventBus::new(8);
/// let mut events = bus.subscribe();
/// bus.publish(PipelineEvent::RequestStarted {
///     walk: 1,
///     method: "GET".to_string(),
///     path: "/".to_string(),
/// });
/// assert!(events.try_recv().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct BroadcastEventBus {
	sender: broadcast::Sender<PipelineEvent>,
}

impl BroadcastEventBus {
	/// Create a bus retaining at most `capacity` undelivered events
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity.max(1));
		Self { sender }
	}

	/// Receive every event published from now on
	pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
		self.sender.subscribe()
	}

	/// Number of live subscribers
	pub fn subscriber_count(&self) -> usize {
		self.sender.receiver_count()
	}
}

impl Default for BroadcastEventBus {
	fn default() -> Self {
		Self::new(256)
	}
}

impl EventBus for BroadcastEventBus {
	fn publish(&self, event: PipelineEvent) {
		// No subscribers is not an error
		let _ = self.sender.send(event);
	}
}

// ============================================================================
// File system
// ============================================================================

/// Error type for file-system access
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum FsError {
	#[error("Not found: {0}")]
	NotFound(PathBuf),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}

/// Metadata returned by [`FileSystem::metadata`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
	pub len: u64,
	pub is_file: bool,
	pub modified: Option<SystemTime>,
}

/// Asynchronous file access shared by a pipeline
#[async_trait]
pub trait FileSystem: Send + Sync {
	/// Read a whole file
	async fn read(&self, path: &Path) -> Result<Bytes, FsError>;

	/// Stat a path
	async fn metadata(&self, path: &Path) -> Result<FileMetadata, FsError>;
}

/// File system backed by `tokio::fs`
#[derive(Debug, Clone, Default)]
pub struct LocalFileSystem;

impl LocalFileSystem {
	/// Create a local file system handle
	pub fn new() -> Self {
		Self
	}
}

fn map_io(path: &Path, error: std::io::Error) -> FsError {
	if error.kind() == std::io::ErrorKind::NotFound {
		FsError::NotFound(path.to_path_buf())
	} else {
		FsError::Io(error)
	}
}

#[async_trait]
impl FileSystem for LocalFileSystem {
	async fn read(&self, path: &Path) -> Result<Bytes, FsError> {
		tokio::fs::read(path)
			.await
			.map(Bytes::from)
			.map_err(|e| map_io(path, e))
	}

	async fn metadata(&self, path: &Path) -> Result<FileMetadata, FsError> {
		let metadata = tokio::fs::metadata(path).await.map_err(|e| map_io(path, e))?;
		Ok(FileMetadata {
			len: metadata.len(),
			is_file: metadata.is_file(),
			modified: metadata.modified().ok(),
		})
	}
}

// ============================================================================
// Security
// ============================================================================

/// Signing facility shared by a pipeline
pub trait Security: Send + Sync {
	/// Sign `value`, returning `value.signature`
	fn sign(&self, value: &str) -> String;

	/// Verify a signed value and return the original
	fn unsign(&self, signed: &str) -> Option<String>;
}

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 signer
///
/// # Examples
///
/// ```
/// use strand_pipeline::services::{HmacSecurity, Security};
///
/// let security = HmacSecurity::new(b"secret-key").unwrap();
/// let signed = security.sign("user=42");
/// assert_eq!(security.unsign(&signed).as_deref(), Some("user=42"));
/// assert_eq!(security.unsign("user=42.deadbeef"), None);
/// ```
#[derive(Clone)]
pub struct HmacSecurity {
	mac: HmacSha256,
}

impl HmacSecurity {
	/// Create a signer from raw key bytes
	///
	/// # Errors
	///
	/// Returns [`Error::Configuration`](crate::Error::Configuration) when the
	/// key is empty or rejected by the MAC.
	pub fn new(key: impl AsRef<[u8]>) -> crate::Result<Self> {
		let key = key.as_ref();
		if key.is_empty() {
			return Err(crate::Error::configuration("signing key must not be empty"));
		}
		let mac = <HmacSha256 as Mac>::new_from_slice(key)
			.map_err(|e| crate::Error::configuration(format!("invalid signing key: {}", e)))?;
		Ok(Self { mac })
	}
}

impl std::fmt::Debug for HmacSecurity {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HmacSecurity").finish_non_exhaustive()
	}
}

impl Security for HmacSecurity {
	fn sign(&self, value: &str) -> String {
		let mut mac = self.mac.clone();
		mac.update(value.as_bytes());
		format!("{}.{}", value, hex::encode(mac.finalize().into_bytes()))
	}

	fn unsign(&self, signed: &str) -> Option<String> {
		let (value, signature) = signed.rsplit_once('.')?;
		let signature = hex::decode(signature).ok()?;
		let mut mac = self.mac.clone();
		mac.update(value.as_bytes());
		mac.verify_slice(&signature).ok()?;
		Some(value.to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::io::Write;

	#[rstest]
	fn test_publish_without_subscribers_is_silent() {
		let bus = BroadcastEventBus::new(4);

		bus.publish(PipelineEvent::RequestFinished {
			walk: 0,
			status: 200,
			elapsed: Duration::ZERO,
		});

		assert_eq!(bus.subscriber_count(), 0);
	}

	#[rstest]
	fn test_tampered_signature_is_rejected() {
		let security = HmacSecurity::new("k").unwrap();
		let signed = security.sign("role=user");
		let tampered = signed.replacen("role=user", "role=admin", 1);

		assert_eq!(security.unsign(&tampered), None);
	}

	#[rstest]
	fn test_empty_key_is_rejected() {
		assert!(HmacSecurity::new("").is_err());
	}

	#[rstest]
	fn test_different_keys_disagree() {
		let signed = HmacSecurity::new("one").unwrap().sign("value");

		assert_eq!(HmacSecurity::new("two").unwrap().unsign(&signed), None);
	}

	#[rstest]
	#[tokio::test]
	async fn test_local_file_system_reads_and_stats() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(b"hello").unwrap();
		let fs = LocalFileSystem::new();

		let body = fs.read(file.path()).await.unwrap();
		let metadata = fs.metadata(file.path()).await.unwrap();

		assert_eq!(body, Bytes::from("hello"));
		assert_eq!(metadata.len, 5);
		assert!(metadata.is_file);
	}

	#[rstest]
	#[tokio::test]
	async fn test_local_file_system_missing_file() {
		let dir = tempfile::tempdir().unwrap();
		let missing = dir.path().join("missing.txt");

		let result = LocalFileSystem::new().read(&missing).await;

		assert!(matches!(result, Err(FsError::NotFound(path)) if path == missing));
	}
}
