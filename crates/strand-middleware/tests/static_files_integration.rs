//! Static File Integration Tests for strand-middleware
//!
//! Serves a temporary document root through a mounted [`StaticFiles`] unit
//! backed by the local file system.


use fixtures::*;
use hyper::{Method, StatusCode};
use rstest::rstest;
use strand_middleware::{BasicAuth, ErrorHandler, StaticCredentials, StaticFiles, StaticFilesConfig};
use strand_pipeline::{Pipeline, PipelineContext};
use tempfile::TempDir;

fn pipeline(root: &TempDir, max_age: u64) -> Pipeline {
	let config = StaticFilesConfig {
		max_age,
		..StaticFilesConfig::new(root.path())
	};
	Pipeline::builder(PipelineContext::default())
		.mount("/static", StaticFiles::with_config(config))
		.unit(ErrorHandler::new())
		.build()
		.unwrap()
}

// ============================================================================
// Serving
// ============================================================================

/// Test: files and directory indexes are served with a guessed type
#[rstest]
#[case("/static/css/site.css", "body{}", "text/css")]
#[case("/static/index.html", "<h1>home</h1>", "text/html")]
#[case("/static", "<h1>home</h1>", "text/html")]
#[case("/static/docs/", "<h1>docs</h1>", "text/html")]
#[tokio::test]
async fn test_serves_files(
	doc_root: TempDir,
	#[case] uri: &str,
	#[case] body: &str,
	#[case] content_type: &str,
) {
	let pipeline = pipeline(&doc_root, 0);

	let response = pipeline.dispatch(get(uri)).await;

	assert_eq!(response.status, StatusCode::OK);
	assert_eq!(response.body_text(), body);
	assert_eq!(response.header("content-type"), Some(content_type));
	assert_eq!(response.header("cache-control"), None);
}

/// Test: HEAD carries the headers without the body
#[rstest]
#[tokio::test]
async fn test_head_has_no_body(doc_root: TempDir) {
	let pipeline = pipeline(&doc_root, 3600);

	let response = pipeline.dispatch(request(Method::HEAD, "/static/css/site.css")).await;

	assert_eq!(response.status, StatusCode::OK);
	assert!(response.body.is_empty());
	assert_eq!(response.header("content-length"), Some("6"));
	assert_eq!(response.header("cache-control"), Some("public, max-age=3600"));
}

// ============================================================================
// Pass-through and rejection
// ============================================================================

/// Test: unknown files, dotfiles, other methods and other mounts fall
/// through to the 404
#[rstest]
#[case(Method::GET, "/static/missing.txt")]
#[case(Method::GET, "/static/.env")]
#[case(Method::POST, "/static/css/site.css")]
#[case(Method::GET, "/css/site.css")]
#[tokio::test]
async fn test_falls_through(doc_root: TempDir, #[case] method: Method, #[case] uri: &str) {
	let pipeline = pipeline(&doc_root, 0);

	let response = pipeline.dispatch(request(method, uri)).await;

	assert_eq!(response.status, StatusCode::NOT_FOUND);
}

/// Test: traversal attempts are refused
#[rstest]
#[case("/static/css%5C..%5Csecret")]
#[case("/static/css%2f..%2f..%2fsecret")]
#[case("/static/a%00.txt")]
#[tokio::test]
async fn test_traversal_forbidden(doc_root: TempDir, #[case] uri: &str) {
	let pipeline = pipeline(&doc_root, 0);

	let response = pipeline.dispatch(get(uri)).await;

	assert_eq!(response.status, StatusCode::FORBIDDEN);
	assert_eq!(response.body_text(), "Forbidden");
}

/// Test: dot segments climbing out of the mount take the request out of
/// the unit's scope instead of reaching the parent directory
#[rstest]
#[case("/static/../secret")]
#[case("/static/%2e%2e/secret")]
#[tokio::test]
async fn test_parent_segments_leave_mount(doc_root: TempDir, #[case] uri: &str) {
	let pipeline = pipeline(&doc_root, 0);

	let response = pipeline.dispatch(get(uri)).await;

	assert_eq!(response.status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Protected subtrees
// ============================================================================

/// Test: a file below an authenticated mount cannot be fetched by spelling
/// its path with dot segments or encoded separators
#[rstest]
#[case("/secure/data.txt")]
#[case("/./secure/data.txt")]
#[case("/x/../secure/data.txt")]
#[case("/%2e/secure/data.txt")]
#[case("/x/%2e%2e/secure/data.txt")]
#[case("/secure/./data.txt")]
#[tokio::test]
async fn test_dot_segments_do_not_bypass_auth(#[case] uri: &str) {
	let dir = tempfile::tempdir().unwrap();
	std::fs::create_dir_all(dir.path().join("secure")).unwrap();
	std::fs::write(dir.path().join("secure/data.txt"), "TOP SECRET").unwrap();
	let pipeline = Pipeline::builder(PipelineContext::default())
		.mount("/secure", BasicAuth::new(StaticCredentials::new().with_user("admin", "s3cret")))
		.mount("/", StaticFiles::new(dir.path()))
		.mount("/", ErrorHandler::new())
		.build()
		.unwrap();

	let response = pipeline.dispatch(get(uri)).await;

	assert_eq!(response.status, StatusCode::UNAUTHORIZED);
	assert!(!response.body_text().contains("TOP SECRET"));
}

/// Test: an encoded separator never reaches the protected file
#[rstest]
#[tokio::test]
async fn test_encoded_separator_refused() {
	let dir = tempfile::tempdir().unwrap();
	std::fs::create_dir_all(dir.path().join("secure")).unwrap();
	std::fs::write(dir.path().join("secure/data.txt"), "TOP SECRET").unwrap();
	let pipeline = Pipeline::builder(PipelineContext::default())
		.mount("/secure", BasicAuth::new(StaticCredentials::new().with_user("admin", "s3cret")))
		.mount("/", StaticFiles::new(dir.path()))
		.mount("/", ErrorHandler::new())
		.build()
		.unwrap();

	let response = pipeline.dispatch(get("/secure%2fdata.txt")).await;

	assert_eq!(response.status, StatusCode::FORBIDDEN);
}
