//! Dispatch Integration Tests for strand-pipeline
//!
//! Exercises the walk state machine end to end:
//!
//! ## Normal phase
//! - Exhaustion synthesizes a single 404
//! - Responding halts the walk
//!
//! ## Error phase
//! - A cause restarts the scan at the first matching error unit
//! - Causes carry forward and can be replaced
//!
//! ## Continuations
//! - Deferred continuations resolved from other tasks
//! - Contract violations answered with a 500


use fixtures::*;
use hyper::StatusCode;
use rstest::rstest;
use std::sync::Arc;
use strand_pipeline::services::{BroadcastEventBus, PipelineEvent};
use strand_pipeline::{Cause, Pipeline, PipelineContext};

// ============================================================================
// Normal Phase
// ============================================================================

/// Test: every normal unit proceeds, exactly one 404 results
#[rstest]
#[tokio::test]
async fn test_exhausted_normal_phase_yields_single_not_found(journal: Journal) {
	let first = Scripted::proceeding("first", &journal);
	let second = Scripted::proceeding("second", &journal);
	let third = Scripted::proceeding("third", &journal);
	let counters = [first.counter(), second.counter(), third.counter()];

	let pipeline = Pipeline::builder(PipelineContext::default())
		.unit(first)
		.mount("/", second)
		.unit(third)
		.build()
		.unwrap();

	let response = pipeline.dispatch(get("/anything")).await;

	assert_eq!(response.status, StatusCode::NOT_FOUND);
	assert_eq!(response.body_text(), "Not Found");
	assert_eq!(journal.entries(), vec!["first", "second", "third"]);
	for counter in &counters {
		assert_eq!(calls(counter), 1);
	}
}

/// Test: a responding unit stops the walk; later units observe nothing
#[rstest]
#[tokio::test]
async fn test_response_halts_dispatch(journal: Journal) {
	let before = Scripted::proceeding("before", &journal);
	let responder = Scripted::new("responder", Action::Respond(StatusCode::CREATED), &journal);
	let after = Scripted::proceeding("after", &journal);
	let after_error = Scripted::proceeding("after-error", &journal).error_handler();
	let (after_calls, after_error_calls) = (after.counter(), after_error.counter());

	let pipeline = Pipeline::builder(PipelineContext::default())
		.unit(before)
		.unit(responder)
		.unit(after)
		.unit(after_error)
		.build()
		.unwrap();

	let response = pipeline.dispatch(get("/")).await;

	assert_eq!(response.status, StatusCode::CREATED);
	assert_eq!(response.body_text(), "responder");
	assert_eq!(calls(&after_calls), 0);
	assert_eq!(calls(&after_error_calls), 0);
}

/// Test: error units never run in the normal phase
#[rstest]
#[tokio::test]
async fn test_error_units_skipped_without_cause(journal: Journal) {
	let handler = Scripted::new("handler", Action::Respond(StatusCode::OK), &journal).error_handler();
	let counter = handler.counter();

	let pipeline = Pipeline::builder(PipelineContext::default())
		.unit(handler)
		.unit(Scripted::proceeding("normal", &journal))
		.build()
		.unwrap();

	let response = pipeline.dispatch(get("/")).await;

	assert_eq!(response.status, StatusCode::NOT_FOUND);
	assert_eq!(calls(&counter), 0);
}

// ============================================================================
// Mount Filtering
// ============================================================================

#[rstest]
#[case("/api/users", 1)]
#[case("/api", 1)]
#[case("/apiusers", 0)]
#[case("/other", 0)]
#[tokio::test]
async fn test_mount_prefix_matching(#[case] path: &str, #[case] expected: usize) {
	let journal = Journal::default();
	let api = Scripted::proceeding("api", &journal);
	let counter = api.counter();

	let pipeline = Pipeline::builder(PipelineContext::default())
		.mount("/api", api)
		.build()
		.unwrap();

	pipeline.dispatch(get(path)).await;

	assert_eq!(calls(&counter), expected);
}

/// Test: dot segments cannot route a request around a mounted guard
#[rstest]
#[case("/secure/x")]
#[case("/./secure/x")]
#[case("/x/../secure/x")]
#[case("/../secure/x")]
#[case("/%2e/secure/x")]
#[case("/x/%2E%2E/secure/x")]
#[tokio::test]
async fn test_dot_segments_resolved_before_mount_matching(journal: Journal, #[case] path: &str) {
	let guard = Scripted::new("guard", Action::Fail(Cause::from(StatusCode::UNAUTHORIZED)), &journal);
	let open = Scripted::new("open", Action::Respond(StatusCode::OK), &journal);
	let render = Scripted::new("render", Action::RespondWithCause, &journal).error_handler();

	let pipeline = Pipeline::builder(PipelineContext::default())
		.mount("/secure", guard)
		.unit(open)
		.unit(render)
		.build()
		.unwrap();

	let response = pipeline.dispatch(get(path)).await;

	assert_eq!(response.status, StatusCode::UNAUTHORIZED);
	assert_eq!(journal.entries(), vec!["guard", "render!401"]);
}

/// Test: leaving a mount through `..` takes the request out of its scope
#[rstest]
#[tokio::test]
async fn test_parent_segment_leaves_mount(journal: Journal) {
	let guard = Scripted::new("guard", Action::Fail(Cause::from(StatusCode::UNAUTHORIZED)), &journal);
	let counter = guard.counter();

	let pipeline = Pipeline::builder(PipelineContext::default())
		.mount("/secure", guard)
		.build()
		.unwrap();

	let response = pipeline.dispatch(get("/secure/../public/x")).await;

	assert_eq!(response.status, StatusCode::NOT_FOUND);
	assert_eq!(calls(&counter), 0);
}

// ============================================================================
// Error Phase
// ============================================================================

/// Test: a cause skips the remaining normal units and restarts the scan at
/// the first error unit, even one registered before the failing unit
#[rstest]
#[tokio::test]
async fn test_cause_routes_to_first_error_unit(journal: Journal) {
	let teapot = Cause::new(StatusCode::IM_A_TEAPOT, "short and stout");
	let early_error = Scripted::new("early-error", Action::RespondWithCause, &journal).error_handler();
	let late_error = Scripted::new("late-error", Action::RespondWithCause, &journal).error_handler();
	let skipped = Scripted::proceeding("skipped", &journal);
	let (late_calls, skipped_calls) = (late_error.counter(), skipped.counter());

	let pipeline = Pipeline::builder(PipelineContext::default())
		.unit(Scripted::proceeding("n1", &journal))
		.unit(early_error)
		.unit(Scripted::new("n2", Action::Fail(teapot), &journal))
		.unit(skipped)
		.unit(late_error)
		.build()
		.unwrap();

	let response = pipeline.dispatch(get("/")).await;

	assert_eq!(response.status, StatusCode::IM_A_TEAPOT);
	assert_eq!(response.body_text(), "early-error");
	assert_eq!(journal.entries(), vec!["n1", "n2", "early-error!418"]);
	assert_eq!(calls(&skipped_calls), 0);
	assert_eq!(calls(&late_calls), 0);
}

/// Test: error units are mount-filtered like normal units
#[rstest]
#[tokio::test]
async fn test_error_units_respect_mounts(journal: Journal) {
	let elsewhere = Scripted::new("elsewhere", Action::RespondWithCause, &journal).error_handler();
	let counter = elsewhere.counter();

	let pipeline = Pipeline::builder(PipelineContext::default())
		.mount("/admin", elsewhere)
		.unit(Scripted::new("fail", Action::Fail(Cause::from(StatusCode::FORBIDDEN)), &journal))
		.unit(Scripted::new("global", Action::RespondWithCause, &journal).error_handler())
		.build()
		.unwrap();

	let response = pipeline.dispatch(get("/shop")).await;

	assert_eq!(response.status, StatusCode::FORBIDDEN);
	assert_eq!(response.body_text(), "global");
	assert_eq!(calls(&counter), 0);
}

/// Test: proceeding in the error phase carries the cause forward
#[rstest]
#[tokio::test]
async fn test_cause_carries_forward(journal: Journal) {
	let pipeline = Pipeline::builder(PipelineContext::default())
		.unit(Scripted::new("fail", Action::Fail(Cause::from(StatusCode::CONFLICT)), &journal))
		.unit(Scripted::proceeding("log-error", &journal).error_handler())
		.unit(Scripted::new("render", Action::RespondWithCause, &journal).error_handler())
		.build()
		.unwrap();

	let response = pipeline.dispatch(get("/")).await;

	assert_eq!(response.status, StatusCode::CONFLICT);
	assert_eq!(journal.entries(), vec!["fail", "log-error!409", "render!409"]);
}

/// Test: failing again in the error phase replaces the cause and moves on
#[rstest]
#[tokio::test]
async fn test_error_phase_failure_replaces_cause(journal: Journal) {
	let gateway = Cause::new(StatusCode::BAD_GATEWAY, "upstream refused");

	let pipeline = Pipeline::builder(PipelineContext::default())
		.unit(Scripted::new("fail", Action::Fail(Cause::from(StatusCode::CONFLICT)), &journal))
		.unit(Scripted::new("rethrow", Action::Fail(gateway), &journal).error_handler())
		.unit(Scripted::proceeding("observe", &journal).error_handler())
		.build()
		.unwrap();

	let response = pipeline.dispatch(get("/")).await;

	assert_eq!(response.status, StatusCode::BAD_GATEWAY);
	assert_eq!(response.body_text(), "Bad Gateway");
	assert_eq!(journal.entries(), vec!["fail", "rethrow!409", "observe!502"]);
}

/// Test: server-side detail reaches the client only in debug mode
#[rstest]
#[tokio::test]
async fn test_debug_exposes_exhausted_cause(journal: Journal) {
	let context = PipelineContext::builder().debug(true).build();
	let pipeline = Pipeline::builder(context)
		.unit(Scripted::new("fail", Action::Fail(Cause::internal("disk full")), &journal))
		.build()
		.unwrap();

	let response = pipeline.dispatch(get("/")).await;

	assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(response.body_text(), "disk full");
}

// ============================================================================
// Continuations
// ============================================================================

/// Test: continuations signalled from spawned tasks resume the walk
#[rstest]
#[tokio::test]
async fn test_deferred_continuations(journal: Journal) {
	let pipeline = Pipeline::builder(PipelineContext::default())
		.unit(Scripted::new("async-proceed", Action::DeferProceed, &journal))
		.unit(Scripted::new("async-respond", Action::DeferRespond(StatusCode::ACCEPTED), &journal))
		.build()
		.unwrap();

	let response = pipeline.dispatch(get("/")).await;

	assert_eq!(response.status, StatusCode::ACCEPTED);
	assert_eq!(response.body_text(), "async-respond");
}

/// Test: dropping a deferred continuation is answered loudly with a 500
#[rstest]
#[tokio::test]
async fn test_dropped_continuation_is_protocol_violation(journal: Journal) {
	let after = Scripted::proceeding("after", &journal);
	let error_unit = Scripted::new("error", Action::RespondWithCause, &journal).error_handler();
	let (after_calls, error_calls) = (after.counter(), error_unit.counter());

	let pipeline = Pipeline::builder(PipelineContext::default())
		.unit(Scripted::new("dropper", Action::DropContinuation, &journal))
		.unit(after)
		.unit(error_unit)
		.build()
		.unwrap();

	let response = pipeline.dispatch(get("/")).await;

	assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(calls(&after_calls), 0);
	assert_eq!(calls(&error_calls), 0);
}

/// Test: returning a flow issued to another walk is a protocol violation
#[rstest]
#[tokio::test]
async fn test_foreign_flow_is_protocol_violation() {
	let pipeline = Pipeline::builder(PipelineContext::default())
		.unit(FlowExchanger::default())
		.build()
		.unwrap();

	let (first, second) = tokio::join!(pipeline.dispatch(get("/a")), pipeline.dispatch(get("/b")));

	assert_eq!(first.status, StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(second.status, StatusCode::INTERNAL_SERVER_ERROR);
}

/// Test: concurrent walks on a shared pipeline stay independent
#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_walks_are_independent(journal: Journal) {
	let pipeline = Arc::new(
		Pipeline::builder(PipelineContext::default())
			.mount("/ok", Scripted::new("ok", Action::DeferRespond(StatusCode::OK), &journal))
			.mount("/fail", Scripted::new("fail", Action::Fail(Cause::from(StatusCode::GONE)), &journal))
			.build()
			.unwrap(),
	);

	let handles: Vec<_> = (0..32)
		.map(|i| {
			let pipeline = Arc::clone(&pipeline);
			let path = if i % 2 == 0 { "/ok/item" } else { "/fail/item" };
			tokio::spawn(async move { (i, pipeline.dispatch(get(path)).await) })
		})
		.collect();

	for handle in handles {
		let (i, response) = handle.await.unwrap();
		let expected = if i % 2 == 0 { StatusCode::OK } else { StatusCode::GONE };
		assert_eq!(response.status, expected);
	}
	assert_eq!(journal.entries().len(), 32);
}

// ============================================================================
// Events and Hooks
// ============================================================================

/// Test: lifecycle events are published in order when enabled
#[rstest]
#[tokio::test]
async fn test_events_published(journal: Journal) {
	let bus = Arc::new(BroadcastEventBus::new(16));
	let mut events = bus.subscribe();
	let context = PipelineContext::builder().event_bus(bus.clone()).build();
	let pipeline = Pipeline::builder(context)
		.emit_events(true)
		.unit(Scripted::new("fail", Action::Fail(Cause::from(StatusCode::UNAUTHORIZED)), &journal))
		.build()
		.unwrap();

	pipeline.dispatch(get("/secure")).await;

	assert!(matches!(
		events.try_recv().unwrap(),
		PipelineEvent::RequestStarted { walk: 0, ref path, .. } if path == "/secure"
	));
	assert!(matches!(
		events.try_recv().unwrap(),
		PipelineEvent::RequestFailed { walk: 0, status: 401, .. }
	));
	assert!(matches!(
		events.try_recv().unwrap(),
		PipelineEvent::RequestFinished { walk: 0, status: 401, .. }
	));
	assert!(events.try_recv().is_err());
}

/// Test: nothing is published unless enabled
#[rstest]
#[tokio::test]
async fn test_events_disabled_by_default(journal: Journal) {
	let bus = Arc::new(BroadcastEventBus::new(16));
	let mut events = bus.subscribe();
	let context = PipelineContext::builder().event_bus(bus.clone()).build();
	let pipeline = Pipeline::builder(context)
		.unit(Scripted::proceeding("only", &journal))
		.build()
		.unwrap();

	pipeline.dispatch(get("/")).await;

	assert!(events.try_recv().is_err());
}

/// Test: response hooks decorate synthesized responses too
#[rstest]
#[tokio::test]
async fn test_response_hooks_apply_to_synthesized_response() {
	let pipeline = Pipeline::builder(PipelineContext::default()).build().unwrap();
	let mut request = get("/missing");
	request.on_response(|response| response.set_header("x-trace", "1"));

	let response = pipeline.dispatch(request).await;

	assert_eq!(response.status, StatusCode::NOT_FOUND);
	assert_eq!(response.header("x-trace"), Some("1"));
}
