//! Continuation tokens handed to units.
//!
//! Every dispatch gives the unit one [`Next`]. Each way of finishing the
//! stage consumes it and yields the [`Flow`] the unit must return, so a unit
//! cannot both respond and continue, nor continue twice. A unit that needs to
//! finish from another task calls [`Next::defer`] and moves the resulting
//! [`Continuation`] there; dropping that continuation without signalling it
//! is reported as a protocol violation.

use std::fmt;
use std::sync::Arc;
use strand_http::Response;
use tokio::sync::oneshot;

use crate::cause::Cause;
use crate::context::PipelineContext;
use crate::exception::{Error, Result};
use crate::mount::MountPath;
use crate::unit::Binding;

/// Identifies one dispatch of one stage within one walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Ticket {
	pub(crate) walk: u64,
	pub(crate) stage: usize,
}

/// How a stage finished
#[derive(Debug)]
pub enum Signal {
	/// Hand control to the next eligible stage in the current phase
	Proceed,
	/// Divert the walk into the error phase
	Fail(Cause),
	/// Finalize the walk with this response
	Respond(Response),
}

/// Consuming continuation for a single dispatch
pub struct Next {
	ticket: Ticket,
	binding: Binding,
	cause: Option<Cause>,
}

impl Next {
	pub(crate) fn new(ticket: Ticket, binding: Binding, cause: Option<Cause>) -> Self {
		Self {
			ticket,
			binding,
			cause,
		}
	}

	/// Continue with the next eligible stage
	pub fn proceed(self) -> Flow {
		Flow::ready(self.ticket, Signal::Proceed)
	}

	/// Abort the normal phase and route `cause` to the error units
	///
	/// Inside the error phase the new cause replaces the current one.
	pub fn fail(self, cause: impl Into<Cause>) -> Flow {
		Flow::ready(self.ticket, Signal::Fail(cause.into()))
	}

	/// Finalize the walk; no later stage observes the request
	pub fn respond(self, response: Response) -> Flow {
		Flow::ready(self.ticket, Signal::Respond(response))
	}

	/// Split into a continuation that can be signalled from another task
	/// and the flow the unit returns right away
	pub fn defer(self) -> (Continuation, Flow) {
		let (sender, receiver) = oneshot::channel();
		let continuation = Continuation {
			ticket: self.ticket,
			sender,
		};
		let flow = Flow {
			ticket: self.ticket,
			state: FlowState::Deferred(receiver),
		};
		(continuation, flow)
	}

	/// Mount this unit was bound at
	pub fn mount(&self) -> &MountPath {
		self.binding.mount()
	}

	/// Shared pipeline services
	pub fn context(&self) -> &Arc<PipelineContext> {
		self.binding.context()
	}

	/// Cause being handled, present only during the error phase
	pub fn cause(&self) -> Option<&Cause> {
		self.cause.as_ref()
	}
}

impl fmt::Debug for Next {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Next")
			.field("walk", &self.ticket.walk)
			.field("stage", &self.ticket.stage)
			.field("mount", self.binding.mount())
			.field("cause", &self.cause)
			.finish()
	}
}

/// Continuation detached from the unit's `handle` call
///
/// Signalled at most once; signalling consumes it.
pub struct Continuation {
	ticket: Ticket,
	sender: oneshot::Sender<Signal>,
}

impl Continuation {
	/// Continue with the next eligible stage
	pub fn proceed(self) {
		self.send(Signal::Proceed);
	}

	/// Divert the walk into the error phase
	pub fn fail(self, cause: impl Into<Cause>) {
		self.send(Signal::Fail(cause.into()));
	}

	/// Finalize the walk with `response`
	pub fn respond(self, response: Response) {
		self.send(Signal::Respond(response));
	}

	fn send(self, signal: Signal) {
		if self.sender.send(signal).is_err() {
			// The walk stopped waiting, typically because its deadline passed
			tracing::debug!(
				walk = self.ticket.walk,
				stage = self.ticket.stage,
				"continuation signalled after the walk was abandoned"
			);
		}
	}
}

impl fmt::Debug for Continuation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Continuation")
			.field("walk", &self.ticket.walk)
			.field("stage", &self.ticket.stage)
			.finish()
	}
}

enum FlowState {
	Ready(Signal),
	Deferred(oneshot::Receiver<Signal>),
}

/// Outcome a unit returns from `handle`
///
/// Only [`Next`] can produce a flow.
#[must_use = "a Flow must be returned from `handle` to continue the walk"]
pub struct Flow {
	ticket: Ticket,
	state: FlowState,
}

impl Flow {
	fn ready(ticket: Ticket, signal: Signal) -> Self {
		Self {
			ticket,
			state: FlowState::Ready(signal),
		}
	}

	/// Whether the signal is already known
	pub fn is_ready(&self) -> bool {
		matches!(self.state, FlowState::Ready(_))
	}

	/// Wait for the signal issued against `expected`
	///
	/// # Errors
	///
	/// Returns [`Error::ProtocolViolation`] when the flow was issued for a
	/// different dispatch, or when its deferred continuation was dropped
	/// without a signal.
	pub(crate) async fn resolve(self, expected: Ticket) -> Result<Signal> {
		if self.ticket != expected {
			return Err(Error::protocol_violation(format!(
				"stage {} of walk {} returned a flow issued for stage {} of walk {}",
				expected.stage, expected.walk, self.ticket.stage, self.ticket.walk
			)));
		}
		match self.state {
			FlowState::Ready(signal) => Ok(signal),
			FlowState::Deferred(receiver) => receiver.await.map_err(|_| {
				Error::protocol_violation(format!(
					"stage {} of walk {} dropped its continuation without signalling it",
					expected.stage, expected.walk
				))
			}),
		}
	}
}

impl fmt::Debug for Flow {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Flow")
			.field("walk", &self.ticket.walk)
			.field("stage", &self.ticket.stage)
			.field("ready", &self.is_ready())
			.finish()
	}
}
