//! Call handles.
//!
//! [`begin_call`] creates one call and returns its two ends. Both ends share
//! the state machine, the terminal envelope and two message channels:
//! requests flow from caller to responder, responses from responder to
//! caller. Handles are cheap to clone; clones act for the same role.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::stream::{self, Stream};
use quadrpc_common::protocol::frame::generate_call_id;
use quadrpc_common::{CallError, CallId, ChannelConfig, Outcome, Pattern, Payload, Status};
use tokio::time::Instant;

use crate::channel::MessageChannel;
use crate::deadline::{self, Termination};
use crate::envelope::StatusEnvelope;
use crate::state::{CallState, Role, StateMachine};

struct CallInner {
    id: CallId,
    pattern: Pattern,
    deadline: Option<Instant>,
    machine: Mutex<StateMachine>,
    envelope: StatusEnvelope,
    requests: MessageChannel<Payload>,
    responses: MessageChannel<Payload>,
}

impl CallInner {
    fn machine(&self) -> MutexGuard<'_, StateMachine> {
        self.machine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn channel_from(&self, role: Role) -> &MessageChannel<Payload> {
        match role {
            Role::Caller => &self.requests,
            Role::Responder => &self.responses,
        }
    }
}

/// One end of a call.
#[derive(Clone)]
pub struct CallHandle {
    role: Role,
    inner: Arc<CallInner>,
}

/// Starts a call and returns its `(caller, responder)` ends.
///
/// When `deadline` is set and a Tokio runtime is available, a timer task
/// ends the call with `DEADLINE_EXCEEDED` once the deadline passes. The
/// deadline is also checked whenever either end sends, receives or waits.
///
/// # Example
///
/// ```
/// use quadrpc_common::{ChannelConfig, Pattern};
/// use quadrpc_core::begin_call;
/// use serde_json::json;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let (caller, responder) = begin_call(Pattern::Unary, None, &ChannelConfig::default());
///
/// caller.send(json!({"a": 10, "b": 40})).await.unwrap();
/// let request = responder.recv().await.unwrap().unwrap();
/// let sum = request["a"].as_i64().unwrap() + request["b"].as_i64().unwrap();
/// responder.finish(Ok(json!({"sum": sum})));
///
/// assert_eq!(caller.wait().await, Ok(json!({"sum": 50})));
/// # }
/// ```
pub fn begin_call(
    pattern: Pattern,
    deadline: Option<Instant>,
    config: &ChannelConfig,
) -> (CallHandle, CallHandle) {
    begin_call_with_id(generate_call_id(), pattern, deadline, config)
}

/// Like [`begin_call`], with an id chosen by the caller (for example the id
/// carried by an incoming open frame).
pub fn begin_call_with_id(
    id: CallId,
    pattern: Pattern,
    deadline: Option<Instant>,
    config: &ChannelConfig,
) -> (CallHandle, CallHandle) {
    let inner = Arc::new(CallInner {
        id,
        pattern,
        deadline,
        machine: Mutex::new(StateMachine::new(pattern)),
        envelope: StatusEnvelope::new(),
        requests: MessageChannel::new(config.capacity),
        responses: MessageChannel::new(config.capacity),
    });

    let caller = CallHandle {
        role: Role::Caller,
        inner: Arc::clone(&inner),
    };
    let responder = CallHandle {
        role: Role::Responder,
        inner,
    };

    tracing::debug!(call_id = id, %pattern, has_deadline = deadline.is_some(), "call started");

    if let Some(deadline) = deadline {
        if deadline::arm(&caller, deadline).is_none() {
            tracing::debug!(call_id = id, "no runtime for deadline timer, checking deadline on use only");
        }
    }

    (caller, responder)
}

impl CallHandle {
    pub fn id(&self) -> CallId {
        self.inner.id
    }

    pub fn pattern(&self) -> Pattern {
        self.inner.pattern
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    pub fn state(&self) -> CallState {
        self.inner.machine().state()
    }

    pub fn is_terminal(&self) -> bool {
        self.inner.envelope.is_set()
    }

    /// Terminal outcome, if the call has ended.
    pub fn outcome(&self) -> Option<Outcome> {
        self.inner.envelope.get()
    }

    /// Sends one message to the other end.
    ///
    /// Suspends while the outgoing channel is full. For unary and
    /// server-streaming calls the caller's single request half-closes its
    /// direction automatically.
    ///
    /// # Errors
    ///
    /// - `CallError::SendClosed` if this end already closed its direction or
    ///   the pattern allows no further messages from it
    /// - `CallError::Completed` if the call completed successfully
    /// - `CallError::Failed` if the call was cancelled, timed out or failed
    pub async fn send(&self, payload: Payload) -> Result<(), CallError> {
        self.check_deadline();
        if let Some(outcome) = self.outcome() {
            return Err(terminal_error(outcome));
        }

        self.reserve_send()?;

        let channel = self.inner.channel_from(self.role);
        if let Err(e) = channel.send(payload).await {
            self.inner.machine().release_send(self.role);
            return Err(self.resolve(e));
        }

        let single = self.inner.machine().on_sent(self.role);
        if single {
            self.close_send();
        }
        Ok(())
    }

    /// Receives the next message from the other end.
    ///
    /// Returns `Ok(None)` once the other end closed its direction and every
    /// buffered message was delivered. A successful terminal outcome still
    /// lets buffered messages drain; an error outcome fails immediately.
    pub async fn recv(&self) -> Result<Option<Payload>, CallError> {
        self.check_deadline();
        if let Some(Err(status)) = self.outcome() {
            return Err(CallError::Failed(status));
        }

        let channel = self.inner.channel_from(self.role.peer());
        channel.recv().await.map_err(|e| self.resolve(e))
    }

    /// Half-closes this end's sending direction. Idempotent.
    ///
    /// The other end observes end of stream after draining buffered
    /// messages. A server stream completes when the responder closes; a
    /// bidirectional stream completes when both ends have closed.
    pub fn close_send(&self) {
        let completion = {
            let mut machine = self.inner.machine();
            let completion = machine.close_send(self.role);
            self.inner.channel_from(self.role).close();
            completion
        };

        if let Some(outcome) = completion {
            self.terminate(outcome);
        }
    }

    /// Cancels the call. Returns false if it had already ended.
    pub fn cancel(&self) -> bool {
        self.terminate_with(Termination::Cancelled)
    }

    /// Ends the call with `outcome`. Returns false if it had already ended.
    ///
    /// Responders of unary and client-streaming calls deliver their single
    /// response this way.
    pub fn finish(&self, outcome: Outcome) -> bool {
        self.terminate(outcome)
    }

    /// Waits for the terminal outcome.
    pub async fn wait(&self) -> Outcome {
        self.check_deadline();
        self.inner.envelope.wait().await
    }

    /// Resolves once the call has reached any terminal state.
    ///
    /// Meant for `select!` next to long-running handler work.
    pub async fn terminated(&self) {
        let _ = self.inner.envelope.wait().await;
    }

    /// Incoming messages as a stream.
    ///
    /// The stream ends at end of stream or after yielding the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<Payload, CallError>> + Send + 'static {
        stream::unfold(Some(self), |handle| async move {
            let handle = handle?;
            match handle.recv().await {
                Ok(Some(payload)) => Some((Ok(payload), Some(handle))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }

    /// Ends the call with a cancellation-class status.
    ///
    /// Shared by explicit cancellation and deadline expiry; whichever comes
    /// first decides the outcome.
    pub(crate) fn terminate_with(&self, kind: Termination) -> bool {
        let status = match kind {
            Termination::Cancelled => Status::cancelled(format!("call cancelled by {}", self.role)),
            Termination::DeadlineExceeded => Status::deadline_exceeded("deadline exceeded"),
        };
        self.terminate(Err(status))
    }

    fn terminate(&self, outcome: Outcome) -> bool {
        let mut machine = self.inner.machine();
        if !machine.terminate(&outcome) {
            return false;
        }
        self.inner.envelope.set(outcome.clone());

        let state = machine.state();
        match outcome {
            Ok(_) => {
                self.inner.requests.close();
                self.inner.responses.close();
                tracing::debug!(call_id = self.id(), %state, "call completed");
            }
            Err(status) => {
                self.inner.requests.abort(status.clone());
                self.inner.responses.abort(status.clone());
                tracing::debug!(call_id = self.id(), %state, %status, "call ended");
            }
        }
        true
    }

    fn check_deadline(&self) {
        if let Some(deadline) = self.inner.deadline {
            if Instant::now() >= deadline {
                self.terminate_with(Termination::DeadlineExceeded);
            }
        }
    }

    /// Claims a send slot on this end's direction.
    ///
    /// The call may end between the outcome check in `send` and this point;
    /// the terminal outcome is still reported instead of `SendClosed`.
    fn reserve_send(&self) -> Result<(), CallError> {
        let reserved = self.inner.machine().reserve_send(self.role);
        reserved.map_err(|e| self.resolve(e))
    }

    /// Prefers the terminal outcome over a channel-level error so that every
    /// operation on an ended call reports the same reason.
    fn resolve(&self, err: CallError) -> CallError {
        match self.outcome() {
            Some(outcome) => terminal_error(outcome),
            None => err,
        }
    }
}

impl std::fmt::Debug for CallHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallHandle")
            .field("id", &self.inner.id)
            .field("pattern", &self.inner.pattern)
            .field("role", &self.role)
            .field("state", &self.state())
            .finish()
    }
}

fn terminal_error(outcome: Outcome) -> CallError {
    match outcome {
        Ok(_) => CallError::Completed,
        Err(status) => CallError::Failed(status),
    }
}
