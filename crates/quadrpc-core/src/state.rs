//! Call lifecycle state machine.
//!
//! ```text
//! Open ──first message──▶ Active ──one side closes──▶ HalfClosed
//!   │                       │                            │
//!   └───────────────────────┴──── terminal outcome ──────┴──▶ Completed | Cancelled | Errored
//! ```
//!
//! Terminal states are absorbing. The machine itself is plain data; the call
//! owns it behind a mutex and applies the resulting effects (closing or
//! aborting channels, publishing the outcome).

use std::fmt;

use quadrpc_common::{CallError, Code, Outcome, Pattern};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallState {
    /// Created, nothing exchanged yet.
    Open,
    /// At least one message exchanged.
    Active,
    /// One side closed its sending direction.
    HalfClosed,
    /// Terminal, successful.
    Completed,
    /// Terminal, ended by cancellation or deadline expiry.
    Cancelled,
    /// Terminal, ended by an error outcome.
    Errored,
}

impl CallState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CallState::Completed | CallState::Cancelled | CallState::Errored
        )
    }

    /// Terminal state reached with `outcome`.
    pub fn terminal_for(outcome: &Outcome) -> Self {
        match outcome {
            Ok(_) => CallState::Completed,
            Err(status) => match status.code() {
                Code::Cancelled | Code::DeadlineExceeded => CallState::Cancelled,
                _ => CallState::Errored,
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CallState::Open => "open",
            CallState::Active => "active",
            CallState::HalfClosed => "half_closed",
            CallState::Completed => "completed",
            CallState::Cancelled => "cancelled",
            CallState::Errored => "errored",
        }
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which end of a call a handle belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Opens the call and sends requests.
    Caller,
    /// Serves the call and sends responses.
    Responder,
}

impl Role {
    pub fn peer(self) -> Self {
        match self {
            Role::Caller => Role::Responder,
            Role::Responder => Role::Caller,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Caller => "caller",
            Role::Responder => "responder",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Direction {
    closed: bool,
    sent: u64,
}

/// Pattern-aware bookkeeping for one call.
#[derive(Debug)]
pub(crate) struct StateMachine {
    pattern: Pattern,
    state: CallState,
    caller: Direction,
    responder: Direction,
}

impl StateMachine {
    pub(crate) fn new(pattern: Pattern) -> Self {
        Self {
            pattern,
            state: CallState::Open,
            caller: Direction::default(),
            responder: Direction::default(),
        }
    }

    pub(crate) fn state(&self) -> CallState {
        self.state
    }

    fn direction(&self, role: Role) -> &Direction {
        match role {
            Role::Caller => &self.caller,
            Role::Responder => &self.responder,
        }
    }

    fn direction_mut(&mut self, role: Role) -> &mut Direction {
        match role {
            Role::Caller => &mut self.caller,
            Role::Responder => &mut self.responder,
        }
    }

    fn streams(&self, role: Role) -> bool {
        match role {
            Role::Caller => self.pattern.caller_streams(),
            Role::Responder => self.pattern.responder_streams(),
        }
    }

    pub(crate) fn is_send_closed(&self, role: Role) -> bool {
        self.direction(role).closed
    }

    /// Reserves one outgoing message for `role`.
    ///
    /// Single-message directions accept exactly one reservation. Responders
    /// of patterns that return a single value carry it in the outcome and
    /// may not send messages at all.
    pub(crate) fn reserve_send(&mut self, role: Role) -> Result<(), CallError> {
        if role == Role::Responder && !self.pattern.responder_streams() {
            return Err(CallError::SendClosed);
        }
        let streams = self.streams(role);
        let direction = self.direction_mut(role);
        if direction.closed || (!streams && direction.sent > 0) {
            return Err(CallError::SendClosed);
        }
        direction.sent += 1;
        Ok(())
    }

    /// Records that a reserved message was enqueued.
    ///
    /// Returns true when the direction must now be half-closed because the
    /// pattern allows only one message from `role`.
    pub(crate) fn on_sent(&mut self, role: Role) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        if self.state == CallState::Open {
            self.state = CallState::Active;
        }
        !self.streams(role)
    }

    /// Gives back a reservation whose message was never enqueued.
    pub(crate) fn release_send(&mut self, role: Role) {
        let direction = self.direction_mut(role);
        direction.sent = direction.sent.saturating_sub(1);
    }

    /// Half-closes the direction of `role`.
    ///
    /// Returns the outcome the call completes with when this close ends it:
    /// a server stream ends when the responder closes, a bidirectional
    /// stream ends when both sides have closed.
    pub(crate) fn close_send(&mut self, role: Role) -> Option<Outcome> {
        if self.state.is_terminal() || self.direction(role).closed {
            return None;
        }
        self.direction_mut(role).closed = true;

        let completes = match self.pattern {
            Pattern::ServerStream => role == Role::Responder,
            Pattern::BidiStream => self.caller.closed && self.responder.closed,
            Pattern::Unary | Pattern::ClientStream => false,
        };
        if completes {
            return Some(Ok(serde_json::Value::Null));
        }

        self.state = CallState::HalfClosed;
        None
    }

    /// Moves into the terminal state for `outcome`.
    ///
    /// Returns false when the call was already terminal.
    pub(crate) fn terminate(&mut self, outcome: &Outcome) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = CallState::terminal_for(outcome);
        self.caller.closed = true;
        self.responder.closed = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quadrpc_common::Status;

    #[test]
    fn test_first_message_activates() {
        let mut machine = StateMachine::new(Pattern::BidiStream);
        assert_eq!(machine.state(), CallState::Open);
        machine.reserve_send(Role::Caller).unwrap();
        assert!(!machine.on_sent(Role::Caller));
        assert_eq!(machine.state(), CallState::Active);
    }

    #[test]
    fn test_unary_caller_sends_once() {
        let mut machine = StateMachine::new(Pattern::Unary);
        machine.reserve_send(Role::Caller).unwrap();
        assert!(machine.on_sent(Role::Caller));
        assert_eq!(machine.reserve_send(Role::Caller), Err(CallError::SendClosed));
    }

    #[test]
    fn test_single_value_responders_cannot_send() {
        for pattern in [Pattern::Unary, Pattern::ClientStream] {
            let mut machine = StateMachine::new(pattern);
            assert_eq!(machine.reserve_send(Role::Responder), Err(CallError::SendClosed));
        }
    }

    #[test]
    fn test_server_stream_completes_when_responder_closes() {
        let mut machine = StateMachine::new(Pattern::ServerStream);
        assert_eq!(machine.close_send(Role::Caller), None);
        assert_eq!(machine.state(), CallState::HalfClosed);
        assert_eq!(
            machine.close_send(Role::Responder),
            Some(Ok(serde_json::Value::Null))
        );
    }

    #[test]
    fn test_bidi_completes_when_both_close() {
        let mut machine = StateMachine::new(Pattern::BidiStream);
        assert_eq!(machine.close_send(Role::Responder), None);
        assert_eq!(machine.close_send(Role::Responder), None);
        assert_eq!(
            machine.close_send(Role::Caller),
            Some(Ok(serde_json::Value::Null))
        );
    }

    #[test]
    fn test_client_stream_close_does_not_complete() {
        let mut machine = StateMachine::new(Pattern::ClientStream);
        assert_eq!(machine.close_send(Role::Caller), None);
        assert_eq!(machine.state(), CallState::HalfClosed);
    }

    #[test]
    fn test_terminal_is_absorbing() {
        let mut machine = StateMachine::new(Pattern::Unary);
        assert!(machine.terminate(&Err(Status::cancelled("stop"))));
        assert_eq!(machine.state(), CallState::Cancelled);
        assert!(!machine.terminate(&Ok(serde_json::Value::Null)));
        assert_eq!(machine.state(), CallState::Cancelled);
        assert_eq!(machine.close_send(Role::Caller), None);
    }

    #[test]
    fn test_terminal_state_by_code() {
        assert_eq!(
            CallState::terminal_for(&Err(Status::deadline_exceeded("late"))),
            CallState::Cancelled
        );
        assert_eq!(
            CallState::terminal_for(&Err(Status::not_found("gone"))),
            CallState::Errored
        );
        assert_eq!(
            CallState::terminal_for(&Ok(serde_json::json!(1))),
            CallState::Completed
        );
    }
}
